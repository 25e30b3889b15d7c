pub mod adapter;
pub mod format;
pub mod repair;
