pub mod allocation;
pub mod analytics;
pub mod asset;
pub mod budget;
pub mod exchange_rate;
pub mod settings;
pub mod simulation;
