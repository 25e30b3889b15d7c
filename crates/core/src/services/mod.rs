pub mod allocation_normalizer;
pub mod analytics_service;
pub mod diff_calculator;
pub mod purchase_planner;
pub mod purchase_session;
pub mod simulation_service;
pub mod valuation_service;
