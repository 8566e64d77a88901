pub mod chain;
pub mod params;
pub mod spork;
pub mod subsidy;
pub mod types;
