pub mod disease;
pub mod engine;
pub mod maturity;
