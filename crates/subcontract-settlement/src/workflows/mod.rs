pub mod risk_audit;
pub mod settlement;
