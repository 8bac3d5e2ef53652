//! Free-text risk audit of a settlement, delegated to an external
//! text-generation endpoint with a static fallback on any failure.

pub mod gateway;
pub mod prompt;
pub mod service;
pub mod snapshot;

pub use gateway::{
    gateway_from_config, DisabledNarration, GenerativeTextClient, NarrationError,
    NarrationGateway,
};
pub use prompt::build_prompt;
pub use service::{NarrationSource, RiskAuditService, RiskNarration, FALLBACK_NARRATION};
pub use snapshot::{AuditSnapshot, SettlementSnapshot};
