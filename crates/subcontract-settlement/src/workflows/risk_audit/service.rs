use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::gateway::{NarrationError, NarrationGateway};
use super::prompt::build_prompt;
use super::snapshot::AuditSnapshot;

/// Shown to the user whenever the narration cannot be produced.
pub const FALLBACK_NARRATION: &str = "系统忙，暂无法完成AI风险评估，请稍后再试。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskNarration {
    pub text: String,
    pub source: NarrationSource,
}

impl RiskNarration {
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_NARRATION.to_string(),
            source: NarrationSource::Fallback,
        }
    }
}

/// Produces free-text risk audits; never surfaces a gateway failure to the caller.
#[derive(Debug, Clone)]
pub struct RiskAuditService {
    gateway: Arc<dyn NarrationGateway>,
}

impl RiskAuditService {
    pub fn new(gateway: Arc<dyn NarrationGateway>) -> Self {
        Self { gateway }
    }

    pub async fn narrate(&self, snapshot: &AuditSnapshot) -> RiskNarration {
        match self.try_narrate(snapshot).await {
            Ok(text) => {
                info!(
                    settlement_no = %snapshot.settlement.settlement_no,
                    chars = text.chars().count(),
                    "risk audit narration generated"
                );
                RiskNarration {
                    text,
                    source: NarrationSource::Generated,
                }
            }
            Err(NarrationError::Disabled) => {
                warn!("risk audit narration disabled; returning fallback message");
                RiskNarration::fallback()
            }
            Err(err) => {
                error!(
                    error = %err,
                    settlement_no = %snapshot.settlement.settlement_no,
                    "risk audit narration failed"
                );
                RiskNarration::fallback()
            }
        }
    }

    async fn try_narrate(&self, snapshot: &AuditSnapshot) -> Result<String, NarrationError> {
        let prompt = build_prompt(snapshot)?;
        self.gateway.generate(&prompt).await
    }
}
