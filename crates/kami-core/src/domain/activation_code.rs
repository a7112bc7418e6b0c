// ============================================================================
// Kami Core - Activation Code Entity
// File: crates/kami-core/src/domain/activation_code.rs
// Description: Redeemable code ("kami") and its lifecycle
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Lifecycle of a code: `available -> consuming -> consumed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    Available,
    Consuming,
    Consumed,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeStatus::Available => "available",
            CodeStatus::Consuming => "consuming",
            CodeStatus::Consumed => "consumed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(CodeStatus::Available),
            "consuming" => Some(CodeStatus::Consuming),
            "consumed" => Some(CodeStatus::Consumed),
            _ => None,
        }
    }

    /// The only forward edges of the lifecycle.
    pub fn can_transition_to(&self, next: CodeStatus) -> bool {
        matches!(
            (self, next),
            (CodeStatus::Available, CodeStatus::Consuming)
                | (CodeStatus::Consuming, CodeStatus::Consumed)
        )
    }
}

impl Default for CodeStatus {
    fn default() -> Self {
        CodeStatus::Available
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationCode {
    pub id: Uuid,
    pub card_id: Uuid,
    pub code: String,
    pub status: CodeStatus,
    pub is_sold: bool,
    pub exported: bool,
    /// Proxy credited when this code is consumed.
    pub proxy_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl ActivationCode {
    pub fn new(card_id: Uuid, code: String, proxy_user_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            code,
            status: CodeStatus::Available,
            is_sold: false,
            exported: false,
            proxy_user_id,
            created_at: Utc::now(),
            used_at: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == CodeStatus::Available
    }

    /// Moves the code along one lifecycle edge. `used_at` is stamped when it
    /// reaches `consumed`.
    pub fn transition(&mut self, next: CodeStatus, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} cannot move from {} to {}",
                self.code,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        if next == CodeStatus::Consumed {
            self.used_at = Some(at);
        }
        Ok(())
    }
}

/// Listing filter for the codes of one card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeFilter {
    #[serde(default)]
    pub include_used: bool,
    pub status: Option<CodeStatus>,
    pub proxy_user_id: Option<Uuid>,
    pub exported: Option<bool>,
}

impl CodeFilter {
    /// Explicit `status` wins; otherwise used codes are hidden unless asked for.
    pub fn effective_status(&self) -> Option<CodeStatus> {
        match (self.status, self.include_used) {
            (Some(status), _) => Some(status),
            (None, false) => Some(CodeStatus::Available),
            (None, true) => None,
        }
    }

    pub fn matches(&self, code: &ActivationCode) -> bool {
        self.effective_status().map_or(true, |s| code.status == s)
            && self.proxy_user_id.map_or(true, |p| code.proxy_user_id == Some(p))
            && self.exported.map_or(true, |e| code.exported == e)
    }
}

/// Result of a public code lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeCheck {
    pub available: bool,
    pub channel_id: Option<Uuid>,
}

impl CodeCheck {
    pub fn unavailable() -> Self {
        Self { available: false, channel_id: None }
    }
}
