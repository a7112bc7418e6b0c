//! Outbound mail port and message templates

pub mod templates;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;

pub use templates::{MailTemplates, NewOrderNotification, PurchaseConfirmation};

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailContent {
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &MailContent) -> Result<(), DomainError>;
}
