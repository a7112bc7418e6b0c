//! Channel entity: a storefront that owns cards and is served by staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Channel {
    pub id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Channel {
    pub fn new(
        name: String,
        description: Option<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let channel = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            description: description.map(|d| d.trim().to_string()),
            created_at: Utc::now(),
            modified_at: None,
        };

        channel.validate()?;
        Ok(channel)
    }

    /// Applies a partial update and re-validates.
    pub fn apply(
        &mut self,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<(), validator::ValidationErrors> {
        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = description {
            self.description = Some(description.trim().to_string());
        }
        self.modified_at = Some(Utc::now());
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_channel() {
        let channel = Channel::new("  Steam  ".into(), None).unwrap();
        assert_eq!(channel.name, "Steam");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Channel::new("   ".into(), None).is_err());
    }

    #[test]
    fn test_apply_validates() {
        let mut channel = Channel::new("Steam".into(), None).unwrap();
        assert!(channel.apply(None, Some("x".repeat(501))).is_err());
        assert!(channel.apply(Some("Origin".into()), Some("PC games".into())).is_ok());
        assert_eq!(channel.name, "Origin");
        assert!(channel.modified_at.is_some());
    }
}
