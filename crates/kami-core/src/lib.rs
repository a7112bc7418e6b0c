//! # Kami Core
//!
//! Domain entities, services, and repository traits for the redemption platform.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod mail;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
