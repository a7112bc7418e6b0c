//! # Kami Security
//!
//! Security utilities: JWT, password hashing, activation and verification codes.

pub mod jwt;
pub mod password;
pub mod code;

pub use jwt::{Claims, JwtError, JwtService, TokenPair, TokenSubject};
pub use password::{PasswordError, PasswordService};
