//! HTTP handlers grouped by resource

pub mod auth;
pub mod cards;
pub mod channels;
pub mod codes;
pub mod health;
pub mod orders;
pub mod profile;
pub mod proxy;
pub mod sales;
pub mod users;
