//! Request payloads and query strings

pub mod auth;
pub mod users;
pub mod catalog;
pub mod codes;
pub mod orders;
pub mod proxy;
pub mod sales;
