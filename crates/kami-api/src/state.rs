//! Shared handler state

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use kami_core::services::{
    ActivationCodeService, AuthService, CardService, ChannelService, OrderService, ProxyService,
    SaleService, UserService,
};

pub type LoginLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub channels: Arc<ChannelService>,
    pub cards: Arc<CardService>,
    pub codes: Arc<ActivationCodeService>,
    pub orders: Arc<OrderService>,
    pub proxies: Arc<ProxyService>,
    pub sales: Arc<SaleService>,
    pub login_limiter: Arc<LoginLimiter>,
}

/// Per-username login budget. Zero is treated as one attempt per minute.
pub fn login_limiter(attempts_per_minute: u32) -> Arc<LoginLimiter> {
    let per_minute = NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}
