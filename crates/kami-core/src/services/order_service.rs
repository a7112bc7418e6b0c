// ============================================================================
// Kami Core - Order Service
// File: crates/kami-core/src/services/order_service.rs
// Description: Redemption orders, staff processing and order statistics
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use kami_security::code::normalize_activation_code;
use kami_shared::constants::{MAX_ORDER_PAGE, REPORT_DATETIME_FORMAT};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Card, CodeStatus, Order, OrderStats, OrderStatus, OrderView, Role, User,
};
use crate::error::DomainError;
use crate::mail::NewOrderNotification;
use crate::repositories::{
    ActivationCodeRepository, CardRepository, ChannelRepository, OrderRepository,
    ProxyRepository, UserRepository,
};
use crate::services::MailService;

/// Redemption request submitted by a user.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub code: String,
    pub channel_id: Option<Uuid>,
    pub remarks: Option<String>,
    pub card_name: Option<String>,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    codes: Arc<dyn ActivationCodeRepository>,
    cards: Arc<dyn CardRepository>,
    channels: Arc<dyn ChannelRepository>,
    users: Arc<dyn UserRepository>,
    proxies: Arc<dyn ProxyRepository>,
    mail: Arc<MailService>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        codes: Arc<dyn ActivationCodeRepository>,
        cards: Arc<dyn CardRepository>,
        channels: Arc<dyn ChannelRepository>,
        users: Arc<dyn UserRepository>,
        proxies: Arc<dyn ProxyRepository>,
        mail: Arc<MailService>,
    ) -> Self {
        Self { orders, codes, cards, channels, users, proxies, mail }
    }

    pub async fn create_order(&self, user: &User, request: NewOrder) -> Result<OrderView, DomainError> {
        let code = self
            .codes
            .find_by_code(&normalize_activation_code(&request.code))
            .await?
            .ok_or(DomainError::ActivationCodeNotFound)?;
        if !code.is_available() {
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} is {}",
                code.code,
                code.status.as_str()
            )));
        }

        let card = self.cards.find_by_id(&code.card_id).await?.ok_or(DomainError::CardNotFound)?;
        if request.channel_id.is_some_and(|channel| channel != card.channel_id) {
            return Err(DomainError::CodeChannelMismatch);
        }
        if let Some(proxy_id) = &code.proxy_user_id {
            if self.proxies.find(proxy_id, &card.id).await?.is_none() {
                warn!("Code {} belongs to proxy {} no longer bound to card {}", code.code, proxy_id, card.id);
                return Err(DomainError::ProxyNotBound);
            }
        }

        let card_name = request
            .card_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| card.name.clone());
        let order = Order::processing(code.code.clone(), user.id, card.channel_id, card_name, request.remarks)?;
        let order = self.orders.create_with_reservation(&code.id, &order).await?;
        info!("Order {} created by {} for code {}", order.id, user.username, order.activation_code);

        self.notify_staff(&order, &card.name).await;
        Ok(OrderView { order, pricing: card.price })
    }

    async fn notify_staff(&self, order: &Order, card_name: &str) {
        let recipients: Vec<String> = match self.users.find_staff_by_channel(&order.channel_id).await {
            Ok(staff) => staff
                .into_iter()
                .map(|s| s.email)
                .filter(|e| !e.is_empty())
                .collect(),
            Err(e) => {
                warn!("Could not load staff of channel {}: {}", order.channel_id, e);
                return;
            }
        };
        let channel_name = match self.channels.find_by_id(&order.channel_id).await {
            Ok(Some(channel)) => channel.name,
            _ => order.channel_id.to_string(),
        };
        let notification = NewOrderNotification {
            order_id: order.id.to_string(),
            card_name: card_name.to_string(),
            activation_code: order.activation_code.clone(),
            created_at: order.created_at.format(REPORT_DATETIME_FORMAT).to_string(),
            channel_name,
        };
        if let Err(e) = self.mail.notify_new_order(recipients, &notification).await {
            warn!("Staff notification for order {} failed: {}", order.id, e);
        }
    }

    pub async fn complete_order(
        &self,
        actor: &User,
        order_id: &Uuid,
        remarks: Option<String>,
    ) -> Result<OrderView, DomainError> {
        actor.require_role(&[Role::Admin, Role::Staff])?;
        let mut order = self.orders.find_by_id(order_id).await?.ok_or(DomainError::OrderNotFound)?;
        if order.is_completed() {
            return Err(DomainError::OrderAlreadyCompleted);
        }
        Self::ensure_channel_access(actor, &order)?;

        let code = self
            .codes
            .find_by_code(&order.activation_code)
            .await?
            .ok_or(DomainError::ActivationCodeNotFound)?;
        if code.status != CodeStatus::Consuming {
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} is {}, expected consuming",
                code.code,
                code.status.as_str()
            )));
        }

        order.complete(remarks, Utc::now())?;
        let order = self.orders.complete_with_consumption(&code.id, &order).await?;
        info!("Order {} completed by {}", order.id, actor.username);

        let pricing = self.cards.find_by_id(&code.card_id).await?.map_or(0.0, |c| c.price);
        Ok(OrderView { order, pricing })
    }

    fn ensure_channel_access(actor: &User, order: &Order) -> Result<(), DomainError> {
        if actor.is_staff() && actor.staff_channel() != Some(order.channel_id) {
            warn!("Staff {} denied access to order {}", actor.username, order.id);
            return Err(DomainError::Forbidden("order belongs to another channel".to_string()));
        }
        Ok(())
    }

    pub async fn get_order(&self, actor: &User, id: &Uuid) -> Result<OrderView, DomainError> {
        actor.require_role(&[Role::Admin, Role::Staff])?;
        let order = self.orders.find_by_id(id).await?.ok_or(DomainError::OrderNotFound)?;
        Self::ensure_channel_access(actor, &order)?;
        Ok(self.with_pricing(vec![order]).await?.remove(0))
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderView>, DomainError> {
        let orders = self
            .orders
            .list(status, limit.clamp(1, MAX_ORDER_PAGE), offset.max(0))
            .await?;
        self.with_pricing(orders).await
    }

    pub async fn list_pending(&self) -> Result<Vec<OrderView>, DomainError> {
        let orders = self.orders.list_by_status(OrderStatus::Pending, None).await?;
        self.with_pricing(orders).await
    }

    pub async fn list_processing(&self, actor: &User) -> Result<Vec<OrderView>, DomainError> {
        actor.require_role(&[Role::Admin, Role::Staff])?;
        let channel = if actor.is_staff() {
            match actor.staff_channel() {
                Some(channel) => Some(channel),
                None => return Ok(Vec::new()),
            }
        } else {
            None
        };
        let orders = self.orders.list_by_status(OrderStatus::Processing, channel).await?;
        self.with_pricing(orders).await
    }

    pub async fn my_orders(&self, user: &User) -> Result<Vec<OrderView>, DomainError> {
        let orders = self.orders.list_by_user(&user.id).await?;
        self.with_pricing(orders).await
    }

    pub async fn stats(&self) -> Result<OrderStats, DomainError> {
        self.orders.stats().await
    }

    /// Resolves each order's price through its code's card. Orders whose
    /// code or card is gone are priced at zero.
    async fn with_pricing(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, DomainError> {
        let mut cards: HashMap<Uuid, Option<Card>> = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let pricing = match self.codes.find_by_code(&order.activation_code).await? {
                Some(code) => {
                    if !cards.contains_key(&code.card_id) {
                        let card = self.cards.find_by_id(&code.card_id).await?;
                        cards.insert(code.card_id, card);
                    }
                    cards.get(&code.card_id).and_then(|c| c.as_ref()).map_or(0.0, |c| c.price)
                }
                None => 0.0,
            };
            views.push(OrderView { order, pricing });
        }
        Ok(views)
    }
}
