// ============================================================================
// Kami Core - Test Utilities
// File: crates/kami-core/src/test_utils.rs
// Description: In-memory repositories, a recording mailer and seed fixtures
// ============================================================================

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kami_shared::Pagination;
use uuid::Uuid;

use crate::domain::*;
use crate::error::DomainError;
use crate::mail::{MailContent, Mailer};
use crate::repositories::*;

pub const FIXTURE_PASSWORD: &str = "password123";

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    channels: Vec<Channel>,
    cards: Vec<Card>,
    codes: Vec<ActivationCode>,
    orders: Vec<Order>,
    associations: Vec<ProxyCardAssociation>,
    sales: Vec<Sale>,
}

/// Every repository port over one mutex, so multi-table operations are
/// atomic the same way a database transaction is.
#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn code(&self, code: &str) -> Option<ActivationCode> {
        self.lock().codes.iter().find(|c| c.code == code).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| Reverse(key(item)));
}

#[async_trait]
impl UserRepository for InMemoryDb {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.lock().users.iter().find(|u| u.id == *id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(DomainError::UsernameAlreadyExists(user.username.clone()));
        }
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DomainError::EmailAlreadyExists(user.email.clone()));
        }
        t.users.push(user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut t = self.lock();
        let slot = t
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(DomainError::UserNotFound)?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut t = self.lock();
        let before = t.users.len();
        t.users.retain(|u| u.id != *id);
        Ok(t.users.len() != before)
    }

    async fn list(&self, role: Option<Role>, page: Pagination) -> Result<Vec<User>, DomainError> {
        let t = self.lock();
        Ok(t.users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, role: Option<Role>) -> Result<i64, DomainError> {
        let t = self.lock();
        Ok(t.users.iter().filter(|u| role.map_or(true, |r| u.role == r)).count() as i64)
    }

    async fn find_staff_by_channel(&self, channel_id: &Uuid) -> Result<Vec<User>, DomainError> {
        let t = self.lock();
        Ok(t.users
            .iter()
            .filter(|u| u.is_staff() && u.can_login() && u.channel_id == Some(*channel_id))
            .cloned()
            .collect())
    }

    async fn search_proxies(&self, query: &str) -> Result<Vec<User>, DomainError> {
        let needle = query.to_lowercase();
        let t = self.lock();
        Ok(t.users
            .iter()
            .filter(|u| u.is_proxy())
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChannelRepository for InMemoryDb {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Channel>, DomainError> {
        Ok(self.lock().channels.iter().find(|c| c.id == *id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Channel>, DomainError> {
        Ok(self.lock().channels.iter().find(|c| c.name == name).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Channel>, DomainError> {
        let t = self.lock();
        Ok(t.channels.iter().skip(skip as usize).take(limit as usize).cloned().collect())
    }

    async fn create(&self, channel: &Channel) -> Result<Channel, DomainError> {
        let mut t = self.lock();
        if t.channels.iter().any(|c| c.name == channel.name) {
            return Err(DomainError::ChannelNameAlreadyExists(channel.name.clone()));
        }
        t.channels.push(channel.clone());
        Ok(channel.clone())
    }

    async fn update(&self, channel: &Channel) -> Result<Channel, DomainError> {
        let mut t = self.lock();
        let slot = t
            .channels
            .iter_mut()
            .find(|c| c.id == channel.id)
            .ok_or(DomainError::ChannelNotFound)?;
        *slot = channel.clone();
        Ok(channel.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut t = self.lock();
        let before = t.channels.len();
        t.channels.retain(|c| c.id != *id);
        Ok(t.channels.len() != before)
    }
}

#[async_trait]
impl CardRepository for InMemoryDb {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Card>, DomainError> {
        Ok(self.lock().cards.iter().find(|c| c.id == *id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Card>, DomainError> {
        Ok(self.lock().cards.iter().find(|c| c.name == name).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Card>, DomainError> {
        let t = self.lock();
        Ok(t.cards.iter().filter(|c| ids.contains(&c.id)).cloned().collect())
    }

    async fn list(&self, filter: CardFilter) -> Result<Vec<Card>, DomainError> {
        let t = self.lock();
        Ok(t.cards
            .iter()
            .filter(|c| filter.include_inactive || c.is_active)
            .filter(|c| filter.channel_id.map_or(true, |ch| c.channel_id == ch))
            .cloned()
            .collect())
    }

    async fn create(&self, card: &Card) -> Result<Card, DomainError> {
        let mut t = self.lock();
        if t.cards.iter().any(|c| c.name == card.name) {
            return Err(DomainError::CardNameAlreadyExists(card.name.clone()));
        }
        t.cards.push(card.clone());
        Ok(card.clone())
    }

    async fn update(&self, card: &Card) -> Result<Card, DomainError> {
        let mut t = self.lock();
        let slot = t
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or(DomainError::CardNotFound)?;
        *slot = card.clone();
        Ok(card.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let mut t = self.lock();
        let before = t.cards.len();
        t.cards.retain(|c| c.id != *id);
        Ok(t.cards.len() != before)
    }
}

fn apply_transition(
    codes: &mut [ActivationCode],
    id: &Uuid,
    from: CodeStatus,
    to: CodeStatus,
) -> Option<ActivationCode> {
    let code = codes.iter_mut().find(|c| c.id == *id)?;
    if code.status != from {
        return None;
    }
    code.transition(to, Utc::now()).ok()?;
    Some(code.clone())
}

#[async_trait]
impl ActivationCodeRepository for InMemoryDb {
    async fn create_batch(&self, codes: &[ActivationCode]) -> Result<Vec<ActivationCode>, DomainError> {
        let mut t = self.lock();
        if codes.iter().any(|new| t.codes.iter().any(|c| c.code == new.code)) {
            return Err(DomainError::DatabaseError("duplicate activation code".into()));
        }
        t.codes.extend(codes.iter().cloned());
        Ok(codes.to_vec())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<ActivationCode>, DomainError> {
        Ok(self.lock().codes.iter().find(|c| c.id == *id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ActivationCode>, DomainError> {
        Ok(self.lock().codes.iter().find(|c| c.code == code).cloned())
    }

    async fn list_by_card(&self, card_id: &Uuid, filter: &CodeFilter) -> Result<Vec<ActivationCode>, DomainError> {
        let t = self.lock();
        let mut codes: Vec<_> = t
            .codes
            .iter()
            .filter(|c| c.card_id == *card_id && filter.matches(c))
            .cloned()
            .collect();
        newest_first(&mut codes, |c| c.created_at);
        Ok(codes)
    }

    async fn count_by_card(&self, card_id: &Uuid, only_unused: bool) -> Result<i64, DomainError> {
        let t = self.lock();
        Ok(t.codes
            .iter()
            .filter(|c| c.card_id == *card_id && (!only_unused || c.is_available()))
            .count() as i64)
    }

    async fn delete_by_card(&self, card_id: &Uuid) -> Result<u64, DomainError> {
        let mut t = self.lock();
        let before = t.codes.len();
        t.codes.retain(|c| c.card_id != *card_id);
        Ok((before - t.codes.len()) as u64)
    }

    async fn transition(
        &self,
        id: &Uuid,
        from: CodeStatus,
        to: CodeStatus,
    ) -> Result<Option<ActivationCode>, DomainError> {
        let mut t = self.lock();
        Ok(apply_transition(&mut t.codes, id, from, to))
    }

    async fn list_available(&self, proxy_user_id: Option<Uuid>) -> Result<Vec<ActivationCode>, DomainError> {
        let t = self.lock();
        let mut codes: Vec<_> = t
            .codes
            .iter()
            .filter(|c| c.is_available())
            .filter(|c| proxy_user_id.map_or(true, |p| c.proxy_user_id == Some(p)))
            .cloned()
            .collect();
        newest_first(&mut codes, |c| c.created_at);
        Ok(codes)
    }

    async fn mark_exported(&self, ids: &[Uuid], proxy_user_id: Option<Uuid>) -> Result<u64, DomainError> {
        let mut t = self.lock();
        let mut updated = 0;
        for code in t.codes.iter_mut().filter(|c| ids.contains(&c.id)) {
            if proxy_user_id.map_or(true, |p| code.proxy_user_id == Some(p)) {
                code.exported = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_stock(&self, card_id: Option<Uuid>) -> Result<i64, DomainError> {
        let t = self.lock();
        Ok(t.codes
            .iter()
            .filter(|c| c.is_available() && !c.is_sold)
            .filter(|c| card_id.map_or(true, |id| c.card_id == id))
            .count() as i64)
    }

    async fn consumed_by_proxy(
        &self,
        proxy_user_id: &Uuid,
        card_ids: &[Uuid],
        window: RevenueWindow,
    ) -> Result<Vec<CardConsumption>, DomainError> {
        let t = self.lock();
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for code in t.codes.iter().filter(|c| {
            c.status == CodeStatus::Consumed
                && c.proxy_user_id == Some(*proxy_user_id)
                && card_ids.contains(&c.card_id)
                && c.used_at.is_some_and(|at| window.contains(at))
        }) {
            *counts.entry(code.card_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(card_id, consumed)| CardConsumption { card_id, consumed })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for InMemoryDb {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock().orders.iter().find(|o| o.id == *id).cloned())
    }

    async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>, DomainError> {
        let t = self.lock();
        let mut orders: Vec<_> = t
            .orders
            .iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn list_by_status(&self, status: OrderStatus, channel_id: Option<Uuid>) -> Result<Vec<Order>, DomainError> {
        let t = self.lock();
        let mut orders: Vec<_> = t
            .orders
            .iter()
            .filter(|o| o.status == status && channel_id.map_or(true, |c| o.channel_id == c))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: &Uuid) -> Result<Vec<Order>, DomainError> {
        let t = self.lock();
        let mut orders: Vec<_> = t.orders.iter().filter(|o| o.user_id == *user_id).cloned().collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn stats(&self) -> Result<OrderStats, DomainError> {
        let t = self.lock();
        let count = |s: OrderStatus| t.orders.iter().filter(|o| o.status == s).count() as i64;
        Ok(OrderStats {
            total_orders: t.orders.len() as i64,
            pending_orders: count(OrderStatus::Pending),
            processing_orders: count(OrderStatus::Processing),
            completed_orders: count(OrderStatus::Completed),
        })
    }

    async fn create_with_reservation(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError> {
        let mut t = self.lock();
        apply_transition(&mut t.codes, code_id, CodeStatus::Available, CodeStatus::Consuming)
            .ok_or_else(|| DomainError::InvalidCodeStatus(order.activation_code.clone()))?;
        t.orders.push(order.clone());
        Ok(order.clone())
    }

    async fn complete_with_consumption(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError> {
        let mut t = self.lock();
        let stored = t
            .orders
            .iter()
            .position(|o| o.id == order.id)
            .ok_or(DomainError::OrderNotFound)?;
        if t.orders[stored].is_completed() {
            return Err(DomainError::OrderAlreadyCompleted);
        }
        apply_transition(&mut t.codes, code_id, CodeStatus::Consuming, CodeStatus::Consumed)
            .ok_or_else(|| DomainError::InvalidCodeStatus(order.activation_code.clone()))?;
        t.orders[stored] = order.clone();
        Ok(order.clone())
    }
}

#[async_trait]
impl ProxyRepository for InMemoryDb {
    async fn find(&self, proxy_user_id: &Uuid, card_id: &Uuid) -> Result<Option<ProxyCardAssociation>, DomainError> {
        Ok(self
            .lock()
            .associations
            .iter()
            .find(|a| a.proxy_user_id == *proxy_user_id && a.card_id == *card_id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        Ok(self.lock().associations.clone())
    }

    async fn list_by_proxy(&self, proxy_user_id: &Uuid) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        let t = self.lock();
        Ok(t.associations
            .iter()
            .filter(|a| a.proxy_user_id == *proxy_user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, association: &ProxyCardAssociation) -> Result<ProxyCardAssociation, DomainError> {
        let mut t = self.lock();
        if t.associations
            .iter()
            .any(|a| a.proxy_user_id == association.proxy_user_id && a.card_id == association.card_id)
        {
            return Err(DomainError::DatabaseError("duplicate proxy association".into()));
        }
        t.associations.push(association.clone());
        Ok(association.clone())
    }

    async fn delete(&self, proxy_user_id: &Uuid, card_ids: &[Uuid]) -> Result<u64, DomainError> {
        let mut t = self.lock();
        let before = t.associations.len();
        t.associations
            .retain(|a| !(a.proxy_user_id == *proxy_user_id && card_ids.contains(&a.card_id)));
        Ok((before - t.associations.len()) as u64)
    }
}

#[async_trait]
impl SaleRepository for InMemoryDb {
    async fn create_with_claim(&self, request: &SaleRequest) -> Result<Option<Sale>, DomainError> {
        let mut t = self.lock();
        let Some(code) = t
            .codes
            .iter_mut()
            .filter(|c| c.card_id == request.card_id && c.is_available() && !c.is_sold)
            .min_by_key(|c| c.created_at)
        else {
            return Ok(None);
        };
        code.is_sold = true;
        let sale = request.clone().into_sale(code.code.clone(), Utc::now());
        t.sales.push(sale.clone());
        Ok(Some(sale))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Sale>, DomainError> {
        let t = self.lock();
        let mut sales = t.sales.clone();
        newest_first(&mut sales, |s| s.purchased_at);
        Ok(sales.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Sale>, DomainError> {
        let t = self.lock();
        Ok(t.sales
            .iter()
            .filter(|s| s.user_email.eq_ignore_ascii_case(email))
            .cloned()
            .collect())
    }

    async fn totals(&self, today_start: DateTime<Utc>) -> Result<SaleTotals, DomainError> {
        let t = self.lock();
        let today: Vec<_> = t.sales.iter().filter(|s| s.purchased_at >= today_start).collect();
        Ok(SaleTotals {
            total_sales: t.sales.len() as i64,
            total_revenue: t.sales.iter().map(|s| s.sale_price).sum(),
            today_sales: today.len() as i64,
            today_revenue: today.iter().map(|s| s.sale_price).sum(),
        })
    }
}

/// Mailer that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailContent>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<MailContent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &MailContent) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::MailError("smtp unavailable".into()));
        }
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(mail.clone());
        Ok(())
    }
}

/// A small seeded world: two channels, one card per channel with codes,
/// and one user of every role.
pub struct Fixture {
    pub db: Arc<InMemoryDb>,
    pub mailer: Arc<RecordingMailer>,
    pub channel: Channel,
    pub other_channel: Channel,
    pub card: Card,
    pub other_card: Card,
    pub admin: User,
    pub staff: User,
    pub other_staff: User,
    pub proxy: User,
    pub customer: User,
    /// Codes of `card`; the first two are credited to `proxy`.
    pub codes: Vec<ActivationCode>,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = InMemoryDb::new();
        let hash = kami_security::PasswordService::hash(FIXTURE_PASSWORD)
            .expect("fixture password hashes");

        let channel = Channel::new("Channel One".into(), Some("first".into())).expect("channel");
        let other_channel = Channel::new("Channel Two".into(), None).expect("channel");
        for c in [&channel, &other_channel] {
            ChannelRepository::create(db.as_ref(), c).await.expect("seed channel");
        }

        let user = |name: &str, role: Role, channel_id: Option<Uuid>| {
            User::new(
                name.to_string(),
                format!("{name}@example.com"),
                Some(name.to_uppercase()),
                hash.clone(),
                role,
                channel_id,
            )
            .expect("fixture user")
        };
        let admin = user("admin", Role::Admin, None);
        let staff = user("staff-1", Role::Staff, Some(channel.id));
        let other_staff = user("staff-2", Role::Staff, Some(other_channel.id));
        let proxy = user("proxy-1", Role::Proxy, None);
        let customer = user("customer", Role::User, None);
        for u in [&admin, &staff, &other_staff, &proxy, &customer] {
            UserRepository::create(db.as_ref(), u).await.expect("seed user");
        }

        let card = Card::new("Card A".into(), "Card A description".into(), 10.0, channel.id)
            .expect("card");
        let other_card = Card::new("Card B".into(), "Card B description".into(), 20.0, other_channel.id)
            .expect("card");
        for c in [&card, &other_card] {
            CardRepository::create(db.as_ref(), c).await.expect("seed card");
        }

        let codes: Vec<ActivationCode> = (0..5)
            .map(|i| {
                let proxy_id = if i < 2 { Some(proxy.id) } else { None };
                ActivationCode::new(card.id, kami_security::code::generate_activation_code(), proxy_id)
            })
            .collect();
        db.create_batch(&codes).await.expect("seed codes");
        let other_codes: Vec<ActivationCode> = (0..2)
            .map(|_| ActivationCode::new(other_card.id, kami_security::code::generate_activation_code(), None))
            .collect();
        db.create_batch(&other_codes).await.expect("seed codes");

        ProxyRepository::create(db.as_ref(), &ProxyCardAssociation::new(proxy.id, card.id))
            .await
            .expect("seed association");

        Self {
            db,
            mailer: RecordingMailer::new(),
            channel,
            other_channel,
            card,
            other_card,
            admin,
            staff,
            other_staff,
            proxy,
            customer,
            codes,
        }
    }
}
