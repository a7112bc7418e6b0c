//! Application services

pub mod mail_service;
pub mod auth_service;
pub mod user_service;
pub mod channel_service;
pub mod card_service;
pub mod activation_code_service;
pub mod order_service;
pub mod proxy_service;
pub mod sale_service;

pub use mail_service::MailService;
pub use auth_service::{AuthService, AuthTokens, Registration, RegistrationPolicy};
pub use user_service::{NewUser, ProfileChanges, UserChanges, UserPage, UserService};
pub use channel_service::ChannelService;
pub use card_service::{CardService, NewCard};
pub use activation_code_service::{ActivationCodeService, AvailableCode, AvailableCodes, CardSummary};
pub use order_service::{NewOrder, OrderService};
pub use proxy_service::ProxyService;
pub use sale_service::SaleService;
