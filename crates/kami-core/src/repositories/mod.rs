//! Repository traits (ports)

pub mod user_repository;
pub mod channel_repository;
pub mod card_repository;
pub mod activation_code_repository;
pub mod order_repository;
pub mod proxy_repository;
pub mod sale_repository;
pub mod verification_code_store;

pub use user_repository::UserRepository;
pub use channel_repository::ChannelRepository;
pub use card_repository::{CardFilter, CardRepository};
pub use activation_code_repository::ActivationCodeRepository;
pub use order_repository::OrderRepository;
pub use proxy_repository::ProxyRepository;
pub use sale_repository::SaleRepository;
pub use verification_code_store::{InMemoryVerificationCodeStore, VerificationCodeStore};
