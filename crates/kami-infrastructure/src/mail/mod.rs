//! Outbound mail transports implementing the `Mailer` port

pub mod smtp_mailer;
pub mod log_mailer;

pub use smtp_mailer::SmtpMailer;
pub use log_mailer::LogMailer;
