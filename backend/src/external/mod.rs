//! External API integrations

pub mod telegram;
pub mod uddoktapay;

pub use telegram::TelegramClient;
pub use uddoktapay::UddoktaPayClient;
