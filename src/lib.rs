// Harmony Client - authenticated client for the Epsilon Harmony messaging API

pub mod auth;
pub mod client;
pub mod error;
pub mod http_client;
pub mod models;

pub use client::{HarmonyClient, HarmonyClientBuilder, SendHandle};
pub use error::{ClientError, SendError};
pub use models::{Attribute, OutboundMessage, Recipient, SendReceipt};
