// Data models for the Harmony messaging API

pub mod message;
pub mod receipt;

pub use message::{Attribute, OutboundMessage, Recipient, MAX_RECIPIENTS};
pub use receipt::{ErrorBody, ErrorEntry, SendReceipt, RESULT_CODE_SUCCESS};
