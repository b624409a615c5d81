//! Relay protocol definitions
//!
//! Defines the one-byte message type tags, the shared frame buffer, and the
//! close codes the relay sends.

mod close_codes;
mod frame;
mod message_type;

pub use close_codes::CloseCode;
pub use frame::Frame;
pub use message_type::MessageType;
