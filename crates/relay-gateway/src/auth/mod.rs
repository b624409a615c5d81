//! Access control
//!
//! Single shared-token capability URLs.

mod token_gate;

pub use token_gate::{AuthError, TokenGate, TOKEN_LENGTH};
