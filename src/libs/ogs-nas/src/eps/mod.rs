//! EPS (Evolved Packet System) NAS implementation
//!
//! EMM (EPS Mobility Management) messages and NAS security as specified
//! in 3GPP TS 24.301 and TS 33.401.

pub mod types;
pub mod message;
pub mod header;
pub mod security;
pub mod codec;

pub use types::*;
pub use message::*;
pub use header::*;
pub use security::*;
pub use codec::*;
pub use crate::error::DecodeError;
