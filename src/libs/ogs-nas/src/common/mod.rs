//! Common NAS types

pub mod types;

pub use types::*;
