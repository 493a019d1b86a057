//! NextGCore NAS Protocol Library
//!
//! This crate provides EPS NAS message building and parsing as specified
//! in 3GPP TS 24.301, with the NAS security protection of TS 33.401.
//!
//! # Features
//!
//! - EMM message encoding/decoding
//! - NAS security (128-EIA2 integrity protection and 128-EEA2 ciphering)
//! - Common NAS types (PLMN, key set identifier, algorithms, GPRS timer)
//!
//! # Example
//!
//! ```rust
//! use ogs_nas::eps::{
//!     nas_message_decode, nas_message_encode, EmmCause, EmmMessage, EmmStatus,
//!     NasDirection, NasMessage,
//! };
//!
//! let msg = NasMessage::plain(EmmMessage::EmmStatus(EmmStatus {
//!     emm_cause: EmmCause::ProtocolErrorUnspecified,
//! }));
//!
//! let mut buf = Vec::new();
//! let len = nas_message_encode(&msg, &mut buf, 64, None, NasDirection::Downlink).unwrap();
//! assert_eq!(len, 3);
//!
//! let (decoded, status) = nas_message_decode(&buf, None, NasDirection::Downlink).unwrap();
//! assert_eq!(decoded, msg);
//! assert!(!status.integrity_protected_message);
//! ```

pub mod error;
pub mod common;
pub mod eps;

#[cfg(test)]
mod property_tests;

pub use error::{DecodeError, NasError, NasResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{DecodeError, NasError, NasResult};
    pub use crate::common::types::{
        ProtocolDiscriminator,
        SecurityHeaderType,
        PlmnId,
        GprsTimer,
        KeySetIdentifier,
        SecurityAlgorithms,
    };
    pub use crate::eps::{
        EmmMessage,
        EmmMessageType,
        EmmCause,
        EpsGuti,
        EpsMobileIdentity,
        EmmSecurityContext,
        SecurityContextType,
        NasCount,
        NasDirection,
        NasMessage,
        NasMessageBody,
        NasSecurityHeader,
        DecodeStatus,
        Decrypted,
        build_emm_message,
        parse_emm_message,
        nas_message_decode,
        nas_message_decrypt,
        nas_message_encode,
        nas_message_encrypt,
    };
}
