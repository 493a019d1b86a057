//! NextGCore EMMAS-SAP
//!
//! Service access point between the EPS Mobility Management sublayer and
//! the access stratum (S1AP on the MME side).
//!
//! Inbound NAS PDUs are deciphered, integrity checked, decoded and routed
//! to the EMM procedures. Outbound EMM primitives get a security header
//! chosen from the UE security context, are encoded or ciphered and handed
//! to the access stratum transport.
//!
//! # Example
//!
//! ```rust
//! use ogs_emmas::{select_security_header, EmmAsSecurityData, HeaderVariant};
//!
//! // A fresh context with both keys gets the ciphered "new context" header
//! let sctx = EmmAsSecurityData {
//!     is_new: true,
//!     ksi: 0,
//!     k_int: Some([0x11; 16]),
//!     k_enc: Some([0x22; 16]),
//!     ..Default::default()
//! };
//! assert_eq!(
//!     select_security_header(Some(&sctx)),
//!     Some(HeaderVariant::IntegrityProtectedCipheredNew)
//! );
//!
//! // The same context without an integrity key may not be used at all
//! let sctx = EmmAsSecurityData { k_int: None, ..sctx };
//! assert_eq!(select_security_header(Some(&sctx)), None);
//! ```

pub mod error;
pub mod primitive;
pub mod as_message;
pub mod context;
pub mod codec;
pub mod security_header;
pub mod handler;
pub mod emm_send;
pub mod sap;
mod recv;
mod send;
mod dump;


pub use error::{EmmError, EmmResult, SapError, SapResult};
pub use primitive::*;
pub use as_message::*;
pub use context::{ContextStore, InMemoryContextStore};
pub use codec::{EpsNasCodec, NasCodec};
pub use security_header::{select_security_header, HeaderVariant};
pub use handler::{AsTransport, EmmPayload, EmmPayloadBuilder, EmmProcedures};
pub use emm_send::DefaultPayloadBuilder;
pub use sap::EmmAs;
pub use dump::nas_log_dump;
