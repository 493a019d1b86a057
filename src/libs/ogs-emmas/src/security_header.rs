//! Security header selection for outbound messages
//!
//! TS 24.301 Section 4.4.4: once a security context exists, messages are
//! integrity protected; a context being taken into use is announced with
//! the "new EPS security context" header types.

use ogs_nas::common::types::{KeySetIdentifier, SecurityHeaderType};
use ogs_nas::eps::NasSecurityHeader;

use crate::primitive::EmmAsSecurityData;

/// Header variant chosen for an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderVariant {
    NotProtected,
    IntegrityProtected,
    IntegrityProtectedCiphered,
    IntegrityProtectedNew,
    IntegrityProtectedCipheredNew,
}

impl HeaderVariant {
    pub fn security_header_type(self) -> SecurityHeaderType {
        match self {
            Self::NotProtected => SecurityHeaderType::PlainNas,
            Self::IntegrityProtected => SecurityHeaderType::IntegrityProtected,
            Self::IntegrityProtectedCiphered => SecurityHeaderType::IntegrityProtectedAndCiphered,
            Self::IntegrityProtectedNew => {
                SecurityHeaderType::IntegrityProtectedWithNewEpsSecurityContext
            }
            Self::IntegrityProtectedCipheredNew => {
                SecurityHeaderType::IntegrityProtectedAndCipheredWithNewEpsSecurityContext
            }
        }
    }

    /// NAS header for this variant; the sequence number is stamped later
    pub fn header(self) -> NasSecurityHeader {
        NasSecurityHeader::new(self.security_header_type(), 0)
    }
}

/// Select the header variant for a message sent under `sctx`
///
/// Returns `None` when a new context is to be taken into use without an
/// integrity key: such a message must not be sent at all. A context that is
/// not new but lacks the integrity key falls back to a plain message.
pub fn select_security_header(sctx: Option<&EmmAsSecurityData>) -> Option<HeaderVariant> {
    let sctx = match sctx {
        Some(sctx) if sctx.ksi != KeySetIdentifier::NO_KEY_AVAILABLE => sctx,
        _ => return Some(HeaderVariant::NotProtected),
    };

    let ciphered = sctx.k_enc.is_some();
    match (sctx.is_new, sctx.k_int.is_some()) {
        (true, true) if ciphered => Some(HeaderVariant::IntegrityProtectedCipheredNew),
        (true, true) => Some(HeaderVariant::IntegrityProtectedNew),
        (true, false) => None,
        (false, true) if ciphered => Some(HeaderVariant::IntegrityProtectedCiphered),
        (false, true) => Some(HeaderVariant::IntegrityProtected),
        (false, false) => Some(HeaderVariant::NotProtected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sctx(is_new: bool, k_int: bool, k_enc: bool) -> EmmAsSecurityData {
        EmmAsSecurityData {
            is_new,
            ksi: 1,
            k_int: k_int.then_some([1; 16]),
            k_enc: k_enc.then_some([2; 16]),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_context_is_plain() {
        assert_eq!(select_security_header(None), Some(HeaderVariant::NotProtected));
        let no_key = EmmAsSecurityData { ksi: KeySetIdentifier::NO_KEY_AVAILABLE, ..sctx(true, true, true) };
        assert_eq!(select_security_header(Some(&no_key)), Some(HeaderVariant::NotProtected));
    }

    #[test]
    fn test_new_context() {
        assert_eq!(
            select_security_header(Some(&sctx(true, true, true))),
            Some(HeaderVariant::IntegrityProtectedCipheredNew)
        );
        assert_eq!(
            select_security_header(Some(&sctx(true, true, false))),
            Some(HeaderVariant::IntegrityProtectedNew)
        );
    }

    #[test]
    fn test_new_context_without_integrity_key_is_denied() {
        assert_eq!(select_security_header(Some(&sctx(true, false, true))), None);
        assert_eq!(select_security_header(Some(&sctx(true, false, false))), None);
    }

    #[test]
    fn test_current_context() {
        assert_eq!(
            select_security_header(Some(&sctx(false, true, true))),
            Some(HeaderVariant::IntegrityProtectedCiphered)
        );
        assert_eq!(
            select_security_header(Some(&sctx(false, true, false))),
            Some(HeaderVariant::IntegrityProtected)
        );
    }

    #[test]
    fn test_current_context_without_integrity_key_degrades() {
        let variant = select_security_header(Some(&sctx(false, false, true)));
        assert_eq!(variant, Some(HeaderVariant::NotProtected));
        assert_eq!(
            variant.map(HeaderVariant::security_header_type),
            Some(SecurityHeaderType::PlainNas)
        );
    }

    #[test]
    fn test_header_types() {
        assert_eq!(
            HeaderVariant::IntegrityProtectedCipheredNew.header().security_header_type as u8,
            4
        );
        assert_eq!(HeaderVariant::NotProtected.header().security_header_type as u8, 0);
    }
}
