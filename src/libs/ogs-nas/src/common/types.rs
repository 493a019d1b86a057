//! Common NAS types
//!
//! Based on 3GPP TS 24.007 and TS 24.301

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::error::{NasError, NasResult};

/// Fail with `BufferTooShort` unless `buf` holds at least `needed` bytes
pub(crate) fn ensure_remaining(buf: &Bytes, needed: usize) -> NasResult<()> {
    if buf.remaining() < needed {
        return Err(NasError::BufferTooShort { expected: needed, actual: buf.remaining() });
    }
    Ok(())
}

/// Read a one-octet length followed by that many octets
pub(crate) fn decode_lv(buf: &mut Bytes) -> NasResult<Bytes> {
    ensure_remaining(buf, 1)?;
    let len = buf.get_u8() as usize;
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Read a two-octet length followed by that many octets
pub(crate) fn decode_lve(buf: &mut Bytes) -> NasResult<Bytes> {
    ensure_remaining(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Protocol discriminator values (TS 24.007 Section 11.2.3.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProtocolDiscriminator {
    /// EPS Session Management (ESM)
    EpsSessionManagement = 0x02,
    /// EPS Mobility Management (EMM)
    EpsMobilityManagement = 0x07,
}

impl TryFrom<u8> for ProtocolDiscriminator {
    type Error = NasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0x0f {
            0x02 => Ok(Self::EpsSessionManagement),
            0x07 => Ok(Self::EpsMobilityManagement),
            _ => Err(NasError::InvalidProtocolDiscriminator(value)),
        }
    }
}

/// Security header type (TS 24.301 Section 9.3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SecurityHeaderType {
    /// Plain NAS message, not security protected
    #[default]
    PlainNas = 0,
    /// Integrity protected
    IntegrityProtected = 1,
    /// Integrity protected and ciphered
    IntegrityProtectedAndCiphered = 2,
    /// Integrity protected with new EPS security context
    IntegrityProtectedWithNewEpsSecurityContext = 3,
    /// Integrity protected and ciphered with new EPS security context
    IntegrityProtectedAndCipheredWithNewEpsSecurityContext = 4,
    /// Security header for the SERVICE REQUEST message
    ServiceRequest = 12,
}

impl SecurityHeaderType {
    /// Whether a 6-octet security protected header precedes the message
    pub fn is_protected(self) -> bool {
        matches!(
            self,
            Self::IntegrityProtected
                | Self::IntegrityProtectedAndCiphered
                | Self::IntegrityProtectedWithNewEpsSecurityContext
                | Self::IntegrityProtectedAndCipheredWithNewEpsSecurityContext
        )
    }

    /// Whether the payload is ciphered
    pub fn is_ciphered(self) -> bool {
        matches!(
            self,
            Self::IntegrityProtectedAndCiphered
                | Self::IntegrityProtectedAndCipheredWithNewEpsSecurityContext
        )
    }

    /// Whether the header announces a new EPS security context
    pub fn is_new_context(self) -> bool {
        matches!(
            self,
            Self::IntegrityProtectedWithNewEpsSecurityContext
                | Self::IntegrityProtectedAndCipheredWithNewEpsSecurityContext
        )
    }
}

impl TryFrom<u8> for SecurityHeaderType {
    type Error = NasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::PlainNas),
            1 => Ok(Self::IntegrityProtected),
            2 => Ok(Self::IntegrityProtectedAndCiphered),
            3 => Ok(Self::IntegrityProtectedWithNewEpsSecurityContext),
            4 => Ok(Self::IntegrityProtectedAndCipheredWithNewEpsSecurityContext),
            12 => Ok(Self::ServiceRequest),
            _ => Err(NasError::InvalidSecurityHeaderType(value)),
        }
    }
}

/// PLMN ID (MCC + MNC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlmnId {
    /// Mobile Country Code (3 digits)
    pub mcc: [u8; 3],
    /// Mobile Network Code (2 or 3 digits)
    pub mnc: [u8; 3],
    /// MNC length (2 or 3)
    pub mnc_len: u8,
}

impl PlmnId {
    /// Create a new PLMN ID
    pub fn new(mcc: [u8; 3], mnc: [u8; 3], mnc_len: u8) -> Self {
        Self { mcc, mnc, mnc_len }
    }

    /// Encode as the 3-octet BCD form
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.mcc[1] << 4) | (self.mcc[0] & 0x0f));
        let mnc3 = if self.mnc_len == 2 { 0x0f } else { self.mnc[2] & 0x0f };
        buf.put_u8((mnc3 << 4) | (self.mcc[2] & 0x0f));
        buf.put_u8((self.mnc[1] << 4) | (self.mnc[0] & 0x0f));
    }

    /// Decode from the 3-octet BCD form
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 3)?;
        let b0 = buf.get_u8();
        let b1 = buf.get_u8();
        let b2 = buf.get_u8();

        let mnc3 = b1 >> 4;
        let mnc_len = if mnc3 == 0x0f { 2 } else { 3 };
        Ok(Self {
            mcc: [b0 & 0x0f, b0 >> 4, b1 & 0x0f],
            mnc: [b2 & 0x0f, b2 >> 4, if mnc_len == 3 { mnc3 } else { 0 }],
            mnc_len,
        })
    }
}

/// NAS key set identifier (TS 24.301 Section 9.9.3.21)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySetIdentifier {
    /// Type of security context flag (0 native, 1 mapped)
    pub tsc: u8,
    /// Key set identifier value (0-6, 7 = no key available)
    pub value: u8,
}

impl KeySetIdentifier {
    /// No key is available
    pub const NO_KEY_AVAILABLE: u8 = 7;

    /// Create a new key set identifier
    pub fn new(tsc: u8, value: u8) -> Self {
        Self { tsc: tsc & 0x01, value: value & 0x07 }
    }

    /// Encode to a half octet
    pub fn encode(&self) -> u8 {
        (self.tsc << 3) | self.value
    }

    /// Decode from a half octet
    pub fn decode(half: u8) -> Self {
        Self::new((half >> 3) & 0x01, half & 0x07)
    }

    /// Whether the value designates a usable key set
    pub fn is_available(&self) -> bool {
        self.value != Self::NO_KEY_AVAILABLE
    }
}

/// NAS security algorithms (TS 24.301 Section 9.9.3.23)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityAlgorithms {
    /// Type of ciphering algorithm (EEA)
    pub ciphering: u8,
    /// Type of integrity protection algorithm (EIA)
    pub integrity: u8,
}

impl SecurityAlgorithms {
    /// EEA0 null ciphering
    pub const EEA0: u8 = 0;
    /// 128-EEA1 (SNOW 3G)
    pub const EEA1: u8 = 1;
    /// 128-EEA2 (AES)
    pub const EEA2: u8 = 2;
    /// 128-EEA3 (ZUC)
    pub const EEA3: u8 = 3;

    /// EIA0 null integrity
    pub const EIA0: u8 = 0;
    /// 128-EIA1 (SNOW 3G)
    pub const EIA1: u8 = 1;
    /// 128-EIA2 (AES)
    pub const EIA2: u8 = 2;
    /// 128-EIA3 (ZUC)
    pub const EIA3: u8 = 3;

    /// Create a new algorithm pair
    pub fn new(ciphering: u8, integrity: u8) -> Self {
        Self { ciphering: ciphering & 0x07, integrity: integrity & 0x07 }
    }

    /// Encode to one octet
    pub fn encode(&self) -> u8 {
        (self.ciphering << 4) | self.integrity
    }

    /// Decode from one octet
    pub fn decode(byte: u8) -> Self {
        Self::new((byte >> 4) & 0x07, byte & 0x07)
    }
}

/// GPRS timer (TS 24.008 Section 10.5.7.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GprsTimer {
    /// Timer unit
    pub unit: u8,
    /// Timer value
    pub value: u8,
}

impl GprsTimer {
    /// Value is incremented in multiples of 2 seconds
    pub const UNIT_2_SECONDS: u8 = 0;
    /// Value is incremented in multiples of 1 minute
    pub const UNIT_1_MINUTE: u8 = 1;
    /// Value is incremented in multiples of decihours
    pub const UNIT_DECIHOURS: u8 = 2;
    /// Timer is deactivated
    pub const UNIT_DEACTIVATED: u8 = 7;

    pub fn new(unit: u8, value: u8) -> Self {
        Self { unit: unit & 0x07, value: value & 0x1f }
    }

    pub fn encode(&self) -> u8 {
        (self.unit << 5) | self.value
    }

    pub fn decode(byte: u8) -> Self {
        Self::new(byte >> 5, byte & 0x1f)
    }
}
