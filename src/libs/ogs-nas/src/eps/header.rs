//! EPS NAS message headers
//!
//! Based on 3GPP TS 24.301 Section 9.1 to 9.3

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::common::types::{ensure_remaining, ProtocolDiscriminator, SecurityHeaderType};
use crate::error::{NasError, NasResult};

/// Plain EMM header length (security header type/PD + message type)
pub const EPS_NAS_EMM_HEADER_LEN: usize = 2;

/// Security protected NAS message header length
pub const NAS_MESSAGE_SECURITY_HEADER_SIZE: usize = 6;

/// SERVICE REQUEST message length
pub const NAS_SERVICE_REQUEST_SIZE: usize = 4;

/// EMM message types (TS 24.301 Section 9.8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EmmMessageType {
    AttachRequest = 0x41,
    AttachAccept = 0x42,
    AttachComplete = 0x43,
    AttachReject = 0x44,
    DetachRequest = 0x45,
    DetachAccept = 0x46,
    TrackingAreaUpdateRequest = 0x48,
    TrackingAreaUpdateAccept = 0x49,
    TrackingAreaUpdateComplete = 0x4a,
    TrackingAreaUpdateReject = 0x4b,
    ExtendedServiceRequest = 0x4c,
    ServiceReject = 0x4e,
    GutiReallocationCommand = 0x50,
    GutiReallocationComplete = 0x51,
    AuthenticationRequest = 0x52,
    AuthenticationResponse = 0x53,
    AuthenticationReject = 0x54,
    IdentityRequest = 0x55,
    IdentityResponse = 0x56,
    AuthenticationFailure = 0x5c,
    SecurityModeCommand = 0x5d,
    SecurityModeComplete = 0x5e,
    SecurityModeReject = 0x5f,
    EmmStatus = 0x60,
    EmmInformation = 0x61,
    DownlinkNasTransport = 0x62,
    UplinkNasTransport = 0x63,
    CsServiceNotification = 0x64,
}

impl TryFrom<u8> for EmmMessageType {
    type Error = NasError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x41 => Ok(Self::AttachRequest),
            0x42 => Ok(Self::AttachAccept),
            0x43 => Ok(Self::AttachComplete),
            0x44 => Ok(Self::AttachReject),
            0x45 => Ok(Self::DetachRequest),
            0x46 => Ok(Self::DetachAccept),
            0x48 => Ok(Self::TrackingAreaUpdateRequest),
            0x49 => Ok(Self::TrackingAreaUpdateAccept),
            0x4a => Ok(Self::TrackingAreaUpdateComplete),
            0x4b => Ok(Self::TrackingAreaUpdateReject),
            0x4c => Ok(Self::ExtendedServiceRequest),
            0x4e => Ok(Self::ServiceReject),
            0x50 => Ok(Self::GutiReallocationCommand),
            0x51 => Ok(Self::GutiReallocationComplete),
            0x52 => Ok(Self::AuthenticationRequest),
            0x53 => Ok(Self::AuthenticationResponse),
            0x54 => Ok(Self::AuthenticationReject),
            0x55 => Ok(Self::IdentityRequest),
            0x56 => Ok(Self::IdentityResponse),
            0x5c => Ok(Self::AuthenticationFailure),
            0x5d => Ok(Self::SecurityModeCommand),
            0x5e => Ok(Self::SecurityModeComplete),
            0x5f => Ok(Self::SecurityModeReject),
            0x60 => Ok(Self::EmmStatus),
            0x61 => Ok(Self::EmmInformation),
            0x62 => Ok(Self::DownlinkNasTransport),
            0x63 => Ok(Self::UplinkNasTransport),
            0x64 => Ok(Self::CsServiceNotification),
            _ => Err(NasError::InvalidMessageType(value)),
        }
    }
}

/// Plain EMM message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpsNasEmmHeader {
    /// Security header type (always 0 for a plain message)
    pub security_header_type: u8,
    /// Protocol discriminator
    pub protocol_discriminator: u8,
    /// Message type
    pub message_type: u8,
}

impl EpsNasEmmHeader {
    /// Create a plain EMM header
    pub fn new(message_type: EmmMessageType) -> Self {
        Self {
            security_header_type: SecurityHeaderType::PlainNas as u8,
            protocol_discriminator: ProtocolDiscriminator::EpsMobilityManagement as u8,
            message_type: message_type as u8,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.security_header_type << 4) | (self.protocol_discriminator & 0x0f));
        buf.put_u8(self.message_type);
    }

    /// Decode and check the protocol discriminator
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, EPS_NAS_EMM_HEADER_LEN)?;
        let first = buf.get_u8();
        let protocol_discriminator = first & 0x0f;
        if protocol_discriminator != ProtocolDiscriminator::EpsMobilityManagement as u8 {
            return Err(NasError::InvalidProtocolDiscriminator(protocol_discriminator));
        }
        Ok(Self {
            security_header_type: first >> 4,
            protocol_discriminator,
            message_type: buf.get_u8(),
        })
    }
}

/// NAS message security header
///
/// For a plain message only the first octet is meaningful; the MAC and
/// sequence number are carried when the header type is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NasSecurityHeader {
    /// Security header type
    pub security_header_type: SecurityHeaderType,
    /// Protocol discriminator
    pub protocol_discriminator: u8,
    /// Message authentication code
    pub message_authentication_code: u32,
    /// Sequence number
    pub sequence_number: u8,
}

impl NasSecurityHeader {
    /// Header of a plain EMM message
    pub fn plain() -> Self {
        Self {
            security_header_type: SecurityHeaderType::PlainNas,
            protocol_discriminator: ProtocolDiscriminator::EpsMobilityManagement as u8,
            ..Default::default()
        }
    }

    /// Header for the given security header type, MAC left at zero
    pub fn new(security_header_type: SecurityHeaderType, sequence_number: u8) -> Self {
        Self {
            security_header_type,
            protocol_discriminator: ProtocolDiscriminator::EpsMobilityManagement as u8,
            message_authentication_code: 0,
            sequence_number,
        }
    }

    /// Encode the 6-octet protected header
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(((self.security_header_type as u8) << 4) | (self.protocol_discriminator & 0x0f));
        buf.put_u32(self.message_authentication_code);
        buf.put_u8(self.sequence_number);
    }

    /// Decode the 6-octet protected header
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, NAS_MESSAGE_SECURITY_HEADER_SIZE)?;
        let first = buf.get_u8();
        Ok(Self {
            security_header_type: SecurityHeaderType::try_from(first >> 4)?,
            protocol_discriminator: first & 0x0f,
            message_authentication_code: buf.get_u32(),
            sequence_number: buf.get_u8(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emm_header_roundtrip() {
        let header = EpsNasEmmHeader::new(EmmMessageType::AttachRequest);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[0x07, 0x41]);
        assert_eq!(EpsNasEmmHeader::decode(&mut buf.freeze()).unwrap(), header);
    }

    #[test]
    fn test_emm_header_rejects_esm() {
        let mut buf = Bytes::from_static(&[0x02, 0xd0]);
        assert_eq!(
            EpsNasEmmHeader::decode(&mut buf),
            Err(NasError::InvalidProtocolDiscriminator(0x02))
        );
    }

    #[test]
    fn test_security_header_encode() {
        let header = NasSecurityHeader {
            security_header_type: SecurityHeaderType::IntegrityProtectedAndCiphered,
            protocol_discriminator: 0x07,
            message_authentication_code: 0x11223344,
            sequence_number: 5,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[0x27, 0x11, 0x22, 0x33, 0x44, 0x05]);
        assert_eq!(NasSecurityHeader::decode(&mut buf.freeze()).unwrap(), header);
    }

    #[test]
    fn test_message_type_unknown() {
        assert_eq!(
            EmmMessageType::try_from(0x47),
            Err(NasError::InvalidMessageType(0x47))
        );
    }
}
