//! EPS EMM messages
//!
//! Based on 3GPP TS 24.301 Section 8.2

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::common::types::*;
use crate::error::{NasError, NasResult};
use super::header::*;
use super::types::*;

// ============================================================================
// Optional IE handling
// ============================================================================

/// Format of an optional IE, enough to skip it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IeFormat {
    /// Type 1: IEI and value share one octet
    HalfOctet,
    /// Type 3: IEI followed by a fixed number of value octets
    Fixed(usize),
    /// Type 4: IEI, one-octet length, value
    Tlv,
    /// Type 6: IEI, two-octet length, value
    TlvE,
}

/// Read the next IEI, or `None` at end of message
fn next_iei(buf: &Bytes) -> Option<u8> {
    buf.chunk().first().copied()
}

/// Take the value part of an optional IE, consuming IEI and length
fn take_optional(buf: &mut Bytes, format: IeFormat) -> NasResult<Bytes> {
    match format {
        IeFormat::HalfOctet => {
            ensure_remaining(buf, 1)?;
            Ok(buf.copy_to_bytes(1))
        }
        IeFormat::Fixed(len) => {
            ensure_remaining(buf, 1 + len)?;
            buf.advance(1);
            Ok(buf.copy_to_bytes(len))
        }
        IeFormat::Tlv => {
            ensure_remaining(buf, 1)?;
            buf.advance(1);
            decode_lv(buf)
        }
        IeFormat::TlvE => {
            ensure_remaining(buf, 1)?;
            buf.advance(1);
            decode_lve(buf)
        }
    }
}

/// Optional IEs of the UE-originated registration messages that are
/// recognised but not kept
fn registration_ie_format(iei: u8) -> Option<IeFormat> {
    match iei {
        0x13 => Some(IeFormat::Fixed(5)), // Old location area identification
        0x11 | 0x20 | 0x40 | 0x5d | 0x10 | 0x6a | 0x5e | 0x6e | 0x31 => Some(IeFormat::Tlv),
        0x55 => Some(IeFormat::Fixed(4)), // NonceUE
        _ => match iei & 0xf0 {
            0x90 | 0xa0 | 0xb0 | 0xc0 | 0xd0 | 0xe0 | 0xf0 => Some(IeFormat::HalfOctet),
            _ => None,
        },
    }
}

/// Format assumed for an IEI that is not understood (TS 24.007 Section
/// 11.2.4): one octet when bit 8 is set, TLV otherwise
fn unknown_ie_format(iei: u8) -> IeFormat {
    if iei & 0x80 != 0 {
        IeFormat::HalfOctet
    } else {
        IeFormat::Tlv
    }
}

/// Skip an optional IE of a registration message, remembering the first
/// IEI that is not understood
fn skip_registration_ie(buf: &mut Bytes, iei: u8, unexpected_iei: &mut Option<u8>) -> NasResult<()> {
    let format = match registration_ie_format(iei) {
        Some(format) => format,
        None => {
            unexpected_iei.get_or_insert(iei);
            unknown_ie_format(iei)
        }
    };
    take_optional(buf, format)?;
    Ok(())
}

fn put_tlv(buf: &mut BytesMut, iei: u8, value: &[u8]) {
    buf.put_u8(iei);
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
}

fn fixed<const N: usize>(value: &Bytes) -> NasResult<[u8; N]> {
    if value.len() != N {
        return Err(NasError::InvalidIeLength { expected: N, actual: value.len() });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(value);
    Ok(out)
}

fn decode_cause(buf: &mut Bytes) -> NasResult<EmmCause> {
    ensure_remaining(buf, 1)?;
    Ok(EmmCause::from(buf.get_u8()))
}

// ============================================================================
// Messages
// ============================================================================

/// EMM message
#[derive(Debug, Clone, PartialEq)]
pub enum EmmMessage {
    AttachRequest(AttachRequest),
    AttachAccept(AttachAccept),
    AttachComplete(AttachComplete),
    AttachReject(AttachReject),
    DetachRequest(DetachRequest),
    DetachAccept,
    TrackingAreaUpdateRequest(TrackingAreaUpdateRequest),
    TrackingAreaUpdateComplete,
    TrackingAreaUpdateReject(TrackingAreaUpdateReject),
    ServiceRequest(ServiceRequest),
    ExtendedServiceRequest(ExtendedServiceRequest),
    GutiReallocationComplete,
    AuthenticationRequest(AuthenticationRequest),
    AuthenticationResponse(AuthenticationResponse),
    AuthenticationReject,
    AuthenticationFailure(AuthenticationFailure),
    SecurityModeCommand(SecurityModeCommand),
    SecurityModeComplete(SecurityModeComplete),
    SecurityModeReject(SecurityModeReject),
    IdentityRequest(IdentityRequest),
    IdentityResponse(IdentityResponse),
    EmmStatus(EmmStatus),
    UplinkNasTransport(UplinkNasTransport),
}

impl EmmMessage {
    /// Message type octet; SERVICE REQUEST has none
    pub fn message_type(&self) -> Option<EmmMessageType> {
        let message_type = match self {
            Self::AttachRequest(_) => EmmMessageType::AttachRequest,
            Self::AttachAccept(_) => EmmMessageType::AttachAccept,
            Self::AttachComplete(_) => EmmMessageType::AttachComplete,
            Self::AttachReject(_) => EmmMessageType::AttachReject,
            Self::DetachRequest(_) => EmmMessageType::DetachRequest,
            Self::DetachAccept => EmmMessageType::DetachAccept,
            Self::TrackingAreaUpdateRequest(_) => EmmMessageType::TrackingAreaUpdateRequest,
            Self::TrackingAreaUpdateComplete => EmmMessageType::TrackingAreaUpdateComplete,
            Self::TrackingAreaUpdateReject(_) => EmmMessageType::TrackingAreaUpdateReject,
            Self::ServiceRequest(_) => return None,
            Self::ExtendedServiceRequest(_) => EmmMessageType::ExtendedServiceRequest,
            Self::GutiReallocationComplete => EmmMessageType::GutiReallocationComplete,
            Self::AuthenticationRequest(_) => EmmMessageType::AuthenticationRequest,
            Self::AuthenticationResponse(_) => EmmMessageType::AuthenticationResponse,
            Self::AuthenticationReject => EmmMessageType::AuthenticationReject,
            Self::AuthenticationFailure(_) => EmmMessageType::AuthenticationFailure,
            Self::SecurityModeCommand(_) => EmmMessageType::SecurityModeCommand,
            Self::SecurityModeComplete(_) => EmmMessageType::SecurityModeComplete,
            Self::SecurityModeReject(_) => EmmMessageType::SecurityModeReject,
            Self::IdentityRequest(_) => EmmMessageType::IdentityRequest,
            Self::IdentityResponse(_) => EmmMessageType::IdentityResponse,
            Self::EmmStatus(_) => EmmMessageType::EmmStatus,
            Self::UplinkNasTransport(_) => EmmMessageType::UplinkNasTransport,
        };
        Some(message_type)
    }

    /// Message name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttachRequest(_) => "Attach request",
            Self::AttachAccept(_) => "Attach accept",
            Self::AttachComplete(_) => "Attach complete",
            Self::AttachReject(_) => "Attach reject",
            Self::DetachRequest(_) => "Detach request",
            Self::DetachAccept => "Detach accept",
            Self::TrackingAreaUpdateRequest(_) => "Tracking area update request",
            Self::TrackingAreaUpdateComplete => "Tracking area update complete",
            Self::TrackingAreaUpdateReject(_) => "Tracking area update reject",
            Self::ServiceRequest(_) => "Service request",
            Self::ExtendedServiceRequest(_) => "Extended service request",
            Self::GutiReallocationComplete => "GUTI reallocation complete",
            Self::AuthenticationRequest(_) => "Authentication request",
            Self::AuthenticationResponse(_) => "Authentication response",
            Self::AuthenticationReject => "Authentication reject",
            Self::AuthenticationFailure(_) => "Authentication failure",
            Self::SecurityModeCommand(_) => "Security mode command",
            Self::SecurityModeComplete(_) => "Security mode complete",
            Self::SecurityModeReject(_) => "Security mode reject",
            Self::IdentityRequest(_) => "Identity request",
            Self::IdentityResponse(_) => "Identity response",
            Self::EmmStatus(_) => "EMM status",
            Self::UplinkNasTransport(_) => "Uplink NAS transport",
        }
    }
}

/// Attach Request message (TS 24.301 Section 8.2.4)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttachRequest {
    pub eps_attach_type: EpsAttachType,
    pub nas_key_set_identifier: KeySetIdentifier,
    pub eps_mobile_identity: EpsMobileIdentity,
    pub ue_network_capability: UeNetworkCapability,
    pub esm_message_container: EsmMessageContainer,
    pub old_p_tmsi_signature: Option<[u8; 3]>,
    pub additional_guti: Option<EpsMobileIdentity>,
    pub last_visited_registered_tai: Option<EpsTai>,
    pub drx_parameter: Option<[u8; 2]>,
    /// First optional IEI that was not understood and skipped
    pub unexpected_iei: Option<u8>,
}

impl AttachRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.nas_key_set_identifier.encode() << 4) | self.eps_attach_type as u8);
        self.eps_mobile_identity.encode(buf);
        self.ue_network_capability.encode(buf);
        self.esm_message_container.encode(buf);
        if let Some(sig) = &self.old_p_tmsi_signature {
            buf.put_u8(0x19);
            buf.put_slice(sig);
        }
        if let Some(guti) = &self.additional_guti {
            buf.put_u8(0x50);
            guti.encode(buf);
        }
        if let Some(tai) = &self.last_visited_registered_tai {
            buf.put_u8(0x52);
            tai.plmn_id.encode(buf);
            buf.put_u16(tai.tac);
        }
        if let Some(drx) = &self.drx_parameter {
            buf.put_u8(0x5c);
            buf.put_slice(drx);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 1)?;
        let first = buf.get_u8();
        let mut msg = Self {
            eps_attach_type: EpsAttachType::decode(first & 0x0f),
            nas_key_set_identifier: KeySetIdentifier::decode(first >> 4),
            eps_mobile_identity: EpsMobileIdentity::decode(buf)?,
            ue_network_capability: UeNetworkCapability::decode(buf)?,
            esm_message_container: EsmMessageContainer::decode(buf)?,
            ..Default::default()
        };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0x19 => {
                    let value = take_optional(buf, IeFormat::Fixed(3))?;
                    msg.old_p_tmsi_signature = Some(fixed(&value)?);
                }
                0x50 => {
                    buf.advance(1);
                    msg.additional_guti = Some(EpsMobileIdentity::decode(buf)?);
                }
                0x52 => {
                    let mut value = take_optional(buf, IeFormat::Fixed(5))?;
                    let plmn_id = PlmnId::decode(&mut value)?;
                    msg.last_visited_registered_tai = Some(EpsTai { plmn_id, tac: value.get_u16() });
                }
                0x5c => {
                    let value = take_optional(buf, IeFormat::Fixed(2))?;
                    msg.drx_parameter = Some(fixed(&value)?);
                }
                _ => skip_registration_ie(buf, iei, &mut msg.unexpected_iei)?,
            }
        }

        Ok(msg)
    }
}

/// Attach Accept message (TS 24.301 Section 8.2.1)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttachAccept {
    pub eps_attach_result: EpsAttachResult,
    pub t3412_value: GprsTimer,
    pub tai_list: EpsTaiList,
    pub esm_message_container: EsmMessageContainer,
    pub guti: Option<EpsGuti>,
    pub emm_cause: Option<EmmCause>,
    pub t3402_value: Option<GprsTimer>,
}

impl AttachAccept {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.eps_attach_result as u8);
        buf.put_u8(self.t3412_value.encode());
        self.tai_list.encode(buf);
        self.esm_message_container.encode(buf);
        if let Some(guti) = self.guti {
            buf.put_u8(0x50);
            EpsMobileIdentity::Guti(guti).encode(buf);
        }
        if let Some(cause) = self.emm_cause {
            buf.put_u8(0x53);
            buf.put_u8(cause as u8);
        }
        if let Some(t3402) = self.t3402_value {
            buf.put_u8(0x17);
            buf.put_u8(t3402.encode());
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 2)?;
        let eps_attach_result = EpsAttachResult::decode(buf.get_u8());
        let t3412_value = GprsTimer::decode(buf.get_u8());
        let mut msg = Self {
            eps_attach_result,
            t3412_value,
            tai_list: EpsTaiList::decode(buf)?,
            esm_message_container: EsmMessageContainer::decode(buf)?,
            ..Default::default()
        };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0x50 => {
                    buf.advance(1);
                    let identity = EpsMobileIdentity::decode(buf)?;
                    msg.guti = identity.guti().copied();
                }
                0x53 => {
                    let value = take_optional(buf, IeFormat::Fixed(1))?;
                    msg.emm_cause = Some(EmmCause::from(value[0]));
                }
                0x17 => {
                    let value = take_optional(buf, IeFormat::Fixed(1))?;
                    msg.t3402_value = Some(GprsTimer::decode(value[0]));
                }
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }

        Ok(msg)
    }
}

/// Attach Complete message (TS 24.301 Section 8.2.2)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttachComplete {
    pub esm_message_container: EsmMessageContainer,
}

/// Attach Reject message (TS 24.301 Section 8.2.3)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttachReject {
    pub emm_cause: EmmCause,
    pub esm_message_container: Option<EsmMessageContainer>,
    pub t3346_value: Option<u8>,
    pub t3402_value: Option<u8>,
}

impl AttachReject {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.emm_cause as u8);
        if let Some(esm) = &self.esm_message_container {
            buf.put_u8(0x78);
            esm.encode(buf);
        }
        if let Some(t3346) = self.t3346_value {
            put_tlv(buf, 0x5f, &[t3346]);
        }
        if let Some(t3402) = self.t3402_value {
            put_tlv(buf, 0x16, &[t3402]);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut msg = Self { emm_cause: decode_cause(buf)?, ..Default::default() };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0x78 => {
                    buf.advance(1);
                    msg.esm_message_container = Some(EsmMessageContainer::decode(buf)?);
                }
                0x5f => msg.t3346_value = Some(fixed::<1>(&take_optional(buf, IeFormat::Tlv)?)?[0]),
                0x16 => msg.t3402_value = Some(fixed::<1>(&take_optional(buf, IeFormat::Tlv)?)?[0]),
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }

        Ok(msg)
    }
}

/// Detach Request message, UE originating (TS 24.301 Section 8.2.11.1)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetachRequest {
    /// Detach type (switch off flag and type of detach)
    pub detach_type: u8,
    pub nas_key_set_identifier: KeySetIdentifier,
    pub eps_mobile_identity: EpsMobileIdentity,
}

impl DetachRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.nas_key_set_identifier.encode() << 4) | (self.detach_type & 0x0f));
        self.eps_mobile_identity.encode(buf);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 1)?;
        let first = buf.get_u8();
        Ok(Self {
            detach_type: first & 0x0f,
            nas_key_set_identifier: KeySetIdentifier::decode(first >> 4),
            eps_mobile_identity: EpsMobileIdentity::decode(buf)?,
        })
    }

    /// Switch off bit of the detach type
    pub fn switch_off(&self) -> bool {
        self.detach_type & 0x08 != 0
    }
}

/// Tracking Area Update Request message (TS 24.301 Section 8.2.29)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackingAreaUpdateRequest {
    pub eps_update_type: u8,
    pub nas_key_set_identifier: KeySetIdentifier,
    pub old_guti: EpsMobileIdentity,
    pub ue_network_capability: Option<UeNetworkCapability>,
    pub last_visited_registered_tai: Option<EpsTai>,
    pub eps_bearer_context_status: Option<[u8; 2]>,
    /// First optional IEI that was not understood and skipped
    pub unexpected_iei: Option<u8>,
}

impl TrackingAreaUpdateRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.nas_key_set_identifier.encode() << 4) | (self.eps_update_type & 0x0f));
        self.old_guti.encode(buf);
        if let Some(cap) = &self.ue_network_capability {
            buf.put_u8(0x58);
            cap.encode(buf);
        }
        if let Some(tai) = &self.last_visited_registered_tai {
            buf.put_u8(0x52);
            tai.plmn_id.encode(buf);
            buf.put_u16(tai.tac);
        }
        if let Some(status) = &self.eps_bearer_context_status {
            put_tlv(buf, 0x57, status);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 1)?;
        let first = buf.get_u8();
        let mut msg = Self {
            eps_update_type: first & 0x0f,
            nas_key_set_identifier: KeySetIdentifier::decode(first >> 4),
            old_guti: EpsMobileIdentity::decode(buf)?,
            ..Default::default()
        };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0x58 => {
                    buf.advance(1);
                    msg.ue_network_capability = Some(UeNetworkCapability::decode(buf)?);
                }
                0x52 => {
                    let mut value = take_optional(buf, IeFormat::Fixed(5))?;
                    let plmn_id = PlmnId::decode(&mut value)?;
                    msg.last_visited_registered_tai = Some(EpsTai { plmn_id, tac: value.get_u16() });
                }
                0x57 => {
                    let value = take_optional(buf, IeFormat::Tlv)?;
                    msg.eps_bearer_context_status = Some(fixed(&value)?);
                }
                0x19 => {
                    take_optional(buf, IeFormat::Fixed(3))?;
                }
                0x50 => {
                    buf.advance(1);
                    EpsMobileIdentity::decode(buf)?;
                }
                0x5c => {
                    take_optional(buf, IeFormat::Fixed(2))?;
                }
                _ => skip_registration_ie(buf, iei, &mut msg.unexpected_iei)?,
            }
        }

        Ok(msg)
    }
}

/// Tracking Area Update Reject message (TS 24.301 Section 8.2.28)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackingAreaUpdateReject {
    pub emm_cause: EmmCause,
    pub t3346_value: Option<u8>,
}

impl TrackingAreaUpdateReject {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.emm_cause as u8);
        if let Some(t3346) = self.t3346_value {
            put_tlv(buf, 0x5f, &[t3346]);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut msg = Self { emm_cause: decode_cause(buf)?, ..Default::default() };
        while let Some(iei) = next_iei(buf) {
            match iei {
                0x5f => msg.t3346_value = Some(fixed::<1>(&take_optional(buf, IeFormat::Tlv)?)?[0]),
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }
        Ok(msg)
    }
}

/// Service Request message (TS 24.301 Section 8.2.25)
///
/// Carries its own security header type (12) in place of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceRequest {
    /// eKSI (3 bits)
    pub ksi: u8,
    /// 5 least significant bits of the uplink NAS COUNT
    pub sequence_number: u8,
    /// 2 least significant octets of the NAS-MAC
    pub short_mac: u16,
}

impl ServiceRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(((self.ksi & 0x07) << 5) | (self.sequence_number & 0x1f));
        buf.put_u16(self.short_mac);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 3)?;
        let ksi_and_sqn = buf.get_u8();
        Ok(Self {
            ksi: ksi_and_sqn >> 5,
            sequence_number: ksi_and_sqn & 0x1f,
            short_mac: buf.get_u16(),
        })
    }
}

/// Extended Service Request message (TS 24.301 Section 8.2.15)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtendedServiceRequest {
    pub service_type: u8,
    pub nas_key_set_identifier: KeySetIdentifier,
    pub m_tmsi: EpsMobileIdentity,
    pub csfb_response: Option<u8>,
    pub eps_bearer_context_status: Option<[u8; 2]>,
}

impl ExtendedServiceRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.nas_key_set_identifier.encode() << 4) | (self.service_type & 0x0f));
        self.m_tmsi.encode(buf);
        if let Some(csfb) = self.csfb_response {
            buf.put_u8(0xb0 | (csfb & 0x07));
        }
        if let Some(status) = &self.eps_bearer_context_status {
            put_tlv(buf, 0x57, status);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 1)?;
        let first = buf.get_u8();
        let mut msg = Self {
            service_type: first & 0x0f,
            nas_key_set_identifier: KeySetIdentifier::decode(first >> 4),
            m_tmsi: EpsMobileIdentity::decode(buf)?,
            ..Default::default()
        };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0xb0..=0xbf => {
                    msg.csfb_response = Some(take_optional(buf, IeFormat::HalfOctet)?[0] & 0x07);
                }
                0x57 => {
                    let value = take_optional(buf, IeFormat::Tlv)?;
                    msg.eps_bearer_context_status = Some(fixed(&value)?);
                }
                0xd0..=0xdf => {
                    take_optional(buf, IeFormat::HalfOctet)?;
                }
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }

        Ok(msg)
    }
}

/// Authentication Request message (TS 24.301 Section 8.2.7)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthenticationRequest {
    pub nas_key_set_identifier: KeySetIdentifier,
    pub rand: AuthenticationRand,
    pub autn: AuthenticationAutn,
}

impl AuthenticationRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.nas_key_set_identifier.encode());
        buf.put_slice(&self.rand);
        buf.put_u8(self.autn.len() as u8);
        buf.put_slice(&self.autn);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 17)?;
        let nas_key_set_identifier = KeySetIdentifier::decode(buf.get_u8() & 0x0f);
        let mut rand = [0u8; 16];
        buf.copy_to_slice(&mut rand);
        let autn = fixed(&decode_lv(buf)?)?;
        Ok(Self { nas_key_set_identifier, rand, autn })
    }
}

/// Authentication Response message (TS 24.301 Section 8.2.8)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthenticationResponse {
    /// Authentication response parameter (RES)
    pub res: Bytes,
}

impl AuthenticationResponse {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.res.len() as u8);
        buf.put_slice(&self.res);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let res = decode_lv(buf)?;
        if !(4..=16).contains(&res.len()) {
            return Err(NasError::InvalidIeLength { expected: 16, actual: res.len() });
        }
        Ok(Self { res })
    }
}

/// Authentication Failure message (TS 24.301 Section 8.2.5)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthenticationFailure {
    pub emm_cause: EmmCause,
    /// AUTS, present on synch failure
    pub authentication_failure_parameter: Option<Bytes>,
}

impl AuthenticationFailure {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.emm_cause as u8);
        if let Some(auts) = &self.authentication_failure_parameter {
            put_tlv(buf, 0x30, auts);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut msg = Self { emm_cause: decode_cause(buf)?, ..Default::default() };
        while let Some(iei) = next_iei(buf) {
            match iei {
                0x30 => msg.authentication_failure_parameter = Some(take_optional(buf, IeFormat::Tlv)?),
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }
        Ok(msg)
    }
}

/// Security Mode Command message (TS 24.301 Section 8.2.20)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityModeCommand {
    pub selected_nas_security_algorithms: SecurityAlgorithms,
    pub nas_key_set_identifier: KeySetIdentifier,
    pub replayed_ue_security_capabilities: UeNetworkCapability,
    pub imeisv_request: Option<u8>,
    pub replayed_nonce_ue: Option<[u8; 4]>,
    pub nonce_mme: Option<[u8; 4]>,
}

impl SecurityModeCommand {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.selected_nas_security_algorithms.encode());
        buf.put_u8(self.nas_key_set_identifier.encode());
        self.replayed_ue_security_capabilities.encode(buf);
        if let Some(imeisv) = self.imeisv_request {
            buf.put_u8(0xc0 | (imeisv & 0x07));
        }
        if let Some(nonce) = &self.replayed_nonce_ue {
            buf.put_u8(0x55);
            buf.put_slice(nonce);
        }
        if let Some(nonce) = &self.nonce_mme {
            buf.put_u8(0x56);
            buf.put_slice(nonce);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        ensure_remaining(buf, 2)?;
        let mut msg = Self {
            selected_nas_security_algorithms: SecurityAlgorithms::decode(buf.get_u8()),
            nas_key_set_identifier: KeySetIdentifier::decode(buf.get_u8() & 0x0f),
            replayed_ue_security_capabilities: UeNetworkCapability::decode(buf)?,
            ..Default::default()
        };

        while let Some(iei) = next_iei(buf) {
            match iei {
                0xc0..=0xcf => {
                    msg.imeisv_request = Some(take_optional(buf, IeFormat::HalfOctet)?[0] & 0x07);
                }
                0x55 => msg.replayed_nonce_ue = Some(fixed(&take_optional(buf, IeFormat::Fixed(4))?)?),
                0x56 => msg.nonce_mme = Some(fixed(&take_optional(buf, IeFormat::Fixed(4))?)?),
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }

        Ok(msg)
    }
}

/// Security Mode Complete message (TS 24.301 Section 8.2.21)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityModeComplete {
    pub imeisv: Option<EpsMobileIdentity>,
}

impl SecurityModeComplete {
    pub fn encode(&self, buf: &mut BytesMut) {
        if let Some(imeisv) = &self.imeisv {
            buf.put_u8(0x23);
            imeisv.encode(buf);
        }
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut msg = Self::default();
        while let Some(iei) = next_iei(buf) {
            match iei {
                0x23 => {
                    buf.advance(1);
                    msg.imeisv = Some(EpsMobileIdentity::decode(buf)?);
                }
                _ => return Err(NasError::UnexpectedIei(iei)),
            }
        }
        Ok(msg)
    }
}

/// Security Mode Reject message (TS 24.301 Section 8.2.22)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityModeReject {
    pub emm_cause: EmmCause,
}

/// Identity Request message (TS 24.301 Section 8.2.18)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityRequest {
    pub identity_type: u8,
}

/// Identity Response message (TS 24.301 Section 8.2.19)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentityResponse {
    pub mobile_identity: EpsMobileIdentity,
}

/// EMM Status message (TS 24.301 Section 8.2.14)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmmStatus {
    pub emm_cause: EmmCause,
}

/// Uplink NAS Transport message (TS 24.301 Section 8.2.30)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UplinkNasTransport {
    pub nas_message_container: NasMessageContainer,
}

// ============================================================================
// Message build / parse
// ============================================================================

/// Build an EMM message with its plain header
pub fn build_emm_message(msg: &EmmMessage) -> BytesMut {
    let mut buf = BytesMut::new();

    match msg.message_type() {
        Some(message_type) => EpsNasEmmHeader::new(message_type).encode(&mut buf),
        None => buf.put_u8(
            ((SecurityHeaderType::ServiceRequest as u8) << 4)
                | ProtocolDiscriminator::EpsMobilityManagement as u8,
        ),
    }

    match msg {
        EmmMessage::AttachRequest(m) => m.encode(&mut buf),
        EmmMessage::AttachAccept(m) => m.encode(&mut buf),
        EmmMessage::AttachComplete(m) => m.esm_message_container.encode(&mut buf),
        EmmMessage::AttachReject(m) => m.encode(&mut buf),
        EmmMessage::DetachRequest(m) => m.encode(&mut buf),
        EmmMessage::TrackingAreaUpdateRequest(m) => m.encode(&mut buf),
        EmmMessage::TrackingAreaUpdateReject(m) => m.encode(&mut buf),
        EmmMessage::ServiceRequest(m) => m.encode(&mut buf),
        EmmMessage::ExtendedServiceRequest(m) => m.encode(&mut buf),
        EmmMessage::AuthenticationRequest(m) => m.encode(&mut buf),
        EmmMessage::AuthenticationResponse(m) => m.encode(&mut buf),
        EmmMessage::AuthenticationFailure(m) => m.encode(&mut buf),
        EmmMessage::SecurityModeCommand(m) => m.encode(&mut buf),
        EmmMessage::SecurityModeComplete(m) => m.encode(&mut buf),
        EmmMessage::SecurityModeReject(m) => buf.put_u8(m.emm_cause as u8),
        EmmMessage::IdentityRequest(m) => buf.put_u8(m.identity_type & 0x07),
        EmmMessage::IdentityResponse(m) => m.mobile_identity.encode(&mut buf),
        EmmMessage::EmmStatus(m) => buf.put_u8(m.emm_cause as u8),
        EmmMessage::UplinkNasTransport(m) => m.nas_message_container.encode(&mut buf),
        EmmMessage::DetachAccept
        | EmmMessage::TrackingAreaUpdateComplete
        | EmmMessage::GutiReallocationComplete
        | EmmMessage::AuthenticationReject => {}
    }

    buf
}

/// Parse a plain EMM message (header included)
pub fn parse_emm_message(buf: &mut Bytes) -> NasResult<EmmMessage> {
    ensure_remaining(buf, 1)?;
    if buf[0] >> 4 == SecurityHeaderType::ServiceRequest as u8 {
        let protocol_discriminator = buf[0] & 0x0f;
        if protocol_discriminator != ProtocolDiscriminator::EpsMobilityManagement as u8 {
            return Err(NasError::InvalidProtocolDiscriminator(protocol_discriminator));
        }
        buf.advance(1);
        return Ok(EmmMessage::ServiceRequest(ServiceRequest::decode(buf)?));
    }

    let header = EpsNasEmmHeader::decode(buf)?;
    let message_type = EmmMessageType::try_from(header.message_type)?;

    let msg = match message_type {
        EmmMessageType::AttachRequest => EmmMessage::AttachRequest(AttachRequest::decode(buf)?),
        EmmMessageType::AttachAccept => EmmMessage::AttachAccept(AttachAccept::decode(buf)?),
        EmmMessageType::AttachComplete => EmmMessage::AttachComplete(AttachComplete {
            esm_message_container: EsmMessageContainer::decode(buf)?,
        }),
        EmmMessageType::AttachReject => EmmMessage::AttachReject(AttachReject::decode(buf)?),
        EmmMessageType::DetachRequest => EmmMessage::DetachRequest(DetachRequest::decode(buf)?),
        EmmMessageType::DetachAccept => EmmMessage::DetachAccept,
        EmmMessageType::TrackingAreaUpdateRequest => {
            EmmMessage::TrackingAreaUpdateRequest(TrackingAreaUpdateRequest::decode(buf)?)
        }
        EmmMessageType::TrackingAreaUpdateComplete => EmmMessage::TrackingAreaUpdateComplete,
        EmmMessageType::TrackingAreaUpdateReject => {
            EmmMessage::TrackingAreaUpdateReject(TrackingAreaUpdateReject::decode(buf)?)
        }
        EmmMessageType::ExtendedServiceRequest => {
            EmmMessage::ExtendedServiceRequest(ExtendedServiceRequest::decode(buf)?)
        }
        EmmMessageType::GutiReallocationComplete => EmmMessage::GutiReallocationComplete,
        EmmMessageType::AuthenticationRequest => {
            EmmMessage::AuthenticationRequest(AuthenticationRequest::decode(buf)?)
        }
        EmmMessageType::AuthenticationResponse => {
            EmmMessage::AuthenticationResponse(AuthenticationResponse::decode(buf)?)
        }
        EmmMessageType::AuthenticationReject => EmmMessage::AuthenticationReject,
        EmmMessageType::AuthenticationFailure => {
            EmmMessage::AuthenticationFailure(AuthenticationFailure::decode(buf)?)
        }
        EmmMessageType::SecurityModeCommand => {
            EmmMessage::SecurityModeCommand(SecurityModeCommand::decode(buf)?)
        }
        EmmMessageType::SecurityModeComplete => {
            EmmMessage::SecurityModeComplete(SecurityModeComplete::decode(buf)?)
        }
        EmmMessageType::SecurityModeReject => {
            EmmMessage::SecurityModeReject(SecurityModeReject { emm_cause: decode_cause(buf)? })
        }
        EmmMessageType::IdentityRequest => {
            ensure_remaining(buf, 1)?;
            EmmMessage::IdentityRequest(IdentityRequest { identity_type: buf.get_u8() & 0x07 })
        }
        EmmMessageType::IdentityResponse => EmmMessage::IdentityResponse(IdentityResponse {
            mobile_identity: EpsMobileIdentity::decode(buf)?,
        }),
        EmmMessageType::EmmStatus => EmmMessage::EmmStatus(EmmStatus { emm_cause: decode_cause(buf)? }),
        EmmMessageType::UplinkNasTransport => EmmMessage::UplinkNasTransport(UplinkNasTransport {
            nas_message_container: NasMessageContainer::decode(buf)?,
        }),
        _ => return Err(NasError::InvalidMessageType(header.message_type)),
    };

    Ok(msg)
}
