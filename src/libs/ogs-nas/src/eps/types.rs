//! EPS-specific NAS types
//!
//! Based on 3GPP TS 24.301 Section 9.9.3

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crate::common::types::{decode_lv, decode_lve, ensure_remaining, PlmnId};
use crate::error::{NasError, NasResult};

/// EMM cause values (TS 24.301 Section 9.9.3.9)
///
/// `Success` is not an over-the-air value; it marks the absence of an
/// error in the EMM layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum EmmCause {
    #[default]
    Success = 0,
    ImsiUnknownInHss = 2,
    IllegalUe = 3,
    ImeiNotAccepted = 5,
    IllegalMe = 6,
    EpsServicesNotAllowed = 7,
    EpsAndNonEpsServicesNotAllowed = 8,
    UeIdentityCannotBeDerived = 9,
    ImplicitlyDetached = 10,
    PlmnNotAllowed = 11,
    TrackingAreaNotAllowed = 12,
    RoamingNotAllowedInTa = 13,
    EpsServicesNotAllowedInPlmn = 14,
    NoSuitableCells = 15,
    MscTemporarilyNotReachable = 16,
    NetworkFailure = 17,
    CsDomainNotAvailable = 18,
    EsmFailure = 19,
    MacFailure = 20,
    SynchFailure = 21,
    Congestion = 22,
    UeSecurityCapabilitiesMismatch = 23,
    SecurityModeRejected = 24,
    NotAuthorizedForCsg = 25,
    NonEpsAuthenticationUnacceptable = 26,
    RequestedServiceOptionNotAuthorized = 35,
    CsServiceTemporarilyNotAvailable = 39,
    NoEpsBearerContextActivated = 40,
    SevereNetworkFailure = 42,
    SemanticallyIncorrectMessage = 95,
    InvalidMandatoryInformation = 96,
    /// Message type non-existent or not implemented
    MessageTypeNonExistent = 97,
    /// Message type not compatible with the protocol state
    MessageTypeNotCompatible = 98,
    /// Information element non-existent or not implemented
    InformationElementNonExistent = 99,
    ConditionalIeError = 100,
    MessageNotCompatible = 101,
    ProtocolErrorUnspecified = 111,
}

impl EmmCause {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<u8> for EmmCause {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Success,
            2 => Self::ImsiUnknownInHss,
            3 => Self::IllegalUe,
            5 => Self::ImeiNotAccepted,
            6 => Self::IllegalMe,
            7 => Self::EpsServicesNotAllowed,
            8 => Self::EpsAndNonEpsServicesNotAllowed,
            9 => Self::UeIdentityCannotBeDerived,
            10 => Self::ImplicitlyDetached,
            11 => Self::PlmnNotAllowed,
            12 => Self::TrackingAreaNotAllowed,
            13 => Self::RoamingNotAllowedInTa,
            14 => Self::EpsServicesNotAllowedInPlmn,
            15 => Self::NoSuitableCells,
            16 => Self::MscTemporarilyNotReachable,
            17 => Self::NetworkFailure,
            18 => Self::CsDomainNotAvailable,
            19 => Self::EsmFailure,
            20 => Self::MacFailure,
            21 => Self::SynchFailure,
            22 => Self::Congestion,
            23 => Self::UeSecurityCapabilitiesMismatch,
            24 => Self::SecurityModeRejected,
            25 => Self::NotAuthorizedForCsg,
            26 => Self::NonEpsAuthenticationUnacceptable,
            35 => Self::RequestedServiceOptionNotAuthorized,
            39 => Self::CsServiceTemporarilyNotAvailable,
            40 => Self::NoEpsBearerContextActivated,
            42 => Self::SevereNetworkFailure,
            95 => Self::SemanticallyIncorrectMessage,
            96 => Self::InvalidMandatoryInformation,
            97 => Self::MessageTypeNonExistent,
            98 => Self::MessageTypeNotCompatible,
            99 => Self::InformationElementNonExistent,
            100 => Self::ConditionalIeError,
            101 => Self::MessageNotCompatible,
            111 => Self::ProtocolErrorUnspecified,
            // Unknown values are treated as protocol error, unspecified
            _ => Self::ProtocolErrorUnspecified,
        }
    }
}

/// EPS attach type (TS 24.301 Section 9.9.3.11)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EpsAttachType {
    #[default]
    EpsAttach = 1,
    CombinedEpsImsiAttach = 2,
    EpsEmergencyAttach = 6,
}

impl EpsAttachType {
    pub fn decode(half: u8) -> Self {
        match half & 0x07 {
            2 => Self::CombinedEpsImsiAttach,
            6 => Self::EpsEmergencyAttach,
            _ => Self::EpsAttach,
        }
    }
}

/// EPS attach result (TS 24.301 Section 9.9.3.10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EpsAttachResult {
    #[default]
    EpsOnly = 1,
    CombinedEpsImsi = 2,
}

impl EpsAttachResult {
    pub fn decode(half: u8) -> Self {
        match half & 0x07 {
            2 => Self::CombinedEpsImsi,
            _ => Self::EpsOnly,
        }
    }
}

/// Type of identity (TS 24.301 Section 9.9.3.12 / 24.008 10.5.1.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EpsMobileIdentityType {
    Imsi = 1,
    Imei = 2,
    Imeisv = 3,
    Tmsi = 4,
    Guti = 6,
}

/// GUTI for EPS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EpsGuti {
    /// PLMN ID
    pub plmn_id: PlmnId,
    /// MME Group ID
    pub mme_gid: u16,
    /// MME Code
    pub mme_code: u8,
    /// M-TMSI
    pub m_tmsi: u32,
}

impl EpsGuti {
    const CONTENTS_LEN: usize = 11;
}

/// EPS mobile identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpsMobileIdentity {
    /// IMSI digits
    Imsi(Vec<u8>),
    /// IMEI digits
    Imei(Vec<u8>),
    /// IMEISV digits
    Imeisv(Vec<u8>),
    /// M-TMSI (Extended Service Request)
    Tmsi(u32),
    /// GUTI
    Guti(EpsGuti),
}

impl Default for EpsMobileIdentity {
    fn default() -> Self {
        Self::Imsi(Vec::new())
    }
}

impl EpsMobileIdentity {
    fn encode_digits(id_type: EpsMobileIdentityType, digits: &[u8], buf: &mut BytesMut) {
        let odd_flag = if digits.len() % 2 == 1 { 0x08 } else { 0x00 };
        let first_digit = digits.first().copied().unwrap_or(0x0f);
        buf.put_u8((digits.len() / 2 + 1) as u8);
        buf.put_u8((first_digit << 4) | odd_flag | id_type as u8);
        for pair in digits.get(1..).unwrap_or(&[]).chunks(2) {
            let high = pair.get(1).copied().unwrap_or(0x0f);
            buf.put_u8((high << 4) | (pair[0] & 0x0f));
        }
    }

    fn decode_digits(contents: &[u8]) -> Vec<u8> {
        let odd = contents[0] & 0x08 != 0;
        let mut digits = vec![contents[0] >> 4];
        for byte in &contents[1..] {
            digits.push(byte & 0x0f);
            digits.push(byte >> 4);
        }
        if !odd {
            digits.pop();
        }
        digits
    }

    /// Encode as LV
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Imsi(d) => Self::encode_digits(EpsMobileIdentityType::Imsi, d, buf),
            Self::Imei(d) => Self::encode_digits(EpsMobileIdentityType::Imei, d, buf),
            Self::Imeisv(d) => Self::encode_digits(EpsMobileIdentityType::Imeisv, d, buf),
            Self::Tmsi(m_tmsi) => {
                buf.put_u8(5);
                buf.put_u8(0xf0 | EpsMobileIdentityType::Tmsi as u8);
                buf.put_u32(*m_tmsi);
            }
            Self::Guti(guti) => {
                buf.put_u8(EpsGuti::CONTENTS_LEN as u8);
                buf.put_u8(0xf0 | EpsMobileIdentityType::Guti as u8);
                guti.plmn_id.encode(buf);
                buf.put_u16(guti.mme_gid);
                buf.put_u8(guti.mme_code);
                buf.put_u32(guti.m_tmsi);
            }
        }
    }

    /// Decode from LV
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut contents = decode_lv(buf)?;
        ensure_remaining(&contents, 1)?;
        let id_type = contents[0] & 0x07;
        match id_type {
            1 => Ok(Self::Imsi(Self::decode_digits(&contents))),
            2 => Ok(Self::Imei(Self::decode_digits(&contents))),
            3 => Ok(Self::Imeisv(Self::decode_digits(&contents))),
            4 => {
                if contents.len() != 5 {
                    return Err(NasError::InvalidIeLength { expected: 5, actual: contents.len() });
                }
                contents.advance(1);
                Ok(Self::Tmsi(contents.get_u32()))
            }
            6 => {
                if contents.len() != EpsGuti::CONTENTS_LEN {
                    return Err(NasError::InvalidIeLength {
                        expected: EpsGuti::CONTENTS_LEN,
                        actual: contents.len(),
                    });
                }
                contents.advance(1);
                let plmn_id = PlmnId::decode(&mut contents)?;
                Ok(Self::Guti(EpsGuti {
                    plmn_id,
                    mme_gid: contents.get_u16(),
                    mme_code: contents.get_u8(),
                    m_tmsi: contents.get_u32(),
                }))
            }
            _ => Err(NasError::InvalidMobileIdentityType(id_type)),
        }
    }

    /// GUTI carried by this identity, if any
    pub fn guti(&self) -> Option<&EpsGuti> {
        match self {
            Self::Guti(guti) => Some(guti),
            _ => None,
        }
    }
}

/// UE network capability (TS 24.301 Section 9.9.3.34)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UeNetworkCapability {
    /// EEA (EPS Encryption Algorithms) bitmap
    pub eea: u8,
    /// EIA (EPS Integrity Algorithms) bitmap
    pub eia: u8,
    /// UMTS algorithms and the remaining capability octets
    pub additional: Vec<u8>,
}

impl UeNetworkCapability {
    pub fn new(eea: u8, eia: u8) -> Self {
        Self { eea, eia, additional: Vec::new() }
    }

    /// Encode as LV
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((2 + self.additional.len()) as u8);
        buf.put_u8(self.eea);
        buf.put_u8(self.eia);
        buf.put_slice(&self.additional);
    }

    /// Decode from LV
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut contents = decode_lv(buf)?;
        if contents.len() < 2 {
            return Err(NasError::InvalidIeLength { expected: 2, actual: contents.len() });
        }
        Ok(Self {
            eea: contents.get_u8(),
            eia: contents.get_u8(),
            additional: contents.to_vec(),
        })
    }
}

/// ESM message container (TS 24.301 Section 9.9.3.15), LV-E
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EsmMessageContainer {
    /// ESM message data
    pub data: Bytes,
}

impl EsmMessageContainer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        Ok(Self { data: decode_lve(buf)? })
    }
}

/// NAS message container (TS 24.301 Section 9.9.3.22), LV
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NasMessageContainer {
    /// SMS message data
    pub data: Bytes,
}

impl NasMessageContainer {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
    }

    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let data = decode_lv(buf)?;
        if data.len() < 2 {
            return Err(NasError::InvalidIeLength { expected: 2, actual: data.len() });
        }
        Ok(Self { data })
    }
}

/// Tracking Area Identity for EPS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EpsTai {
    /// PLMN ID
    pub plmn_id: PlmnId,
    /// TAC (2 bytes for EPS)
    pub tac: u16,
}

/// TAI list (TS 24.301 Section 9.9.3.33)
///
/// Encoded as a single partial list of type "00": TACs of one PLMN.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpsTaiList {
    /// PLMN shared by the listed TACs
    pub plmn_id: PlmnId,
    /// Tracking area codes (1 to 16)
    pub tacs: Vec<u16>,
}

impl EpsTaiList {
    /// Maximum number of elements in one partial list
    pub const MAX_TACS: usize = 16;

    /// Build a list from TAIs; TAIs of other PLMNs than the first are skipped
    pub fn from_tais(tais: &[EpsTai]) -> Self {
        let plmn_id = tais.first().map(|tai| tai.plmn_id).unwrap_or_default();
        let tacs = tais
            .iter()
            .filter(|tai| tai.plmn_id == plmn_id)
            .map(|tai| tai.tac)
            .take(Self::MAX_TACS)
            .collect();
        Self { plmn_id, tacs }
    }

    /// Encode as LV
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((1 + 3 + 2 * self.tacs.len()) as u8);
        // Type of list 00, number of elements minus one
        buf.put_u8((self.tacs.len().saturating_sub(1) as u8) & 0x1f);
        self.plmn_id.encode(buf);
        for tac in &self.tacs {
            buf.put_u16(*tac);
        }
    }

    /// Decode from LV
    pub fn decode(buf: &mut Bytes) -> NasResult<Self> {
        let mut contents = decode_lv(buf)?;
        ensure_remaining(&contents, 4)?;
        let head = contents.get_u8();
        let list_type = (head >> 5) & 0x03;
        if list_type != 0 {
            return Err(NasError::EncodingError(format!(
                "Unsupported TAI list type {list_type}"
            )));
        }
        let count = (head & 0x1f) as usize + 1;
        let plmn_id = PlmnId::decode(&mut contents)?;
        ensure_remaining(&contents, 2 * count)?;
        let tacs = (0..count).map(|_| contents.get_u16()).collect();
        Ok(Self { plmn_id, tacs })
    }
}

/// Authentication parameter RAND
pub type AuthenticationRand = [u8; 16];

/// Authentication parameter AUTN
pub type AuthenticationAutn = [u8; 16];
