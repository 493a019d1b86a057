//! Messages handed to the access stratum

use bytes::Bytes;
use ogs_nas::common::types::PlmnId;
use ogs_nas::eps::EpsGuti;

use crate::primitive::UeId;

/// Access stratum message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsMessageId {
    DlInfoTransferReq,
    NasEstablishCnf,
    NasEstablishRsp,
    NasReleaseReq,
    PagingReq,
    CellInfoReq,
}

/// How the access stratum identifies the UE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsAddress {
    UeId(UeId),
    STmsi { mme_code: u8, m_tmsi: u32 },
}

impl AsAddress {
    /// S-TMSI when a GUTI is known, the UE identifier otherwise
    pub fn new(ue_id: UeId, guti: Option<&EpsGuti>) -> Self {
        match guti {
            Some(guti) => Self::s_tmsi(guti),
            None => Self::UeId(ue_id),
        }
    }

    pub fn s_tmsi(guti: &EpsGuti) -> Self {
        Self::STmsi { mme_code: guti.mme_code, m_tmsi: guti.m_tmsi }
    }
}

/// Result code of a connection establishment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsErrorCode {
    Success,
    /// Connection terminated by NAS
    TerminatedNas,
}

/// Release cause towards the access stratum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsReleaseCause {
    AuthenticationFailure,
    Detach,
}

/// Downlink information transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlInfoTransferReq {
    pub address: AsAddress,
    pub nas_msg: Bytes,
}

/// Connection establishment response or confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NasEstablishRsp {
    pub ue_id: UeId,
    pub address: AsAddress,
    pub err_code: AsErrorCode,
    pub nas_msg: Bytes,
    /// Uplink NAS COUNT, `(overflow << 8) | sequence number`
    pub nas_ul_count: u32,
    /// Selected EEA as a big-endian bit mask
    pub selected_encryption_algorithm: u16,
    /// Selected EIA as a big-endian bit mask
    pub selected_integrity_algorithm: u16,
}

/// Signalling connection release request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NasReleaseReq {
    pub address: AsAddress,
    pub cause: AsReleaseCause,
}

/// Paging request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingReq {
    pub ue_id: UeId,
    pub address: AsAddress,
}

/// Cell information request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInfoReq {
    pub plmn_id: PlmnId,
    pub rat: u8,
}

/// Message to the access stratum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsMessage {
    DlInfoTransferReq(DlInfoTransferReq),
    NasEstablishCnf(NasEstablishRsp),
    NasEstablishRsp(NasEstablishRsp),
    NasReleaseReq(NasReleaseReq),
    PagingReq(PagingReq),
    CellInfoReq(CellInfoReq),
}

impl AsMessage {
    pub fn id(&self) -> AsMessageId {
        match self {
            Self::DlInfoTransferReq(_) => AsMessageId::DlInfoTransferReq,
            Self::NasEstablishCnf(_) => AsMessageId::NasEstablishCnf,
            Self::NasEstablishRsp(_) => AsMessageId::NasEstablishRsp,
            Self::NasReleaseReq(_) => AsMessageId::NasReleaseReq,
            Self::PagingReq(_) => AsMessageId::PagingReq,
            Self::CellInfoReq(_) => AsMessageId::CellInfoReq,
        }
    }

    /// NAS PDU carried by the message, if any
    pub fn nas_msg(&self) -> Option<&Bytes> {
        match self {
            Self::DlInfoTransferReq(req) => Some(&req.nas_msg),
            Self::NasEstablishCnf(rsp) | Self::NasEstablishRsp(rsp) => Some(&rsp.nas_msg),
            _ => None,
        }
    }
}

/// Encode an algorithm identifier as the access stratum expects it:
/// bit `16 - alg` set, big-endian. Identifiers past the field give 0.
pub fn algorithm_mask(alg: u8) -> u16 {
    (0x10000u32.checked_shr(u32::from(alg)).unwrap_or(0) as u16).to_be()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_prefers_s_tmsi() {
        let guti = EpsGuti { mme_code: 4, m_tmsi: 0xdead, ..Default::default() };
        assert_eq!(AsAddress::new(7, Some(&guti)), AsAddress::STmsi { mme_code: 4, m_tmsi: 0xdead });
        assert_eq!(AsAddress::new(7, None), AsAddress::UeId(7));
    }

    #[test]
    fn test_algorithm_mask() {
        assert_eq!(u16::from_be(algorithm_mask(1)), 0x8000);
        assert_eq!(u16::from_be(algorithm_mask(2)), 0x4000);
        // EEA0/EIA0 overflow the 16 bit field
        assert_eq!(algorithm_mask(0), 0);
        assert_eq!(u16::from_be(algorithm_mask(16)), 0x0001);
        assert_eq!(algorithm_mask(17), 0);
        assert_eq!(algorithm_mask(32), 0);
        assert_eq!(algorithm_mask(u8::MAX), 0);
    }
}
