//! EMMAS-SAP primitives
//!
//! Primitives exchanged between the EMM sublayer and the access stratum.
//! `*_REQ`, `*_RES`, `*_REJ`, `*_CNF` and `PAGE_IND`/`STATUS_IND` travel
//! towards the access stratum; `DATA_IND`, `ESTABLISH_REQ` and the cell
//! information responses come from it.

use bytes::Bytes;
use ogs_nas::common::types::{GprsTimer, KeySetIdentifier, PlmnId};
use ogs_nas::eps::{EmmCause, EmmSecurityContext, EpsGuti, EpsTai};

/// Identifier of a UE at the service access point
pub type UeId = u32;

/// Security context snapshot attached to a primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmmAsSecurityData {
    /// The context has just been taken into use
    pub is_new: bool,
    /// NAS key set identifier, 7 when no key is available
    pub ksi: u8,
    /// NAS integrity key
    pub k_int: Option<[u8; 16]>,
    /// NAS ciphering key
    pub k_enc: Option<[u8; 16]>,
    /// Downlink sequence number
    pub sqn: u8,
    /// Downlink NAS COUNT
    pub count: u32,
}

impl Default for EmmAsSecurityData {
    fn default() -> Self {
        Self {
            is_new: false,
            ksi: KeySetIdentifier::NO_KEY_AVAILABLE,
            k_int: None,
            k_enc: None,
            sqn: 0,
            count: 0,
        }
    }
}

impl EmmAsSecurityData {
    /// Snapshot of `ctx` as seen by the send pipeline
    ///
    /// Keys are only exposed once the context was activated, or when it is
    /// the new context being taken into use.
    pub fn from_context(ctx: Option<&EmmSecurityContext>, is_new: bool) -> Self {
        let ctx = match ctx {
            Some(ctx) if ctx.is_available() => ctx,
            _ => return Self { is_new, ..Default::default() },
        };

        let keys_usable = is_new || ctx.activated > 0;
        Self {
            is_new,
            ksi: ctx.eksi.value,
            k_int: keys_usable.then_some(ctx.knas_int),
            k_enc: keys_usable.then_some(ctx.knas_enc),
            sqn: ctx.dl_count.seq_num,
            count: ctx.dl_count.value(),
        }
    }
}

/// Kind of NAS message carried by an establish or data primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmmAsNasInfo {
    Attach,
    Detach,
    Tau,
    ServiceRequest,
    ExtendedServiceRequest,
    /// Already encoded message (forwarded ESM data)
    #[default]
    Other,
}

/// Kind of security procedure message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmmAsSecurityMsgType {
    #[default]
    Ident,
    Auth,
    Smc,
}

/// Release cause requested by EMM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmmAsReleaseCause {
    #[default]
    Authentication,
    Detach,
}

/// Security procedure primitive (SECURITY_REQ/IND/RES/REJ)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsSecurity {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
    pub ksi: u8,
    pub msg_type: EmmAsSecurityMsgType,
    /// Requested identity type (identification procedure)
    pub ident_type: u8,
    pub rand: [u8; 16],
    pub autn: [u8; 16],
    /// Selected ciphering algorithm (EEA)
    pub selected_eea: u8,
    /// Selected integrity algorithm (EIA)
    pub selected_eia: u8,
    /// Replayed UE EEA capabilities
    pub ue_eea: u8,
    /// Replayed UE EIA capabilities
    pub ue_eia: u8,
    pub imeisv_request: bool,
    pub sctx: Option<EmmAsSecurityData>,
    pub emm_cause: EmmCause,
}

/// Connection establishment primitive (ESTABLISH_REQ/CNF/REJ)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsEstablish {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
    pub sctx: Option<EmmAsSecurityData>,
    pub nas_info: EmmAsNasInfo,
    /// Initial NAS message (inbound) or ESM container (outbound)
    pub nas_msg: Bytes,
    pub emm_cause: EmmCause,
    pub tai_list: Vec<EpsTai>,
    pub t3412: GprsTimer,
    /// GUTI allocated by the attach procedure
    pub new_guti: Option<EpsGuti>,
}

/// Connection release primitive (RELEASE_REQ/IND)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsRelease {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
    pub cause: EmmAsReleaseCause,
}

/// Data transfer primitive (DATA_REQ/IND)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsData {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
    /// Lower layer delivered the PDU
    pub delivered: bool,
    pub nas_info: EmmAsNasInfo,
    pub nas_msg: Bytes,
    pub sctx: Option<EmmAsSecurityData>,
}

/// Paging primitive (PAGE_IND)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsPage {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
}

/// EMM status primitive (STATUS_IND)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsStatus {
    pub ue_id: UeId,
    pub guti: Option<EpsGuti>,
    pub sctx: Option<EmmAsSecurityData>,
    pub emm_cause: EmmCause,
}

/// Cell information primitive (CELL_INFO_REQ/RES/IND)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmAsCellInfo {
    /// A suitable cell was found
    pub found: bool,
    /// Selected PLMN first, then equivalent PLMNs
    pub plmn_ids: Vec<PlmnId>,
    /// Radio access technologies bitmap
    pub rat: u8,
    pub tac: u16,
    pub cell_id: u32,
}

/// EMMAS-SAP primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmmAsPrimitive {
    SecurityReq(EmmAsSecurity),
    SecurityInd(EmmAsSecurity),
    SecurityRes(EmmAsSecurity),
    SecurityRej(EmmAsSecurity),
    EstablishReq(EmmAsEstablish),
    EstablishCnf(EmmAsEstablish),
    EstablishRej(EmmAsEstablish),
    ReleaseReq(EmmAsRelease),
    ReleaseInd(EmmAsRelease),
    DataReq(EmmAsData),
    DataInd(EmmAsData),
    PageInd(EmmAsPage),
    StatusInd(EmmAsStatus),
    CellInfoReq(EmmAsCellInfo),
    CellInfoRes(EmmAsCellInfo),
    CellInfoInd(EmmAsCellInfo),
}

impl EmmAsPrimitive {
    /// Name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::SecurityReq(_) => "EMMAS_SECURITY_REQ",
            Self::SecurityInd(_) => "EMMAS_SECURITY_IND",
            Self::SecurityRes(_) => "EMMAS_SECURITY_RES",
            Self::SecurityRej(_) => "EMMAS_SECURITY_REJ",
            Self::EstablishReq(_) => "EMMAS_ESTABLISH_REQ",
            Self::EstablishCnf(_) => "EMMAS_ESTABLISH_CNF",
            Self::EstablishRej(_) => "EMMAS_ESTABLISH_REJ",
            Self::ReleaseReq(_) => "EMMAS_RELEASE_REQ",
            Self::ReleaseInd(_) => "EMMAS_RELEASE_IND",
            Self::DataReq(_) => "EMMAS_DATA_REQ",
            Self::DataInd(_) => "EMMAS_DATA_IND",
            Self::PageInd(_) => "EMMAS_PAGE_IND",
            Self::StatusInd(_) => "EMMAS_STATUS_IND",
            Self::CellInfoReq(_) => "EMMAS_CELL_INFO_REQ",
            Self::CellInfoRes(_) => "EMMAS_CELL_INFO_RES",
            Self::CellInfoInd(_) => "EMMAS_CELL_INFO_IND",
        }
    }

    /// Whether the primitive comes from the access stratum and is decoded here
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::DataInd(_) | Self::EstablishReq(_) | Self::CellInfoRes(_) | Self::CellInfoInd(_)
        )
    }
}
