//! Send pipeline: EMM primitives going down to the access stratum
//!
//! Every builder picks the security header from the primitive's context
//! snapshot, lets the payload builder fill in the EMM message, stamps the
//! downlink sequence number of the stored context and encodes the result.
//! `None` means nothing is to be sent.

use bytes::Bytes;
use log::{debug, info, warn};
use ogs_nas::eps::{EmmSecurityContext, NasMessage, NasSecurityHeader};

use crate::as_message::*;
use crate::codec::{emm_as_encode, emm_as_encrypt};
use crate::dump::nas_log_dump;
use crate::handler::EmmPayload;
use crate::primitive::*;
use crate::sap::EmmAs;
use crate::security_header::{select_security_header, HeaderVariant};

/// Downlink payload before security protection
enum Payload<'m> {
    /// EMM message filled in by the payload builder
    Message(EmmPayload),
    /// Already encoded NAS message (ESM data)
    Encoded(&'m [u8]),
}

impl Payload<'_> {
    fn size(&self) -> usize {
        match self {
            Self::Message(payload) => payload.size,
            Self::Encoded(data) => data.len(),
        }
    }
}

/// Protected downlink PDU together with the stored context it was built with
struct Protected {
    nas_msg: Bytes,
    ctx: Option<EmmSecurityContext>,
}

fn header_variant(ue_id: UeId, sctx: Option<&EmmAsSecurityData>) -> Option<HeaderVariant> {
    let variant = select_security_header(sctx);
    if variant.is_none() {
        warn!("[ue_id={}] No integrity key for the new security context, message dropped", ue_id);
    }
    variant
}

impl EmmAs<'_> {
    fn protect(&self, ue_id: UeId, variant: HeaderVariant, payload: Payload<'_>) -> Option<Protected> {
        let size = payload.size();
        if size == 0 {
            debug!("[ue_id={}] Empty payload, nothing to send", ue_id);
            return None;
        }

        let ctx = self.store.lookup(ue_id);
        let mut header: NasSecurityHeader = variant.header();
        if let Some(ctx) = &ctx {
            header.sequence_number = ctx.dl_count.seq_num;
            debug!("[ue_id={}] Set sequence number to {}", ue_id, header.sequence_number);
        }

        let nas_msg = match payload {
            Payload::Message(payload) => emm_as_encode(
                self.codec,
                &NasMessage::with_header(header, payload.message),
                size,
                ctx.as_ref(),
            ),
            Payload::Encoded(data) => emm_as_encrypt(self.codec, &header, data, size, ctx.as_ref()),
        }?;

        nas_log_dump("Downlink NAS PDU", ue_id, &nas_msg);
        Some(Protected { nas_msg, ctx })
    }

    /// DATA_REQ
    pub(crate) fn data_req(&self, msg: &EmmAsData) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS data transfer request", msg.ue_id);
        let address = AsAddress::new(msg.ue_id, msg.guti.as_ref());

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = match msg.nas_info {
            EmmAsNasInfo::Detach => Payload::Message(self.builder.detach_accept(msg)?),
            _ => Payload::Encoded(&msg.nas_msg),
        };

        let protected = self.protect(msg.ue_id, variant, payload)?;
        Some(AsMessage::DlInfoTransferReq(DlInfoTransferReq {
            address,
            nas_msg: protected.nas_msg,
        }))
    }

    /// STATUS_IND
    pub(crate) fn status_ind(&self, msg: &EmmAsStatus) -> Option<AsMessage> {
        info!(
            "[ue_id={}] EMMAS-SAP - Send AS status indication (cause={})",
            msg.ue_id, msg.emm_cause as u8
        );
        let address = AsAddress::new(msg.ue_id, msg.guti.as_ref());

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = self.builder.emm_status(msg)?;

        let protected = self.protect(msg.ue_id, variant, Payload::Message(payload))?;
        Some(AsMessage::DlInfoTransferReq(DlInfoTransferReq {
            address,
            nas_msg: protected.nas_msg,
        }))
    }

    /// RELEASE_REQ
    pub(crate) fn release_req(&self, msg: &EmmAsRelease) -> AsMessage {
        info!("[ue_id={}] EMMAS-SAP - Send AS release request", msg.ue_id);
        let cause = match msg.cause {
            EmmAsReleaseCause::Authentication => AsReleaseCause::AuthenticationFailure,
            EmmAsReleaseCause::Detach => AsReleaseCause::Detach,
        };
        AsMessage::NasReleaseReq(NasReleaseReq {
            address: AsAddress::new(msg.ue_id, msg.guti.as_ref()),
            cause,
        })
    }

    /// SECURITY_REQ: identification, authentication or security mode control
    pub(crate) fn security_req(&self, msg: &EmmAsSecurity) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS security request ({:?})", msg.ue_id, msg.msg_type);
        let address = AsAddress::new(msg.ue_id, msg.guti.as_ref());

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = match msg.msg_type {
            EmmAsSecurityMsgType::Ident => self.builder.identity_request(msg),
            EmmAsSecurityMsgType::Auth => self.builder.authentication_request(msg),
            EmmAsSecurityMsgType::Smc => self.builder.security_mode_command(msg),
        }?;

        let protected = self.protect(msg.ue_id, variant, Payload::Message(payload))?;
        Some(AsMessage::DlInfoTransferReq(DlInfoTransferReq {
            address,
            nas_msg: protected.nas_msg,
        }))
    }

    /// SECURITY_REJ: authentication reject
    pub(crate) fn security_rej(&self, msg: &EmmAsSecurity) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS security reject", msg.ue_id);
        let address = AsAddress::new(msg.ue_id, msg.guti.as_ref());

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = match msg.msg_type {
            EmmAsSecurityMsgType::Auth => self.builder.authentication_reject(msg)?,
            other => {
                warn!("[ue_id={}] Security message {:?} cannot be rejected", msg.ue_id, other);
                return None;
            }
        };

        let protected = self.protect(msg.ue_id, variant, Payload::Message(payload))?;
        Some(AsMessage::DlInfoTransferReq(DlInfoTransferReq {
            address,
            nas_msg: protected.nas_msg,
        }))
    }

    /// ESTABLISH_CNF: attach accept, with the parameters the access
    /// stratum needs to activate its own security
    pub(crate) fn establish_cnf(&self, msg: &EmmAsEstablish) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS connection establish confirmation", msg.ue_id);
        let Some(guti) = msg.guti.as_ref() else {
            warn!("[ue_id={}] GUTI is missing, establish confirmation dropped", msg.ue_id);
            return None;
        };
        let address = AsAddress::s_tmsi(guti);

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = match msg.nas_info {
            EmmAsNasInfo::Attach => self.builder.attach_accept(msg)?,
            other => {
                warn!("[ue_id={}] Initial NAS message {:?} cannot be confirmed", msg.ue_id, other);
                return None;
            }
        };

        let protected = self.protect(msg.ue_id, variant, Payload::Message(payload))?;
        let (nas_ul_count, selected_encryption_algorithm, selected_integrity_algorithm) =
            match &protected.ctx {
                Some(ctx) => (
                    ctx.ul_count.value(),
                    algorithm_mask(ctx.selected_algorithms.ciphering),
                    algorithm_mask(ctx.selected_algorithms.integrity),
                ),
                None => (0, 0, 0),
            };
        debug!(
            "[ue_id={}] NAS UL COUNT {:08x}, EEA {:#06x}, EIA {:#06x}",
            msg.ue_id, nas_ul_count, selected_encryption_algorithm, selected_integrity_algorithm
        );

        Some(AsMessage::NasEstablishCnf(NasEstablishRsp {
            ue_id: msg.ue_id,
            address,
            err_code: AsErrorCode::Success,
            nas_msg: protected.nas_msg,
            nas_ul_count,
            selected_encryption_algorithm,
            selected_integrity_algorithm,
        }))
    }

    /// ESTABLISH_REJ: attach or tracking area update reject
    pub(crate) fn establish_rej(&self, msg: &EmmAsEstablish) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS connection establish reject", msg.ue_id);
        let address = AsAddress::new(msg.ue_id, msg.guti.as_ref());

        let variant = header_variant(msg.ue_id, msg.sctx.as_ref())?;
        let payload = match msg.nas_info {
            EmmAsNasInfo::Attach => self.builder.attach_reject(msg)?,
            EmmAsNasInfo::Tau => self.builder.tracking_area_update_reject(msg)?,
            other => {
                warn!("[ue_id={}] Initial NAS message {:?} cannot be rejected", msg.ue_id, other);
                return None;
            }
        };

        let protected = self.protect(msg.ue_id, variant, Payload::Message(payload))?;
        Some(AsMessage::NasEstablishRsp(NasEstablishRsp {
            ue_id: msg.ue_id,
            address,
            err_code: AsErrorCode::TerminatedNas,
            nas_msg: protected.nas_msg,
            nas_ul_count: 0,
            selected_encryption_algorithm: 0,
            selected_integrity_algorithm: 0,
        }))
    }

    /// PAGE_IND: paging needs the S-TMSI of the UE
    pub(crate) fn page_ind(&self, msg: &EmmAsPage) -> Option<AsMessage> {
        info!("[ue_id={}] EMMAS-SAP - Send AS paging request", msg.ue_id);
        let Some(guti) = msg.guti.as_ref() else {
            warn!("[ue_id={}] No GUTI to page with", msg.ue_id);
            return None;
        };
        Some(AsMessage::PagingReq(PagingReq { ue_id: msg.ue_id, address: AsAddress::s_tmsi(guti) }))
    }

    /// CELL_INFO_REQ: cell selection in the selected PLMN
    pub(crate) fn cell_info_req(&self, msg: &EmmAsCellInfo) -> Option<AsMessage> {
        info!("EMMAS-SAP - Send AS cell information request");
        let Some(plmn_id) = msg.plmn_ids.first() else {
            warn!("EMMAS-SAP - No PLMN selected for cell information request");
            return None;
        };
        Some(AsMessage::CellInfoReq(CellInfoReq { plmn_id: *plmn_id, rat: msg.rat }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogs_nas::common::types::{PlmnId, SecurityAlgorithms, SecurityHeaderType};
    use ogs_nas::eps::{
        EmmCause, EmmMessage, EmmStatus, EpsGuti, NasCount, NasDirection,
    };

    use crate::codec::{EpsNasCodec, NasCodec};
    use crate::context::{ContextStore, InMemoryContextStore};
    use crate::emm_send::DefaultPayloadBuilder;

    fn guti() -> EpsGuti {
        EpsGuti { plmn_id: PlmnId::new([0, 0, 1], [0, 1, 0], 2), mme_gid: 1, mme_code: 2, m_tmsi: 0xc0ffee }
    }

    fn keyed_context() -> EmmSecurityContext {
        EmmSecurityContext {
            activated: 1,
            ul_count: NasCount::new(0, 3),
            dl_count: NasCount::new(0, 5),
            ..EmmSecurityContext::native(
                1,
                [0x0a; 16],
                [0x0b; 16],
                SecurityAlgorithms::new(SecurityAlgorithms::EEA2, SecurityAlgorithms::EIA2),
            )
        }
    }

    #[test]
    fn test_status_ind_plain() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let msg = EmmAsStatus { ue_id: 3, emm_cause: EmmCause::ProtocolErrorUnspecified, ..Default::default() };
        match sap.status_ind(&msg) {
            Some(AsMessage::DlInfoTransferReq(req)) => {
                assert_eq!(req.address, AsAddress::UeId(3));
                assert_eq!(&req.nas_msg[..], &[0x07, 0x60, 111]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_security_req_stamps_stored_sequence_number() {
        let store = InMemoryContextStore::new();
        store.insert(3, keyed_context());
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let sctx = EmmAsSecurityData::from_context(store.lookup(3).as_ref(), false);
        let msg = EmmAsSecurity {
            ue_id: 3,
            guti: Some(guti()),
            msg_type: EmmAsSecurityMsgType::Ident,
            ident_type: 1,
            sctx: Some(sctx),
            ..Default::default()
        };
        let Some(AsMessage::DlInfoTransferReq(req)) = sap.security_req(&msg) else {
            panic!("identity request not built");
        };
        assert_eq!(req.address, AsAddress::STmsi { mme_code: 2, m_tmsi: 0xc0ffee });
        assert_eq!(req.nas_msg[0], 0x27);
        assert_eq!(req.nas_msg[5], 5);

        // The UE side of the codec recovers the identity request
        let ue = EpsNasCodec::ue();
        let (decoded, status) = ue.decode(&req.nas_msg, store.lookup(3).as_ref()).unwrap();
        assert!(status.mac_matched);
        assert_eq!(decoded.header.sequence_number, 5);
        assert!(matches!(decoded.emm(), EmmMessage::IdentityRequest(m) if m.identity_type == 1));
    }

    #[test]
    fn test_denied_header_sends_nothing() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let sctx = EmmAsSecurityData { is_new: true, ksi: 1, k_enc: Some([1; 16]), ..Default::default() };
        let msg = EmmAsSecurity { msg_type: EmmAsSecurityMsgType::Smc, sctx: Some(sctx), ..Default::default() };
        assert_eq!(sap.security_req(&msg), None);
    }

    #[test]
    fn test_security_rej_only_for_authentication() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let msg = EmmAsSecurity { msg_type: EmmAsSecurityMsgType::Smc, ..Default::default() };
        assert_eq!(sap.security_rej(&msg), None);

        let msg = EmmAsSecurity { msg_type: EmmAsSecurityMsgType::Auth, ..Default::default() };
        let Some(AsMessage::DlInfoTransferReq(req)) = sap.security_rej(&msg) else {
            panic!("authentication reject not built");
        };
        assert_eq!(&req.nas_msg[..], &[0x07, 0x54]);
    }

    #[test]
    fn test_data_req_encrypts_esm_payload() {
        let store = InMemoryContextStore::new();
        store.insert(8, keyed_context());
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let esm = Bytes::from_static(&[0x52, 0x05, 0xc5, 0x00, 0x01]);
        let msg = EmmAsData {
            ue_id: 8,
            nas_msg: esm.clone(),
            sctx: Some(EmmAsSecurityData::from_context(store.lookup(8).as_ref(), false)),
            ..Default::default()
        };
        let Some(AsMessage::DlInfoTransferReq(req)) = sap.data_req(&msg) else {
            panic!("data request not built");
        };
        assert_eq!(req.nas_msg.len(), esm.len() + 6);

        let ue = EpsNasCodec { rx: NasDirection::Downlink, tx: NasDirection::Uplink };
        let decrypted = ue.decrypt(&req.nas_msg, store.lookup(8).as_ref()).unwrap();
        assert!(decrypted.status.mac_matched);
        assert_eq!(decrypted.plain, esm);
    }

    #[test]
    fn test_data_req_empty_payload() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);
        assert_eq!(sap.data_req(&EmmAsData::default()), None);
    }

    #[test]
    fn test_establish_cnf_requires_guti() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let msg = EmmAsEstablish { ue_id: 1, nas_info: EmmAsNasInfo::Attach, ..Default::default() };
        assert_eq!(sap.establish_cnf(&msg), None);
    }

    #[test]
    fn test_establish_cnf_reports_ul_count_and_algorithms() {
        let store = InMemoryContextStore::new();
        store.insert(1, keyed_context());
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let msg = EmmAsEstablish {
            ue_id: 1,
            guti: Some(guti()),
            new_guti: Some(guti()),
            nas_info: EmmAsNasInfo::Attach,
            nas_msg: Bytes::from_static(&[0x52, 0x05, 0xc1, 0x01]),
            sctx: Some(EmmAsSecurityData::from_context(store.lookup(1).as_ref(), false)),
            ..Default::default()
        };
        let Some(AsMessage::NasEstablishCnf(cnf)) = sap.establish_cnf(&msg) else {
            panic!("establish confirmation not built");
        };
        assert_eq!(cnf.err_code, AsErrorCode::Success);
        assert_eq!(cnf.nas_ul_count, 3);
        assert_eq!(u16::from_be(cnf.selected_encryption_algorithm), 0x4000);
        assert_eq!(u16::from_be(cnf.selected_integrity_algorithm), 0x4000);
        assert_eq!(cnf.nas_msg[0], 0x27);
    }

    #[test]
    fn test_establish_rej_tau() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        let msg = EmmAsEstablish {
            ue_id: 6,
            nas_info: EmmAsNasInfo::Tau,
            emm_cause: EmmCause::ImplicitlyDetached,
            ..Default::default()
        };
        let Some(AsMessage::NasEstablishRsp(rsp)) = sap.establish_rej(&msg) else {
            panic!("establish reject not built");
        };
        assert_eq!(rsp.err_code, AsErrorCode::TerminatedNas);
        assert_eq!(&rsp.nas_msg[..], &[0x07, 0x4b, 10]);

        let msg = EmmAsEstablish { nas_info: EmmAsNasInfo::Detach, ..msg };
        assert_eq!(sap.establish_rej(&msg), None);
    }

    #[test]
    fn test_page_and_cell_info() {
        let store = InMemoryContextStore::new();
        let codec = EpsNasCodec::network();
        let sap = EmmAs::new(&store, &codec, &DefaultPayloadBuilder);

        assert_eq!(sap.page_ind(&EmmAsPage { ue_id: 1, guti: None }), None);
        assert_eq!(
            sap.page_ind(&EmmAsPage { ue_id: 1, guti: Some(guti()) }),
            Some(AsMessage::PagingReq(PagingReq {
                ue_id: 1,
                address: AsAddress::STmsi { mme_code: 2, m_tmsi: 0xc0ffee }
            }))
        );

        assert_eq!(sap.cell_info_req(&EmmAsCellInfo::default()), None);
        let plmn_id = guti().plmn_id;
        let msg = EmmAsCellInfo { plmn_ids: vec![plmn_id], rat: 0x04, ..Default::default() };
        assert_eq!(
            sap.cell_info_req(&msg),
            Some(AsMessage::CellInfoReq(CellInfoReq { plmn_id, rat: 0x04 }))
        );
    }

    #[test]
    fn test_plain_header_for_unkeyed_status() {
        let header = HeaderVariant::NotProtected.header();
        assert_eq!(header.security_header_type, SecurityHeaderType::PlainNas);
        let status = EmmMessage::EmmStatus(EmmStatus { emm_cause: EmmCause::Congestion });
        assert_eq!(NasMessage::with_header(header, status.clone()).emm(), &status);
    }
}
