//! Shared test doubles for the EMMAS-SAP integration tests

#![allow(dead_code)]

use bytes::Bytes;
use ogs_emmas::*;
use ogs_nas::common::types::{SecurityAlgorithms, SecurityHeaderType};
use ogs_nas::eps::*;

/// EMM procedures recording every call
#[derive(Debug, Default)]
pub struct RecordingEmm {
    pub calls: Vec<(&'static str, UeId)>,
    pub statuses: Vec<(UeId, EmmCause)>,
    pub esm: Vec<(UeId, Bytes)>,
    pub last_status: Option<DecodeStatus>,
    pub identities: Vec<EpsMobileIdentity>,
}

impl RecordingEmm {
    fn record(&mut self, name: &'static str, ue_id: UeId, status: &DecodeStatus) -> EmmResult<()> {
        self.calls.push((name, ue_id));
        self.last_status = Some(*status);
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.calls.iter().map(|(name, _)| *name).collect()
    }
}

impl EmmProcedures for RecordingEmm {
    fn attach_request(&mut self, ue_id: UeId, msg: &AttachRequest, status: &DecodeStatus) -> EmmResult<()> {
        self.identities.push(msg.eps_mobile_identity.clone());
        self.record("attach_request", ue_id, status)
    }

    fn attach_complete(&mut self, ue_id: UeId, _: &AttachComplete, status: &DecodeStatus) -> EmmResult<()> {
        self.record("attach_complete", ue_id, status)
    }

    fn detach_request(&mut self, ue_id: UeId, _: &DetachRequest, status: &DecodeStatus) -> EmmResult<()> {
        self.record("detach_request", ue_id, status)
    }

    fn tracking_area_update_request(
        &mut self,
        ue_id: UeId,
        _: &TrackingAreaUpdateRequest,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.record("tracking_area_update_request", ue_id, status)
    }

    fn identity_response(&mut self, ue_id: UeId, msg: &IdentityResponse, status: &DecodeStatus) -> EmmResult<()> {
        self.identities.push(msg.mobile_identity.clone());
        self.record("identity_response", ue_id, status)
    }

    fn authentication_response(
        &mut self,
        ue_id: UeId,
        _: &AuthenticationResponse,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.record("authentication_response", ue_id, status)
    }

    fn authentication_failure(
        &mut self,
        ue_id: UeId,
        _: &AuthenticationFailure,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.record("authentication_failure", ue_id, status)
    }

    fn security_mode_complete(
        &mut self,
        ue_id: UeId,
        _: &SecurityModeComplete,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.record("security_mode_complete", ue_id, status)
    }

    fn security_mode_reject(&mut self, ue_id: UeId, _: &SecurityModeReject, status: &DecodeStatus) -> EmmResult<()> {
        self.record("security_mode_reject", ue_id, status)
    }

    fn emm_status(&mut self, ue_id: UeId, _: &EmmStatus, status: &DecodeStatus) -> EmmResult<()> {
        self.record("emm_status", ue_id, status)
    }

    fn uplink_nas_transport(
        &mut self,
        ue_id: UeId,
        _: &UplinkNasTransport,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.record("uplink_nas_transport", ue_id, status)
    }

    fn status(&mut self, ue_id: UeId, cause: EmmCause) -> EmmResult<()> {
        self.statuses.push((ue_id, cause));
        Ok(())
    }

    fn lowerlayer_success(&mut self, ue_id: UeId) -> EmmResult<()> {
        self.calls.push(("lowerlayer_success", ue_id));
        Ok(())
    }

    fn lowerlayer_failure(&mut self, ue_id: UeId) -> EmmResult<()> {
        self.calls.push(("lowerlayer_failure", ue_id));
        Ok(())
    }

    fn lowerlayer_data_ind(&mut self, ue_id: UeId, data: &Bytes) -> EmmResult<()> {
        self.esm.push((ue_id, data.clone()));
        self.calls.push(("lowerlayer_data_ind", ue_id));
        Ok(())
    }
}

/// Access stratum transport keeping what it was given
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<AsMessage>,
}

impl AsTransport for RecordingTransport {
    fn send(&mut self, msg: AsMessage) -> SapResult<()> {
        self.sent.push(msg);
        Ok(())
    }
}

/// Payload builder producing nothing to send
pub struct ZeroSizeBuilder;

impl ZeroSizeBuilder {
    fn nothing() -> Option<EmmPayload> {
        Some(EmmPayload { message: EmmMessage::AuthenticationReject, size: 0 })
    }
}

impl EmmPayloadBuilder for ZeroSizeBuilder {
    fn attach_accept(&self, _: &EmmAsEstablish) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn attach_reject(&self, _: &EmmAsEstablish) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn tracking_area_update_reject(&self, _: &EmmAsEstablish) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn detach_accept(&self, _: &EmmAsData) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn identity_request(&self, _: &EmmAsSecurity) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn authentication_request(&self, _: &EmmAsSecurity) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn authentication_reject(&self, _: &EmmAsSecurity) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn security_mode_command(&self, _: &EmmAsSecurity) -> Option<EmmPayload> {
        Self::nothing()
    }
    fn emm_status(&self, _: &EmmAsStatus) -> Option<EmmPayload> {
        Self::nothing()
    }
}

pub const IMSI: [u8; 15] = [0, 0, 1, 0, 1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Active EIA2/EEA2 context
pub fn active_context(ul_seq: u8, dl_seq: u8) -> EmmSecurityContext {
    EmmSecurityContext {
        activated: 1,
        ul_count: NasCount::new(0, ul_seq),
        dl_count: NasCount::new(0, dl_seq),
        ..EmmSecurityContext::native(
            0,
            *b"integrity-key-01",
            *b"ciphering-key-01",
            SecurityAlgorithms::new(SecurityAlgorithms::EEA2, SecurityAlgorithms::EIA2),
        )
    }
}

/// Plain encoding of `msg`
pub fn plain(msg: &EmmMessage) -> Bytes {
    build_emm_message(msg).freeze()
}

/// Uplink PDU protected as the UE would send it
pub fn uplink(
    msg: EmmMessage,
    header_type: SecurityHeaderType,
    sequence_number: u8,
    ctx: &EmmSecurityContext,
) -> Bytes {
    let nas = NasMessage::with_header(NasSecurityHeader::new(header_type, sequence_number), msg);
    let mut out = Vec::new();
    EpsNasCodec::ue()
        .encode(&nas, &mut out, 1024, Some(ctx))
        .expect("uplink encode");
    Bytes::from(out)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
