//! Collaborators of the service access point
//!
//! `EmmProcedures` receives the accepted uplink EMM messages,
//! `EmmPayloadBuilder` fills in the downlink ones and `AsTransport` carries
//! the result to the access stratum.

use bytes::Bytes;
use log::debug;
use ogs_nas::eps::*;

use crate::as_message::AsMessage;
use crate::error::{EmmResult, SapResult};
use crate::primitive::*;

/// EMM procedures fed by the receive pipeline
///
/// A handler refusing a message with `EmmError::Cause` gets an EMM STATUS
/// sent back to the UE.
pub trait EmmProcedures {
    fn attach_request(
        &mut self,
        ue_id: UeId,
        msg: &AttachRequest,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn attach_complete(
        &mut self,
        ue_id: UeId,
        msg: &AttachComplete,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn detach_request(
        &mut self,
        ue_id: UeId,
        msg: &DetachRequest,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn tracking_area_update_request(
        &mut self,
        ue_id: UeId,
        msg: &TrackingAreaUpdateRequest,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn identity_response(
        &mut self,
        ue_id: UeId,
        msg: &IdentityResponse,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn authentication_response(
        &mut self,
        ue_id: UeId,
        msg: &AuthenticationResponse,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn authentication_failure(
        &mut self,
        ue_id: UeId,
        msg: &AuthenticationFailure,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn security_mode_complete(
        &mut self,
        ue_id: UeId,
        msg: &SecurityModeComplete,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn security_mode_reject(
        &mut self,
        ue_id: UeId,
        msg: &SecurityModeReject,
        status: &DecodeStatus,
    ) -> EmmResult<()>;

    fn emm_status(&mut self, ue_id: UeId, msg: &EmmStatus, status: &DecodeStatus) -> EmmResult<()>;

    fn tracking_area_update_complete(&mut self, ue_id: UeId, _status: &DecodeStatus) -> EmmResult<()> {
        debug!("[ue_id={}] Tracking area update complete", ue_id);
        Ok(())
    }

    fn guti_reallocation_complete(&mut self, ue_id: UeId, _status: &DecodeStatus) -> EmmResult<()> {
        debug!("[ue_id={}] GUTI reallocation complete", ue_id);
        Ok(())
    }

    fn uplink_nas_transport(
        &mut self,
        ue_id: UeId,
        msg: &UplinkNasTransport,
        _status: &DecodeStatus,
    ) -> EmmResult<()> {
        debug!(
            "[ue_id={}] Uplink NAS transport ({} bytes)",
            ue_id,
            msg.nas_message_container.data.len()
        );
        Ok(())
    }

    /// EMM status procedure: report `cause` to the UE
    fn status(&mut self, ue_id: UeId, cause: EmmCause) -> EmmResult<()>;

    /// The lower layer acknowledged delivery of a PDU
    fn lowerlayer_success(&mut self, ue_id: UeId) -> EmmResult<()>;

    /// The lower layer failed to deliver a PDU
    fn lowerlayer_failure(&mut self, ue_id: UeId) -> EmmResult<()>;

    /// Non-EMM NAS message (ESM) to forward
    fn lowerlayer_data_ind(&mut self, ue_id: UeId, data: &Bytes) -> EmmResult<()>;
}

/// Downlink EMM message produced by a payload builder
#[derive(Debug, Clone, PartialEq)]
pub struct EmmPayload {
    pub message: EmmMessage,
    /// Encoded length of the plain message; 0 means nothing to send
    pub size: usize,
}

/// Builders of the downlink EMM messages
pub trait EmmPayloadBuilder {
    fn attach_accept(&self, msg: &EmmAsEstablish) -> Option<EmmPayload>;
    fn attach_reject(&self, msg: &EmmAsEstablish) -> Option<EmmPayload>;
    fn tracking_area_update_reject(&self, msg: &EmmAsEstablish) -> Option<EmmPayload>;
    fn detach_accept(&self, msg: &EmmAsData) -> Option<EmmPayload>;
    fn identity_request(&self, msg: &EmmAsSecurity) -> Option<EmmPayload>;
    fn authentication_request(&self, msg: &EmmAsSecurity) -> Option<EmmPayload>;
    fn authentication_reject(&self, msg: &EmmAsSecurity) -> Option<EmmPayload>;
    fn security_mode_command(&self, msg: &EmmAsSecurity) -> Option<EmmPayload>;
    fn emm_status(&self, msg: &EmmAsStatus) -> Option<EmmPayload>;
}

/// Access stratum side of the service access point (S1AP on the MME)
pub trait AsTransport {
    fn send(&mut self, msg: AsMessage) -> SapResult<()>;
}
