//! Downlink EMM message construction
//!
//! Fills in the EMM messages sent on behalf of the EMM procedures from the
//! fields of the EMMAS-SAP primitive.

use log::{debug, info};
use ogs_nas::common::types::{KeySetIdentifier, SecurityAlgorithms};
use ogs_nas::eps::*;

use crate::handler::{EmmPayload, EmmPayloadBuilder};
use crate::primitive::*;

/// Payload builder working from the primitive fields alone
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPayloadBuilder;

fn payload(message: EmmMessage) -> Option<EmmPayload> {
    let size = build_emm_message(&message).len();
    Some(EmmPayload { message, size })
}

fn esm_container(msg: &EmmAsEstablish) -> Option<EsmMessageContainer> {
    (!msg.nas_msg.is_empty()).then(|| EsmMessageContainer::new(msg.nas_msg.clone()))
}

impl EmmPayloadBuilder for DefaultPayloadBuilder {
    fn attach_accept(&self, msg: &EmmAsEstablish) -> Option<EmmPayload> {
        info!("[ue_id={}] Send Attach accept", msg.ue_id);
        payload(EmmMessage::AttachAccept(AttachAccept {
            eps_attach_result: EpsAttachResult::EpsOnly,
            t3412_value: msg.t3412,
            tai_list: EpsTaiList::from_tais(&msg.tai_list),
            esm_message_container: EsmMessageContainer::new(msg.nas_msg.clone()),
            guti: msg.new_guti,
            emm_cause: (!msg.emm_cause.is_success()).then_some(msg.emm_cause),
            t3402_value: None,
        }))
    }

    fn attach_reject(&self, msg: &EmmAsEstablish) -> Option<EmmPayload> {
        info!("[ue_id={}] Send Attach reject (cause={})", msg.ue_id, msg.emm_cause as u8);
        payload(EmmMessage::AttachReject(AttachReject {
            emm_cause: msg.emm_cause,
            esm_message_container: esm_container(msg),
            ..Default::default()
        }))
    }

    fn tracking_area_update_reject(&self, msg: &EmmAsEstablish) -> Option<EmmPayload> {
        info!(
            "[ue_id={}] Send Tracking area update reject (cause={})",
            msg.ue_id, msg.emm_cause as u8
        );
        payload(EmmMessage::TrackingAreaUpdateReject(TrackingAreaUpdateReject {
            emm_cause: msg.emm_cause,
            t3346_value: None,
        }))
    }

    fn detach_accept(&self, msg: &EmmAsData) -> Option<EmmPayload> {
        info!("[ue_id={}] Send Detach accept", msg.ue_id);
        payload(EmmMessage::DetachAccept)
    }

    fn identity_request(&self, msg: &EmmAsSecurity) -> Option<EmmPayload> {
        debug!("[ue_id={}] Send Identity request (type={})", msg.ue_id, msg.ident_type);
        payload(EmmMessage::IdentityRequest(IdentityRequest { identity_type: msg.ident_type }))
    }

    fn authentication_request(&self, msg: &EmmAsSecurity) -> Option<EmmPayload> {
        debug!("[ue_id={}] Send Authentication request (ksi={})", msg.ue_id, msg.ksi);
        payload(EmmMessage::AuthenticationRequest(AuthenticationRequest {
            nas_key_set_identifier: KeySetIdentifier::new(0, msg.ksi),
            rand: msg.rand,
            autn: msg.autn,
        }))
    }

    fn authentication_reject(&self, msg: &EmmAsSecurity) -> Option<EmmPayload> {
        info!("[ue_id={}] Send Authentication reject", msg.ue_id);
        payload(EmmMessage::AuthenticationReject)
    }

    fn security_mode_command(&self, msg: &EmmAsSecurity) -> Option<EmmPayload> {
        debug!(
            "[ue_id={}] Send Security mode command (EEA{} EIA{})",
            msg.ue_id, msg.selected_eea, msg.selected_eia
        );
        payload(EmmMessage::SecurityModeCommand(SecurityModeCommand {
            selected_nas_security_algorithms: SecurityAlgorithms::new(
                msg.selected_eea,
                msg.selected_eia,
            ),
            nas_key_set_identifier: KeySetIdentifier::new(0, msg.ksi),
            replayed_ue_security_capabilities: UeNetworkCapability::new(msg.ue_eea, msg.ue_eia),
            imeisv_request: msg.imeisv_request.then_some(1),
            ..Default::default()
        }))
    }

    fn emm_status(&self, msg: &EmmAsStatus) -> Option<EmmPayload> {
        debug!("[ue_id={}] Send EMM status (cause={})", msg.ue_id, msg.emm_cause as u8);
        payload(EmmMessage::EmmStatus(EmmStatus { emm_cause: msg.emm_cause }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ogs_nas::common::types::PlmnId;

    #[test]
    fn test_size_is_encoded_length() {
        let status = EmmAsStatus { emm_cause: EmmCause::MessageTypeNotCompatible, ..Default::default() };
        let payload = DefaultPayloadBuilder.emm_status(&status).unwrap();
        assert_eq!(payload.size, 3);
        assert_eq!(
            payload.message,
            EmmMessage::EmmStatus(EmmStatus { emm_cause: EmmCause::MessageTypeNotCompatible })
        );
    }

    #[test]
    fn test_attach_accept_fields() {
        let plmn_id = PlmnId::new([0, 0, 1], [0, 1, 0], 2);
        let guti = EpsGuti { plmn_id, mme_gid: 2, mme_code: 1, m_tmsi: 0x1234 };
        let establish = EmmAsEstablish {
            ue_id: 3,
            nas_msg: Bytes::from_static(&[0x52, 0x01, 0xc1]),
            tai_list: vec![EpsTai { plmn_id, tac: 7 }],
            new_guti: Some(guti),
            ..Default::default()
        };
        let payload = DefaultPayloadBuilder.attach_accept(&establish).unwrap();
        match payload.message {
            EmmMessage::AttachAccept(accept) => {
                assert_eq!(accept.guti, Some(guti));
                assert_eq!(accept.tai_list.tacs, vec![7]);
                assert_eq!(accept.emm_cause, None);
                assert_eq!(&accept.esm_message_container.data[..], &[0x52, 0x01, 0xc1]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_attach_reject_without_esm() {
        let establish = EmmAsEstablish { emm_cause: EmmCause::IllegalUe, ..Default::default() };
        let payload = DefaultPayloadBuilder.attach_reject(&establish).unwrap();
        assert_eq!(payload.size, 3);
    }

    #[test]
    fn test_security_mode_command_fields() {
        let security = EmmAsSecurity {
            ksi: 2,
            selected_eea: SecurityAlgorithms::EEA2,
            selected_eia: SecurityAlgorithms::EIA2,
            ue_eea: 0xe0,
            ue_eia: 0x60,
            imeisv_request: true,
            ..Default::default()
        };
        let payload = DefaultPayloadBuilder.security_mode_command(&security).unwrap();
        let encoded = build_emm_message(&payload.message);
        assert_eq!(&encoded[..], &[0x07, 0x5d, 0x22, 0x02, 0x02, 0xe0, 0x60, 0xc1]);
        assert_eq!(payload.size, encoded.len());
    }
}
