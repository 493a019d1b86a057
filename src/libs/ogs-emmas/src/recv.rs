//! Receive pipeline: NAS PDUs coming up from the access stratum

use log::{debug, info, warn};
use ogs_nas::common::types::ProtocolDiscriminator;
use ogs_nas::eps::{DecodeError, DecodeStatus, EmmCause, EmmMessage, EmmSecurityContext};

use crate::dump::nas_log_dump;
use crate::error::{EmmError, EmmResult, SapError};
use crate::handler::EmmProcedures;
use crate::primitive::{EmmAsData, EmmAsEstablish, UeId};
use crate::sap::EmmAs;

/// Why an inbound primitive was not processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecvError {
    /// The message is answered with an EMM status carrying `cause`
    Rejected { cause: EmmCause, decode_error: Option<DecodeError> },
    /// Processing failed without a cause to report
    Failed(SapError),
}

impl RecvError {
    fn protocol_error(decode_error: Option<DecodeError>) -> Self {
        Self::Rejected { cause: EmmCause::ProtocolErrorUnspecified, decode_error }
    }

    fn cause(cause: EmmCause) -> Self {
        Self::Rejected { cause, decode_error: None }
    }
}

type RecvResult = Result<(), RecvError>;

fn handled(result: EmmResult<()>, failed: fn(String) -> SapError) -> RecvResult {
    match result {
        Ok(()) => Ok(()),
        Err(EmmError::Cause(cause)) => Err(RecvError::cause(cause)),
        Err(EmmError::Internal(e)) => Err(RecvError::Failed(failed(e))),
    }
}

/// TS 24.301 Section 4.4.4.3: the message must arrive integrity protected
/// under an existing context, with a matching MAC
pub(crate) fn integrity_verified(status: &DecodeStatus) -> bool {
    status.security_context_available && status.integrity_protected_message && status.mac_matched
}

/// A DETACH REQUEST is refused when a context is active and the message is
/// unprotected or its MAC does not match
pub(crate) fn detach_refused(status: &DecodeStatus, ctx: Option<&EmmSecurityContext>) -> bool {
    let active = ctx.is_some_and(|ctx| ctx.activated > 0);
    status.security_context_available
        && active
        && (!status.integrity_protected_message || !status.mac_matched)
}

/// An initial message that carried an IE the decoder skipped is still
/// processed, then answered with "information element non-existent"
fn unexpected_ie(ue_id: UeId, unexpected_iei: Option<u8>) -> RecvResult {
    match unexpected_iei {
        None => Ok(()),
        Some(iei) => {
            warn!("[ue_id={}] Initial NAS message carried unexpected IEI {:#04x}", ue_id, iei);
            Err(RecvError::Rejected {
                cause: EmmCause::InformationElementNonExistent,
                decode_error: Some(DecodeError::UnexpectedIei),
            })
        }
    }
}

impl EmmAs<'_> {
    /// DATA_IND: NAS PDU received over an established connection
    pub(crate) fn data_ind(&self, msg: &EmmAsData, emm: &mut dyn EmmProcedures) -> RecvResult {
        info!(
            "[ue_id={}] EMMAS-SAP - Received AS data transfer indication (delivered={}, length={})",
            msg.ue_id,
            msg.delivered,
            msg.nas_msg.len()
        );

        if !msg.delivered {
            return handled(emm.lowerlayer_failure(msg.ue_id), SapError::LowerLayer);
        }
        if msg.nas_msg.is_empty() {
            // Acknowledgement of a previous downlink transfer
            return handled(emm.lowerlayer_success(msg.ue_id), SapError::LowerLayer);
        }

        nas_log_dump("Uplink NAS PDU", msg.ue_id, &msg.nas_msg);

        let ctx = self.store.lookup(msg.ue_id);
        let decrypted = self.codec.decrypt(&msg.nas_msg, ctx.as_ref()).map_err(|e| {
            warn!("[ue_id={}] Failed to decrypt NAS message: {}", msg.ue_id, e);
            RecvError::protocol_error(Some(e.decode_error()))
        })?;

        if decrypted.protocol_discriminator() == ProtocolDiscriminator::EpsMobilityManagement as u8 {
            self.recv_emm(msg.ue_id, &decrypted.plain, ctx.as_ref(), &decrypted.status, emm)
        } else {
            debug!(
                "[ue_id={}] Forwarding {} bytes (pd={:#04x}) to ESM",
                msg.ue_id,
                decrypted.plain.len(),
                decrypted.protocol_discriminator()
            );
            handled(emm.lowerlayer_data_ind(msg.ue_id, &decrypted.plain), SapError::LowerLayer)
        }
    }

    /// Decode a deciphered EMM message and route it to its procedure
    ///
    /// `status` is the security outcome of removing the protection from
    /// the PDU `plain` was taken from.
    pub(crate) fn recv_emm(
        &self,
        ue_id: UeId,
        plain: &[u8],
        ctx: Option<&EmmSecurityContext>,
        status: &DecodeStatus,
        emm: &mut dyn EmmProcedures,
    ) -> RecvResult {
        info!("[ue_id={}] EMMAS-SAP - Received EMM message (length={})", ue_id, plain.len());

        let (message, _) = self.codec.decode(plain, ctx).map_err(|e| {
            warn!("[ue_id={}] Failed to decode EMM message: {}", ue_id, e);
            RecvError::protocol_error(Some(e.decode_error()))
        })?;
        let message = message.into_emm();

        let protected = || {
            if integrity_verified(status) {
                Ok(())
            } else {
                warn!(
                    "[ue_id={}] {} is not integrity protected ({:?})",
                    ue_id,
                    message.name(),
                    status
                );
                Err(RecvError::protocol_error(None))
            }
        };

        let result = match &message {
            EmmMessage::EmmStatus(m) => {
                protected()?;
                emm.emm_status(ue_id, m, status)
            }
            EmmMessage::SecurityModeComplete(m) => {
                protected()?;
                emm.security_mode_complete(ue_id, m, status)
            }
            EmmMessage::AttachComplete(m) => {
                protected()?;
                emm.attach_complete(ue_id, m, status)
            }
            EmmMessage::TrackingAreaUpdateComplete => {
                protected()?;
                emm.tracking_area_update_complete(ue_id, status)
            }
            EmmMessage::GutiReallocationComplete => {
                protected()?;
                emm.guti_reallocation_complete(ue_id, status)
            }
            EmmMessage::UplinkNasTransport(m) => {
                protected()?;
                emm.uplink_nas_transport(ue_id, m, status)
            }
            EmmMessage::DetachRequest(m) => {
                if detach_refused(status, ctx) {
                    warn!("[ue_id={}] Detach request refused ({:?})", ue_id, status);
                    return Err(RecvError::protocol_error(None));
                }
                emm.detach_request(ue_id, m, status)
            }
            EmmMessage::AttachRequest(m) => emm.attach_request(ue_id, m, status),
            EmmMessage::IdentityResponse(m) => emm.identity_response(ue_id, m, status),
            EmmMessage::AuthenticationResponse(m) => emm.authentication_response(ue_id, m, status),
            EmmMessage::AuthenticationFailure(m) => emm.authentication_failure(ue_id, m, status),
            EmmMessage::SecurityModeReject(m) => emm.security_mode_reject(ue_id, m, status),
            other => {
                warn!("[ue_id={}] EMM message {} is not valid here", ue_id, other.name());
                return Err(RecvError::cause(EmmCause::MessageTypeNotCompatible));
            }
        };

        handled(result, SapError::Handler)
    }

    /// ESTABLISH_REQ: initial NAS message of a new connection
    pub(crate) fn establish_req(
        &self,
        msg: &EmmAsEstablish,
        emm: &mut dyn EmmProcedures,
    ) -> RecvResult {
        info!("[ue_id={}] EMMAS-SAP - Received AS connection establish request", msg.ue_id);
        nas_log_dump("Initial NAS PDU", msg.ue_id, &msg.nas_msg);

        let ctx = self.store.lookup(msg.ue_id);
        let (message, status) = self.codec.decode(&msg.nas_msg, ctx.as_ref()).map_err(|e| {
            warn!("[ue_id={}] Failed to decode initial NAS message: {}", msg.ue_id, e);
            match e.decode_error() {
                DecodeError::UnexpectedIei => RecvError::Rejected {
                    cause: EmmCause::InformationElementNonExistent,
                    decode_error: Some(DecodeError::UnexpectedIei),
                },
                kind => RecvError::protocol_error(Some(kind)),
            }
        })?;

        let ue_id = msg.ue_id;
        match message.emm() {
            EmmMessage::AttachRequest(m) => {
                handled(emm.attach_request(ue_id, m, &status), SapError::Handler)?;
                unexpected_ie(ue_id, m.unexpected_iei)
            }
            EmmMessage::TrackingAreaUpdateRequest(m) => {
                handled(emm.tracking_area_update_request(ue_id, m, &status), SapError::Handler)?;
                unexpected_ie(ue_id, m.unexpected_iei)
            }
            EmmMessage::DetachRequest(_) => {
                if detach_refused(&status, ctx.as_ref()) {
                    warn!("[ue_id={}] Detach request refused ({:?})", ue_id, status);
                    return Err(RecvError::protocol_error(None));
                }
                warn!("[ue_id={}] Initial NAS message Detach request is not supported", ue_id);
                Err(RecvError::cause(EmmCause::MessageTypeNonExistent))
            }
            m @ (EmmMessage::ServiceRequest(_) | EmmMessage::ExtendedServiceRequest(_)) => {
                if !integrity_verified(&status) {
                    warn!("[ue_id={}] {} is not integrity protected ({:?})", ue_id, m.name(), status);
                    return Err(RecvError::protocol_error(None));
                }
                warn!("[ue_id={}] Initial NAS message {} is not supported", ue_id, m.name());
                Err(RecvError::cause(EmmCause::MessageTypeNonExistent))
            }
            other => {
                warn!("[ue_id={}] Initial NAS message {} is not valid", ue_id, other.name());
                Err(RecvError::cause(EmmCause::MessageTypeNotCompatible))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(sc: bool, integrity: bool, mac: bool) -> DecodeStatus {
        DecodeStatus {
            security_context_available: sc,
            integrity_protected_message: integrity,
            ciphered_message: false,
            mac_matched: mac,
        }
    }

    #[test]
    fn test_integrity_verified() {
        assert!(integrity_verified(&status(true, true, true)));
        assert!(!integrity_verified(&status(false, true, true)));
        assert!(!integrity_verified(&status(true, false, true)));
        assert!(!integrity_verified(&status(true, true, false)));
    }

    #[test]
    fn test_detach_refused() {
        let active = EmmSecurityContext { activated: 1, ..Default::default() };
        let inactive = EmmSecurityContext::default();

        assert!(detach_refused(&status(true, false, false), Some(&active)));
        assert!(detach_refused(&status(true, true, false), Some(&active)));
        assert!(!detach_refused(&status(true, true, true), Some(&active)));
        assert!(!detach_refused(&status(true, false, false), Some(&inactive)));
        assert!(!detach_refused(&status(false, false, false), None));
    }

    #[test]
    fn test_unexpected_ie() {
        assert_eq!(unexpected_ie(1, None), Ok(()));
        assert_eq!(
            unexpected_ie(1, Some(0x6f)),
            Err(RecvError::Rejected {
                cause: EmmCause::InformationElementNonExistent,
                decode_error: Some(DecodeError::UnexpectedIei),
            })
        );
    }

    #[test]
    fn test_handler_errors() {
        assert_eq!(handled(Ok(()), SapError::Handler), Ok(()));
        assert_eq!(
            handled(Err(EmmError::Cause(EmmCause::IllegalUe)), SapError::Handler),
            Err(RecvError::cause(EmmCause::IllegalUe))
        );
        assert_eq!(
            handled(Err(EmmError::Internal("gone".to_string())), SapError::LowerLayer),
            Err(RecvError::Failed(SapError::LowerLayer("gone".to_string())))
        );
    }
}
