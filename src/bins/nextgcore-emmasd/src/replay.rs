//! Replay of uplink NAS PDUs through the EMMAS-SAP
//!
//! The EMM side only logs what it receives. Causes reported through the
//! status procedure are turned into STATUS_IND primitives once the
//! inbound primitive has been processed.

use bytes::Bytes;
use log::{info, warn};
use ogs_emmas::*;
use ogs_nas::eps::*;

use crate::config::{ConfigError, EmmasdConfig};

/// EMM procedures that log every accepted message
#[derive(Debug, Default)]
pub struct LoggingEmm {
    /// Accepted uplink messages
    pub accepted: usize,
    /// Causes waiting to be reported to the UE
    pending_status: Vec<(UeId, EmmCause)>,
}

impl LoggingEmm {
    fn accept(&mut self, ue_id: UeId, name: &str, status: &DecodeStatus) -> EmmResult<()> {
        info!(
            "[ue_id={}] {} (integrity={}, ciphered={}, mac_matched={})",
            ue_id,
            name,
            status.integrity_protected_message,
            status.ciphered_message,
            status.mac_matched
        );
        self.accepted += 1;
        Ok(())
    }

    fn take_pending_status(&mut self) -> Vec<(UeId, EmmCause)> {
        std::mem::take(&mut self.pending_status)
    }
}

impl EmmProcedures for LoggingEmm {
    fn attach_request(&mut self, ue_id: UeId, _: &AttachRequest, status: &DecodeStatus) -> EmmResult<()> {
        self.accept(ue_id, "Attach request", status)
    }

    fn attach_complete(&mut self, ue_id: UeId, _: &AttachComplete, status: &DecodeStatus) -> EmmResult<()> {
        self.accept(ue_id, "Attach complete", status)
    }

    fn detach_request(&mut self, ue_id: UeId, _: &DetachRequest, status: &DecodeStatus) -> EmmResult<()> {
        self.accept(ue_id, "Detach request", status)
    }

    fn tracking_area_update_request(
        &mut self,
        ue_id: UeId,
        _: &TrackingAreaUpdateRequest,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.accept(ue_id, "Tracking area update request", status)
    }

    fn identity_response(&mut self, ue_id: UeId, _: &IdentityResponse, status: &DecodeStatus) -> EmmResult<()> {
        self.accept(ue_id, "Identity response", status)
    }

    fn authentication_response(
        &mut self,
        ue_id: UeId,
        _: &AuthenticationResponse,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.accept(ue_id, "Authentication response", status)
    }

    fn authentication_failure(
        &mut self,
        ue_id: UeId,
        msg: &AuthenticationFailure,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        warn!("[ue_id={}] Authentication failure (cause={:?})", ue_id, msg.emm_cause);
        self.accept(ue_id, "Authentication failure", status)
    }

    fn security_mode_complete(
        &mut self,
        ue_id: UeId,
        _: &SecurityModeComplete,
        status: &DecodeStatus,
    ) -> EmmResult<()> {
        self.accept(ue_id, "Security mode complete", status)
    }

    fn security_mode_reject(&mut self, ue_id: UeId, msg: &SecurityModeReject, status: &DecodeStatus) -> EmmResult<()> {
        warn!("[ue_id={}] Security mode reject (cause={:?})", ue_id, msg.emm_cause);
        self.accept(ue_id, "Security mode reject", status)
    }

    fn emm_status(&mut self, ue_id: UeId, msg: &EmmStatus, status: &DecodeStatus) -> EmmResult<()> {
        warn!("[ue_id={}] EMM status from UE (cause={:?})", ue_id, msg.emm_cause);
        self.accept(ue_id, "EMM status", status)
    }

    fn status(&mut self, ue_id: UeId, cause: EmmCause) -> EmmResult<()> {
        self.pending_status.push((ue_id, cause));
        Ok(())
    }

    fn lowerlayer_success(&mut self, ue_id: UeId) -> EmmResult<()> {
        info!("[ue_id={}] Lower layer delivery confirmed", ue_id);
        Ok(())
    }

    fn lowerlayer_failure(&mut self, ue_id: UeId) -> EmmResult<()> {
        warn!("[ue_id={}] Lower layer delivery failed", ue_id);
        Ok(())
    }

    fn lowerlayer_data_ind(&mut self, ue_id: UeId, data: &Bytes) -> EmmResult<()> {
        info!("[ue_id={}] ESM message ({} bytes)", ue_id, data.len());
        Ok(())
    }
}

/// Access stratum transport that logs and keeps every message
#[derive(Debug, Default)]
pub struct LoggingTransport {
    pub sent: Vec<AsMessage>,
}

impl AsTransport for LoggingTransport {
    fn send(&mut self, msg: AsMessage) -> SapResult<()> {
        info!("AS message {:?}", msg.id());
        if let Some(nas_msg) = msg.nas_msg() {
            let ue_id = match &msg {
                AsMessage::NasEstablishCnf(rsp) | AsMessage::NasEstablishRsp(rsp) => rsp.ue_id,
                AsMessage::DlInfoTransferReq(DlInfoTransferReq { address: AsAddress::UeId(ue_id), .. }) => {
                    *ue_id
                }
                _ => 0,
            };
            nas_log_dump("Downlink NAS PDU", ue_id, nas_msg);
        }
        self.sent.push(msg);
        Ok(())
    }
}

/// Outcome of a replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub replayed: usize,
    pub failed: usize,
    pub status_sent: usize,
}

/// Replays the configured PDUs
pub struct Replay {
    store: InMemoryContextStore,
    codec: EpsNasCodec,
    pub emm: LoggingEmm,
    pub transport: LoggingTransport,
}

impl Replay {
    /// Loads the subscriber security contexts
    pub fn new(config: &EmmasdConfig) -> Result<Self, ConfigError> {
        let store = InMemoryContextStore::new();
        for subscriber in &config.emmas.subscribers {
            store.insert(subscriber.ue_id, subscriber.security_context()?);
        }
        info!("{} subscriber security context(s) loaded", store.len());

        Ok(Self {
            store,
            codec: EpsNasCodec::network(),
            emm: LoggingEmm::default(),
            transport: LoggingTransport::default(),
        })
    }

    pub fn run(&mut self, config: &EmmasdConfig) -> Result<ReplaySummary, ConfigError> {
        let sap = EmmAs::new(&self.store, &self.codec, &DefaultPayloadBuilder);
        let mut summary = ReplaySummary::default();

        for (index, entry) in config.emmas.replay.iter().enumerate() {
            let primitive = entry.primitive(index)?;
            summary.replayed += 1;
            if sap.send(&primitive, &mut self.emm, &mut self.transport).is_err() {
                summary.failed += 1;
            }

            for (ue_id, emm_cause) in self.emm.take_pending_status() {
                let ctx = self.store.lookup(ue_id);
                let status = EmmAsPrimitive::StatusInd(EmmAsStatus {
                    ue_id,
                    sctx: Some(EmmAsSecurityData::from_context(ctx.as_ref(), false)),
                    emm_cause,
                    ..Default::default()
                });
                match sap.send(&status, &mut self.emm, &mut self.transport) {
                    Ok(()) => summary.status_sent += 1,
                    Err(e) => warn!("[ue_id={}] EMM status not sent: {}", ue_id, e),
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach_request_pdu() -> String {
        let msg = EmmMessage::AttachRequest(AttachRequest {
            eps_mobile_identity: EpsMobileIdentity::Imsi(vec![0, 0, 1, 0, 1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0]),
            ue_network_capability: UeNetworkCapability::new(0xe0, 0xe0),
            ..Default::default()
        });
        hex::encode(build_emm_message(&msg))
    }

    fn config(replay: &str) -> EmmasdConfig {
        EmmasdConfig::parse(&format!(
            r#"
emmas:
  subscribers:
    - ue_id: 1
      knas_int: "00112233445566778899aabbccddeeff"
      knas_enc: "00112233445566778899aabbccddeeff"
      integrity: 2
  replay:
{replay}
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_attach_request_is_accepted() {
        let config = config(&format!(
            "    - ue_id: 3\n      primitive: data_ind\n      pdu: \"{}\"\n    - ue_id: 4\n      primitive: establish_req\n      pdu: \"{}\"",
            attach_request_pdu(),
            attach_request_pdu()
        ));
        let mut replay = Replay::new(&config).unwrap();
        let summary = replay.run(&config).unwrap();

        assert_eq!(summary, ReplaySummary { replayed: 2, failed: 0, status_sent: 0 });
        assert_eq!(replay.emm.accepted, 2);
        assert!(replay.transport.sent.is_empty());
    }

    #[test]
    fn test_unsupported_message_gets_status() {
        let config = config("    - ue_id: 5\n      primitive: data_ind\n      pdu: \"0761\"");
        let mut replay = Replay::new(&config).unwrap();
        let summary = replay.run(&config).unwrap();

        assert_eq!(summary, ReplaySummary { replayed: 1, failed: 0, status_sent: 1 });
        assert_eq!(replay.emm.accepted, 0);
        match &replay.transport.sent[..] {
            [AsMessage::DlInfoTransferReq(req)] => {
                assert_eq!(req.address, AsAddress::UeId(5));
                assert_eq!(&req.nas_msg[..], &[0x07, 0x60, 97]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pdu_stops_replay() {
        let config = config("    - ue_id: 1\n      primitive: data_ind\n      pdu: \"zz\"");
        let mut replay = Replay::new(&config).unwrap();
        assert!(matches!(replay.run(&config), Err(ConfigError::InvalidPdu { index: 0, .. })));
    }
}
