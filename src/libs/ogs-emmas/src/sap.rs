//! EMMAS-SAP primitive dispatcher
//!
//! Primitives from the access stratum go through the receive pipeline,
//! everything else is turned into an access stratum message and handed to
//! the transport. Invalid inbound EMM messages are answered with an EMM
//! status from here, at most once per primitive.

use log::{debug, error, info, warn};
use ogs_nas::eps::{DecodeError, EmmCause};

use crate::codec::NasCodec;
use crate::context::ContextStore;
use crate::error::{SapError, SapResult};
use crate::handler::{AsTransport, EmmPayloadBuilder, EmmProcedures};
use crate::primitive::{EmmAsPrimitive, UeId};
use crate::recv::RecvError;

/// EMMAS service access point
///
/// Holds the collaborators that outlive a single primitive: the security
/// context store (read only), the NAS codec and the downlink payload
/// builder.
pub struct EmmAs<'a> {
    pub(crate) store: &'a dyn ContextStore,
    pub(crate) codec: &'a dyn NasCodec,
    pub(crate) builder: &'a dyn EmmPayloadBuilder,
}

impl<'a> EmmAs<'a> {
    pub fn new(
        store: &'a dyn ContextStore,
        codec: &'a dyn NasCodec,
        builder: &'a dyn EmmPayloadBuilder,
    ) -> Self {
        Self { store, codec, builder }
    }

    /// Process one EMMAS-SAP primitive
    pub fn send(
        &self,
        primitive: &EmmAsPrimitive,
        emm: &mut dyn EmmProcedures,
        transport: &mut dyn AsTransport,
    ) -> SapResult<()> {
        let name = primitive.name();
        info!("EMMAS-SAP - Received primitive {}", name);

        let result = if primitive.is_inbound() {
            self.receive(primitive, emm)
        } else {
            self.forward(primitive, transport)
        };

        if let Err(e) = &result {
            error!("EMMAS-SAP - Failed to process primitive {}: {}", name, e);
        }
        result
    }

    fn receive(&self, primitive: &EmmAsPrimitive, emm: &mut dyn EmmProcedures) -> SapResult<()> {
        let (ue_id, result) = match primitive {
            EmmAsPrimitive::DataInd(data) => (data.ue_id, self.data_ind(data, emm)),
            EmmAsPrimitive::EstablishReq(establish) => {
                (establish.ue_id, self.establish_req(establish, emm))
            }
            EmmAsPrimitive::CellInfoRes(info) | EmmAsPrimitive::CellInfoInd(info) => {
                debug!(
                    "EMMAS-SAP - Cell information (found={}, tac={}, cell_id={})",
                    info.found, info.tac, info.cell_id
                );
                return Ok(());
            }
            _ => return Err(SapError::NothingToSend(primitive.name())),
        };

        match result {
            Ok(()) => Ok(()),
            Err(RecvError::Failed(e)) => Err(e),
            Err(RecvError::Rejected { cause, decode_error }) => {
                self.reject(ue_id, cause, decode_error, emm)
            }
        }
    }

    /// Answer an invalid inbound message with an EMM status
    fn reject(
        &self,
        ue_id: UeId,
        cause: EmmCause,
        decode_error: Option<DecodeError>,
        emm: &mut dyn EmmProcedures,
    ) -> SapResult<()> {
        let cause = match decode_error {
            Some(DecodeError::BufferTooShort) | Some(DecodeError::ProtocolNotSupported) => {
                debug!("[ue_id={}] Ignoring EMM message ({:?})", ue_id, decode_error);
                return Ok(());
            }
            Some(DecodeError::WrongMessageType) => EmmCause::MessageTypeNonExistent,
            _ => cause,
        };

        warn!(
            "[ue_id={}] EMMAS-SAP - Received EMM message is not valid (cause={})",
            ue_id, cause as u8
        );
        emm.status(ue_id, cause).map_err(|e| SapError::Status(e.to_string()))
    }

    fn forward(
        &self,
        primitive: &EmmAsPrimitive,
        transport: &mut dyn AsTransport,
    ) -> SapResult<()> {
        let message = match primitive {
            EmmAsPrimitive::DataReq(data) => self.data_req(data),
            EmmAsPrimitive::StatusInd(status) => self.status_ind(status),
            EmmAsPrimitive::ReleaseReq(release) => Some(self.release_req(release)),
            EmmAsPrimitive::SecurityReq(security) => self.security_req(security),
            EmmAsPrimitive::SecurityRej(security) => self.security_rej(security),
            EmmAsPrimitive::EstablishCnf(establish) => self.establish_cnf(establish),
            EmmAsPrimitive::EstablishRej(establish) => self.establish_rej(establish),
            EmmAsPrimitive::PageInd(page) => self.page_ind(page),
            EmmAsPrimitive::CellInfoReq(cell_info) => self.cell_info_req(cell_info),
            _ => {
                warn!("EMMAS-SAP - Primitive {} is not forwarded to the access stratum", primitive.name());
                None
            }
        };

        let message = message.ok_or(SapError::NothingToSend(primitive.name()))?;
        debug!("EMMAS-SAP - Sending {:?} for {}", message.id(), primitive.name());
        transport.send(message)
    }
}
