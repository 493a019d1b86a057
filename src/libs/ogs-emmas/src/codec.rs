//! NAS codec seam and the buffer handling around it

use bytes::Bytes;
use log::warn;
use ogs_nas::eps::{
    nas_message_decode, nas_message_decrypt, nas_message_encode, nas_message_encrypt,
    DecodeStatus, Decrypted, EmmSecurityContext, NasDirection, NasMessage, NasSecurityHeader,
    NAS_MESSAGE_SECURITY_HEADER_SIZE,
};
use ogs_nas::NasResult;

/// NAS message codec used by the service access point
pub trait NasCodec {
    /// Decode an inbound PDU into an EMM message
    fn decode(
        &self,
        buf: &[u8],
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<(NasMessage, DecodeStatus)>;

    /// Remove the security protection of an inbound PDU
    fn decrypt(&self, buf: &[u8], ctx: Option<&EmmSecurityContext>) -> NasResult<Decrypted>;

    /// Encode an outbound message, at most `max_len` bytes
    fn encode(
        &self,
        msg: &NasMessage,
        out: &mut Vec<u8>,
        max_len: usize,
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<usize>;

    /// Protect an already encoded outbound message
    fn encrypt(
        &self,
        plain: &[u8],
        header: &NasSecurityHeader,
        out: &mut Vec<u8>,
        max_len: usize,
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<usize>;
}

/// EPS NAS codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpsNasCodec {
    /// Direction of received messages
    pub rx: NasDirection,
    /// Direction of sent messages
    pub tx: NasDirection,
}

impl EpsNasCodec {
    /// Network side: uplink in, downlink out
    pub fn network() -> Self {
        Self { rx: NasDirection::Uplink, tx: NasDirection::Downlink }
    }

    /// UE side: downlink in, uplink out
    pub fn ue() -> Self {
        Self { rx: NasDirection::Downlink, tx: NasDirection::Uplink }
    }
}

impl Default for EpsNasCodec {
    fn default() -> Self {
        Self::network()
    }
}

impl NasCodec for EpsNasCodec {
    fn decode(
        &self,
        buf: &[u8],
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<(NasMessage, DecodeStatus)> {
        nas_message_decode(buf, ctx, self.rx)
    }

    fn decrypt(&self, buf: &[u8], ctx: Option<&EmmSecurityContext>) -> NasResult<Decrypted> {
        nas_message_decrypt(buf, ctx, self.rx)
    }

    fn encode(
        &self,
        msg: &NasMessage,
        out: &mut Vec<u8>,
        max_len: usize,
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<usize> {
        nas_message_encode(msg, out, max_len, ctx, self.tx)
    }

    fn encrypt(
        &self,
        plain: &[u8],
        header: &NasSecurityHeader,
        out: &mut Vec<u8>,
        max_len: usize,
        ctx: Option<&EmmSecurityContext>,
    ) -> NasResult<usize> {
        nas_message_encrypt(plain, header, out, max_len, ctx, self.tx)
    }
}

/// Output budget for a `length` octet message under `header`
fn output_budget(header: &NasSecurityHeader, length: usize) -> usize {
    if header.security_header_type.is_protected() {
        length + NAS_MESSAGE_SECURITY_HEADER_SIZE
    } else {
        length
    }
}

fn allocate(len: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    match buf.try_reserve_exact(len) {
        Ok(()) => Some(buf),
        Err(e) => {
            warn!("Failed to allocate {} bytes for NAS message: {}", len, e);
            None
        }
    }
}

fn finish(result: NasResult<usize>, buf: Vec<u8>) -> Option<Bytes> {
    match result {
        Ok(bytes) if bytes > 0 => Some(Bytes::from(buf)),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to encode NAS message: {}", e);
            None
        }
    }
}

/// Encode `msg` whose plain form is `length` octets
pub(crate) fn emm_as_encode(
    codec: &dyn NasCodec,
    msg: &NasMessage,
    length: usize,
    ctx: Option<&EmmSecurityContext>,
) -> Option<Bytes> {
    let max_len = output_budget(&msg.header, length);
    let mut buf = allocate(max_len)?;
    let result = codec.encode(msg, &mut buf, max_len, ctx);
    finish(result, buf)
}

/// Protect the first `length` octets of the encoded message `plain`
pub(crate) fn emm_as_encrypt(
    codec: &dyn NasCodec,
    header: &NasSecurityHeader,
    plain: &[u8],
    length: usize,
    ctx: Option<&EmmSecurityContext>,
) -> Option<Bytes> {
    let plain = plain.get(..length)?;
    let max_len = output_budget(header, length);
    let mut buf = allocate(max_len)?;
    let result = codec.encrypt(plain, header, &mut buf, max_len, ctx);
    finish(result, buf)
}
