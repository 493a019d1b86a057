//! NAS message envelope encode/decode
//!
//! Security protection follows TS 24.301 Section 4.4.3 and 9.1: the MAC
//! covers the sequence number octet and the (ciphered) message, bearer 0.

use bytes::{BufMut, Bytes};
use log::{debug, warn};

use crate::common::types::{ProtocolDiscriminator, SecurityHeaderType};
use crate::error::{NasError, NasResult};
use super::header::*;
use super::message::{build_emm_message, parse_emm_message, EmmMessage};
use super::security::*;

/// Payload of a NAS message envelope
#[derive(Debug, Clone, PartialEq)]
pub enum NasMessageBody {
    /// Message sent without a security protected header
    Plain(EmmMessage),
    /// Message carried under a security protected header
    SecurityProtected(EmmMessage),
}

/// NAS message envelope
#[derive(Debug, Clone, PartialEq)]
pub struct NasMessage {
    pub header: NasSecurityHeader,
    pub body: NasMessageBody,
}

impl NasMessage {
    pub fn plain(message: EmmMessage) -> Self {
        Self { header: NasSecurityHeader::plain(), body: NasMessageBody::Plain(message) }
    }

    /// Wrap `message` under `header`, choosing the body kind from the header type
    pub fn with_header(header: NasSecurityHeader, message: EmmMessage) -> Self {
        let body = if header.security_header_type.is_protected() {
            NasMessageBody::SecurityProtected(message)
        } else {
            NasMessageBody::Plain(message)
        };
        Self { header, body }
    }

    /// The EMM message, protected or not
    pub fn emm(&self) -> &EmmMessage {
        match &self.body {
            NasMessageBody::Plain(msg) | NasMessageBody::SecurityProtected(msg) => msg,
        }
    }

    pub fn into_emm(self) -> EmmMessage {
        match self.body {
            NasMessageBody::Plain(msg) | NasMessageBody::SecurityProtected(msg) => msg,
        }
    }
}

/// Security outcome of decoding one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStatus {
    pub security_context_available: bool,
    pub integrity_protected_message: bool,
    pub ciphered_message: bool,
    pub mac_matched: bool,
}

/// Result of removing the security protection from a NAS PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// Outer security header; the protocol discriminator is the cleartext one
    pub header: NasSecurityHeader,
    /// Cleartext message, header included
    pub plain: Bytes,
    pub status: DecodeStatus,
}

impl Decrypted {
    /// Protocol discriminator of the cleartext message
    pub fn protocol_discriminator(&self) -> u8 {
        self.header.protocol_discriminator
    }
}

fn check_budget(needed: usize, max_len: usize) -> NasResult<()> {
    if needed > max_len {
        return Err(NasError::BufferTooShort { expected: needed, actual: max_len });
    }
    Ok(())
}

/// Verify the short MAC of a SERVICE REQUEST
fn verify_service_request(
    buf: &[u8],
    ctx: &EmmSecurityContext,
    direction: NasDirection,
) -> NasResult<bool> {
    let stored = ctx.count(direction);
    let received = buf[1] & 0x1f;
    let seq_num = (stored.seq_num & 0xe0) | received;
    let count = stored.estimate(seq_num);
    let mac = nas_mac_calculate(
        ctx.selected_algorithms.integrity,
        &ctx.knas_int,
        count.value(),
        NAS_SECURITY_BEARER,
        direction,
        &buf[..2],
    )?;
    let short_mac = u16::from_be_bytes([buf[2], buf[3]]);
    Ok(mac as u16 == short_mac)
}

/// Remove the security protection of `buf`
///
/// A MAC mismatch is not an error: the cleartext is still returned and
/// `status.mac_matched` is left false.
pub fn nas_message_decrypt(
    buf: &[u8],
    ctx: Option<&EmmSecurityContext>,
    direction: NasDirection,
) -> NasResult<Decrypted> {
    let first = *buf
        .first()
        .ok_or(NasError::BufferTooShort { expected: 1, actual: 0 })?;
    let protocol_discriminator = first & 0x0f;
    let mut status = DecodeStatus {
        security_context_available: ctx.is_some(),
        ..Default::default()
    };

    // Only EMM carries a security header type in the high nibble
    if protocol_discriminator != ProtocolDiscriminator::EpsMobilityManagement as u8 {
        return Ok(Decrypted {
            header: NasSecurityHeader { protocol_discriminator, ..NasSecurityHeader::plain() },
            plain: Bytes::copy_from_slice(buf),
            status,
        });
    }

    let security_header_type = SecurityHeaderType::try_from(first >> 4)?;
    match security_header_type {
        SecurityHeaderType::PlainNas => Ok(Decrypted {
            header: NasSecurityHeader::plain(),
            plain: Bytes::copy_from_slice(buf),
            status,
        }),
        SecurityHeaderType::ServiceRequest => {
            if buf.len() < NAS_SERVICE_REQUEST_SIZE {
                return Err(NasError::BufferTooShort {
                    expected: NAS_SERVICE_REQUEST_SIZE,
                    actual: buf.len(),
                });
            }
            status.integrity_protected_message = true;
            if let Some(ctx) = ctx {
                status.mac_matched = verify_service_request(buf, ctx, direction)?;
            }
            Ok(Decrypted {
                header: NasSecurityHeader::new(SecurityHeaderType::ServiceRequest, buf[1] & 0x1f),
                plain: Bytes::copy_from_slice(&buf[..NAS_SERVICE_REQUEST_SIZE]),
                status,
            })
        }
        _ => {
            let mut bytes = Bytes::copy_from_slice(buf);
            let mut header = NasSecurityHeader::decode(&mut bytes)?;
            let mut payload = bytes.to_vec();

            status.integrity_protected_message = true;
            status.ciphered_message = security_header_type.is_ciphered();

            if let Some(ctx) = ctx {
                let count = ctx.count(direction).estimate(header.sequence_number);
                let mac = nas_mac_calculate(
                    ctx.selected_algorithms.integrity,
                    &ctx.knas_int,
                    count.value(),
                    NAS_SECURITY_BEARER,
                    direction,
                    &buf[NAS_MESSAGE_SECURITY_HEADER_SIZE - 1..],
                )?;
                status.mac_matched = mac == header.message_authentication_code;
                if !status.mac_matched {
                    warn!(
                        "NAS MAC verification failed (received {:08x}, computed {:08x})",
                        header.message_authentication_code, mac
                    );
                }

                if status.ciphered_message {
                    nas_cipher(
                        ctx.selected_algorithms.ciphering,
                        &ctx.knas_enc,
                        count.value(),
                        NAS_SECURITY_BEARER,
                        direction,
                        &mut payload,
                    )?;
                }
            } else {
                debug!("No security context, protected message left as is");
            }

            if let Some(inner) = payload.first() {
                header.protocol_discriminator = inner & 0x0f;
            }

            Ok(Decrypted { header, plain: Bytes::from(payload), status })
        }
    }
}

/// Decode a NAS PDU into an EMM message envelope
pub fn nas_message_decode(
    buf: &[u8],
    ctx: Option<&EmmSecurityContext>,
    direction: NasDirection,
) -> NasResult<(NasMessage, DecodeStatus)> {
    let decrypted = nas_message_decrypt(buf, ctx, direction)?;
    let mut plain = decrypted.plain;
    let message = parse_emm_message(&mut plain)?;
    Ok((NasMessage::with_header(decrypted.header, message), decrypted.status))
}

/// Encode `msg` into `out`; at most `max_len` bytes are produced
pub fn nas_message_encode(
    msg: &NasMessage,
    out: &mut Vec<u8>,
    max_len: usize,
    ctx: Option<&EmmSecurityContext>,
    direction: NasDirection,
) -> NasResult<usize> {
    let plain = build_emm_message(msg.emm());
    nas_message_encrypt(&plain, &msg.header, out, max_len, ctx, direction)
}

/// Protect an already encoded message according to `header`
pub fn nas_message_encrypt(
    plain: &[u8],
    header: &NasSecurityHeader,
    out: &mut Vec<u8>,
    max_len: usize,
    ctx: Option<&EmmSecurityContext>,
    direction: NasDirection,
) -> NasResult<usize> {
    match header.security_header_type {
        SecurityHeaderType::PlainNas => {
            check_budget(plain.len(), max_len)?;
            out.extend_from_slice(plain);
            Ok(plain.len())
        }
        SecurityHeaderType::ServiceRequest => {
            check_budget(NAS_SERVICE_REQUEST_SIZE, max_len)?;
            if plain.len() < NAS_SERVICE_REQUEST_SIZE {
                return Err(NasError::BufferTooShort {
                    expected: NAS_SERVICE_REQUEST_SIZE,
                    actual: plain.len(),
                });
            }
            let ctx = ctx.ok_or_else(|| {
                NasError::SecurityError("No security context for SERVICE REQUEST".to_string())
            })?;
            let mut bytes = plain[..NAS_SERVICE_REQUEST_SIZE].to_vec();
            let stored = ctx.count(direction);
            let count = stored.estimate((stored.seq_num & 0xe0) | (bytes[1] & 0x1f));
            let mac = nas_mac_calculate(
                ctx.selected_algorithms.integrity,
                &ctx.knas_int,
                count.value(),
                NAS_SECURITY_BEARER,
                direction,
                &bytes[..2],
            )?;
            bytes[2..].copy_from_slice(&(mac as u16).to_be_bytes());
            out.extend_from_slice(&bytes);
            Ok(bytes.len())
        }
        security_header_type => {
            let total = NAS_MESSAGE_SECURITY_HEADER_SIZE + plain.len();
            check_budget(total, max_len)?;
            let ctx = ctx.ok_or_else(|| {
                NasError::SecurityError("No security context for protected message".to_string())
            })?;

            let count = ctx.count(direction).estimate(header.sequence_number);
            let mut payload = plain.to_vec();
            if security_header_type.is_ciphered() {
                nas_cipher(
                    ctx.selected_algorithms.ciphering,
                    &ctx.knas_enc,
                    count.value(),
                    NAS_SECURITY_BEARER,
                    direction,
                    &mut payload,
                )?;
            }

            let mut protected = Vec::with_capacity(1 + payload.len());
            protected.put_u8(header.sequence_number);
            protected.extend_from_slice(&payload);
            let mac = nas_mac_calculate(
                ctx.selected_algorithms.integrity,
                &ctx.knas_int,
                count.value(),
                NAS_SECURITY_BEARER,
                direction,
                &protected,
            )?;

            let start = out.len();
            NasSecurityHeader {
                security_header_type,
                protocol_discriminator: ProtocolDiscriminator::EpsMobilityManagement as u8,
                message_authentication_code: mac,
                sequence_number: header.sequence_number,
            }
            .encode(out);
            out.extend_from_slice(&payload);
            Ok(out.len() - start)
        }
    }
}
