//! NAS error types

use thiserror::Error;

/// NAS error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NasError {
    /// Buffer too short for decoding or for the encoding budget
    #[error("Buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    /// Invalid message type
    #[error("Invalid message type: {0:#04x}")]
    InvalidMessageType(u8),

    /// Invalid protocol discriminator
    #[error("Invalid protocol discriminator: {0:#03x}")]
    InvalidProtocolDiscriminator(u8),

    /// Invalid security header type
    #[error("Invalid security header type: {0}")]
    InvalidSecurityHeaderType(u8),

    /// Optional IE with an IEI this message does not define
    #[error("Unexpected IEI: {0:#04x}")]
    UnexpectedIei(u8),

    /// Invalid IE length
    #[error("Invalid IE length: expected {expected}, got {actual}")]
    InvalidIeLength { expected: usize, actual: usize },

    /// Missing mandatory IE
    #[error("Missing mandatory IE: {0}")]
    MissingMandatoryIe(&'static str),

    /// Invalid mobile identity type
    #[error("Invalid mobile identity type: {0}")]
    InvalidMobileIdentityType(u8),

    /// Encoding error
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Security error
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// Classification of a decode failure as seen by the EMM layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Too short to carry a complete message type
    #[error("buffer too short")]
    BufferTooShort,
    /// Protocol discriminator not handled by this decoder
    #[error("protocol not supported")]
    ProtocolNotSupported,
    /// Unknown or unexpected message type
    #[error("wrong message type")]
    WrongMessageType,
    /// Unknown optional information element
    #[error("unexpected IEI")]
    UnexpectedIei,
    /// Anything else
    #[error("fatal decode error")]
    Fatal,
}

impl NasError {
    /// Map this error onto the decode failure classes
    pub fn decode_error(&self) -> DecodeError {
        match self {
            NasError::BufferTooShort { .. } => DecodeError::BufferTooShort,
            NasError::InvalidProtocolDiscriminator(_) => DecodeError::ProtocolNotSupported,
            NasError::InvalidMessageType(_) => DecodeError::WrongMessageType,
            NasError::UnexpectedIei(_) => DecodeError::UnexpectedIei,
            _ => DecodeError::Fatal,
        }
    }
}

/// NAS result type
pub type NasResult<T> = Result<T, NasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_classification() {
        let short = NasError::BufferTooShort { expected: 2, actual: 1 };
        assert_eq!(short.decode_error(), DecodeError::BufferTooShort);
        assert_eq!(
            NasError::InvalidProtocolDiscriminator(0x0e).decode_error(),
            DecodeError::ProtocolNotSupported
        );
        assert_eq!(
            NasError::InvalidMessageType(0x47).decode_error(),
            DecodeError::WrongMessageType
        );
        assert_eq!(
            NasError::UnexpectedIei(0x99).decode_error(),
            DecodeError::UnexpectedIei
        );
        assert_eq!(
            NasError::MissingMandatoryIe("ESM message container").decode_error(),
            DecodeError::Fatal
        );
    }

    #[test]
    fn test_error_display() {
        let err = NasError::InvalidMessageType(0x47);
        assert_eq!(err.to_string(), "Invalid message type: 0x47");
    }
}
