//! AES-CMAC
//!
//! RFC 4493 message authentication over the `cmac` crate. 128-EIA2 takes
//! the 32 most significant bits of this value.

use aes::Aes128;
use cmac::{Cmac, Mac};
use thiserror::Error;

/// CMAC output size in bytes
pub const CMAC_SIZE: usize = 16;

/// Error type for CMAC operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmacError {
    /// Key is not 128 bits long
    #[error("Invalid CMAC key size")]
    InvalidKeySize,
    /// Verification failed
    #[error("CMAC verification failed")]
    InvalidCmac,
}

/// Calculate AES-CMAC for a message
///
/// # Arguments
/// * `key` - 128-bit key
/// * `msg` - Message to authenticate
///
/// # Returns
/// * 16-byte CMAC value
pub fn aes_cmac_calculate(key: &[u8], msg: &[u8]) -> Result<[u8; CMAC_SIZE], CmacError> {
    let mut mac =
        <Cmac<Aes128> as Mac>::new_from_slice(key).map_err(|_| CmacError::InvalidKeySize)?;
    mac.update(msg);
    let mut out = [0u8; CMAC_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Verify a (possibly truncated) AES-CMAC
///
/// `expected` may be shorter than [`CMAC_SIZE`]; only its length is compared.
pub fn aes_cmac_verify(expected: &[u8], key: &[u8], msg: &[u8]) -> Result<(), CmacError> {
    if expected.is_empty() || expected.len() > CMAC_SIZE {
        return Err(CmacError::InvalidCmac);
    }
    let calculated = aes_cmac_calculate(key, msg)?;

    let diff = calculated
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    if diff == 0 {
        Ok(())
    } else {
        Err(CmacError::InvalidCmac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4493 section 4
    const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";

    #[test]
    fn test_cmac_empty_message() {
        let key = hex::decode(KEY).unwrap();
        let mac = aes_cmac_calculate(&key, &[]).unwrap();
        assert_eq!(hex::encode(mac), "bb1d6929e95937287fa37d129b756746");
    }

    #[test]
    fn test_cmac_one_block() {
        let key = hex::decode(KEY).unwrap();
        let msg = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let mac = aes_cmac_calculate(&key, &msg).unwrap();
        assert_eq!(hex::encode(mac), "070a16b46b4d4144f79bdd9dd04a287c");
    }

    #[test]
    fn test_cmac_verify_truncated() {
        let key = hex::decode(KEY).unwrap();
        let msg = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        assert!(aes_cmac_verify(&[0x07, 0x0a, 0x16, 0xb4], &key, &msg).is_ok());
        assert_eq!(
            aes_cmac_verify(&[0x07, 0x0a, 0x16, 0xb5], &key, &msg),
            Err(CmacError::InvalidCmac)
        );
    }

    #[test]
    fn test_cmac_bad_key() {
        assert_eq!(
            aes_cmac_calculate(&[0u8; 15], b"x"),
            Err(CmacError::InvalidKeySize)
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(CmacError::InvalidKeySize.to_string(), "Invalid CMAC key size");
        let err: Box<dyn std::error::Error> = Box::new(CmacError::InvalidCmac);
        assert_eq!(err.to_string(), "CMAC verification failed");
    }
}
