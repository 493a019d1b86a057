//! AES Operations
//!
//! Thin wrapper around the `aes` crate. NAS confidentiality only needs
//! AES-128 in counter mode, so the context is fixed to a 128-bit key.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use thiserror::Error;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// Key size used by the EPS NAS algorithms
pub const AES_128_KEY_SIZE: usize = 16;

/// Error type for AES operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesError {
    /// Key is not 128 bits long
    #[error("Invalid AES key size")]
    InvalidKeySize,
    /// Output buffer shorter than the input
    #[error("AES output buffer too small")]
    OutputBufferTooSmall,
}

/// AES-128 encryption context
pub struct Aes128Context {
    cipher: Aes128,
}

impl Aes128Context {
    /// Set up an AES-128 context. The key must be exactly 16 bytes.
    pub fn new(key: &[u8]) -> Result<Self, AesError> {
        if key.len() != AES_128_KEY_SIZE {
            return Err(AesError::InvalidKeySize);
        }
        Ok(Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
        })
    }

    /// Encrypt a single 16-byte block
    pub fn encrypt_block(&self, input: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
        let mut block = GenericArray::clone_from_slice(input);
        self.cipher.encrypt_block(&mut block);
        let mut out = [0u8; AES_BLOCK_SIZE];
        out.copy_from_slice(&block);
        out
    }
}

/// Increment a 128-bit big-endian counter block
fn ctr128_inc(counter: &mut [u8; AES_BLOCK_SIZE]) {
    for byte in counter.iter_mut().rev() {
        let (next, carry) = byte.overflowing_add(1);
        *byte = next;
        if !carry {
            break;
        }
    }
}

/// AES-CTR128 encryption/decryption
///
/// CTR mode is symmetric: the same call enciphers and deciphers.
///
/// # Arguments
/// * `key` - 128-bit key
/// * `ivec` - Initial counter block, advanced past the last block used
/// * `input` - Input data
/// * `output` - Output buffer, at least `input.len()` bytes
pub fn aes_ctr128_encrypt(
    key: &[u8],
    ivec: &mut [u8; AES_BLOCK_SIZE],
    input: &[u8],
    output: &mut [u8],
) -> Result<(), AesError> {
    if output.len() < input.len() {
        return Err(AesError::OutputBufferTooSmall);
    }
    if input.is_empty() {
        return Ok(());
    }

    let ctx = Aes128Context::new(key)?;
    for (chunk_in, chunk_out) in input
        .chunks(AES_BLOCK_SIZE)
        .zip(output.chunks_mut(AES_BLOCK_SIZE))
    {
        let keystream = ctx.encrypt_block(ivec);
        ctr128_inc(ivec);
        for ((o, i), k) in chunk_out.iter_mut().zip(chunk_in).zip(keystream.iter()) {
            *o = i ^ k;
        }
    }

    Ok(())
}

/// In-place variant of [`aes_ctr128_encrypt`]
pub fn aes_ctr128_apply(
    key: &[u8],
    ivec: &mut [u8; AES_BLOCK_SIZE],
    data: &mut [u8],
) -> Result<(), AesError> {
    let input = data.to_vec();
    aes_ctr128_encrypt(key, ivec, &input, data)
}
