//! NextGCore Cryptographic Library
//!
//! Block cipher and MAC building blocks used by the EPS NAS security
//! functions (128-EEA2 keystream and 128-EIA2 message authentication).

pub mod aes;        // AES-128 block and CTR keystream
pub mod aes_cmac;   // AES-CMAC (RFC 4493)
