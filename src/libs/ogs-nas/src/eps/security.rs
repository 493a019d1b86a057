//! EPS NAS security context and algorithms
//!
//! Based on 3GPP TS 33.401 Annex B and TS 24.301 Section 4.4

use ogs_crypt::aes::aes_ctr128_apply;
use ogs_crypt::aes_cmac::aes_cmac_calculate;

use crate::common::types::{KeySetIdentifier, SecurityAlgorithms};
use crate::error::{NasError, NasResult};

/// NAS security bearer (always 0 for NAS)
pub const NAS_SECURITY_BEARER: u8 = 0;

/// NAS-MAC size in bytes
pub const NAS_SECURITY_MAC_SIZE: usize = 4;

/// Direction bit fed to the EPS algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NasDirection {
    Uplink = 0,
    Downlink = 1,
}

/// Kind of EPS security context (TS 24.301 Section 4.4.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityContextType {
    #[default]
    NotAvailable,
    PartialNative,
    FullNative,
    Mapped,
}

/// NAS COUNT: 16-bit overflow counter and 8-bit sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NasCount {
    pub overflow: u16,
    pub seq_num: u8,
}

impl NasCount {
    pub fn new(overflow: u16, seq_num: u8) -> Self {
        Self { overflow, seq_num }
    }

    /// 24-bit count value as fed to the algorithms
    pub fn value(&self) -> u32 {
        ((self.overflow as u32) << 8) | self.seq_num as u32
    }

    /// Advance by one, carrying into the overflow counter
    pub fn increment(&mut self) {
        if self.seq_num == u8::MAX {
            self.overflow = self.overflow.wrapping_add(1);
        }
        self.seq_num = self.seq_num.wrapping_add(1);
    }

    /// Count the peer used for a received sequence number
    ///
    /// A sequence number lower than the stored one means the peer wrapped.
    pub fn estimate(&self, received_seq: u8) -> NasCount {
        let overflow = if received_seq < self.seq_num {
            self.overflow.wrapping_add(1)
        } else {
            self.overflow
        };
        NasCount { overflow, seq_num: received_seq }
    }
}

/// EPS security context of one UE
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmmSecurityContext {
    pub sc_type: SecurityContextType,
    /// eKSI the context is identified by
    pub eksi: KeySetIdentifier,
    pub knas_int: [u8; 16],
    pub knas_enc: [u8; 16],
    pub selected_algorithms: SecurityAlgorithms,
    pub ul_count: NasCount,
    pub dl_count: NasCount,
    /// Number of times the context was taken into use
    pub activated: u32,
}

impl EmmSecurityContext {
    /// Full native context for the given keys and algorithms
    pub fn native(
        eksi: u8,
        knas_int: [u8; 16],
        knas_enc: [u8; 16],
        selected_algorithms: SecurityAlgorithms,
    ) -> Self {
        Self {
            sc_type: SecurityContextType::FullNative,
            eksi: KeySetIdentifier::new(0, eksi),
            knas_int,
            knas_enc,
            selected_algorithms,
            ..Default::default()
        }
    }

    /// Whether the context carries usable keys
    pub fn is_available(&self) -> bool {
        self.sc_type != SecurityContextType::NotAvailable
    }

    /// Stored count for messages travelling in `direction`
    pub fn count(&self, direction: NasDirection) -> NasCount {
        match direction {
            NasDirection::Uplink => self.ul_count,
            NasDirection::Downlink => self.dl_count,
        }
    }

    pub fn count_mut(&mut self, direction: NasDirection) -> &mut NasCount {
        match direction {
            NasDirection::Uplink => &mut self.ul_count,
            NasDirection::Downlink => &mut self.dl_count,
        }
    }
}

/// Calculate the 32-bit NAS-MAC
pub fn nas_mac_calculate(
    algorithm: u8,
    knas_int: &[u8; 16],
    count: u32,
    bearer: u8,
    direction: NasDirection,
    message: &[u8],
) -> NasResult<u32> {
    match algorithm {
        SecurityAlgorithms::EIA0 => Ok(0),
        SecurityAlgorithms::EIA2 => {
            // COUNT || BEARER || DIRECTION || 0^26 || MESSAGE
            let mut input = Vec::with_capacity(8 + message.len());
            input.extend_from_slice(&count.to_be_bytes());
            input.push((bearer << 3) | ((direction as u8) << 2));
            input.extend_from_slice(&[0u8; 3]);
            input.extend_from_slice(message);

            let cmac = aes_cmac_calculate(knas_int, &input)
                .map_err(|e| NasError::SecurityError(format!("128-EIA2: {e}")))?;
            Ok(u32::from_be_bytes([cmac[0], cmac[1], cmac[2], cmac[3]]))
        }
        other => Err(NasError::SecurityError(format!(
            "Integrity algorithm EIA{other} not supported"
        ))),
    }
}

/// Cipher or decipher `message` in place
pub fn nas_cipher(
    algorithm: u8,
    knas_enc: &[u8; 16],
    count: u32,
    bearer: u8,
    direction: NasDirection,
    message: &mut [u8],
) -> NasResult<()> {
    match algorithm {
        SecurityAlgorithms::EEA0 => Ok(()),
        SecurityAlgorithms::EEA2 => {
            if message.is_empty() {
                return Ok(());
            }
            let mut ivec = [0u8; 16];
            ivec[..4].copy_from_slice(&count.to_be_bytes());
            ivec[4] = (bearer << 3) | ((direction as u8) << 2);

            aes_ctr128_apply(knas_enc, &mut ivec, message)
                .map_err(|e| NasError::SecurityError(format!("128-EEA2: {e}")))
        }
        other => Err(NasError::SecurityError(format!(
            "Ciphering algorithm EEA{other} not supported"
        ))),
    }
}
