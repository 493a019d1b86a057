//! Replay daemon configuration
//!
//! ```yaml
//! logger:
//!   level: info
//! emmas:
//!   subscribers:
//!     - ue_id: 1
//!       eksi: 0
//!       knas_int: "00112233445566778899aabbccddeeff"
//!       knas_enc: "00112233445566778899aabbccddeeff"
//!       integrity: 2
//!       ciphering: 0
//!   replay:
//!     - ue_id: 1
//!       primitive: data_ind
//!       pdu: "0741..."
//! ```

use std::path::Path;

use bytes::Bytes;
use ogs_emmas::{EmmAsData, EmmAsEstablish, EmmAsPrimitive, UeId};
use ogs_nas::common::types::SecurityAlgorithms;
use ogs_nas::eps::{EmmSecurityContext, NasCount};
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid key for ue_id {ue_id}: {reason}")]
    InvalidKey { ue_id: UeId, reason: String },
    #[error("Invalid {kind} algorithm {value} for ue_id {ue_id}, expected 0..=7")]
    InvalidAlgorithm { ue_id: UeId, kind: &'static str, value: u8 },
    #[error("Invalid PDU in replay entry {index}: {reason}")]
    InvalidPdu { index: usize, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmmasdConfig {
    pub logger: LoggerConfig,
    pub emmas: EmmasConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmmasConfig {
    pub subscribers: Vec<SubscriberConfig>,
    pub replay: Vec<ReplayConfig>,
}

/// Security context of one subscriber
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberConfig {
    pub ue_id: UeId,
    #[serde(default)]
    pub eksi: u8,
    /// KNASint, 32 hex digits
    pub knas_int: String,
    /// KNASenc, 32 hex digits
    pub knas_enc: String,
    #[serde(default)]
    pub integrity: u8,
    #[serde(default)]
    pub ciphering: u8,
    /// Packed 24-bit NAS COUNT
    #[serde(default)]
    pub ul_count: u32,
    #[serde(default)]
    pub dl_count: u32,
    #[serde(default)]
    pub activated: u32,
}

/// Inbound primitive a replayed PDU is delivered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPrimitive {
    DataInd,
    EstablishReq,
}

/// One uplink NAS PDU to replay through the SAP
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub ue_id: UeId,
    pub primitive: ReplayPrimitive,
    /// NAS PDU, hex encoded
    pub pdu: String,
}

impl EmmasdConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check every key and PDU without building anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        for subscriber in &self.emmas.subscribers {
            subscriber.security_context()?;
        }
        for (index, entry) in self.emmas.replay.iter().enumerate() {
            entry.primitive(index)?;
        }
        Ok(())
    }
}

fn parse_key(ue_id: UeId, text: &str) -> Result<[u8; 16], ConfigError> {
    let bytes = hex::decode(text.trim()).map_err(|e| ConfigError::InvalidKey {
        ue_id,
        reason: e.to_string(),
    })?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ConfigError::InvalidKey {
        ue_id,
        reason: format!("expected 16 octets, got {}", len),
    })
}

/// EEA/EIA identifiers are 3-bit fields
fn check_algorithm(ue_id: UeId, kind: &'static str, value: u8) -> Result<u8, ConfigError> {
    if value > 7 {
        return Err(ConfigError::InvalidAlgorithm { ue_id, kind, value });
    }
    Ok(value)
}

fn nas_count(packed: u32) -> NasCount {
    NasCount::new(((packed >> 8) & 0xffff) as u16, (packed & 0xff) as u8)
}

impl SubscriberConfig {
    pub fn security_context(&self) -> Result<EmmSecurityContext, ConfigError> {
        let knas_int = parse_key(self.ue_id, &self.knas_int)?;
        let knas_enc = parse_key(self.ue_id, &self.knas_enc)?;
        let ciphering = check_algorithm(self.ue_id, "ciphering", self.ciphering)?;
        let integrity = check_algorithm(self.ue_id, "integrity", self.integrity)?;
        Ok(EmmSecurityContext {
            ul_count: nas_count(self.ul_count),
            dl_count: nas_count(self.dl_count),
            activated: self.activated,
            ..EmmSecurityContext::native(
                self.eksi,
                knas_int,
                knas_enc,
                SecurityAlgorithms::new(ciphering, integrity),
            )
        })
    }
}

impl ReplayConfig {
    /// Inbound primitive for entry `index` of the replay list
    pub fn primitive(&self, index: usize) -> Result<EmmAsPrimitive, ConfigError> {
        let nas_msg = hex::decode(self.pdu.trim())
            .map(Bytes::from)
            .map_err(|e| ConfigError::InvalidPdu { index, reason: e.to_string() })?;

        Ok(match self.primitive {
            ReplayPrimitive::DataInd => EmmAsPrimitive::DataInd(EmmAsData {
                ue_id: self.ue_id,
                delivered: true,
                nas_msg,
                ..Default::default()
            }),
            ReplayPrimitive::EstablishReq => EmmAsPrimitive::EstablishReq(EmmAsEstablish {
                ue_id: self.ue_id,
                nas_msg,
                ..Default::default()
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
logger:
  level: debug
emmas:
  subscribers:
    - ue_id: 1
      eksi: 2
      knas_int: "00112233445566778899aabbccddeeff"
      knas_enc: "ffeeddccbbaa99887766554433221100"
      integrity: 2
      ciphering: 2
      ul_count: 259
      dl_count: 7
      activated: 1
  replay:
    - ue_id: 1
      primitive: data_ind
      pdu: "0762"
    - ue_id: 2
      primitive: establish_req
      pdu: "0741"
"#;

    #[test]
    fn test_parse_sample() {
        let config = EmmasdConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.logger.level, "debug");
        assert_eq!(config.emmas.subscribers.len(), 1);
        assert_eq!(config.emmas.replay.len(), 2);
        assert_eq!(config.emmas.replay[1].primitive, ReplayPrimitive::EstablishReq);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = EmmasdConfig::parse("emmas: {}").unwrap();
        assert_eq!(config.logger.level, "info");
        assert!(config.emmas.subscribers.is_empty());
        assert!(config.emmas.replay.is_empty());
    }

    #[test]
    fn test_security_context() {
        let config = EmmasdConfig::parse(SAMPLE).unwrap();
        let ctx = config.emmas.subscribers[0].security_context().unwrap();
        assert_eq!(ctx.eksi.value, 2);
        assert_eq!(ctx.knas_int[0], 0x00);
        assert_eq!(ctx.knas_enc[0], 0xff);
        assert_eq!(ctx.selected_algorithms, SecurityAlgorithms::new(2, 2));
        assert_eq!(ctx.ul_count, NasCount::new(1, 3));
        assert_eq!(ctx.dl_count, NasCount::new(0, 7));
        assert_eq!(ctx.activated, 1);
    }

    #[test]
    fn test_invalid_key() {
        let subscriber = SubscriberConfig {
            ue_id: 9,
            eksi: 0,
            knas_int: "0011".to_string(),
            knas_enc: "zz".to_string(),
            integrity: 0,
            ciphering: 0,
            ul_count: 0,
            dl_count: 0,
            activated: 0,
        };
        match subscriber.security_context() {
            Err(ConfigError::InvalidKey { ue_id: 9, reason }) => assert!(reason.contains("16 octets")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_algorithm_out_of_range() {
        let config = EmmasdConfig::parse(&SAMPLE.replace("integrity: 2", "integrity: 40")).unwrap();
        match config.validate() {
            Err(ConfigError::InvalidAlgorithm { ue_id: 1, kind: "integrity", value: 40 }) => {}
            other => panic!("unexpected {other:?}"),
        }

        let config = EmmasdConfig::parse(&SAMPLE.replace("ciphering: 2", "ciphering: 8")).unwrap();
        assert!(matches!(
            config.emmas.subscribers[0].security_context(),
            Err(ConfigError::InvalidAlgorithm { kind: "ciphering", value: 8, .. })
        ));

        let config = EmmasdConfig::parse(&SAMPLE.replace("ciphering: 2", "ciphering: 7")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replay_primitive() {
        let config = EmmasdConfig::parse(SAMPLE).unwrap();
        match config.emmas.replay[0].primitive(0).unwrap() {
            EmmAsPrimitive::DataInd(data) => {
                assert_eq!(data.ue_id, 1);
                assert!(data.delivered);
                assert_eq!(&data.nas_msg[..], &[0x07, 0x62]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match config.emmas.replay[1].primitive(1).unwrap() {
            EmmAsPrimitive::EstablishReq(establish) => {
                assert_eq!(establish.ue_id, 2);
                assert_eq!(&establish.nas_msg[..], &[0x07, 0x41]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pdu() {
        let entry = ReplayConfig {
            ue_id: 1,
            primitive: ReplayPrimitive::DataInd,
            pdu: "07x".to_string(),
        };
        assert!(matches!(entry.primitive(3), Err(ConfigError::InvalidPdu { index: 3, .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EmmasdConfig::load("/nonexistent/emmas.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
