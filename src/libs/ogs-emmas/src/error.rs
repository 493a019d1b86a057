//! EMMAS-SAP error types

use ogs_nas::eps::EmmCause;
use thiserror::Error;

/// Failure reported by an EMM collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmmError {
    /// The message is refused with an EMM cause; an EMM STATUS is returned
    #[error("EMM cause {0:?}")]
    Cause(EmmCause),
    /// Failure with no cause to report to the UE
    #[error("{0}")]
    Internal(String),
}

/// Result type for EMM collaborators
pub type EmmResult<T> = Result<T, EmmError>;

/// Failure of one primitive at the service access point
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SapError {
    /// The send pipeline produced no access stratum message
    #[error("Nothing to send for {0}")]
    NothingToSend(&'static str),
    /// The access stratum refused the message
    #[error("Transport failure: {0}")]
    Transport(String),
    /// A lower layer notification could not be processed
    #[error("Lower layer procedure failed: {0}")]
    LowerLayer(String),
    /// An EMM receive handler failed without a cause
    #[error("EMM handler failed: {0}")]
    Handler(String),
    /// The EMM status procedure failed
    #[error("EMM status procedure failed: {0}")]
    Status(String),
}

/// Result type for the service access point
pub type SapResult<T> = Result<T, SapError>;
