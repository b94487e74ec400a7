//! Protocol-level error type: malformed register content observed on the
//! wire, as distinct from transport failures or peer behaviour timeouts.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("impossible status word combination: {raw:#06x}")]
    InvalidStatusCombination { raw: u16 },

    #[error("unrecognized command code {code}")]
    InvalidCommandCode { code: u16 },

    #[error("result area malformed: {0}")]
    MalformedResult(String),
}
