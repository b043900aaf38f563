use thiserror::Error;

/// Core error type for llmattrs.
/// Attribute extraction itself is total; these errors only surface at the
/// raw-JSON and configuration boundaries.
#[derive(Debug, Error)]
pub enum LlmAttrsError {
    /// A message carried a role outside the closed set. This is a contract
    /// violation between the caller's payload typing and this crate, not a
    /// "missing data" outcome.
    #[error("contract violation: unknown message role '{0}'")]
    UnknownRole(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LlmAttrsError {
    /// True for faults that indicate a broken typing contract rather than a
    /// bad or incomplete payload.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::UnknownRole(_))
    }
}

pub type CoreResult<T> = std::result::Result<T, LlmAttrsError>;
