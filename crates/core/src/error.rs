use std::fmt;

use crate::params::{CodecIdentity, CodecState};

/// Public error taxonomy for the codec session API.
///
/// `WaitTimeout` is expected during normal operation (a blocking exchange op
/// whose deadline elapsed) and is the only retryable variant; everything else
/// reports a caller or resource fault.
///
/// # Example
/// ```rust
/// use acheron_core::prelude::MediaError;
///
/// let err = MediaError::WaitTimeout;
/// assert!(err.retryable());
/// assert_eq!(err.code(), "wait_timeout");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Malformed or out-of-range argument.
    #[error("invalid parameters: {0}")]
    InvalidParams(&'static str),
    /// Instance index is outside the addressable range.
    #[error("instance index {0} is not addressable")]
    InvalidInstance(u32),
    /// Lifecycle, role, or capability mismatch.
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(NotAllowed),
    /// No instance slot or memory left.
    #[error("insufficient resources: {0}")]
    InsufficientResources(&'static str),
    /// A blocking operation's deadline elapsed with nothing ready.
    #[error("wait timed out")]
    WaitTimeout,
    /// The requested codec subsystem is not compiled into this build.
    #[error("codec not found")]
    CodecNotFound,
    /// Unexpected internal condition.
    #[error("unknown media error")]
    Unknown,
}

impl MediaError {
    /// Stable string code for error classification.
    ///
    /// `OperationNotAllowed` fans out into per-cause codes so callers can
    /// tell "never created" apart from "created but for the wrong kind of
    /// codec" without string matching on messages.
    pub fn code(&self) -> &'static str {
        match self {
            MediaError::InvalidParams(_) => "invalid_params",
            MediaError::InvalidInstance(_) => "invalid_instance",
            MediaError::OperationNotAllowed(detail) => detail.code(),
            MediaError::InsufficientResources(_) => "insufficient_resources",
            MediaError::WaitTimeout => "wait_timeout",
            MediaError::CodecNotFound => "codec_not_found",
            MediaError::Unknown => "unknown",
        }
    }

    /// Whether the operation may succeed when retried as-is.
    pub fn retryable(&self) -> bool {
        matches!(self, MediaError::WaitTimeout)
    }
}

/// Structured detail for [`MediaError::OperationNotAllowed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotAllowed {
    /// No task exists for the given context.
    TaskNotExist,
    /// A task exists at this instance but for a different codec identity.
    AppTypeMismatch {
        requested: CodecIdentity,
        actual: CodecIdentity,
    },
    /// The task is not in a legal state for this operation.
    WrongState {
        op: &'static str,
        state: CodecState,
    },
    /// The parameter kind does not apply to this codec identity.
    UnsupportedConfig {
        kind: &'static str,
        identity: CodecIdentity,
    },
    /// An input buffer with `frame_end` was already accepted for this run.
    InputDrained,
    /// The task still has outstanding references.
    TaskBusy { refs: u32 },
}

impl NotAllowed {
    pub fn code(&self) -> &'static str {
        match self {
            NotAllowed::TaskNotExist => "task_not_exist",
            NotAllowed::AppTypeMismatch { .. } => "wrong_app_type",
            NotAllowed::WrongState { .. } => "wrong_state",
            NotAllowed::UnsupportedConfig { .. } => "unsupported_config",
            NotAllowed::InputDrained => "input_drained",
            NotAllowed::TaskBusy { .. } => "task_busy",
        }
    }
}

impl fmt::Display for NotAllowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotAllowed::TaskNotExist => write!(f, "no task exists for this context"),
            NotAllowed::AppTypeMismatch { requested, actual } => write!(
                f,
                "context identity {requested:?} does not match task identity {actual:?}"
            ),
            NotAllowed::WrongState { op, state } => {
                write!(f, "{op} is not legal in state {state:?}")
            }
            NotAllowed::UnsupportedConfig { kind, identity } => {
                write!(f, "{kind} is not supported for {identity:?}")
            }
            NotAllowed::InputDrained => write!(f, "input end-of-stream already queued"),
            NotAllowed::TaskBusy { refs } => {
                write!(f, "task has {refs} outstanding reference(s)")
            }
        }
    }
}

/// Outcome of a registry lookup that did not produce a task.
///
/// The four variants mirror distinct caller mistakes and keep distinct
/// public codes after mapping through [`MediaError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No task exists for the context.
    #[error("no task exists for this context")]
    NotExist,
    /// The task at this instance belongs to a different codec identity.
    #[error("task identity {actual:?} does not match requested {requested:?}")]
    WrongAppType {
        requested: CodecIdentity,
        actual: CodecIdentity,
    },
    /// Instance index out of range.
    #[error("instance index {0} out of range")]
    WrongInstance(u32),
    /// Malformed lookup request.
    #[error("malformed lookup: {0}")]
    InvalidParams(&'static str),
}

impl LookupError {
    /// True when the failure means "no task is live for this context" rather
    /// than a malformed request. State queries and defaultable config reads
    /// treat absence as a non-error.
    pub fn task_absent(&self) -> bool {
        matches!(
            self,
            LookupError::NotExist | LookupError::WrongAppType { .. }
        )
    }
}

impl From<LookupError> for MediaError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotExist => MediaError::OperationNotAllowed(NotAllowed::TaskNotExist),
            LookupError::WrongAppType { requested, actual } => {
                MediaError::OperationNotAllowed(NotAllowed::AppTypeMismatch { requested, actual })
            }
            LookupError::WrongInstance(index) => MediaError::InvalidInstance(index),
            LookupError::InvalidParams(what) => MediaError::InvalidParams(what),
        }
    }
}
