use std::time::Duration;

use thiserror::Error;
use xml_doc_core::{ParseError, XPathError};

use crate::objects::NodeKind;
use crate::protocol::Action;

/// Remote code for "object not present".
pub const CODE_NOT_PRESENT: &str = "7";
/// Remote code for "invalid object".
pub const CODE_INVALID_OBJECT: &str = "12";
/// Remote code for "operation not possible".
pub const CODE_NOT_POSSIBLE: &str = "14";
/// Remote code for "unauthorized".
pub const CODE_UNAUTHORIZED: &str = "16";

/// Errors raised by tree, marshaling and synchronization operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid tree mutation. Raised before anything changes.
    #[error("structural error: {0}")]
    Structural(String),
    /// The node has no path to a device root.
    #[error("{kind} '{name}' is not attached to a device")]
    Unresolvable { kind: NodeKind, name: String },
    /// Parameter name not declared for the node kind.
    #[error("{kind} has no parameter named '{param}'")]
    UnknownParam { kind: NodeKind, param: String },
    /// Value has the wrong shape for the parameter.
    #[error("invalid value for '{param}': expected {expected}, got {got}")]
    InvalidValue {
        param: String,
        expected: &'static str,
        got: String,
    },
    /// The device answered with a non-success status, or could not be reached.
    #[error("{action} rejected by device{}: {message}", code_suffix(.code))]
    Device {
        action: Action,
        code: Option<String>,
        message: String,
    },
    /// Commit job did not finish in time. The remote job keeps running.
    #[error("commit job {job_id} still running after {waited:?}")]
    Timeout { job_id: String, waited: Duration },
    /// A document received from the device or loaded from disk is unusable.
    #[error("document error: {0}")]
    Document(String),
    #[error(transparent)]
    XPath(#[from] XPathError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub(crate) fn device(action: Action, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Device {
            action,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Remote code carried by a [`Error::Device`].
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Device { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True when the device reported that the addressed object does not exist.
    pub fn is_not_present(&self) -> bool {
        self.code() == Some(CODE_NOT_PRESENT)
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" (code {c})"))
        .unwrap_or_default()
}
