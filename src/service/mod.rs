//! Service layer: the shared mutation pipeline and its satellites.
//!
//! Every entry point (REST handler, MCP tool) calls into this module; no
//! adapter talks to the store or runs validation on its own. The pipeline
//! for a submitted value is:
//!
//! ```text
//! classify -> exclusion check -> resolve existing -> compatibility check
//!          -> commit (membership + audit) in one transaction
//! ```
//!
//! All pipeline failures are recovered here and translated into
//! [`ServiceError`] values; raw storage errors never escape to callers.

pub mod audit;
pub mod edl;
pub mod exclusion;
pub mod ioc;
pub mod list;
pub mod seed;

use crate::classify::ClassifyError;
use crate::model::{IocType, ListType};

/// Caller-facing error taxonomy for the mutation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The submitted string matched no known IOC shape. Not retried.
    #[error(transparent)]
    InvalidFormat(#[from] ClassifyError),

    /// The value is covered by an exclusion rule; names the matched rule.
    #[error("'{value}' is blocked by exclusion '{rule_value}': {reason}")]
    ExclusionBlocked {
        value: String,
        rule_id: i64,
        rule_value: String,
        reason: String,
    },

    /// IOC type not allowed on the target list's declared type.
    #[error("cannot add a {ioc_type} IOC to a {list_type} list")]
    TypeMismatch {
        ioc_type: IocType,
        list_type: ListType,
    },

    /// A referenced list/IOC/exclusion does not exist.
    #[error("{kind} '{ident}' not found")]
    NotFound { kind: &'static str, ident: String },

    /// Uniqueness violation on create.
    #[error("{kind} '{ident}' already exists")]
    Duplicate { kind: &'static str, ident: String },

    /// Built-in exclusions are seeded at startup and not user-deletable.
    #[error("'{0}' is a built-in exclusion and cannot be removed")]
    BuiltinProtected(String),

    /// Malformed request (empty comment, oversized batch, bad pattern...).
    #[error("{0}")]
    InvalidRequest(String),

    /// Storage failure. Logged; callers see a generic message.
    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(kind: &'static str, ident: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            ident: ident.into(),
        }
    }

    pub fn duplicate(kind: &'static str, ident: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            ident: ident.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
