use backtrace::Backtrace;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

use crate::migration::Version;

/// Error kinds for strata operations.
///
/// Each kind names one category of failure so callers can match on it
/// instead of parsing messages. The migration kinds carry the version of
/// the unit that failed.
///
/// # Examples
///
/// ```rust,ignore
/// use strata::errors::{StrataError, ErrorKind, StrataResult};
///
/// fn example() -> StrataResult<()> {
///     Err(StrataError::new("Collection not found", ErrorKind::CollectionNotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Registry Errors
    /// A migration with this version is already registered
    DuplicateVersion(Version),
    /// An applied version has no registered migration
    UnknownMigration(Version),

    // Runner Errors
    /// The forward function of a migration failed
    MigrationFailed(Version),
    /// The backward function of a migration failed
    RollbackFailed(Version),
    /// Another runner holds the migration lock
    MigrationInProgress,

    // Schema Errors
    /// A field with the same name already exists on the collection
    DuplicateField,
    /// Collection does not exist
    CollectionNotFound,

    // Record Errors
    /// The requested resource was not found
    NotFound,
    /// A unique constraint was violated
    UniqueConstraintViolation,
    /// Schema or record validation failed
    ValidationError,

    // Store Errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// The store changed while a transaction was open
    TransactionConflict,
    /// Security-related error (password hashing)
    SecurityError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DuplicateVersion(v) => write!(f, "Duplicate migration version {}", v),
            ErrorKind::UnknownMigration(v) => write!(f, "Unknown migration {}", v),
            ErrorKind::MigrationFailed(v) => write!(f, "Migration {} failed", v),
            ErrorKind::RollbackFailed(v) => write!(f, "Rollback of {} failed", v),
            ErrorKind::MigrationInProgress => write!(f, "Migration in progress"),
            ErrorKind::DuplicateField => write!(f, "Duplicate field"),
            ErrorKind::CollectionNotFound => write!(f, "Collection not found"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::TransactionConflict => write!(f, "Transaction conflict"),
            ErrorKind::SecurityError => write!(f, "Security error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom strata error type.
///
/// `StrataError` carries a message, a kind, and an optional cause. The
/// runner uses the cause chain to attach the failing migration version to
/// an error raised by the store without rewriting the store's message.
///
/// The backtrace is captured unresolved and only symbolized when the error
/// is printed with `{:?}`, since absence errors are common in normal
/// control flow (`ensure_collection` looks collections up before creating them).
#[derive(Clone)]
pub struct StrataError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<StrataError>>,
    backtrace: Arc<Mutex<Backtrace>>,
}

impl StrataError {
    /// Creates a new `StrataError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        StrataError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates a new `StrataError` wrapping `cause`.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: StrataError) -> Self {
        StrataError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&StrataError> {
        self.cause.as_deref()
    }

    /// Returns the innermost error of the cause chain.
    pub fn root_cause(&self) -> &StrataError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }

    /// True for absence errors: a missing record or a missing collection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.error_kind,
            ErrorKind::NotFound | ErrorKind::CollectionNotFound
        )
    }

    /// The migration version attached by the runner, if any.
    pub fn version(&self) -> Option<Version> {
        match self.error_kind {
            ErrorKind::MigrationFailed(v)
            | ErrorKind::RollbackFailed(v)
            | ErrorKind::DuplicateVersion(v)
            | ErrorKind::UnknownMigration(v) => Some(v),
            _ => None,
        }
    }
}

impl Display for StrataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Debug for StrataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let mut backtrace = self.backtrace.lock();
                backtrace.resolve();
                write!(f, "{}\n{:?}", self.message, *backtrace)
            }
        }
    }
}

impl Error for StrataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for strata operations.
pub type StrataResult<T> = Result<T, StrataError>;
