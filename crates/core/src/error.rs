//! Error types for the rsql engine.
//!
//! Every error collapses into one of four kinds: a declared/physical
//! schema disagreement, a broken internal invariant (a bug in the
//! maintenance logic, not the caller's fault), a failure surfaced by the
//! embedded SQL engine, or a misuse of the public API by the caller.

use alloc::string::String;
use core::fmt;

/// Result type alias for rsql operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error conditions an rsql operation can report.
#[derive(Debug)]
pub enum Error {
    /// A table's declared schema disagrees with the physical schema the
    /// gateway observed, or a referenced column/table doesn't exist.
    SchemaMismatch { table: String, message: String },
    /// An internal consistency invariant was violated — e.g. a delta
    /// referenced a row id no operator state had seen. Indicates a bug
    /// in the maintenance algorithm rather than bad input.
    InvariantBroken { message: String },
    /// The embedded SQL engine reported a failure executing a statement.
    EngineError { message: String },
    /// The caller used the API incorrectly (e.g. subscribed to an
    /// already-dropped view, built a malformed predicate).
    UsageError { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaMismatch { table, message } => {
                write!(f, "schema mismatch on table {}: {}", table, message)
            }
            Error::InvariantBroken { message } => {
                write!(f, "internal invariant broken: {}", message)
            }
            Error::EngineError { message } => {
                write!(f, "engine error: {}", message)
            }
            Error::UsageError { message } => {
                write!(f, "usage error: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a schema mismatch error.
    pub fn schema_mismatch(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invariant-broken error.
    pub fn invariant_broken(message: impl Into<String>) -> Self {
        Error::InvariantBroken {
            message: message.into(),
        }
    }

    /// Creates an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        Error::EngineError {
            message: message.into(),
        }
    }

    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Error::UsageError {
            message: message.into(),
        }
    }

    /// Returns true if this is a schema mismatch error.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. })
    }

    /// Returns true if this is an invariant-broken error.
    pub fn is_invariant_broken(&self) -> bool {
        matches!(self, Error::InvariantBroken { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::schema_mismatch("users", "column 'age' not found");
        assert!(err.to_string().contains("users"));
        assert!(err.to_string().contains("age"));

        let err = Error::usage("cannot subscribe twice with the same token");
        assert!(err.to_string().contains("usage error"));
    }

    #[test]
    fn test_error_kind_checks() {
        let err = Error::invariant_broken("min tracker saw a delete with no matching insert");
        assert!(err.is_invariant_broken());
        assert!(!err.is_schema_mismatch());
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::engine("no such table: widgets");
        match err {
            Error::EngineError { message } => assert!(message.contains("widgets")),
            _ => panic!("wrong error kind"),
        }
    }
}
