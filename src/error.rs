// Copyright 2022-2025 The Vaultdav Authors.

//! Errors reported by the remote filesystem: reading, writing, listing,
//! or talking to the server.

use std::error::Error as StdError;
use std::fmt;

use derive_more::Display;

pub type Result<T> = std::result::Result<T, Error>;

/// A remote-filesystem error, as a generalization of protocol and IO failures.
#[derive(Debug)]
pub struct Error {
    /// What type of generally known error?
    pub kind: ErrorKind,
    /// The affected vault key or server path, if known.
    pub path: Option<String>,
    /// Extra human-readable context, if any.
    pub message: Option<String>,
    /// The underlying error: for example an HTTP or parse error.
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

/// General categories of remote-filesystem errors.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    #[display(fmt = "Not found")]
    NotFound,

    #[display(fmt = "Already exists")]
    AlreadyExists,

    #[display(fmt = "Permission denied")]
    PermissionDenied,

    #[display(fmt = "Configuration error")]
    Config,

    #[display(fmt = "Operation precondition violated")]
    Precondition,

    #[display(fmt = "Path outside the remote base directory")]
    PathMismatch,

    #[display(fmt = "Unparseable modification time")]
    TimeParse,

    #[display(fmt = "Unexpected content type")]
    UnexpectedContentType,

    #[display(fmt = "Connect error")]
    Connect,

    #[display(fmt = "Not implemented for this backend")]
    NotImplemented,

    #[display(fmt = "Other remote filesystem error")]
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The vault key or server path where this error occurred, if known.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub(crate) fn precondition<P: Into<String>, S: Into<String>>(path: P, message: S) -> Error {
        Error {
            kind: ErrorKind::Precondition,
            path: Some(path.into()),
            message: Some(message.into()),
            source: None,
        }
    }

    pub(crate) fn not_implemented(operation: &str) -> Error {
        Error {
            kind: ErrorKind::NotImplemented,
            path: None,
            message: Some(format!("{operation} is not supported by this backend")),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref path) = self.path {
            write!(f, ": {path}")?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {message}")?;
        }
        if let Some(ref source) = self.source {
            // I'm not sure we should write this here; it might be repetitive.
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|s| &**s as _)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_kind_path_and_message() {
        let err = Error {
            kind: ErrorKind::PathMismatch,
            path: Some("/elsewhere/note.md".to_owned()),
            message: Some("expected a path under \"/vault/\"".to_owned()),
            source: None,
        };
        assert_eq!(
            err.to_string(),
            "Path outside the remote base directory: /elsewhere/note.md: \
             expected a path under \"/vault/\""
        );
        assert_eq!(err.kind(), ErrorKind::PathMismatch);
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_predicate() {
        let err = Error {
            kind: ErrorKind::NotFound,
            path: Some("gone.txt".to_owned()),
            message: None,
            source: None,
        };
        assert!(err.is_not_found());
        assert_eq!(err.path(), Some("gone.txt"));
    }
}
