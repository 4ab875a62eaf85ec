use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering, extracting or persisting command types
#[derive(Error, Debug)]
pub enum Error {
    /// The set of command files could not be resolved
    #[error("command discovery failed: {0}")]
    Discovery(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize command records: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub fn discovery<S: Into<String>>(msg: S) -> Self {
        Self::Discovery(msg.into())
    }

    /// Path of the file the failure is about, when there is one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Persist { path, .. }
            | Self::Config { path, .. } => Some(path),
            Self::Discovery(_) | Self::Serialize(_) | Self::Watch(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_carries_location() {
        let err = Error::Parse {
            path: PathBuf::from("support/commands.ts"),
            line: 3,
            column: 7,
            message: "Expression expected".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse support/commands.ts:3:7: Expression expected"
        );
        assert_eq!(err.path(), Some(std::path::Path::new("support/commands.ts")));
    }

    #[test]
    fn serialization_failure_is_an_error() {
        let source = serde_json::from_str::<u8>("not json").unwrap_err();
        let err = Error::Serialize(source);
        assert!(err.to_string().starts_with("failed to serialize command records"));
        assert!(err.path().is_none());
    }

    #[test]
    fn discovery_error_has_no_path() {
        let err = Error::discovery("no such directory: cypress/support");
        assert!(err.path().is_none());
        assert!(err.to_string().contains("cypress/support"));
    }
}
