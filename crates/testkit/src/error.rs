use std::{io, path::PathBuf};

use sqlregress_core::{DefinitionError, FixtureName};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestkitError>;

#[derive(Debug, Error)]
pub enum TestkitError {
    #[error("failed to access `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("fixture `{fixture}` statement[{index}] declares both `rows` and `error`")]
    ConflictingExpectation { fixture: FixtureName, index: usize },
    #[error("fixture `{fixture}` statement[{index}] has an unsupported value in `rows`: {detail}")]
    UnsupportedValue {
        fixture: FixtureName,
        index: usize,
        detail: String,
    },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl TestkitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn yaml(origin: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            origin: origin.into(),
            source,
        }
    }
}
