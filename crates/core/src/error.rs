use std::error::Error as StdError;

use thiserror::Error;

use crate::FixtureName;

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("run cancelled before statement[{statement_index}] of fixture `{fixture}`")]
    Cancelled {
        fixture: FixtureName,
        statement_index: usize,
    },
}

impl Error {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Definition(_) | Self::Cancelled { .. } => true,
            Self::Session(error) => error.is_fatal(),
        }
    }
}

/// Problems in the fixture graph itself. Always detected before any
/// statement reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("invalid fixture name `{name}`: must be non-empty and usable as a file name")]
    InvalidName { name: FixtureName },
    #[error("fixture `{name}` is already registered")]
    DuplicateName { name: FixtureName },
    #[error("fixture `{name}` is not registered")]
    UnknownFixture { name: FixtureName },
    #[error("fixture `{fixture}` depends on unregistered fixture `{dependency}`")]
    UnknownDependency {
        fixture: FixtureName,
        dependency: FixtureName,
    },
    #[error("cyclic fixture dependency: {}", render_cycle(.cycle))]
    CyclicDependency { cycle: Vec<FixtureName> },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{message}")]
    Statement { message: String },
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: BoxError,
    },
    #[error("connection lost while executing `{sql}`: {source}")]
    ConnectionLost {
        sql: String,
        #[source]
        source: BoxError,
    },
}

impl SessionError {
    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
        }
    }

    pub fn connect<E>(target: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Connect {
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub fn connection_lost<E>(sql: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::ConnectionLost {
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// SQL-level failures are outcomes to verify; everything else ends the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Statement { .. })
    }
}

fn render_cycle(cycle: &[FixtureName]) -> String {
    cycle
        .iter()
        .map(FixtureName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
