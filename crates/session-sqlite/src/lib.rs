mod session;

use sqlregress_core::{ConnectionConfig, Engine, Session, SessionError};

pub use session::SqliteSession;

/// Opens one SQLite connection per session. `ConnectionConfig::database` is
/// the database path; `:memory:` gives every session its own empty database.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteEngine;

impl Engine for SqliteEngine {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, SessionError> {
        Ok(Box::new(session::connect(config)?))
    }
}
