mod session;

use sqlregress_core::{ConnectionConfig, Engine, Session, SessionError};

pub use session::PostgresSession;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresEngine;

impl Engine for PostgresEngine {
    fn name(&self) -> &str {
        "postgres"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, SessionError> {
        Ok(Box::new(session::connect(config)?))
    }
}
