use crate::{ConnectionConfig, ResultSet, SessionError};

/// One stateful connection to the engine under test.
///
/// `query` must only return after the engine has fully completed the
/// statement; SQL-level failures are reported as [`SessionError::Statement`],
/// anything that leaves the connection unusable as a fatal variant.
pub trait Session: Send {
    fn query(&mut self, sql: &str) -> Result<ResultSet, SessionError>;

    fn describe(&self) -> String;
}

pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, SessionError>;
}
