use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use sqlregress_core::{ConnectionConfig, Engine, ResultSet, Session, SessionError, Value};

#[derive(Debug, Clone)]
enum Response {
    Rows(ResultSet),
    Error(String),
    ConnectionLost,
}

#[derive(Debug, Default)]
struct FakeEngineState {
    responses: BTreeMap<String, Response>,
    executed_sql: Vec<String>,
    connections: Vec<ConnectionConfig>,
    refused_users: Vec<String>,
}

/// Scripted engine: every query answers with the response registered for
/// its exact SQL text, or an empty result set.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn respond_rows(&self, sql: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|column| (*column).to_string()).collect();
        self.state()
            .responses
            .insert(sql.to_string(), Response::Rows(ResultSet::new(columns, rows)));
    }

    pub fn respond_error(&self, sql: &str, message: &str) {
        self.state()
            .responses
            .insert(sql.to_string(), Response::Error(message.to_string()));
    }

    pub fn lose_connection_on(&self, sql: &str) {
        self.state()
            .responses
            .insert(sql.to_string(), Response::ConnectionLost);
    }

    pub fn refuse_user(&self, user: &str) {
        self.state().refused_users.push(user.to_string());
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state().executed_sql.clone()
    }

    pub fn connections(&self) -> Vec<ConnectionConfig> {
        self.state().connections.clone()
    }

    fn state(&self) -> MutexGuard<'_, FakeEngineState> {
        self.state.lock().expect("fake engine state lock")
    }
}

impl Engine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, SessionError> {
        let mut state = self.state();
        if let Some(user) = &config.user
            && state.refused_users.contains(user)
        {
            return Err(SessionError::connect(
                config.describe(),
                io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("role \"{user}\" does not exist"),
                ),
            ));
        }
        state.connections.push(config.clone());

        Ok(Box::new(FakeSession {
            engine: self.clone(),
            description: config.describe(),
        }))
    }
}

struct FakeSession {
    engine: FakeEngine,
    description: String,
}

impl Session for FakeSession {
    fn query(&mut self, sql: &str) -> Result<ResultSet, SessionError> {
        let mut state = self.engine.state();
        state.executed_sql.push(sql.to_string());

        match state.responses.get(sql).cloned() {
            None => Ok(ResultSet::empty()),
            Some(Response::Rows(result)) => Ok(result),
            Some(Response::Error(message)) => Err(SessionError::statement(message)),
            Some(Response::ConnectionLost) => Err(SessionError::connection_lost(
                sql,
                io::Error::new(io::ErrorKind::ConnectionReset, "server closed the connection"),
            )),
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

#[allow(dead_code)]
pub fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|row| row.iter().map(|value| Value::text(*value)).collect())
        .collect()
}
