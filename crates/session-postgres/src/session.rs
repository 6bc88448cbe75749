use postgres::{Client, NoTls, SimpleQueryMessage, row::SimpleQueryRow};
use sqlregress_core::{ConnectionConfig, ResultSet, Row, Session, SessionError, Value};
use tracing::{debug, trace};

const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const APPLICATION_NAME: &str = "sqlregress";
const OPTIONS_KEY: &str = "postgres.options";

pub struct PostgresSession {
    client: Client,
    target: String,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<PostgresSession, SessionError> {
    let mut postgres_config = postgres::Config::new();

    if let Some(socket_path) = &config.socket {
        postgres_config.host_path(socket_path);
    } else if let Some(host) = &config.host {
        postgres_config.host(host);
    } else {
        postgres_config.host(DEFAULT_POSTGRES_HOST);
    }

    if let Some(port) = config.port {
        postgres_config.port(port);
    }
    if let Some(user) = &config.user {
        postgres_config.user(user);
    }
    if let Some(password) = &config.password {
        postgres_config.password(password);
    }
    if let Some(options) = config.extra.get(OPTIONS_KEY) {
        postgres_config.options(options);
    }
    postgres_config.dbname(&config.database);
    postgres_config.application_name(APPLICATION_NAME);

    let target = config.describe();
    let client = postgres_config
        .connect(NoTls)
        .map_err(|source| SessionError::connect(target.clone(), source))?;
    debug!(connection = %target, "opened postgres connection");

    Ok(PostgresSession { client, target })
}

impl Session for PostgresSession {
    /// Uses the simple query protocol so every value arrives in its text
    /// form. When the text holds several statements the last result wins.
    fn query(&mut self, sql: &str) -> Result<ResultSet, SessionError> {
        let messages = match self.client.simple_query(sql) {
            Ok(messages) => messages,
            Err(error) => return Err(self.classify(sql, error)),
        };

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        let mut last = ResultSet::empty();
        for message in messages {
            match message {
                SimpleQueryMessage::Row(row) => {
                    if columns.is_empty() {
                        columns = column_names(&row);
                    }
                    rows.push(to_row(&row));
                }
                SimpleQueryMessage::CommandComplete(count) => {
                    trace!(count, "command complete");
                    last = ResultSet::new(std::mem::take(&mut columns), std::mem::take(&mut rows));
                }
                _ => {}
            }
        }

        Ok(last)
    }

    fn describe(&self) -> String {
        format!("postgres://{}", self.target)
    }
}

impl PostgresSession {
    fn classify(&self, sql: &str, error: postgres::Error) -> SessionError {
        if let Some(db_error) = error.as_db_error()
            && !self.client.is_closed()
        {
            return SessionError::statement(db_error.to_string());
        }
        SessionError::connection_lost(sql, error)
    }
}

fn column_names(row: &SimpleQueryRow) -> Vec<String> {
    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

fn to_row(row: &SimpleQueryRow) -> Row {
    (0..row.len())
        .map(|index| row.get(index).map_or(Value::Null, Value::text))
        .collect()
}
