use std::fmt::Write as _;

use rusqlite::{Batch, Connection, ErrorCode, Statement, types::ValueRef};
use rusqlite::fallible_iterator::FallibleIterator;
use sqlregress_core::{ConnectionConfig, ResultSet, Row, Session, SessionError, Value};
use tracing::debug;

const FOREIGN_KEYS_KEY: &str = "sqlite.foreign_keys";

pub struct SqliteSession {
    connection: Connection,
    database: String,
}

pub(crate) fn connect(config: &ConnectionConfig) -> Result<SqliteSession, SessionError> {
    let connection = Connection::open(config.database.as_str())
        .map_err(|source| SessionError::connect(describe(&config.database), source))?;

    if let Some(enabled) = config.extra.get(FOREIGN_KEYS_KEY) {
        let pragma = format!("PRAGMA foreign_keys = {enabled};");
        connection
            .execute_batch(&pragma)
            .map_err(|source| SessionError::connect(describe(&config.database), source))?;
    }

    debug!(database = %config.database, "opened sqlite connection");
    Ok(SqliteSession {
        connection,
        database: config.database.clone(),
    })
}

impl Session for SqliteSession {
    /// Steps through every statement in `sql` in turn, so later statements
    /// see objects created by earlier ones. The last statement's rows win.
    fn query(&mut self, sql: &str) -> Result<ResultSet, SessionError> {
        let mut batch = Batch::new(&self.connection, sql);
        let mut result = ResultSet::empty();
        while let Some(statement) = batch.next().map_err(|source| classify(sql, source))? {
            result = read_rows(statement).map_err(|source| classify(sql, source))?;
        }
        Ok(result)
    }

    fn describe(&self) -> String {
        describe(&self.database)
    }
}

fn read_rows(mut statement: Statement<'_>) -> rusqlite::Result<ResultSet> {
    let columns = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = statement.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Row::with_capacity(width);
        for index in 0..width {
            values.push(to_value(row.get_ref(index)?));
        }
        rows.push(values);
    }

    Ok(ResultSet::new(columns, rows))
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Int(value),
        ValueRef::Real(value) => Value::Float(value),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("\\x");
            for byte in bytes {
                let _ = write!(hex, "{byte:02x}");
            }
            Value::Text(hex)
        }
    }
}

/// SQL-level errors are verifiable outcomes; I/O and corruption errors mean
/// the database handle cannot be trusted any more.
fn classify(sql: &str, source: rusqlite::Error) -> SessionError {
    match source.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure,
        ) => SessionError::connection_lost(sql, source),
        _ => SessionError::statement(source.to_string()),
    }
}

fn describe(database: &str) -> String {
    format!("sqlite:{database}")
}

#[cfg(test)]
mod tests {
    use super::to_value;
    use rusqlite::types::ValueRef;
    use sqlregress_core::Value;

    #[test]
    fn blobs_render_as_bytea_hex() {
        assert_eq!(
            to_value(ValueRef::Blob(&[0xde, 0xad, 0x01])),
            Value::text("\\xdead01")
        );
        assert_eq!(to_value(ValueRef::Null), Value::Null);
    }
}
