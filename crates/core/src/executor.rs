use tracing::{debug, info, warn};

use crate::{
    ConnectionConfig, Engine, Error, HarnessConfig, ResultSet, Result, Session, SessionError,
    StatementCase, Value,
    meta::{Instruction, MetaCommand, Variables, interpolate, split_instructions},
};

const KEEP_CURRENT: &str = "-";
const GSET_NO_ROWS: &str = "no rows returned for \\gset";
const GSET_TOO_MANY_ROWS: &str = "more than one row returned for \\gset";

/// What one statement produced. Consumed by the verifier and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Rows(ResultSet),
    Error(String),
    /// A backslash command the harness cannot emulate, e.g. `\d`.
    Unsupported(String),
}

impl ExecutionOutcome {
    #[must_use]
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

enum Step {
    Continue,
    Failed(String),
    Unsupported(String),
}

/// Runs statements against the single session owned by one harness run.
pub struct StatementExecutor<'a> {
    engine: &'a dyn Engine,
    config: &'a HarnessConfig,
    connection: ConnectionConfig,
    session: Box<dyn Session>,
    variables: Variables,
}

impl<'a> StatementExecutor<'a> {
    pub fn connect(engine: &'a dyn Engine, config: &'a HarnessConfig) -> Result<Self> {
        let session = engine.connect(&config.connection)?;
        info!(
            engine = engine.name(),
            session = %session.describe(),
            "opened session"
        );

        Ok(Self {
            engine,
            config,
            connection: config.connection.clone(),
            session,
            variables: config.variables.clone(),
        })
    }

    #[must_use]
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    #[must_use]
    pub fn session_description(&self) -> String {
        self.session.describe()
    }

    /// Executes every instruction of the statement in order. Earlier
    /// instructions' side effects stay applied even if a later one fails.
    pub fn execute(&mut self, case: &StatementCase) -> Result<ExecutionOutcome> {
        let mut outcome = ExecutionOutcome::Rows(ResultSet::empty());
        let mut unsupported = None;

        for instruction in split_instructions(&case.statement) {
            match instruction {
                Instruction::Sql(sql) => match self.query(&sql)? {
                    Ok(result) => outcome = ExecutionOutcome::Rows(result),
                    Err(message) => return Ok(ExecutionOutcome::Error(message)),
                },
                Instruction::Query { sql, gset_prefix } => {
                    let result = match self.query(&sql)? {
                        Ok(result) => result,
                        Err(message) => return Ok(ExecutionOutcome::Error(message)),
                    };
                    match gset_prefix {
                        Some(prefix) => {
                            if let Err(message) = self.store_gset(&prefix, &result) {
                                return Ok(ExecutionOutcome::Error(message));
                            }
                            outcome = ExecutionOutcome::Rows(ResultSet::empty());
                        }
                        None => outcome = ExecutionOutcome::Rows(result),
                    }
                }
                Instruction::Meta(command) => match self.run_meta(&command) {
                    Step::Continue => {}
                    Step::Failed(message) => return Ok(ExecutionOutcome::Error(message)),
                    Step::Unsupported(command) => {
                        unsupported.get_or_insert(command);
                    }
                },
            }
        }

        Ok(unsupported.map_or(outcome, ExecutionOutcome::Unsupported))
    }

    fn query(&mut self, sql: &str) -> Result<std::result::Result<ResultSet, String>> {
        let sql = interpolate(sql, &self.variables);
        debug!(sql = %sql, "executing statement");
        match self.session.query(&sql) {
            Ok(result) => Ok(Ok(result)),
            Err(SessionError::Statement { message }) => Ok(Err(message)),
            Err(error) => Err(Error::Session(error)),
        }
    }

    fn run_meta(&mut self, command: &MetaCommand) -> Step {
        let args = command.resolved_args(&self.variables);
        match command.name.as_str() {
            "c" | "connect" => self.reconnect(&args),
            "set" => {
                let Some((name, value)) = args.split_first() else {
                    return Step::Continue;
                };
                self.variables.insert(name.clone(), value.concat());
                Step::Continue
            }
            "unset" => {
                if let Some(name) = args.first() {
                    self.variables.remove(name);
                }
                Step::Continue
            }
            "getenv" => {
                let [name, env_name, ..] = args.as_slice() else {
                    return Step::Failed("\\getenv: missing required argument".to_string());
                };
                match self.config.env_var(env_name) {
                    Some(value) => {
                        self.variables.insert(name.clone(), value);
                    }
                    None => {
                        self.variables.remove(name);
                    }
                }
                Step::Continue
            }
            _ => Step::Unsupported(command.render()),
        }
    }

    fn reconnect(&mut self, args: &[String]) -> Step {
        let connection = self
            .connection
            .reconnect_as(override_arg(args.first()), override_arg(args.get(1)));

        match self.engine.connect(&connection) {
            Ok(session) => {
                info!(session = %session.describe(), "reconnected session");
                self.session = session;
                self.connection = connection;
                Step::Continue
            }
            Err(error) => {
                warn!(
                    connection = %connection.describe(),
                    %error,
                    "reconnect failed; keeping previous session"
                );
                Step::Failed(error.to_string())
            }
        }
    }

    fn store_gset(&mut self, prefix: &str, result: &ResultSet) -> std::result::Result<(), String> {
        let row = match result.rows.as_slice() {
            [] => return Err(GSET_NO_ROWS.to_string()),
            [row] => row,
            _ => return Err(GSET_TOO_MANY_ROWS.to_string()),
        };

        for (column, value) in result.columns.iter().zip(row) {
            let name = format!("{prefix}{column}");
            match value {
                Value::Null => {
                    self.variables.remove(&name);
                }
                value => {
                    self.variables
                        .insert(name, value.render().unwrap_or_default());
                }
            }
        }
        Ok(())
    }
}

/// `\c` argument that replaces the current value; empty and `-` keep it.
fn override_arg(value: Option<&String>) -> Option<&str> {
    value
        .map(String::as_str)
        .filter(|value| !value.is_empty() && *value != KEEP_CURRENT)
}
