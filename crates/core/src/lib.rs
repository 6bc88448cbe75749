mod config;
mod driver;
mod error;
mod executor;
mod fixture;
pub mod meta;
mod registry;
mod report;
mod resolver;
mod session;
mod value;
mod verifier;

pub use config::{
    CancellationToken, ConnectionConfig, DependencyPolicy, FailureMode, HarnessConfig,
};
pub use driver::Harness;
pub use error::{BoxError, DefinitionError, Error, Result, SessionError};
pub use executor::{ExecutionOutcome, StatementExecutor};
pub use fixture::{Expectation, FixtureFile, FixtureName, RowOrder, StatementCase};
pub use registry::{FixtureRegistry, RegistryBuilder};
pub use report::{
    Failure, FixtureReport, FixtureRole, RunState, StatementReport, StatementStatus, TestReport,
    Totals,
};
pub use resolver::{dependency_closure, partition_disjoint, resolve_order};
pub use session::{Engine, Session};
pub use value::{ResultSet, Row, Value, render_row, rows_match, values_match};
pub use verifier::{VerificationResult, verify};
