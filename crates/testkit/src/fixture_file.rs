use std::{fs, path::Path};

use serde::Deserialize;
use sqlregress_core::{
    Expectation, FixtureFile, FixtureName, FixtureRegistry, Row, RowOrder, StatementCase, Value,
};
use tracing::debug;

use crate::{Result, TestkitError};

const FIXTURE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// On-disk form of one fixture.
///
/// ```yaml
/// name: privileges
/// depends_on: [test_setup, create_index]
/// statements:
///   - sql: SELECT 1;
///     rows: [[1]]
///   - sql: SELECT 1/0;
///     error: division by zero
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureDocument {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub skip: Option<String>,
    #[serde(default)]
    pub statements: Vec<StatementDocument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementDocument {
    pub sql: String,
    /// `None` leaves the statement unchecked; `Some(vec![])` expects zero rows.
    #[serde(default)]
    pub rows: Option<Vec<Vec<serde_yaml::Value>>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub order: OrderDocument,
    #[serde(default)]
    pub normalize_numeric: bool,
    #[serde(default)]
    pub skip: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDocument {
    #[default]
    Exact,
    Any,
}

impl FixtureDocument {
    pub fn into_fixture(self) -> Result<FixtureFile> {
        let name = FixtureName::new(self.name);
        let mut statements = Vec::with_capacity(self.statements.len());
        for (index, statement) in self.statements.into_iter().enumerate() {
            statements.push(statement.into_case(&name, index)?);
        }

        Ok(FixtureFile {
            name,
            depends_on: self.depends_on.into_iter().map(FixtureName::new).collect(),
            statements,
            skip: self.skip,
        })
    }
}

impl StatementDocument {
    fn into_case(self, fixture: &FixtureName, index: usize) -> Result<StatementCase> {
        let expectation = match (self.rows, self.error) {
            (Some(_), Some(_)) => {
                return Err(TestkitError::ConflictingExpectation {
                    fixture: fixture.clone(),
                    index,
                });
            }
            (Some(rows), None) => Expectation::Rows(
                rows.into_iter()
                    .map(|row| to_row(row, fixture, index))
                    .collect::<Result<Vec<_>>>()?,
            ),
            (None, Some(substring)) => Expectation::Error(substring),
            (None, None) => Expectation::Unchecked,
        };

        Ok(StatementCase {
            statement: self.sql,
            expectation,
            row_order: match self.order {
                OrderDocument::Exact => RowOrder::Exact,
                OrderDocument::Any => RowOrder::Any,
            },
            normalize_numeric: self.normalize_numeric,
            skip: self.skip,
        })
    }
}

fn to_row(cells: Vec<serde_yaml::Value>, fixture: &FixtureName, index: usize) -> Result<Row> {
    cells
        .into_iter()
        .map(|cell| {
            to_value(cell).map_err(|detail| TestkitError::UnsupportedValue {
                fixture: fixture.clone(),
                index,
                detail,
            })
        })
        .collect()
}

fn to_value(cell: serde_yaml::Value) -> std::result::Result<Value, String> {
    match cell {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(value) => Ok(Value::Bool(value)),
        serde_yaml::Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Int(value))
            } else if let Some(value) = number.as_u64() {
                Ok(Value::Text(value.to_string()))
            } else {
                Err(format!(
                    "unquoted decimal `{number}` loses its engine spelling; quote decimal literals"
                ))
            }
        }
        serde_yaml::Value::String(value) => Ok(Value::Text(value)),
        serde_yaml::Value::Tagged(tagged) => to_value(tagged.value),
        other @ (serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_)) => Err(format!(
            "expected a scalar, got {}",
            serde_yaml::to_string(&other)
                .unwrap_or_default()
                .trim_end()
        )),
    }
}

/// Parses one fixture document, or a sequence of them.
pub fn load_fixtures_from_str(yaml: &str, origin: &str) -> Result<Vec<FixtureFile>> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|source| TestkitError::yaml(origin, source))?;

    let documents: Vec<FixtureDocument> = if document.is_sequence() {
        serde_yaml::from_value(document)
    } else {
        serde_yaml::from_value(document).map(|single| vec![single])
    }
    .map_err(|source| TestkitError::yaml(origin, source))?;

    documents
        .into_iter()
        .map(FixtureDocument::into_fixture)
        .collect()
}

/// Loads every `*.yaml`/`*.yml` file directly under `dir`, in path order.
pub fn load_fixtures_from_dir(dir: &Path) -> Result<Vec<FixtureFile>> {
    let entries = fs::read_dir(dir).map_err(|source| TestkitError::io(dir, source))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| TestkitError::io(dir, source))?.path();
        let is_fixture = path.is_file()
            && path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| FIXTURE_EXTENSIONS.contains(&extension));
        if is_fixture {
            paths.push(path);
        }
    }
    paths.sort();

    let mut fixtures = Vec::new();
    for path in paths {
        let yaml = fs::read_to_string(&path).map_err(|source| TestkitError::io(&path, source))?;
        let loaded = load_fixtures_from_str(&yaml, &path.display().to_string())?;
        debug!(path = %path.display(), fixtures = loaded.len(), "loaded fixture file");
        fixtures.extend(loaded);
    }
    Ok(fixtures)
}

/// Loads, registers and validates the whole fixture directory.
pub fn registry_from_dir(dir: &Path) -> Result<FixtureRegistry> {
    let mut builder = FixtureRegistry::builder();
    builder.register_all(load_fixtures_from_dir(dir)?)?;
    let registry = builder.build();
    registry.validate()?;
    Ok(registry)
}
