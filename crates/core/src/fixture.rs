use std::{borrow::Borrow, fmt};

use crate::Row;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixtureName(String);

impl FixtureName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names double as report file stems, so path separators and `.`/`..`
    /// are rejected.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_name(&self.0)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

impl fmt::Display for FixtureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FixtureName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for FixtureName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What a statement is checked against. `Rows(vec![])` demands an empty
/// result, while `Unchecked` runs the statement purely for its side effects.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Expectation {
    #[default]
    Unchecked,
    Rows(Vec<Row>),
    Error(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowOrder {
    #[default]
    Exact,
    Any,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementCase {
    pub statement: String,
    pub expectation: Expectation,
    pub row_order: RowOrder,
    pub normalize_numeric: bool,
    pub skip: bool,
}

impl StatementCase {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn expect_rows(mut self, rows: Vec<Row>) -> Self {
        self.expectation = Expectation::Rows(rows);
        self
    }

    #[must_use]
    pub fn expect_error(mut self, substring: impl Into<String>) -> Self {
        self.expectation = Expectation::Error(substring.into());
        self
    }

    #[must_use]
    pub fn any_order(mut self) -> Self {
        self.row_order = RowOrder::Any;
        self
    }

    #[must_use]
    pub fn normalize_numeric(mut self) -> Self {
        self.normalize_numeric = true;
        self
    }

    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFile {
    pub name: FixtureName,
    pub depends_on: Vec<FixtureName>,
    pub statements: Vec<StatementCase>,
    /// Set when the fixture must not run as a direct target. Dependents still
    /// execute it for its side effects.
    pub skip: Option<String>,
}

impl FixtureFile {
    pub fn new(name: impl Into<FixtureName>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            statements: Vec::new(),
            skip: None,
        }
    }

    #[must_use]
    pub fn depends_on<I, N>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FixtureName>,
    {
        self.depends_on
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn statement(mut self, case: StatementCase) -> Self {
        self.statements.push(case);
        self
    }

    #[must_use]
    pub fn statements<I>(mut self, cases: I) -> Self
    where
        I: IntoIterator<Item = StatementCase>,
    {
        self.statements.extend(cases);
        self
    }

    #[must_use]
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_deref()
    }
}
