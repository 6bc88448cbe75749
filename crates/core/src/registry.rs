use std::collections::BTreeMap;

use crate::{DefinitionError, FixtureFile, FixtureName, resolve_order};

/// Mutable registration phase. Call [`RegistryBuilder::build`] to freeze the
/// fixture set before running anything.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    fixtures: BTreeMap<FixtureName, FixtureFile>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fixture: FixtureFile) -> Result<(), DefinitionError> {
        if !fixture.name.is_valid() {
            return Err(DefinitionError::InvalidName { name: fixture.name });
        }
        if self.fixtures.contains_key(&fixture.name) {
            return Err(DefinitionError::DuplicateName {
                name: fixture.name,
            });
        }

        self.fixtures.insert(fixture.name.clone(), fixture);
        Ok(())
    }

    pub fn register_all<I>(&mut self, fixtures: I) -> Result<(), DefinitionError>
    where
        I: IntoIterator<Item = FixtureFile>,
    {
        for fixture in fixtures {
            self.register(fixture)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> FixtureRegistry {
        FixtureRegistry {
            fixtures: self.fixtures,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    fixtures: BTreeMap<FixtureName, FixtureFile>,
}

impl FixtureRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FixtureFile> {
        self.fixtures.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &FixtureName> {
        self.fixtures.keys()
    }

    pub fn fixtures(&self) -> impl Iterator<Item = &FixtureFile> {
        self.fixtures.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Resolves every registered fixture, surfacing the first missing
    /// dependency or cycle in name order.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        for name in self.fixtures.keys() {
            resolve_order(self, name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FixtureRegistry;
    use crate::{DefinitionError, FixtureFile, FixtureName};

    #[test]
    fn register_rejects_duplicates_and_invalid_names() {
        let mut builder = FixtureRegistry::builder();
        builder
            .register(FixtureFile::new("test_setup"))
            .expect("first registration should succeed");

        assert_eq!(
            builder.register(FixtureFile::new("test_setup")),
            Err(DefinitionError::DuplicateName {
                name: FixtureName::new("test_setup"),
            }),
        );
        assert_eq!(
            builder.register(FixtureFile::new("  ")),
            Err(DefinitionError::InvalidName {
                name: FixtureName::new("  "),
            }),
        );
        for name in ["../escape", "nested/name", "back\\slash", ".."] {
            assert_eq!(
                builder.register(FixtureFile::new(name)),
                Err(DefinitionError::InvalidName {
                    name: FixtureName::new(name),
                }),
                "{name}"
            );
        }
    }

    #[test]
    fn registration_order_does_not_matter_for_dependencies() {
        let mut builder = FixtureRegistry::builder();
        builder
            .register(FixtureFile::new("privileges").depends_on(["test_setup"]))
            .expect("forward reference should be accepted");
        builder
            .register(FixtureFile::new("test_setup"))
            .expect("dependency registered later");

        let registry = builder.build();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("privileges"));
        registry.validate().expect("registry should validate");
    }

    #[test]
    fn validate_reports_missing_dependency() {
        let mut builder = FixtureRegistry::builder();
        builder
            .register(FixtureFile::new("stats").depends_on(["missing"]))
            .expect("registration defers dependency checks");

        let registry = builder.build();
        assert_eq!(
            registry.validate(),
            Err(DefinitionError::UnknownDependency {
                fixture: FixtureName::new("stats"),
                dependency: FixtureName::new("missing"),
            }),
        );
    }
}
