use std::{collections::BTreeMap, thread};

use tracing::{debug, info, info_span, trace, warn};

use crate::{
    DefinitionError, DependencyPolicy, Engine, Error, FailureMode, FixtureFile, FixtureName,
    FixtureRegistry, HarnessConfig, Result, StatementExecutor,
    report::{FixtureReport, FixtureRole, RunState, StatementReport, StatementStatus, TestReport},
    resolver::{partition_disjoint, resolve_order},
    verifier::verify,
};

/// Drives fixture runs against one engine. The registry is only read, so a
/// harness can be shared by concurrent isolated runs.
pub struct Harness<'a> {
    registry: &'a FixtureRegistry,
    engine: &'a dyn Engine,
    config: HarnessConfig,
}

struct Resolved {
    target: FixtureName,
    order: Vec<FixtureName>,
}

#[derive(Default)]
struct RunProgress {
    failed: bool,
    halted: bool,
}

impl<'a> Harness<'a> {
    pub fn new(registry: &'a FixtureRegistry, engine: &'a dyn Engine, config: HarnessConfig) -> Self {
        Self {
            registry,
            engine,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs `name` after its full dependency chain on a fresh session.
    pub fn run_fixture(&self, name: &str) -> Result<TestReport> {
        let resolved = self.resolve(name)?;
        let mut executor = StatementExecutor::connect(self.engine, &self.config)?;
        self.run_resolved(&mut executor, &resolved, &mut BTreeMap::new())
    }

    /// Runs several targets in order on one shared session. A fixture that
    /// already ran (as a target or as a dependency) is not executed again;
    /// later reports reuse its recorded statements.
    pub fn run_fixtures<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<TestReport>> {
        let resolved = names
            .iter()
            .map(|name| self.resolve(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut executor = StatementExecutor::connect(self.engine, &self.config)?;
        let mut executed = BTreeMap::new();

        let mut reports = Vec::with_capacity(resolved.len());
        for target in &resolved {
            let report = self.run_resolved(&mut executor, target, &mut executed)?;
            let stop = !report.passed() && self.config.failure_mode == FailureMode::FailFast;
            reports.push(report);
            if stop {
                warn!("fail-fast: skipping remaining targets");
                break;
            }
        }
        Ok(reports)
    }

    /// Runs each target on its own session. Targets whose dependency
    /// closures are disjoint run concurrently; batches run one after another.
    pub fn run_isolated<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<TestReport>> {
        let targets = names
            .iter()
            .map(|name| self.resolve(name.as_ref()).map(|resolved| resolved.target))
            .collect::<Result<Vec<_>>>()?;
        let batches = partition_disjoint(self.registry, &targets)?;
        debug!(batches = batches.len(), targets = targets.len(), "partitioned targets");

        let mut reports = Vec::with_capacity(targets.len());
        for batch in batches {
            let results = thread::scope(|scope| {
                let handles = batch
                    .iter()
                    .map(|target| scope.spawn(move || self.run_fixture(target.as_str())))
                    .collect::<Vec<_>>();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                    })
                    .collect::<Vec<_>>()
            });

            for result in results {
                reports.push(result?);
            }
            let failed = reports.iter().any(|report| !report.passed());
            if failed && self.config.failure_mode == FailureMode::FailFast {
                warn!("fail-fast: skipping remaining batches");
                break;
            }
        }
        Ok(reports)
    }

    fn resolve(&self, name: &str) -> Result<Resolved> {
        let target = FixtureName::new(name);
        trace!(fixture = %target, state = ?RunState::ResolvingDependencies);
        let order = resolve_order(self.registry, &target)?;
        Ok(Resolved { target, order })
    }

    fn run_resolved(
        &self,
        executor: &mut StatementExecutor<'_>,
        resolved: &Resolved,
        executed: &mut BTreeMap<FixtureName, Vec<StatementReport>>,
    ) -> Result<TestReport> {
        let _span = info_span!("fixture_run", fixture = %resolved.target).entered();
        info!(fixtures = resolved.order.len(), "running fixture chain");

        let mut progress = RunProgress::default();
        let mut skipped = None;
        let mut fixtures = Vec::with_capacity(resolved.order.len());

        for (position, name) in resolved.order.iter().enumerate() {
            let role = if *name == resolved.target {
                FixtureRole::Target
            } else {
                FixtureRole::Dependency
            };

            let Some(fixture) = self.registry.lookup(name.as_str()) else {
                return Err(Error::Definition(DefinitionError::UnknownFixture {
                    name: name.clone(),
                }));
            };

            if role == FixtureRole::Target
                && let Some(reason) = fixture.skip_reason()
            {
                info!(fixture = %name, reason, "target fixture is skipped");
                skipped = Some(reason.to_string());
                fixtures.push(FixtureReport {
                    name: name.clone(),
                    role,
                    statements: skipped_statements(fixture),
                });
                continue;
            }

            if let Some(statements) = executed.get(name) {
                debug!(fixture = %name, "fixture already executed on this session");
                if self.counts_failures(role) && statements.iter().any(StatementReport::is_failure) {
                    progress.failed = true;
                }
                fixtures.push(FixtureReport {
                    name: name.clone(),
                    role,
                    statements: statements.clone(),
                });
                continue;
            }

            let statements = self.run_statements(executor, fixture, role, position, &mut progress)?;
            if !progress.halted {
                executed.insert(name.clone(), statements.clone());
            }
            fixtures.push(FixtureReport {
                name: name.clone(),
                role,
                statements,
            });
        }

        let state = if progress.failed {
            RunState::Failed
        } else {
            RunState::Done
        };
        info!(state = ?state, "fixture chain finished");

        Ok(TestReport {
            target: resolved.target.clone(),
            state,
            skipped,
            fixtures,
        })
    }

    fn run_statements(
        &self,
        executor: &mut StatementExecutor<'_>,
        fixture: &FixtureFile,
        role: FixtureRole,
        position: usize,
        progress: &mut RunProgress,
    ) -> Result<Vec<StatementReport>> {
        let mut reports = Vec::with_capacity(fixture.statements.len());

        for (index, case) in fixture.statements.iter().enumerate() {
            let status = if progress.halted {
                StatementStatus::NotRun
            } else if case.skip {
                StatementStatus::Skipped
            } else {
                if self.config.cancellation.is_cancelled() {
                    return Err(Error::Cancelled {
                        fixture: fixture.name.clone(),
                        statement_index: index,
                    });
                }

                trace!(fixture = %fixture.name, index, state = ?RunState::ExecutingFixture(position));
                let outcome = executor.execute(case)?;

                trace!(fixture = %fixture.name, index, state = ?RunState::Verifying(position));
                let verification = verify(case, &outcome);
                if verification.ok {
                    StatementStatus::Passed
                } else {
                    if self.counts_failures(role) {
                        warn!(
                            fixture = %fixture.name,
                            index,
                            diagnostic = %verification.diagnostic,
                            "statement failed verification"
                        );
                        progress.failed = true;
                        progress.halted = self.config.failure_mode == FailureMode::FailFast;
                    } else {
                        debug!(
                            fixture = %fixture.name,
                            index,
                            diagnostic = %verification.diagnostic,
                            "ignoring dependency mismatch"
                        );
                    }
                    StatementStatus::Failed {
                        diagnostic: verification.diagnostic,
                    }
                }
            };

            reports.push(StatementReport {
                index,
                statement: case.statement.clone(),
                status,
            });
        }

        Ok(reports)
    }

    fn counts_failures(&self, role: FixtureRole) -> bool {
        role == FixtureRole::Target || self.config.dependency_policy == DependencyPolicy::Verify
    }
}

fn skipped_statements(fixture: &FixtureFile) -> Vec<StatementReport> {
    fixture
        .statements
        .iter()
        .enumerate()
        .map(|(index, case)| StatementReport {
            index,
            statement: case.statement.clone(),
            status: StatementStatus::Skipped,
        })
        .collect()
}
