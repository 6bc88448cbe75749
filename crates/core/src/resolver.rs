use std::collections::BTreeSet;

use crate::{DefinitionError, FixtureFile, FixtureName, FixtureRegistry};

struct Frame<'a> {
    fixture: &'a FixtureFile,
    next_dependency: usize,
}

/// Orders the dependency closure of `target` so that every fixture follows
/// all of its dependencies. The target itself is always last.
///
/// Ties between independent dependencies follow `depends_on` declaration
/// order, so the result is stable for a given registry.
pub fn resolve_order(
    registry: &FixtureRegistry,
    target: &FixtureName,
) -> Result<Vec<FixtureName>, DefinitionError> {
    let root = registry
        .lookup(target.as_str())
        .ok_or_else(|| DefinitionError::UnknownFixture {
            name: target.clone(),
        })?;

    let mut ordered = Vec::new();
    let mut finished = BTreeSet::<&FixtureName>::new();
    let mut on_stack = BTreeSet::<&FixtureName>::new();
    let mut stack = vec![Frame {
        fixture: root,
        next_dependency: 0,
    }];
    on_stack.insert(&root.name);

    while let Some(frame) = stack.last_mut() {
        let fixture = frame.fixture;
        let Some(dependency) = fixture.depends_on.get(frame.next_dependency) else {
            stack.pop();
            on_stack.remove(&fixture.name);
            finished.insert(&fixture.name);
            ordered.push(fixture.name.clone());
            continue;
        };
        frame.next_dependency += 1;

        if finished.contains(dependency) {
            continue;
        }
        if on_stack.contains(dependency) {
            return Err(DefinitionError::CyclicDependency {
                cycle: cycle_path(&stack, dependency),
            });
        }

        let next = registry.lookup(dependency.as_str()).ok_or_else(|| {
            DefinitionError::UnknownDependency {
                fixture: fixture.name.clone(),
                dependency: dependency.clone(),
            }
        })?;
        on_stack.insert(&next.name);
        stack.push(Frame {
            fixture: next,
            next_dependency: 0,
        });
    }

    Ok(ordered)
}

pub fn dependency_closure(
    registry: &FixtureRegistry,
    target: &FixtureName,
) -> Result<BTreeSet<FixtureName>, DefinitionError> {
    Ok(resolve_order(registry, target)?.into_iter().collect())
}

/// Groups targets into batches whose dependency closures never overlap, so
/// each batch can run on independent sessions at the same time. Targets keep
/// their relative order inside and across batches.
pub fn partition_disjoint(
    registry: &FixtureRegistry,
    targets: &[FixtureName],
) -> Result<Vec<Vec<FixtureName>>, DefinitionError> {
    let mut batches = Vec::<(BTreeSet<FixtureName>, Vec<FixtureName>)>::new();

    for target in targets {
        let closure = dependency_closure(registry, target)?;
        let mut placed = false;
        if let Some((claimed, members)) = batches.last_mut()
            && claimed.is_disjoint(&closure)
        {
            claimed.extend(closure.iter().cloned());
            members.push(target.clone());
            placed = true;
        }
        if !placed {
            batches.push((closure, vec![target.clone()]));
        }
    }

    Ok(batches.into_iter().map(|(_, members)| members).collect())
}

fn cycle_path(stack: &[Frame<'_>], repeated: &FixtureName) -> Vec<FixtureName> {
    let start = stack
        .iter()
        .position(|frame| &frame.fixture.name == repeated)
        .unwrap_or(0);
    let mut cycle = stack[start..]
        .iter()
        .map(|frame| frame.fixture.name.clone())
        .collect::<Vec<_>>();
    cycle.push(repeated.clone());
    cycle
}
