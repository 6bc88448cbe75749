use sqlregress_core::{
    DefinitionError, FixtureFile, FixtureName, FixtureRegistry, partition_disjoint, resolve_order,
};

fn registry(fixtures: Vec<FixtureFile>) -> FixtureRegistry {
    let mut builder = FixtureRegistry::builder();
    builder
        .register_all(fixtures)
        .expect("fixtures should register");
    builder.build()
}

fn names(order: &[FixtureName]) -> Vec<&str> {
    order.iter().map(FixtureName::as_str).collect()
}

fn position(order: &[FixtureName], name: &str) -> usize {
    order
        .iter()
        .position(|fixture| fixture.as_str() == name)
        .unwrap_or_else(|| panic!("{name} missing from {order:?}"))
}

#[test]
fn diamond_dependency_runs_shared_fixture_once() {
    let registry = registry(vec![
        FixtureFile::new("a").depends_on(["b", "c"]),
        FixtureFile::new("b").depends_on(["d"]),
        FixtureFile::new("c").depends_on(["d"]),
        FixtureFile::new("d"),
    ]);

    let order = resolve_order(&registry, &FixtureName::new("a")).expect("acyclic registry");

    assert_eq!(names(&order), vec!["d", "b", "c", "a"]);
}

#[test]
fn every_dependency_precedes_its_dependent() {
    let registry = registry(vec![
        FixtureFile::new("privileges").depends_on(["test_setup", "create_index"]),
        FixtureFile::new("create_index").depends_on(["create_table", "test_setup"]),
        FixtureFile::new("create_table").depends_on(["test_setup"]),
        FixtureFile::new("test_setup"),
        FixtureFile::new("unrelated"),
    ]);
    let target = FixtureName::new("privileges");

    let order = resolve_order(&registry, &target).expect("acyclic registry");

    assert_eq!(order.last(), Some(&target));
    assert!(!order.iter().any(|name| name.as_str() == "unrelated"));
    for name in &order {
        let fixture = registry.lookup(name.as_str()).expect("resolved fixture exists");
        for dependency in &fixture.depends_on {
            assert!(
                position(&order, dependency.as_str()) < position(&order, name.as_str()),
                "{dependency} must precede {name}",
            );
        }
    }
}

#[test]
fn resolution_is_deterministic() {
    let registry = registry(vec![
        FixtureFile::new("target").depends_on(["zeta", "alpha", "mid"]),
        FixtureFile::new("zeta"),
        FixtureFile::new("alpha"),
        FixtureFile::new("mid").depends_on(["alpha"]),
    ]);
    let target = FixtureName::new("target");

    let first = resolve_order(&registry, &target).expect("acyclic registry");
    let second = resolve_order(&registry, &target).expect("acyclic registry");

    assert_eq!(first, second);
    assert_eq!(names(&first), vec!["zeta", "alpha", "mid", "target"]);
}

#[test]
fn two_fixture_cycle_is_reported() {
    let registry = registry(vec![
        FixtureFile::new("a").depends_on(["b"]),
        FixtureFile::new("b").depends_on(["a"]),
    ]);

    let error = resolve_order(&registry, &FixtureName::new("a")).expect_err("cycle");

    assert_eq!(
        error,
        DefinitionError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        }
    );
    assert_eq!(error.to_string(), "cyclic fixture dependency: a -> b -> a");
}

#[test]
fn cycle_reachable_from_target_fails_resolution() {
    let registry = registry(vec![
        FixtureFile::new("top").depends_on(["x"]),
        FixtureFile::new("x").depends_on(["y"]),
        FixtureFile::new("y").depends_on(["x"]),
    ]);

    let error = resolve_order(&registry, &FixtureName::new("top")).expect_err("cycle");

    assert!(matches!(error, DefinitionError::CyclicDependency { ref cycle } if cycle.len() == 3));
}

#[test]
fn self_dependency_is_a_cycle() {
    let registry = registry(vec![FixtureFile::new("loop").depends_on(["loop"])]);

    let error = resolve_order(&registry, &FixtureName::new("loop")).expect_err("cycle");

    assert_eq!(
        error,
        DefinitionError::CyclicDependency {
            cycle: vec!["loop".into(), "loop".into()],
        }
    );
}

#[test]
fn missing_dependency_names_both_fixtures() {
    let registry = registry(vec![FixtureFile::new("a").depends_on(["ghost"])]);

    let error = resolve_order(&registry, &FixtureName::new("a")).expect_err("missing dependency");

    assert_eq!(
        error,
        DefinitionError::UnknownDependency {
            fixture: "a".into(),
            dependency: "ghost".into(),
        }
    );
}

#[test]
fn missing_target_is_unknown_fixture() {
    let registry = registry(vec![FixtureFile::new("a")]);

    let error = resolve_order(&registry, &FixtureName::new("nope")).expect_err("missing target");

    assert_eq!(error, DefinitionError::UnknownFixture { name: "nope".into() });
}

#[test]
fn partition_separates_overlapping_closures() {
    let registry = registry(vec![
        FixtureFile::new("setup"),
        FixtureFile::new("left").depends_on(["setup"]),
        FixtureFile::new("right").depends_on(["setup"]),
        FixtureFile::new("solo"),
    ]);
    let targets = ["left", "solo", "right"].map(FixtureName::new);

    let batches = partition_disjoint(&registry, &targets).expect("acyclic registry");

    let batches = batches
        .iter()
        .map(|batch| names(batch))
        .collect::<Vec<_>>();
    assert_eq!(batches, vec![vec!["left", "solo"], vec!["right"]]);
}
