use super::*;

fn review_specs() -> Vec<StepSpec> {
    vec![
        StepSpec::new("security", "security-reviewer", "check for vulnerabilities"),
        StepSpec::new("correctness", "reviewer", "check logic"),
        StepSpec::new("style", "linter", "check style"),
        StepSpec::new("summarize", "writer", "merge findings")
            .after("security")
            .after("correctness")
            .after("style"),
    ]
}

#[test]
fn test_independent_steps_share_a_group() {
    let plan = PipelinePlan::build("review", review_specs()).unwrap();

    assert_eq!(plan.group_count(), 2);
    let groups = plan.groups();
    assert_eq!(groups[0].len(), 3);
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[1][0].key, "summarize");
    assert_eq!(plan.outline(), "[security, correctness, style] -> [summarize]");
}

#[test]
fn test_chain_gets_one_group_per_step() {
    let specs = vec![
        StepSpec::new("d", "agent", "4").after("c"),
        StepSpec::new("c", "agent", "3").after("b"),
        StepSpec::new("b", "agent", "2").after("a"),
        StepSpec::new("a", "agent", "1"),
    ];
    let plan = PipelinePlan::build("chain", specs).unwrap();

    let keys: Vec<&str> = plan.steps().iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c", "d"]);
    assert_eq!(plan.group_count(), 4);
}

#[test]
fn test_dependencies_are_in_earlier_groups() {
    let specs = vec![
        StepSpec::new("a", "agent", ""),
        StepSpec::new("b", "agent", "").after("a"),
        StepSpec::new("c", "agent", ""),
        StepSpec::new("d", "agent", "").after("b").after("c"),
    ];
    let plan = PipelinePlan::build("diamond", specs).unwrap();

    for step in plan.steps() {
        for dep in &step.depends_on {
            let dep_step = plan.step(dep).unwrap();
            assert!(dep_step.parallel_group < step.parallel_group);
        }
    }
}

#[test]
fn test_cycle_is_rejected() {
    let specs = vec![
        StepSpec::new("a", "agent", "").after("c"),
        StepSpec::new("b", "agent", "").after("a"),
        StepSpec::new("c", "agent", "").after("b"),
        StepSpec::new("free", "agent", ""),
    ];
    let err = PipelinePlan::build("loop", specs).unwrap_err();
    match err {
        Error::PlanCycle(steps) => assert_eq!(steps, "a, b, c"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let specs = vec![StepSpec::new("a", "agent", "").after("a")];
    assert!(matches!(
        PipelinePlan::build("self", specs),
        Err(Error::PlanCycle(_))
    ));
}

#[test]
fn test_unknown_dependency_and_duplicates_rejected() {
    let unknown = vec![StepSpec::new("a", "agent", "").after("ghost")];
    assert!(matches!(
        PipelinePlan::build("t", unknown),
        Err(Error::Configuration(_))
    ));

    let dup = vec![
        StepSpec::new("a", "agent", ""),
        StepSpec::new("a", "agent", ""),
    ];
    assert!(matches!(
        PipelinePlan::build("t", dup),
        Err(Error::Configuration(_))
    ));

    assert!(PipelinePlan::build("t", Vec::new()).is_err());
}

#[test]
fn test_task_ids_are_prefixed_and_unique_across_plans() {
    let first = PipelinePlan::build("review", review_specs()).unwrap();
    let second = first.replan("review", review_specs()).unwrap();

    assert_eq!(second.supersedes(), Some(first.id()));
    assert!(first.steps()[0].task_id.starts_with(&first.short_id()));
    for step in second.steps() {
        assert!(first.step(&step.task_id).is_none());
    }
}

#[test]
fn test_step_spec_deserializes_camel_case() {
    let spec: StepSpec = serde_json::from_str(
        r#"{"key":"fix","agentType":"implementer","instruction":"apply","dependsOn":["diagnose"]}"#,
    )
    .unwrap();
    assert_eq!(spec.depends_on, vec!["diagnose"]);
}
