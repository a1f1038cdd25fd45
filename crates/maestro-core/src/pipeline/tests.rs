use super::*;
use crate::plan::StepSpec;
use std::collections::BTreeSet;

fn intent(category: &str, confidence: f32) -> Intent {
    Intent::new(category, confidence, BTreeSet::new(), "prompt").unwrap()
}

fn ranked(top: Intent) -> Vec<Intent> {
    vec![top, Intent::general("prompt")]
}

#[test]
fn test_confident_single_capability_is_single() {
    let detector = PipelineDetector::with_defaults();
    let decision = detector.decide(&ranked(intent("quick_fix", 0.92)), 0.6).unwrap();

    assert!(!decision.low_confidence);
    match decision.mode {
        Mode::Single(i) => assert_eq!(i.category(), "quick_fix"),
        other => panic!("expected single, got {:?}", other.kind()),
    }
}

#[test]
fn test_threshold_is_inclusive() {
    let detector = PipelineDetector::with_defaults();
    let route = detector.route(&ranked(intent("search", 0.6)), 0.6);
    assert_eq!(route.kind(), ModeKind::Single);
}

#[test]
fn test_feature_plan_fans_out_in_one_group() {
    let detector = PipelineDetector::with_defaults();
    let decision = detector
        .decide(&ranked(intent("implement_feature", 0.8)), 0.6)
        .unwrap();

    let Mode::Pipeline(plan) = decision.mode else {
        panic!("expected pipeline");
    };
    assert_eq!(plan.template(), "implement_feature");
    assert_eq!(plan.steps().len(), 3);
    assert_eq!(plan.group_count(), 1);
}

#[test]
fn test_low_confidence_uses_fallback() {
    let detector = PipelineDetector::with_defaults();

    // Even a single-capability category falls back when it misses the bar
    let route = detector.route(&ranked(intent("quick_fix", 0.4)), 0.6);
    match route {
        Route::Pipeline {
            template,
            low_confidence,
            intent,
        } => {
            assert!(low_confidence);
            assert_eq!(template.name, FALLBACK_TEMPLATE);
            assert_eq!(intent.category(), "quick_fix");
        }
        Route::Single(_) => panic!("low confidence must not go single"),
    }
}

#[test]
fn test_general_only_goes_to_fallback() {
    let detector = PipelineDetector::with_defaults();
    let decision = detector.decide(&[Intent::general("hmm")], 0.6).unwrap();

    assert!(decision.low_confidence);
    let Mode::Pipeline(plan) = decision.mode else {
        panic!("expected pipeline");
    };
    assert_eq!(plan.template(), FALLBACK_TEMPLATE);
    assert_eq!(plan.outline(), "[clarify] -> [delegate]");
}

#[test]
fn test_general_clearing_a_zero_threshold_still_falls_back() {
    let detector = PipelineDetector::with_defaults();
    let route = detector.route(&[Intent::general("hmm")], 0.0);
    match route {
        Route::Pipeline {
            template,
            low_confidence,
            ..
        } => {
            assert!(!low_confidence);
            assert_eq!(template.name, FALLBACK_TEMPLATE);
        }
        Route::Single(_) => panic!("general is not single-capability"),
    }
}

#[test]
fn test_empty_intents_fall_back() {
    let detector = PipelineDetector::with_defaults();
    let route = detector.route(&[], 0.6);
    assert_eq!(route.kind(), ModeKind::Pipeline);
    assert!(route.intent().is_general());
}

#[test]
fn test_default_templates_are_valid() {
    let detector = PipelineDetector::with_defaults();
    for category in ["implement_feature", "refactor", "debug", "review"] {
        let template = detector.templates().get(category).unwrap();
        let plan = detector.build_plan(template).unwrap();
        assert_eq!(plan.template(), category);
    }

    let debug = detector.templates().get("debug").unwrap();
    assert_eq!(detector.build_plan(debug).unwrap().group_count(), 4);
    let refactor = detector.templates().get("refactor").unwrap();
    assert_eq!(
        detector.build_plan(refactor).unwrap().outline(),
        "[analyze] -> [rewrite, update_tests] -> [verify]"
    );
}

#[test]
fn test_cyclic_template_is_rejected() {
    let mut templates = TemplateRegistry::with_defaults();
    templates.register(
        "refactor",
        PlanTemplate::new(
            "broken",
            vec![
                StepSpec::new("a", "agent", "").after("b"),
                StepSpec::new("b", "agent", "").after("a"),
            ],
        ),
    );
    let detector = PipelineDetector::new(CategoryRegistry::with_defaults(), templates);

    let err = detector
        .decide(&ranked(intent("refactor", 0.9)), 0.6)
        .unwrap_err();
    assert!(matches!(err, Error::PlanCycle(ref steps) if steps == "a, b"));
}
