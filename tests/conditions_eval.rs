use dagrun::conditions::{Condition, ConditionEvaluator, EnvEvaluator};

#[test]
fn literal_values_compare_directly() {
    let evaluator = EnvEvaluator;
    assert!(evaluator.eval_condition(&Condition::new("yes", "yes")).is_ok());

    let err = evaluator
        .eval_condition(&Condition::new("yes", "no"))
        .unwrap_err();
    assert_eq!(err.condition, "yes");
    assert_eq!(err.expected, "no");
    assert_eq!(err.actual, "yes");
}

#[test]
fn braced_variables_are_expanded() {
    std::env::set_var("DAGRUN_TEST_COND_BRACED", "v1");
    let evaluator = EnvEvaluator;
    assert!(evaluator
        .eval_condition(&Condition::new("${DAGRUN_TEST_COND_BRACED}", "v1"))
        .is_ok());
    assert!(evaluator
        .eval_condition(&Condition::new("x-${DAGRUN_TEST_COND_BRACED}", "x-v1"))
        .is_ok());
}

#[test]
fn bare_variables_are_expanded() {
    std::env::set_var("DAGRUN_TEST_COND_BARE", "v2");
    let evaluator = EnvEvaluator;
    assert!(evaluator
        .eval_condition(&Condition::new("$DAGRUN_TEST_COND_BARE", "v2"))
        .is_ok());
    // A trailing non-identifier character ends the variable name.
    assert!(evaluator
        .eval_condition(&Condition::new("$DAGRUN_TEST_COND_BARE/x", "v2/x"))
        .is_ok());
}

#[test]
fn unset_variables_expand_to_empty() {
    let evaluator = EnvEvaluator;
    assert!(evaluator
        .eval_condition(&Condition::new("${DAGRUN_TEST_COND_UNSET}", ""))
        .is_ok());
}

#[test]
fn list_evaluation_short_circuits_on_first_failure() {
    let evaluator = EnvEvaluator;
    let conditions = vec![
        Condition::new("a", "a"),
        Condition::new("b", "nope"),
        Condition::new("c", "c"),
    ];
    let err = evaluator.eval_conditions(&conditions).unwrap_err();
    assert_eq!(err.condition, "b");
}

#[test]
fn dollar_without_identifier_is_kept() {
    let evaluator = EnvEvaluator;
    assert!(evaluator.eval_condition(&Condition::new("$", "$")).is_ok());
    assert!(evaluator
        .eval_condition(&Condition::new("a$ b", "a$ b"))
        .is_ok());
}
