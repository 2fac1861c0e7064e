//! Integration tests for the validation engine.

use std::sync::Once;
use std::time::Duration;

use fieldcheck::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

fn values(json: Value) -> FieldValues {
    serde_json::from_value(json).unwrap()
}

fn messages(entries: &[ValidationEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.message.as_str()).collect()
}

// ============================================================================
// SINGLE FIELD
// ============================================================================

#[tokio::test]
async fn every_rule_runs_in_declaration_order() {
    init_tracing();
    let schema = FieldSchema::new(
        "username",
        [
            Rule::required(),
            Rule::min_length(3),
            Rule::pattern("^[a-z]+$").unwrap().with_message("Lowercase letters only"),
            Rule::max_length(1).as_warning(),
        ],
    );

    let result = ValidationEngine::new()
        .validate(&json!("A1"), &schema, None)
        .await
        .unwrap();

    assert!(!result.valid);
    assert_eq!(
        messages(&result.errors),
        ["Minimum length is 3 characters", "Lowercase letters only"]
    );
    assert_eq!(messages(&result.warnings), ["Maximum length is 1 characters"]);
    assert!(result.errors.iter().all(|e| e.field == "username"));
}

#[rstest]
#[case::only_warnings(Severity::Warning, true)]
#[case::only_info(Severity::Info, true)]
#[case::errors(Severity::Error, false)]
#[tokio::test]
async fn validity_depends_on_errors_only(#[case] severity: Severity, #[case] valid: bool) {
    let schema = FieldSchema::new("n", [Rule::positive().with_severity(severity)]);
    let result = ValidationEngine::new()
        .validate(&json!(-1), &schema, None)
        .await
        .unwrap();

    assert_eq!(result.valid, valid);
    assert_eq!(result.valid, result.errors.is_empty());
    assert_eq!(result.errors.len() + result.warnings.len(), 1);
}

#[tokio::test]
async fn field_match_reads_the_context() {
    let schema = FieldSchema::new("b", [Rule::field_match("a")]);
    let engine = ValidationEngine::new();

    let ctx = ValidationContext::builder().value("a", 5).value("b", 5).build();
    assert!(engine.validate(&json!(5), &schema, Some(&ctx)).await.unwrap().valid);

    let result = engine.validate(&json!(6), &schema, Some(&ctx)).await.unwrap();
    assert_eq!(result.first_error(), Some("Value must match a"));

    // Without a context the sibling reads as null.
    let result = engine.validate(&json!(6), &schema, None).await.unwrap();
    assert!(!result.valid);
}

#[tokio::test]
async fn conditional_applies_nested_rules_only_when_guard_holds() {
    let schema = FieldSchema::new(
        "company_name",
        [Rule::conditional(
            Condition::field("account_type").equals("business"),
            [Rule::required()],
        )],
    );
    let engine = ValidationEngine::new();

    let personal = ValidationContext::new(values(json!({"account_type": "personal"})));
    assert!(engine.validate(&json!(""), &schema, Some(&personal)).await.unwrap().valid);

    let business = ValidationContext::new(values(json!({"account_type": "business"})));
    let result = engine.validate(&json!(""), &schema, Some(&business)).await.unwrap();
    assert_eq!(result.first_error(), Some("This field is required"));
    assert_eq!(result.errors[0].code, "conditional");
}

#[tokio::test]
async fn async_and_sync_checks_keep_declaration_order() {
    let registry = CheckRegistry::builder()
        .async_fn("slow_fail", |_v, _ctx| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(CheckOutcome::FailWith("slow".into()))
        })
        .check("fast_fail", |_: &Value, _: Option<&ValidationContext>| -> CheckResult {
            Ok(CheckOutcome::FailWith("fast".into()))
        })
        .build();
    let engine = ValidationEngine::builder().registry(registry).build();
    let schema = FieldSchema::new(
        "x",
        [Rule::custom_async("slow_fail"), Rule::custom("fast_fail"), Rule::required()],
    );

    let result = engine.validate(&Value::Null, &schema, None).await.unwrap();
    assert_eq!(messages(&result.errors), ["slow", "fast", "This field is required"]);
    let codes: Vec<_> = result.errors.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, ["custom", "custom", "required"]);
}

#[tokio::test(start_paused = true)]
async fn timeout_check_reports_a_failure_not_a_fault() {
    let slow = AsyncFnCheck::new(|_v, _ctx| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(CheckOutcome::Pass)
    });
    let registry = CheckRegistry::builder()
        .async_check("lookup", TimeoutCheck::new(slow, Duration::from_secs(1)))
        .build();
    let engine = ValidationEngine::builder()
        .registry(registry)
        .config(EngineConfig::default().fault_policy(FaultPolicy::Propagate))
        .build();

    let schema = FieldSchema::new("email", [Rule::custom_async("lookup")]);
    let result = engine.validate(&json!("a@b.co"), &schema, None).await.unwrap();
    assert_eq!(result.first_error(), Some("Validation timed out after 1s"));
}

// ============================================================================
// FAULTS
// ============================================================================

#[tokio::test]
async fn isolated_fault_does_not_hide_other_rules() {
    let schema = FieldSchema::new(
        "when",
        [Rule::date_past(), Rule::custom("unregistered"), Rule::min_length(50)],
    );
    let result = ValidationEngine::new()
        .validate(&json!("not a date"), &schema, None)
        .await
        .unwrap();

    let codes: Vec<_> = result.errors.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, ["evaluator_fault", "evaluator_fault", "min_length"]);
    assert!(result.errors[1].message.contains("unregistered"));
}

#[tokio::test]
async fn propagated_fault_aborts_validate_fields() {
    let engine = ValidationEngine::builder()
        .config(EngineConfig::default().fault_policy(FaultPolicy::Propagate))
        .build();
    let mut schemas = Schemas::new();
    schemas.insert("a".into(), FieldSchema::new("a", [Rule::required()]));
    schemas.insert("b".into(), FieldSchema::new("b", [Rule::custom("ghost")]));

    let fault = engine
        .validate_fields(&values(json!({"a": "x", "b": 1})), &schemas)
        .await
        .unwrap_err();
    assert_eq!(fault, EvaluatorFault::UnknownCheck("ghost".into()));
}

// ============================================================================
// MULTIPLE FIELDS
// ============================================================================

fn signup_schemas() -> Schemas {
    let mut schemas = Schemas::new();
    schemas.insert(
        "email".into(),
        FieldSchema::new("email", [Rule::required(), Rule::email()]),
    );
    schemas.insert(
        "password".into(),
        FieldSchema::new("password", [Rule::required(), Rule::min_length(8)]),
    );
    schemas.insert(
        "confirm".into(),
        FieldSchema::new("confirm", [Rule::field_match("password").with_message("Passwords differ")]),
    );
    schemas.insert(
        "nickname".into(),
        FieldSchema::anonymous([Rule::max_length(3).as_warning()]),
    );
    schemas
}

#[tokio::test]
async fn validate_fields_is_keyed_by_schema_in_order() {
    init_tracing();
    let form = values(json!({
        "nickname": "speedy",
        "password": "short",
        "confirm": "shorter",
        "unrelated": true,
    }));

    let results = ValidationEngine::new()
        .validate_fields(&form, &signup_schemas())
        .await
        .unwrap();

    let keys: Vec<_> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, ["email", "password", "confirm", "nickname"]);

    assert_eq!(results["email"].first_error(), Some("This field is required"));
    assert_eq!(results["password"].first_error(), Some("Minimum length is 8 characters"));
    assert_eq!(results["confirm"].first_error(), Some("Passwords differ"));
    assert!(results["nickname"].valid);
    assert_eq!(results["nickname"].warnings[0].field, "nickname");

    assert!(!is_valid(&results));
    let total: usize = results.values().map(|r| r.errors.len()).sum();
    assert_eq!(all_errors(&results).len(), total);
    assert_eq!(all_warnings(&results).len(), 1);
}

#[tokio::test]
async fn validate_fields_is_idempotent() {
    let form = values(json!({"email": "a@b.co", "password": "longenough", "confirm": "nope"}));
    let engine = ValidationEngine::new();
    let schemas = signup_schemas();

    let first = engine.validate_fields(&form, &schemas).await.unwrap();
    let second = engine.validate_fields(&form, &schemas).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn concurrent_fields_report_in_schema_order() {
    let registry = CheckRegistry::builder()
        .async_fn("delay", |v: Value, _ctx| async move {
            let ms = v.as_u64().unwrap_or_default();
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(CheckOutcome::FailWith(format!("waited {ms}")))
        })
        .build();
    let engine = ValidationEngine::builder()
        .registry(registry)
        .config(EngineConfig::default().max_concurrent_fields(4))
        .build();

    let mut schemas = Schemas::new();
    for name in ["slow", "medium", "fast"] {
        schemas.insert(name.into(), FieldSchema::new(name, [Rule::custom_async("delay")]));
    }
    let form = values(json!({"slow": 300, "medium": 200, "fast": 100}));

    let results = engine.validate_fields(&form, &schemas).await.unwrap();
    let firsts: Vec<_> = results.values().filter_map(ValidationResult::first_error).collect();
    assert_eq!(firsts, ["waited 300", "waited 200", "waited 100"]);
}

#[tokio::test]
async fn empty_schema_set_is_valid() {
    let results = ValidationEngine::shared()
        .validate_fields(&FieldValues::new(), &Schemas::new())
        .await
        .unwrap();
    assert!(results.is_empty());
    assert!(is_valid(&results));
}

#[tokio::test]
async fn hidden_fields_can_be_skipped() {
    let mut schemas = Schemas::new();
    schemas.insert("account_type".into(), FieldSchema::new("account_type", [Rule::required()]));
    schemas.insert("company_name".into(), FieldSchema::new("company_name", [Rule::required()]));
    let rules = [VisibilityRule::new(
        "company_name",
        Condition::field("account_type").equals("business"),
    )];
    let form = values(json!({"account_type": "personal"}));

    let visible = visible_schemas(&schemas, &rules, &form);
    let results = ValidationEngine::new().validate_fields(&form, &visible).await.unwrap();
    assert!(is_valid(&results));
    assert_eq!(results.len(), 1);
}
