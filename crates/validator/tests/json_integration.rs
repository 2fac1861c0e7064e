//! Integration tests for schemas loaded from JSON.

use fieldcheck::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn load(json: Value) -> Schemas {
    serde_json::from_value(json).unwrap()
}

fn form(json: Value) -> FieldValues {
    serde_json::from_value(json).unwrap()
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn full_form_schema_loads() {
    let schemas = load(json!({
        "email": {
            "field": "email",
            "rules": [
                {"kind": "required", "message": "Email is required"},
                {"kind": "email"}
            ],
            "triggers": ["blur", "submit"]
        },
        "age": {
            "field": "age",
            "rules": [
                {"kind": "integer"},
                {"kind": "min", "params": 18},
                {"kind": "max", "params": 130, "severity": "warning"}
            ]
        },
        "end_date": {
            "field": "end_date",
            "rules": [
                {"kind": "field_compare", "params": {"field": "start_date", "operator": ">"}},
                {"kind": "date_max", "params": "2100-01-01"}
            ]
        },
        "company_name": {
            "field": "company_name",
            "rules": [{
                "kind": "conditional",
                "params": {
                    "condition": {"field": "account_type", "operator": "=", "value": "business"},
                    "rules": [{"kind": "required"}, {"kind": "min_length", "params": 2}]
                }
            }]
        }
    }));

    assert_eq!(schemas.len(), 4);
    assert!(schemas["email"].applies_to(Trigger::Submit));
    assert!(!schemas["email"].applies_to(Trigger::Change));
    assert_eq!(schemas["age"].rules[2].severity, Severity::Warning);
    assert_eq!(schemas["end_date"].dependencies(), vec!["start_date"]);
    assert_eq!(dependents_of(&schemas, "account_type"), vec!["company_name"]);
}

#[test]
fn schema_survives_serialization() {
    let schema = FieldSchema::new(
        "tags",
        [
            Rule::min_items(1),
            Rule::unique_items().with_message("No repeats"),
            Rule::custom("tag_allowed").depends_on("category"),
        ],
    )
    .triggers([Trigger::Change]);

    let wire = serde_json::to_value(&schema).unwrap();
    assert_eq!(wire["rules"][1], json!({"kind": "unique_items", "message": "No repeats", "severity": "error"}));
    assert_eq!(FieldSchema::from_json(wire).unwrap(), schema);
}

#[rstest]
#[case::unknown_kind(json!({"kind": "credit_card"}), "unknown rule kind")]
#[case::missing_params(json!({"kind": "min_length"}), "min_length")]
#[case::bad_regex(json!({"kind": "pattern", "params": "(unclosed"}), "regex")]
#[case::bad_operator(
    json!({"kind": "field_compare", "params": {"field": "a", "operator": "~"}}),
    "field_compare"
)]
#[case::bad_severity(json!({"kind": "required", "severity": "fatal"}), "fatal")]
fn malformed_rules_are_rejected(#[case] rule: Value, #[case] needle: &str) {
    let err = FieldSchema::from_json(json!({"rules": [rule]})).unwrap_err();
    let text = err.to_string();
    assert!(text.contains(needle), "`{text}` should mention `{needle}`");
}

// ============================================================================
// EVALUATION
// ============================================================================

#[tokio::test]
async fn custom_check_replaces_kind_without_params() {
    let schema = FieldSchema::from_json(json!({
        "field": "zip",
        "rules": [{"kind": "pattern", "custom_check": "zip", "message": "Unknown ZIP code"}]
    }))
    .unwrap();
    let registry = CheckRegistry::builder()
        .check("zip", |v: &Value, _: Option<&ValidationContext>| -> CheckResult {
            Ok(CheckOutcome::from(matches!(v.as_str(), Some("10115" | "80331"))))
        })
        .build();
    let engine = ValidationEngine::builder().registry(registry).build();

    assert!(engine.validate(&json!("10115"), &schema, None).await.unwrap().valid);

    let result = engine.validate(&json!("99999"), &schema, None).await.unwrap();
    assert_eq!(result.first_error(), Some("Unknown ZIP code"));
    assert_eq!(result.errors[0].code, "pattern");
}

fn registration() -> Schemas {
    load(json!({
        "email": {"rules": [{"kind": "required"}, {"kind": "email"}]},
        "website": {"rules": [{"kind": "url"}]},
        "phone": {"rules": [{"kind": "phone"}]},
        "age": {"rules": [{"kind": "integer"}, {"kind": "min", "params": 18}]},
        "account_type": {"rules": [{"kind": "required"}]},
        "company_name": {"rules": [{
            "kind": "conditional",
            "params": {
                "condition": {"field": "account_type", "value": "business"},
                "rules": [{"kind": "required", "message": "Company name is required"}]
            }
        }]}
    }))
}

#[tokio::test]
async fn well_formed_submission_passes() {
    let values = form(json!({
        "email": "ada@example.com",
        "website": "https://example.com/ada",
        "phone": "+1 (555) 010-0000",
        "age": 36,
        "account_type": "personal",
    }));

    let results = ValidationEngine::shared()
        .validate_fields(&values, &registration())
        .await
        .unwrap();
    assert!(is_valid(&results), "{:?}", all_errors(&results));
}

#[tokio::test]
async fn bad_submission_reports_every_field() {
    let values = form(json!({
        "email": "ada@",
        "website": "example.com",
        "phone": "call me",
        "age": 17.5,
        "account_type": "business",
        "company_name": "",
    }));

    let results = ValidationEngine::shared()
        .validate_fields(&values, &registration())
        .await
        .unwrap();

    let reported: Vec<(&str, &str)> = all_errors(&results)
        .into_iter()
        .map(|e| (e.field.as_str(), e.message.as_str()))
        .collect();
    assert_eq!(
        reported,
        [
            ("email", "Invalid email address"),
            ("website", "Invalid URL"),
            ("phone", "Invalid phone number"),
            ("age", "Value must be an integer"),
            ("age", "Minimum value is 18"),
            ("company_name", "Company name is required"),
        ]
    );
}

#[tokio::test]
async fn entries_serialize_for_renderers() {
    let schema = FieldSchema::from_json(json!({
        "field": "qty",
        "rules": [{"kind": "max", "params": 10, "severity": "info", "message": "That is a lot"}]
    }))
    .unwrap();

    let result = ValidationEngine::shared()
        .validate(&json!(11), &schema, None)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "valid": true,
            "errors": [],
            "warnings": [{
                "field": "qty",
                "message": "That is a lot",
                "code": "max",
                "rule": "max",
                "severity": "info"
            }]
        })
    );
}
