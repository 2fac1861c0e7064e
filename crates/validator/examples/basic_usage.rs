//! Basic usage example for fieldcheck

use fieldcheck::prelude::*;
use serde_json::{Value, json};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Schemas usually arrive as JSON
    let schemas: Schemas = serde_json::from_value(json!({
        "username": {"rules": [
            {"kind": "required"},
            {"kind": "min_length", "params": 3},
            {"kind": "custom", "custom_check": "not_reserved", "message": "That name is reserved"}
        ]},
        "password": {"rules": [{"kind": "required"}, {"kind": "min_length", "params": 8}]},
        "confirm": {"rules": [{"kind": "field_match", "params": "password"}]}
    }))?;

    let registry = CheckRegistry::builder()
        .check("not_reserved", |v: &Value, _: Option<&ValidationContext>| -> CheckResult {
            Ok(CheckOutcome::from(!matches!(v.as_str(), Some("admin" | "root"))))
        })
        .build();
    let engine = ValidationEngine::builder()
        .registry(registry)
        .config(EngineConfig::from_env()?)
        .build();

    let values: FieldValues = serde_json::from_value(json!({
        "username": "admin",
        "password": "hunter22",
        "confirm": "hunter2",
    }))?;

    let results = engine.validate_fields(&values, &schemas).await?;
    for entry in all_errors(&results) {
        println!("✗ {}: {} ({})", entry.field, entry.message, entry.code);
    }
    println!("\nform valid: {}", is_valid(&results));
    Ok(())
}
