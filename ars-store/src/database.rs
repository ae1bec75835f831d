use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;
use serde_json::Value;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    rule_key: String,
    rule_value: Value,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rules stored in the `business_rules` table on top of the file config.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for row in rows {
            apply_rule(&mut rules, &row.rule_key, &row.rule_value);
        }
        Ok(rules)
    }
}

/// Expected format: {"value": <number>}
fn apply_rule(rules: &mut BusinessRules, key: &str, raw: &Value) {
    let Some(v) = raw.get("value") else {
        return;
    };
    match key {
        "hold_minutes" => {
            if let Some(n) = v.as_i64() {
                rules.hold_minutes = n;
            }
        }
        "hold_sweep_seconds" => {
            if let Some(n) = v.as_u64() {
                rules.hold_sweep_seconds = n;
            }
        }
        "first_class_multiplier" => {
            if let Some(f) = v.as_f64() {
                rules.first_class_multiplier = f;
            }
        }
        "rate_limit_per_minute" => {
            if let Some(n) = v.as_i64() {
                rules.rate_limit_per_minute = n;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_rule_overrides() {
        let mut rules = BusinessRules::default();
        apply_rule(&mut rules, "first_class_multiplier", &json!({"value": 2.5}));
        apply_rule(&mut rules, "hold_minutes", &json!({"value": 20}));
        apply_rule(&mut rules, "hold_minutes", &json!(45));
        apply_rule(&mut rules, "unknown", &json!({"value": 1}));

        assert_eq!(rules.first_class_multiplier, 2.5);
        assert_eq!(rules.hold_minutes, 20);
    }
}
