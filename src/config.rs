use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::model::leave_request::{BalancePolicy, TransitionRules};
use crate::service::leave_request::WorkflowSettings;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// strftime pattern for dates in entitlement responses
    pub date_format: String,

    // Leave workflow
    pub strict_transitions: bool,
    pub balance_policy: BalancePolicy,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            date_format: env::var("DATE_FORMAT").unwrap_or_else(|_| "%Y-%m-%d".to_string()),

            strict_transitions: parsed_or("LEAVE_STRICT_TRANSITIONS", false)?,
            balance_policy: parsed_or("LEAVE_BALANCE_POLICY", BalancePolicy::Reject)?,
        })
    }

    pub fn workflow(&self) -> WorkflowSettings {
        WorkflowSettings {
            transitions: TransitionRules {
                strict: self.strict_transitions,
            },
            balance_policy: self.balance_policy,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            strict_transitions: false,
            balance_policy: BalancePolicy::Reject,
        }
    }
}
