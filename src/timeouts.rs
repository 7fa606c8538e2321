use std::time::Duration;

use regex::Regex;

use crate::config::{QueryConfig, TimeoutRuleConfig};
use crate::error::GuardError;

struct TimeoutRule {
    pattern: Regex,
    timeout: Duration,
}

/// Chooses the statement deadline: first matching rule wins, in config
/// order; the default applies when nothing matches.
pub struct TimeoutResolver {
    rules: Vec<TimeoutRule>,
    default: Duration,
}

impl TimeoutResolver {
    pub fn from_config(query: &QueryConfig) -> Result<Self, GuardError> {
        let rules = query
            .timeout_rules
            .iter()
            .map(|rule| compile_rule(rule))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules,
            default: Duration::from_secs(query.default_timeout_seconds),
        })
    }

    pub fn resolve(&self, sql: &str) -> Duration {
        for rule in &self.rules {
            if rule.pattern.is_match(sql) {
                return rule.timeout;
            }
        }
        self.default
    }
}

fn compile_rule(rule: &TimeoutRuleConfig) -> Result<TimeoutRule, GuardError> {
    let pattern = Regex::new(&rule.pattern).map_err(|e| {
        GuardError::Config(format!("invalid timeout rule pattern {:?}: {e}", rule.pattern))
    })?;
    Ok(TimeoutRule {
        pattern,
        timeout: Duration::from_secs(rule.timeout_seconds),
    })
}
