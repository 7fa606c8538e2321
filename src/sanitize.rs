use regex::Regex;
use serde_json::Value;

use crate::config::SanitizeRuleConfig;
use crate::error::GuardError;

struct SanitizeRule {
    pattern: Regex,
    replacement: String,
    description: String,
}

/// Ordered regex redaction over result rows. Only genuine text fields are
/// rewritten; numbers, booleans, and nulls flow through untouched, and
/// objects and arrays are recursed into.
pub struct Sanitizer {
    rules: Vec<SanitizeRule>,
}

impl Sanitizer {
    pub fn from_config(rules: &[SanitizeRuleConfig]) -> Result<Self, GuardError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    GuardError::Config(format!(
                        "invalid sanitization pattern {:?}: {e}",
                        rule.pattern
                    ))
                })?;
                Ok(SanitizeRule {
                    pattern,
                    replacement: rule.replacement.clone(),
                    description: rule.description.clone(),
                })
            })
            .collect::<Result<Vec<_>, GuardError>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn sanitize_rows(&self, rows: &mut [Value]) {
        if self.rules.is_empty() {
            return;
        }
        for row in rows {
            self.sanitize_value(row);
        }
    }

    fn sanitize_value(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                for rule in &self.rules {
                    // Rule k+1 sees the output of rule k. Replacement
                    // strings may use $1/${name} back-references.
                    if let std::borrow::Cow::Owned(rewritten) =
                        rule.pattern.replace_all(s, rule.replacement.as_str())
                    {
                        tracing::trace!(rule = %rule.description, "sanitization rule applied");
                        *s = rewritten;
                    }
                }
            }
            Value::Object(map) => {
                for v in map.values_mut() {
                    self.sanitize_value(v);
                }
            }
            Value::Array(items) => {
                for v in items {
                    self.sanitize_value(v);
                }
            }
            // Numbers keep arbitrary precision; bools and nulls have
            // nothing to redact.
            _ => {}
        }
    }
}
