use regex::Regex;

use crate::config::PromptRuleConfig;
use crate::error::GuardError;

struct PromptRule {
    pattern: Regex,
    message: String,
}

/// Maps backend error text to guidance for the agent. Every matching rule
/// contributes its message, joined by newlines in config order.
pub struct PromptMatcher {
    rules: Vec<PromptRule>,
}

impl PromptMatcher {
    pub fn from_config(rules: &[PromptRuleConfig]) -> Result<Self, GuardError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    GuardError::Config(format!(
                        "invalid error prompt pattern {:?}: {e}",
                        rule.pattern
                    ))
                })?;
                Ok(PromptRule {
                    pattern,
                    message: rule.message.clone(),
                })
            })
            .collect::<Result<Vec<_>, GuardError>>()?;
        Ok(Self { rules })
    }

    /// Empty string when nothing matches.
    pub fn guidance(&self, error_text: &str) -> String {
        let messages: Vec<&str> = self
            .rules
            .iter()
            .filter(|rule| rule.pattern.is_match(error_text))
            .map(|rule| rule.message.as_str())
            .collect();
        messages.join("\n")
    }
}
