use regex::Regex;

use crate::config::Config;
use super::{ExtractionRules, TemplateSet};

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks that a configuration can drive the compiler before any trace is read
pub struct ConfigValidator<'a> {
    config: &'a Config,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match Regex::new(&self.config.trace.line_regex) {
            Ok(regex) => {
                let names: Vec<&str> = regex.capture_names().flatten().collect();
                for required in ["category", "body"] {
                    if !names.contains(&required) {
                        result.errors.push(format!("Line regex has no '{}' group", required));
                    }
                }
                for optional in ["time", "file", "generator"] {
                    if !names.contains(&optional) {
                        result.warnings.push(format!(
                            "Line regex has no '{}' group; it will be empty in remarks",
                            optional
                        ));
                    }
                }
            }
            Err(e) => result.errors.push(format!("Invalid line regex: {}", e)),
        }

        match ExtractionRules::new(&self.config.trace, &self.config.patterns, &self.config.format) {
            Ok(rules) => {
                for name in rules.unresolved_handlers() {
                    result.errors.push(format!("Unknown handler '{}'", name));
                }
            }
            Err(e) => result.errors.push(e.to_string()),
        }

        if let Err(e) = TemplateSet::new(&self.config.templates) {
            result.errors.push(e.to_string());
        }

        if self.config.format.attribute_value_separator.is_empty() {
            result.warnings.push("Empty attribute/value separator disables parameter parsing".to_string());
        }

        for bookmark in &self.config.format.bookmarks {
            if bookmark.trim().is_empty() {
                result.warnings.push("Blank bookmark entry never matches".to_string());
            }
        }

        result
    }
}
