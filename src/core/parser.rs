use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::error::{TraceflowError, Result};
use super::{CallStack, EntityRegistry, ExtractionRules, Remark, Statement, TraceContext};

/// Groups the line regex must define
const REQUIRED_LINE_GROUPS: [&str; 2] = ["category", "body"];

/// Everything the document assembler needs from a parsed trace
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub statements: Vec<Statement>,
    pub registry: EntityRegistry,
    /// Some referenced entity has no entry in the parent table
    pub using_default_group: bool,
}

/// Compiles trace lines into statements, one line at a time
pub struct TraceParser {
    line_regex: Regex,
    rules: ExtractionRules,
    call_stack: CallStack,
    parents: IndexMap<String, String>,
    trace: ParsedTrace,
    lines_seen: usize,
}

impl TraceParser {
    pub fn new(config: &Config) -> Result<Self> {
        let line_regex = Regex::new(&config.trace.line_regex)?;
        for group in REQUIRED_LINE_GROUPS {
            if !line_regex.capture_names().flatten().any(|name| name == group) {
                return Err(TraceflowError::Config(format!(
                    "Line regex must define a named group '{}'",
                    group
                )));
            }
        }

        let rules = ExtractionRules::new(&config.trace, &config.patterns, &config.format)?;

        Ok(Self::with_rules(line_regex, rules, config))
    }

    /// Build a parser around custom extraction rules
    pub fn with_rules(line_regex: Regex, rules: ExtractionRules, config: &Config) -> Self {
        Self {
            line_regex,
            rules,
            call_stack: CallStack::new(config.trace.traced_entity.clone()),
            parents: config.entities.parents.clone(),
            trace: ParsedTrace::default(),
            lines_seen: 0,
        }
    }

    /// Parse a single line. Lines that do not match are ignored.
    pub fn parse_line(&mut self, line: &str) {
        self.lines_seen += 1;

        let Some(caps) = self.line_regex.captures(line) else {
            debug!("Skipping line {}: no match", self.lines_seen);
            return;
        };
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        let ctx = TraceContext {
            category: field("category"),
            generator: field("generator"),
            body: field("body"),
        };

        if let Some(mut statement) = self.rules.construct(&ctx, &mut self.call_stack) {
            let remark = Remark {
                time: field("time").to_string(),
                file: field("file").to_string(),
                generator: ctx.generator.to_string(),
            };
            statement.set_default_attribute("time", &remark.time);
            statement.set_default_attribute("file", &remark.file);
            statement.set_default_attribute("generator", ctx.generator);
            statement.set_default_attribute("category", ctx.category);
            statement.attach_remark(remark);
            self.save_statement(statement);
        }
    }

    pub fn parse_lines<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for line in lines {
            self.parse_line(line);
        }
    }

    /// Store the statement and record every entity it references
    fn save_statement(&mut self, statement: Statement) {
        for (name, hint) in statement.entity_references() {
            self.trace.registry.register(name, hint);
            if !self.parents.is_empty() && !self.parents.contains_key(name) {
                self.trace.using_default_group = true;
            }
        }
        self.trace.statements.push(statement);
    }

    #[cfg(test)]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    #[cfg(test)]
    pub fn parsed(&self) -> &ParsedTrace {
        &self.trace
    }

    pub fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    pub fn finish(self) -> ParsedTrace {
        if self.call_stack.depth() > 0 {
            debug!("{} invocations still open at end of trace", self.call_stack.depth());
        }
        self.trace
    }
}
