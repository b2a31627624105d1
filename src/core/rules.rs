use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::config::{FormatConfig, PatternConfig, TraceConfig};
use crate::error::Result;
use super::{CallStack, Param, Statement, StatementKind};

/// Line-level fields handed to a statement constructor
#[derive(Debug, Clone, Copy)]
pub struct TraceContext<'a> {
    pub category: &'a str,
    pub generator: &'a str,
    pub body: &'a str,
}

/// Builds a statement from one trace line, or `None` when the body does not match
pub type Constructor = fn(&TraceContext<'_>, &BodyPatterns, &mut CallStack) -> Option<Statement>;

/// Compiled body regexes and parameter separators
pub struct BodyPatterns {
    message_receive: Regex,
    message_send: Regex,
    method_invoke: Regex,
    function_invoke: Regex,
    method_return: Regex,
    create: Regex,
    delete: Regex,
    timer: Regex,
    scope_marker: String,
    attribute_value_separator: String,
    pair_separator: String,
}

impl BodyPatterns {
    pub fn new(patterns: &PatternConfig, trace: &TraceConfig, format: &FormatConfig) -> Result<Self> {
        Ok(Self {
            message_receive: Regex::new(&patterns.message_receive)?,
            message_send: Regex::new(&patterns.message_send)?,
            method_invoke: Regex::new(&patterns.method_invoke)?,
            function_invoke: Regex::new(&patterns.function_invoke)?,
            method_return: Regex::new(&patterns.method_return)?,
            create: Regex::new(&patterns.create)?,
            delete: Regex::new(&patterns.delete)?,
            timer: Regex::new(&patterns.timer)?,
            scope_marker: trace.scope_marker.clone(),
            attribute_value_separator: format.attribute_value_separator.clone(),
            pair_separator: format.pair_separator.clone(),
        })
    }

    /// Match `body` and copy every named group into a new statement.
    /// Groups that did not participate in the match are stored as empty strings.
    fn capture(&self, regex: &Regex, body: &str, kind: StatementKind) -> Option<Statement> {
        let caps = regex.captures(body)?;
        let mut statement = Statement::new(kind);

        for name in regex.capture_names().flatten() {
            let value = caps.name(name).map_or("", |m| m.as_str());
            if name == "params" {
                statement.set_params(self.parse_params(value));
            } else {
                statement.set_attribute(name, value);
            }
        }

        Some(statement)
    }

    /// Split a raw `a=1, b=2` parameter string into ordered pairs
    pub fn parse_params(&self, raw: &str) -> Vec<Param> {
        if self.attribute_value_separator.is_empty() || !raw.contains(&self.attribute_value_separator) {
            return Vec::new();
        }

        raw.split(self.pair_separator.as_str())
            .filter_map(|item| item.split_once(self.attribute_value_separator.as_str()))
            .map(|(attribute, value)| Param {
                attribute: attribute.trim().to_string(),
                value: value.trim().to_string(),
            })
            .collect()
    }
}

pub fn message_receive(ctx: &TraceContext<'_>, patterns: &BodyPatterns, _stack: &mut CallStack) -> Option<Statement> {
    let mut statement = patterns.capture(&patterns.message_receive, ctx.body, StatementKind::MessageReceive)?;
    statement.set_attribute("destination", ctx.generator);
    Some(statement)
}

pub fn message_send(ctx: &TraceContext<'_>, patterns: &BodyPatterns, _stack: &mut CallStack) -> Option<Statement> {
    let mut statement = patterns.capture(&patterns.message_send, ctx.body, StatementKind::MessageSend)?;
    statement.set_attribute("source", ctx.generator);
    Some(statement)
}

/// Method call (`Object::method(...)`) or bare function call; pushes the new frame
pub fn invoke(ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    // Only the callee prefix decides; parameter values may contain the marker
    let callee = ctx.body.split('(').next().unwrap_or_default();
    let is_method = !patterns.scope_marker.is_empty() && callee.contains(&patterns.scope_marker);

    let mut statement = if is_method {
        patterns.capture(&patterns.method_invoke, ctx.body, StatementKind::Invoke)?
    } else {
        let mut statement = patterns.capture(&patterns.function_invoke, ctx.body, StatementKind::Invoke)?;
        // A bare function is its own entity
        if let Some(method) = statement.attribute("method").map(str::to_string) {
            statement.set_attribute("called", method);
        }
        statement
    };

    statement.set_attribute("caller", stack.current_caller());
    stack.push(statement.clone());
    Some(statement)
}

/// Closes the most recent invocation even when the body does not match
pub fn method_return(ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    let frame = stack.pop()?;
    let mut statement = patterns.capture(&patterns.method_return, ctx.body, StatementKind::Return)?;

    for key in ["caller", "called", "method"] {
        let missing = statement.attribute(key).map_or(true, str::is_empty);
        if missing {
            if let Some(value) = frame.attribute(key) {
                statement.set_attribute(key, value);
            }
        }
    }

    Some(statement)
}

pub fn create(ctx: &TraceContext<'_>, patterns: &BodyPatterns, _stack: &mut CallStack) -> Option<Statement> {
    let mut statement = patterns.capture(&patterns.create, ctx.body, StatementKind::Create)?;
    statement.set_attribute("creator", ctx.generator);
    Some(statement)
}

pub fn delete(ctx: &TraceContext<'_>, patterns: &BodyPatterns, _stack: &mut CallStack) -> Option<Statement> {
    let mut statement = patterns.capture(&patterns.delete, ctx.body, StatementKind::Delete)?;
    statement.set_attribute("deletor", ctx.generator);
    Some(statement)
}

fn timer(kind: StatementKind, ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &CallStack) -> Option<Statement> {
    let caps = patterns.timer.captures(ctx.body)?;
    let name = caps
        .name("timer")
        .map_or_else(|| ctx.body.trim(), |m| m.as_str());

    let mut statement = Statement::new(kind);
    statement.set_attribute("object", stack.current_caller());
    statement.set_attribute("timer", name);
    Some(statement)
}

pub fn start_timer(ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    timer(StatementKind::StartTimer, ctx, patterns, stack)
}

pub fn stop_timer(ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    timer(StatementKind::StopTimer, ctx, patterns, stack)
}

pub fn expired_timer(ctx: &TraceContext<'_>, patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    timer(StatementKind::ExpiredTimer, ctx, patterns, stack)
}

fn object_statement(kind: StatementKind, key: &str, ctx: &TraceContext<'_>, stack: &CallStack) -> Statement {
    let mut statement = Statement::new(kind);
    statement.set_attribute("object", stack.current_caller());
    statement.set_attribute(key, ctx.body.trim());
    statement
}

pub fn state_change(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    Some(object_statement(StatementKind::StateChange, "state", ctx, stack))
}

pub fn allocate(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    Some(object_statement(StatementKind::Allocate, "resource", ctx, stack))
}

pub fn free(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    Some(object_statement(StatementKind::Free, "resource", ctx, stack))
}

pub fn begin_action(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    Some(object_statement(StatementKind::BeginAction, "action", ctx, stack))
}

pub fn end_action(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    Some(object_statement(StatementKind::EndAction, "action", ctx, stack))
}

pub fn generic_action(ctx: &TraceContext<'_>, _patterns: &BodyPatterns, stack: &mut CallStack) -> Option<Statement> {
    let mut statement = Statement::new(StatementKind::GenericAction);
    statement.set_attribute("actor", stack.current_caller());
    statement.set_attribute("action_type", ctx.category);
    statement.set_attribute("action", ctx.body.trim());
    Some(statement)
}

/// Handlers available to the category mapping, by name
pub fn builtin_handlers() -> HashMap<String, Constructor> {
    let handlers: [(&str, Constructor); 15] = [
        ("MessageReceive", message_receive),
        ("MessageSend", message_send),
        ("Invoke", invoke),
        ("Return", method_return),
        ("Create", create),
        ("Delete", delete),
        ("StateChange", state_change),
        ("StartTimer", start_timer),
        ("StopTimer", stop_timer),
        ("ExpiredTimer", expired_timer),
        ("Allocate", allocate),
        ("Free", free),
        ("BeginAction", begin_action),
        ("EndAction", end_action),
        ("Action", generic_action),
    ];

    handlers
        .into_iter()
        .map(|(name, constructor)| (name.to_string(), constructor))
        .collect()
}

/// Maps trace categories to statement constructors
pub struct ExtractionRules {
    patterns: BodyPatterns,
    handlers: HashMap<String, Constructor>,
    mapping: IndexMap<String, String>,
    default_handler: String,
}

impl ExtractionRules {
    pub fn new(trace: &TraceConfig, patterns: &PatternConfig, format: &FormatConfig) -> Result<Self> {
        Ok(Self {
            patterns: BodyPatterns::new(patterns, trace, format)?,
            handlers: builtin_handlers(),
            mapping: trace.mapping.clone(),
            default_handler: trace.default_handler.clone(),
        })
    }

    /// Add or replace a named handler
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) {
        self.handlers.insert(name.into(), constructor);
    }

    /// Resolve the constructor for a category. Unknown categories and
    /// unregistered handler names fall back to the default handler.
    pub fn handler_for(&self, category: &str) -> Constructor {
        self.mapping
            .get(category)
            .and_then(|name| self.handlers.get(name))
            .or_else(|| self.handlers.get(&self.default_handler))
            .copied()
            .unwrap_or(generic_action)
    }

    pub fn construct(&self, ctx: &TraceContext<'_>, stack: &mut CallStack) -> Option<Statement> {
        let constructor = self.handler_for(ctx.category);
        let statement = constructor(ctx, &self.patterns, stack);
        if statement.is_none() {
            debug!("Body of '{}' trace did not match: {}", ctx.category, ctx.body);
        }
        statement
    }

    /// Handler names referenced by the configuration that are not registered
    pub fn unresolved_handlers(&self) -> Vec<String> {
        let mut unresolved: Vec<String> = self
            .mapping
            .values()
            .chain(std::iter::once(&self.default_handler))
            .filter(|name| !self.handlers.contains_key(*name))
            .cloned()
            .collect();
        unresolved.sort();
        unresolved.dedup();
        unresolved
    }
}
