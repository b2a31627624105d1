use indexmap::IndexMap;
use serde::Serialize;

use super::{Classification, TemplateSet};

/// Closed set of statement kinds a trace line can be compiled into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    MessageSend,
    MessageReceive,
    Invoke,
    Return,
    Create,
    Delete,
    StateChange,
    StartTimer,
    StopTimer,
    ExpiredTimer,
    Allocate,
    Free,
    BeginAction,
    EndAction,
    GenericAction,
}

impl StatementKind {
    /// Name of the template used to render statements of this kind
    pub fn template_name(self) -> &'static str {
        match self {
            Self::MessageSend | Self::MessageReceive => "message",
            Self::Invoke => "invoke",
            Self::Return => "method_return",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::StateChange => "state_change",
            Self::StartTimer => "start_timer",
            Self::StopTimer => "stop_timer",
            Self::ExpiredTimer => "expired_timer",
            Self::Allocate => "allocate",
            Self::Free => "free",
            Self::BeginAction => "begin_action",
            Self::EndAction => "end_action",
            Self::GenericAction => "action",
        }
    }

    /// Attributes naming entities, with the classification each reference implies
    pub fn entities(self) -> &'static [(&'static str, Classification)] {
        use Classification::{Any, DynamicCreated, DynamicDeleted};

        match self {
            Self::MessageSend | Self::MessageReceive => &[("source", Any), ("destination", Any)],
            Self::Invoke => &[("caller", Any), ("called", Any)],
            Self::Return => &[("called", Any)],
            Self::Create => &[("creator", Any), ("created", DynamicCreated)],
            Self::Delete => &[("deletor", Any), ("deleted", DynamicDeleted)],
            Self::GenericAction => &[("actor", Any)],
            Self::StateChange
            | Self::StartTimer
            | Self::StopTimer
            | Self::ExpiredTimer
            | Self::Allocate
            | Self::Free
            | Self::BeginAction
            | Self::EndAction => &[("object", Any)],
        }
    }

    /// Attribute compared against the bookmark set
    pub fn bookmark_key(self) -> Option<&'static str> {
        match self {
            Self::MessageSend | Self::MessageReceive => Some("message"),
            Self::Invoke => Some("method"),
            Self::StartTimer | Self::StopTimer | Self::ExpiredTimer => Some("timer"),
            Self::GenericAction | Self::BeginAction | Self::EndAction => Some("action"),
            Self::StateChange => Some("state"),
            Self::Allocate | Self::Free => Some("resource"),
            Self::Return | Self::Create | Self::Delete => None,
        }
    }
}

/// One attribute/value pair parsed out of a trace parameter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub attribute: String,
    pub value: String,
}

/// Source location of the trace line a statement came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Remark {
    pub time: String,
    pub file: String,
    pub generator: String,
}

/// A compiled trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    kind: StatementKind,
    attributes: IndexMap<String, String>,
    /// `None` when the body pattern has no `params` group
    params: Option<Vec<Param>>,
    remark: Option<Remark>,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            params: None,
            remark: None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Set an attribute only if the constructor did not already provide it
    pub fn set_default_attribute(&mut self, key: &str, value: &str) {
        if !self.attributes.contains_key(key) {
            self.attributes.insert(key.to_string(), value.to_string());
        }
    }

    #[cfg(test)]
    pub fn params(&self) -> Option<&[Param]> {
        self.params.as_deref()
    }

    pub fn set_params(&mut self, params: Vec<Param>) {
        self.params = Some(params);
    }

    pub fn remark(&self) -> Option<&Remark> {
        self.remark.as_ref()
    }

    pub fn attach_remark(&mut self, remark: Remark) {
        self.remark = Some(remark);
    }

    /// Entity names referenced by this statement with their classification hints.
    /// Declared keys that are absent or empty are skipped.
    pub fn entity_references(&self) -> impl Iterator<Item = (&str, Classification)> + '_ {
        self.kind
            .entities()
            .iter()
            .filter_map(|(key, hint)| self.attribute(key).map(|name| (name, *hint)))
            .filter(|(name, _)| !name.is_empty())
    }

    /// Value of the bookmark attribute, if this kind has one and it was captured
    pub fn bookmark_value(&self) -> Option<&str> {
        self.kind
            .bookmark_key()
            .and_then(|key| self.attribute(key))
            .filter(|value| !value.is_empty())
    }

    /// Render the statement body text through its kind's template
    pub fn render(&self, templates: &TemplateSet) -> tera::Result<String> {
        let mut context = tera::Context::new();
        for (key, value) in &self.attributes {
            context.insert(key.as_str(), value);
        }
        if let Some(params) = &self.params {
            context.insert("params", &templates.render_params(params)?);
        }
        templates.render(self.kind.template_name(), &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;

    fn templates() -> TemplateSet {
        TemplateSet::new(&TemplateConfig::default()).unwrap()
    }

    #[test]
    fn test_message_render_with_params() {
        let mut statement = Statement::new(StatementKind::MessageReceive);
        statement.set_attribute("message", "Hello");
        statement.set_attribute("source", "Client");
        statement.set_attribute("destination", "Server");
        statement.set_params(vec![Param {
            attribute: "id".to_string(),
            value: "7".to_string(),
        }]);

        let text = statement.render(&templates()).unwrap();
        assert_eq!(text, r#"Hello("id" = "7"): Client -> Server"#);
    }

    #[test]
    fn test_empty_params_render_empty_fragment() {
        let mut statement = Statement::new(StatementKind::Invoke);
        statement.set_attribute("caller", "System");
        statement.set_attribute("called", "Server");
        statement.set_attribute("method", "handle");
        statement.set_params(Vec::new());

        let text = statement.render(&templates()).unwrap();
        assert_eq!(text, "System invokes Server.handle");
    }

    #[test]
    fn test_missing_attribute_fails_render() {
        let mut statement = Statement::new(StatementKind::Delete);
        statement.set_attribute("deleted", "Session");

        assert!(statement.render(&templates()).is_err());
    }

    #[test]
    fn test_entity_references_skip_absent_keys() {
        let mut statement = Statement::new(StatementKind::Create);
        statement.set_attribute("created", "Session");

        let refs: Vec<_> = statement.entity_references().collect();
        assert_eq!(refs, vec![("Session", Classification::DynamicCreated)]);

        statement.set_attribute("creator", "");
        assert_eq!(statement.entity_references().count(), 1);
    }

    #[test]
    fn test_bookmark_value() {
        let mut statement = Statement::new(StatementKind::StateChange);
        assert_eq!(statement.bookmark_value(), None);
        statement.set_attribute("state", "Connected");
        assert_eq!(statement.bookmark_value(), Some("Connected"));

        let mut create = Statement::new(StatementKind::Create);
        create.set_attribute("created", "Session");
        assert_eq!(create.bookmark_value(), None);
    }

    #[test]
    fn test_default_attribute_does_not_override() {
        let mut statement = Statement::new(StatementKind::GenericAction);
        statement.set_attribute("time", "10");
        statement.set_default_attribute("time", "99");
        statement.set_default_attribute("file", "srv.c:1");
        assert_eq!(statement.attribute("time"), Some("10"));
        assert_eq!(statement.attribute("file"), Some("srv.c:1"));
    }
}
