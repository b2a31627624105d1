use std::error::Error as _;

use tera::{Context, Tera};

use crate::config::TemplateConfig;
use crate::error::Result;
use super::Param;

pub const PARAM_TEMPLATE: &str = "param";
pub const BOOKMARK_TEMPLATE: &str = "bookmark";
pub const REMARK_TEMPLATE: &str = "remark";

/// Compiled render templates, one per statement kind plus the fragments
/// shared by the document assembler.
pub struct TemplateSet {
    tera: Tera,
}

impl TemplateSet {
    pub fn new(config: &TemplateConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(vec![
            ("message", config.message.as_str()),
            ("invoke", config.invoke.as_str()),
            ("method_return", config.method_return.as_str()),
            ("create", config.create.as_str()),
            ("delete", config.delete.as_str()),
            ("state_change", config.state_change.as_str()),
            ("start_timer", config.start_timer.as_str()),
            ("stop_timer", config.stop_timer.as_str()),
            ("expired_timer", config.expired_timer.as_str()),
            ("allocate", config.allocate.as_str()),
            ("free", config.free.as_str()),
            ("begin_action", config.begin_action.as_str()),
            ("end_action", config.end_action.as_str()),
            ("action", config.action.as_str()),
            (PARAM_TEMPLATE, config.param.as_str()),
            (BOOKMARK_TEMPLATE, config.bookmark.as_str()),
            (REMARK_TEMPLATE, config.remark.as_str()),
        ])?;

        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(name, context)
    }

    /// Format a parameter list as `(a,b,...)`; an empty list yields an empty fragment
    pub fn render_params(&self, params: &[Param]) -> tera::Result<String> {
        if params.is_empty() {
            return Ok(String::new());
        }

        let mut pairs = Vec::with_capacity(params.len());
        for param in params {
            let mut context = Context::new();
            context.insert("attribute", &param.attribute);
            context.insert("value", &param.value);
            pairs.push(self.render(PARAM_TEMPLATE, &context)?);
        }

        Ok(format!("({})", pairs.join(",")))
    }

    pub fn render_bookmark(&self, bookmark: &str) -> tera::Result<String> {
        let mut context = Context::new();
        context.insert("bookmark", bookmark);
        self.render(BOOKMARK_TEMPLATE, &context)
    }

    pub fn render_remark(&self, remark: &super::Remark) -> tera::Result<String> {
        self.render(REMARK_TEMPLATE, &Context::from_serialize(remark)?)
    }
}

/// Flatten a tera error and its causes into one line
pub fn describe_error(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Remark;

    #[test]
    fn test_params_are_joined_in_order() {
        let templates = TemplateSet::new(&TemplateConfig::default()).unwrap();
        let params = vec![
            Param { attribute: "a".to_string(), value: "1".to_string() },
            Param { attribute: "b".to_string(), value: "two".to_string() },
        ];
        assert_eq!(
            templates.render_params(&params).unwrap(),
            r#"("a" = "1","b" = "two")"#
        );
        assert_eq!(templates.render_params(&[]).unwrap(), "");
    }

    #[test]
    fn test_remark_and_bookmark() {
        let templates = TemplateSet::new(&TemplateConfig::default()).unwrap();
        let remark = Remark {
            time: "10".to_string(),
            file: "srv.c:1".to_string(),
            generator: "Server".to_string(),
        };
        assert_eq!(templates.render_remark(&remark).unwrap(), "(* 10 srv.c:1 *)");
        assert_eq!(templates.render_bookmark("Hello").unwrap(), r#"heading "Hello""#);
    }

    #[test]
    fn test_quotes_are_not_escaped() {
        let templates = TemplateSet::new(&TemplateConfig::default()).unwrap();
        let mut context = Context::new();
        context.insert("object", "Server");
        context.insert("state", "Idle");
        assert_eq!(
            templates.render("state_change", &context).unwrap(),
            r#"Server state = "Idle""#
        );
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let mut config = TemplateConfig::default();
        config.message = "{{ message".to_string();
        assert!(TemplateSet::new(&config).is_err());
    }

    #[test]
    fn test_describe_error_includes_cause() {
        let templates = TemplateSet::new(&TemplateConfig::default()).unwrap();
        let error = templates.render("delete", &Context::new()).unwrap_err();
        let message = describe_error(&error);
        assert!(message.contains("delete"));
        assert!(message.contains("not found in context"));
    }
}
