//! Assembles the sequence diagram document from a parsed trace.
//!
//! The document is produced in three phases, always in this order:
//! header (includes, component and entity declarations, feature block
//! opening), body (one rendered statement per trace statement with its
//! bookmark and remark) and footer.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::FormatConfig;
use crate::error::{TraceflowError, Result};
use super::templates::describe_error;
use super::{ParsedTrace, Statement, TemplateSet};

pub struct Document<'a> {
    trace: &'a ParsedTrace,
    templates: &'a TemplateSet,
    format: &'a FormatConfig,
    parents: &'a IndexMap<String, String>,
}

impl<'a> Document<'a> {
    pub fn new(
        trace: &'a ParsedTrace,
        templates: &'a TemplateSet,
        format: &'a FormatConfig,
        parents: &'a IndexMap<String, String>,
    ) -> Self {
        Self {
            trace,
            templates,
            format,
            parents,
        }
    }

    /// Generate the entire document: header, body and footer
    pub fn generate(&self) -> Result<String> {
        let mut content = self.generate_header();
        content.push_str(&self.generate_body()?);
        content.push_str(&self.generate_footer());

        debug!(
            "Assembled document with {} entities and {} statements",
            self.trace.registry.len(),
            self.trace.statements.len()
        );
        Ok(content)
    }

    fn generate_style_and_theme(&self) -> String {
        let mut content = String::new();
        if let Some(theme) = &self.format.theme {
            content.push_str(&format!("#include <{}.FDL>\n", theme));
        }
        content.push_str("#include <stdinc.FDL>\n\n");
        content
    }

    fn declare_entity(&self, entity: &str) -> String {
        if self.parents.is_empty() {
            return entity.to_string();
        }
        let parent = self
            .parents
            .get(entity)
            .unwrap_or(&self.format.default_group);
        format!("\"{}\" in \"{}\"", entity, parent)
    }

    fn generate_declaration(&self, dynamic: bool, entities: &[&str]) -> String {
        let decl_type = if dynamic { "dynamic" } else { "eternal" };
        let declared: Vec<String> = entities.iter().map(|e| self.declare_entity(e)).collect();
        format!("{}: {}\n", decl_type, declared.join(", "))
    }

    fn generate_header(&self) -> String {
        let mut header = self.generate_style_and_theme();

        if !self.parents.is_empty() {
            let mut seen = BTreeSet::new();
            let groups: Vec<String> = self
                .parents
                .values()
                .filter(|group| seen.insert(group.as_str()))
                .map(|group| format!("\"{}\"", group))
                .collect();
            header.push_str(&format!("component: {}\n", groups.join(", ")));

            if self.trace.using_default_group {
                header.push_str(&format!("component: \"{}\"\n", self.format.default_group));
            }
        }

        // One declaration per run of same-class entities
        for (dynamic, entities) in self.trace.registry.declaration_runs() {
            header.push_str(&self.generate_declaration(dynamic, &entities));
        }

        match &self.format.theme {
            Some(_) => header.push_str(&format!(
                "\n{{MyTheme}} feature \"{}\" {{\n",
                self.format.feature_title
            )),
            None => header.push_str(&format!("\nfeature \"{}\" {{\n", self.format.feature_title)),
        }

        // Deleted entities that were never created existed before tracing began
        for entity in self.trace.registry.orphan_deletes() {
            header.push_str(&format!("{}create {}\n", self.format.indent, entity));
        }

        header
    }

    fn generate_bookmark(&self, statement: &Statement) -> tera::Result<Option<String>> {
        match statement.bookmark_value() {
            Some(value) if self.format.bookmarks.contains(value) => {
                let heading = self.templates.render_bookmark(value)?;
                Ok(Some(format!("{}{}\n", self.format.indent, heading)))
            }
            _ => Ok(None),
        }
    }

    fn generate_statement(&self, statement: &Statement) -> tera::Result<String> {
        let mut text = String::new();
        if let Some(bookmark) = self.generate_bookmark(statement)? {
            text.push_str(&bookmark);
        }

        text.push_str(&self.format.indent);
        text.push_str(&statement.render(self.templates)?);
        text.push('\n');

        if let Some(remark) = statement.remark() {
            text.push_str(&self.format.indent);
            text.push_str(&self.templates.render_remark(remark)?);
            text.push('\n');
        }
        text.push('\n');
        Ok(text)
    }

    fn generate_body(&self) -> Result<String> {
        let mut body = String::new();
        for (index, statement) in self.trace.statements.iter().enumerate() {
            let text = self.generate_statement(statement).map_err(|e| {
                TraceflowError::StatementRender {
                    index,
                    template: statement.kind().template_name().to_string(),
                    detail: describe_error(&e),
                }
            })?;
            body.push_str(&text);
        }
        Ok(body)
    }

    fn generate_footer(&self) -> String {
        "}\n".to_string()
    }
}
