// src/core/mod.rs
mod engine;
mod parser;
mod statement;
mod rules;
mod call_stack;
mod registry;
mod templates;
mod document;
mod renderer;
mod validator;

pub use statement::{Statement, StatementKind, Param, Remark};
pub use rules::{ExtractionRules, TraceContext};
pub use call_stack::CallStack;
pub use registry::{EntityRegistry, Classification};
pub use templates::TemplateSet;
pub use parser::{TraceParser, ParsedTrace};
pub use document::Document;
pub use renderer::{create_renderer, write_project_file};
pub use validator::ConfigValidator;

// Export the main engine
pub use engine::Engine;
