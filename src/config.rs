use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{TraceflowError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line-level decomposition and category dispatch
    pub trace: TraceConfig,

    /// Body regexes used by the statement constructors
    pub patterns: PatternConfig,

    /// Render templates for every statement kind
    pub templates: TemplateConfig,

    /// Document layout settings
    pub format: FormatConfig,

    /// Entity grouping
    pub entities: EntityConfig,

    /// Output file locations
    pub output: OutputConfig,

    /// External diagram renderer
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Regex splitting a raw line into time, generator, file, category and body
    pub line_regex: String,

    /// Entity used as the caller when no invocation is open
    pub traced_entity: String,

    /// Handler used for categories missing from the mapping
    pub default_handler: String,

    /// Marker separating an object from its method in invoke bodies
    pub scope_marker: String,

    /// Category keyword to handler name
    pub mapping: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub message_receive: String,
    pub message_send: String,
    pub method_invoke: String,
    pub function_invoke: String,
    pub method_return: String,
    pub create: String,
    pub delete: String,
    pub timer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub message: String,
    pub invoke: String,
    pub method_return: String,
    pub create: String,
    pub delete: String,
    pub state_change: String,
    pub start_timer: String,
    pub stop_timer: String,
    pub expired_timer: String,
    pub allocate: String,
    pub free: String,
    pub begin_action: String,
    pub end_action: String,
    pub action: String,

    /// Single attribute/value pair inside a parameter list
    pub param: String,

    /// Heading emitted before bookmarked statements
    pub bookmark: String,

    /// Annotation placed under every statement
    pub remark: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Indentation unit for statements inside the feature block
    pub indent: String,

    /// Separator between an attribute and its value in trace parameters
    pub attribute_value_separator: String,

    /// Separator between attribute/value pairs in trace parameters
    pub pair_separator: String,

    /// Attribute values that get a bookmark heading
    pub bookmarks: BTreeSet<String>,

    /// Optional theme include (without the .FDL suffix)
    pub theme: Option<String>,

    /// Title of the generated feature block
    pub feature_title: String,

    /// Group used for entities missing from the parent table
    pub default_group: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Entity name to owning group, in declaration order
    pub parents: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default path of the generated document
    pub document: PathBuf,

    /// Scenario project consumed by the renderer
    pub project_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Whether `generate` launches the renderer after writing the document
    pub enabled: bool,

    /// Explicit path of the renderer executable
    pub executable: Option<PathBuf>,

    /// Editor extensions directory searched when no executable is configured
    pub extensions_dir: Option<PathBuf>,

    /// Arguments passed to the renderer
    pub args: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        let mapping = [
            ("received", "MessageReceive"),
            ("sent", "MessageSend"),
            ("called", "Invoke"),
            ("returned", "Return"),
            ("state", "StateChange"),
            ("created", "Create"),
            ("deleted", "Delete"),
            ("begun", "BeginAction"),
            ("ended", "EndAction"),
            ("started", "StartTimer"),
            ("stopped", "StopTimer"),
            ("expired", "ExpiredTimer"),
            ("allocated", "Allocate"),
            ("freed", "Free"),
        ]
        .into_iter()
        .map(|(category, handler)| (category.to_string(), handler.to_string()))
        .collect();

        Self {
            line_regex: r"^\[(?P<time>[^\]]*)\]\[(?P<generator>[^\]]*)\]\[(?P<file>[^\]]*)\]\s*(?P<category>\w+)\s*(?P<body>.*)$".to_string(),
            traced_entity: "System".to_string(),
            default_handler: "Action".to_string(),
            scope_marker: "::".to_string(),
            mapping,
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            message_receive: r"^(?P<message>\w+)\s*(?:\((?P<params>[^)]*)\))?\s+from\s+(?P<source>\w+)".to_string(),
            message_send: r"^(?P<message>\w+)\s*(?:\((?P<params>[^)]*)\))?\s+to\s+(?P<destination>\w+)".to_string(),
            method_invoke: r"^(?P<called>\w+)::(?P<method>\w+)\s*\((?P<params>[^)]*)\)".to_string(),
            function_invoke: r"^(?P<method>\w+)\s*\((?P<params>[^)]*)\)".to_string(),
            method_return: r"^from\s+(?:(?P<called>\w+)::)?(?P<method>\w+)".to_string(),
            create: r"^(?P<created>\w+)\s*(?:\((?P<params>[^)]*)\))?".to_string(),
            delete: r"^(?P<deleted>\w+)".to_string(),
            timer: r"^(?P<timer>\w+)".to_string(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            message: "{{ message }}{{ params }}: {{ source }} -> {{ destination }}".to_string(),
            invoke: "{{ caller }} invokes {{ called }}.{{ method }}{{ params }}".to_string(),
            method_return: "{{ called }}.{{ method }} returns".to_string(),
            create: "{{ creator }} creates {{ created }}{{ params }}".to_string(),
            delete: "{{ deletor }} deletes {{ deleted }}".to_string(),
            state_change: "{{ object }} state = \"{{ state }}\"".to_string(),
            start_timer: "{{ object }} starts {{ timer }}".to_string(),
            stop_timer: "{{ object }} stops {{ timer }}".to_string(),
            expired_timer: "timeout {{ timer }}".to_string(),
            allocate: "{{ object }} allocates \"{{ resource }}\"".to_string(),
            free: "{{ object }} frees \"{{ resource }}\"".to_string(),
            begin_action: "{{ object }} begins action \"{{ action }}\"".to_string(),
            end_action: "{{ object }} ends action \"{{ action }}\"".to_string(),
            action: "{{ actor }} takes action \"{{ action }}\"".to_string(),
            param: "\"{{ attribute }}\" = \"{{ value }}\"".to_string(),
            bookmark: "heading \"{{ bookmark }}\"".to_string(),
            remark: "(* {{ time }} {{ file }} *)".to_string(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: " ".repeat(4),
            attribute_value_separator: "=".to_string(),
            pair_separator: ",".to_string(),
            bookmarks: BTreeSet::new(),
            theme: None,
            feature_title: "generated flow".to_string(),
            default_group: "Component".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            document: PathBuf::from("trace.fdl"),
            project_file: PathBuf::from("project.scn.json"),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: None,
            extensions_dir: None,
            args: vec!["build".to_string(), "project.scn.json".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TraceflowError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TraceflowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(TraceflowError::Config(format!(
                        "Configuration file {} does not exist",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                for candidate in CONFIG_CANDIDATES {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

/// Configuration files probed in the working directory
pub const CONFIG_CANDIDATES: [&str; 3] = ["Traceflow.toml", "traceflow.toml", ".traceflow.toml"];
