// src/core/engine.rs
use std::io::Read;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tracing::{info, warn, debug};

use crate::config::{Config, CONFIG_CANDIDATES};
use crate::error::TraceflowError;
use super::{
    create_renderer, write_project_file, ConfigValidator, Document, TemplateSet, TraceParser,
};

/// Main orchestration engine: trace in, sequence diagram description out
pub struct Engine {
    config: Config,
    templates: TemplateSet,
}

impl Engine {
    /// Create a new engine instance from the configuration file
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        debug!("Loaded configuration: {:?}", config);
        let templates = TemplateSet::new(&config.templates)?;
        Ok(Self { config, templates })
    }

    /// Compile trace text into the document text
    pub fn compile(&self, trace: &str) -> Result<String> {
        let mut parser = TraceParser::new(&self.config)?;
        parser.parse_lines(trace.lines());

        let lines_seen = parser.lines_seen();
        let parsed = parser.finish();
        info!(
            "Parsed {} lines into {} statements referencing {} entities",
            lines_seen,
            parsed.statements.len(),
            parsed.registry.len()
        );
        if parsed.registry.is_empty() {
            warn!("No entities found in the trace; check the line regex and category mapping");
        }

        let document = Document::new(
            &parsed,
            &self.templates,
            &self.config.format,
            &self.config.entities.parents,
        );
        Ok(document.generate()?)
    }

    /// Parse the trace, write the document and hand it to the renderer
    pub async fn generate(&self, input: Option<PathBuf>, output: Option<PathBuf>, no_render: bool) -> Result<()> {
        let trace = read_input(input.as_deref())?;
        let output = output.unwrap_or_else(|| self.config.output.document.clone());

        info!("📝 Generating {}", output.display());
        let document = self.compile(&trace)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output, document)?;

        let project_file = self.project_file_for(&output);
        write_project_file(&project_file, &output)?;

        if no_render || !self.config.renderer.enabled {
            debug!("Rendering disabled");
            return Ok(());
        }

        self.render_project(&project_file).await
    }

    /// Invoke the renderer on the configured project file
    pub async fn render(&self) -> Result<()> {
        let project_file = self.project_file_for(&self.config.output.document);
        if !project_file.exists() {
            return Err(TraceflowError::Renderer(format!(
                "Project file {} not found; run generate first",
                project_file.display()
            ))
            .into());
        }
        self.render_project(&project_file).await
    }

    async fn render_project(&self, project_file: &Path) -> Result<()> {
        let renderer = create_renderer(&self.config.renderer)?;
        let working_dir = project_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        info!("🖼️ Rendering with {}", renderer.renderer_name());
        renderer.render(working_dir).await?;
        Ok(())
    }

    /// The project file lives next to the document unless configured absolute
    fn project_file_for(&self, document: &Path) -> PathBuf {
        let project_file = &self.config.output.project_file;
        if project_file.is_absolute() {
            return project_file.clone();
        }
        match document.parent() {
            Some(dir) => dir.join(project_file),
            None => project_file.clone(),
        }
    }

    /// Write the active configuration to a new config file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = match path {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let target = target_dir.join(CONFIG_CANDIDATES[0]);
        info!("Initializing Traceflow in: {}", target_dir.display());

        if target.exists() && !force {
            return Err(TraceflowError::Config(format!(
                "{} already exists (use --force to overwrite)",
                target.display()
            ))
            .into());
        }

        std::fs::create_dir_all(&target_dir)?;
        self.config.save(&target)?;
        info!("✅ Wrote {}", target.display());
        Ok(())
    }

    /// Validate regexes, templates and the handler table
    pub async fn check(&self, strict: bool) -> Result<()> {
        info!("✅ Validating configuration...");

        let result = ConfigValidator::new(&self.config).validate();
        for warning in &result.warnings {
            warn!("  - {}", warning);
        }

        if result.is_valid() && (!strict || result.warnings.is_empty()) {
            info!("✅ Configuration validation passed");
            return Ok(());
        }

        warn!("❌ Configuration validation failed:");
        for error in &result.errors {
            warn!("  - {}", error);
        }
        Err(TraceflowError::Validation(format!(
            "{} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        ))
        .into())
    }
}

/// Read the whole trace from a file, or from stdin when no path is given.
/// Invalid UTF-8 is replaced rather than rejected.
fn read_input(input: Option<&Path>) -> Result<String> {
    let bytes = match input {
        Some(path) => {
            info!("Reading trace from {}", path.display());
            std::fs::read(path)?
        }
        None => {
            info!("Reading trace from standard input");
            let mut bytes = Vec::new();
            std::io::stdin().read_to_end(&mut bytes)?;
            bytes
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
