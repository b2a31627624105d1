//! Launching the external sequence diagram renderer.
//!
//! The generated document is only a description; an external tool turns the
//! scenario project that references it into viewable diagrams.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::RendererConfig;
use crate::error::{TraceflowError, Result};

/// Extension directory prefix of the renderer when installed as an editor extension
const EXTENSION_PREFIX: &str = "eventhelix.eventstudio-";

#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render every scenario of the project found in `working_dir`
    async fn render(&self, working_dir: &Path) -> Result<()>;

    fn renderer_name(&self) -> &str;
}

/// Factory function to create the renderer described by the configuration
pub fn create_renderer(config: &RendererConfig) -> Result<Box<dyn DiagramRenderer>> {
    let executable = match &config.executable {
        Some(path) => path.clone(),
        None => {
            let extensions_dir = config
                .extensions_dir
                .clone()
                .or_else(default_extensions_dir)
                .ok_or_else(|| TraceflowError::Renderer(
                    "No renderer executable or extensions directory configured".to_string(),
                ))?;
            find_in_extensions(&extensions_dir)?.join(executable_name()?)
        }
    };

    Ok(Box::new(EventStudioRenderer {
        executable,
        args: config.args.clone(),
    }))
}

/// Renderer binary name on the current platform
fn executable_name() -> Result<&'static str> {
    match std::env::consts::OS {
        "windows" => Ok("evstudio.exe"),
        "macos" => Ok("evstudio"),
        other => Err(TraceflowError::UnsupportedPlatform(other.to_string())),
    }
}

fn default_extensions_dir() -> Option<PathBuf> {
    let home = std::env::var_os("USERPROFILE").or_else(|| std::env::var_os("HOME"))?;
    Some(PathBuf::from(home).join(".vscode").join("extensions"))
}

/// Locate the renderer's extension directory
pub fn find_in_extensions(extensions_dir: &Path) -> Result<PathBuf> {
    WalkDir::new(extensions_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .starts_with(EXTENSION_PREFIX)
        })
        .map(|entry| entry.into_path())
        .ok_or_else(|| TraceflowError::Renderer(format!(
            "Could not find the renderer under {}",
            extensions_dir.display()
        )))
}

/// Renderer driven through its command line
pub struct EventStudioRenderer {
    executable: PathBuf,
    args: Vec<String>,
}

#[async_trait]
impl DiagramRenderer for EventStudioRenderer {
    async fn render(&self, working_dir: &Path) -> Result<()> {
        info!("🖼️ Launching {} {}", self.executable.display(), self.args.join(" "));

        let status = tokio::process::Command::new(&self.executable)
            .args(&self.args)
            .current_dir(working_dir)
            .status()
            .await
            .map_err(|e| TraceflowError::Renderer(format!(
                "Failed to launch {}: {}",
                self.executable.display(),
                e
            )))?;

        if !status.success() {
            return Err(TraceflowError::Renderer(format!("Renderer exited with {}", status)));
        }

        debug!("Renderer finished successfully");
        Ok(())
    }

    fn renderer_name(&self) -> &str {
        "EventStudio"
    }
}

/// Write a scenario project referencing `document` unless one already exists.
/// Returns whether a file was written.
pub fn write_project_file(project_file: &Path, document: &Path) -> Result<bool> {
    if project_file.exists() {
        debug!("Keeping existing project file {}", project_file.display());
        return Ok(false);
    }

    let model_path = document
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| document.display().to_string());
    let scenario_name = document
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "trace".to_string());

    let project = json!({
        "documents": [
            {
                "documentName": "SequenceDiagram",
                "documentType": "sequence-diagram",
                "documentFormat": "pdf",
                "columnWidth": "medium",
                "remarkWidth": "small"
            }
        ],
        "scenarios": [
            {
                "modelPath": model_path,
                "scenarioName": scenario_name
            }
        ]
    });

    if let Some(parent) = project_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(project_file, serde_json::to_string_pretty(&project)?)?;
    info!("Wrote project file {}", project_file.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_file_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project.scn.json");
        let document = dir.path().join("trace.fdl");

        assert!(write_project_file(&project, &document).unwrap());
        let content: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&project).unwrap()).unwrap();
        assert_eq!(content["scenarios"][0]["modelPath"], "trace.fdl");
        assert_eq!(content["scenarios"][0]["scenarioName"], "trace");

        std::fs::write(&project, "{}").unwrap();
        assert!(!write_project_file(&project, &document).unwrap());
        assert_eq!(std::fs::read_to_string(&project).unwrap(), "{}");
    }

    #[test]
    fn test_find_in_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ms-python.python-2024.1")).unwrap();
        std::fs::create_dir(dir.path().join("EventHelix.EventStudio-8.1.0")).unwrap();

        let found = find_in_extensions(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "EventHelix.EventStudio-8.1.0");
    }

    #[test]
    fn test_missing_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_in_extensions(dir.path()),
            Err(TraceflowError::Renderer(_))
        ));
    }

    #[test]
    fn test_explicit_executable_is_used() {
        let config = RendererConfig {
            executable: Some(PathBuf::from("/opt/evstudio")),
            ..RendererConfig::default()
        };
        let renderer = create_renderer(&config).unwrap();
        assert_eq!(renderer.renderer_name(), "EventStudio");
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = EventStudioRenderer {
            executable: dir.path().join("no-such-renderer"),
            args: vec![],
        };
        assert!(matches!(
            renderer.render(dir.path()).await,
            Err(TraceflowError::Renderer(_))
        ));
    }
}
