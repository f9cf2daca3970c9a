use anyhow::Context;
use directories::ProjectDirs;
use schemascope_core::TraceDirection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// Skip reprojection whenever the schema id is unchanged.
    Schema,
    /// Reproject whenever the graph content changes.
    #[default]
    Content,
}

impl IdentityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Content => "content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub show_attributes: bool,
    pub show_edge_labels: bool,
    pub trace_direction: TraceDirection,
    pub trace_hops: usize,
    pub fit_delay_ms: u64,
    pub identity_mode: IdentityMode,
    pub node_width: f32,
    pub node_height: f32,
    pub panel_width: f32,
    pub emit_intents: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            show_attributes: false,
            show_edge_labels: true,
            trace_direction: TraceDirection::Both,
            trace_hops: 3,
            fit_delay_ms: 100,
            identity_mode: IdentityMode::Content,
            node_width: 180.0,
            node_height: 44.0,
            panel_width: 320.0,
            emit_intents: false,
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "schemascope")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "invalid viewer config, using defaults");
        ViewerConfig::default()
    })
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<PathBuf> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)?;
    Ok(path)
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("viewer.toml");
        let cfg = ViewerConfig {
            show_attributes: true,
            trace_direction: TraceDirection::Upstream,
            identity_mode: IdentityMode::Schema,
            ..ViewerConfig::default()
        };

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "trace_hops = 7\n").expect("write");

        let loaded = load_or_default_from_path(&path);
        assert_eq!(loaded.trace_hops, 7);
        assert_eq!(loaded.node_width, ViewerConfig::default().node_width);
    }

    #[test]
    fn unknown_identity_mode_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        fs::write(&path, "identity_mode = \"hash\"\ntrace_hops = 9\n").expect("write");

        assert_eq!(load_or_default_from_path(&path), ViewerConfig::default());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_or_default_from_path(&dir.path().join("absent.toml"));
        assert_eq!(loaded, ViewerConfig::default());
    }
}
