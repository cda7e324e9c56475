//! Resolver settings layering, directory walk-up and environment overrides
//!
//! Layers apply in order, each overriding the fields it sets:
//! defaults, `~/.provision/config.toml`, the nearest `provision.toml`,
//! `PROVISION_*` environment variables, then command line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use provision_core::error::ProvisionError;
use provision_core::types::ResolutionMode;

use crate::manifest::{in_file, parse_toml};
use crate::ConfigResult;

/// Project settings file name
pub const SETTINGS_FILE: &str = "provision.toml";

/// Prefix of settings environment variables
pub const ENV_PREFIX: &str = "PROVISION_";

/// Settings a resolution run uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverSettings {
    pub mode: ResolutionMode,
    /// Features strict resolution must not select
    pub exclude: Vec<String>,
    /// Catalog manifests to load, in order
    pub catalogs: Vec<Utf8PathBuf>,
    /// Tracing filter directive
    pub log: Option<String>,
}

/// One settings layer, unset fields fall through to lower layers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ResolutionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalogs: Option<Vec<Utf8PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// Settings file with a `[resolver]` table
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    resolver: SettingsLayer,
}

/// Settings source tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project provision.toml file
    Project(Utf8PathBuf),
    /// Environment variables
    Environment,
    /// CLI flags
    CommandLine,
}

/// Main settings loading interface
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    /// Directory the project search starts from
    cwd: Utf8PathBuf,
    /// Global config file, none when the home directory is unknown
    global: Option<Utf8PathBuf>,
}

/// Ordered settings layers
#[derive(Debug, Clone, Default)]
pub struct SettingsLayering {
    layers: Vec<(SettingsLayer, SettingsSource)>,
}

impl ResolverSettings {
    fn apply(&mut self, layer: &SettingsLayer) {
        if let Some(mode) = layer.mode {
            self.mode = mode;
        }
        if let Some(exclude) = &layer.exclude {
            self.exclude = exclude.clone();
        }
        if let Some(catalogs) = &layer.catalogs {
            self.catalogs = catalogs.clone();
        }
        if let Some(log) = &layer.log {
            self.log = Some(log.clone());
        }
    }
}

impl SettingsLayer {
    /// Whether this layer sets nothing
    pub fn is_empty(&self) -> bool {
        self == &SettingsLayer::default()
    }

    /// Make relative catalog paths relative to `base` instead of the cwd
    fn anchor_catalogs(&mut self, base: &Utf8Path) {
        if let Some(catalogs) = &mut self.catalogs {
            for catalog in catalogs.iter_mut() {
                if catalog.is_relative() {
                    *catalog = base.join(&*catalog);
                }
            }
        }
    }
}

impl SettingsLoader {
    /// Create a loader using the global config in the home directory
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            global: default_global_path(),
        }
    }

    /// Override the global config location
    pub fn with_global_path(mut self, global: Option<Utf8PathBuf>) -> Self {
        self.global = global;
        self
    }

    /// Find a settings file in the project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Load the nearest project settings file
    pub fn load_project_settings(&self) -> ConfigResult<Option<(SettingsLayer, SettingsSource)>> {
        match self.resolve_config_path(SETTINGS_FILE) {
            Some(path) => {
                let layer = load_from_file(&path)?;
                Ok(Some((layer, SettingsSource::Project(path))))
            }
            None => Ok(None),
        }
    }

    /// Load global settings
    pub fn load_global_settings(&self) -> ConfigResult<Option<(SettingsLayer, SettingsSource)>> {
        match &self.global {
            Some(path) if path.is_file() => {
                let layer = load_from_file(path)?;
                Ok(Some((layer, SettingsSource::Global(path.clone()))))
            }
            _ => Ok(None),
        }
    }

    /// Layer every source and merge them
    pub fn load(
        &self,
        env: &HashMap<String, String>,
        cli: SettingsLayer,
    ) -> ConfigResult<(ResolverSettings, SettingsLayering)> {
        let mut layering = SettingsLayering::new();

        if let Some((layer, source)) = self.load_global_settings()? {
            layering.push(layer, source);
        }
        if let Some((layer, source)) = self.load_project_settings()? {
            layering.push(layer, source);
        }

        let env_layer = SettingsLayering::env_layer(env)?;
        if !env_layer.is_empty() {
            layering.push(env_layer, SettingsSource::Environment);
        }
        if !cli.is_empty() {
            layering.push(cli, SettingsSource::CommandLine);
        }

        let settings = layering.merge();
        debug!(
            "Resolver settings from {} layer(s): {:?}",
            layering.sources().count(),
            settings
        );
        Ok((settings, layering))
    }
}

impl SettingsLayering {
    /// Create an empty layering
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer above every existing one
    pub fn push(&mut self, layer: SettingsLayer, source: SettingsSource) -> &mut Self {
        self.layers.push((layer, source));
        self
    }

    /// Sources in application order
    pub fn sources(&self) -> impl Iterator<Item = &SettingsSource> {
        self.layers.iter().map(|(_, source)| source)
    }

    /// Merge all layers over the defaults
    pub fn merge(&self) -> ResolverSettings {
        let mut settings = ResolverSettings::default();
        for (layer, _) in &self.layers {
            settings.apply(layer);
        }
        settings
    }

    /// Build a layer from `PROVISION_*` variables
    pub fn env_layer(env: &HashMap<String, String>) -> ConfigResult<SettingsLayer> {
        let mut layer = SettingsLayer::default();

        for (key, value) in env {
            match key.as_str() {
                "PROVISION_MODE" => {
                    layer.mode = Some(parse_mode(key, value)?);
                }
                "PROVISION_EXCLUDE" => {
                    layer.exclude = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                "PROVISION_CATALOGS" => {
                    let catalogs = std::env::split_paths(value)
                        .map(|path| {
                            Utf8PathBuf::try_from(path).map_err(|e| ProvisionError::ConfigValidation {
                                field: key.clone(),
                                reason: format!("Catalog path is not valid UTF-8: {e}"),
                            })
                        })
                        .collect::<ConfigResult<Vec<_>>>()?;
                    layer.catalogs = Some(catalogs);
                }
                "PROVISION_LOG" => {
                    layer.log = Some(value.clone());
                }
                _ => {
                    // Unknown environment variable, ignore
                }
            }
        }

        Ok(layer)
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

/// Parse a resolution mode name
pub fn parse_mode(field: &str, value: &str) -> ConfigResult<ResolutionMode> {
    match value.trim() {
        "ignore-conflicts" => Ok(ResolutionMode::IgnoreConflicts),
        "detect-conflicts" => Ok(ResolutionMode::DetectConflicts),
        other => Err(ProvisionError::ConfigValidation {
            field: field.to_string(),
            reason: format!("Unknown mode '{other}', expected ignore-conflicts or detect-conflicts"),
        }),
    }
}

/// Load and parse a settings file
pub fn load_from_file(path: &Utf8Path) -> ConfigResult<SettingsLayer> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProvisionError::io(format!("Failed to read {path}"), e))?;

    let file: SettingsFile = parse_toml(&content).map_err(|e| in_file(path, e))?;
    let mut layer = file.resolver;
    if let Some(base) = path.parent() {
        layer.anchor_catalogs(base);
    }
    Ok(layer)
}

fn default_global_path() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()?;
    let home = Utf8PathBuf::try_from(home).ok()?;
    Some(home.join(".provision").join("config.toml"))
}
