//! Command implementations and dispatch logic.
//!
//! Every command runs against a [`CommandContext`] holding the working
//! directory and the merged resolver settings.

use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use provision_catalog::Catalog;
use provision_config::manifest::load_manifests;
use provision_config::{ResolverSettings, SettingsLayer, SettingsLayering, SettingsLoader};
use provision_core::error::{ProvisionError, ProvisionResult};
use provision_core::types::ResolutionMode;

pub mod check;
pub mod resolve;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub settings: ResolverSettings,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Layer settings for `command` starting from the current directory
    pub fn load(command: &Commands) -> ProvisionResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| ProvisionError::io("Failed to get current directory", e))?;
        let cwd = to_utf8("cwd", cwd)?;

        let cli = command_layer(command, &cwd)?;
        let env = SettingsLayering::collect_env_overrides();
        let (settings, _layering) = SettingsLoader::new(cwd.clone()).load(&env, cli)?;

        Ok(Self::with_settings(cwd, settings))
    }

    /// Context with already merged settings
    pub fn with_settings(cwd: Utf8PathBuf, settings: ResolverSettings) -> Self {
        Self {
            cwd,
            settings,
            output: OutputHandler::new(),
        }
    }
}

/// Dispatch a command to its handler
pub fn dispatch_command(command: Commands, ctx: &CommandContext) -> ProvisionResult<()> {
    match command {
        Commands::Resolve { names, json, .. } => {
            info!("Resolving {:?} ({:?})", names, ctx.settings.mode);
            resolve::execute(&names, json, ctx)
        }
        Commands::Check { .. } => {
            info!("Checking {} catalog(s)", ctx.settings.catalogs.len());
            check::execute(ctx)
        }
        Commands::Version => show_version(ctx),
    }
}

/// Settings layer carried by command line flags
pub(crate) fn command_layer(command: &Commands, cwd: &Utf8Path) -> ProvisionResult<SettingsLayer> {
    let mut layer = SettingsLayer::default();

    match command {
        Commands::Resolve {
            strict,
            catalogs,
            exclude,
            ..
        } => {
            if *strict {
                layer.mode = Some(ResolutionMode::DetectConflicts);
            }
            if !exclude.is_empty() {
                layer.exclude = Some(exclude.clone());
            }
            layer.catalogs = catalog_flags(catalogs, cwd)?;
        }
        Commands::Check { catalogs } => {
            layer.catalogs = catalog_flags(catalogs, cwd)?;
        }
        Commands::Version => {}
    }

    Ok(layer)
}

fn catalog_flags(
    catalogs: &[PathBuf],
    cwd: &Utf8Path,
) -> ProvisionResult<Option<Vec<Utf8PathBuf>>> {
    if catalogs.is_empty() {
        return Ok(None);
    }

    catalogs
        .iter()
        .map(|path| {
            let path = to_utf8("catalog", path.clone())?;
            Ok(if path.is_relative() { cwd.join(path) } else { path })
        })
        .collect::<ProvisionResult<Vec<_>>>()
        .map(Some)
}

fn to_utf8(field: &str, path: PathBuf) -> ProvisionResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| ProvisionError::ConfigValidation {
        field: field.to_string(),
        reason: format!("Path is not valid UTF-8: {}", path.display()),
    })
}

/// Load every configured manifest into one catalog
pub fn load_catalog(ctx: &CommandContext) -> ProvisionResult<Catalog> {
    if ctx.settings.catalogs.is_empty() {
        return Err(ProvisionError::ConfigValidation {
            field: "catalogs".to_string(),
            reason: "No catalog manifests configured, pass --catalog or set \
                     [resolver] catalogs in provision.toml"
                .to_string(),
        });
    }

    let manifest = load_manifests(&ctx.settings.catalogs)?;
    manifest.to_catalog()
}

fn show_version(ctx: &CommandContext) -> ProvisionResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.line(&format!("provision v{version}"));
    ctx.output.info(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.info(&format!("Target: {target}"));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));

    Ok(())
}

/// Suggest a known name close to `input`, compared case-insensitively
pub fn suggest_similar_name<'a, I>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let input = input.to_lowercase();
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = edit_distance(&input, &candidate.to_lowercase());
        if distance < best_distance && distance <= 2 {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match.map(str::to_string)
}

/// Calculate edit distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Single rolling row of the distance matrix
    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b_chars.len()]
}
