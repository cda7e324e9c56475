//! `provision resolve` command implementation.
//!
//! Loads the configured catalogs, resolves the requested names and prints
//! every install list, dependencies first. On failure the partial lists are
//! printed before the report.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use provision_catalog::Catalog;
use provision_core::error::{ProvisionError, ProvisionResult, ResolutionError};
use provision_core::types::{InstallList, InstallResource};
use provision_resolver::{RepositoryResolver, VERSION_REQUEST_SEPARATOR};

use super::{load_catalog, suggest_similar_name, CommandContext};

/// Execute the `provision resolve` command
pub fn execute(names: &[String], json: bool, ctx: &CommandContext) -> ProvisionResult<()> {
    let start_time = Instant::now();
    let catalog = Arc::new(load_catalog(ctx)?);
    let outcome = resolve_names(&catalog, names, ctx);

    if json {
        ctx.output.line(&render_json(&outcome, ctx).to_string());
        return outcome.map(|_| ());
    }

    match outcome {
        Ok(lists) => {
            if lists.is_empty() {
                ctx.output.success("Everything requested is already installed");
            } else {
                print_lists(&lists, ctx);
                ctx.output.success(&format!(
                    "Resolved {} install list(s) in {:.2}ms",
                    lists.len(),
                    start_time.elapsed().as_secs_f64() * 1000.0
                ));
            }
            Ok(())
        }
        Err(error) => {
            if let Some(report) = error.as_resolution() {
                print_lists(&report.install_lists, ctx);
                for hint in missing_name_hints(&catalog, report) {
                    ctx.output.info(&hint);
                }
            }
            Err(error)
        }
    }
}

/// Resolve `names` with the context's mode and exclusions
pub fn resolve_names(
    catalog: &Arc<Catalog>,
    names: &[String],
    ctx: &CommandContext,
) -> ProvisionResult<Vec<InstallList>> {
    RepositoryResolver::new(Arc::clone(catalog))
        .with_excluded_features(ctx.settings.exclude.iter().cloned())
        .resolve_with_mode(names, ctx.settings.mode)
}

fn print_lists(lists: &[InstallList], ctx: &CommandContext) {
    for list in lists {
        ctx.output.line(&format!("{} ({} resource(s))", list.root, list.len()));
        for (position, resource) in list.iter().enumerate() {
            ctx.output.line(&format!("  {:>3}. {}", position + 1, resource));
        }
    }
}

/// "Did you mean" lines for top-level names the catalog does not know at all
pub fn missing_name_hints(catalog: &Catalog, report: &ResolutionError) -> Vec<String> {
    let features = catalog.features();
    let mut known: Vec<&str> = Vec::new();
    for feature in &features {
        known.push(&feature.symbolic_name);
        if let Some(short_name) = &feature.short_name {
            known.push(short_name);
        }
    }
    known.extend(catalog.samples().map(|sample| sample.short_name.as_str()));

    report
        .top_level_not_resolved
        .iter()
        .filter_map(|name| {
            let base = name
                .split(VERSION_REQUEST_SEPARATOR)
                .next()
                .unwrap_or(name.as_str());
            if catalog.feature(base).is_some()
                || catalog.sample(base).is_some()
                || !catalog.non_applicable_resources(base).is_empty()
            {
                return None;
            }
            suggest_similar_name(base, known.iter().copied())
                .map(|suggestion| format!("Did you mean '{suggestion}' instead of '{base}'?"))
        })
        .collect()
}

/// JSON document describing a resolution outcome
pub fn render_json(outcome: &ProvisionResult<Vec<InstallList>>, ctx: &CommandContext) -> Value {
    let (lists, error) = match outcome {
        Ok(lists) => (lists.as_slice(), Value::Null),
        Err(error) => (
            error
                .as_resolution()
                .map_or(&[][..], |report| report.install_lists.as_slice()),
            error_json(error),
        ),
    };

    json!({
        "mode": ctx.settings.mode,
        "installLists": lists.iter().map(list_json).collect::<Vec<_>>(),
        "error": error,
    })
}

fn list_json(list: &InstallList) -> Value {
    let resources: Vec<Value> = list
        .iter()
        .map(|resource| match resource {
            InstallResource::Feature(feature) => json!({
                "type": "feature",
                "symbolicName": feature.symbolic_name,
                "version": feature.version.to_string(),
            }),
            InstallResource::Sample(sample) => json!({
                "type": "sample",
                "name": sample.name,
                "shortName": sample.short_name,
            }),
        })
        .collect();

    json!({ "root": list.root, "resources": resources })
}

fn error_json(error: &ProvisionError) -> Value {
    let Some(report) = error.as_resolution() else {
        return json!({ "message": error.to_string() });
    };

    let missing: Vec<Value> = report
        .missing_requirements
        .iter()
        .map(|missing| json!({ "requirement": missing.requirement, "owner": missing.owner }))
        .collect();
    let products: Vec<String> = report.missing_products.iter().map(ToString::to_string).collect();
    let conflicts: serde_json::Map<String, Value> = report
        .conflicts
        .iter()
        .map(|(name, chains)| {
            let chains: Vec<String> = chains.iter().map(ToString::to_string).collect();
            (name.clone(), json!(chains))
        })
        .collect();

    json!({
        "message": error.to_string(),
        "unresolved": report.top_level_not_resolved,
        "missing": missing,
        "requiresProduct": products,
        "conflicts": conflicts,
    })
}
