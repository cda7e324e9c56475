//! Unit tests for CLI commands.

use super::*;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use provision_config::ResolverSettings;
use tempfile::TempDir;

const CATALOG: &str = r#"
[[installed]]
symbolic-name = "com.example.kernel"
kind = "kernel"

[[feature]]
symbolic-name = "com.example.a"
short-name = "a"
dependencies = ["com.example.b"]

[[feature]]
symbolic-name = "com.example.b"
dependencies = ["com.example.c", "com.example.kernel"]

[[feature]]
symbolic-name = "com.example.c"

[[feature]]
symbolic-name = "com.example.s-1.0"
version = "1.0"
singleton = true

[[feature]]
symbolic-name = "com.example.s-2.0"
version = "2.0"
singleton = true

[[feature]]
symbolic-name = "com.example.f1"
dependencies = ["com.example.s-1.0"]

[[feature]]
symbolic-name = "com.example.f2"
dependencies = ["com.example.s-2.0"]

[[sample]]
name = "com.example.sample.hello"
short-name = "HelloSample"
required-features = ["a"]
"#;

/// Create a temporary directory for testing
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn utf8_dir(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("temp dir is UTF-8")
}

/// Context whose settings point at one manifest written into `temp_dir`
fn create_test_context(temp_dir: &TempDir, content: &str) -> CommandContext {
    let cwd = utf8_dir(temp_dir);
    let manifest = cwd.join("catalog.toml");
    fs::write(&manifest, content).unwrap();

    CommandContext::with_settings(
        cwd,
        ResolverSettings {
            catalogs: vec![manifest],
            ..ResolverSettings::default()
        },
    )
}

fn resolve_in(ctx: &CommandContext, names: &[&str]) -> ProvisionResult<Vec<provision_core::types::InstallList>> {
    let catalog = Arc::new(load_catalog(ctx).unwrap());
    let names: Vec<String> = names.iter().map(|name| name.to_string()).collect();
    resolve::resolve_names(&catalog, &names, ctx)
}

#[test]
fn test_suggest_similar_name() {
    let names = ["servlet-3.1", "HelloSample", "json-1.0"];

    assert_eq!(suggest_similar_name("servlet-3.1", names), Some("servlet-3.1".to_string()));
    assert_eq!(suggest_similar_name("servlet-3.0", names), Some("servlet-3.1".to_string()));
    assert_eq!(suggest_similar_name("hellosampel", names), Some("HelloSample".to_string()));
    assert_eq!(suggest_similar_name("completely-different", names), None);
}

#[test]
fn test_edit_distance() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("abc", "abc"), 0);
    assert_eq!(edit_distance("abc", "ab"), 1);
    assert_eq!(edit_distance("abc", "abcd"), 1);
    assert_eq!(edit_distance("kitten", "sitting"), 3);
}

#[test]
fn test_resolve_orders_dependencies_first() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, CATALOG);

    let lists = resolve_in(&ctx, &["a"]).unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(
        lists[0].names(),
        vec!["com.example.c", "com.example.b", "com.example.a"]
    );
}

#[test]
fn test_resolve_sample_by_short_name() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, CATALOG);

    let lists = resolve_in(&ctx, &["hellosample"]).unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(
        lists[0].names(),
        vec![
            "com.example.c",
            "com.example.b",
            "com.example.a",
            "com.example.sample.hello"
        ]
    );
}

#[test]
fn test_strict_mode_reports_conflicts() {
    let temp_dir = create_temp_dir();
    let mut ctx = create_test_context(&temp_dir, CATALOG);

    assert!(resolve_in(&ctx, &["com.example.f1", "com.example.f2"]).is_ok());

    ctx.settings.mode = ResolutionMode::DetectConflicts;
    let outcome = resolve_in(&ctx, &["com.example.f1", "com.example.f2"]);
    let report = outcome.as_ref().unwrap_err().as_resolution().unwrap();
    assert!(report.conflicts.contains_key("com.example.s"));

    let json = resolve::render_json(&outcome, &ctx);
    assert_eq!(json["mode"], "detect-conflicts");
    assert!(json["error"]["conflicts"]["com.example.s"].is_array());
}

#[test]
fn test_render_json_lists() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, CATALOG);

    let outcome = resolve_in(&ctx, &["a"]);
    let json = resolve::render_json(&outcome, &ctx);

    assert_eq!(json["mode"], "ignore-conflicts");
    assert!(json["error"].is_null());
    assert_eq!(json["installLists"][0]["root"], "a");
    assert_eq!(json["installLists"][0]["resources"][0]["symbolicName"], "com.example.c");
    assert_eq!(json["installLists"][0]["resources"][2]["type"], "feature");
}

#[test]
fn test_missing_name_reported_with_hint() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, CATALOG);

    let outcome = resolve_in(&ctx, &["com.example.aa"]);
    let error = outcome.as_ref().unwrap_err();
    let report = error.as_resolution().unwrap();
    assert_eq!(report.all_requirements_not_found(), vec!["com.example.aa"]);

    let catalog = load_catalog(&ctx).unwrap();
    let hints = resolve::missing_name_hints(&catalog, report);
    assert_eq!(hints, vec!["Did you mean 'com.example.a' instead of 'com.example.aa'?"]);

    let json = resolve::render_json(&outcome, &ctx);
    assert_eq!(json["error"]["unresolved"][0], "com.example.aa");
    assert_eq!(json["error"]["missing"][0]["requirement"], "com.example.aa");
}

#[test]
fn test_load_catalog_requires_manifests() {
    let temp_dir = create_temp_dir();
    let ctx = CommandContext::with_settings(utf8_dir(&temp_dir), ResolverSettings::default());

    match load_catalog(&ctx) {
        Err(ProvisionError::ConfigValidation { field, .. }) => assert_eq!(field, "catalogs"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("loading without manifests must fail"),
    }
}

#[test]
fn test_command_layer_from_flags() {
    let cwd = Utf8PathBuf::from("/work/project");
    let command = Commands::Resolve {
        names: vec!["a".to_string()],
        strict: true,
        catalogs: vec![PathBuf::from("catalog.toml"), PathBuf::from("/opt/base.json")],
        exclude: vec!["com.example.s-1.0".to_string()],
        json: false,
    };

    let layer = command_layer(&command, &cwd).unwrap();
    assert_eq!(layer.mode, Some(ResolutionMode::DetectConflicts));
    assert_eq!(layer.exclude, Some(vec!["com.example.s-1.0".to_string()]));
    assert_eq!(
        layer.catalogs,
        Some(vec![
            Utf8PathBuf::from("/work/project/catalog.toml"),
            Utf8PathBuf::from("/opt/base.json"),
        ])
    );

    let layer = command_layer(&Commands::Version, &cwd).unwrap();
    assert!(layer.is_empty());
}

#[test]
fn test_check_reports_stats_and_cycles() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(
        &temp_dir,
        r#"
[[feature]]
symbolic-name = "x"
dependencies = ["y"]

[[feature]]
symbolic-name = "y"
dependencies = ["x"]

[[feature]]
symbolic-name = "z"
"#,
    );

    let report = check::inspect(&ctx).unwrap();
    assert_eq!(report.stats.features, 3);
    assert_eq!(report.dependencies, 2);
    assert_eq!(report.cycles, vec![vec!["x".to_string(), "y".to_string()]]);
    assert!(check::execute(&ctx).is_ok());
}

#[test]
fn test_check_rejects_broken_manifest() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir, "[[feature]");

    assert!(matches!(
        check::inspect(&ctx),
        Err(ProvisionError::TomlParse { line: 1, .. })
    ));
}
