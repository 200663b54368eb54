//! Tests for layered configuration loading.

use std::fs;
use std::path::PathBuf;

use figment::Jail;
use figment::providers::Serialized;
use sysbundle_config::{ConfigError, ConfigLoader, FailurePolicy, discover};
use tempfile::TempDir;

#[test]
fn loads_defaults_without_config_file() {
    let dir = TempDir::new().unwrap();
    let opts = ConfigLoader::new(dir.path()).without_env().load().unwrap();

    assert_eq!(opts.root_dir, dir.path());
    assert_eq!(opts.src_dir, dir.path().join("src"));
    assert!(!opts.is_prod);
}

#[test]
fn toml_file_overrides_defaults_and_is_anchored() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sysbundle.toml"),
        r#"
is_prod = true
build_dir = "dist/build"
on_failure = "detach"

[output]
sys_node_dir = "out/sys/node"

[targets]
node = ["glob.js"]

[aliases]
"left-pad" = "vendor/left-pad.js"
"#,
    )
    .unwrap();

    let opts = ConfigLoader::new(dir.path()).without_env().load().unwrap();

    assert!(opts.is_prod);
    assert_eq!(opts.on_failure, FailurePolicy::Detach);
    assert_eq!(opts.build_dir, dir.path().join("dist/build"));
    assert_eq!(opts.output.sys_node_dir, dir.path().join("out/sys/node"));
    // untouched sibling keeps its default
    assert_eq!(opts.output.dev_server_dir, dir.path().join("dev-server"));
    assert_eq!(opts.targets.node, vec!["glob.js".to_string()]);
    assert_eq!(
        opts.resolved_aliases()["left-pad"],
        dir.path().join("vendor/left-pad.js")
    );
}

#[test]
fn json_file_is_discovered() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sysbundle.json"),
        r#"{ "max_parallel": 2, "classifier": { "probe_externals": false } }"#,
    )
    .unwrap();

    assert_eq!(
        discover(dir.path()).unwrap().file_name().unwrap(),
        "sysbundle.json"
    );

    let opts = ConfigLoader::new(dir.path()).without_env().load().unwrap();
    assert_eq!(opts.max_parallel, Some(2));
    assert!(!opts.classifier.probe_externals);
    // nested defaults survive a partial table
    assert_eq!(opts.classifier.externals.len(), 3);
}

#[test]
fn toml_wins_over_json_when_both_exist() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sysbundle.toml"), "max_parallel = 4\n").unwrap();
    fs::write(dir.path().join("sysbundle.json"), r#"{ "max_parallel": 2 }"#).unwrap();

    let opts = ConfigLoader::new(dir.path()).without_env().load().unwrap();
    assert_eq!(opts.max_parallel, Some(4));
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new(dir.path())
        .config_file(dir.path().join("nope.toml"))
        .load();
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn unsupported_extension_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sysbundle.yaml");
    fs::write(&path, "is_prod: true\n").unwrap();

    let result = ConfigLoader::new(dir.path()).config_file(path).load();
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
}

#[test]
fn invalid_value_names_the_field() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sysbundle.toml"), "is_prod = \"maybe\"\n").unwrap();

    let err = ConfigLoader::new(dir.path())
        .without_env()
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("is_prod"), "got: {err}");
}

#[test]
fn validation_runs_after_merge() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sysbundle.toml"), "max_parallel = 0\n").unwrap();

    let result = ConfigLoader::new(dir.path()).without_env().load();
    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[test]
fn env_and_overrides_take_priority() {
    Jail::expect_with(|jail| {
        jail.create_file("sysbundle.toml", "is_prod = false\nmax_parallel = 4\n")?;
        jail.set_env("SYSBUNDLE_IS_PROD", "true");
        jail.set_env("SYSBUNDLE_MAX_PARALLEL", "6");
        jail.set_env("SYSBUNDLE_OUTPUT__DEV_SERVER_DIR", "www/dev");

        let root = PathBuf::from(jail.directory());
        let opts = ConfigLoader::new(&root)
            .override_with(Serialized::default("max_parallel", 1))
            .load()
            .unwrap();

        assert!(opts.is_prod);
        assert_eq!(opts.max_parallel, Some(1));
        assert_eq!(opts.output.dev_server_dir, root.join("www/dev"));
        Ok(())
    });
}

#[test]
fn configured_root_moves_defaulted_dirs() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sysbundle.toml"),
        "root_dir = \"packages/core\"\nbuild_dir = \"out\"\n",
    )
    .unwrap();

    let opts = ConfigLoader::new(dir.path()).without_env().load().unwrap();

    let root = dir.path().join("packages/core");
    assert_eq!(opts.root_dir, root);
    assert_eq!(opts.src_dir, root.join("src"));
    assert_eq!(opts.node_modules_dir, root.join("node_modules"));
    assert_eq!(opts.output.sys_node_dir, root.join("sys/node"));
    assert_eq!(opts.build_dir, root.join("out"));
}

#[test]
fn root_from_env_moves_defaulted_dirs() {
    Jail::expect_with(|jail| {
        let root = PathBuf::from(jail.directory());
        jail.set_env("SYSBUNDLE_ROOT_DIR", root.join("elsewhere").display());

        let opts = ConfigLoader::new(&root).load().unwrap();

        assert_eq!(opts.root_dir, root.join("elsewhere"));
        assert_eq!(opts.scripts_build_dir, root.join("elsewhere/scripts/build"));
        Ok(())
    });
}
