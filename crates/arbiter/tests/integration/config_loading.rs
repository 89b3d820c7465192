use arbiter::{Config, ConfigError, EXAMPLE_CONFIG, ExecutionPolicy, Judge, Language};

#[test]
fn test_example_config_builds_a_judge() {
    let config = Config::parse_toml(EXAMPLE_CONFIG).unwrap();
    assert_eq!(config.supported_languages(), {
        let mut all = Language::ALL.to_vec();
        all.sort();
        all
    });
    assert!(Judge::new(config).is_ok());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.toml");
    std::fs::write(
        &path,
        r#"
execution_policy = "aggregate"
temp_prefix = "sub_"

[sandbox]
enabled = false

[pool]
workers = 2
queue_capacity = 16

[languages.python]
name = "Python 3"

[languages.python.compile]
source_name = "solution.py"
command = ["python3", "-m", "py_compile", "{source}"]

[languages.python.run]
command = ["python3", "{workdir}/{source}"]
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.execution_policy, ExecutionPolicy::Aggregate);
    assert_eq!(config.temp_prefix, "sub_");
    assert!(!config.sandbox.enabled);
    assert_eq!(config.pool.workers, 2);
    assert_eq!(config.supported_languages(), [Language::Python]);
    assert_eq!(config.default_limits.time_limit_ms, 1000);
}

#[test]
fn test_missing_file_is_parse_error() {
    let result = Config::from_file("/nonexistent/arbiter.toml");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_unsafe_source_name_is_rejected() {
    let toml = r#"
[languages.c]
name = "C"

[languages.c.compile]
source_name = "../solution.c"
command = ["gcc", "{source}"]

[languages.c.run]
command = ["{workdir}/a.out"]
"#;
    assert!(Config::parse_toml(toml).is_err());
}
