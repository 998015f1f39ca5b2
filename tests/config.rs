//! Loading configuration from files and the environment.

use hybrid_spmd::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_toml_and_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .group_size(3)
        .rank(2)
        .hosts(["10.0.0.1:7000", "10.0.0.2:7000", "10.0.0.3:7000"])
        .num_threads(8)
        .window_capacity(4096)
        .log_level("warn")
        .build()
        .unwrap();

    for name in ["run.toml", "run.json"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }
}

#[test]
fn test_file_errors() {
    let dir = TempDir::new().unwrap();

    let yaml = dir.path().join("run.yaml");
    fs::write(&yaml, "rank: 0").unwrap();
    assert!(matches!(
        Config::load_from_file(&yaml),
        Err(SpmdError::Config { .. })
    ));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "group_size = \"many\"").unwrap();
    assert!(Config::load_from_file(&broken).is_err());

    let invalid = dir.path().join("invalid.json");
    fs::write(&invalid, r#"{"group_size": 2, "rank": 5}"#).unwrap();
    assert!(matches!(
        Config::load_from_file(&invalid),
        Err(SpmdError::InvalidArgument { .. })
    ));

    assert!(Config::load_from_file(dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_environment_overrides() {
    // Single test so no other test in this binary races on the variables.
    std::env::set_var("SPMD_GROUP_SIZE", "2");
    std::env::set_var("SPMD_RANK", "1");
    std::env::set_var("SPMD_HOSTS", "127.0.0.1:9000, 127.0.0.1:9001");
    std::env::set_var("SPMD_NUM_THREADS", "5");
    std::env::set_var("SPMD_LOG_LEVEL", "debug");

    let config = Config::load_from_environment().unwrap();
    assert_eq!(config.group_size, 2);
    assert_eq!(config.rank, 1);
    assert_eq!(config.hosts, vec!["127.0.0.1:9000", "127.0.0.1:9001"]);
    assert_eq!(config.effective_num_threads(), 5);

    let mut from_file = Config::default();
    from_file.window_capacity = 512;
    from_file.apply_environment_overrides().unwrap();
    assert_eq!(from_file.window_capacity, 512);
    assert_eq!(from_file.rank, 1);

    std::env::set_var("SPMD_WINDOW_CAPACITY", "lots");
    assert!(matches!(
        Config::load_from_environment(),
        Err(SpmdError::Config { .. })
    ));

    for var in [
        "SPMD_GROUP_SIZE",
        "SPMD_RANK",
        "SPMD_HOSTS",
        "SPMD_NUM_THREADS",
        "SPMD_LOG_LEVEL",
        "SPMD_WINDOW_CAPACITY",
    ] {
        std::env::remove_var(var);
    }
    assert_eq!(Config::load_from_environment().unwrap(), Config::default());
}

#[test]
fn test_init_and_team_from_config() {
    let config = ConfigBuilder::new().num_threads(2).log_level("off").build().unwrap();
    hybrid_spmd::init(&config).unwrap();
    let team = WorkTeam::from_config(&config).unwrap();
    assert_eq!(team.thread_count(), 2);
}
