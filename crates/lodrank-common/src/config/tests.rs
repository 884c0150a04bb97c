//! Configuration tests

use super::*;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 4] = [ENV_RANK_LEVEL, ENV_DEVICE, ENV_PREFER_GPU, ENV_REVALIDATE];

fn clear_env() {
    for var in ENV_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

#[test]
fn test_default_config() {
    let config = LodRankConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.rank.level, 0);
    assert_eq!(config.kernel.device, Device::Cpu);
    assert!(!config.kernel.prefer_gpu);
    assert!(config.validation.revalidate_on_consume);
}

#[test]
fn test_config_builder() {
    let config = LodRankConfig::builder()
        .rank_level(2)
        .device(Device::Cuda(1))
        .prefer_gpu(true)
        .revalidate_on_consume(false)
        .build()
        .unwrap();

    assert_eq!(config.rank.level, 2);
    assert_eq!(config.kernel.device, Device::Cuda(1));
    assert!(config.kernel.prefer_gpu);
    assert!(!config.validation.revalidate_on_consume);
}

#[test]
fn test_config_validation() {
    let mut config = LodRankConfig::default();
    config.rank.level = MAX_LOD_DEPTH;
    assert!(config.validate().is_err());

    // GPU preference on a CPU device is contradictory
    config = LodRankConfig::default();
    config.kernel.prefer_gpu = true;
    assert!(matches!(config.validate(), Err(LodRankError::Config(_))));
    assert!(LodRankConfig::builder().prefer_gpu(true).build().is_err());
}

#[test]
fn test_toml_config_loading() {
    let toml_content = r#"
[rank]
level = 1

[kernel]
device = "cuda:0"
prefer_gpu = true
"#;

    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file.write_all(toml_content.as_bytes()).unwrap();

    let config = LodRankConfig::from_file(temp_file.path()).unwrap();
    assert_eq!(config.rank.level, 1);
    assert_eq!(config.kernel.device, Device::Cuda(0));
    assert!(config.kernel.prefer_gpu);
    // absent section keeps its default
    assert!(config.validation.revalidate_on_consume);
}

#[test]
fn test_toml_invalid_content() {
    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file.write_all(b"[kernel]\ndevice = \"tpu\"\n").unwrap();
    assert!(matches!(LodRankConfig::from_file(temp_file.path()), Err(LodRankError::Config(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = LodRankConfig::from_file("/nonexistent/lodrank.toml");
    assert!(matches!(result, Err(LodRankError::Io(_))));
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    unsafe {
        env::set_var(ENV_RANK_LEVEL, "3");
    }
    unsafe {
        env::set_var(ENV_DEVICE, "cuda:2");
    }
    unsafe {
        env::set_var(ENV_PREFER_GPU, "true");
    }
    unsafe {
        env::set_var(ENV_REVALIDATE, "0");
    }

    let config = LodRankConfig::from_env().unwrap();
    assert_eq!(config.rank.level, 3);
    assert_eq!(config.kernel.device, Device::Cuda(2));
    assert!(config.kernel.prefer_gpu);
    assert!(!config.validation.revalidate_on_consume);

    clear_env();
}

#[test]
#[serial]
fn test_env_rejects_garbage() {
    clear_env();
    unsafe {
        env::set_var(ENV_RANK_LEVEL, "deep");
    }
    assert!(matches!(LodRankConfig::from_env(), Err(LodRankError::Config(_))));
    clear_env();

    unsafe {
        env::set_var(ENV_PREFER_GPU, "maybe");
    }
    assert!(LodRankConfig::from_env().is_err());
    clear_env();
}

#[test]
#[serial]
fn test_load_layers_env_over_file() {
    clear_env();
    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file.write_all(b"[rank]\nlevel = 1\n").unwrap();
    unsafe {
        env::set_var(ENV_RANK_LEVEL, "2");
    }

    let config = LodRankConfig::load(Some(temp_file.path())).unwrap();
    assert_eq!(config.rank.level, 2);

    clear_env();
    let config = LodRankConfig::load(None).unwrap();
    assert_eq!(config, LodRankConfig::default());
}

#[test]
fn test_config_merging() {
    let mut base_config = LodRankConfig::default();
    base_config.rank.level = 1;

    let override_config = LodRankConfig::builder()
        .device(Device::Cuda(0))
        .revalidate_on_consume(false)
        .build()
        .unwrap();

    base_config.merge_with(override_config);

    assert_eq!(base_config.rank.level, 1); // Preserved
    assert_eq!(base_config.kernel.device, Device::Cuda(0)); // Overridden
    assert!(!base_config.validation.revalidate_on_consume);
}

#[test]
fn test_serde_round_trip() {
    let config = LodRankConfig::builder().rank_level(1).device(Device::Cuda(3)).build().unwrap();
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("cuda:3"));
    let parsed: LodRankConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
