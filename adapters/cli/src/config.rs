//! Loading of the simulation configuration from TOML.

use std::path::Path;

use anyhow::{Context, Result};
use bastion_core::SimulationConfig;

/// Reads a configuration file. Omitted sections keep their defaults.
pub(crate) fn load(path: &Path) -> Result<SimulationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn parse(text: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig =
        toml::from_str(text).context("failed to parse configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sections_override_their_fields_only() {
        let config = parse(
            r#"
            [world]
            width = 2000.0

            [spatial]
            indexed = false

            [spawning]
            seed = 42
            "#,
        )
        .expect("parses");

        assert_eq!(config.world.width, 2_000.0);
        assert_eq!(config.world.height, 1_000.0);
        assert!(!config.spatial.indexed);
        assert_eq!(config.spawning.seed, 42);
        assert_eq!(config.spawning.interval_ticks, 60);
    }

    #[test]
    fn invalid_values_are_reported() {
        let error = parse("[territory]\nsettle_ticks = 20\nmax_latency_ticks = 5\n")
            .expect_err("latency below settle");
        assert!(format!("{error:#}").contains("settle"), "{error:#}");
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");
        let error = load(&path).expect_err("file is missing");
        assert!(format!("{error:#}").contains("absent.toml"));
    }

    #[test]
    fn file_contents_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[penalty]\nfire_interval_factor = 3").expect("write");
        let config = load(file.path()).expect("loads");
        assert_eq!(config.penalty.fire_interval_factor, 3);
    }
}
