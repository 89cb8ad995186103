use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::ShimConfig;

/// `<documents>/<log_file>`, where documents is the configured directory or
/// the platform's documents folder. An absolute `log_file` is used as is.
pub fn resolve_log_path(config: &ShimConfig) -> Result<PathBuf> {
    if config.log_file.is_absolute() {
        return Ok(config.log_file.clone());
    }
    let documents = match &config.documents_dir {
        Some(dir) => dir.clone(),
        None => dirs::document_dir().context("could not determine documents directory")?,
    };
    Ok(documents.join(&config.log_file))
}

/// Route the `log` facade into the plugin log file, appending to earlier
/// sessions. `RUST_LOG` overrides the configured level.
pub fn init_file_logging(config: &ShimConfig) -> Result<PathBuf> {
    let path = resolve_log_path(config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already installed")?;
    Ok(path)
}

pub fn init_stderr_logging(level: &str) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(level))
        .target(Target::Stderr)
        .try_init()
        .context("logger already installed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_lives_under_the_documents_dir() {
        let config = ShimConfig {
            documents_dir: Some(PathBuf::from("/home/vault/Documents")),
            ..ShimConfig::default()
        };
        let path = resolve_log_path(&config).expect("path");
        assert_eq!(
            path,
            PathBuf::from("/home/vault/Documents/My Games/Fallout4VR/F4SE/VaultGirlPerkTreeVR.log")
        );
    }

    #[test]
    fn file_logging_appends_to_the_resolved_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = ShimConfig {
            documents_dir: Some(dir.path().to_path_buf()),
            ..ShimConfig::default()
        };
        let expected = dir
            .path()
            .join("My Games/Fallout4VR/F4SE/VaultGirlPerkTreeVR.log");
        fs::create_dir_all(expected.parent().expect("parent"))?;
        fs::write(&expected, "earlier session\n")?;

        // The global logger can only be installed once per process.
        if let Ok(path) = init_file_logging(&config) {
            assert_eq!(path, expected);
        }
        assert!(fs::read_to_string(&expected)?.starts_with("earlier session"));
        Ok(())
    }
}
