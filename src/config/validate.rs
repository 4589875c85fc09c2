// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_outputs(cfg)?;
    validate_purge_content(cfg)?;
    validate_server(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let named = [
        ("src", cfg.paths.src.as_path()),
        ("build", cfg.paths.build.as_path()),
        ("dist", cfg.paths.dist.as_path()),
    ];

    for (name, path) in named.iter() {
        if path.as_os_str().is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "[paths].{name} must not be empty"
            )));
        }
    }

    // Output trees must not overlap the source tree (or each other), or a
    // build would feed its own output back into the watcher.
    for (i, (a_name, a)) in named.iter().enumerate() {
        for (b_name, b) in named.iter().skip(i + 1) {
            if a.starts_with(b) || b.starts_with(a) {
                return Err(AssetdagError::ConfigError(format!(
                    "[paths].{a_name} ({}) and [paths].{b_name} ({}) overlap",
                    a.display(),
                    b.display()
                )));
            }
        }
    }

    Ok(())
}

fn validate_outputs(cfg: &RawConfigFile) -> Result<()> {
    ensure_relative_file("[styles].entry", &cfg.styles.entry)?;
    ensure_relative_file("[styles].output", &cfg.styles.output)?;
    ensure_relative_file("[scripts].output", &cfg.scripts.output)?;

    if !cfg.styles.entry.ends_with(".css") {
        return Err(AssetdagError::ConfigError(format!(
            "[styles].entry must name a .css file (got '{}')",
            cfg.styles.entry
        )));
    }

    Ok(())
}

/// Output names are joined onto the build directory, so they must stay
/// inside it.
fn ensure_relative_file(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AssetdagError::ConfigError(format!("{key} must not be empty")));
    }

    let escapes = Path::new(value).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(AssetdagError::ConfigError(format!(
            "{key} must be a relative path without '..' (got '{value}')"
        )));
    }

    Ok(())
}

fn validate_purge_content(cfg: &RawConfigFile) -> Result<()> {
    for pattern in cfg.styles.purge_content.iter() {
        Glob::new(pattern).map_err(|err| {
            AssetdagError::ConfigError(format!(
                "[styles].purge_content has invalid glob '{pattern}': {err}"
            ))
        })?;
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    let server = &cfg.server;

    if server.livereload_port == 0 || server.http_port == 0 {
        return Err(AssetdagError::ConfigError(
            "[server] ports must be >= 1".to_string(),
        ));
    }

    if server.livereload_port == server.http_port {
        return Err(AssetdagError::ConfigError(format!(
            "[server].livereload_port and [server].http_port must differ (both {})",
            server.http_port
        )));
    }

    if server.host.trim().is_empty() {
        return Err(AssetdagError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(AssetdagError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn build_inside_src_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.paths.build = PathBuf::from("src/out");

        match ConfigFile::try_from(raw) {
            Err(AssetdagError::ConfigError(msg)) => assert!(msg.contains("overlap")),
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn output_may_not_escape_build_dir() {
        let mut raw = RawConfigFile::default();
        raw.scripts.output = "../main.js".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn identical_ports_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.server.http_port = raw.server.livereload_port;
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
