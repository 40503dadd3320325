use anyhow::Result;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pipes-starter";

/// Resolve log folder (absolute path), creating it if needed.
///
/// Order: explicit override (settings `log_dir`) → `<data_local_dir>/pipes-starter/logs` →
/// `./logs` under the current working directory.
pub fn resolve_log_folder(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(p) => p.to_path_buf(),
        None => match dirs::data_local_dir() {
            Some(base) => base.join(APP_DIR).join("logs"),
            None => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("logs"),
        },
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
    Ok(dir)
}

/// Default settings file location: `<config_dir>/pipes-starter/settings.toml`.
///
/// The file is optional; callers must not require it to exist.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_DIR).join("settings.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_log_folder_honours_override_and_creates_it() {
        let tmp = tempfile::tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("logs");
        let resolved = resolve_log_folder(Some(&wanted)).unwrap();
        assert_eq!(resolved, wanted);
        assert!(resolved.is_dir(), "log folder should be created");
    }

    #[test]
    fn default_settings_path_ends_with_app_file() {
        if let Some(p) = default_settings_path() {
            assert!(p.ends_with("pipes-starter/settings.toml"), "got {:?}", p);
        }
    }
}
