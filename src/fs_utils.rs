//! Cross-platform filesystem helpers
//!
//! - `atomic_rename`: replaces a file in one step (Windows needs an explicit delete)
//! - `write_atomic`: writes through a sibling temp file so readers never see a
//!   truncated document
//! - `config_base_dir`: platform configuration directory for the panel

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Cross-platform atomic rename that handles Windows file replacement.
///
/// On Unix, `fs::rename` atomically replaces the target if it exists.
/// On Windows, `fs::rename` fails if the target exists, so the target is
/// deleted first.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use eridanus_webui::fs_utils::atomic_rename;
///
/// std::fs::write("config.tmp", "new content")?;
/// atomic_rename(Path::new("config.tmp"), Path::new("config.yaml"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn atomic_rename(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if dst.exists() {
            fs::remove_file(dst)?;
        }
    }
    fs::rename(src, dst)
}

/// Replace `path` with `bytes`.
///
/// The data goes to `.<name>.tmp` in the same directory first and is synced
/// before the rename, so on failure the previous file is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_sibling(path);
    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        atomic_rename(&temp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Platform-appropriate configuration directory for the panel.
///
/// - **Linux**: `$XDG_CONFIG_HOME/eridanus-webui` or `~/.config/eridanus-webui`
/// - **macOS**: `~/Library/Application Support/eridanus-webui`
/// - **Windows**: `%APPDATA%\eridanus-webui`
/// - **Fallback**: system temp directory + `eridanus-webui`
pub fn config_base_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("eridanus-webui")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_base_dir_is_named() {
        let dir = config_base_dir();
        assert!(
            dir.ends_with("eridanus-webui"),
            "Config dir should end with 'eridanus-webui': {:?}",
            dir
        );
    }

    #[test]
    fn test_atomic_rename_replaces_existing() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("new.txt");
        let dst = temp.path().join("existing.txt");

        fs::write(&dst, "old content").unwrap();
        fs::write(&src, "new content").unwrap();

        atomic_rename(&src, &dst).unwrap();

        assert!(!src.exists(), "Source should not exist after rename");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new content");
    }

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.yaml");

        write_atomic(&path, b"a: 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");

        write_atomic(&path, b"a: 2\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 2\n");

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp file should be gone");
    }

    #[test]
    fn test_write_atomic_missing_directory_fails_cleanly() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing").join("config.yaml");
        assert!(write_atomic(&path, b"a: 1\n").is_err());
        assert!(!path.exists());
    }
}
