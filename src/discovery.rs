//! Locating a package's FOMOD installer files
//!
//! A package either contains a `fomod` folder or is handed to us as the
//! `fomod` folder itself. Names are matched case-insensitively since FOMOD
//! packages are authored on Windows (`FOMod/moduleconfig.xml` is common).

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Paths of the two installer files inside a `fomod` folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerFiles {
    pub info: PathBuf,
    pub module_config: PathBuf,
}

fn not_found(path: impl Into<PathBuf>) -> ConfigError {
    ConfigError::NotFound { path: path.into() }
}

/// Find an entry of `dir` whose name equals `name` ignoring ASCII case
fn find_entry(dir: &Path, name: &str, want_dir: bool) -> Option<PathBuf> {
    let exact = dir.join(name);
    let matches_kind = |path: &Path| if want_dir { path.is_dir() } else { path.is_file() };
    if matches_kind(&exact) {
        return Some(exact);
    }

    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .find(|path| matches_kind(path))
}

/// Locate `info.xml` and `ModuleConfig.xml` for the package at `search_path`.
///
/// A `fomod` subfolder takes priority; otherwise `search_path` itself is used
/// when it is named `fomod`.
///
/// # Errors
///
/// [`ConfigError::NotFound`] when `search_path` is not a directory, when no
/// `fomod` folder is found, or when either file is missing.
pub fn find_installer_files<P: AsRef<Path>>(search_path: P) -> Result<InstallerFiles, ConfigError> {
    let search_path = search_path.as_ref();
    if !search_path.is_dir() {
        return Err(not_found(search_path));
    }

    let fomod_dir = match find_entry(search_path, "fomod", true) {
        Some(dir) => dir,
        None => {
            let is_fomod = search_path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.eq_ignore_ascii_case("fomod"));
            if !is_fomod {
                return Err(not_found(search_path.join("fomod")));
            }
            search_path.to_path_buf()
        }
    };

    let info = find_entry(&fomod_dir, "info.xml", false)
        .ok_or_else(|| not_found(fomod_dir.join("info.xml")))?;
    let module_config = find_entry(&fomod_dir, "ModuleConfig.xml", false)
        .ok_or_else(|| not_found(fomod_dir.join("ModuleConfig.xml")))?;

    Ok(InstallerFiles { info, module_config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, "<x/>").unwrap();
    }

    #[test]
    fn test_fomod_subfolder() {
        let tmp = TempDir::new().unwrap();
        let fomod = tmp.path().join("fomod");
        fs::create_dir(&fomod).unwrap();
        touch(&fomod.join("info.xml"));
        touch(&fomod.join("ModuleConfig.xml"));

        let files = find_installer_files(tmp.path()).unwrap();
        assert_eq!(files.info, fomod.join("info.xml"));
        assert_eq!(files.module_config, fomod.join("ModuleConfig.xml"));
    }

    #[test]
    fn test_search_path_is_fomod_folder() {
        let tmp = TempDir::new().unwrap();
        let fomod = tmp.path().join("fomod");
        fs::create_dir(&fomod).unwrap();
        touch(&fomod.join("info.xml"));
        touch(&fomod.join("ModuleConfig.xml"));

        let files = find_installer_files(&fomod).unwrap();
        assert_eq!(files.module_config, fomod.join("ModuleConfig.xml"));
    }

    #[test]
    fn test_case_insensitive_names() {
        let tmp = TempDir::new().unwrap();
        let fomod = tmp.path().join("FOMod");
        fs::create_dir(&fomod).unwrap();
        touch(&fomod.join("Info.xml"));
        touch(&fomod.join("moduleconfig.xml"));

        let files = find_installer_files(tmp.path()).unwrap();
        assert!(files.info.is_file());
        assert!(files.module_config.is_file());
        let name = files.module_config.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.eq_ignore_ascii_case("moduleconfig.xml"));
    }

    #[test]
    fn test_missing_module_config() {
        let tmp = TempDir::new().unwrap();
        let fomod = tmp.path().join("fomod");
        fs::create_dir(&fomod).unwrap();
        touch(&fomod.join("info.xml"));

        let err = find_installer_files(tmp.path()).unwrap_err();
        assert_eq!(err, ConfigError::NotFound { path: fomod.join("ModuleConfig.xml") });
    }

    #[test]
    fn test_no_fomod_folder() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            find_installer_files(tmp.path()),
            Err(ConfigError::NotFound { .. })
        ));
        assert!(find_installer_files(tmp.path().join("nope")).is_err());
    }
}
