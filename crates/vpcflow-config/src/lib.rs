pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "VPCFLOW_CONFIG_PATH";

/// 設定ファイル名（優先順）
pub const CONFIG_CANDIDATES: [&str; 4] = [
    "vpcflow.local.kdl",
    ".vpcflow.local.kdl",
    "vpcflow.kdl",
    ".vpcflow.kdl",
];

/// `vpcflow init` が生成するファイル名
pub const DEFAULT_CONFIG_FILE: &str = "vpcflow.kdl";

const PROJECT_DIR: &str = ".vpcflow";

/// ユーザー設定ディレクトリ (`~/.config/vpcflow`)
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("vpcflow"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// vpcflow.kdl を探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 VPCFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: vpcflow.local.kdl, .vpcflow.local.kdl, vpcflow.kdl, .vpcflow.kdl
/// 3. ./.vpcflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/vpcflow/vpcflow.kdl (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(ConfigError::EnvPathNotFound(config_path));
    }

    let current_dir = std::env::current_dir()?;
    let global_dir = get_config_dir().ok();
    find_config_file_in(&current_dir, global_dir.as_deref())
}

/// 指定ディレクトリを起点に設定ファイルを探す（環境変数は参照しない）
pub fn find_config_file_in(dir: &Path, global_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = first_existing(dir) {
        return Ok(path);
    }

    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_existing(&project_dir)
    {
        return Ok(path);
    }

    if let Some(global_dir) = global_dir {
        let global_config = global_dir.join(DEFAULT_CONFIG_FILE);
        if global_config.is_file() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        if let Ok(config_dir) = get_config_dir() {
            assert!(config_dir.ends_with("vpcflow"));
        }
    }

    #[test]
    fn test_find_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("vpcflow.kdl"), "// test").unwrap();

        let result = find_config_file_in(temp_dir.path(), None).unwrap();
        assert!(result.ends_with("vpcflow.kdl"));
    }

    #[test]
    fn test_local_file_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("vpcflow.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("vpcflow.local.kdl"), "// local").unwrap();

        let result = find_config_file_in(temp_dir.path(), None).unwrap();
        assert!(result.ends_with("vpcflow.local.kdl"));
    }

    #[test]
    fn test_hidden_local_before_visible() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(".vpcflow.local.kdl"), "// hidden local").unwrap();
        fs::write(temp_dir.path().join("vpcflow.kdl"), "// visible").unwrap();

        let result = find_config_file_in(temp_dir.path(), None).unwrap();
        assert!(result.ends_with(".vpcflow.local.kdl"));
    }

    #[test]
    fn test_find_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(".vpcflow");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("vpcflow.kdl"), "// in project dir").unwrap();

        let result = find_config_file_in(temp_dir.path(), None).unwrap();
        assert!(result.ends_with(".vpcflow/vpcflow.kdl"));
    }

    #[test]
    fn test_global_fallback() {
        let temp_dir = tempfile::tempdir().unwrap();
        let global_dir = tempfile::tempdir().unwrap();
        fs::write(global_dir.path().join("vpcflow.kdl"), "// global").unwrap();

        let result = find_config_file_in(temp_dir.path(), Some(global_dir.path())).unwrap();
        assert_eq!(result, global_dir.path().join("vpcflow.kdl"));
    }

    #[test]
    fn test_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_config_file_in(temp_dir.path(), None);
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), || {
            let result = find_config_file().unwrap();
            assert_eq!(result, config_path);
        });
    }

    #[test]
    #[serial]
    fn test_env_var_missing_file() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/nonexistent/vpcflow.kdl"), || {
            let result = find_config_file();
            assert!(matches!(result, Err(ConfigError::EnvPathNotFound(_))));
        });
    }
}
