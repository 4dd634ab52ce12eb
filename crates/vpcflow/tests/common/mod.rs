#![allow(deprecated)] // Command::cargo_bin

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const VALID_CONFIG: &str = r#"
project "myapp"
region "us-east-1"
vpc "vpc-0123456789abcdef0"
"#;

pub struct TestProject {
    pub root: TempDir,
    home: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            home: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("vpcflow.kdl"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// `vpcflow` をプロジェクトディレクトリで実行するコマンド
    ///
    /// 利用者の環境変数やグローバル設定の影響を受けないようにする。
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("vpcflow").unwrap();
        cmd.current_dir(self.root.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env_remove("VPCFLOW_CONFIG_PATH")
            .env_remove("VPCFLOW_REGION")
            .env_remove("VPCFLOW_VPC_ID")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}
