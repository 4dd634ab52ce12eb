use colored::Colorize;
use std::path::{Path, PathBuf};
use vpcflow_config::DEFAULT_CONFIG_FILE;

pub const INIT_TEMPLATE: &str = r#"// vpcflow 設定ファイル
//
// vpcflow plan     実行される手順を確認
// vpcflow up       リソースを作成

// リソース名のプレフィックス（英数字とハイフン、28文字まで）
project "myapp"

// 省略時は AWS_REGION / プロファイル、それもなければ us-east-1
region "us-east-1"

// 既存のVPC
vpc "vpc-0123456789abcdef0"

network {
    public "10.0.1.0/24" "10.0.2.0/24"
    private "10.0.3.0/24" "10.0.4.0/24"
    // zones "us-east-1a" "us-east-1b"
}

instance {
    type "t2.micro"
    // key-name "my-key"
    image {
        owner "amazon"
        name "amzn2-ami-hvm-*-x86_64-gp2"
    }
    // user-data-file "bootstrap.sh"
}

app {
    port 80
    listener-port 80
    health-check "/"
}

// ssh {
//     allow "203.0.113.0/24"
// }

wait {
    nat-gateway 600
    instance 600
}
"#;

/// 書き込み先を決める（ディレクトリ指定時は vpcflow.kdl を付ける）
fn target_path(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if path.is_dir() {
        Ok(path.join(DEFAULT_CONFIG_FILE))
    } else {
        Ok(path)
    }
}

pub fn handle(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = target_path(path)?;

    if target.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} は既に存在します（上書きするには --force）",
            target.display()
        ));
    }

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, INIT_TEMPLATE)?;

    println!("{}", "✓ 設定ファイルを作成しました！".green());
    println!("  {}", target.display().to_string().cyan());
    println!();
    println!("{}", "vpc と project を編集してから実行してください:".bold());
    println!("  {} plan", "vpcflow".cyan());
    println!("  {} up", "vpcflow".cyan());
    Ok(())
}
