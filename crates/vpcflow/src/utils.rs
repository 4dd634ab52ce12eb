use colored::Colorize;
use std::path::{Path, PathBuf};
use vpcflow_cloud::{ActionType, Plan, ProvisionedResource};
use vpcflow_core::{Overrides, ProvisionConfig};

/// 設定ファイルを決定する（--config 指定 → 自動検出）
pub fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(anyhow::anyhow!(
            "設定ファイルが見つかりません: {}",
            path.display()
        )),
        None => Ok(vpcflow_config::find_config_file()?),
    }
}

/// 設定ファイルを読み込み、上書き値を適用して検証する
pub fn load_config(
    explicit: Option<&Path>,
    overrides: &Overrides,
) -> anyhow::Result<(PathBuf, ProvisionConfig)> {
    let path = resolve_config_path(explicit)?;
    let config = vpcflow_core::load_config(&path, overrides)?;
    Ok((path, config))
}

/// 読み込んだ設定ファイルを表示
pub fn print_loaded_config_file(path: &Path) {
    println!("📄 設定ファイル: {}", path.display().to_string().cyan());
}

pub fn region_label(config: &ProvisionConfig) -> String {
    config
        .region
        .clone()
        .unwrap_or_else(|| "(AWSのデフォルト設定)".to_string())
}

/// 構築内容の概要
pub fn print_config_summary(config: &ProvisionConfig) {
    let network = &config.network;
    println!("  プロジェクト: {}", config.project.cyan());
    println!("  リージョン:   {}", region_label(config));
    println!("  VPC:          {}", config.vpc_id.cyan());
    println!("  パブリック:   {}", network.public_subnets.join(", "));
    println!("  プライベート: {}", network.private_subnets.join(", "));
    if !network.zones.is_empty() {
        println!("  ゾーン:       {}", network.zones.join(", "));
    }
    println!(
        "  インスタンス: {} (AMI: {} / {})",
        config.instance.instance_type, config.instance.image.owner, config.instance.image.name
    );
    if let Some(key_name) = &config.instance.key_name {
        println!("  キーペア:     {}", key_name);
    }
    println!(
        "  ポート:       {} → {}",
        config.app.listener_port, config.app.port
    );
    if let Some(ssh) = &config.ssh {
        println!("  SSH許可:      {}", ssh.allow_cidr);
    }
}

pub fn action_label(action: ActionType) -> colored::ColoredString {
    let label = format!("{:<9}", action.to_string());
    match action {
        ActionType::Create => label.green(),
        ActionType::Lookup | ActionType::Prepare => label.blue(),
        ActionType::Reuse => label.cyan(),
        ActionType::Wait => label.yellow(),
        _ => label.magenta(),
    }
}

/// 手順の一覧を表示
pub fn print_plan(plan: &Plan) {
    for (index, step) in plan.steps.iter().enumerate() {
        let marker = if step.conditional { " *" } else { "" };
        println!(
            "  {:>2}. {} {}{}",
            index + 1,
            action_label(step.action_type),
            step.description,
            marker.dimmed()
        );
    }
    println!();
    println!("  {}", plan.summary().to_string().bold());
    if plan.steps.iter().any(|s| s.conditional) {
        println!(
            "  {}",
            "* VPCにインターネットゲートウェイが既にある場合はスキップ".dimmed()
        );
    }
}

/// リソース一覧の1行
pub fn print_resource(resource: &ProvisionedResource) {
    let name = resource.name.as_deref().unwrap_or("-");
    let reused = if resource.reused { " (既存)" } else { "" };
    println!(
        "  {:<24} {} {}{}",
        resource.kind.to_string(),
        resource.id.cyan(),
        name.dimmed(),
        reused.yellow()
    );
}
