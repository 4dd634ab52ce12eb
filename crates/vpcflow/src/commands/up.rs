use crate::progress::ConsoleObserver;
use crate::utils;
use colored::Colorize;
use std::io::Write;
use std::path::Path;
use vpcflow_cloud::{
    NetworkProvider, NoopObserver, ProvisionError, ProvisionObserver, ProvisionReport,
    Provisioner,
};
use vpcflow_cloud_aws::{AwsNetworkProvider, load_sdk_config};
use vpcflow_core::Overrides;

pub async fn handle(
    config_path: Option<&Path>,
    overrides: &Overrides,
    yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let (path, config) = utils::load_config(config_path, overrides)?;

    let sdk_config = load_sdk_config(config.region.clone()).await;
    let provider = AwsNetworkProvider::new(&sdk_config);

    let console = ConsoleObserver::new();
    let observer: &dyn ProvisionObserver = if json { &NoopObserver } else { &console };
    let provisioner = Provisioner::new(&provider, &config).with_observer(observer);

    if !json {
        utils::print_loaded_config_file(&path);
        println!();
        println!(
            "{}",
            format!(
                "📋 {} / {} ({})",
                config.project,
                config.vpc_id,
                provider.region()
            )
            .bold()
        );
        println!();
        utils::print_plan(provisioner.plan());
        println!();
    }

    if !yes && !confirm()? {
        println!("{}", "キャンセルしました。".yellow());
        return Ok(());
    }

    if !json {
        println!("{}", "🚀 構築を開始します...".blue());
        println!();
    }

    match provisioner.run().await {
        Ok(report) => {
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(err) => {
            print_failure(&err);
            Err(anyhow::anyhow!("構築に失敗しました: {}", err))
        }
    }
}

fn confirm() -> anyhow::Result<bool> {
    print!("この内容でリソースを作成しますか？ [y/N]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_report(report: &ProvisionReport) {
    println!();
    println!(
        "{} {}",
        "✓ 構築が完了しました！".green().bold(),
        format!("({:.1}秒)", report.duration_ms as f64 / 1000.0).dimmed()
    );
    println!();
    println!("  リージョン: {}", report.region);
    println!("  ゾーン:     {}", report.availability_zones.join(", "));
    if let Some(image_id) = &report.image_id {
        println!("  AMI:        {}", image_id);
    }
    println!();
    println!(
        "{}",
        format!("リソース ({} 個):", report.resources.len()).bold()
    );
    for resource in &report.resources {
        utils::print_resource(resource);
    }

    if let Some(endpoint) = &report.endpoint {
        println!();
        println!("🌐 エンドポイント: {}", endpoint.cyan().bold());
        println!(
            "{}",
            "   ヘルスチェックが通るまで数分かかることがあります".dimmed()
        );
    }
}

fn print_failure(err: &ProvisionError) {
    eprintln!();
    eprintln!("{}", format!("✗ {} で失敗しました", err.step).red().bold());
    eprintln!("  {}", err.source);

    if err.is_clean() {
        eprintln!();
        eprintln!("{}", "リソースは作成されていません。".green());
        return;
    }

    eprintln!();
    eprintln!(
        "{}",
        format!(
            "⚠ 作成済みのリソースが {} 個残っています（手動で削除してください）:",
            err.orphans().len()
        )
        .yellow()
    );
    for resource in err.orphans() {
        let name = resource.name.as_deref().unwrap_or("-");
        eprintln!("  {:<24} {} {}", resource.kind.to_string(), resource.id, name);
    }
}
