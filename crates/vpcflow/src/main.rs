mod commands;
mod progress;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vpcflow_core::Overrides;

#[derive(Parser)]
#[command(name = "vpcflow")]
#[command(about = "既存のVPCに、ロードバランサー付きWebサーバーを一度で構築する", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は自動検出）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// AWSリージョン（設定ファイルより優先）
    #[arg(long, env = "VPCFLOW_REGION", global = true)]
    region: Option<String>,

    /// 対象のVPC ID（設定ファイルより優先）
    #[arg(long, env = "VPCFLOW_VPC_ID", global = true)]
    vpc_id: Option<String>,

    /// リソース名のプレフィックス（設定ファイルより優先）
    #[arg(long, global = true)]
    project: Option<String>,

    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// リソースを作成（サブネット、NAT、インスタンス、ALB）
    Up {
        /// 確認プロンプトをスキップ
        #[arg(short = 'y', long)]
        yes: bool,
        /// 結果をJSONで出力（-y と併用）
        #[arg(long, requires = "yes")]
        json: bool,
    },
    /// 実行される手順を表示（APIは呼ばない）
    Plan,
    /// 設定を検証
    Validate,
    /// 設定ファイルのテンプレートを作成
    Init {
        /// 出力先（ファイルまたはディレクトリ。省略時はカレントディレクトリ）
        path: Option<PathBuf>,
        /// 既存のファイルを上書き
        #[arg(short, long)]
        force: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ（stdoutは結果表示とJSON出力に使う）
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = if cli.verbose {
        filter.add_directive(tracing::Level::DEBUG.into())
    } else {
        filter
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    // 設定ファイル不要なコマンド
    match &cli.command {
        Commands::Version => {
            println!("vpcflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Init { path, force } => {
            return commands::init::handle(path.as_deref(), *force);
        }
        _ => {}
    }

    let overrides = Overrides {
        project: cli.project.clone(),
        region: cli.region.clone(),
        vpc_id: cli.vpc_id.clone(),
    };

    match cli.command {
        Commands::Validate => commands::validate::handle(cli.config.as_deref(), &overrides),
        Commands::Plan => commands::plan::handle(cli.config.as_deref(), &overrides),
        Commands::Up { yes, json } => {
            commands::up::handle(cli.config.as_deref(), &overrides, yes, json).await
        }
        Commands::Version | Commands::Init { .. } => Ok(()),
    }
}
