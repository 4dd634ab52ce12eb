use crate::utils;
use colored::Colorize;
use std::path::Path;
use vpcflow_core::Overrides;

pub fn handle(config_path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let path = match utils::resolve_config_path(config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定ファイルが見つかりません".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    utils::print_loaded_config_file(&path);

    match vpcflow_core::load_config(&path, overrides) {
        Ok(config) => {
            println!("{}", "✓ 設定ファイルは正常です！".green().bold());
            println!();
            println!("サマリー:");
            utils::print_config_summary(&config);
            if let Some(user_data) = &config.instance.user_data_file {
                println!("  ユーザーデータ: {}", user_data.display());
            }

            // テンプレートの展開エラーもここで検出する
            if let Err(e) = vpcflow_core::render_user_data(&config) {
                eprintln!();
                eprintln!("{}", "✗ ユーザーデータのエラー".red().bold());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
