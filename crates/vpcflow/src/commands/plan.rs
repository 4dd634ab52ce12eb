use crate::utils;
use colored::Colorize;
use std::path::Path;
use vpcflow_cloud::Plan;
use vpcflow_core::Overrides;

pub fn handle(config_path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<()> {
    let (path, config) = utils::load_config(config_path, overrides)?;
    utils::print_loaded_config_file(&path);

    let plan = Plan::for_config(&config);

    println!();
    println!(
        "{}",
        format!(
            "📋 {} / {} ({})",
            config.project,
            config.vpc_id,
            utils::region_label(&config)
        )
        .bold()
    );
    println!();
    utils::print_plan(&plan);
    println!();
    println!("{}", "実行するには: vpcflow up".dimmed());

    Ok(())
}
