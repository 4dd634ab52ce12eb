use crate::utils::action_label;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use vpcflow_cloud::{ActionType, CloudError, ProvisionObserver, ProvisionedResource, Step};

/// 手順ごとの進捗をターミナルに表示する
///
/// 待機ステップの間だけスピナーを出す。
pub struct ConsoleObserver {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("  {spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(pb);
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock()
            && let Some(pb) = spinner.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl ProvisionObserver for ConsoleObserver {
    fn step_started(&self, step: &Step) {
        if step.action_type == ActionType::Wait {
            self.start_spinner(&step.description);
        }
    }

    fn step_completed(&self, step: &Step, resource: Option<&ProvisionedResource>) {
        self.clear_spinner();

        match resource {
            Some(resource) if resource.reused => println!(
                "  {} {} {} {}",
                "↺".cyan(),
                action_label(ActionType::Reuse),
                step.description,
                resource.id.cyan()
            ),
            Some(resource) => println!(
                "  {} {} {} {}",
                "✓".green(),
                action_label(step.action_type),
                step.description,
                resource.id.cyan()
            ),
            None => println!(
                "  {} {} {}",
                "✓".green(),
                action_label(step.action_type),
                step.description
            ),
        }
    }

    fn step_skipped(&self, step: &Step) {
        println!(
            "  {} {}",
            "-".dimmed(),
            format!("{} (既存のゲートウェイを使用)", step.description).dimmed()
        );
    }

    fn step_failed(&self, step: &Step, _error: &CloudError) {
        self.clear_spinner();
        println!(
            "  {} {} {}",
            "✗".red(),
            action_label(step.action_type),
            step.description.red()
        );
    }
}
