//! Console rendering of run events

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use reconcile::{
    AttributeChange, ConfirmationMode, Decision, Group, MembershipPartition, ModifyOutcome,
    Outcome, PLACEHOLDER_MEMBER, Reporter, Response, RunSummary, SearchError,
};
use std::io::{self, Write};
use std::time::Duration;

use crate::ui;

/// Longest description shown next to a group
const DESCRIPTION_WIDTH: usize = 60;

/// Prints every run event to the terminal
pub struct ConsoleReporter {
    verbose: u8,
    quiet: bool,
    spinner: Option<ProgressBar>,
    /// Prompt line for the group being confirmed, re-shown after a bad key
    prompt: Option<String>,
}

impl ConsoleReporter {
    pub fn new(verbose: u8, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            spinner: None,
            prompt: None,
        }
    }

    /// Show a spinner until the group search returns
    pub fn loading(&mut self, msg: &str) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    fn stop_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn show_prompt(&self) {
        if let Some(prompt) = &self.prompt {
            print!("{prompt} ");
            let _ = io::stdout().flush();
        }
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

impl Reporter for ConsoleReporter {
    fn on_principals_loaded(&mut self, count: usize) {
        info!("Loaded {count} principals");
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{} found, loading groups", ui::plural(count, "principal")));
        }
    }

    fn on_principal_search_failed(&mut self, error: &SearchError, degraded: bool) {
        self.stop_spinner();
        if !degraded {
            debug!("Principal search failed, aborting: {error}");
            return;
        }
        for line in degraded_warning(error) {
            ui::warn(&line);
        }
    }

    fn on_groups_loaded(&mut self, count: usize) {
        self.stop_spinner();
        info!("Loaded {count} groups");
        if !self.quiet {
            ui::info(&format!("Checking {}", ui::plural(count, "group")));
        }
    }

    fn on_group_search_failed(&mut self, error: &SearchError) {
        self.stop_spinner();
        ui::warn(&format!("Group search failed, no groups processed: {error}"));
    }

    fn on_group_clean(&mut self, group: &Group, partition: &MembershipPartition) {
        debug!("{} is clean ({} members)", group.dn, partition.total());
        if self.verbose > 0 && !self.quiet {
            ui::dim(&format!(
                "{}: {} clean",
                group_title(group),
                ui::plural(partition.total(), "member")
            ));
        }
    }

    fn on_group_stale(&mut self, group: &Group, partition: &MembershipPartition) {
        ui::header(&group_title(group));
        ui::kv("dn", &group.dn);
        if let Some(description) = &group.description {
            ui::kv("description", &ui::truncate(description, DESCRIPTION_WIDTH));
        }
        ui::kv("kept", &ui::plural(partition.keep.len(), "member"));
        ui::kv("stale", &ui::plural(partition.remove.len(), "member"));
        for member in &partition.remove {
            println!("    {} {}", "-".red(), member);
        }
        if partition.empties_group() {
            ui::warn(&format!(
                "No member would remain; {PLACEHOLDER_MEMBER} will be added first"
            ));
        }
    }

    fn on_prompt(&mut self, group: &Group) {
        self.prompt = Some(prompt_line(group));
        self.show_prompt();
    }

    fn on_invalid_key(&mut self, key: char) {
        ui::warn(&format!("'{}' is not an answer, use {}", key.escape_default(), Response::KEYS));
        self.show_prompt();
    }

    fn on_decision(&mut self, group: &Group, decision: Decision, mode: ConfirmationMode) {
        self.prompt = None;
        debug!("{}: {decision:?} (mode {mode:?})", group.dn);
        if decision == Decision::Skip {
            ui::dim(&format!("Skipped {}", group_title(group)));
        } else if !mode.prompts() {
            ui::dim("Applying (all)");
        }
    }

    fn on_modify(&mut self, group: &Group, change: &AttributeChange, outcome: &ModifyOutcome) {
        if outcome.is_success() {
            ui::success(&modify_line(group, change));
        } else {
            warn!("{} on {} rejected: {}", change.verb(), group.dn, outcome.code);
            ui::error(&format!(
                "{} failed: {} ({})",
                modify_line(group, change),
                outcome.description,
                outcome.code
            ));
        }
    }

    fn on_group_done(&mut self, group: &Group, outcome: Outcome) {
        debug!("{}: {outcome:?}", group.dn);
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.stop_spinner();
        if self.quiet {
            return;
        }
        print_summary(summary);
    }
}

fn degraded_warning(error: &SearchError) -> Vec<String> {
    vec![
        format!("{}: {error}", "Principal search failed".yellow().bold()),
        "Searches are not paged; a server size limit on the principal filter is the usual cause"
            .to_string(),
        format!(
            "Every member except {PLACEHOLDER_MEMBER} will be treated as stale. Answer carefully."
        ),
    ]
}

/// Label of a group, falling back to its DN
fn group_title(group: &Group) -> String {
    group.label.clone().unwrap_or_else(|| group.dn.clone())
}

fn prompt_line(group: &Group) -> String {
    format!(
        "Clean up {}? {}",
        group_title(group).bold(),
        Response::KEYS.dimmed()
    )
}

fn modify_line(group: &Group, change: &AttributeChange) -> String {
    format!(
        "{} {} {} {}",
        change.verb(),
        ui::plural(change.values().len(), "value"),
        if matches!(change, AttributeChange::Add { .. }) { "to" } else { "from" },
        group_title(group)
    )
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Examined {}",
            "✓".green().bold(),
            ui::plural(summary.total(), "group")
        );
    } else {
        println!(
            "  {} Examined {}, some writes were rejected",
            "⚠".yellow().bold(),
            ui::plural(summary.total(), "group")
        );
    }

    if summary.no_action > 0 {
        println!("    • {} clean", summary.no_action);
    }
    if summary.would_apply > 0 {
        println!("    • {} would be cleaned (dry run)", summary.would_apply);
    }
    if summary.applied > 0 {
        println!("    • {} cleaned", summary.applied);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.applied_with_errors > 0 {
        println!("    • {} {}", summary.applied_with_errors, "with errors".red());
    }
    if summary.members_removed > 0 {
        println!("    • {} removed", ui::plural(summary.members_removed, "member"));
    }
    if summary.principals_degraded {
        println!("    • {}", "no principals known, every member was treated as stale".yellow());
    }
}
