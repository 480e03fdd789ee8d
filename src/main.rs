mod cli;
mod config;
mod ldap;
mod report;
mod terminal;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::{FileConfig, Settings};
use reconcile::{ProcessOptions, RunSettings};
use std::io;
use std::process::ExitCode;

/// Exit status for configuration and credential problems
const CONFIG_ERROR: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Some(Command::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ldap-group-cleanup", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(&cli.run) {
        Ok(settings) => settings,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            return ExitCode::from(CONFIG_ERROR);
        }
    };

    let run_settings = match run_settings(settings.clone()) {
        Ok(run_settings) => run_settings,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            return ExitCode::from(CONFIG_ERROR);
        }
    };

    let mut directory = ldap::LdapDirectory::new(&settings.url, settings.starttls, settings.timeout);
    let mut keys = terminal::TerminalKeys::new();

    let result = {
        let mut reporter = report::ConsoleReporter::new(cli.verbose, cli.quiet);
        reporter.loading(&format!("Connecting to {}", settings.url));
        reconcile::run(&mut directory, &mut keys, &mut reporter, &run_settings)
    };

    match result {
        // Rejected writes are in the summary, not the exit status
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

/// Merge flags, environment and the config file
fn load_settings(args: &cli::RunArgs) -> Result<Settings> {
    let file = FileConfig::load(args.config.as_deref())?;
    Ok(Settings::resolve(args, file)?)
}

/// Build the core settings, prompting for the password when none was given
fn run_settings(settings: Settings) -> Result<RunSettings> {
    let bind_secret = match settings.password {
        Some(password) => password,
        None => terminal::prompt_password(&settings.bind_dn)?,
    };

    Ok(RunSettings {
        bind_dn: settings.bind_dn,
        bind_secret,
        base_dn: settings.base_dn,
        principal_filter: settings.principal_filter,
        group_filter: settings.group_filter,
        strict_principals: settings.strict_principals,
        process: ProcessOptions {
            dry_run: settings.dry_run,
            attributes: settings.attributes,
        },
    })
}
