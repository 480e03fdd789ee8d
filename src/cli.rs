use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ldap-group-cleanup")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Remove members that no longer exist from LDAP groups", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Cleanup run
// ============================================================================

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Directory host or URL (ldap://host:389, ldaps://host)
    #[arg(short = 'H', long, env = "LDAP_HOST")]
    pub host: Option<String>,

    /// Identity to bind as
    #[arg(short = 'D', long, env = "LDAP_BIND_DN")]
    pub bind_dn: Option<String>,

    /// Bind password (prompted when not given)
    #[arg(short = 'w', long, env = "LDAP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Base DN for principal and group searches
    #[arg(short = 'b', long, env = "LDAP_BASE_DN")]
    pub base_dn: Option<String>,

    /// Config file (default: ~/.config/ldap-group-cleanup/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Filter selecting every existing principal
    #[arg(long)]
    pub principal_filter: Option<String>,

    /// Filter selecting the groups to clean
    #[arg(long)]
    pub group_filter: Option<String>,

    /// Attribute holding group members
    #[arg(long)]
    pub member_attribute: Option<String>,

    /// Do not upgrade the connection with StartTLS
    #[arg(long)]
    pub no_starttls: bool,

    /// Connection timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show what would be removed without prompting or writing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Abort when the principal search fails instead of treating every member as stale
    #[arg(long)]
    pub strict_principals: bool,
}
