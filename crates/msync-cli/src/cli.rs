use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use msync_domain::ReferenceType;

pub const MSYNC_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nCommands:\n{subcommands}\n\nGlobal options:\n{options}\n";

pub const MSYNC_BEFORE_HELP: &str = concat!(
    "msync ",
    env!("CARGO_PKG_VERSION"),
    " – Keep a package catalog in sync with its manifest repository\n\n",
    "Configuration is read from MSYNC_* environment variables:\n",
    "  MSYNC_CATALOG_ENDPOINT, MSYNC_FUNCTION_KEY    catalog service and its key\n",
    "  MSYNC_GITHUB_REPOSITORY, MSYNC_GITHUB_TOKEN   manifest repository (owner/name)\n",
    "  MSYNC_MANIFEST_CACHE_ENDPOINT                 manifest documents used by rebuild\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "msync",
    author,
    version,
    disable_help_subcommand = true,
    before_help = MSYNC_BEFORE_HELP,
    help_template = MSYNC_HELP_TEMPLATE
)]
pub struct MsyncCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (logs still go to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(long, help = "Print the result as JSON", global = true)]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Replay commits from the manifest repository against the catalog",
        override_usage = "msync update --operation-id ID COMMIT...",
        after_help = "Examples:\n  msync update --operation-id run-42 3f2a9c1 8b0d4e7\n  msync update --operation-id run-43 --json 3f2a9c1"
    )]
    Update(UpdateArgs),
    #[command(
        about = "Rebuild the catalog from an index snapshot",
        override_usage = "msync rebuild --operation-id ID --reference URL [--reference-type TYPE]",
        after_help = "Examples:\n  MSYNC_INDEX_REFERENCE=https://... msync rebuild --operation-id run-44\n  msync rebuild --operation-id run-45 --reference https://... --reference-type modify"
    )]
    Rebuild(RebuildArgs),
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long, value_name = "ID", help = "Identifier attached to every log line")]
    pub operation_id: String,
    #[arg(
        value_name = "COMMIT",
        required = true,
        help = "Commits to process, oldest first"
    )]
    pub commits: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RebuildArgs {
    #[arg(long, value_name = "ID", help = "Identifier attached to every log line")]
    pub operation_id: String,
    #[arg(
        long,
        value_name = "URL",
        env = "MSYNC_INDEX_REFERENCE",
        hide_env_values = true,
        help = "Download URL of the index snapshot"
    )]
    pub reference: String,
    #[arg(long, value_enum, default_value_t = ReferenceTypeArg::Add)]
    pub reference_type: ReferenceTypeArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceTypeArg {
    Add,
    Modify,
    Delete,
}

impl From<ReferenceTypeArg> for ReferenceType {
    fn from(value: ReferenceTypeArg) -> Self {
        match value {
            ReferenceTypeArg::Add => Self::Add,
            ReferenceTypeArg::Modify => Self::Modify,
            ReferenceTypeArg::Delete => Self::Delete,
        }
    }
}
