use atty::Stream;
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use msync_core::{process_rebuild_request, process_update_request, Settings};
use msync_domain::{
    RebuildBatchResult, RebuildRequest, SourceResultType, UpdateBatchResult, UpdateRequest,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod cli;
mod style;

use cli::{CommandGroupCli, MsyncCli};
use style::Style;

const LOG_ENV: &str = "MSYNC_LOG";

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = MsyncCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| eyre!("failed to start async runtime: {err}"))?;
    let outcome = runtime.block_on(execute(&cli.command));
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "msync={level},msync_core={level},msync_domain={level}"
        ))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

enum Outcome {
    Update(UpdateBatchResult),
    Rebuild(RebuildBatchResult),
}

impl Outcome {
    fn overall_result(&self) -> SourceResultType {
        match self {
            Self::Update(batch) => batch.overall_result(),
            Self::Rebuild(result) => result.overall_result(),
        }
    }

    fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Self::Update(batch) => serde_json::to_value(batch),
            Self::Rebuild(result) => serde_json::to_value(result),
        }
    }
}

async fn execute(command: &CommandGroupCli) -> Outcome {
    let settings = load_settings();
    match command {
        CommandGroupCli::Update(args) => {
            let Some(settings) = settings else {
                return Outcome::Update(UpdateBatchResult::error());
            };
            let request = UpdateRequest {
                operation_id: args.operation_id.clone(),
                commits: args.commits.clone(),
            };
            Outcome::Update(process_update_request(&settings, &request).await)
        }
        CommandGroupCli::Rebuild(args) => {
            let Some(settings) = settings else {
                return Outcome::Rebuild(RebuildBatchResult::error());
            };
            let request = RebuildRequest {
                operation_id: args.operation_id.clone(),
                reference: args.reference.clone(),
                reference_type: args.reference_type.into(),
            };
            Outcome::Rebuild(process_rebuild_request(&settings, &request).await)
        }
    }
}

fn load_settings() -> Option<Settings> {
    match Settings::from_env() {
        Ok(settings) => Some(settings),
        Err(err) => {
            let reason = format!("{err:#}");
            tracing::error!(error = %reason, "invalid configuration");
            None
        }
    }
}

fn emit_output(cli: &MsyncCli, outcome: &Outcome) -> Result<i32> {
    let overall = outcome.overall_result();
    let code = match overall {
        SourceResultType::Success => 0,
        SourceResultType::Failure | SourceResultType::FailureNoRetry => 1,
        SourceResultType::Error => 2,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.to_json()?)?);
        return Ok(code);
    }
    if cli.quiet {
        return Ok(code);
    }

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    match outcome {
        Outcome::Update(batch) => {
            let message = format!(
                "update {}: {} of {} commits succeeded",
                verb(overall),
                batch.succeeded_commits(),
                batch.commit_results().len()
            );
            println!("{}", style.status(overall, &message));
            for result in batch.commit_results() {
                let line = if result.metadata().is_empty() {
                    format!("  {}: {}", result.commit_id(), result.result())
                } else {
                    format!(
                        "  {}: {} ({})",
                        result.commit_id(),
                        result.result(),
                        result.metadata()
                    )
                };
                println!("{}", style.info(&line));
            }
        }
        Outcome::Rebuild(_) => {
            println!("{}", style.status(overall, &format!("rebuild {}", verb(overall))));
        }
    }
    Ok(code)
}

fn verb(result: SourceResultType) -> &'static str {
    match result {
        SourceResultType::Success => "finished",
        SourceResultType::Failure | SourceResultType::FailureNoRetry => "failed",
        SourceResultType::Error => "aborted",
    }
}
