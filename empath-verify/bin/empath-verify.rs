//! Command-line batch email verifier
//!
//! Reads a file of addresses, one per line, and sorts them into
//! `goodEmails.csv` and `badEmails.csv` with a `summary.txt` alongside.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use empath_verify::{
    CheckKind, HickoryDnsResolver, LogProgress, VerifyConfig, report::render_summary,
};

/// Batch email address verifier
#[derive(Parser, Debug)]
#[command(name = "empath-verify")]
#[command(about = "Verify a list of email addresses", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (RON). Defaults to $EMPATH_VERIFY_CONFIG, then
    /// ./empath-verify.config.ron
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to write results into, overriding the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Checks to run, in order, overriding the configuration
    #[arg(long, value_enum, num_args = 1.., value_delimiter = ',')]
    checks: Option<Vec<CheckKind>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate every address in a file
    ValidateEmails {
        /// File with one address per line
        file: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    empath_common::logging::init();

    let cli = Cli::parse();
    let mut config = VerifyConfig::load(cli.config.as_deref())?;

    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(checks) = cli.checks {
        config.checks = checks;
    }

    match cli.command {
        Commands::ValidateEmails { file } => {
            let resolver = HickoryDnsResolver::new(config.dns.clone())
                .context("Failed to initialise DNS resolver")?;

            let stats = empath_verify::verify_file(
                &config,
                &file,
                Arc::new(resolver),
                &mut LogProgress::new(),
            )
            .await?;

            print!("{}", render_summary(&stats));
        }
    }

    Ok(())
}
