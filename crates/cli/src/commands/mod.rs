//! CLI command definitions and execution
//!
//! `du` and `parts` share the listing arguments and the setup that turns a
//! remote path into a connected client; `profile` and `completions` work
//! on local state only.

use std::future::Future;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ossdu_core::{
    ConfigManager, Defaults, KeyEncoding, ListQuery, ProfileManager, RemotePath, RequestPayer,
    UsageAggregator, parse_remote_path,
};
use ossdu_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod completions;
mod du;
mod parts;
mod profile;

/// ossdu - storage usage for S3-compatible object storage
///
/// Totals the space used under a bucket prefix, including the parts of
/// multipart uploads that were started but never completed.
#[derive(Parser, Debug)]
#[command(name = "ossdu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show storage used by objects and incomplete uploads under a prefix
    Du(du::DuArgs),

    /// List every part of every incomplete multipart upload under a prefix
    Parts(parts::PartsArgs),

    /// Manage endpoint profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Du(args) => du::execute(args, output_config).await,
        Commands::Parts(args) => parts::execute(args, output_config).await,
        Commands::Profile(cmd) => profile::execute(cmd, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Arguments shared by the commands that list a bucket
#[derive(clap::Args, Debug)]
pub struct ListingArgs {
    /// Remote path (profile/bucket[/prefix])
    pub path: String,

    /// Who pays for requests on a requester-pays bucket: requester or bucketowner
    #[arg(long)]
    pub payer: Option<String>,

    /// Concurrent part-listing workers (default: config, then one per CPU)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Skip uploads that complete or abort while their parts are being listed
    #[arg(long, default_value = "false")]
    pub ignore_missing_uploads: bool,

    /// Encoding of object keys in the path and in output: url
    #[arg(long)]
    pub encoding_type: Option<String>,
}

/// A remote path resolved against the config file
pub(crate) struct Target {
    pub path: RemotePath,
    pub encoding: Option<KeyEncoding>,
    pub query: ListQuery,
    pub defaults: Defaults,
    pub client: Arc<S3Client>,
}

impl ListingArgs {
    /// Parse the path and payer, look up the profile and build a client
    pub(crate) async fn connect(&self) -> ossdu_core::Result<Target> {
        let encoding = self.key_encoding()?;
        let path = parse_remote_path(&self.path)?.decode_prefix(encoding)?;
        let payer = self
            .payer
            .as_deref()
            .map(str::parse::<RequestPayer>)
            .transpose()?;

        let config_manager = ConfigManager::new()?;
        let defaults = config_manager.load()?.defaults;
        let profile = ProfileManager::with_config_manager(config_manager).get(&path.profile)?;

        let client = S3Client::new(profile).await?;
        let query = ListQuery::new(&path.bucket, &path.prefix).with_payer(payer);

        Ok(Target {
            path,
            encoding,
            query,
            defaults,
            client: Arc::new(client),
        })
    }

    pub(crate) fn key_encoding(&self) -> ossdu_core::Result<Option<KeyEncoding>> {
        self.encoding_type.as_deref().map(str::parse).transpose()
    }

    /// Worker count: the flag, else the config default
    pub(crate) fn worker_count(&self, defaults: &Defaults) -> usize {
        match self.workers {
            Some(n) if n > 0 => n,
            _ => defaults.effective_workers(),
        }
    }

    pub(crate) fn aggregator(&self, target: &Target) -> UsageAggregator {
        UsageAggregator::new(target.client.clone())
            .workers(self.worker_count(&target.defaults))
            .ignore_missing_uploads(self.ignore_missing_uploads)
    }
}

/// Run `work` to completion unless Ctrl-C arrives first
///
/// Returns `None` on interrupt. The work future is dropped, and any tasks
/// it spawned are left to die with the process.
pub(crate) async fn until_interrupted<T>(work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        Ok(()) = tokio::signal::ctrl_c() => None,
    }
}
