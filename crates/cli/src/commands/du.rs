//! du command - Storage used under a prefix
//!
//! Counts objects (or every object version) and the parts of incomplete
//! multipart uploads, then prints a per-storage-class breakdown and the
//! combined total.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Args;
use comfy_table::{Table, presets};
use humansize::{BINARY, format_size};
use ossdu_core::{AggregationTotals, ObjectScope, StorageClassUsage, UsageReport};
use serde::Serialize;

use super::{ListingArgs, until_interrupted};
use crate::exit_code::ExitCode;
use crate::output::{BlockSize, Formatter, OutputConfig, ProgressBar, UsageProgress};

/// Show storage used under a prefix
#[derive(Args, Debug)]
pub struct DuArgs {
    #[command(flatten)]
    pub listing: ListingArgs,

    /// Count every stored version, not just current objects
    #[arg(long, default_value = "false")]
    pub all_versions: bool,

    /// Unit of the total: byte, KB, MB, GB or TB (default: config, then byte)
    #[arg(short = 'B', long)]
    pub block_size: Option<String>,
}

/// Output structure for du command (JSON format)
#[derive(Debug, Serialize)]
struct DuOutput<'a> {
    path: String,
    all_versions: bool,
    #[serde(flatten)]
    report: &'a UsageReport,
    total_size_bytes: i64,
    total_size_human: String,
}

/// Execute the du command
pub async fn execute(args: DuArgs, output_config: OutputConfig) -> ExitCode {
    // A bad -B is a usage error even when the profile cannot be resolved
    let flag_block_size = match parse_block_size(args.block_size.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            Formatter::new(output_config).error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let target = match args.listing.connect().await {
        Ok(target) => target,
        Err(e) => {
            Formatter::new(output_config).error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };
    let formatter = Formatter::new(output_config.with_defaults(&target.defaults));

    let block_size = match flag_block_size {
        Some(b) => b,
        None => match target.defaults.block_size.parse::<BlockSize>() {
            Ok(b) => b,
            Err(e) => {
                formatter.error(&e.to_string());
                return ExitCode::UsageError;
            }
        },
    };

    let scope = if args.all_versions {
        ObjectScope::AllVersions
    } else {
        ObjectScope::Current
    };

    let progress = Arc::new(UsageProgress::new(ProgressBar::spinner(
        formatter.config(),
        &format!("scanning {}", target.path),
    )));
    let aggregator = args.listing.aggregator(&target).observer(progress.clone());

    tracing::debug!(
        path = %target.path,
        workers = aggregator.worker_count(),
        ?scope,
        "starting du"
    );

    let outcome = until_interrupted(aggregator.disk_usage(&target.query, scope)).await;
    progress.bar().finish_and_clear();

    let report = match outcome {
        Some(Ok(report)) => report,
        Some(Err(e)) => {
            formatter.error(&format!("Failed to compute usage of {}: {e}", target.path));
            return ExitCode::from_error(&e);
        }
        None => {
            formatter.warning("Interrupted");
            return ExitCode::Interrupted;
        }
    };

    if formatter.is_json() {
        let total = report.totals.total_size();
        formatter.json(&DuOutput {
            path: target.path.to_string(),
            all_versions: args.all_versions,
            report: &report,
            total_size_bytes: total,
            total_size_human: format_size(total.max(0) as u64, BINARY),
        });
    } else {
        if !report.storage_classes.is_empty() {
            formatter.println(&render_storage_classes(&report.storage_classes));
        }
        formatter.println(&render_totals(&report.totals, block_size));
    }

    ExitCode::Success
}

fn parse_block_size(unit: Option<&str>) -> ossdu_core::Result<Option<BlockSize>> {
    unit.map(str::parse).transpose()
}

fn render_storage_classes(classes: &BTreeMap<String, StorageClassUsage>) -> String {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_HORIZONTAL_ONLY);
    table.set_header(vec!["storage class", "object count", "sum size(byte)"]);
    for (class, usage) in classes {
        table.add_row(vec![
            class.clone(),
            usage.count.to_string(),
            usage.size.to_string(),
        ]);
    }
    table.to_string()
}

fn render_totals(totals: &AggregationTotals, block_size: BlockSize) -> String {
    format!(
        "total object count: {}\n\
         total object sum size: {}\n\
         pending upload count: {}\n\
         total part count: {}\n\
         total part sum size: {}\n\
         \n\
         total du size({}): {}",
        totals.object_count,
        totals.object_sum_size,
        totals.upload_count,
        totals.part_count,
        totals.part_sum_size,
        block_size,
        block_size.format(totals.total_size()),
    )
}
