//! parts command - Every part of every incomplete upload under a prefix
//!
//! Rows are printed as the workers list them, so their order across
//! uploads is not stable. The totals line comes last.

use std::sync::{Arc, Mutex, Once};

use clap::Args;
use ossdu_core::{
    AggregationTotals, KeyEncoding, PartRecord, PendingUpload, RemotePath, UsageObserver,
};
use serde::Serialize;

use super::{ListingArgs, until_interrupted};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar, format_mib};

/// List the parts of incomplete multipart uploads
#[derive(Args, Debug)]
pub struct PartsArgs {
    #[command(flatten)]
    pub listing: ListingArgs,
}

/// One part, as printed or serialized
#[derive(Debug, Clone, PartialEq, Serialize)]
struct PartRow {
    part_number: i32,
    upload_id: String,
    size: i64,
    path: String,
}

/// Output structure for parts command (JSON format)
#[derive(Debug, Serialize)]
struct PartsOutput {
    path: String,
    parts: Vec<PartRow>,
    upload_count: i64,
    total_part_count: i64,
    total_part_size_bytes: i64,
    total_part_size_mib: String,
}

/// Prints (or, in JSON mode, collects) parts as they are listed
struct PartPrinter {
    path: RemotePath,
    encoding: Option<KeyEncoding>,
    bar: ProgressBar,
    formatter: Formatter,
    header: Once,
    rows: Mutex<Vec<PartRow>>,
}

impl PartPrinter {
    fn new(
        path: RemotePath,
        encoding: Option<KeyEncoding>,
        bar: ProgressBar,
        formatter: Formatter,
    ) -> Self {
        Self {
            path,
            encoding,
            bar,
            formatter,
            header: Once::new(),
            rows: Mutex::new(Vec::new()),
        }
    }

    fn display_path(&self, key: &str) -> String {
        match self.encoding {
            Some(encoding) => self.path.object_path(&encoding.encode(key)),
            None => self.path.object_path(key),
        }
    }

    fn take_rows(&self) -> Vec<PartRow> {
        std::mem::take(&mut *self.rows.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl UsageObserver for PartPrinter {
    fn parts_listed(
        &self,
        upload: &PendingUpload,
        parts: &[PartRecord],
        totals: &AggregationTotals,
    ) {
        self.bar.set_message(format!(
            "part count:{}  part sum size:{}",
            totals.part_count, totals.part_sum_size
        ));

        let path = self.display_path(&upload.key);
        let rows = parts.iter().map(|part| PartRow {
            part_number: part.part_number,
            upload_id: upload.upload_id.clone(),
            size: part.size,
            path: path.clone(),
        });

        if self.formatter.is_json() {
            self.rows
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(rows);
            return;
        }
        if self.formatter.is_quiet() || parts.is_empty() {
            return;
        }

        self.header.call_once(|| self.bar.println(&header_line()));
        for row in rows {
            self.bar.println(&row_line(&row));
        }
    }
}

/// Execute the parts command
pub async fn execute(args: PartsArgs, output_config: OutputConfig) -> ExitCode {
    let target = match args.listing.connect().await {
        Ok(target) => target,
        Err(e) => {
            Formatter::new(output_config).error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };
    let formatter = Formatter::new(output_config.with_defaults(&target.defaults));

    let bar = ProgressBar::spinner(
        formatter.config(),
        &format!("listing parts under {}", target.path),
    );
    let printer = Arc::new(PartPrinter::new(
        target.path.clone(),
        target.encoding,
        bar.clone(),
        formatter.clone(),
    ));
    let aggregator = args.listing.aggregator(&target).observer(printer.clone());

    let outcome = until_interrupted(aggregator.aggregate(&target.query)).await;
    bar.finish_and_clear();

    let totals = match outcome {
        Some(Ok(totals)) => totals,
        Some(Err(e)) => {
            formatter.error(&format!("Failed to list parts under {}: {e}", target.path));
            return ExitCode::from_error(&e);
        }
        None => {
            formatter.warning("Interrupted");
            return ExitCode::Interrupted;
        }
    };

    if formatter.is_json() {
        formatter.json(&PartsOutput {
            path: target.path.to_string(),
            parts: printer.take_rows(),
            upload_count: totals.upload_count,
            total_part_count: totals.part_count,
            total_part_size_bytes: totals.part_sum_size,
            total_part_size_mib: format_mib(totals.part_sum_size),
        });
    } else {
        formatter.println(&format!("\n{}", totals_line(&totals)));
    }

    ExitCode::Success
}

fn header_line() -> String {
    format!(
        "{:<10}\t{:<32}\t{:<10}\t{}",
        "PartNumber", "UploadId", "Size(Byte)", "Path"
    )
}

fn row_line(row: &PartRow) -> String {
    format!(
        "{:<10}\t{:<32}\t{:<10}\t{}",
        row.part_number, row.upload_id, row.size, row.path
    )
}

fn totals_line(totals: &AggregationTotals) -> String {
    format!(
        "total part count:{}\ttotal part size(MB):{}",
        totals.part_count,
        format_mib(totals.part_sum_size)
    )
}
