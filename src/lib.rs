mod calc;
mod error;
mod file;
mod record;

use std::path::Path;

use tracing::info;

pub use crate::{calc::*, error::*, file::*, record::*};

pub const INPUT_XLSX: &str = "sample_data.xlsx";
pub const INPUT_CSV: &str = "sample_data.csv";
pub const OUTPUT_CSV: &str = "sample_data_results.csv";
pub const OUTPUT_XLSX: &str = "sample_data_results.xlsx";
pub const OUTPUT_JSON: &str = "sample_data_results.json";

/// Run the full pipeline in `dir`: read the sample data (the xlsx if present,
/// otherwise the csv), evaluate every row, and write the results next to the
/// input in all three output formats.
pub fn run_pipeline_in(dir: &Path) -> Result<BatchSummary, Error> {
    let xlsx = dir.join(INPUT_XLSX);
    let csv = dir.join(INPUT_CSV);
    let input = if xlsx.exists() {
        File::new(xlsx, FileType::Xlsx)
    } else if csv.exists() {
        File::new(csv, FileType::Csv)
    } else {
        return Err(Error::MissingInput(
            INPUT_XLSX.to_string(),
            INPUT_CSV.to_string(),
        ));
    };
    info!("reading {}", input.path().display());
    let records = input.read_records()?;
    info!("read {} records", records.len());
    let results = evaluate_batch(records);
    let summary = summarize(&results);
    info!(
        "evaluated {} of {} rows, {} significant, {} failed",
        summary.evaluated, summary.total, summary.significant, summary.failed
    );
    for (name, file_type) in [
        (OUTPUT_CSV, FileType::Csv),
        (OUTPUT_XLSX, FileType::Xlsx),
        (OUTPUT_JSON, FileType::Json),
    ] {
        let output = File::new(dir.join(name), file_type);
        output.write_records(&results)?;
        info!("wrote {}", output.path().display());
    }
    Ok(summary)
}

/// Run the pipeline in the current directory.
pub fn run_default_pipeline() -> Result<BatchSummary, Error> {
    run_pipeline_in(Path::new("."))
}
