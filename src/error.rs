#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(
        "insufficient samples: sample size {sample_size} cannot support {parameters} estimated parameters"
    )]
    InsufficientSamples { sample_size: u64, parameters: u64 },
    #[error("no file extension")]
    NoFileExtension,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("invalid cell in column {column} on row {row}: {value}")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("no input file found (expected {0} or {1})")]
    MissingInput(String, String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xlsx read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
}
