use std::{
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

use calamine::{open_workbook, Data, Reader, Xlsx};
use serde::Serialize;

use crate::{Error, Evaluation, InputRecord, OutputRecord, RegressionType};

/// Output column order, shared by the CSV and XLSX writers. `num_preditor`
/// is the canonical external spelling and must stay as is.
pub const OUTPUT_COLUMNS: [&str; 14] = [
    "coefficient",
    "std_error",
    "sample_size",
    "significant_level",
    "regression_type",
    "num_preditor",
    "t_statistic",
    "degrees_of_freedom",
    "p_value",
    "is_significant",
    "ci_lower",
    "ci_upper",
    "margin_of_error",
    "error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Xlsx,
    Json,
}

/// A tabular file holding input records or results, typed by extension.
#[derive(Clone, Debug, PartialEq)]
pub struct File {
    path: PathBuf,
    file_type: FileType,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            file_type,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(Error::NoFileExtension)?;
        let file_type = match ext.to_ascii_lowercase().as_str() {
            "csv" => FileType::Csv,
            "xlsx" => FileType::Xlsx,
            "json" => FileType::Json,
            other => return Err(Error::UnsupportedFileType(other.to_string())),
        };
        Ok(Self { path, file_type })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn read_records(&self) -> Result<Vec<InputRecord>, Error> {
        match self.file_type {
            FileType::Csv => self.read_csv(),
            FileType::Xlsx => self.read_xlsx(),
            FileType::Json => {
                let file = std::fs::File::open(&self.path)?;
                Ok(serde_json::from_reader(BufReader::new(file))?)
            },
        }
    }

    pub fn write_records(&self, records: &[OutputRecord]) -> Result<(), Error> {
        match self.file_type {
            FileType::Csv => self.write_csv(records),
            FileType::Xlsx => self.write_xlsx(records),
            FileType::Json => self.write_json(records),
        }
    }

    fn read_csv(&self) -> Result<Vec<InputRecord>, Error> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    fn read_xlsx(&self) -> Result<Vec<InputRecord>, Error> {
        let mut workbook: Xlsx<BufReader<std::fs::File>> = open_workbook(&self.path)?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(Error::NoWorksheet)?;
        let range = workbook.worksheet_range(&sheet)?;
        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| missing("coefficient"))?;
        let column = |name: &str| {
            header
                .iter()
                .position(|c| matches!(c, Data::String(s) if s.trim().eq_ignore_ascii_case(name)))
        };
        let required = |name: &str| column(name).ok_or_else(|| missing(name));
        let coefficient = required("coefficient")?;
        let std_error = required("std_error")?;
        let sample_size = required("sample_size")?;
        let significant_level = required("significant_level")?;
        let regression_type = required("regression_type")?;
        let num_predictors = column("num_preditor");

        let empty = Data::Empty;
        let cell = |row: &[Data], i: usize| row.get(i).unwrap_or(&empty).clone();
        let mut records = Vec::new();
        for (i, row) in rows.enumerate() {
            // rows are 1-based and the header occupies the first
            let line = i + 2;
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            records.push(InputRecord {
                coefficient: cell_f64(&cell(row, coefficient), "coefficient", line)?,
                std_error: cell_f64(&cell(row, std_error), "std_error", line)?,
                sample_size: cell_u64(&cell(row, sample_size), "sample_size", line)?,
                significant_level: cell_f64(
                    &cell(row, significant_level),
                    "significant_level",
                    line,
                )?,
                regression_type: cell_regression_type(&cell(row, regression_type), line)?,
                num_predictors: match num_predictors.map(|i| cell(row, i)) {
                    None | Some(Data::Empty) => None,
                    Some(c) => Some(cell_u64(&c, "num_preditor", line)?),
                },
            });
        }
        Ok(records)
    }

    fn write_csv(&self, records: &[OutputRecord]) -> Result<(), Error> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(OUTPUT_COLUMNS)?;
        for record in records {
            writer.write_record(csv_row(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_xlsx(&self, records: &[OutputRecord]) -> Result<(), Error> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("results")?;
        for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name)?;
        }
        for (i, record) in records.iter().enumerate() {
            let row = (i + 1) as u32;
            let input = &record.input;
            sheet.write_number(row, 0, input.coefficient)?;
            sheet.write_number(row, 1, input.std_error)?;
            sheet.write_number(row, 2, input.sample_size as f64)?;
            sheet.write_number(row, 3, input.significant_level)?;
            sheet.write_string(row, 4, input.regression_type.as_str())?;
            if let Some(np) = input.num_predictors {
                sheet.write_number(row, 5, np as f64)?;
            }
            match &record.evaluation {
                Ok(e) => {
                    sheet.write_number(row, 6, e.t_statistic)?;
                    sheet.write_number(row, 7, e.degrees_of_freedom as f64)?;
                    sheet.write_number(row, 8, e.p_value)?;
                    sheet.write_boolean(row, 9, e.is_significant)?;
                    sheet.write_number(row, 10, e.ci_lower)?;
                    sheet.write_number(row, 11, e.ci_upper)?;
                    sheet.write_number(row, 12, e.margin_of_error)?;
                },
                Err(e) => {
                    sheet.write_string(row, 13, e.to_string())?;
                },
            }
        }
        workbook.save(&self.path)?;
        Ok(())
    }

    fn write_json(&self, records: &[OutputRecord]) -> Result<(), Error> {
        let rows = records
            .iter()
            .map(|r| ReportRow {
                input: &r.input,
                evaluation: r.evaluation.as_ref().ok(),
                error: r.evaluation.as_ref().err().map(|e| e.to_string()),
            })
            .collect::<Vec<_>>();
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &rows)?;
        Ok(())
    }
}

impl FromStr for File {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(flatten)]
    input: &'a InputRecord,
    #[serde(flatten)]
    evaluation: Option<&'a Evaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn csv_row(record: &OutputRecord) -> Vec<String> {
    let input = &record.input;
    let mut row = vec![
        input.coefficient.to_string(),
        input.std_error.to_string(),
        input.sample_size.to_string(),
        input.significant_level.to_string(),
        input.regression_type.to_string(),
        input.num_predictors.map(|np| np.to_string()).unwrap_or_default(),
    ];
    match &record.evaluation {
        Ok(e) => {
            row.extend([
                e.t_statistic.to_string(),
                e.degrees_of_freedom.to_string(),
                e.p_value.to_string(),
                e.is_significant.to_string(),
                e.ci_lower.to_string(),
                e.ci_upper.to_string(),
                e.margin_of_error.to_string(),
                String::new(),
            ]);
        },
        Err(e) => {
            row.extend(std::iter::repeat(String::new()).take(7));
            row.push(e.to_string());
        },
    }
    row
}

fn missing(name: &str) -> Error {
    Error::MissingColumn(name.to_string())
}

fn invalid_cell(column: &str, row: usize, value: &Data) -> Error {
    Error::InvalidCell {
        column: column.to_string(),
        row,
        value: format!("{value:?}"),
    }
}

fn cell_f64(cell: &Data, column: &str, row: usize) -> Result<f64, Error> {
    match cell {
        Data::Float(f) => Ok(*f),
        Data::Int(i) => Ok(*i as f64),
        Data::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid_cell(column, row, cell)),
        _ => Err(invalid_cell(column, row, cell)),
    }
}

fn cell_u64(cell: &Data, column: &str, row: usize) -> Result<u64, Error> {
    match cell {
        Data::Int(i) if *i >= 0 => Ok(*i as u64),
        // the upper bound keeps the cast from saturating
        Data::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64 => Ok(*f as u64),
        Data::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid_cell(column, row, cell)),
        _ => Err(invalid_cell(column, row, cell)),
    }
}

fn cell_regression_type(cell: &Data, row: usize) -> Result<RegressionType, Error> {
    match cell {
        Data::String(s) => s.parse(),
        // a boolean cell flags a multi-predictor regression
        Data::Bool(true) => Ok(RegressionType::Multiple),
        Data::Bool(false) => Ok(RegressionType::Simple),
        _ => Err(invalid_cell("regression_type", row, cell)),
    }
}
