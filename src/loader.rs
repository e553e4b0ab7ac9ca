//! Survey source loading
//!
//! A survey can arrive in two encodings that carry the same codebook
//! fields: the curated Parquet table (primary) and the raw delimited-text
//! export (alternate). Both are read fully into Arrow record batches and
//! then flattened into [`RawRecord`]s without recoding any value.

use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use smallvec::SmallVec;

use crate::config::PipelineConfig;
use crate::error::util::safe_open_file;
use crate::error::{AnalysisError, Result};
use crate::models::{RawRecord, RawSurvey};
use crate::schema::SurveyColumns;
use crate::utils::{arrow_array_to_f64, arrow_array_to_string};

/// A fully read source table
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Schema shared by all batches
    pub schema: SchemaRef,
    /// Record batches in file order
    pub batches: Vec<RecordBatch>,
}

impl SourceTable {
    /// Total number of rows across batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

/// A readable survey source
pub trait RecordSource: Send + Sync {
    /// Path of the underlying file
    fn path(&self) -> &Path;

    /// Short name of the encoding, for logs and reports
    fn format_name(&self) -> &'static str;

    /// Read the whole table; the file is closed before returning
    fn read_table(&self) -> Result<SourceTable>;
}

/// Primary source: a Parquet file
#[derive(Debug, Clone)]
pub struct ParquetSource {
    path: PathBuf,
}

impl ParquetSource {
    /// Create a source for the given Parquet file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for ParquetSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "parquet"
    }

    fn read_table(&self) -> Result<SourceTable> {
        let file = safe_open_file(&self.path, "reading the primary survey table")?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut batches = Vec::new();
        for batch_result in reader {
            batches.push(batch_result?);
        }

        Ok(SourceTable { schema, batches })
    }
}

/// Alternate source: a delimited text file with a header row
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    path: PathBuf,
    delimiter: u8,
}

impl DelimitedSource {
    /// Create a source for the given text file and field separator
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }
}

impl RecordSource for DelimitedSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn format_name(&self) -> &'static str {
        "delimited"
    }

    fn read_table(&self) -> Result<SourceTable> {
        let mut file = safe_open_file(&self.path, "reading the delimited survey export")?;
        let format = Format::default()
            .with_header(true)
            .with_delimiter(self.delimiter);

        // Column types are inferred from the full file, then the file is re-read
        let (schema, inferred_rows) = format.infer_schema(&mut file, None)?;
        debug!(
            "Inferred {} columns from {} rows of {}",
            schema.fields().len(),
            inferred_rows,
            self.path.display()
        );
        file.rewind()
            .map_err(|e| AnalysisError::io_at(&self.path, e))?;

        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_delimiter(self.delimiter)
            .build(file)?;

        let mut batches = Vec::new();
        for batch_result in reader {
            batches.push(batch_result?);
        }

        Ok(SourceTable { schema, batches })
    }
}

/// Pick the source to read: the primary if it exists, else the alternate
///
/// # Errors
/// Returns [`AnalysisError::SourceUnavailable`] if neither file exists.
pub fn resolve_source(config: &PipelineConfig) -> Result<Box<dyn RecordSource>> {
    if config.primary_source.is_file() {
        info!("Using primary survey table {}", config.primary_source.display());
        return Ok(Box::new(ParquetSource::new(&config.primary_source)));
    }

    if config.alternate_source.is_file() {
        warn!(
            "Primary survey table {} not found, falling back to {}",
            config.primary_source.display(),
            config.alternate_source.display()
        );
        return Ok(Box::new(DelimitedSource::new(
            &config.alternate_source,
            config.delimiter_byte(),
        )));
    }

    Err(AnalysisError::SourceUnavailable {
        primary: config.primary_source.clone(),
        alternate: config.alternate_source.clone(),
    })
}

/// Read a source and extract the raw survey records
pub fn load_survey(source: &dyn RecordSource) -> Result<RawSurvey> {
    let table = source.read_table()?;
    let name = source
        .path()
        .file_name()
        .map_or_else(|| source.path().display().to_string(), |n| n.to_string_lossy().into_owned());

    let survey = records_from_table(&table, &name)?;
    info!(
        "Loaded {} respondents from {} ({})",
        survey.len(),
        name,
        source.format_name()
    );
    Ok(survey)
}

/// Resolve the configured source and load it
pub fn load_configured_survey(config: &PipelineConfig) -> Result<RawSurvey> {
    let source = resolve_source(config)?;
    load_survey(source.as_ref())
}

/// Flatten a source table into raw records
///
/// # Errors
/// Returns [`AnalysisError::SchemaError`] if required codebook fields are missing.
pub fn records_from_table(table: &SourceTable, source_name: &str) -> Result<RawSurvey> {
    let columns = SurveyColumns::resolve(&table.schema)?;
    columns.warn_absent(source_name);

    let mut records = Vec::with_capacity(table.num_rows());
    for batch in &table.batches {
        let view = BatchColumns::new(batch, &columns);
        for row in 0..batch.num_rows() {
            records.push(view.record(row));
        }
    }

    Ok(RawSurvey {
        source: source_name.to_string(),
        columns,
        records,
    })
}

/// Column arrays of one batch, looked up once per batch
struct BatchColumns {
    folio: Option<ArrayRef>,
    gender: Option<ArrayRef>,
    age: Option<ArrayRef>,
    age_group_code: Option<ArrayRef>,
    partners: ArrayRef,
    condom_use: ArrayRef,
    knowledge_items: [Option<ArrayRef>; 6],
    sti_summary: Option<ArrayRef>,
    sti_diagnoses: Vec<ArrayRef>,
    hiv_diagnosis: Option<ArrayRef>,
    tested_hiv: Option<ArrayRef>,
    test_reason: Option<ArrayRef>,
    no_test_reason: Option<ArrayRef>,
    prep_awareness: Option<ArrayRef>,
}

impl BatchColumns {
    fn new(batch: &RecordBatch, columns: &SurveyColumns) -> Self {
        let get = |idx: Option<usize>| idx.map(|i| batch.column(i).clone());
        Self {
            folio: get(columns.folio),
            gender: get(columns.gender),
            age: get(columns.age),
            age_group_code: get(columns.age_group_code),
            partners: batch.column(columns.partners).clone(),
            condom_use: batch.column(columns.condom_use).clone(),
            knowledge_items: columns.knowledge_items.map(get),
            sti_summary: get(columns.sti_summary),
            sti_diagnoses: columns
                .sti_diagnoses
                .iter()
                .map(|(_, idx)| batch.column(*idx).clone())
                .collect(),
            hiv_diagnosis: get(columns.hiv_diagnosis),
            tested_hiv: get(columns.tested_hiv),
            test_reason: get(columns.test_reason),
            no_test_reason: get(columns.no_test_reason),
            prep_awareness: get(columns.prep_awareness),
        }
    }

    fn record(&self, row: usize) -> RawRecord {
        let code =
            |array: &Option<ArrayRef>| array.as_ref().and_then(|a| arrow_array_to_f64(a, row));

        RawRecord {
            folio: self.folio.as_ref().and_then(|a| arrow_array_to_string(a, row)),
            gender: code(&self.gender),
            age: code(&self.age),
            age_group_code: code(&self.age_group_code),
            partners: arrow_array_to_f64(&self.partners, row),
            condom_use: arrow_array_to_f64(&self.condom_use, row),
            knowledge_items: std::array::from_fn(|i| code(&self.knowledge_items[i])),
            sti_summary: code(&self.sti_summary),
            sti_diagnoses: self
                .sti_diagnoses
                .iter()
                .map(|a| arrow_array_to_f64(a, row))
                .collect::<SmallVec<_>>(),
            hiv_diagnosis: code(&self.hiv_diagnosis),
            tested_hiv: code(&self.tested_hiv),
            test_reason: code(&self.test_reason),
            no_test_reason: code(&self.no_test_reason),
            prep_awareness: code(&self.prep_awareness),
        }
    }
}
