/// Columnar Module
///
/// Writes a RecordSet to a Parquet file. The Arrow schema is inferred from the
/// records on every run, so a field that only some records carry still
/// becomes a (nullable) column.
use crate::models::{EnrichedRecord, FieldValue};
use arrow::array::{ArrayRef, Float64Builder, Int64Builder, ListBuilder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColumnarError {
    /// Nothing to infer a schema from
    #[error("record set is empty, nothing to write")]
    Empty,

    #[error("Arrow conversion error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Facts about the run stored in the Parquet footer
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub resource: String,
    pub extracted_at: DateTime<Utc>,
}

/// Column type as seen in the in-memory values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    /// Only nulls so far
    Unknown,
    Int,
    Float,
    Text,
    TextList,
}

impl ColumnType {
    fn of(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => Self::Unknown,
            FieldValue::Int(_) => Self::Int,
            FieldValue::Float(_) => Self::Float,
            FieldValue::Text(_) => Self::Text,
            FieldValue::TextList(_) => Self::TextList,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unknown, t) | (t, Self::Unknown) => t,
            (a, b) if a == b => a,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            _ => Self::Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Text | Self::Unknown => DataType::Utf8,
            Self::TextList => DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
        }
    }
}

/// Infer the Arrow schema: union of field names in first-seen order
pub fn infer_schema(records: &[EnrichedRecord]) -> Schema {
    let mut columns: Vec<(String, ColumnType)> = Vec::new();

    for record in records {
        for (name, value) in record.fields() {
            let seen = ColumnType::of(value);
            match columns.iter_mut().find(|(n, _)| n == name) {
                Some((_, column)) => *column = column.merge(seen),
                None => columns.push((name.to_string(), seen)),
            }
        }
    }

    let fields: Vec<Field> =
        columns.into_iter().map(|(name, column)| Field::new(name, column.data_type(), true)).collect();
    Schema::new(fields)
}

static NULL: FieldValue = FieldValue::Null;

/// Build one Arrow array per schema field; absent fields become null
fn build_arrays(records: &[EnrichedRecord], schema: &Schema) -> Vec<ArrayRef> {
    let num_rows = records.len();

    schema
        .fields()
        .iter()
        .map(|field| {
            let values = records.iter().map(|r| r.get(field.name()).unwrap_or(&NULL));
            let array: ArrayRef = match field.data_type() {
                DataType::Int64 => {
                    let mut builder = Int64Builder::with_capacity(num_rows);
                    for value in values {
                        match value {
                            FieldValue::Int(v) => builder.append_value(*v),
                            _ => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::Float64 => {
                    let mut builder = Float64Builder::with_capacity(num_rows);
                    for value in values {
                        match value {
                            FieldValue::Int(v) => builder.append_value(*v as f64),
                            FieldValue::Float(v) => builder.append_value(*v),
                            _ => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
                DataType::List(_) => {
                    let mut builder = ListBuilder::new(StringBuilder::new());
                    for value in values {
                        match value {
                            FieldValue::TextList(items) => {
                                for item in items {
                                    builder.values().append_value(item);
                                }
                                builder.append(true);
                            }
                            _ => builder.append(false),
                        }
                    }
                    Arc::new(builder.finish())
                }
                // Default: UTF-8 string
                _ => {
                    let mut builder = StringBuilder::with_capacity(num_rows, num_rows * 16);
                    for value in values {
                        match value.to_text() {
                            Some(s) => builder.append_value(s),
                            None => builder.append_null(),
                        }
                    }
                    Arc::new(builder.finish())
                }
            };
            array
        })
        .collect()
}

/// Convert a RecordSet into a single Arrow [`RecordBatch`]
pub fn records_to_batch(records: &[EnrichedRecord]) -> Result<RecordBatch, ColumnarError> {
    if records.is_empty() {
        return Err(ColumnarError::Empty);
    }

    let schema = Arc::new(infer_schema(records));
    let arrays = build_arrays(records, &schema);
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Write the RecordSet to `path`, replacing any existing file
///
/// The data goes to `<path>.tmp` first and is renamed into place once the
/// footer is written. Returns the number of rows written.
pub fn write_parquet(records: &[EnrichedRecord], path: &Path, metadata: &FileMetadata) -> Result<u64, ColumnarError> {
    let batch = records_to_batch(records)?;
    let row_count = batch.num_rows() as u64;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_key_value_metadata(Some(vec![
            KeyValue::new("pokedex.resource".to_string(), Some(metadata.resource.clone())),
            KeyValue::new("pokedex.record_count".to_string(), Some(row_count.to_string())),
            KeyValue::new("pokedex.extracted_at".to_string(), Some(metadata.extracted_at.to_rfc3339())),
        ]))
        .build();

    let tmp_path = tmp_path_for(path);
    let written =
        write_batch(&batch, &tmp_path, props).and_then(|()| fs::rename(&tmp_path, path).map_err(ColumnarError::from));
    if let Err(e) = written {
        if tmp_path.exists() {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                tracing::warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
            }
        }
        return Err(e);
    }

    tracing::debug!(path = %path.display(), rows = row_count, "Wrote Parquet file");
    Ok(row_count)
}

fn write_batch(batch: &RecordBatch, tmp_path: &Path, props: WriterProperties) -> Result<(), ColumnarError> {
    let file = fs::File::create(tmp_path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array, ListArray, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    fn metadata() -> FileMetadata {
        FileMetadata { resource: "pokemon".into(), extracted_at: Utc::now() }
    }

    fn read_back(path: &Path) -> RecordBatch {
        let file = fs::File::open(path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap()
    }

    fn pokemon(name: &str, height: i64, types: &[&str]) -> EnrichedRecord {
        EnrichedRecord::new()
            .with("name", name)
            .with("height", height)
            .with("types", types.iter().map(|t| t.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_infer_schema_types() {
        let records = vec![
            EnrichedRecord::new().with("name", "bulbasaur").with("score", 1i64).with("next_evolve", FieldValue::Null),
            EnrichedRecord::new().with("name", "ivysaur").with("score", 2.5).with("types", vec!["grass".to_string()]),
        ];

        let schema = infer_schema(&records);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["name", "score", "next_evolve", "types"]);
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert!(matches!(schema.field(3).data_type(), DataType::List(_)));
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn test_conflicting_types_fall_back_to_text() {
        let records = vec![
            EnrichedRecord::new().with("value", 7i64),
            EnrichedRecord::new().with("value", "seven"),
        ];

        let batch = records_to_batch(&records).unwrap();
        let column = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(column.value(0), "7");
        assert_eq!(column.value(1), "seven");
    }

    #[test]
    fn test_missing_field_becomes_null() {
        let records = vec![pokemon("bulbasaur", 7, &["grass"]), EnrichedRecord::new().with("name", "missingno")];

        let batch = records_to_batch(&records).unwrap();
        let heights = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        let types = batch.column(2).as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(heights.value(0), 7);
        assert!(heights.is_null(1));
        assert!(types.is_null(1));
    }

    #[test]
    fn test_empty_record_set_is_rejected() {
        assert!(matches!(records_to_batch(&[]), Err(ColumnarError::Empty)));
    }

    #[test]
    fn test_write_parquet_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pokemon_data.parquet");
        let records = vec![pokemon("bulbasaur", 7, &["grass", "poison"]), pokemon("charmander", 6, &["fire"])];

        let rows = write_parquet(&records, &path, &metadata()).unwrap();
        assert_eq!(rows, 2);
        assert!(!tmp_path_for(&path).exists());

        let batch = read_back(&path);
        assert_eq!(batch.num_rows(), 2);
        let names = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(1), "charmander");
        let types = batch.column(2).as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(types.value(0).len(), 2);
    }

    #[test]
    fn test_failed_write_removes_tmp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory in the way makes the final rename fail
        let path = dir.path().join("pokemon_data.parquet");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let result = write_parquet(&[pokemon("bulbasaur", 7, &["grass"])], &path, &metadata());
        assert!(matches!(result, Err(ColumnarError::Io(_))));
        assert!(!tmp_path_for(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_write_parquet_overwrites_and_records_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("evolution_chain_data.parquet");

        write_parquet(&[pokemon("a", 1, &[]), pokemon("b", 2, &[])], &path, &metadata()).unwrap();
        let records = vec![EnrichedRecord::new().with("pokemon", "eevee").with("height", 3.5)];
        write_parquet(&records, &path, &metadata()).unwrap();

        let batch = read_back(&path);
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 2);
        let heights = batch.column(1).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(heights.value(0), 3.5);

        let file = fs::File::open(&path).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let kv = builder.metadata().file_metadata().key_value_metadata().cloned().unwrap_or_default();
        assert!(kv.iter().any(|e| e.key == "pokedex.resource" && e.value.as_deref() == Some("pokemon")));
        assert!(kv.iter().any(|e| e.key == "pokedex.record_count" && e.value.as_deref() == Some("1")));
    }
}
