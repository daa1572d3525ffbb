//! Arrow IPC (feather v2) tables, read one record batch at a time

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use arrow_array::cast::AsArray;
use arrow_array::Array;
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_ipc::reader::FileReader;
use arrow_schema::DataType;
use ptmscan_core::Record;

use crate::{Columns, Error};

fn annotation_text(array: &dyn Array, row: usize) -> Option<String> {
    if array.is_null(row) {
        return None;
    }
    match array.data_type() {
        DataType::Utf8 => Some(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(array.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

pub fn read_records(path: &Path, columns: &Columns) -> Result<Vec<Record>, Error> {
    let reader = FileReader::try_new(BufReader::new(File::open(path)?), None)?;

    let schema = reader.schema();
    let column_index = |name: &str| {
        schema.index_of(name).map_err(|_| Error::MissingColumn {
            path: path.into(),
            column: name.into(),
        })
    };
    let annotation_ix = column_index(&columns.annotation)?;
    let external_id_ix = column_index(&columns.external_id)?;

    let options = FormatOptions::default();
    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let annotation = batch.column(annotation_ix);
        match annotation.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => {}
            _ => {
                return Err(Error::UnexpectedType {
                    path: path.into(),
                    row: records.len(),
                    column: columns.annotation.clone(),
                })
            }
        }

        let external_id = ArrayFormatter::try_new(batch.column(external_id_ix).as_ref(), &options)?;

        for row in 0..batch.num_rows() {
            records.push(Record {
                record_index: records.len(),
                external_id: external_id.value(row).to_string(),
                annotation: annotation_text(annotation.as_ref(), row).filter(|s| !s.is_empty()),
            });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use arrow_array::{Int64Array, RecordBatch, StringArray};
    use arrow_ipc::writer::FileWriter;
    use arrow_schema::{Field, Schema};
    use std::sync::Arc;

    fn write_table(path: &Path, batches: &[(Vec<i64>, Vec<Option<&str>>)]) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::Int64, false),
            Field::new("modified_peptide", DataType::Utf8, true),
        ]));
        let mut w = FileWriter::try_new(File::create(path).unwrap(), &schema).unwrap();
        for (ids, peptides) in batches {
            let batch = RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int64Array::from(ids.clone())),
                    Arc::new(StringArray::from(peptides.clone())),
                ],
            )
            .unwrap();
            w.write(&batch).unwrap();
        }
        w.finish().unwrap();
    }

    #[test]
    fn ipc_rows_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file1.ipc");
        write_table(
            &path,
            &[
                (
                    vec![7, 8],
                    vec![Some("VSINTVN[1493]LTAGQPMEVTVFR"), None],
                ),
                (vec![9, 10], vec![Some("PEPTIDE"), Some("")]),
            ],
        );

        let records = read_records(&path, &Columns::default()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].external_id, "7");
        assert_eq!(
            records[0].annotation.as_deref(),
            Some("VSINTVN[1493]LTAGQPMEVTVFR")
        );
        assert_eq!(records[1].annotation, None);
        assert_eq!(records[2].record_index, 2);
        assert_eq!(records[2].external_id, "9");
        assert_eq!(records[2].annotation.as_deref(), Some("PEPTIDE"));
        assert_eq!(records[3].annotation, None);
    }

    #[test]
    fn ipc_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file1.ipc");
        write_table(&path, &[(vec![1], vec![Some("N[1]")])]);

        let columns = Columns {
            external_id: "scan".into(),
            ..Default::default()
        };
        match read_records(&path, &columns) {
            Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "scan"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn ipc_annotation_must_be_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file1.ipc");
        write_table(&path, &[(vec![1], vec![Some("N[1]")])]);

        let columns = Columns {
            annotation: "index".into(),
            external_id: "modified_peptide".into(),
        };
        assert!(matches!(
            read_records(&path, &columns),
            Err(Error::UnexpectedType { row: 0, .. })
        ));
    }
}
