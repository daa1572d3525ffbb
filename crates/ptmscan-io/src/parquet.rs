//! Parquet tables, read through the row-oriented record API

use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use ptmscan_core::Record;

use crate::{Columns, Error};

/// Render a scalar cell as text. Nested and binary non-UTF-8 cells yield `None`.
fn field_text(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(s) => Some(s.clone()),
        Field::Bytes(b) => b.as_utf8().ok().map(String::from),
        Field::Bool(_)
        | Field::Byte(_)
        | Field::Short(_)
        | Field::Int(_)
        | Field::Long(_)
        | Field::UByte(_)
        | Field::UShort(_)
        | Field::UInt(_)
        | Field::ULong(_)
        | Field::Float(_)
        | Field::Double(_) => Some(field.to_string()),
        _ => None,
    }
}

pub fn read_records(path: &Path, columns: &Columns) -> Result<Vec<Record>, Error> {
    let reader = SerializedFileReader::new(File::open(path)?)?;

    let fields = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>();
    let column_index = |name: &str| {
        fields
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| Error::MissingColumn {
                path: path.into(),
                column: name.into(),
            })
    };
    let annotation_ix = column_index(&columns.annotation)?;
    let external_id_ix = column_index(&columns.external_id)?;

    let mut records = Vec::with_capacity(reader.metadata().file_metadata().num_rows() as usize);
    for (record_index, row) in reader.get_row_iter(None)?.enumerate() {
        let row = row?;
        let mut annotation = None;
        let mut external_id = String::new();
        for (ix, (_, field)) in row.get_column_iter().enumerate() {
            if ix == annotation_ix {
                annotation = match field {
                    Field::Null => None,
                    Field::Str(_) | Field::Bytes(_) => field_text(field),
                    _ => {
                        return Err(Error::UnexpectedType {
                            path: path.into(),
                            row: record_index,
                            column: columns.annotation.clone(),
                        })
                    }
                };
            }
            if ix == external_id_ix {
                external_id = field_text(field).unwrap_or_default();
            }
        }
        records.push(Record {
            record_index,
            external_id,
            annotation: annotation.filter(|s| !s.is_empty()),
        });
    }
    Ok(records)
}
