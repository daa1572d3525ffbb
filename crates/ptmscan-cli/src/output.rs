use anyhow::Context;
use ptmscan_core::export::{self, ExampleRow, KeyCount, COUNT_COLUMNS, EXAMPLE_COLUMNS};
use ptmscan_core::{ExampleRegistry, Scan};

use crate::runner::Runner;

impl Runner {
    pub fn serialize_example(&self, row: &ExampleRow) -> csv::ByteRecord {
        let mut buf = [0u8; 4];
        let mut record = csv::ByteRecord::new();
        record.push_field(row.entry.residue.encode_utf8(&mut buf).as_bytes());
        record.push_field(row.entry.mass_label.as_bytes());
        record.push_field(row.entry.project_name.as_bytes());
        record.push_field(row.entry.file_name.as_bytes());
        record.push_field(row.entry.external_id.as_bytes());
        record.push_field(itoa::Buffer::new().format(row.entry.record_index).as_bytes());
        record.push_field(row.entry.annotation.as_bytes());
        record
    }

    pub fn write_examples(&self, registry: &ExampleRegistry) -> anyhow::Result<String> {
        let path = self.make_path("ptm_examples.csv");

        let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
        wtr.write_byte_record(&csv::ByteRecord::from(EXAMPLE_COLUMNS.to_vec()))?;

        let rows = export::example_rows(registry);
        for row in &rows {
            wtr.write_byte_record(&self.serialize_example(row))?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        log::info!("wrote {} examples to {}", rows.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    /// The residue field is left empty when keys are mass-only
    pub fn serialize_count(&self, count: &KeyCount) -> csv::ByteRecord {
        let residue = count.key.residue.map(String::from).unwrap_or_default();
        let mut record = csv::ByteRecord::new();
        record.push_field(residue.as_bytes());
        record.push_field(count.key.mass_label.as_bytes());
        record.push_field(itoa::Buffer::new().format(count.occurrences).as_bytes());
        record.push_field(itoa::Buffer::new().format(count.examples).as_bytes());
        record
    }

    pub fn write_counts(&self, scan: &Scan) -> anyhow::Result<String> {
        let path = self.make_path("ptm_counts.csv");

        let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
        wtr.write_byte_record(&csv::ByteRecord::from(COUNT_COLUMNS.to_vec()))?;
        for count in export::key_counts(scan) {
            wtr.write_byte_record(&self.serialize_count(&count))?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}
