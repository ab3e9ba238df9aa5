//! Shared fixtures for unit tests.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ExportError;
use crate::record::{ExportRecord, SpecFieldSchema, ToCellValue};
use crate::spec::EnumCellValue;
use crate::writer::XlsxWorkbook;

#[derive(Debug, Clone)]
pub struct SampleRow {
    pub text_value: String,
    pub date_value: NaiveDateTime,
    pub double_value: f64,
    pub int_value: i32,
}

impl ExportRecord for SampleRow {
    fn fields() -> &'static [SpecFieldSchema] {
        static FIELDS: OnceLock<Vec<SpecFieldSchema>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                SpecFieldSchema::new::<String>("text_value", None),
                SpecFieldSchema::new::<NaiveDateTime>("date_value", None),
                SpecFieldSchema::new::<f64>("double_value", None),
                SpecFieldSchema::new::<i32>("int_value", None),
            ]
        })
    }

    fn field_value(&self, key: &str) -> EnumCellValue {
        match key {
            "text_value" => self.text_value.to_cell_value(),
            "date_value" => self.date_value.to_cell_value(),
            "double_value" => self.double_value.to_cell_value(),
            "int_value" => self.int_value.to_cell_value(),
            _ => EnumCellValue::None,
        }
    }
}

/// Record with nullable fields and a display-name annotation.
#[derive(Debug, Clone, Default)]
pub struct NullableRow {
    pub label: String,
    pub amount: Option<f64>,
    pub due: Option<NaiveDateTime>,
}

impl ExportRecord for NullableRow {
    fn fields() -> &'static [SpecFieldSchema] {
        static FIELDS: OnceLock<Vec<SpecFieldSchema>> = OnceLock::new();
        FIELDS.get_or_init(|| {
            vec![
                SpecFieldSchema::new::<String>("label", Some("Row Label")),
                SpecFieldSchema::new::<Option<f64>>("amount", None),
                SpecFieldSchema::new::<Option<NaiveDateTime>>("due", None),
            ]
        })
    }

    fn field_value(&self, key: &str) -> EnumCellValue {
        match key {
            "label" => self.label.to_cell_value(),
            "amount" => self.amount.to_cell_value(),
            "due" => self.due.to_cell_value(),
            _ => EnumCellValue::None,
        }
    }
}

pub fn derive_sample_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|date| date.and_hms_opt(9, 30, 0))
        .expect("valid sample datetime")
}

pub fn derive_sample_rows() -> Vec<SampleRow> {
    vec![SampleRow {
        text_value: "SomeText".to_string(),
        date_value: derive_sample_datetime(),
        double_value: 10.2,
        int_value: 5,
    }]
}

/// Four rows whose `double_value` runs 0, 1, 2, 3.
pub fn derive_sample_rows_sequence() -> Vec<SampleRow> {
    (0..4)
        .map(|n_idx| SampleRow {
            text_value: format!("Row {n_idx}"),
            date_value: derive_sample_datetime(),
            double_value: f64::from(n_idx),
            int_value: n_idx,
        })
        .collect()
}

/// Workbook with one populated sheet named `Existing` (3 rows x 2 columns).
pub fn derive_existing_workbook() -> Result<XlsxWorkbook, ExportError> {
    let mut workbook = XlsxWorkbook::new();
    workbook.add_worksheet("Existing")?;
    workbook.write_string("Existing", 0, 0, "Key")?;
    workbook.write_string("Existing", 0, 1, "Value")?;
    workbook.write_string("Existing", 1, 0, "a")?;
    workbook.write_string("Existing", 2, 1, "b")?;
    Ok(workbook)
}
