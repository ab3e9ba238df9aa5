//! `recordsheet_xlsx` v1:
//! Fluent column configuration that maps records onto xlsx worksheets.
//!
//! Architecture:
//! - `conf`     : constants and default presets
//! - `spec`     : specs/models/options
//! - `error`    : error type
//! - `record`   : record schemas, value typing, dynamic properties
//! - `column`   : columns, per-column configuration and selection
//! - `util`     : pure helper functions
//! - `render`   : cell resolution and layout planning
//! - `exporter` : fluent builder with create/append operations
//! - `writer`   : workbook container backed by `rust_xlsxwriter`
pub mod column;
pub mod conf;
pub mod error;
pub mod exporter;
pub mod record;
pub mod render;
pub mod spec;
pub mod util;
pub mod writer;

#[cfg(test)]
mod testkit;

pub use column::{
    ColumnSelector, EnumColumnSource, FnConditionalStyle, FnFormula, FnStyle, SpecColumn,
    SpecColumnConfiguration, SpecColumnSet, SpecContentConfiguration, SpecHeaderConfiguration,
};
pub use conf::{
    C_SHEET_NAME_DEFAULT, N_BORDER_DASHED, N_BORDER_DOTTED, N_BORDER_MEDIUM, N_BORDER_NONE,
    N_BORDER_THICK, N_BORDER_THIN, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use error::ExportError;
pub use exporter::{FnCustomizeTable, XlsxExporter};
pub use record::{
    DynamicProperty, EnumValueKind, ExportRecord, SpecFieldSchema, SpecValueType, ToCellValue,
};
pub use rust_xlsxwriter::TableStyle;
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumExportLayout, EnumSheetPlacement,
    SpecAutofitCellsPolicy, SpecCellAnchor, SpecCellFormat, SpecExportOptions, SpecRenderedCell,
    SpecRenderedTable, SpecSheetExtent, SpecTableHandle, SpecXlsxReport,
};
pub use util::{format_text, humanize_member_name, sanitize_sheet_name, sanitize_table_name};
pub use writer::XlsxWorkbook;

#[cfg(feature = "derive")]
pub use recordsheet_derive::ExportRecord;
