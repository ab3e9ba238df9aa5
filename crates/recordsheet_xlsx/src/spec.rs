//! Shared export specification models.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_xlsxwriter::TableStyle;

use crate::conf::{C_SHEET_NAME_DEFAULT, EnumFmtKey, derive_default_export_formats};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification.
///
/// Every field is optional; `None` means "inherit from the layer below" when
/// formats are merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,
    /// Bottom border override.
    pub bottom: Option<i64>,
    /// Left border override.
    pub left: Option<i64>,
    /// Right border override.
    pub right: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (`#RRGGBB`).
    pub bg_color: Option<String>,
    /// Font color (`#RRGGBB`).
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            bottom: other.bottom.or(self.bottom),
            left: other.left.or(self.left),
            right: other.right.or(self.right),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Effective bottom border code (`bottom` wins over `border`).
    pub fn border_bottom(&self) -> Option<i64> {
        self.bottom.or(self.border)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Normalized cell value during the resolve/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date and time value.
    DateTime(NaiveDateTime),
    /// Date value.
    Date(NaiveDate),
}

impl EnumCellValue {
    /// Whether the value renders as an empty cell.
    pub fn is_none(&self) -> bool {
        matches!(self, EnumCellValue::None)
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumCellValue::None => Ok(()),
            EnumCellValue::String(val) => f.write_str(val),
            EnumCellValue::Number(val) => write!(f, "{val}"),
            EnumCellValue::Boolean(val) => f.write_str(if *val { "True" } else { "False" }),
            EnumCellValue::DateTime(val) => write!(f, "{}", val.format("%Y-%m-%d %H:%M:%S")),
            EnumCellValue::Date(val) => write!(f, "{}", val.format("%Y-%m-%d")),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderedTableSpecification

/// One resolved cell, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRenderedCell {
    /// Literal value (for formula cells: the raw column value).
    pub value: EnumCellValue,
    /// Formula text; when set the cell is written as a formula.
    pub formula: Option<String>,
    /// Fully resolved format.
    pub format: SpecCellFormat,
}

impl SpecRenderedCell {
    /// Build a plain text cell.
    pub fn text(value: impl Into<String>, format: SpecCellFormat) -> Self {
        Self {
            value: EnumCellValue::String(value.into()),
            formula: None,
            format,
        }
    }
}

/// Resolved grid produced by an exporter before it reaches a workbook.
///
/// Rows are relative to the anchor cell. The first `n_rows_header` rows are
/// header rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRenderedTable {
    /// Row-major cells; every row has the same length.
    pub rows: Vec<Vec<SpecRenderedCell>>,
    /// Number of leading header rows.
    pub n_rows_header: usize,
    /// Column widths; `None` leaves the library default.
    pub widths: Vec<Option<f64>>,
}

impl SpecRenderedTable {
    /// Total number of rows, header included.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&SpecRenderedCell> {
        self.rows.get(row).and_then(|l_row| l_row.get(col))
    }

    /// Mutable cell at `(row, col)`.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut SpecRenderedCell> {
        self.rows.get_mut(row).and_then(|l_row| l_row.get_mut(col))
    }

    /// Header texts of the first header row.
    pub fn header_texts(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|l_row| l_row.iter().map(|cell| cell.value.to_string()).collect())
            .unwrap_or_default()
    }

    /// Mutable body rows (everything below the header).
    pub fn body_rows_mut(&mut self) -> &mut [Vec<SpecRenderedCell>] {
        let n_skip = usize::min(self.n_rows_header, self.rows.len());
        &mut self.rows[n_skip..]
    }

    /// Last row of the grid, header excluded when the body is empty.
    pub fn last_row_mut(&mut self) -> Option<&mut Vec<SpecRenderedCell>> {
        if self.rows.len() <= self.n_rows_header {
            return None;
        }
        self.rows.last_mut()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy applied after content population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Which grid an exporter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumExportLayout {
    /// One header row, one row per record.
    #[default]
    Table,
    /// One record, one row per column (`Property | Value`).
    Object,
}

/// Zero-based anchor of the rendered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecCellAnchor {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

/// Where an append operation puts its output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumSheetPlacement {
    /// Insert a new worksheet; the grid starts at the configured anchor.
    #[default]
    NewSheet,
    /// Put the grid under the used range of an existing worksheet.
    Below {
        /// Target worksheet.
        sheet_name: String,
        /// Empty rows left between existing content and the grid.
        gap_rows: usize,
    },
    /// Put the grid right of the used range of an existing worksheet.
    Beside {
        /// Target worksheet.
        sheet_name: String,
        /// Empty columns left between existing content and the grid.
        gap_cols: usize,
    },
}

/// Sheet and table level options of one exporter.
#[derive(Clone)]
pub struct SpecExportOptions {
    /// Worksheet name for new sheets; defaults to [`C_SHEET_NAME_DEFAULT`].
    pub worksheet_name: Option<String>,
    /// Table name; defaults to one derived from the worksheet name.
    pub table_name: Option<String>,
    /// Table style; `None` writes a plain range without a table object.
    pub table_style: Option<TableStyle>,
    /// Placement used by append operations.
    pub placement: EnumSheetPlacement,
    /// Anchor used for new sheets.
    pub anchor: SpecCellAnchor,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Built-in header format.
    pub fmt_header: SpecCellFormat,
    /// Built-in content format.
    pub fmt_content: SpecCellFormat,
}

impl SpecExportOptions {
    /// Worksheet name used for a new sheet.
    pub fn worksheet_name_or_default(&self) -> &str {
        self.worksheet_name.as_deref().unwrap_or(C_SHEET_NAME_DEFAULT)
    }
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        let mut dict_fmt = derive_default_export_formats();
        Self {
            worksheet_name: None,
            table_name: None,
            table_style: Some(TableStyle::Medium9),
            placement: EnumSheetPlacement::NewSheet,
            anchor: SpecCellAnchor::default(),
            policy_autofit: SpecAutofitCellsPolicy::default(),
            fmt_header: dict_fmt.remove(&EnumFmtKey::Header).unwrap_or_default(),
            fmt_content: dict_fmt.remove(&EnumFmtKey::Content).unwrap_or_default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Used extent of a worksheet, tracked by the workbook container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecSheetExtent {
    /// Number of used rows, counted from row 0.
    pub n_rows: usize,
    /// Number of used columns, counted from column 0.
    pub n_cols: usize,
}

/// Location of one rendered grid inside a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTableHandle {
    /// Worksheet holding the grid.
    pub sheet_name: String,
    /// Table object name, when a table was created.
    pub table_name: Option<String>,
    /// First row (inclusive, zero-based).
    pub row_first: usize,
    /// First column (inclusive, zero-based).
    pub col_first: usize,
    /// Last row (inclusive, zero-based).
    pub row_last: usize,
    /// Last column (inclusive, zero-based).
    pub col_last: usize,
}

/// Per-render report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Grid written by the render call.
    pub table: Option<SpecTableHandle>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
