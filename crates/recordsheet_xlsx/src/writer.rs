//! Workbook container that materializes rendered grids with `rust_xlsxwriter`.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Table, TableColumn, Workbook, Worksheet};
use tracing::{debug, warn};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_LEN_EXCEL_TABLE_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
use crate::error::ExportError;
use crate::spec::{
    EnumCellValue, EnumSheetPlacement, SpecCellAnchor, SpecCellFormat, SpecExportOptions,
    SpecRenderedCell, SpecRenderedTable, SpecSheetExtent, SpecTableHandle, SpecXlsxReport,
};
use crate::util::{derive_unique_table_headers, sanitize_sheet_name, sanitize_table_name};

/// In-memory workbook that exporters create or append to.
///
/// Besides the `rust_xlsxwriter` workbook it tracks the used extent of every
/// worksheet and the table names already taken, since the writer cannot read
/// them back.
pub struct XlsxWorkbook {
    workbook: Workbook,
    dict_sheet_extents: IndexMap<String, SpecSheetExtent>,
    dict_table_names_existing: IndexMap<String, String>,
    l_reports: Vec<SpecXlsxReport>,
}

impl Default for XlsxWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxWorkbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            dict_sheet_extents: IndexMap::new(),
            dict_table_names_existing: IndexMap::new(),
            l_reports: Vec::new(),
        }
    }

    /// Number of worksheets.
    pub fn sheet_count(&self) -> usize {
        self.dict_sheet_extents.len()
    }

    /// Worksheet names in creation order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.dict_sheet_extents.keys().cloned().collect()
    }

    /// Whether a worksheet with this name exists (case-insensitive).
    pub fn contains_sheet(&self, name: &str) -> bool {
        self.find_sheet_name(name).is_some()
    }

    /// Used extent of a worksheet.
    pub fn sheet_extent(&self, name: &str) -> Option<SpecSheetExtent> {
        self.find_sheet_name(name)
            .and_then(|name_found| self.dict_sheet_extents.get(&name_found).copied())
    }

    /// Table object names in creation order.
    pub fn table_names(&self) -> Vec<String> {
        self.dict_table_names_existing.values().cloned().collect()
    }

    /// Snapshot of per-render reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Add a worksheet; the name is sanitized and made unique.
    ///
    /// Returns the final name.
    pub fn add_worksheet(&mut self, name: &str) -> Result<String, ExportError> {
        let sheet_name_unique = self.derive_unique_sheet_name(&sanitize_sheet_name(name, "_"));
        self.workbook.add_worksheet().set_name(&sheet_name_unique)?;
        self.dict_sheet_extents
            .insert(sheet_name_unique.clone(), SpecSheetExtent::default());
        Ok(sheet_name_unique)
    }

    /// Write one plain string cell into an existing worksheet.
    pub fn write_string(
        &mut self,
        sheet_name: &str,
        row: usize,
        col: usize,
        text: &str,
    ) -> Result<(), ExportError> {
        let sheet_name_found = self
            .find_sheet_name(sheet_name)
            .ok_or_else(|| ExportError::SheetNotFound(sheet_name.to_string()))?;
        self.workbook
            .worksheet_from_name(&sheet_name_found)?
            .write_string(cast_row_num(row)?, cast_col_num(col)?, text)?;
        self.extend_sheet_extent(&sheet_name_found, row + 1, col + 1);
        Ok(())
    }

    /// Save the workbook to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        self.workbook.save(path.as_ref())?;
        Ok(())
    }

    /// Serialize the workbook to xlsx bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Write a rendered grid according to `options.placement`.
    pub(crate) fn write_rendered_table(
        &mut self,
        table: &SpecRenderedTable,
        options: &SpecExportOptions,
    ) -> Result<SpecTableHandle, ExportError> {
        let (sheet_name_existing, anchor) = self.plan_target(options)?;
        let n_rows = table.n_rows();
        let n_cols = table.n_cols();
        let row_last = anchor.row + n_rows.saturating_sub(1);
        let col_last = anchor.col + n_cols.saturating_sub(1);
        cast_row_num(row_last)?;
        cast_col_num(col_last)?;
        let sheet_name = match sheet_name_existing {
            Some(val) => val,
            None => self.add_worksheet(options.worksheet_name_or_default())?,
        };

        let mut report = SpecXlsxReport::default();
        let table_name = match options.table_style {
            Some(_) if n_rows > table.n_rows_header && n_cols > 0 => Some(
                self.derive_unique_table_name(options.table_name.as_deref(), &sheet_name, &mut report),
            ),
            _ => None,
        };
        let l_headers_table = if table_name.is_some() {
            let (l_headers, if_changed) = derive_unique_table_headers(&table.header_texts());
            if if_changed {
                warn!(sheet = %sheet_name, "table headers adjusted to be non-empty and unique");
                report.warn(format!(
                    "Table headers on sheet {sheet_name:?} were adjusted to be non-empty and unique: {l_headers:?}"
                ));
            }
            l_headers
        } else {
            Vec::new()
        };

        let mut dict_formats: HashMap<SpecCellFormat, Format> = HashMap::new();
        let worksheet = self.workbook.worksheet_from_name(&sheet_name)?;
        for (n_idx_row, l_row) in table.rows.iter().enumerate() {
            for (n_idx_col, cell) in l_row.iter().enumerate() {
                let format = dict_formats
                    .entry(cell.format.clone())
                    .or_insert_with(|| derive_rust_xlsx_format(&cell.format));
                write_rendered_cell(
                    worksheet,
                    anchor.row + n_idx_row,
                    anchor.col + n_idx_col,
                    cell,
                    format,
                )?;
            }
        }

        for (n_idx_col, width) in table.widths.iter().enumerate() {
            if let Some(val) = width {
                worksheet.set_column_width(cast_col_num(anchor.col + n_idx_col)?, *val)?;
            }
        }

        if let (Some(c_table_name), Some(style)) = (&table_name, options.table_style) {
            let l_table_columns: Vec<TableColumn> = l_headers_table
                .iter()
                .enumerate()
                .map(|(n_idx_col, c_header)| {
                    let column = TableColumn::new().set_header(c_header);
                    match table.cell(0, n_idx_col) {
                        Some(cell) => column.set_header_format(derive_rust_xlsx_format(&cell.format)),
                        None => column,
                    }
                })
                .collect();
            let table_xlsx = Table::new()
                .set_name(c_table_name)
                .set_style(style)
                .set_columns(&l_table_columns);
            worksheet.add_table(
                cast_row_num(anchor.row)?,
                cast_col_num(anchor.col)?,
                cast_row_num(row_last)?,
                cast_col_num(col_last)?,
                &table_xlsx,
            )?;
        }

        if n_rows > 0 && n_cols > 0 {
            self.extend_sheet_extent(&sheet_name, row_last + 1, col_last + 1);
        }

        let handle = SpecTableHandle {
            sheet_name,
            table_name,
            row_first: anchor.row,
            col_first: anchor.col,
            row_last,
            col_last,
        };
        debug!(
            sheet = %handle.sheet_name,
            table = ?handle.table_name,
            n_rows,
            n_cols,
            "rendered grid written"
        );
        report.table = Some(handle.clone());
        self.l_reports.push(report);

        Ok(handle)
    }

    /// Target sheet and anchor; `None` asks for a new worksheet.
    fn plan_target(
        &self,
        options: &SpecExportOptions,
    ) -> Result<(Option<String>, SpecCellAnchor), ExportError> {
        match &options.placement {
            EnumSheetPlacement::NewSheet => Ok((None, options.anchor)),
            EnumSheetPlacement::Below {
                sheet_name,
                gap_rows,
            } => {
                let (sheet_name_found, extent) = self.derive_existing_sheet(sheet_name)?;
                let row = if extent.n_rows == 0 {
                    0
                } else {
                    extent.n_rows + gap_rows
                };
                Ok((Some(sheet_name_found), SpecCellAnchor { row, col: 0 }))
            }
            EnumSheetPlacement::Beside {
                sheet_name,
                gap_cols,
            } => {
                let (sheet_name_found, extent) = self.derive_existing_sheet(sheet_name)?;
                let col = if extent.n_cols == 0 {
                    0
                } else {
                    extent.n_cols + gap_cols
                };
                Ok((Some(sheet_name_found), SpecCellAnchor { row: 0, col }))
            }
        }
    }

    fn derive_existing_sheet(&self, name: &str) -> Result<(String, SpecSheetExtent), ExportError> {
        let sheet_name_found = self
            .find_sheet_name(name)
            .ok_or_else(|| ExportError::SheetNotFound(name.to_string()))?;
        let extent = self
            .dict_sheet_extents
            .get(&sheet_name_found)
            .copied()
            .unwrap_or_default();
        Ok((sheet_name_found, extent))
    }

    fn find_sheet_name(&self, name: &str) -> Option<String> {
        self.dict_sheet_extents
            .keys()
            .find(|key| key.to_lowercase() == name.to_lowercase())
            .cloned()
    }

    fn extend_sheet_extent(&mut self, sheet_name: &str, n_rows: usize, n_cols: usize) {
        let extent = self
            .dict_sheet_extents
            .entry(sheet_name.to_string())
            .or_default();
        extent.n_rows = usize::max(extent.n_rows, n_rows);
        extent.n_cols = usize::max(extent.n_cols, n_cols);
    }

    fn derive_unique_sheet_name(&self, name: &str) -> String {
        if !self.contains_sheet(name) {
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let candidate =
                derive_suffixed_name(name, &format!("__{n_idx}"), N_LEN_EXCEL_SHEET_NAME_MAX);
            if !self.contains_sheet(&candidate) {
                return candidate;
            }
            n_idx += 1;
        }
    }

    fn derive_unique_table_name(
        &mut self,
        name_configured: Option<&str>,
        sheet_name: &str,
        report: &mut SpecXlsxReport,
    ) -> String {
        let name_base = sanitize_table_name(name_configured.unwrap_or(sheet_name));
        if let Some(name) = name_configured
            && name != name_base
        {
            warn!(table = name, sanitized = %name_base, "table name sanitized");
            report.warn(format!("Table name {name:?} was sanitized to {name_base:?}."));
        }

        let mut candidate = name_base.clone();
        let mut n_idx = 2usize;
        while self
            .dict_table_names_existing
            .contains_key(&candidate.to_lowercase())
        {
            candidate =
                derive_suffixed_name(&name_base, &format!("_{n_idx}"), N_LEN_EXCEL_TABLE_NAME_MAX);
            n_idx += 1;
        }
        if candidate != name_base {
            report.warn(format!(
                "Table name {name_base:?} is taken; using {candidate:?}."
            ));
        }

        self.dict_table_names_existing
            .insert(candidate.to_lowercase(), candidate.clone());
        candidate
    }
}

/// Append `suffix` to `name`, cutting the name so the result fits in `n_len_max` chars.
fn derive_suffixed_name(name: &str, suffix: &str, n_len_max: usize) -> String {
    let n_keep = n_len_max.saturating_sub(suffix.chars().count());
    name.chars().take(n_keep).chain(suffix.chars()).collect()
}

fn write_rendered_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    cell: &SpecRenderedCell,
    format: &Format,
) -> Result<(), ExportError> {
    let row = cast_row_num(row_idx)?;
    let col = cast_col_num(col_idx)?;

    if let Some(formula) = &cell.formula {
        worksheet.write_formula_with_format(row, col, formula.as_str(), format)?;
        return Ok(());
    }

    match &cell.value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, format)?;
        }
        EnumCellValue::String(val) if val.is_empty() => {
            worksheet.write_blank(row, col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(row, col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row, col, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(row, col, *val, format)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet.write_datetime_with_format(row, col, val, format)?;
        }
        EnumCellValue::Date(val) => {
            worksheet.write_datetime_with_format(row, col, val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, ExportError> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(ExportError::IndexOverflow { axis: "row", value });
    }
    u32::try_from(value).map_err(|_| ExportError::IndexOverflow { axis: "row", value })
}

fn cast_col_num(value: usize) -> Result<u16, ExportError> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(ExportError::IndexOverflow {
            axis: "column",
            value,
        });
    }
    u16::try_from(value).map_err(|_| ExportError::IndexOverflow {
        axis: "column",
        value,
    })
}

#[cfg(test)]
mod tests {
    use rust_xlsxwriter::TableStyle;

    use super::*;
    use crate::testkit::derive_existing_workbook;

    fn derive_grid(l_headers: &[&str], n_rows_body: usize) -> SpecRenderedTable {
        let mut l_rows = vec![
            l_headers
                .iter()
                .map(|c_header| SpecRenderedCell::text(*c_header, SpecCellFormat::default()))
                .collect::<Vec<_>>(),
        ];
        for n_idx_row in 0..n_rows_body {
            l_rows.push(
                (0..l_headers.len())
                    .map(|n_idx_col| SpecRenderedCell {
                        value: EnumCellValue::Number((n_idx_row * 10 + n_idx_col) as f64),
                        formula: None,
                        format: SpecCellFormat::default(),
                    })
                    .collect(),
            );
        }
        SpecRenderedTable {
            rows: l_rows,
            n_rows_header: 1,
            widths: vec![None; l_headers.len()],
        }
    }

    #[test]
    fn test_add_worksheet_sanitizes_and_deduplicates() {
        let mut workbook = XlsxWorkbook::new();
        assert_eq!(workbook.add_worksheet("Data").unwrap(), "Data");
        assert_eq!(workbook.add_worksheet("data").unwrap(), "data__2");
        assert_eq!(workbook.add_worksheet("a/b").unwrap(), "a_b");
        assert_eq!(workbook.sheet_names(), vec!["Data", "data__2", "a_b"]);
    }

    #[test]
    fn test_add_worksheet_deduplicates_names_at_max_length() {
        let mut workbook = XlsxWorkbook::new();
        let c_name = "A".repeat(N_LEN_EXCEL_SHEET_NAME_MAX);
        let l_names = (0..12)
            .map(|_| workbook.add_worksheet(&c_name).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(l_names[0], c_name);
        assert_eq!(l_names[1], format!("{}__2", "A".repeat(28)));
        assert_eq!(l_names[9], format!("{}__10", "A".repeat(27)));
        assert_eq!(l_names[11], format!("{}__12", "A".repeat(27)));
        assert!(
            l_names
                .iter()
                .all(|name| name.chars().count() <= N_LEN_EXCEL_SHEET_NAME_MAX)
        );
        assert_eq!(workbook.sheet_count(), 12);
    }

    #[test]
    fn test_table_name_suffix_keeps_max_length() {
        let mut workbook = XlsxWorkbook::new();
        let c_name = "T".repeat(N_LEN_EXCEL_TABLE_NAME_MAX);
        let options = SpecExportOptions {
            table_name: Some(c_name.clone()),
            ..Default::default()
        };
        workbook
            .write_rendered_table(&derive_grid(&["A"], 1), &options)
            .expect("first grid");
        let handle = workbook
            .write_rendered_table(&derive_grid(&["A"], 1), &options)
            .expect("second grid");

        let c_table_name = handle.table_name.expect("table name");
        assert_eq!(c_table_name.chars().count(), N_LEN_EXCEL_TABLE_NAME_MAX);
        assert_eq!(c_table_name, format!("{}_2", "T".repeat(253)));
        assert_eq!(workbook.table_names(), vec![c_name, c_table_name]);
    }

    #[test]
    fn test_write_rendered_table_on_new_sheet_creates_table() {
        let mut workbook = XlsxWorkbook::new();
        let options = SpecExportOptions {
            worksheet_name: Some("1 Report".to_string()),
            ..Default::default()
        };
        let handle = workbook
            .write_rendered_table(&derive_grid(&["A", "B"], 3), &options)
            .expect("write grid");

        assert_eq!(handle.sheet_name, "1 Report");
        assert_eq!(handle.table_name.as_deref(), Some("t1_Report"));
        assert_eq!((handle.row_last, handle.col_last), (3, 1));
        assert_eq!(
            workbook.sheet_extent("1 report"),
            Some(SpecSheetExtent { n_rows: 4, n_cols: 2 })
        );
        assert_eq!(workbook.table_names(), vec!["t1_Report"]);
    }

    #[test]
    fn test_table_names_are_unique_across_workbook() {
        let mut workbook = XlsxWorkbook::new();
        let options = SpecExportOptions {
            table_name: Some("Sales".to_string()),
            table_style: Some(TableStyle::Dark10),
            ..Default::default()
        };
        workbook
            .write_rendered_table(&derive_grid(&["A"], 1), &options)
            .expect("first grid");
        let handle = workbook
            .write_rendered_table(&derive_grid(&["A"], 1), &options)
            .expect("second grid");

        assert_eq!(handle.table_name.as_deref(), Some("Sales_2"));
        assert_eq!(workbook.sheet_names(), vec!["Data", "Data__2"]);
        let l_reports = workbook.report();
        assert_eq!(l_reports.len(), 2);
        assert!(l_reports[1].warnings.iter().any(|msg| msg.contains("Sales_2")));
    }

    #[test]
    fn test_duplicate_headers_are_reported() {
        let mut workbook = XlsxWorkbook::new();
        workbook
            .write_rendered_table(&derive_grid(&["Name", "name", ""], 1), &SpecExportOptions::default())
            .expect("write grid");
        let l_reports = workbook.report();
        assert_eq!(l_reports[0].warnings.len(), 1);
    }

    #[test]
    fn test_placement_below_and_beside_existing_content() {
        let mut workbook = derive_existing_workbook().expect("existing workbook");
        let options_below = SpecExportOptions {
            placement: EnumSheetPlacement::Below {
                sheet_name: "existing".to_string(),
                gap_rows: 1,
            },
            table_style: None,
            ..Default::default()
        };
        let handle = workbook
            .write_rendered_table(&derive_grid(&["A", "B", "C"], 2), &options_below)
            .expect("write below");
        assert_eq!((handle.row_first, handle.col_first), (4, 0));
        assert_eq!(handle.table_name, None);

        let options_beside = SpecExportOptions {
            placement: EnumSheetPlacement::Beside {
                sheet_name: "Existing".to_string(),
                gap_cols: 0,
            },
            ..Default::default()
        };
        let handle = workbook
            .write_rendered_table(&derive_grid(&["X"], 1), &options_beside)
            .expect("write beside");
        assert_eq!((handle.row_first, handle.col_first), (0, 3));
        assert_eq!(
            workbook.sheet_extent("Existing"),
            Some(SpecSheetExtent { n_rows: 7, n_cols: 4 })
        );
        assert_eq!(workbook.sheet_count(), 1);
    }

    #[test]
    fn test_placement_on_unknown_sheet_fails() {
        let mut workbook = XlsxWorkbook::new();
        let options = SpecExportOptions {
            placement: EnumSheetPlacement::Below {
                sheet_name: "Missing".to_string(),
                gap_rows: 0,
            },
            ..Default::default()
        };
        assert!(matches!(
            workbook.write_rendered_table(&derive_grid(&["A"], 1), &options),
            Err(ExportError::SheetNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_anchor_beyond_excel_limits_overflows() {
        let mut workbook = XlsxWorkbook::new();
        let options = SpecExportOptions {
            anchor: SpecCellAnchor {
                row: N_NROWS_EXCEL_MAX - 1,
                col: 0,
            },
            ..Default::default()
        };
        assert!(matches!(
            workbook.write_rendered_table(&derive_grid(&["A"], 1), &options),
            Err(ExportError::IndexOverflow { axis: "row", .. })
        ));
        assert_eq!(workbook.sheet_count(), 0);
    }

    #[test]
    fn test_save_to_buffer_produces_zip_payload() {
        let mut workbook = XlsxWorkbook::new();
        workbook
            .write_rendered_table(&derive_grid(&["A"], 2), &SpecExportOptions::default())
            .expect("write grid");
        let v_bytes = workbook.save_to_buffer().expect("save");
        assert!(v_bytes.starts_with(b"PK"));
    }
}
