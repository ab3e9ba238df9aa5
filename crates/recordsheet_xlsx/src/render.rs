//! Resolution of columns into a planned cell grid.
//!
//! Everything here is pure: records and column configuration go in, a
//! [`SpecRenderedTable`] comes out. The workbook writer only materializes the
//! result.

use std::any::TypeId;
use std::collections::BTreeMap;

use crate::column::SpecColumn;
use crate::conf::{
    C_NUM_FORMAT_DATE_DEFAULT, C_NUM_FORMAT_DATETIME_DEFAULT, C_OBJECT_HEADER_PROPERTY,
    C_OBJECT_HEADER_VALUE,
};
use crate::error::ExportError;
use crate::record::EnumValueKind;
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecRenderedCell, SpecRenderedTable,
};
use crate::util::{estimate_unicode_string_width, format_text};

/// Inputs shared by every cell of one render call.
#[derive(Debug, Clone, Copy)]
pub struct SpecRenderPlanOptions<'a> {
    /// Built-in header format.
    pub fmt_header: &'a SpecCellFormat,
    /// Built-in content format.
    pub fmt_content: &'a SpecCellFormat,
    /// Number formats registered per declared type.
    pub dict_default_number_formats: &'a BTreeMap<TypeId, String>,
}

////////////////////////////////////////////////////////////////////////////////
// #region CellResolution

/// Header text of `column`: the configured text when non-empty, else the label.
pub fn resolve_header_text<T>(column: &SpecColumn<T>) -> String {
    match column.configuration.header.text.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => column.label.clone(),
    }
}

/// Header cell of `column`.
pub fn resolve_header_cell<T>(column: &SpecColumn<T>, fmt_header: &SpecCellFormat) -> SpecRenderedCell {
    let mut fmt = fmt_header.clone();
    if let Some(style) = &column.configuration.header.style {
        style(&mut fmt);
    }
    SpecRenderedCell::text(resolve_header_text(column), fmt)
}

/// Number format of non-text content cells.
///
/// Column override, then the type default (exact type, then the type without
/// `Option`), then the built-in content format, then a date default.
pub fn resolve_number_format<T>(
    column: &SpecColumn<T>,
    options: &SpecRenderPlanOptions<'_>,
) -> Option<String> {
    if let Some(num_format) = &column.configuration.content.number_format {
        return Some(num_format.clone());
    }

    let value_type = &column.value_type;
    let num_format_type = options
        .dict_default_number_formats
        .get(&value_type.id)
        .or_else(|| options.dict_default_number_formats.get(&value_type.id_base));
    if let Some(num_format) = num_format_type {
        return Some(num_format.clone());
    }

    if let Some(num_format) = &options.fmt_content.num_format {
        return Some(num_format.clone());
    }

    match value_type.kind {
        EnumValueKind::DateTime => Some(C_NUM_FORMAT_DATETIME_DEFAULT.to_string()),
        EnumValueKind::Date => Some(C_NUM_FORMAT_DATE_DEFAULT.to_string()),
        _ => None,
    }
}

/// Content cell of `column` for `record`.
pub fn resolve_content_cell<T>(
    column: &SpecColumn<T>,
    record: &T,
    options: &SpecRenderPlanOptions<'_>,
) -> Result<SpecRenderedCell, ExportError>
where
    T: 'static,
{
    let cfg_content = &column.configuration.content;
    let value_raw = column.value_of(record);
    let mut fmt = options.fmt_content.clone();

    let mut cell = if let Some(formula) = &cfg_content.formula {
        fmt.num_format = resolve_number_format(column, options);
        SpecRenderedCell {
            formula: Some(formula(record, &value_raw)),
            value: value_raw,
            format: SpecCellFormat::default(),
        }
    } else if let Some(text_format) = &cfg_content.text_format {
        fmt.num_format = None;
        SpecRenderedCell {
            value: EnumCellValue::String(format_text(text_format, &value_raw)?),
            formula: None,
            format: SpecCellFormat::default(),
        }
    } else {
        fmt.num_format = resolve_number_format(column, options);
        SpecRenderedCell {
            value: value_raw,
            formula: None,
            format: SpecCellFormat::default(),
        }
    };

    if let Some(style) = &cfg_content.style {
        style(&mut fmt);
    }
    if let Some(style) = &cfg_content.conditional_style {
        style(record, &mut fmt);
    }
    cell.format = fmt;

    Ok(cell)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutPlanning

/// Plan a header row followed by one row per record.
pub fn plan_table_layout<T: 'static>(
    l_columns: &[&SpecColumn<T>],
    records: &[T],
    options: &SpecRenderPlanOptions<'_>,
) -> Result<SpecRenderedTable, ExportError> {
    let mut l_rows = Vec::with_capacity(records.len() + 1);
    l_rows.push(
        l_columns
            .iter()
            .map(|column| resolve_header_cell(column, options.fmt_header))
            .collect::<Vec<_>>(),
    );
    for record in records {
        let l_row = l_columns
            .iter()
            .map(|column| resolve_content_cell(column, record, options))
            .collect::<Result<Vec<_>, _>>()?;
        l_rows.push(l_row);
    }

    Ok(SpecRenderedTable {
        rows: l_rows,
        n_rows_header: 1,
        widths: l_columns
            .iter()
            .map(|column| column.configuration.width)
            .collect(),
    })
}

/// Plan a `Property | Value` grid for a single record.
///
/// Column widths configured per column do not apply here.
pub fn plan_object_layout<T: 'static>(
    l_columns: &[&SpecColumn<T>],
    record: &T,
    options: &SpecRenderPlanOptions<'_>,
) -> Result<SpecRenderedTable, ExportError> {
    let mut l_rows = Vec::with_capacity(l_columns.len() + 1);
    l_rows.push(vec![
        SpecRenderedCell::text(C_OBJECT_HEADER_PROPERTY, options.fmt_header.clone()),
        SpecRenderedCell::text(C_OBJECT_HEADER_VALUE, options.fmt_header.clone()),
    ]);
    for column in l_columns {
        l_rows.push(vec![
            resolve_header_cell(column, options.fmt_header),
            resolve_content_cell(column, record, options)?,
        ]);
    }

    Ok(SpecRenderedTable {
        rows: l_rows,
        n_rows_header: 1,
        widths: vec![None, None],
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Autofit

/// Fill widths that are still unset from the rendered content.
pub fn apply_autofit_widths(
    table: &mut SpecRenderedTable,
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), ExportError> {
    validate_policy_autofit(policy_autofit)?;
    if policy_autofit.rule_columns == EnumAutofitColumnsRule::None {
        return Ok(());
    }

    let n_cols = table.n_cols();
    let mut l_width_by_col_header = vec![0usize; n_cols];
    let mut l_width_by_col_body = vec![0usize; n_cols];
    let n_rows_body_max = policy_autofit.height_body_inferred_max.unwrap_or(usize::MAX);

    for (n_idx_row, l_row) in table.rows.iter().enumerate() {
        let if_header = n_idx_row < table.n_rows_header;
        if !if_header && n_idx_row - table.n_rows_header >= n_rows_body_max {
            break;
        }
        let l_width_by_col = if if_header {
            &mut l_width_by_col_header
        } else {
            &mut l_width_by_col_body
        };
        for (n_idx_col, cell) in l_row.iter().enumerate().take(n_cols) {
            l_width_by_col[n_idx_col] =
                usize::max(l_width_by_col[n_idx_col], estimate_rendered_width(cell));
        }
    }

    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    let n_pad = policy_autofit.width_cell_padding;

    table.widths.resize(n_cols, None);
    for (n_idx_col, width) in table.widths.iter_mut().enumerate() {
        if width.is_some() {
            continue;
        }
        let n_width_recorded = match policy_autofit.rule_columns {
            EnumAutofitColumnsRule::Header => l_width_by_col_header[n_idx_col],
            EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
            EnumAutofitColumnsRule::All | EnumAutofitColumnsRule::None => usize::max(
                l_width_by_col_header[n_idx_col],
                l_width_by_col_body[n_idx_col],
            ),
        };
        let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
        *width = Some(n_width_final as f64);
    }

    Ok(())
}

/// Reject inconsistent autofit bounds.
pub fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), ExportError> {
    if policy_autofit.width_cell_min == 0 {
        return Err(ExportError::InvalidPolicy(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(ExportError::InvalidPolicy(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

/// Estimate displayed width units of one resolved cell.
pub fn estimate_rendered_width(cell: &SpecRenderedCell) -> usize {
    let n_len_num_format = cell.format.num_format.as_deref().map_or(0, str::len);
    match &cell.value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => usize::max(n.to_string().len(), n_len_num_format),
        EnumCellValue::Boolean(_) => 5,
        EnumCellValue::DateTime(_) if n_len_num_format > 0 => n_len_num_format,
        EnumCellValue::DateTime(_) => 19,
        EnumCellValue::Date(_) if n_len_num_format > 0 => n_len_num_format,
        EnumCellValue::Date(_) => 10,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
