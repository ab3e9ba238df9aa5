//! Fluent exporter that maps records onto a worksheet range.
//!
//! ```ignore
//! let workbook = XlsxExporter::from_records(rows)
//!     .number_format_for("amount", "#,##0.00")?
//!     .ignore("internal_id")?
//!     .create_workbook()?;
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::rc::Rc;

use rust_xlsxwriter::TableStyle;
use tracing::debug;

use crate::column::{ColumnSelector, FnStyle, SpecColumnConfiguration, SpecColumnSet};
use crate::error::ExportError;
use crate::record::{DynamicProperty, ExportRecord, ToCellValue};
use crate::render::{
    SpecRenderPlanOptions, apply_autofit_widths, plan_object_layout, plan_table_layout,
};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumExportLayout, EnumSheetPlacement,
    SpecAutofitCellsPolicy, SpecCellAnchor, SpecCellFormat, SpecExportOptions, SpecRenderedTable,
    SpecTableHandle,
};
use crate::writer::XlsxWorkbook;

/// Table-level decoration applied to the planned grid.
pub type FnCustomizeTable = Rc<dyn Fn(&mut SpecRenderedTable)>;

/// Column-configuration builder bound to one data set.
///
/// Column setters fail with [`ExportError::UnknownColumn`] when a key is not
/// a column. The exporter holds `Rc` closures and is not `Send`.
pub struct XlsxExporter<T: ExportRecord> {
    records: Option<Vec<T>>,
    layout: EnumExportLayout,
    column_set: SpecColumnSet<T>,
    dict_default_number_formats: BTreeMap<TypeId, String>,
    options: SpecExportOptions,
    l_customize_table: Vec<FnCustomizeTable>,
}

impl<T: ExportRecord> XlsxExporter<T> {
    fn new(records: Option<Vec<T>>, layout: EnumExportLayout) -> Self {
        Self {
            records,
            layout,
            column_set: SpecColumnSet::from_record_type(),
            dict_default_number_formats: BTreeMap::new(),
            options: SpecExportOptions::default(),
            l_customize_table: Vec::new(),
        }
    }

    /// Export a sequence of records, one row each.
    ///
    /// `None` and an empty sequence both render nothing.
    pub fn from_records(records: impl Into<Option<Vec<T>>>) -> Self {
        Self::new(records.into(), EnumExportLayout::Table)
    }

    /// Export a single record as `Property | Value` rows.
    pub fn from_object(record: impl Into<Option<T>>) -> Self {
        Self::new(record.into().map(|val| vec![val]), EnumExportLayout::Object)
    }

    /// Append computed columns after the field columns.
    ///
    /// A property whose name matches an existing key replaces that column in place.
    pub fn with_dynamic_properties(
        mut self,
        properties: impl IntoIterator<Item = DynamicProperty<T>>,
    ) -> Self {
        for property in properties {
            self.column_set.insert_dynamic(property);
        }
        self
    }

    // #region ColumnConfiguration

    /// Mutate the configuration of every selected column.
    pub fn configure<F>(mut self, selector: impl ColumnSelector, mut mutator: F) -> Result<Self, ExportError>
    where
        F: FnMut(&mut SpecColumnConfiguration<T>),
    {
        for key in self.column_set.resolve_keys(&selector)? {
            if let Some(column) = self.column_set.column_mut(&key) {
                mutator(&mut column.configuration);
            }
        }
        Ok(self)
    }

    /// Exclude columns from rendering; adds to earlier exclusions.
    pub fn ignore(mut self, selector: impl ColumnSelector) -> Result<Self, ExportError> {
        let l_keys = self.column_set.resolve_keys(&selector)?;
        self.column_set.ignore(&l_keys);
        Ok(self)
    }

    /// Render exactly the selected columns, in selection order.
    pub fn display(mut self, selector: impl ColumnSelector) -> Result<Self, ExportError> {
        let l_keys = self.column_set.resolve_keys(&selector)?;
        self.column_set.display(&l_keys);
        Ok(self)
    }

    /// Register the number format used for columns declared as `V`.
    ///
    /// Columns of `Option<V>` fall back to this entry unless `Option<V>` has its own.
    pub fn default_number_format<V: ToCellValue>(mut self, format: impl Into<String>) -> Self {
        self.dict_default_number_formats
            .insert(TypeId::of::<V>(), format.into());
        self
    }

    pub fn number_format_for(
        self,
        selector: impl ColumnSelector,
        format: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let format = format.into();
        self.configure(selector, |cfg| cfg.content.number_format = Some(format.clone()))
    }

    /// Write the selected columns as text produced by a `{0}` format.
    pub fn text_format_for(
        self,
        selector: impl ColumnSelector,
        format: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let format = format.into();
        self.configure(selector, |cfg| cfg.content.text_format = Some(format.clone()))
    }

    pub fn style_for<F>(self, selector: impl ColumnSelector, style: F) -> Result<Self, ExportError>
    where
        F: Fn(&mut SpecCellFormat) + 'static,
    {
        let style: FnStyle = Rc::new(style);
        self.configure(selector, |cfg| cfg.content.style = Some(Rc::clone(&style)))
    }

    pub fn header_style_for<F>(
        self,
        selector: impl ColumnSelector,
        style: F,
    ) -> Result<Self, ExportError>
    where
        F: Fn(&mut SpecCellFormat) + 'static,
    {
        let style: FnStyle = Rc::new(style);
        self.configure(selector, |cfg| cfg.header.style = Some(Rc::clone(&style)))
    }

    /// Style content cells per row from the row's record.
    pub fn conditional_style_for<F>(
        self,
        selector: impl ColumnSelector,
        style: F,
    ) -> Result<Self, ExportError>
    where
        F: Fn(&T, &mut SpecCellFormat) + 'static,
    {
        let style: Rc<dyn Fn(&T, &mut SpecCellFormat)> = Rc::new(style);
        self.configure(selector, |cfg| {
            cfg.content.conditional_style = Some(Rc::clone(&style));
        })
    }

    /// Write formulas built from the row's record and the raw column value.
    pub fn formula_for<F>(self, selector: impl ColumnSelector, formula: F) -> Result<Self, ExportError>
    where
        F: Fn(&T, &EnumCellValue) -> String + 'static,
    {
        let formula: Rc<dyn Fn(&T, &EnumCellValue) -> String> = Rc::new(formula);
        self.configure(selector, |cfg| cfg.content.formula = Some(Rc::clone(&formula)))
    }

    pub fn header_text_for(
        self,
        selector: impl ColumnSelector,
        text: impl Into<String>,
    ) -> Result<Self, ExportError> {
        let text = text.into();
        self.configure(selector, |cfg| cfg.header.text = Some(text.clone()))
    }

    /// Fix the width of the selected columns; autofit leaves them alone.
    pub fn width_for(self, selector: impl ColumnSelector, width: f64) -> Result<Self, ExportError> {
        self.configure(selector, |cfg| cfg.width = Some(width))
    }

    // #endregion
    // #region SheetOptions

    /// Decorate the planned grid after every cell is resolved.
    pub fn customize_table<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut SpecRenderedTable) + 'static,
    {
        self.l_customize_table.push(Rc::new(customize));
        self
    }

    pub fn worksheet_name(mut self, name: impl Into<String>) -> Self {
        self.options.worksheet_name = Some(name.into());
        self
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.options.table_name = Some(name.into());
        self
    }

    /// Table style; `None` writes a plain range.
    pub fn table_style(mut self, style: Option<TableStyle>) -> Self {
        self.options.table_style = style;
        self
    }

    /// Placement used by [`Self::append_to_workbook`].
    pub fn placement(mut self, placement: EnumSheetPlacement) -> Self {
        self.options.placement = placement;
        self
    }

    /// Top-left cell of the grid on a new sheet.
    pub fn anchor(mut self, row: usize, col: usize) -> Self {
        self.options.anchor = SpecCellAnchor { row, col };
        self
    }

    /// Toggle autofit; enabling keeps a previously chosen rule.
    pub fn autofit_columns(mut self, if_autofit: bool) -> Self {
        let policy = &mut self.options.policy_autofit;
        if !if_autofit {
            policy.rule_columns = EnumAutofitColumnsRule::None;
        } else if policy.rule_columns == EnumAutofitColumnsRule::None {
            policy.rule_columns = EnumAutofitColumnsRule::All;
        }
        self
    }

    pub fn policy_autofit(mut self, policy: SpecAutofitCellsPolicy) -> Self {
        self.options.policy_autofit = policy;
        self
    }

    /// Built-in header format.
    pub fn header_format(mut self, format: SpecCellFormat) -> Self {
        self.options.fmt_header = format;
        self
    }

    /// Built-in content format.
    pub fn content_format(mut self, format: SpecCellFormat) -> Self {
        self.options.fmt_content = format;
        self
    }

    // #endregion

    pub fn column_set(&self) -> &SpecColumnSet<T> {
        &self.column_set
    }

    pub fn options(&self) -> &SpecExportOptions {
        &self.options
    }

    /// Resolve every cell into a grid without touching a workbook.
    ///
    /// `None` when there is no data or every column is ignored.
    pub fn plan(&self) -> Result<Option<SpecRenderedTable>, ExportError> {
        let Some(records) = self.records.as_deref().filter(|val| !val.is_empty()) else {
            return Ok(None);
        };
        let l_columns = self.column_set.active_columns();
        if l_columns.is_empty() {
            return Ok(None);
        }

        let options_plan = SpecRenderPlanOptions {
            fmt_header: &self.options.fmt_header,
            fmt_content: &self.options.fmt_content,
            dict_default_number_formats: &self.dict_default_number_formats,
        };
        let mut table = match (self.layout, records) {
            (EnumExportLayout::Object, [record, ..]) => {
                plan_object_layout(&l_columns, record, &options_plan)?
            }
            _ => plan_table_layout(&l_columns, records, &options_plan)?,
        };

        for customize in &self.l_customize_table {
            customize(&mut table);
        }
        apply_autofit_widths(&mut table, &self.options.policy_autofit)?;

        debug!(
            layout = ?self.layout,
            n_records = records.len(),
            n_columns = l_columns.len(),
            "export grid planned"
        );
        Ok(Some(table))
    }

    /// Render into a fresh workbook with one sheet.
    ///
    /// `Ok(None)` when there is nothing to render.
    pub fn create_workbook(&self) -> Result<Option<XlsxWorkbook>, ExportError> {
        let Some(table) = self.plan()? else {
            return Ok(None);
        };

        let options_create = SpecExportOptions {
            placement: EnumSheetPlacement::NewSheet,
            ..self.options.clone()
        };
        let mut workbook = XlsxWorkbook::new();
        workbook.write_rendered_table(&table, &options_create)?;
        Ok(Some(workbook))
    }

    /// Render into an existing workbook according to the configured placement.
    ///
    /// `Ok(None)` leaves `workbook` untouched when there is nothing to render.
    pub fn append_to_workbook(
        &self,
        workbook: Option<&mut XlsxWorkbook>,
    ) -> Result<Option<SpecTableHandle>, ExportError> {
        let workbook = workbook.ok_or(ExportError::MissingArgument { param: "workbook" })?;
        let Some(table) = self.plan()? else {
            return Ok(None);
        };
        workbook
            .write_rendered_table(&table, &self.options)
            .map(Some)
    }
}
