//! Column descriptors and per-column configuration.

use std::collections::BTreeSet;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::ExportError;
use crate::record::{DynamicProperty, ExportRecord, FnProjection, SpecValueType};
use crate::spec::{EnumCellValue, SpecCellFormat};
use crate::util::humanize_member_name;

/// Style mutator applied on top of a built-in format.
pub type FnStyle = Rc<dyn Fn(&mut SpecCellFormat)>;
/// Per-row style mutator; receives the row's record.
pub type FnConditionalStyle<T> = Rc<dyn Fn(&T, &mut SpecCellFormat)>;
/// Formula builder; receives the row's record and the raw column value.
pub type FnFormula<T> = Rc<dyn Fn(&T, &EnumCellValue) -> String>;

////////////////////////////////////////////////////////////////////////////////
// #region ColumnConfiguration

/// Header overrides of one column.
#[derive(Clone, Default)]
pub struct SpecHeaderConfiguration {
    /// Header text; `None` or empty falls back to the column label.
    pub text: Option<String>,
    /// Header style mutator.
    pub style: Option<FnStyle>,
}

impl SpecHeaderConfiguration {
    /// Set the header style mutator.
    pub fn set_style<F>(&mut self, style: F) -> &mut Self
    where
        F: Fn(&mut SpecCellFormat) + 'static,
    {
        self.style = Some(Rc::new(style));
        self
    }
}

/// Content overrides of one column.
pub struct SpecContentConfiguration<T> {
    /// `{0}` style format; the cell is written as text and number formats are skipped.
    pub text_format: Option<String>,
    /// Number format code.
    pub number_format: Option<String>,
    /// Style mutator applied to every content cell.
    pub style: Option<FnStyle>,
    /// Style mutator evaluated per row.
    pub conditional_style: Option<FnConditionalStyle<T>>,
    /// Formula builder; the cell holds a formula instead of a literal.
    pub formula: Option<FnFormula<T>>,
}

impl<T> Default for SpecContentConfiguration<T> {
    fn default() -> Self {
        Self {
            text_format: None,
            number_format: None,
            style: None,
            conditional_style: None,
            formula: None,
        }
    }
}

impl<T> Clone for SpecContentConfiguration<T> {
    fn clone(&self) -> Self {
        Self {
            text_format: self.text_format.clone(),
            number_format: self.number_format.clone(),
            style: self.style.clone(),
            conditional_style: self.conditional_style.clone(),
            formula: self.formula.clone(),
        }
    }
}

impl<T> SpecContentConfiguration<T> {
    /// Set the content style mutator.
    pub fn set_style<F>(&mut self, style: F) -> &mut Self
    where
        F: Fn(&mut SpecCellFormat) + 'static,
    {
        self.style = Some(Rc::new(style));
        self
    }

    /// Set the per-row style mutator.
    pub fn set_conditional_style<F>(&mut self, style: F) -> &mut Self
    where
        F: Fn(&T, &mut SpecCellFormat) + 'static,
    {
        self.conditional_style = Some(Rc::new(style));
        self
    }

    /// Set the formula builder.
    pub fn set_formula<F>(&mut self, formula: F) -> &mut Self
    where
        F: Fn(&T, &EnumCellValue) -> String + 'static,
    {
        self.formula = Some(Rc::new(formula));
        self
    }
}

/// Mutable configuration of one column.
pub struct SpecColumnConfiguration<T> {
    /// Header overrides.
    pub header: SpecHeaderConfiguration,
    /// Content overrides.
    pub content: SpecContentConfiguration<T>,
    /// Explicit column width; wins over autofit.
    pub width: Option<f64>,
}

impl<T> Default for SpecColumnConfiguration<T> {
    fn default() -> Self {
        Self {
            header: SpecHeaderConfiguration::default(),
            content: SpecContentConfiguration::default(),
            width: None,
        }
    }
}

impl<T> Clone for SpecColumnConfiguration<T> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            content: self.content.clone(),
            width: self.width,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Column

/// Origin of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnSource {
    /// Backed by a record field.
    Field,
    /// Declared through a [`DynamicProperty`].
    Dynamic,
}

/// One exportable column.
pub struct SpecColumn<T> {
    /// Stable key (field name or dynamic property name).
    pub key: String,
    /// Display label.
    pub label: String,
    /// Declared value type.
    pub value_type: SpecValueType,
    /// Excluded from rendering.
    pub if_ignored: bool,
    /// Origin of the column.
    pub source: EnumColumnSource,
    /// Header/content overrides.
    pub configuration: SpecColumnConfiguration<T>,
    projection: FnProjection<T>,
}

impl<T: 'static> SpecColumn<T> {
    /// Build a field-backed column.
    pub fn from_field(
        key: &'static str,
        display_name: Option<&'static str>,
        value_type: SpecValueType,
    ) -> Self
    where
        T: ExportRecord,
    {
        Self {
            key: key.to_string(),
            label: display_name
                .map(ToString::to_string)
                .unwrap_or_else(|| humanize_member_name(key)),
            value_type,
            if_ignored: false,
            source: EnumColumnSource::Field,
            configuration: SpecColumnConfiguration::default(),
            projection: Rc::new(move |record: &T| record.field_value(key)),
        }
    }

    /// Build a computed column.
    pub fn from_dynamic(property: DynamicProperty<T>) -> Self {
        Self {
            key: property.name,
            label: property.display_name,
            value_type: property.value_type,
            if_ignored: false,
            source: EnumColumnSource::Dynamic,
            configuration: SpecColumnConfiguration::default(),
            projection: property.projection,
        }
    }

    /// Raw value of this column for `record`.
    pub fn value_of(&self, record: &T) -> EnumCellValue {
        (self.projection)(record)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSelection

/// Something that names one or more columns.
pub trait ColumnSelector {
    /// Selected keys, in selection order.
    fn column_keys(&self) -> Vec<String>;
}

impl ColumnSelector for &str {
    fn column_keys(&self) -> Vec<String> {
        vec![(*self).to_string()]
    }
}

impl ColumnSelector for String {
    fn column_keys(&self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl ColumnSelector for &[&str] {
    fn column_keys(&self) -> Vec<String> {
        self.iter().map(|key| (*key).to_string()).collect()
    }
}

impl<const N: usize> ColumnSelector for [&str; N] {
    fn column_keys(&self) -> Vec<String> {
        self.iter().map(|key| (*key).to_string()).collect()
    }
}

impl ColumnSelector for Vec<&str> {
    fn column_keys(&self) -> Vec<String> {
        self.iter().map(|key| (*key).to_string()).collect()
    }
}

impl ColumnSelector for Vec<String> {
    fn column_keys(&self) -> Vec<String> {
        self.clone()
    }
}

/// Ordered, key-addressable column list of one exporter.
pub struct SpecColumnSet<T> {
    dict_columns: IndexMap<String, SpecColumn<T>>,
}

impl<T: 'static> SpecColumnSet<T> {
    /// Discover the field-backed columns of `T`.
    pub fn from_record_type() -> Self
    where
        T: ExportRecord,
    {
        let mut dict_columns = IndexMap::new();
        for field in T::fields() {
            let column = SpecColumn::from_field(field.key, field.display_name, field.value_type);
            dict_columns.insert(column.key.clone(), column);
        }
        Self { dict_columns }
    }

    /// Add a computed column.
    ///
    /// A column with the same key is replaced in place.
    pub fn insert_dynamic(&mut self, property: DynamicProperty<T>) {
        let column = SpecColumn::from_dynamic(property);
        self.dict_columns.insert(column.key.clone(), column);
    }

    /// Number of columns, ignored ones included.
    pub fn len(&self) -> usize {
        self.dict_columns.len()
    }

    /// Whether there are no columns.
    pub fn is_empty(&self) -> bool {
        self.dict_columns.is_empty()
    }

    /// Column by key.
    pub fn column(&self, key: &str) -> Option<&SpecColumn<T>> {
        self.dict_columns.get(key)
    }

    /// Mutable column by key.
    pub fn column_mut(&mut self, key: &str) -> Option<&mut SpecColumn<T>> {
        self.dict_columns.get_mut(key)
    }

    /// All columns in order, ignored ones included.
    pub fn iter(&self) -> impl Iterator<Item = &SpecColumn<T>> {
        self.dict_columns.values()
    }

    /// Columns that will be rendered, in order.
    pub fn active_columns(&self) -> Vec<&SpecColumn<T>> {
        self.dict_columns
            .values()
            .filter(|column| !column.if_ignored)
            .collect()
    }

    /// Resolve a selector to existing keys, deduplicated in selection order.
    pub fn resolve_keys(&self, selector: &impl ColumnSelector) -> Result<Vec<String>, ExportError> {
        let mut set_seen = BTreeSet::new();
        let mut l_keys = Vec::new();
        for key in selector.column_keys() {
            if !self.dict_columns.contains_key(&key) {
                return Err(ExportError::UnknownColumn {
                    key,
                    available: self
                        .dict_columns
                        .keys()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            if set_seen.insert(key.clone()) {
                l_keys.push(key);
            }
        }
        Ok(l_keys)
    }

    /// Mark `keys` ignored.
    pub fn ignore(&mut self, keys: &[String]) {
        for key in keys {
            if let Some(column) = self.dict_columns.get_mut(key) {
                column.if_ignored = true;
            }
        }
    }

    /// Keep exactly `keys`, in that order; every other column becomes ignored.
    pub fn display(&mut self, keys: &[String]) {
        let mut dict_reordered = IndexMap::with_capacity(self.dict_columns.len());
        for key in keys {
            if let Some((key_owned, mut column)) = self.dict_columns.shift_remove_entry(key) {
                column.if_ignored = false;
                dict_reordered.insert(key_owned, column);
            }
        }
        for (key_owned, mut column) in self.dict_columns.drain(..) {
            column.if_ignored = true;
            dict_reordered.insert(key_owned, column);
        }
        self.dict_columns = dict_reordered;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EnumValueKind;
    use crate::testkit::SampleRow;

    fn derive_keys(l_columns: &[&SpecColumn<SampleRow>]) -> Vec<String> {
        l_columns.iter().map(|column| column.key.clone()).collect()
    }

    #[test]
    fn test_from_record_type_humanizes_labels_in_field_order() {
        let column_set = SpecColumnSet::<SampleRow>::from_record_type();
        let l_labels: Vec<&str> = column_set.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            l_labels,
            vec!["Text Value", "Date Value", "Double Value", "Int Value"]
        );
    }

    #[test]
    fn test_dynamic_property_with_same_key_replaces_field_in_place() {
        let mut column_set = SpecColumnSet::<SampleRow>::from_record_type();
        column_set.insert_dynamic(DynamicProperty::new(
            "date_value",
            "Shifted",
            |row: &SampleRow| row.int_value * 2,
        ));
        column_set.insert_dynamic(DynamicProperty::new("extra", "Extra", |_: &SampleRow| {
            "x"
        }));

        assert_eq!(column_set.len(), 5);
        let l_keys = derive_keys(&column_set.active_columns());
        assert_eq!(
            l_keys,
            vec!["text_value", "date_value", "double_value", "int_value", "extra"]
        );

        let column = column_set.column("date_value").expect("column exists");
        assert_eq!(column.label, "Shifted");
        assert_eq!(column.source, EnumColumnSource::Dynamic);
        assert_eq!(column.value_type.kind, EnumValueKind::Integer);
    }

    #[test]
    fn test_resolve_keys_rejects_unknown_key() {
        let column_set = SpecColumnSet::<SampleRow>::from_record_type();
        let err = column_set
            .resolve_keys(&["text_value", "missing"])
            .expect_err("missing key must fail");
        match err {
            ExportError::UnknownColumn { key, available } => {
                assert_eq!(key, "missing");
                assert!(available.contains("int_value"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_overrides_membership_and_order() {
        let mut column_set = SpecColumnSet::<SampleRow>::from_record_type();
        column_set.ignore(&["double_value".to_string()]);
        column_set.display(&["double_value".to_string(), "text_value".to_string()]);
        assert_eq!(
            derive_keys(&column_set.active_columns()),
            vec!["double_value", "text_value"]
        );

        column_set.ignore(&["text_value".to_string()]);
        assert_eq!(derive_keys(&column_set.active_columns()), vec!["double_value"]);
    }
}
