//! Record schemas and value typing.
//!
//! A record type describes its exportable fields once through
//! [`ExportRecord::fields`]; values are read back per row through
//! [`ExportRecord::field_value`]. `#[derive(ExportRecord)]` generates both.

use std::any::{TypeId, type_name};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region ValueTyping

/// Broad value category, used for built-in formats and width estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumValueKind {
    /// Integer number.
    Integer,
    /// Floating point number.
    Decimal,
    /// Boolean.
    Boolean,
    /// Text.
    Text,
    /// Date and time.
    DateTime,
    /// Date only.
    Date,
}

/// Declared type of a column.
///
/// `id` identifies the exact Rust type (`Option<f64>` differs from `f64`);
/// `id_base` strips any `Option` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecValueType {
    /// Exact type identity.
    pub id: TypeId,
    /// Identity of the type without `Option` wrappers.
    pub id_base: TypeId,
    /// Type name, for diagnostics only.
    pub name: &'static str,
    /// Value category.
    pub kind: EnumValueKind,
    /// Whether the type is an `Option`.
    pub if_nullable: bool,
}

impl SpecValueType {
    /// Declared type of `V`.
    pub fn of<V: ToCellValue>() -> Self {
        V::value_type()
    }
}

/// Conversion of a field value into a cell value.
pub trait ToCellValue: 'static {
    /// Value category of the implementing type.
    fn value_kind() -> EnumValueKind
    where
        Self: Sized;

    /// Convert the value for writing.
    fn to_cell_value(&self) -> EnumCellValue;

    /// Declared type of the implementing type.
    fn value_type() -> SpecValueType
    where
        Self: Sized,
    {
        SpecValueType {
            id: TypeId::of::<Self>(),
            id_base: TypeId::of::<Self>(),
            name: type_name::<Self>(),
            kind: Self::value_kind(),
            if_nullable: false,
        }
    }
}

macro_rules! impl_to_cell_value_number {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl ToCellValue for $ty {
                fn value_kind() -> EnumValueKind {
                    $kind
                }

                fn to_cell_value(&self) -> EnumCellValue {
                    EnumCellValue::Number(*self as f64)
                }
            }
        )+
    };
}

impl_to_cell_value_number!(
    EnumValueKind::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
);
impl_to_cell_value_number!(EnumValueKind::Decimal => f32, f64);

impl ToCellValue for bool {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::Boolean
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Boolean(*self)
    }
}

impl ToCellValue for String {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::Text
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.clone())
    }
}

impl ToCellValue for &'static str {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::Text
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String((*self).to_string())
    }
}

impl ToCellValue for char {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::Text
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::String(self.to_string())
    }
}

impl ToCellValue for NaiveDateTime {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::DateTime
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::DateTime(*self)
    }
}

impl ToCellValue for NaiveDate {
    fn value_kind() -> EnumValueKind {
        EnumValueKind::Date
    }

    fn to_cell_value(&self) -> EnumCellValue {
        EnumCellValue::Date(*self)
    }
}

impl<V: ToCellValue> ToCellValue for Option<V> {
    fn value_kind() -> EnumValueKind {
        V::value_kind()
    }

    fn to_cell_value(&self) -> EnumCellValue {
        match self {
            Some(val) => val.to_cell_value(),
            None => EnumCellValue::None,
        }
    }

    fn value_type() -> SpecValueType {
        let value_type_inner = V::value_type();
        SpecValueType {
            id: TypeId::of::<Self>(),
            id_base: value_type_inner.id_base,
            name: type_name::<Self>(),
            kind: value_type_inner.kind,
            if_nullable: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordSchema

/// Descriptor of one exportable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecFieldSchema {
    /// Field name; the column key.
    pub key: &'static str,
    /// Display-name annotation, used verbatim as the column label.
    pub display_name: Option<&'static str>,
    /// Declared field type.
    pub value_type: SpecValueType,
}

impl SpecFieldSchema {
    /// Describe a field of type `V`.
    pub fn new<V: ToCellValue>(key: &'static str, display_name: Option<&'static str>) -> Self {
        Self {
            key,
            display_name,
            value_type: V::value_type(),
        }
    }
}

/// A type whose values can be exported as spreadsheet rows.
pub trait ExportRecord: 'static {
    /// Ordered field descriptors, computed once per type.
    fn fields() -> &'static [SpecFieldSchema];

    /// Value of the field named `key`; unknown keys yield an empty value.
    fn field_value(&self, key: &str) -> EnumCellValue;
}

/// Stored projection from a record to a cell value.
pub type FnProjection<T> = Rc<dyn Fn(&T) -> EnumCellValue>;

/// A computed column that is not backed by a field.
pub struct DynamicProperty<T> {
    /// Column key.
    pub name: String,
    /// Column label, used verbatim.
    pub display_name: String,
    /// Declared value type.
    pub value_type: SpecValueType,
    pub(crate) projection: FnProjection<T>,
}

impl<T: 'static> DynamicProperty<T> {
    /// Declare a computed column whose type is the projection's return type.
    pub fn new<V, F>(name: impl Into<String>, display_name: impl Into<String>, projection: F) -> Self
    where
        V: ToCellValue,
        F: Fn(&T) -> V + 'static,
    {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            value_type: V::value_type(),
            projection: Rc::new(move |record: &T| projection(record).to_cell_value()),
        }
    }

    /// Declare a computed column with an explicit declared type.
    pub fn with_value_type<F>(
        name: impl Into<String>,
        display_name: impl Into<String>,
        value_type: SpecValueType,
        projection: F,
    ) -> Self
    where
        F: Fn(&T) -> EnumCellValue + 'static,
    {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            value_type,
            projection: Rc::new(projection),
        }
    }

    /// Evaluate the projection for one record.
    pub fn value_of(&self, record: &T) -> EnumCellValue {
        (self.projection)(record)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
