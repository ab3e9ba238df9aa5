//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel table name maximum length.
pub const N_LEN_EXCEL_TABLE_NAME_MAX: usize = 255;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Sheet name used when the exporter has no configured worksheet name.
pub const C_SHEET_NAME_DEFAULT: &str = "Data";
/// Header of the label column in object layout.
pub const C_OBJECT_HEADER_PROPERTY: &str = "Property";
/// Header of the value column in object layout.
pub const C_OBJECT_HEADER_VALUE: &str = "Value";

/// Number format applied to date-time columns when nothing else is configured.
pub const C_NUM_FORMAT_DATETIME_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";
/// Number format applied to date columns when nothing else is configured.
pub const C_NUM_FORMAT_DATE_DEFAULT: &str = "yyyy-mm-dd";

/// Border code: no border.
pub const N_BORDER_NONE: i64 = 0;
/// Border code: thin line.
pub const N_BORDER_THIN: i64 = 1;
/// Border code: medium line.
pub const N_BORDER_MEDIUM: i64 = 2;
/// Border code: dashed line.
pub const N_BORDER_DASHED: i64 = 3;
/// Border code: dotted line.
pub const N_BORDER_DOTTED: i64 = 4;
/// Border code: thick line.
pub const N_BORDER_THICK: i64 = 5;

/// Canonical format preset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnumFmtKey {
    /// Header cell format.
    Header,
    /// Content cell format.
    Content,
}

/// Build default named format presets used when rendering headers and content.
pub fn derive_default_export_formats() -> BTreeMap<EnumFmtKey, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        EnumFmtKey::Header,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("left".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(EnumFmtKey::Content, cfg_base_fmt_spec);

    dict_fmt
}
