//! Stateless helper utilities used by the resolver and the workbook writer.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_LEN_EXCEL_TABLE_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::error::ExportError;
use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region MemberNames

/// Turn a member name into a label: `IntValue` and `int_value` both give `Int Value`.
pub fn humanize_member_name(name: &str) -> String {
    let mut l_words: Vec<String> = Vec::new();
    let mut c_word = String::new();
    let mut chr_prev: Option<char> = None;

    for chr in name.chars() {
        if chr == '_' || chr == ' ' || chr == '-' {
            if !c_word.is_empty() {
                l_words.push(std::mem::take(&mut c_word));
            }
            chr_prev = None;
            continue;
        }

        let if_boundary = match chr_prev {
            Some(prev) => {
                (chr.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()))
                    || (chr.is_ascii_digit() && prev.is_alphabetic())
            }
            None => false,
        };
        if if_boundary && !c_word.is_empty() {
            l_words.push(std::mem::take(&mut c_word));
        }
        c_word.push(chr);
        chr_prev = Some(chr);
    }
    if !c_word.is_empty() {
        l_words.push(c_word);
    }

    l_words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetAndTableNames

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Turn arbitrary text into a valid Excel table name.
///
/// Table names hold letters, digits, `_` and `.`, start with a letter or `_`
/// and must not look like a cell reference.
pub fn sanitize_table_name(name: &str) -> String {
    let mut c_name: String = name
        .trim()
        .chars()
        .map(|chr| {
            if chr.is_alphanumeric() || chr == '_' || chr == '.' {
                chr
            } else {
                '_'
            }
        })
        .collect();

    if c_name.is_empty() {
        c_name = "Table".to_string();
    }
    let if_valid_start = c_name
        .chars()
        .next()
        .is_some_and(|chr| chr.is_alphabetic() || chr == '_');
    if !if_valid_start {
        c_name.insert(0, 't');
    }
    if is_cell_reference_like(&c_name) {
        c_name.insert(0, '_');
    }

    c_name.chars().take(N_LEN_EXCEL_TABLE_NAME_MAX).collect()
}

/// Whether `name` reads as an A1 or R1C1 reference (`A1`, `XFD10`, `R`, `C`, `R1C1`).
fn is_cell_reference_like(name: &str) -> bool {
    let c_upper = name.to_ascii_uppercase();
    if c_upper == "R" || c_upper == "C" {
        return true;
    }

    let n_letters = c_upper
        .chars()
        .take_while(|chr| chr.is_ascii_alphabetic())
        .count();
    let c_rest = &c_upper[n_letters..];
    if (1..=3).contains(&n_letters)
        && !c_rest.is_empty()
        && c_rest.chars().all(|chr| chr.is_ascii_digit())
    {
        return true;
    }

    if let Some(c_after_r) = c_upper.strip_prefix('R') {
        let n_row_digits = c_after_r
            .chars()
            .take_while(|chr| chr.is_ascii_digit())
            .count();
        if let Some(c_after_c) = c_after_r[n_row_digits..].strip_prefix('C') {
            return c_after_c.chars().all(|chr| chr.is_ascii_digit());
        }
    }
    false
}

/// Make table header texts non-empty and unique (case-insensitive).
///
/// Returns the adjusted headers and whether anything changed.
pub fn derive_unique_table_headers(headers: &[String]) -> (Vec<String>, bool) {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut l_headers = Vec::with_capacity(headers.len());
    let mut if_changed = false;

    for (n_idx, c_header) in headers.iter().enumerate() {
        let mut c_candidate = if c_header.trim().is_empty() {
            format!("Column{}", n_idx + 1)
        } else {
            c_header.clone()
        };

        let c_base = c_candidate.clone();
        let mut n_suffix = 2usize;
        while set_seen.contains(&c_candidate.to_lowercase()) {
            c_candidate = format!("{c_base}{n_suffix}");
            n_suffix += 1;
        }

        if c_candidate != *c_header {
            if_changed = true;
        }
        set_seen.insert(c_candidate.to_lowercase());
        l_headers.push(c_candidate);
    }

    (l_headers, if_changed)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TextFormat

/// Substitute `value` into a `{0}` style format.
///
/// Supports `{0}`, `{0:pattern}` and the `{{` / `}}` escapes. Date patterns take
/// `y M d H h m s f t` runs and quoted literals. Number patterns take `F`, `N` and `D`
/// with an optional precision, or custom `0 # , . %` patterns.
pub fn format_text(text_format: &str, value: &EnumCellValue) -> Result<String, ExportError> {
    let derive_error = |reason: String| ExportError::TextFormat {
        format: text_format.to_string(),
        reason,
    };

    let mut c_out = String::with_capacity(text_format.len() + 16);
    let mut chars = text_format.chars().peekable();
    while let Some(chr) = chars.next() {
        match chr {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    c_out.push('{');
                    continue;
                }

                let mut c_item = String::new();
                let mut if_closed = false;
                for chr_item in chars.by_ref() {
                    if chr_item == '}' {
                        if_closed = true;
                        break;
                    }
                    c_item.push(chr_item);
                }
                if !if_closed {
                    return Err(derive_error("unclosed placeholder".to_string()));
                }

                let (c_index, c_pattern) = match c_item.split_once(':') {
                    Some((c_index, c_pattern)) => (c_index, Some(c_pattern)),
                    None => (c_item.as_str(), None),
                };
                if c_index.trim() != "0" {
                    return Err(derive_error(format!(
                        "unsupported placeholder index {c_index:?}; only {{0}} is available"
                    )));
                }
                c_out.push_str(&format_placeholder(value, c_pattern).map_err(derive_error)?);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    c_out.push('}');
                } else {
                    return Err(derive_error("unmatched '}'".to_string()));
                }
            }
            _ => c_out.push(chr),
        }
    }

    Ok(c_out)
}

fn format_placeholder(value: &EnumCellValue, pattern: Option<&str>) -> Result<String, String> {
    let Some(c_pattern) = pattern.filter(|val| !val.is_empty()) else {
        return Ok(value.to_string());
    };

    match value {
        EnumCellValue::DateTime(val) => format_datetime_pattern(val, c_pattern),
        EnumCellValue::Date(val) => format_datetime_pattern(&val.and_time(NaiveTime::MIN), c_pattern),
        EnumCellValue::Number(val) => format_number_pattern(*val, c_pattern),
        _ => Ok(value.to_string()),
    }
}

enum EnumDateToken {
    Literal(char),
    Strftime(&'static str),
    Fraction(usize),
    MeridiemInitial,
}

/// Format a date-time with a `yyyy-MM-dd HH:mm` style pattern.
pub fn format_datetime_pattern(value: &NaiveDateTime, pattern: &str) -> Result<String, String> {
    let mut c_out = String::with_capacity(pattern.len() * 2);
    for token in derive_datetime_tokens(pattern)? {
        match token {
            EnumDateToken::Literal(chr) => c_out.push(chr),
            EnumDateToken::Strftime(c_token) => write!(c_out, "{}", value.format(c_token))
                .map_err(|_| format!("unsupported date pattern {pattern:?}"))?,
            EnumDateToken::Fraction(n_digits) => {
                let n_nanos = value.nanosecond() % 1_000_000_000;
                let n_scaled = n_nanos / 10u32.pow(9 - n_digits as u32);
                c_out.push_str(&format!("{n_scaled:0n_digits$}"));
            }
            EnumDateToken::MeridiemInitial => {
                c_out.push(if value.hour() < 12 { 'A' } else { 'P' });
            }
        }
    }
    Ok(c_out)
}

fn derive_datetime_tokens(pattern: &str) -> Result<Vec<EnumDateToken>, String> {
    let v_chars: Vec<char> = pattern.chars().collect();
    let mut l_tokens = Vec::with_capacity(v_chars.len());

    let mut n_idx = 0;
    while n_idx < v_chars.len() {
        let chr = v_chars[n_idx];

        if chr == '\'' || chr == '"' {
            n_idx += 1;
            while n_idx < v_chars.len() && v_chars[n_idx] != chr {
                l_tokens.push(EnumDateToken::Literal(v_chars[n_idx]));
                n_idx += 1;
            }
            n_idx += 1;
            continue;
        }
        if chr == '\\' && n_idx + 1 < v_chars.len() {
            l_tokens.push(EnumDateToken::Literal(v_chars[n_idx + 1]));
            n_idx += 2;
            continue;
        }

        let mut n_run = 1;
        while n_idx + n_run < v_chars.len() && v_chars[n_idx + n_run] == chr {
            n_run += 1;
        }

        let c_strftime = match (chr, n_run) {
            ('y', 1..=2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', 2) => Some("%d"),
            ('d', 3) => Some("%a"),
            ('d', _) => Some("%A"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('t', 2..) => Some("%p"),
            _ => None,
        };
        match (chr, c_strftime) {
            (_, Some(c_token)) => l_tokens.push(EnumDateToken::Strftime(c_token)),
            ('f', None) if n_run > 7 => {
                return Err(format!("too many fraction digits in {pattern:?}"));
            }
            ('f', None) => l_tokens.push(EnumDateToken::Fraction(n_run)),
            ('t', None) => l_tokens.push(EnumDateToken::MeridiemInitial),
            _ => l_tokens.extend((0..n_run).map(|_| EnumDateToken::Literal(chr))),
        }
        n_idx += n_run;
    }

    Ok(l_tokens)
}

/// Format a number with `F2`, `N2`, `D3` or custom `#,##0.00` style patterns.
///
/// Text before the first and after the last digit placeholder is kept literally;
/// each `%` in it scales the value by 100.
pub fn format_number_pattern(value: f64, pattern: &str) -> Result<String, String> {
    let c_pattern = pattern.trim();
    let mut chars = c_pattern.chars();
    if let Some(chr_spec) = chars.next() {
        let c_digits = chars.as_str();
        if matches!(chr_spec.to_ascii_uppercase(), 'F' | 'N' | 'D')
            && c_digits.chars().all(|chr| chr.is_ascii_digit())
        {
            let n_digits = if c_digits.is_empty() {
                None
            } else {
                Some(
                    c_digits
                        .parse::<usize>()
                        .map_err(|err| format!("invalid precision in {pattern:?}: {err}"))?,
                )
            };
            return match chr_spec.to_ascii_uppercase() {
                'F' => Ok(format!("{:.*}", n_digits.unwrap_or(2), value)),
                'N' => {
                    let c_fixed = format!("{:.*}", n_digits.unwrap_or(2), value.abs());
                    let (c_whole, c_fraction) = c_fixed.split_once('.').unwrap_or((c_fixed.as_str(), ""));
                    Ok(compose_number(
                        value < 0.0,
                        &group_thousands(c_whole),
                        c_fraction,
                    ))
                }
                _ => {
                    if value.fract() != 0.0 {
                        return Err(format!("pattern {pattern:?} requires an integral value"));
                    }
                    let c_digits = format!(
                        "{:0>width$}",
                        (value.abs() as u64).to_string(),
                        width = n_digits.unwrap_or(1)
                    );
                    Ok(compose_number(value < 0.0, &c_digits, ""))
                }
            };
        }
    }

    let Some(n_start) = c_pattern.find(['0', '#']) else {
        return Err(format!("unsupported numeric pattern {pattern:?}"));
    };
    let n_end = c_pattern.rfind(['0', '#']).map_or(n_start, |idx| idx + 1);
    let (c_prefix, c_core, c_suffix) = (
        &c_pattern[..n_start],
        &c_pattern[n_start..n_end],
        &c_pattern[n_end..],
    );
    if !c_core
        .chars()
        .all(|chr| matches!(chr, '0' | '#' | '.' | ','))
    {
        return Err(format!("unsupported numeric pattern {pattern:?}"));
    }

    let n_percent = c_prefix
        .chars()
        .chain(c_suffix.chars())
        .filter(|chr| *chr == '%')
        .count();
    let value_scaled = value * 100f64.powi(n_percent as i32);

    Ok(format!(
        "{c_prefix}{}{c_suffix}",
        format_number_custom(value_scaled, c_core)
    ))
}

fn format_number_custom(value: f64, core: &str) -> String {
    let (c_int, c_frac) = core.split_once('.').unwrap_or((core, ""));
    let n_decimals_max = c_frac.chars().filter(|chr| matches!(chr, '0' | '#')).count();
    let n_decimals_min = c_frac.chars().filter(|chr| *chr == '0').count();
    let n_int_min = c_int.chars().filter(|chr| *chr == '0').count();
    let if_grouped = c_int.contains(',');

    let c_fixed = format!("{:.*}", n_decimals_max, value.abs());
    let (c_whole, c_fraction) = c_fixed.split_once('.').unwrap_or((c_fixed.as_str(), ""));

    let mut c_fraction = c_fraction.to_string();
    while c_fraction.len() > n_decimals_min && c_fraction.ends_with('0') {
        c_fraction.pop();
    }

    let mut c_whole = if c_whole == "0" && n_int_min == 0 {
        String::new()
    } else {
        format!("{c_whole:0>n_int_min$}")
    };
    if if_grouped {
        c_whole = group_thousands(&c_whole);
    }

    compose_number(value < 0.0, &c_whole, &c_fraction)
}

fn compose_number(if_negative: bool, whole: &str, fraction: &str) -> String {
    let if_nonzero = whole
        .chars()
        .chain(fraction.chars())
        .any(|chr| chr.is_ascii_digit() && chr != '0');

    let mut c_out = String::with_capacity(whole.len() + fraction.len() + 2);
    if if_negative && if_nonzero {
        c_out.push('-');
    }
    c_out.push_str(whole);
    if !fraction.is_empty() {
        c_out.push('.');
        c_out.push_str(fraction);
    }
    c_out
}

fn group_thousands(digits: &str) -> String {
    let n_len = digits.len();
    let mut c_out = String::with_capacity(n_len + n_len / 3);
    for (n_idx, chr) in digits.chars().enumerate() {
        if n_idx > 0 && (n_len - n_idx) % 3 == 0 {
            c_out.push(',');
        }
        c_out.push(chr);
    }
    c_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units of a string (non-ASCII counts wider).
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
