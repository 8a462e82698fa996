//! Helpers callable from templates through `{{ value | helper }}`

use chrono::NaiveDateTime;

/// Compact UTC timestamp format used by timetable events
const ICAL_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

pub(crate) type Helper = fn(&str) -> String;

/// Resolve a helper by the name used in templates
pub(crate) fn lookup(name: &str) -> Option<Helper> {
    match name {
        "format_date" => Some(format_date),
        "clean_description" => Some(clean_description),
        "yaml_string" => Some(yaml_string),
        _ => None,
    }
}

/// Render `20240115T093000Z` as `15/01/2024 09:30`.
///
/// Input that does not parse is returned unchanged.
pub fn format_date(input: &str) -> String {
    NaiveDateTime::parse_from_str(input, ICAL_DATE_FORMAT)
        .map(|dt| dt.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_else(|_| input.to_string())
}

/// Turn literal `\n` sequences in event descriptions into line breaks
pub fn clean_description(input: &str) -> String {
    input.replace("\\n", "\n")
}

/// Escape a value for use inside a double-quoted YAML scalar
pub fn yaml_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}
