//! Delimited text (CSV/TSV) reading and writing helpers
//!
//! Field splitting, delimiter detection, number sniffing for autotyping and
//! field escaping. Table-level parsing lives in
//! [`table_utils::parse_delimited`](crate::table_utils::parse_delimited).

use crate::column_types::ColumnTypeName;

/// Pick the delimiter that appears most often in the first lines.
///
/// Tabs win over semicolons, semicolons over commas; comma is the fallback.
pub fn detect_delimiter(content: &str) -> char {
    let first_lines: String = content.lines().take(5).collect::<Vec<_>>().join("\n");

    let comma_count = first_lines.matches(',').count();
    let tab_count = first_lines.matches('\t').count();
    let semicolon_count = first_lines.matches(';').count();

    if tab_count > comma_count && tab_count > semicolon_count {
        '\t'
    } else if semicolon_count > comma_count {
        ';'
    } else {
        ','
    }
}

/// Split one record, honoring double-quoted fields and `""` escapes.
///
/// Fields are trimmed; quotes are removed.
pub fn split_delimited_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' if in_quotes => in_quotes = false,
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
                was_quoted = true;
            }
            c if c == delimiter && !in_quotes => {
                fields.push(finish_field(&mut current, was_quoted));
                was_quoted = false;
            }
            c => current.push(c),
        }
    }
    fields.push(finish_field(&mut current, was_quoted));
    fields
}

fn finish_field(current: &mut String, was_quoted: bool) -> String {
    let field = std::mem::take(current);
    if was_quoted {
        field.trim_end().to_string()
    } else {
        field.trim().to_string()
    }
}

/// Split text into records, skipping blank lines. The first record is the
/// header.
pub fn split_delimited(content: &str, delimiter: char) -> Vec<Vec<String>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| split_delimited_line(line, delimiter))
        .collect()
}

/// True for text the numeric column types can parse.
///
/// One thousands separator group pattern is tolerated; lists such as `1,2,3`
/// are not numbers.
pub fn looks_like_number(s: &str) -> bool {
    let cleaned = s.trim();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if cleaned.contains(',') && !has_thousands_grouping(cleaned) {
        return false;
    }

    cleaned
        .replace(',', "")
        .parse::<f64>()
        .map(|n| n.is_finite())
        .unwrap_or(false)
}

fn has_thousands_grouping(s: &str) -> bool {
    let integer_part = s.split('.').next().unwrap_or(s);
    let integer_part = integer_part.trim_start_matches(['-', '+']);
    let mut groups = integer_part.split(',');
    let first_ok = groups
        .next()
        .map(|g| (1..=3).contains(&g.len()))
        .unwrap_or(false);
    first_ok && groups.all(|g| g.len() == 3)
}

/// Guess a column type from raw delimited values.
///
/// `Numeric` when every sampled non-empty value looks numeric, `String`
/// otherwise (including columns with no non-empty values).
pub fn guess_column_type<'a, I>(values: I, sample_size: usize) -> ColumnTypeName
where
    I: IntoIterator<Item = &'a str>,
{
    let mut saw_value = false;
    for value in values
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .take(sample_size)
    {
        saw_value = true;
        if !looks_like_number(value) {
            return ColumnTypeName::String;
        }
    }
    if saw_value {
        ColumnTypeName::Numeric
    } else {
        ColumnTypeName::String
    }
}

/// Quote a field if it contains the delimiter, quotes, or newlines
pub fn escape_field(value: &str, delimiter: char) -> String {
    let needs_quoting = value.contains(delimiter)
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join already-formatted fields into one record
pub fn join_record<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref(), delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}
