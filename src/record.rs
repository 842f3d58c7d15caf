/// Number of fields after the URL that never contain a comma.
pub const TRAILING_FIELDS: usize = 2;

/// One line of a history export split into its logical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHistoryLine<'a> {
    pub url: &'a str,
    pub last_visited: &'a str,
    pub visit_count: &'a str,
}

/// Splits `line` from the right at most `trailing_field_count` times.
///
/// The leading field keeps every comma it contains. Returns `None` when the
/// line has fewer than `trailing_field_count` commas.
pub fn recover_fields(line: &str, trailing_field_count: usize) -> Option<Vec<&str>> {
    let expected = trailing_field_count + 1;
    let mut fields: Vec<&str> = line.rsplitn(expected, ',').collect();
    if fields.len() != expected {
        return None;
    }
    fields.reverse();
    Some(fields)
}

/// Recovers `url, last_visited, visit_count` from a raw export line.
pub fn recover(line: &str) -> Option<RawHistoryLine<'_>> {
    let fields = recover_fields(line, TRAILING_FIELDS)?;
    match fields.as_slice() {
        [url, last_visited, visit_count] => Some(RawHistoryLine {
            url,
            last_visited,
            visit_count,
        }),
        _ => None,
    }
}
