// Column order is fixed by the first header ever written; the recorder and
// the reader must agree on it exactly.
pub(crate) const HISTORY_HEADER: &str =
    "price,float_value,paint_seed,id,inspect_link,image,timestamp";

// ISO-8601 at second precision, the log's established timestamp convention.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Encode one field. Fields containing the delimiter or a quote are quoted
/// with doubled inner quotes; line breaks are flattened to spaces so the log
/// stays one row per line.
pub(crate) fn escape_field(field: &str) -> String {
    let flat = if field.contains(['\n', '\r']) {
        field.replace(['\n', '\r'], " ")
    } else {
        field.to_string()
    };

    if flat.contains([',', '"']) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

/// Split one row into fields, honoring quoted fields with doubled quotes.
pub(crate) fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}
