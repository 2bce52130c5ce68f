use crate::db::{Row, Value};

/// Union of field names across `rows`, in first-seen order.
pub fn header(rows: &[Row]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        for name in row.field_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

pub fn to_csv(rows: &[Row]) -> String {
    let columns = header(rows);
    let mut output = String::new();

    // Header
    let headers: Vec<String> = columns.iter().map(|c| csv_escape(c)).collect();
    output.push_str(&headers.join(","));
    output.push('\n');

    // Rows
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| csv_escape(&cell_to_csv(row.get(c))))
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

pub fn to_tsv(rows: &[Row]) -> String {
    let columns = header(rows);
    let mut output = String::new();

    output.push_str(&columns.join("\t"));
    output.push('\n');

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| cell_to_csv(row.get(c)).replace(['\t', '\n'], " "))
            .collect();
        output.push_str(&cells.join("\t"));
        output.push('\n');
    }

    output
}

pub fn to_json(rows: &[Row]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

fn cell_to_csv(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(other) => other.display(),
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
