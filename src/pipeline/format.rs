//! Rendering of values as literals for each store's query language.

use crate::db::Value;
use crate::pipeline::StoreKind;

/// Render a single value as a literal for `store`.
///
/// Numbers are bare numerals, null is the store's null keyword and
/// everything else is a quoted literal.
pub fn format_scalar(value: &Value, store: StoreKind) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f, store),
        Value::Null => match store {
            StoreKind::Relational => "NULL".to_string(),
            StoreKind::Graph | StoreKind::Document => "null".to_string(),
        },
        Value::Text(s) => quote(s, store),
        Value::Bool(b) => quote(&b.to_string(), store),
        Value::Json(j) => match store {
            StoreKind::Document => j.to_string(),
            _ => quote(&j.to_string(), store),
        },
    }
}

/// Render an ordered sequence of values for `store`.
///
/// Relational sequences are bare comma-separated lists meant to sit inside an
/// existing `IN (...)`. Graph and document sequences are bracketed lists.
pub fn format_sequence(values: &[Value], store: StoreKind) -> String {
    let items: Vec<String> = values.iter().map(|v| format_scalar(v, store)).collect();
    match store {
        StoreKind::Relational => items.join(", "),
        StoreKind::Graph | StoreKind::Document => format!("[{}]", items.join(", ")),
    }
}

fn format_float(f: f64, store: StoreKind) -> String {
    if f.is_finite() {
        return f.to_string();
    }
    // Neither SQL nor Cypher has a bare numeral for these.
    format_scalar(&Value::Text(f.to_string()), store)
}

fn quote(s: &str, store: StoreKind) -> String {
    match store {
        StoreKind::Relational => format!("'{}'", s.replace('\'', "''")),
        StoreKind::Graph => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        StoreKind::Document => serde_json::Value::String(s.to_string()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_render_bare() {
        assert_eq!(format_scalar(&Value::Int(42), StoreKind::Relational), "42");
        assert_eq!(format_scalar(&Value::Float(8.5), StoreKind::Graph), "8.5");
    }

    #[test]
    fn test_text_is_quoted_per_store() {
        let v = Value::from("Ocean's Eleven");
        assert_eq!(format_scalar(&v, StoreKind::Relational), "'Ocean''s Eleven'");
        assert_eq!(format_scalar(&v, StoreKind::Graph), r"'Ocean\'s Eleven'");
        assert_eq!(format_scalar(&v, StoreKind::Document), r#""Ocean's Eleven""#);
    }

    #[test]
    fn test_bool_and_null() {
        assert_eq!(format_scalar(&Value::Bool(true), StoreKind::Relational), "'true'");
        assert_eq!(format_scalar(&Value::Null, StoreKind::Relational), "NULL");
        assert_eq!(format_scalar(&Value::Null, StoreKind::Graph), "null");
    }

    #[test]
    fn test_relational_sequence_is_bare() {
        let values = vec![Value::Int(1), Value::Int(2), Value::from("x")];
        assert_eq!(format_sequence(&values, StoreKind::Relational), "1, 2, 'x'");
    }

    #[test]
    fn test_graph_sequence_is_bracketed() {
        let values = vec![Value::from("Inception"), Value::Float(1.5)];
        assert_eq!(
            format_sequence(&values, StoreKind::Graph),
            "['Inception', 1.5]"
        );
    }

    #[test]
    fn test_document_sequence_is_json() {
        let values = vec![Value::Int(3), Value::from("a")];
        let rendered = format_sequence(&values, StoreKind::Document);
        assert_eq!(rendered, r#"[3, "a"]"#);
        assert!(serde_json::from_str::<serde_json::Value>(&rendered).is_ok());
    }

    #[test]
    fn test_empty_sequences() {
        assert_eq!(format_sequence(&[], StoreKind::Relational), "");
        assert_eq!(format_sequence(&[], StoreKind::Graph), "[]");
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let values = vec![Value::from("a"), Value::Int(1)];
        assert_eq!(
            format_sequence(&values, StoreKind::Graph),
            format_sequence(&values, StoreKind::Graph)
        );
    }
}
