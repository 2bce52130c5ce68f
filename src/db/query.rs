use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use std::error::Error as StdError;
use std::fmt;
use std::net::IpAddr;
use std::sync::OnceLock;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Client, Row as PgRow};
use uuid::Uuid;

use super::adapter::StoreAdapter;
use super::connection::{create_client, PostgresConfig};
use super::value::{Row, Value};
use crate::error::{EngineError, EngineResult};
use crate::pipeline::{StoreKind, StoreQuery};

/// Categorized error types for SQL query failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE class 42 - syntax_error, etc.)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, constraint violation)
    Execution,
    /// Transaction state errors (e.g., transaction aborted)
    Transaction,
    /// Connection/communication errors
    Connection,
    /// Unknown or unclassified errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Unknown => write!(f, "Error"),
        }
    }
}

/// A PostgreSQL failure with the context the planner needs to correct its
/// query: category, SQLSTATE, location, detail and hint.
#[derive(Debug, Clone)]
pub struct StructuredError {
    pub category: ErrorCategory,
    /// SQLSTATE error code (e.g., "42601" for syntax_error)
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    /// Computed line number (1-based) from the reported byte position
    pub line: Option<usize>,
    /// Computed column number (1-based) from the reported byte position
    pub col: Option<usize>,
}

impl StructuredError {
    /// Create a StructuredError from a tokio_postgres error, using the query text
    /// to compute line/column from the byte position.
    pub fn from_pg_error(err: &tokio_postgres::Error, query: &str) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code_str = db_err.code().code().to_string();
            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });

            let (line, col) = match position {
                Some(pos) => byte_offset_to_line_col(query, pos as usize),
                None => (None, None),
            };

            StructuredError {
                category: categorize_sqlstate(&code_str),
                code: code_str,
                message: db_err.message().to_string(),
                detail: db_err.detail().map(|s| s.to_string()),
                hint: db_err.hint().map(|s| s.to_string()),
                table: db_err.table().map(|s| s.to_string()),
                column: db_err.column().map(|s| s.to_string()),
                line,
                col,
            }
        } else {
            // Non-database error (connection, protocol, etc.)
            let category = if err.source().is_some() {
                ErrorCategory::Connection
            } else {
                ErrorCategory::Unknown
            };
            let mut structured = StructuredError::from_string(err.to_string());
            structured.category = category;
            structured.detail = err.source().map(|e| e.to_string());
            structured
        }
    }

    pub fn from_string(msg: String) -> Self {
        StructuredError {
            category: ErrorCategory::Unknown,
            code: String::new(),
            message: msg,
            detail: None,
            hint: None,
            table: None,
            column: None,
            line: None,
            col: None,
        }
    }

    /// Render on one line, suitable for logs and planner feedback.
    pub fn display_full(&self) -> String {
        let mut parts = vec![format!("{}: {}", self.category, self.message)];

        if let (Some(line), Some(col)) = (self.line, self.col) {
            parts.push(format!("at line {}, column {}", line, col));
        }
        if !self.code.is_empty() {
            parts.push(format!("SQLSTATE {}", self.code));
        }
        if let Some(table) = &self.table {
            match &self.column {
                Some(column) => parts.push(format!("object {}.{}", table, column)),
                None => parts.push(format!("table {}", table)),
            }
        }
        if let Some(detail) = &self.detail {
            parts.push(format!("detail: {}", detail));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("hint: {}", hint));
        }

        parts.join("; ")
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_full())
    }
}

/// Convert a 1-based byte offset in a query string to (line, column) both 1-based.
fn byte_offset_to_line_col(query: &str, byte_pos: usize) -> (Option<usize>, Option<usize>) {
    if byte_pos == 0 || query.is_empty() {
        return (Some(1), Some(1));
    }
    let target = (byte_pos - 1).min(query.len()); // PostgreSQL positions are 1-based
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in query.char_indices() {
        if i >= target {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (Some(line), Some(col))
}

/// Categorize a SQLSTATE code into an ErrorCategory.
fn categorize_sqlstate(code: &str) -> ErrorCategory {
    if code.len() < 2 {
        return ErrorCategory::Unknown;
    }
    match &code[..2] {
        // 42601 = syntax_error; the rest of class 42 is undefined_table,
        // undefined_column, ambiguous references and the like.
        "42" if code == "42601" || code == "42000" => ErrorCategory::Syntax,
        "42" => ErrorCategory::Semantic,
        "22" | "23" | "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        "25" | "40" => ErrorCategory::Transaction,
        "08" => ErrorCategory::Connection,
        _ => ErrorCategory::Unknown,
    }
}

fn empty_membership_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bIN\s*\(\s*\)").expect("membership pattern is valid"))
}

fn string_literal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'(?:[^']|'')*'").expect("literal pattern is valid"))
}

/// True when the query contains an `IN ()` clause with nothing inside, which
/// happens when an upstream stage returned no rows. Text inside single-quoted
/// literals is ignored.
pub fn has_empty_membership(sql: &str) -> bool {
    let code = string_literal_regex().replace_all(sql, "''");
    empty_membership_regex().is_match(&code)
}

/// Runs SQL text against PostgreSQL, one connection per call.
pub struct RelationalAdapter {
    config: PostgresConfig,
}

impl RelationalAdapter {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreAdapter for RelationalAdapter {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn execute(&self, query: &StoreQuery) -> EngineResult<Vec<Row>> {
        let sql = match query {
            StoreQuery::Text(sql) => sql,
            other => {
                return Err(EngineError::adapter(
                    StoreKind::Relational,
                    format!("expected SQL text, got {}", other),
                ))
            }
        };

        if has_empty_membership(sql) {
            tracing::debug!("empty IN () clause, skipping PostgreSQL round trip");
            return Ok(vec![]);
        }

        let client = create_client(&self.config)
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Relational, format!("{:#}", e)))?;
        execute_query(&client, sql)
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Relational, e.display_full()))
    }
}

pub async fn execute_query(client: &Client, sql: &str) -> Result<Vec<Row>, StructuredError> {
    let sql_trimmed = sql.trim();
    let rows = client
        .query(sql_trimmed, &[])
        .await
        .map_err(|e| StructuredError::from_pg_error(&e, sql_trimmed))?;
    rows.iter().map(parse_row).collect()
}

fn parse_row(row: &PgRow) -> Result<Row, StructuredError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            if !PgValue::accepts(col.type_()) {
                return Err(unsupported_column(col.name(), col.type_()));
            }
            let value = row.try_get::<_, PgValue>(i).map_err(|e| {
                let mut error = unsupported_column(col.name(), col.type_());
                error.detail = Some(e.to_string());
                error
            })?;
            Ok((col.name().to_string(), value.0))
        })
        .collect()
}

fn unsupported_column(name: &str, ty: &Type) -> StructuredError {
    let mut error =
        StructuredError::from_string(format!("cannot decode column {} of type {}", name, ty));
    error.category = ErrorCategory::Execution;
    error.column = Some(name.to_string());
    error.hint = Some(format!("cast {} to text in the query", name));
    error
}

type DecodeError = Box<dyn StdError + Sync + Send>;

/// PostgreSQL `NUMERIC` decoded straight to `f64` from its binary form:
/// a header of four big-endian 16-bit words (digit count, weight, sign,
/// display scale) followed by base-10000 digits.
struct PgNumeric(f64);

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        let word = |i: usize| -> Result<u16, DecodeError> {
            raw.get(i * 2..i * 2 + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or_else(|| "truncated numeric value".into())
        };

        let ndigits = word(0)? as usize;
        let weight = word(1)? as i16 as i32;
        let sign = word(2)?;
        match sign {
            NUMERIC_NAN => return Ok(PgNumeric(f64::NAN)),
            NUMERIC_PINF => return Ok(PgNumeric(f64::INFINITY)),
            NUMERIC_NINF => return Ok(PgNumeric(f64::NEG_INFINITY)),
            _ => {}
        }

        let mut value = 0f64;
        for i in 0..ndigits {
            let digit = word(4 + i)? as f64;
            value += digit * 10000f64.powi(weight - i as i32);
        }
        if sign == NUMERIC_NEG {
            value = -value;
        }
        Ok(PgNumeric(value))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// PostgreSQL `INTERVAL`: microseconds, days and months, rendered the way
/// `psql` prints them (`1 year 2 mons 3 days 04:05:06`).
struct PgInterval {
    months: i32,
    days: i32,
    micros: i64,
}

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        if raw.len() != 16 {
            return Err("invalid interval length".into());
        }
        let mut micros = [0u8; 8];
        micros.copy_from_slice(&raw[..8]);
        let mut days = [0u8; 4];
        days.copy_from_slice(&raw[8..12]);
        let mut months = [0u8; 4];
        months.copy_from_slice(&raw[12..]);
        Ok(PgInterval {
            months: i32::from_be_bytes(months),
            days: i32::from_be_bytes(days),
            micros: i64::from_be_bytes(micros),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

impl fmt::Display for PgInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn unit(n: i32, singular: &str, plural: &str) -> String {
            format!("{} {}", n, if n.abs() == 1 { singular } else { plural })
        }

        let mut parts = Vec::new();
        let (years, months) = (self.months / 12, self.months % 12);
        if years != 0 {
            parts.push(unit(years, "year", "years"));
        }
        if months != 0 {
            parts.push(unit(months, "mon", "mons"));
        }
        if self.days != 0 {
            parts.push(unit(self.days, "day", "days"));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let total = self.micros.unsigned_abs();
            let secs = total / 1_000_000;
            let mut time = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                secs / 3600,
                secs / 60 % 60,
                secs % 60
            );
            let frac = total % 1_000_000;
            if frac != 0 {
                time.push_str(format!(".{:06}", frac).trim_end_matches('0'));
            }
            parts.push(time);
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// A column value normalized into the engine's [`Value`]. Arrays of any
/// supported element type become JSON arrays.
struct PgValue(Value);

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        if let Kind::Array(_) = ty.kind() {
            let items = Vec::<Option<PgValue>>::from_sql(ty, raw)?;
            let items = items
                .into_iter()
                .map(|item| item.map_or(serde_json::Value::Null, |v| v.0.to_json()))
                .collect();
            return Ok(PgValue(Value::Json(serde_json::Value::Array(items))));
        }

        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::CHAR => Value::Int(i8::from_sql(ty, raw)?.into()),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Float(PgNumeric::from_sql(ty, raw)?.0),
            Type::DATE => Value::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => Value::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => Value::Text(NaiveDateTime::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMPTZ => Value::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::INTERVAL => Value::Text(PgInterval::from_sql(ty, raw)?.to_string()),
            Type::UUID => Value::Text(Uuid::from_sql(ty, raw)?.to_string()),
            Type::INET => Value::Text(IpAddr::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => Value::from_json(serde_json::Value::from_sql(ty, raw)?),
            Type::BYTEA => Value::Text(format!("[{} bytes]", raw.len())),
            // TEXT, VARCHAR, NAME, BPCHAR and the other text-like types
            _ => Value::Text(String::from_sql(ty, raw)?),
        };
        Ok(PgValue(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, DecodeError> {
        Ok(PgValue(Value::Null))
    }

    fn accepts(ty: &Type) -> bool {
        if let Kind::Array(member) = ty.kind() {
            return Self::accepts(member);
        }
        matches!(
            *ty,
            Type::BOOL
                | Type::CHAR
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::DATE
                | Type::TIME
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::INTERVAL
                | Type::UUID
                | Type::INET
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        ) || <String as FromSql>::accepts(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_bytes(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_empty_membership_detected() {
        assert!(has_empty_membership("SELECT * FROM m WHERE m.id IN ()"));
        assert!(has_empty_membership("SELECT * FROM m WHERE m.id IN ( )"));
        assert!(has_empty_membership("select * from m where m.id in(\n)"));
        assert!(!has_empty_membership("SELECT * FROM m WHERE m.id IN (1, 2)"));
        assert!(!has_empty_membership("SELECT * FROM join_table()"));
    }

    #[test]
    fn test_empty_membership_ignores_string_literals() {
        assert!(!has_empty_membership("SELECT * FROM notes WHERE body = 'IN ()'"));
        assert!(!has_empty_membership("SELECT 'it''s in ( )' AS s"));
        assert!(has_empty_membership(
            "SELECT * FROM m WHERE m.note = 'IN (1)' AND m.id IN ()"
        ));
        assert!(has_empty_membership("SELECT * FROM m WHERE m.t = 'a''b' AND m.id IN ()"));
    }

    #[tokio::test]
    async fn test_empty_membership_returns_no_rows_without_connecting() {
        // Port 1 is never a PostgreSQL server; reaching the network would fail.
        let adapter = RelationalAdapter::new(PostgresConfig {
            port: 1,
            ssl_mode: crate::db::SslMode::Disable,
            ..Default::default()
        });
        let rows = adapter
            .execute(&StoreQuery::text("SELECT id FROM movies WHERE id IN ()"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_filter_query() {
        let adapter = RelationalAdapter::new(PostgresConfig::default());
        let err = adapter
            .execute(&StoreQuery::filter("movies", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::AdapterExecution {
                store: StoreKind::Relational,
                ..
            }
        ));
    }

    #[test]
    fn test_numeric_decoding() {
        // 12345.678 = digits [1, 2345, 6780], weight 1, dscale 3
        let raw = numeric_bytes(&[3, 1, 0, 3, 1, 2345, 6780]);
        let n = PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap();
        assert!((n.0 - 12345.678).abs() < 1e-9);

        // -0.05 = digits [500], weight -1
        let raw = numeric_bytes(&[1, (-1i16) as u16, NUMERIC_NEG, 2, 500]);
        let n = PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap();
        assert!((n.0 + 0.05).abs() < 1e-12);

        // zero has no digits
        let raw = numeric_bytes(&[0, 0, 0, 0]);
        assert_eq!(PgNumeric::from_sql(&Type::NUMERIC, &raw).unwrap().0, 0.0);
    }

    #[test]
    fn test_numeric_truncated_is_error() {
        let raw = numeric_bytes(&[2, 0, 0, 0, 1]);
        assert!(PgNumeric::from_sql(&Type::NUMERIC, &raw).is_err());
    }

    #[test]
    fn test_structured_error_category_display() {
        assert_eq!(ErrorCategory::Syntax.to_string(), "Syntax Error");
        assert_eq!(ErrorCategory::Semantic.to_string(), "Semantic Error");
        assert_eq!(ErrorCategory::Connection.to_string(), "Connection Error");
        assert_eq!(ErrorCategory::Unknown.to_string(), "Error");
    }

    #[test]
    fn test_structured_error_display_full() {
        let err = StructuredError {
            category: ErrorCategory::Semantic,
            code: "42703".to_string(),
            message: "column m.rating does not exist".to_string(),
            detail: None,
            hint: Some("Perhaps you meant to reference the column \"m.imdb_rating\".".to_string()),
            table: None,
            column: None,
            line: Some(2),
            col: Some(8),
        };
        let full = err.display_full();
        assert!(full.starts_with("Semantic Error: column m.rating does not exist"));
        assert!(full.contains("at line 2, column 8"));
        assert!(full.contains("SQLSTATE 42703"));
        assert!(full.contains("imdb_rating"));
        assert!(!full.contains('\n'));
    }

    #[test]
    fn test_byte_offset_to_line_col() {
        let query = "SELECT *\nFROM users\nWHERE id = 1";
        assert_eq!(byte_offset_to_line_col(query, 1), (Some(1), Some(1)));
        assert_eq!(byte_offset_to_line_col(query, 10), (Some(2), Some(1)));
        assert_eq!(byte_offset_to_line_col(query, 21), (Some(3), Some(1)));
    }

    #[test]
    fn test_categorize_sqlstate() {
        assert_eq!(categorize_sqlstate("42601"), ErrorCategory::Syntax);
        assert_eq!(categorize_sqlstate("42P01"), ErrorCategory::Semantic);
        assert_eq!(categorize_sqlstate("23505"), ErrorCategory::Execution);
        assert_eq!(categorize_sqlstate("40001"), ErrorCategory::Transaction);
        assert_eq!(categorize_sqlstate("08006"), ErrorCategory::Connection);
        assert_eq!(categorize_sqlstate("XX000"), ErrorCategory::Unknown);
    }

    fn pg_value(ty: &Type, raw: &[u8]) -> Value {
        PgValue::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn test_uuid_column_decodes_to_text() {
        let raw = [
            0x67, 0xe5, 0x50, 0x44, 0x10, 0xb1, 0x42, 0x6f, 0x92, 0x47, 0xbb, 0x68, 0x0e, 0x5f,
            0xe0, 0xc8,
        ];
        assert_eq!(
            pg_value(&Type::UUID, &raw),
            Value::from("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
    }

    #[test]
    fn test_int_array_decodes_to_json() {
        // ndim, has_null, element oid, (len, lower bound), then (len, data) per element
        let mut raw = Vec::new();
        for word in [1i32, 1, 23, 3, 1] {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        raw.extend_from_slice(&4i32.to_be_bytes());
        raw.extend_from_slice(&7i32.to_be_bytes());
        raw.extend_from_slice(&(-1i32).to_be_bytes());
        raw.extend_from_slice(&4i32.to_be_bytes());
        raw.extend_from_slice(&9i32.to_be_bytes());

        assert_eq!(
            pg_value(&Type::INT4_ARRAY, &raw),
            Value::Json(serde_json::json!([7, null, 9]))
        );
    }

    #[test]
    fn test_interval_renders_like_psql() {
        let interval = |micros: i64, days: i32, months: i32| {
            let mut raw = micros.to_be_bytes().to_vec();
            raw.extend_from_slice(&days.to_be_bytes());
            raw.extend_from_slice(&months.to_be_bytes());
            pg_value(&Type::INTERVAL, &raw)
        };
        assert_eq!(
            interval(4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000, 3, 14),
            Value::from("1 year 2 mons 3 days 04:05:06.5")
        );
        assert_eq!(interval(0, 1, 0), Value::from("1 day"));
        assert_eq!(interval(0, 0, 0), Value::from("00:00:00"));
        assert_eq!(interval(-90_000_000, 0, 0), Value::from("-00:01:30"));
    }

    #[test]
    fn test_supported_column_types() {
        for ty in [
            Type::UUID,
            Type::UUID_ARRAY,
            Type::TEXT_ARRAY,
            Type::INT8,
            Type::INTERVAL,
            Type::INET,
            Type::VARCHAR,
            Type::JSONB,
        ] {
            assert!(PgValue::accepts(&ty), "{} should decode", ty);
        }
        assert!(!PgValue::accepts(&Type::POINT));
        assert!(!PgValue::accepts(&Type::TS_VECTOR));
    }

    #[test]
    fn test_null_column_is_null_value() {
        assert_eq!(PgValue::from_sql_null(&Type::UUID).unwrap().0, Value::Null);
    }

    #[test]
    fn test_unsupported_column_names_column_and_type() {
        let full = unsupported_column("location", &Type::POINT).display_full();
        assert!(full.starts_with("Execution Error: cannot decode column location of type point"));
        assert!(full.contains("hint: cast location to text"));
    }
}
