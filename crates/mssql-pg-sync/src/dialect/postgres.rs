//! PostgreSQL statement text.

use super::split_qualified;
use crate::core::{Row, SqlValue};
use crate::registry::TableDescriptor;

/// Quote a single identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote each part of `table` or `schema.table`.
pub fn qualify(name: &str) -> String {
    split_qualified(name.trim(), '"', '"')
        .iter()
        .map(|part| {
            if part.len() >= 2 && part.starts_with('"') && part.ends_with('"') {
                part.clone()
            } else {
                quote_ident(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn truncate(table: &TableDescriptor) -> String {
    format!("TRUNCATE TABLE {}", qualify(&table.destination_object))
}

pub fn count_rows(table: &TableDescriptor) -> String {
    format!("SELECT COUNT(*) FROM {}", qualify(&table.destination_object))
}

fn escape_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

fn float_literal(n: f64) -> String {
    if n.is_nan() {
        "'NaN'::float8".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "'Infinity'::float8".to_string()
        } else {
            "'-Infinity'::float8".to_string()
        }
    } else {
        n.to_string()
    }
}

/// Render a value as a PostgreSQL literal.
pub fn literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null(_) => "NULL".to_string(),
        SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        SqlValue::I16(n) => n.to_string(),
        SqlValue::I32(n) => n.to_string(),
        SqlValue::I64(n) => n.to_string(),
        SqlValue::F32(n) => float_literal(f64::from(*n)),
        SqlValue::F64(n) => float_literal(*n),
        SqlValue::Text(s) => format!("'{}'", escape_sql_string(s)),
        SqlValue::Bytes(b) => format!("'\\x{}'::bytea", hex::encode(b)),
        SqlValue::Uuid(u) => format!("'{}'::uuid", u),
        SqlValue::Decimal(d) => format!("{}::numeric", d),
        SqlValue::DateTime(dt) => format!("'{}'::timestamp", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        SqlValue::DateTimeOffset(dt) => format!("'{}'::timestamptz", dt.to_rfc3339()),
        SqlValue::Date(d) => format!("'{}'::date", d),
        SqlValue::Time(t) => format!("'{}'::time", t.format("%H:%M:%S%.6f")),
    }
}

/// One multi-row INSERT for a chunk, rows kept in the given order.
pub fn insert_rows(table: &TableDescriptor, rows: &[Row]) -> String {
    let col_list = table
        .destination_columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let value_rows: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(literal).collect();
            format!("({})", values.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualify(&table.destination_object),
        col_list,
        value_rows.join(", ")
    )
}
