//! SQL Server statement text.

use super::split_qualified;
use crate::registry::TableDescriptor;

/// Quote a single identifier with brackets, doubling embedded `]`.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote every part of a possibly qualified object name.
///
/// Parts already in brackets are kept as written, so `[McTM].[dbo].[Customer]`
/// and `McTM.dbo.Customer` produce the same text.
pub fn quote_object(name: &str) -> String {
    split_qualified(name.trim(), '[', ']')
        .iter()
        .map(|part| {
            if part.starts_with('[') && part.ends_with(']') && part.len() >= 2 {
                part.clone()
            } else {
                quote_ident(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Snapshot read of every configured column, in ordering-key order.
///
/// `NOLOCK` reads uncommitted data rather than blocking writers on the source.
pub fn select_all(table: &TableDescriptor) -> String {
    let cols = table
        .source_columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT {} FROM {} WITH (NOLOCK) ORDER BY {}",
        cols,
        quote_object(&table.source_object),
        quote_ident(&table.ordering_key)
    )
}

/// Row count probe used by the connectivity check.
pub fn count_rows(table: &TableDescriptor) -> String {
    format!(
        "SELECT CAST(COUNT(*) AS BIGINT) FROM {} WITH (NOLOCK)",
        quote_object(&table.source_object)
    )
}
