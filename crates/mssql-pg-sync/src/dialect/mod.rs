//! Statement text for both ends of a sync.
//!
//! - [`mssql`]: bracket quoting, snapshot extraction and count probes
//! - [`postgres`]: double-quote quoting, truncate, count and multi-row inserts
//!
//! Drivers execute exactly what these functions produce, which keeps the SQL
//! testable without a database.

pub mod mssql;
pub mod postgres;

/// Split a dotted identifier into parts, leaving dots inside quotes alone.
///
/// `open`/`close` are the quote characters of the dialect. Quoted parts are
/// returned with their quotes.
pub(crate) fn split_qualified(name: &str, open: char, close: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in name.chars() {
        match ch {
            c if c == open && !quoted && current.is_empty() => {
                quoted = true;
                current.push(c);
            }
            c if c == close && quoted => {
                quoted = false;
                current.push(c);
            }
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_qualified("McTM.dbo.Customer", '[', ']'), vec!["McTM", "dbo", "Customer"]);
    }

    #[test]
    fn test_split_keeps_dots_inside_quotes() {
        assert_eq!(
            split_qualified("[My.Db].dbo.[T]", '[', ']'),
            vec!["[My.Db]", "dbo", "[T]"]
        );
        assert_eq!(
            split_qualified("\"odd.schema\".t", '"', '"'),
            vec!["\"odd.schema\"", "t"]
        );
    }
}
