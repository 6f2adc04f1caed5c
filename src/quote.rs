//! Quoting primitives for building SQL text.
//!
//! Every user, role and database name interpolated into a statement goes
//! through [`quote_identifier`]; every string literal goes through
//! [`escape_literal`] and is then wrapped in single quotes by the caller.

/// Quote a PostgreSQL identifier, doubling embedded double quotes.
///
/// ```
/// use pg_user_manager::quote::quote_identifier;
///
/// assert_eq!(quote_identifier("test\"user"), "\"test\"\"user\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a value for use inside a single-quoted string literal.
///
/// Assumes `standard_conforming_strings = on`, the server default, so
/// backslashes carry no special meaning.
///
/// ```
/// use pg_user_manager::quote::escape_literal;
///
/// assert_eq!(escape_literal("test'pass'word"), "test''pass''word");
/// ```
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
