//! SQL dialect differences: identifier quoting, placeholders, key return.

/// Target SQL dialect of a compiled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Backtick identifiers, `?` placeholders.
    #[default]
    MySql,
    /// Double-quoted identifiers, `$n` placeholders.
    Postgres,
}

impl Dialect {
    /// Quote a trusted identifier.
    pub fn quote(self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Whether INSERT reports generated keys through `RETURNING`.
    pub fn returns_generated_key(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}
