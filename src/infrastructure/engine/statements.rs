use std::path::Path;

use crate::domain::value_objects::ViewRef;

/// The only place SQL text is assembled.
///
/// Identifiers reach this module already validated against the identifier
/// grammar and are always emitted double-quoted. Catalog lookups bind their
/// values as parameters instead of interpolating them.
pub struct Statements;

impl Statements {
    /// Existence check against the catalog. Matches both tables and views.
    pub const VIEW_EXISTS: &'static str = r#"
        SELECT 1
        FROM information_schema.tables
        WHERE table_catalog = ? AND table_schema = ? AND table_name = ?
        LIMIT 1
    "#;

    /// Full-view CSV export with a header row and comma delimiter.
    pub fn export_csv(view: &ViewRef, destination: &Path) -> String {
        format!(
            "COPY (SELECT * FROM {}) TO '{}' (HEADER, DELIMITER ',');",
            view.quoted(),
            Self::string_literal(&destination.to_string_lossy())
        )
    }

    /// Escape a value for a single-quoted SQL string literal.
    fn string_literal(value: &str) -> String {
        value.replace('\'', "''")
    }
}
