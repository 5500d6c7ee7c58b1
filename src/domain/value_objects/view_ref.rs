use crate::domain::errors::DomainError;

use super::identifier::{is_valid_identifier, Identifier};

/// Fully qualified reference to a view: `database.schema.view`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewRef {
    database: Identifier,
    schema: Identifier,
    view: Identifier,
}

impl ViewRef {
    /// Validates all three names. The first failing name aborts construction.
    pub fn parse(database: &str, schema: &str, view: &str) -> Result<Self, DomainError> {
        Ok(Self {
            database: Identifier::new("database", database)?,
            schema: Identifier::new("schema", schema)?,
            view: Identifier::new("view", view)?,
        })
    }

    pub fn database(&self) -> &Identifier {
        &self.database
    }

    pub fn schema(&self) -> &Identifier {
        &self.schema
    }

    pub fn view(&self) -> &Identifier {
        &self.view
    }

    /// Re-runs the identifier grammar over all three names.
    pub fn revalidate(&self) -> Result<(), DomainError> {
        for (field, id) in [
            ("database", &self.database),
            ("schema", &self.schema),
            ("view", &self.view),
        ] {
            if !is_valid_identifier(id.as_str()) {
                return Err(DomainError::InvalidIdentifier {
                    field,
                    value: id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// `"database"."schema"."view"`
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}.{}",
            self.database.quoted(),
            self.schema.quoted(),
            self.view.quoted()
        )
    }

    /// Suggested download name, `{view}.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.view)
    }
}

impl std::fmt::Display for ViewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.view)
    }
}
