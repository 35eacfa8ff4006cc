//! Table definition for an rsql base table schema.

use super::column::Column;
use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A declared table definition: the column list an rsql `BaseTable` was
/// constructed with, reconciled against the embedded engine's physical
/// schema when the table is opened.
#[derive(Clone, Debug)]
pub struct Table {
    /// Table name.
    name: String,
    /// Column definitions, in declaration order.
    columns: Vec<Column>,
    /// Name of the single-column primary key, if one was declared.
    primary_key: Option<String>,
    /// Whether this table is a session-scoped temporary table.
    temporary: bool,
}

impl Table {
    /// Creates a new table with the given name and columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let columns: Vec<Column> = columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.with_index(i))
            .collect();

        Self {
            name: name.into(),
            columns,
            primary_key: None,
            temporary: false,
        }
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns whether this is a temporary table.
    #[inline]
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Marks this table as temporary.
    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column index by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the name of the primary key column, if declared.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Declares the primary key column. The column must already exist.
    pub fn set_primary_key(&mut self, column: impl Into<String>) -> Result<()> {
        let column = column.into();
        if self.get_column(&column).is_none() {
            return Err(Error::schema_mismatch(
                &self.name,
                format!("primary key column not found: {}", column),
            ));
        }
        self.primary_key = Some(column);
        Ok(())
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<String>,
    temporary: bool,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            temporary: false,
        })
    }

    /// Validates a name follows naming rules.
    fn check_naming_rules(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::schema_mismatch("", "name cannot be empty"));
        }
        let first = name.chars().next().unwrap();
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::schema_mismatch(
                name,
                format!("name must start with letter or underscore: {}", name),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::schema_mismatch(
                name,
                format!("name contains invalid characters: {}", name),
            ));
        }
        Ok(())
    }

    /// Adds a column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        Self::check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::schema_mismatch(
                &self.name,
                format!("column already exists: {}", name),
            ));
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self)
    }

    /// Marks a column nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Marks a column non-nullable.
    pub fn add_not_null(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(false);
            }
        }
        self
    }

    /// Declares the (single-column) primary key.
    pub fn add_primary_key(mut self, column: &str) -> Result<Self> {
        if !self.columns.iter().any(|c| c.name() == column) {
            return Err(Error::schema_mismatch(
                &self.name,
                format!("column not found: {}", column),
            ));
        }
        self.primary_key = Some(column.to_string());
        Ok(self)
    }

    /// Marks the table as a temporary table.
    pub fn temporary(mut self, value: bool) -> Self {
        self.temporary = value;
        self
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.with_index(i))
            .collect();

        Ok(Table {
            name: self.name,
            columns,
            primary_key: self.primary_key,
            temporary: self.temporary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builder() {
        let table = TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("name", DataType::Text)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(table.name(), "users");
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.primary_key(), Some("id"));
    }

    #[test]
    fn test_table_get_column() {
        let table = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("name", DataType::Text)
            .unwrap()
            .build()
            .unwrap();

        assert!(table.get_column("id").is_some());
        assert!(table.get_column("name").is_some());
        assert!(table.get_column("unknown").is_none());
    }

    #[test]
    fn test_invalid_column_name() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("123invalid", DataType::Integer);

        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("id", DataType::Integer);

        assert!(result.is_err());
    }

    #[test]
    fn test_temporary_table() {
        let table = TableBuilder::new("scratch")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .temporary(true)
            .build()
            .unwrap();

        assert!(table.is_temporary());
    }
}
