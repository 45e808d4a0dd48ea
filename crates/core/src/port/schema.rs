// Schema identity port
//
// Every database handle carries the table definitions it was wired to.
// Engine selection compares that binding, not a configuration flag.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableDef {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

/// Static description of one engine's schema
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct SchemaBinding {
    /// Unique identity of the schema definition set
    pub id: &'static str,
    pub dialect: Dialect,
    pub version: u32,
    pub tables: &'static [TableDef],
}

impl SchemaBinding {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Same definition set (identity, not structural equality)
    pub fn is_same(&self, other: &SchemaBinding) -> bool {
        self.id == other.id && self.dialect == other.dialect
    }
}
