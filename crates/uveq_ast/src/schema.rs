//! Schema model handed in by the (external) plan-translation layer.
//!
//! The pipeline consumes it in two places: null propagation (a column
//! declared NOT NULL makes `IsNull` facts on it unsatisfiable) and the
//! integrity-constraint fold (unique keys make relations duplicate-free).

use rustc_hash::FxHashMap;

/// Column type as far as the arithmetic encoding cares: integers are native,
/// strings are uninterpreted pairwise-distinct values, booleans are 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Str,
    Bool,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Lookup from table name to its column layout.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: FxHashMap<String, TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn insert(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&Column> {
        self.table(table).and_then(|t| t.column(column))
    }
}

/// A uniqueness fact: `table.column` is a key (each value appears in at most
/// one row, and the relation therefore carries no duplicate rows).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub table: String,
    pub column: String,
}

/// Schema plus the integrity constraints the caller chose to fold in.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub schema: Schema,
    pub unique_keys: Vec<UniqueKey>,
}

impl Catalog {
    pub fn new(schema: Schema) -> Self {
        Catalog {
            schema,
            unique_keys: Vec::new(),
        }
    }

    pub fn with_unique_key(mut self, table: &str, column: &str) -> Self {
        self.unique_keys.push(UniqueKey {
            table: table.to_string(),
            column: column.to_string(),
        });
        self
    }

    /// Whether the relation is duplicate-free (it has some unique key).
    pub fn is_duplicate_free(&self, table: &str) -> bool {
        self.unique_keys.iter().any(|k| k.table == table)
    }

    pub fn is_unique_key(&self, table: &str, column: &str) -> bool {
        self.unique_keys
            .iter()
            .any(|k| k.table == table && k.column == column)
    }

    /// Whether `table.column` can hold NULL. Unknown columns are assumed
    /// nullable (conservative: no fact is derived from them).
    pub fn is_nullable(&self, table: &str, column: &str) -> bool {
        match self.schema.column(table, column) {
            Some(col) => col.nullable && !self.is_unique_key(table, column),
            None => true,
        }
    }
}
