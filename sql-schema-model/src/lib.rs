//! In-memory description of a MySQL database schema.
//!
//! The schema is stored as flat, id-indexed vectors. Traversal goes through
//! the [walkers](crate::walkers) API, which lends out cheap copiable handles
//! into the schema.

#![deny(rust_2018_idioms, unsafe_code)]

pub mod walkers;

mod ids;

pub use ids::*;
pub use walkers::{
    ForeignKeyWalker, IndexPartWalker, IndexWalker, TableColumnWalker, TableWalker, Walker,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A MySQL database schema.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct SqlSchema {
    /// The schema's tables.
    tables: Vec<Table>,
    /// The schema's columns.
    columns: Vec<(TableId, Column)>,
    /// All indexes, unique constraints and primary keys.
    indexes: Vec<Index>,
    /// All parts of all indexes, in ordinal position order.
    index_parts: Vec<IndexPart>,
    /// All foreign keys.
    foreign_keys: Vec<ForeignKey>,
    /// Constrained and referenced columns of foreign keys.
    foreign_key_columns: Vec<ForeignKeyColumn>,
}

impl SqlSchema {
    /// Add a table to the schema.
    pub fn push_table(&mut self, name: String) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(Table { name });
        id
    }

    /// Add a column to the schema.
    pub fn push_column(&mut self, table_id: TableId, column: Column) -> TableColumnId {
        let id = TableColumnId(self.columns.len() as u32);
        self.columns.push((table_id, column));
        id
    }

    /// Add a normal index to the schema.
    pub fn push_index(&mut self, table_id: TableId, index_name: String) -> IndexId {
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Index {
            table_id,
            index_name,
            tpe: IndexType::Normal,
            definition: None,
        });
        id
    }

    /// Add a unique constraint/index to the schema.
    pub fn push_unique_constraint(&mut self, table_id: TableId, index_name: String) -> IndexId {
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Index {
            table_id,
            index_name,
            tpe: IndexType::Unique,
            definition: None,
        });
        id
    }

    /// Add a primary key to the schema.
    pub fn push_primary_key(&mut self, table_id: TableId, index_name: String) -> IndexId {
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Index {
            table_id,
            index_name,
            tpe: IndexType::PrimaryKey,
            definition: None,
        });
        id
    }

    /// Attach a raw DDL definition to an index. Indexes with a definition are
    /// compared and rendered through that statement.
    pub fn set_index_definition(&mut self, index_id: IndexId, definition: String) {
        self.indexes[index_id.0 as usize].definition = Some(definition);
    }

    /// Add a column part to an index.
    pub fn push_index_column(
        &mut self,
        index_id: IndexId,
        column_id: TableColumnId,
    ) -> IndexPartId {
        self.push_index_part(IndexPart {
            index_id,
            selector: IndexPartSelector::Column(column_id),
            sort_order: None,
            length: None,
        })
    }

    /// Add an expression part to an index.
    pub fn push_index_expression(&mut self, index_id: IndexId, expression: String) -> IndexPartId {
        self.push_index_part(IndexPart {
            index_id,
            selector: IndexPartSelector::Expression(expression),
            sort_order: None,
            length: None,
        })
    }

    pub fn push_index_part(&mut self, part: IndexPart) -> IndexPartId {
        let id = IndexPartId(self.index_parts.len() as u32);
        self.index_parts.push(part);
        id
    }

    pub fn push_foreign_key(
        &mut self,
        constraint_name: Option<String>,
        [constrained_table, referenced_table]: [TableId; 2],
        [on_delete_action, on_update_action]: [ForeignKeyAction; 2],
    ) -> ForeignKeyId {
        let id = ForeignKeyId(self.foreign_keys.len() as u32);
        self.foreign_keys.push(ForeignKey {
            constrained_table,
            referenced_table,
            constraint_name,
            on_delete_action,
            on_update_action,
        });
        id
    }

    pub fn push_foreign_key_column(
        &mut self,
        foreign_key_id: ForeignKeyId,
        [constrained_column, referenced_column]: [TableColumnId; 2],
    ) {
        self.foreign_key_columns.push(ForeignKeyColumn {
            foreign_key_id,
            constrained_column,
            referenced_column,
        });
    }

    /// Try to find a table by name.
    pub fn find_table(&self, name: &str) -> Option<TableId> {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .map(|i| TableId(i as u32))
    }

    pub fn tables_count(&self) -> usize {
        self.tables.len()
    }

    /// The total number of indexes in the schema.
    pub fn indexes_count(&self) -> usize {
        self.indexes.len()
    }

    /// No tables in the schema.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_walker<'a>(&'a self, name: &str) -> Option<TableWalker<'a>> {
        Some(self.walk(self.find_table(name)?))
    }

    pub fn table_walkers(&self) -> impl ExactSizeIterator<Item = TableWalker<'_>> {
        (0..self.tables.len()).map(move |table_index| self.walk(TableId(table_index as u32)))
    }

    pub fn index_walkers(&self) -> impl ExactSizeIterator<Item = IndexWalker<'_>> {
        (0..self.indexes.len()).map(move |index_index| self.walk(IndexId(index_index as u32)))
    }

    pub fn walk_foreign_keys(&self) -> impl ExactSizeIterator<Item = ForeignKeyWalker<'_>> {
        (0..self.foreign_keys.len()).map(move |fk_index| self.walk(ForeignKeyId(fk_index as u32)))
    }

    /// Traverse a schema item by id.
    pub fn walk<I>(&self, id: I) -> Walker<'_, I> {
        Walker { schema: self, id }
    }

    pub(crate) fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub(crate) fn columns(&self) -> &[(TableId, Column)] {
        &self.columns
    }

    pub(crate) fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub(crate) fn index_parts(&self) -> &[IndexPart] {
        &self.index_parts
    }

    pub(crate) fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub(crate) fn foreign_key_columns(&self) -> &[ForeignKeyColumn] {
        &self.foreign_key_columns
    }
}

/// A table found in a schema.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct Table {
    pub(crate) name: String,
}

/// A column found in a table.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    pub tpe: ColumnType,
    /// Column default.
    pub default: Option<DefaultValue>,
    /// Is the column auto-incrementing?
    pub auto_increment: bool,
}

/// The type of a column.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ColumnType {
    /// The full SQL data type, when it cannot be derived from the family.
    pub full_data_type: String,
    /// The family of the raw type.
    pub family: ColumnTypeFamily,
    /// The arity of the column.
    pub arity: ColumnArity,
}

impl ColumnType {
    pub fn pure(family: ColumnTypeFamily, arity: ColumnArity) -> Self {
        ColumnType {
            full_data_type: String::new(),
            family,
            arity,
        }
    }

    pub fn with_full_data_type(
        family: ColumnTypeFamily,
        arity: ColumnArity,
        full_data_type: String,
    ) -> Self {
        ColumnType {
            full_data_type,
            family,
            arity,
        }
    }
}

/// Enumeration of column type families.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub enum ColumnTypeFamily {
    /// Integer types.
    Int,
    /// BigInt types.
    BigInt,
    /// Floating point types.
    Float,
    /// Decimal types.
    Decimal,
    /// Boolean types.
    Boolean,
    /// String types.
    String,
    /// DateTime types.
    DateTime,
    /// Binary types.
    Binary,
    /// JSON types.
    Json,
}

impl ColumnTypeFamily {
    pub fn is_json(&self) -> bool {
        matches!(self, ColumnTypeFamily::Json)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ColumnTypeFamily::String)
    }
}

/// A column's arity.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ColumnArity {
    /// Required column.
    Required,
    /// Nullable column.
    Nullable,
}

impl ColumnArity {
    /// The arity is ColumnArity::Nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ColumnArity::Nullable)
    }

    /// The arity is ColumnArity::Required.
    pub fn is_required(&self) -> bool {
        matches!(self, ColumnArity::Required)
    }
}

/// A column default value.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub enum DefaultValue {
    /// A constant value, rendered as-is into the DDL.
    Value(String),
    /// An expression generating a current timestamp.
    Now,
    /// An unrecognized default expression drawn from the database.
    DbGenerated(String),
}

/// The type of an index.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum IndexType {
    /// Unique type.
    Unique,
    /// Normal type.
    Normal,
    /// The table's primary key.
    PrimaryKey,
}

impl IndexType {
    pub fn is_unique(&self) -> bool {
        matches!(self, IndexType::Unique)
    }
}

/// The sort order of an index part.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Copy, Clone, Default)]
pub enum SQLSortOrder {
    #[default]
    Asc,
    Desc,
}

impl AsRef<str> for SQLSortOrder {
    fn as_ref(&self) -> &str {
        match self {
            SQLSortOrder::Asc => "ASC",
            SQLSortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SQLSortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// An index on a table.
#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub(crate) struct Index {
    pub(crate) table_id: TableId,
    pub(crate) index_name: String,
    pub(crate) tpe: IndexType,
    /// The raw DDL statement the index was declared through, if any.
    pub(crate) definition: Option<String>,
}

/// One part of an index: either a plain column or a functional expression.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct IndexPart {
    pub index_id: IndexId,
    pub selector: IndexPartSelector,
    pub sort_order: Option<SQLSortOrder>,
    pub length: Option<u32>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub enum IndexPartSelector {
    /// A regular column reference.
    Column(TableColumnId),
    /// A functional part: the rendered SQL expression.
    Expression(String),
}

/// Foreign key action types (for ON DELETE / ON UPDATE).
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ForeignKeyAction {
    /// Produce an error indicating that the deletion or update would create a
    /// foreign key constraint violation.
    NoAction,
    /// Same as NoAction, checked immediately.
    Restrict,
    /// Delete or update the referencing rows along with the referenced row.
    Cascade,
    /// Set the referencing column(s) to null.
    SetNull,
    /// Set the referencing column(s) to their default values.
    SetDefault,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub(crate) struct ForeignKey {
    /// The table the foreign key is defined on.
    pub(crate) constrained_table: TableId,
    /// Referenced table.
    pub(crate) referenced_table: TableId,
    /// The foreign key constraint name, when available.
    pub(crate) constraint_name: Option<String>,
    pub(crate) on_delete_action: ForeignKeyAction,
    pub(crate) on_update_action: ForeignKeyAction,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub(crate) struct ForeignKeyColumn {
    pub(crate) foreign_key_id: ForeignKeyId,
    pub(crate) constrained_column: TableColumnId,
    pub(crate) referenced_column: TableColumnId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pushing_and_walking_a_table() {
        let mut schema = SqlSchema::default();
        let table_id = schema.push_table("author".to_owned());
        let column_id = schema.push_column(
            table_id,
            Column {
                name: "id".to_owned(),
                tpe: ColumnType::pure(ColumnTypeFamily::Int, ColumnArity::Required),
                default: None,
                auto_increment: true,
            },
        );
        let pk = schema.push_primary_key(table_id, "PRIMARY".to_owned());
        schema.push_index_column(pk, column_id);

        let table = schema.table_walker("author").unwrap();
        assert_eq!(table.name(), "author");
        assert_eq!(table.columns().count(), 1);

        let pk = table.primary_key().unwrap();
        assert_eq!(pk.name(), "PRIMARY");
        assert_eq!(
            pk.parts()
                .filter_map(|p| p.as_column().map(|c| c.name().to_owned()))
                .collect::<Vec<_>>(),
            &["id"]
        );
    }
}
