//! Cheap traversal handles over a [`SqlSchema`].

use crate::{
    Column, ColumnArity, ColumnType, ColumnTypeFamily, DefaultValue, ForeignKeyAction,
    ForeignKeyId, IndexId, IndexPart, IndexPartId, IndexPartSelector, IndexType, SQLSortOrder,
    SqlSchema, TableColumnId, TableId,
};

/// A generic reference to a schema item, by id. It exposes an API depending
/// on the id type.
#[derive(Clone, Copy)]
pub struct Walker<'a, I> {
    /// The schema the item belongs to.
    pub schema: &'a SqlSchema,
    /// The identifier.
    pub id: I,
}

impl<'a, I> Walker<'a, I> {
    /// Traverse something else in the same schema.
    pub fn walk<J>(self, other_id: J) -> Walker<'a, J> {
        self.schema.walk(other_id)
    }
}

pub type TableWalker<'a> = Walker<'a, TableId>;
pub type TableColumnWalker<'a> = Walker<'a, TableColumnId>;
pub type IndexWalker<'a> = Walker<'a, IndexId>;
pub type IndexPartWalker<'a> = Walker<'a, IndexPartId>;
pub type ForeignKeyWalker<'a> = Walker<'a, ForeignKeyId>;

impl<'a> TableWalker<'a> {
    pub fn name(self) -> &'a str {
        &self.schema.tables()[self.id.0 as usize].name
    }

    /// The columns of the table, in definition order.
    pub fn columns(self) -> impl Iterator<Item = TableColumnWalker<'a>> {
        let table_id = self.id;
        self.schema
            .columns()
            .iter()
            .enumerate()
            .filter(move |(_, (tid, _))| *tid == table_id)
            .map(move |(idx, _)| self.walk(TableColumnId(idx as u32)))
    }

    pub fn column(self, column_name: &str) -> Option<TableColumnWalker<'a>> {
        self.columns().find(|col| col.name() == column_name)
    }

    /// All indexes on the table, including the primary key.
    pub fn indexes(self) -> impl Iterator<Item = IndexWalker<'a>> {
        let table_id = self.id;
        self.schema
            .indexes()
            .iter()
            .enumerate()
            .filter(move |(_, index)| index.table_id == table_id)
            .map(move |(idx, _)| self.walk(IndexId(idx as u32)))
    }

    pub fn primary_key(self) -> Option<IndexWalker<'a>> {
        self.indexes().find(|index| index.is_primary_key())
    }

    pub fn foreign_keys(self) -> impl Iterator<Item = ForeignKeyWalker<'a>> {
        let table_id = self.id;
        self.schema
            .foreign_keys()
            .iter()
            .enumerate()
            .filter(move |(_, fk)| fk.constrained_table == table_id)
            .map(move |(idx, _)| self.walk(ForeignKeyId(idx as u32)))
    }
}

impl<'a> TableColumnWalker<'a> {
    fn get(self) -> &'a Column {
        &self.schema.columns()[self.id.0 as usize].1
    }

    pub fn name(self) -> &'a str {
        &self.get().name
    }

    pub fn column_type(self) -> &'a ColumnType {
        &self.get().tpe
    }

    pub fn column_type_family(self) -> &'a ColumnTypeFamily {
        &self.get().tpe.family
    }

    pub fn arity(self) -> ColumnArity {
        self.get().tpe.arity
    }

    pub fn default(self) -> Option<&'a DefaultValue> {
        self.get().default.as_ref()
    }

    pub fn is_autoincrement(self) -> bool {
        self.get().auto_increment
    }

    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.schema.columns()[self.id.0 as usize].0)
    }

    pub fn is_same_column(self, other: TableColumnWalker<'_>) -> bool {
        self.name() == other.name() && self.table().name() == other.table().name()
    }
}

impl<'a> IndexWalker<'a> {
    pub fn name(self) -> &'a str {
        &self.schema.indexes()[self.id.0 as usize].index_name
    }

    pub fn index_type(self) -> IndexType {
        self.schema.indexes()[self.id.0 as usize].tpe
    }

    pub fn is_unique(self) -> bool {
        self.index_type().is_unique()
    }

    pub fn is_primary_key(self) -> bool {
        matches!(self.index_type(), IndexType::PrimaryKey)
    }

    /// The raw DDL statement the index was declared through, if any.
    pub fn raw_definition(self) -> Option<&'a str> {
        self.schema.indexes()[self.id.0 as usize].definition.as_deref()
    }

    /// The parts of the index, in ordinal position order.
    pub fn parts(self) -> impl ExactSizeIterator<Item = IndexPartWalker<'a>> {
        let index_id = self.id;
        self.schema
            .index_parts()
            .iter()
            .enumerate()
            .filter(move |(_, part)| part.index_id == index_id)
            .map(move |(idx, _)| self.walk(IndexPartId(idx as u32)))
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.schema.indexes()[self.id.0 as usize].table_id)
    }
}

impl<'a> IndexPartWalker<'a> {
    pub fn get(self) -> &'a IndexPart {
        &self.schema.index_parts()[self.id.0 as usize]
    }

    /// The column backing the part, unless it is a functional part.
    pub fn as_column(self) -> Option<TableColumnWalker<'a>> {
        match self.get().selector {
            IndexPartSelector::Column(column_id) => Some(self.walk(column_id)),
            IndexPartSelector::Expression(_) => None,
        }
    }

    /// The SQL expression of a functional part.
    pub fn expression(self) -> Option<&'a str> {
        match &self.get().selector {
            IndexPartSelector::Column(_) => None,
            IndexPartSelector::Expression(expr) => Some(expr),
        }
    }

    pub fn sort_order(self) -> Option<SQLSortOrder> {
        self.get().sort_order
    }

    pub fn length(self) -> Option<u32> {
        self.get().length
    }

    pub fn index(self) -> IndexWalker<'a> {
        self.walk(self.get().index_id)
    }
}

impl<'a> ForeignKeyWalker<'a> {
    pub fn table(self) -> TableWalker<'a> {
        self.walk(self.schema.foreign_keys()[self.id.0 as usize].constrained_table)
    }

    pub fn referenced_table(self) -> TableWalker<'a> {
        self.walk(self.schema.foreign_keys()[self.id.0 as usize].referenced_table)
    }

    pub fn constraint_name(self) -> Option<&'a str> {
        self.schema.foreign_keys()[self.id.0 as usize]
            .constraint_name
            .as_deref()
    }

    pub fn on_delete_action(self) -> ForeignKeyAction {
        self.schema.foreign_keys()[self.id.0 as usize].on_delete_action
    }

    pub fn on_update_action(self) -> ForeignKeyAction {
        self.schema.foreign_keys()[self.id.0 as usize].on_update_action
    }

    pub fn constrained_columns(self) -> impl ExactSizeIterator<Item = TableColumnWalker<'a>> {
        let fk_id = self.id;
        self.schema
            .foreign_key_columns()
            .iter()
            .filter(move |col| col.foreign_key_id == fk_id)
            .map(move |col| self.walk(col.constrained_column))
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn referenced_columns(self) -> impl ExactSizeIterator<Item = TableColumnWalker<'a>> {
        let fk_id = self.id;
        self.schema
            .foreign_key_columns()
            .iter()
            .filter(move |col| col.foreign_key_id == fk_id)
            .map(move |col| self.walk(col.referenced_column))
            .collect::<Vec<_>>()
            .into_iter()
    }
}
