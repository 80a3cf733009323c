//! The migration step types produced by the differ.

use crate::{pair::Pair, sql_schema_differ::ColumnChanges};
use sql_schema_model::{ForeignKeyId, IndexId, TableColumnId, TableId};

/// A single unit of schema change. The variants are listed in the order the
/// steps are emitted in.
#[derive(Debug, PartialEq)]
pub enum SqlMigrationStep {
    DropForeignKey {
        foreign_key_id: ForeignKeyId,
    },
    DropIndex {
        index_id: IndexId,
    },
    AlterTable(AlterTable),
    // Order matters: we must drop tables before we create indexes, because
    // the new indexes can clash in name with indexes on the dropped tables.
    DropTable {
        table_id: TableId,
    },
    CreateTable {
        table_id: TableId,
    },
    // Order matters: we must create indexes after ALTER TABLEs because the
    // indexes can be on fields that are created there.
    CreateIndex {
        index_id: IndexId,
    },
    // Order matters: this needs to come after CreateIndex, because foreign
    // keys can depend on unique indexes created there.
    AddForeignKey {
        foreign_key_id: ForeignKeyId,
    },
    RenameIndex {
        index: Pair<IndexId>,
    },
    /// Drop and recreate an index with the same name but a changed
    /// definition, or stand in for a rename where the server cannot rename.
    RedefineIndex {
        index: Pair<IndexId>,
    },
}

impl SqlMigrationStep {
    pub fn description(&self) -> &'static str {
        match self {
            SqlMigrationStep::AddForeignKey { .. } => "AddForeignKey",
            SqlMigrationStep::AlterTable(_) => "AlterTable",
            SqlMigrationStep::CreateIndex { .. } => "CreateIndex",
            SqlMigrationStep::CreateTable { .. } => "CreateTable",
            SqlMigrationStep::DropForeignKey { .. } => "DropForeignKey",
            SqlMigrationStep::DropIndex { .. } => "DropIndex",
            SqlMigrationStep::DropTable { .. } => "DropTable",
            SqlMigrationStep::RedefineIndex { .. } => "RedefineIndex",
            SqlMigrationStep::RenameIndex { .. } => "RenameIndex",
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct AlterTable {
    pub table_ids: Pair<TableId>,
    pub changes: Vec<TableChange>,
}

#[derive(Debug, PartialEq)]
pub enum TableChange {
    AddColumn {
        column_id: TableColumnId,
    },
    AlterColumn(AlterColumn),
    DropColumn {
        column_id: TableColumnId,
    },
    DropPrimaryKey,
    AddPrimaryKey,
}

#[derive(Debug, PartialEq)]
pub struct AlterColumn {
    pub column_id: Pair<TableColumnId>,
    pub changes: ColumnChanges,
}
