//! Computing the migration steps between two SQL schemas.

mod column;
mod index;
mod table;

pub use column::ColumnChanges;
pub(crate) use column::column_changes;

use crate::{
    flavour::MysqlFlavour,
    pair::Pair,
    sql_migration::{AlterColumn, AlterTable, SqlMigrationStep, TableChange},
};
use sql_schema_model::{ForeignKeyWalker, IndexWalker, SqlSchema, TableWalker};
use table::TableDiffer;

pub(crate) fn calculate_steps(
    schemas: Pair<&SqlSchema>,
    flavour: &MysqlFlavour,
) -> Vec<SqlMigrationStep> {
    let differ = SqlSchemaDiffer { schemas };

    let mut drop_foreign_keys = Vec::new();
    let mut drop_indexes = Vec::new();
    let mut create_indexes = Vec::new();
    let mut add_foreign_keys = Vec::new();
    let mut rename_indexes = Vec::new();
    let mut redefine_indexes = Vec::new();

    let drop_tables: Vec<SqlMigrationStep> = differ
        .dropped_tables()
        .map(|table| {
            // The foreign keys of dropped tables are dropped first, so
            // tables can then be dropped in any order.
            drop_foreign_keys.extend(table.foreign_keys().map(|fk| SqlMigrationStep::DropForeignKey {
                foreign_key_id: fk.id,
            }));

            SqlMigrationStep::DropTable { table_id: table.id }
        })
        .collect();

    let create_tables: Vec<SqlMigrationStep> = differ
        .created_tables()
        .map(|table| {
            // The primary key and unique constraints are rendered inline in
            // CREATE TABLE. Everything else gets its own step.
            create_indexes.extend(
                table
                    .indexes()
                    .filter(|index| index_needs_separate_step(*index))
                    .map(|index| SqlMigrationStep::CreateIndex { index_id: index.id }),
            );

            add_foreign_keys.extend(table.foreign_keys().map(|fk| SqlMigrationStep::AddForeignKey {
                foreign_key_id: fk.id,
            }));

            SqlMigrationStep::CreateTable { table_id: table.id }
        })
        .collect();

    let mut alter_tables = Vec::new();

    for tables in differ.table_pairs() {
        for dropped_fk in tables.dropped_foreign_keys() {
            drop_foreign_keys.push(SqlMigrationStep::DropForeignKey {
                foreign_key_id: dropped_fk.id,
            });
        }

        for created_fk in tables.created_foreign_keys() {
            add_foreign_keys.push(SqlMigrationStep::AddForeignKey {
                foreign_key_id: created_fk.id,
            });
        }

        let index_diff = tables.diff_indexes();

        drop_indexes.extend(
            index_diff
                .dropped
                .iter()
                .map(|index| SqlMigrationStep::DropIndex { index_id: index.id }),
        );

        create_indexes.extend(
            index_diff
                .created
                .iter()
                .map(|index| SqlMigrationStep::CreateIndex { index_id: index.id }),
        );

        for renamed in index_diff.renamed {
            let index = renamed.map(|i| i.id);

            if flavour.can_rename_index() {
                rename_indexes.push(SqlMigrationStep::RenameIndex { index });
            } else {
                redefine_indexes.push(SqlMigrationStep::RedefineIndex { index });
            }
        }

        redefine_indexes.extend(
            index_diff
                .redefined
                .into_iter()
                .map(|pair| SqlMigrationStep::RedefineIndex {
                    index: pair.map(|i| i.id),
                }),
        );

        if let Some(alter_table) = alter_table(&tables) {
            alter_tables.push(SqlMigrationStep::AlterTable(alter_table));
        }
    }

    let steps: Vec<SqlMigrationStep> = drop_foreign_keys
        .into_iter()
        .chain(drop_indexes)
        .chain(alter_tables)
        // Order matters: we must drop tables before we create indexes,
        // because the new indexes can clash in name with indexes on the
        // dropped tables.
        .chain(drop_tables)
        .chain(create_tables)
        // Order matters: we must create indexes after ALTER TABLEs because
        // the indexes can be on fields that are created there.
        .chain(create_indexes)
        // Order matters: this needs to come after CreateIndex, because the
        // foreign keys can depend on unique indexes created there.
        .chain(add_foreign_keys)
        .chain(rename_indexes)
        .chain(redefine_indexes)
        .collect();

    tracing::debug!(step_count = steps.len(), "Calculated migration steps.");

    steps
}

/// Indexes not inlined in CREATE TABLE: normal indexes and indexes declared
/// through a raw DDL statement.
fn index_needs_separate_step(index: IndexWalker<'_>) -> bool {
    if index.is_primary_key() {
        return false;
    }

    index.raw_definition().is_some() || !index.is_unique()
}

fn alter_table(tables: &TableDiffer<'_>) -> Option<AlterTable> {
    // Order matters.
    let mut changes = Vec::new();

    if tables.dropped_primary_key().is_some() || tables.primary_key_changed() {
        changes.push(TableChange::DropPrimaryKey);
    }

    for dropped_column in tables.dropped_columns() {
        changes.push(TableChange::DropColumn {
            column_id: dropped_column.id,
        });
    }

    for added_column in tables.added_columns() {
        changes.push(TableChange::AddColumn {
            column_id: added_column.id,
        });
    }

    for columns in tables.column_pairs() {
        let column_changes = column_changes(columns);

        if column_changes.differs_in_something() {
            changes.push(TableChange::AlterColumn(AlterColumn {
                column_id: columns.map(|col| col.id),
                changes: column_changes,
            }));
        }
    }

    if tables.created_primary_key().is_some() || tables.primary_key_changed() {
        changes.push(TableChange::AddPrimaryKey);
    }

    if changes.is_empty() {
        return None;
    }

    Some(AlterTable {
        table_ids: tables.tables.map(|t| t.id),
        changes,
    })
}

struct SqlSchemaDiffer<'a> {
    schemas: Pair<&'a SqlSchema>,
}

impl<'schema> SqlSchemaDiffer<'schema> {
    /// An iterator over the tables that are present in both schemas.
    fn table_pairs(&self) -> impl Iterator<Item = TableDiffer<'schema>> + '_ {
        self.schemas.previous.table_walkers().filter_map(|previous_table| {
            self.schemas
                .next
                .table_walker(previous_table.name())
                .map(|next_table| TableDiffer {
                    tables: Pair::new(previous_table, next_table),
                })
        })
    }

    fn created_tables(&self) -> impl Iterator<Item = TableWalker<'schema>> + '_ {
        self.schemas
            .next
            .table_walkers()
            .filter(|next_table| self.schemas.previous.table_walker(next_table.name()).is_none())
    }

    fn dropped_tables(&self) -> impl Iterator<Item = TableWalker<'schema>> + '_ {
        self.schemas
            .previous
            .table_walkers()
            .filter(|previous_table| self.schemas.next.table_walker(previous_table.name()).is_none())
    }
}

/// Compare two foreign keys and return whether they should be considered
/// equivalent for schema diffing purposes. Constraint names are not part of
/// the comparison; the referential actions are, so a changed ON DELETE or
/// ON UPDATE recreates the constraint.
fn foreign_keys_match(fks: Pair<ForeignKeyWalker<'_>>) -> bool {
    let references_same_table =
        fks.previous.referenced_table().name() == fks.next.referenced_table().name();

    let same_referential_actions = fks.previous.on_delete_action() == fks.next.on_delete_action()
        && fks.previous.on_update_action() == fks.next.on_update_action();

    let constrains_same_columns = fks.previous.constrained_columns().len()
        == fks.next.constrained_columns().len()
        && fks
            .previous
            .constrained_columns()
            .zip(fks.next.constrained_columns())
            .all(|(a, b)| a.name() == b.name());

    let references_same_columns = fks.previous.referenced_columns().len()
        == fks.next.referenced_columns().len()
        && fks
            .previous
            .referenced_columns()
            .zip(fks.next.referenced_columns())
            .all(|(a, b)| a.name() == b.name());

    references_same_table && constrains_same_columns && references_same_columns && same_referential_actions
}
