use super::common::{quoted, truncate_identifier, IteratorJoin};
use crate::{
    pair::Pair,
    sql_migration::{SqlMigrationStep, TableChange},
};
use sql_schema_model::{
    ColumnTypeFamily, DefaultValue, ForeignKeyAction, ForeignKeyWalker, IndexWalker, SQLSortOrder,
    SqlSchema, TableColumnWalker, TableWalker,
};

/// Render the steps as a migration script. Each step renders under a
/// `-- StepName` comment, one statement per line.
pub(crate) fn render_migration_script(
    steps: &[SqlMigrationStep],
    schemas: Pair<&SqlSchema>,
) -> String {
    let mut script = String::with_capacity(steps.len() * 32);

    for (step_idx, step) in steps.iter().enumerate() {
        if step_idx > 0 {
            script.push('\n');
        }

        script.push_str("-- ");
        script.push_str(step.description());
        script.push('\n');

        for statement in render_step(step, schemas) {
            script.push_str(statement.trim_end_matches(';'));
            script.push_str(";\n");
        }
    }

    script
}

fn render_step(step: &SqlMigrationStep, schemas: Pair<&SqlSchema>) -> Vec<String> {
    match step {
        SqlMigrationStep::DropForeignKey { foreign_key_id } => {
            let fk = schemas.previous.walk(*foreign_key_id);
            vec![render_drop_foreign_key(fk)]
        }
        SqlMigrationStep::DropIndex { index_id } => {
            vec![render_drop_index(schemas.previous.walk(*index_id))]
        }
        SqlMigrationStep::AlterTable(alter_table) => {
            let tables = schemas.walk(alter_table.table_ids);
            vec![render_alter_table(tables, &alter_table.changes)]
        }
        SqlMigrationStep::DropTable { table_id } => {
            vec![format!(
                "DROP TABLE {}",
                quoted(schemas.previous.walk(*table_id).name())
            )]
        }
        SqlMigrationStep::CreateTable { table_id } => {
            vec![render_create_table(schemas.next.walk(*table_id))]
        }
        SqlMigrationStep::CreateIndex { index_id } => {
            vec![render_create_index(schemas.next.walk(*index_id))]
        }
        SqlMigrationStep::AddForeignKey { foreign_key_id } => {
            vec![render_add_foreign_key(schemas.next.walk(*foreign_key_id))]
        }
        SqlMigrationStep::RenameIndex { index } => {
            let indexes = schemas.walk(*index);
            vec![format!(
                "ALTER TABLE {} RENAME INDEX {} TO {}",
                quoted(indexes.next.table().name()),
                quoted(indexes.previous.name()),
                quoted(indexes.next.name()),
            )]
        }
        // Where the server cannot rename in place, or the definition itself
        // changed, the index is dropped and recreated. When the names differ
        // the new index goes first, so foreign keys stay covered throughout.
        SqlMigrationStep::RedefineIndex { index } => {
            let indexes = schemas.walk(*index);

            if indexes.previous.name() != indexes.next.name() {
                vec![
                    render_create_index(indexes.next),
                    render_drop_index(indexes.previous),
                ]
            } else {
                vec![
                    render_drop_index(indexes.previous),
                    render_create_index(indexes.next),
                ]
            }
        }
    }
}

fn render_alter_table(tables: Pair<TableWalker<'_>>, changes: &[TableChange]) -> String {
    let clauses = changes
        .iter()
        .map(|change| match change {
            TableChange::AddColumn { column_id } => {
                format!("ADD COLUMN {}", render_column(tables.next.walk(*column_id)))
            }
            TableChange::DropColumn { column_id } => {
                format!("DROP COLUMN {}", quoted(tables.previous.walk(*column_id).name()))
            }
            TableChange::AlterColumn(alter_column) => {
                format!("MODIFY {}", render_column(tables.next.walk(alter_column.column_id.next)))
            }
            TableChange::DropPrimaryKey => "DROP PRIMARY KEY".to_owned(),
            TableChange::AddPrimaryKey => format!(
                "ADD PRIMARY KEY ({})",
                tables
                    .next
                    .primary_key()
                    .map(render_primary_key_columns)
                    .unwrap_or_default()
            ),
        })
        .join(", ");

    format!("ALTER TABLE {} {}", quoted(tables.previous.name()), clauses)
}

fn render_create_table(table: TableWalker<'_>) -> String {
    let columns = table
        .columns()
        .map(|col| format!("    {}", render_column(col)))
        .join(",\n");

    let mut constraints: Vec<String> = table
        .indexes()
        .filter(|index| index.is_unique() && index.raw_definition().is_none())
        .map(|index| {
            format!(
                "    UNIQUE INDEX {}({})",
                quoted(truncate_identifier(index.name())),
                render_index_parts(index)
            )
        })
        .collect();

    if let Some(pk) = table.primary_key() {
        constraints.push(format!("    PRIMARY KEY ({})", render_primary_key_columns(pk)));
    }

    let constraints = if constraints.is_empty() {
        String::new()
    } else {
        format!(",\n\n{}", constraints.join(",\n"))
    };

    format!(
        "CREATE TABLE {} (\n{}{}\n) DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        quoted(table.name()),
        columns,
        constraints,
    )
}

fn render_create_index(index: IndexWalker<'_>) -> String {
    // Raw indexes go to the server as declared.
    if let Some(definition) = index.raw_definition() {
        return definition.to_owned();
    }

    let index_type = if index.is_unique() { "UNIQUE " } else { "" };

    format!(
        "CREATE {}INDEX {} ON {}({})",
        index_type,
        quoted(truncate_identifier(index.name())),
        quoted(index.table().name()),
        render_index_parts(index),
    )
}

fn render_drop_index(index: IndexWalker<'_>) -> String {
    format!(
        "DROP INDEX {} ON {}",
        quoted(index.name()),
        quoted(index.table().name())
    )
}

fn render_index_parts(index: IndexWalker<'_>) -> String {
    index
        .parts()
        .map(|part| match part.as_column() {
            Some(column) => {
                let mut rendered = quoted(column.name()).to_string();

                if let Some(length) = part.length() {
                    rendered.push_str(&format!("({length})"));
                }

                if let Some(SQLSortOrder::Desc) = part.sort_order() {
                    rendered.push_str(" DESC");
                }

                rendered
            }
            // MySQL requires functional key parts to be parenthesized.
            None => format!("({})", part.expression().unwrap_or_default()),
        })
        .join(", ")
}

fn render_primary_key_columns(pk: IndexWalker<'_>) -> String {
    pk.parts()
        .filter_map(|part| part.as_column())
        .map(|col| quoted(col.name()))
        .join(", ")
}

fn render_add_foreign_key(fk: ForeignKeyWalker<'_>) -> String {
    let constraint_name = fk
        .constraint_name()
        .expect("foreign key without constraint name");

    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        quoted(fk.table().name()),
        quoted(truncate_identifier(constraint_name)),
        fk.constrained_columns().map(|col| quoted(col.name())).join(", "),
        quoted(fk.referenced_table().name()),
        fk.referenced_columns().map(|col| quoted(col.name())).join(", "),
        render_referential_action(fk.on_delete_action()),
        render_referential_action(fk.on_update_action()),
    )
}

fn render_drop_foreign_key(fk: ForeignKeyWalker<'_>) -> String {
    let constraint_name = fk
        .constraint_name()
        .expect("foreign key without constraint name");

    format!(
        "ALTER TABLE {} DROP FOREIGN KEY {}",
        quoted(fk.table().name()),
        quoted(constraint_name)
    )
}

fn render_column(column: TableColumnWalker<'_>) -> String {
    let auto_increment = if column.is_autoincrement() {
        " AUTO_INCREMENT"
    } else {
        ""
    };

    format!(
        "{} {}{}{}{}",
        quoted(column.name()),
        render_column_type(column),
        render_nullability(column),
        render_default(column),
        auto_increment,
    )
}

fn render_column_type(column: TableColumnWalker<'_>) -> &str {
    let tpe = column.column_type();

    if !tpe.full_data_type.is_empty() {
        return &tpe.full_data_type;
    }

    match tpe.family {
        ColumnTypeFamily::Int => "INTEGER",
        ColumnTypeFamily::BigInt => "BIGINT",
        ColumnTypeFamily::Float => "DOUBLE",
        ColumnTypeFamily::Decimal => "DECIMAL(65, 30)",
        ColumnTypeFamily::Boolean => "BOOLEAN",
        ColumnTypeFamily::String => "VARCHAR(191)",
        ColumnTypeFamily::DateTime => "DATETIME(3)",
        ColumnTypeFamily::Binary => "LONGBLOB",
        ColumnTypeFamily::Json => "JSON",
    }
}

fn render_nullability(column: TableColumnWalker<'_>) -> &'static str {
    if column.arity().is_required() {
        " NOT NULL"
    } else {
        " NULL"
    }
}

fn render_default(column: TableColumnWalker<'_>) -> String {
    match column.default() {
        None => String::new(),
        Some(DefaultValue::Value(value)) => format!(" DEFAULT {value}"),
        Some(DefaultValue::Now) => " DEFAULT CURRENT_TIMESTAMP(3)".to_owned(),
        Some(DefaultValue::DbGenerated(expression)) => format!(" DEFAULT {expression}"),
    }
}

fn render_referential_action(action: ForeignKeyAction) -> &'static str {
    match action {
        ForeignKeyAction::NoAction => "NO ACTION",
        ForeignKeyAction::Restrict => "RESTRICT",
        ForeignKeyAction::Cascade => "CASCADE",
        ForeignKeyAction::SetNull => "SET NULL",
        ForeignKeyAction::SetDefault => "SET DEFAULT",
    }
}
