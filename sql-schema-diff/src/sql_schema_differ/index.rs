use sql_schema_model::{ForeignKeyWalker, IndexType, IndexWalker, TableWalker};

/// Compare two indexes and return whether they only differ by name.
///
/// Indexes declared through a raw DDL statement only ever match other raw
/// indexes with the same statement.
pub(super) fn indexes_match(first: IndexWalker<'_>, second: IndexWalker<'_>) -> bool {
    if first.index_type() != second.index_type() {
        return false;
    }

    if first.raw_definition() != second.raw_definition() {
        return false;
    }

    let first_parts = first.parts();
    let second_parts = second.parts();

    first_parts.len() == second_parts.len()
        && first_parts.zip(second_parts).all(|(a, b)| {
            let selectors_match = match (a.as_column(), b.as_column()) {
                (Some(a_col), Some(b_col)) => a_col.name() == b_col.name(),
                (None, None) => a.expression() == b.expression(),
                _ => false,
            };

            selectors_match
                && a.length() == b.length()
                && a.sort_order().unwrap_or_default() == b.sort_order().unwrap_or_default()
        })
}

/// Whether the index is the one MySQL relies on for a foreign key: a normal
/// index over exactly the constrained columns, in order.
pub(super) fn index_covers_fk(table: TableWalker<'_>, index: IndexWalker<'_>) -> bool {
    // Only normal indexes can cover foreign keys.
    if index.index_type() != IndexType::Normal {
        return false;
    }

    table.foreign_keys().any(|fk| covers(index, fk))
}

pub(super) fn covers(index: IndexWalker<'_>, fk: ForeignKeyWalker<'_>) -> bool {
    let fk_cols = fk.constrained_columns().map(|col| col.name());
    let index_cols = index.parts().map(|part| part.as_column().map(|col| col.name()));

    fk_cols.len() == index_cols.len()
        && fk_cols
            .zip(index_cols)
            .all(|(fk_col, index_col)| index_col == Some(fk_col))
}
