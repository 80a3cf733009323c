use super::{foreign_keys_match, index};
use crate::pair::Pair;
use sql_schema_model::{ForeignKeyWalker, IndexWalker, TableColumnWalker, TableWalker};

pub(crate) struct TableDiffer<'a> {
    pub(crate) tables: Pair<TableWalker<'a>>,
}

/// The index changes for one table pair.
#[derive(Default)]
pub(crate) struct IndexDiff<'a> {
    pub(crate) created: Vec<IndexWalker<'a>>,
    pub(crate) dropped: Vec<IndexWalker<'a>>,
    pub(crate) renamed: Vec<Pair<IndexWalker<'a>>>,
    pub(crate) redefined: Vec<Pair<IndexWalker<'a>>>,
}

impl<'schema> TableDiffer<'schema> {
    pub(crate) fn column_pairs(&self) -> impl Iterator<Item = Pair<TableColumnWalker<'schema>>> + '_ {
        self.previous().columns().filter_map(|previous_column| {
            self.next()
                .column(previous_column.name())
                .map(|next_column| Pair::new(previous_column, next_column))
        })
    }

    pub(crate) fn dropped_columns(&self) -> impl Iterator<Item = TableColumnWalker<'schema>> + '_ {
        self.previous()
            .columns()
            .filter(|previous_column| self.next().column(previous_column.name()).is_none())
    }

    pub(crate) fn added_columns(&self) -> impl Iterator<Item = TableColumnWalker<'schema>> + '_ {
        self.next()
            .columns()
            .filter(|next_column| self.previous().column(next_column.name()).is_none())
    }

    pub(crate) fn created_foreign_keys(&self) -> impl Iterator<Item = ForeignKeyWalker<'schema>> + '_ {
        self.next().foreign_keys().filter(|next_fk| {
            !self
                .previous()
                .foreign_keys()
                .any(|previous_fk| foreign_keys_match(Pair::new(previous_fk, *next_fk)))
        })
    }

    pub(crate) fn dropped_foreign_keys(&self) -> impl Iterator<Item = ForeignKeyWalker<'schema>> + '_ {
        self.previous().foreign_keys().filter(|previous_fk| {
            !self
                .next()
                .foreign_keys()
                .any(|next_fk| foreign_keys_match(Pair::new(*previous_fk, next_fk)))
        })
    }

    /// Pair up the indexes of the two tables and compute the changes.
    ///
    /// Indexes pair by name first: a name-stable index with a changed
    /// definition is a redefinition. The remaining indexes pair
    /// structurally, in name order on both sides so the outcome stays
    /// deterministic when several indexes share a structure; those pairs are
    /// renames. What is left is created on the next side and dropped on the
    /// previous side — except that an index covering a foreign key only gets
    /// dropped when another index still covers that foreign key afterwards.
    pub(crate) fn diff_indexes(&self) -> IndexDiff<'schema> {
        let previous: Vec<IndexWalker<'schema>> = self.previous_indexes().collect();
        let next: Vec<IndexWalker<'schema>> = self.next_indexes().collect();

        let mut previous_used = vec![false; previous.len()];
        let mut next_used = vec![false; next.len()];
        let mut diff = IndexDiff::default();

        for (i, previous_index) in previous.iter().enumerate() {
            if let Some(j) = next.iter().position(|n| n.name() == previous_index.name()) {
                previous_used[i] = true;
                next_used[j] = true;

                if !index::indexes_match(*previous_index, next[j]) {
                    diff.redefined.push(Pair::new(*previous_index, next[j]));
                }
            }
        }

        let mut previous_left: Vec<usize> = (0..previous.len()).filter(|i| !previous_used[*i]).collect();
        previous_left.sort_by_key(|i| previous[*i].name());
        let mut next_left: Vec<usize> = (0..next.len()).filter(|j| !next_used[*j]).collect();
        next_left.sort_by_key(|j| next[*j].name());

        for i in previous_left {
            let found = next_left
                .iter()
                .copied()
                .find(|j| !next_used[*j] && index::indexes_match(previous[i], next[*j]));

            if let Some(j) = found {
                previous_used[i] = true;
                next_used[j] = true;
                diff.renamed.push(Pair::new(previous[i], next[j]));
            }
        }

        for (j, next_index) in next.iter().enumerate() {
            if !next_used[j] {
                diff.created.push(*next_index);
            }
        }

        for (i, previous_index) in previous.iter().enumerate() {
            if previous_used[i] {
                continue;
            }

            if self.index_must_stay_for_foreign_key(*previous_index) {
                continue;
            }

            diff.dropped.push(*previous_index);
        }

        diff
    }

    /// On MySQL, foreign keys need a covering index at all times. An index
    /// covering a surviving foreign key can only be dropped when the next
    /// schema still has some index covering that foreign key.
    fn index_must_stay_for_foreign_key(&self, previous_index: IndexWalker<'schema>) -> bool {
        if !index::index_covers_fk(self.previous(), previous_index) {
            return false;
        }

        self.previous()
            .foreign_keys()
            .filter(|fk| index::covers(previous_index, *fk))
            .any(|previous_fk| {
                let surviving_fk = self
                    .next()
                    .foreign_keys()
                    .find(|next_fk| foreign_keys_match(Pair::new(previous_fk, *next_fk)));

                match surviving_fk {
                    Some(next_fk) => !self
                        .next()
                        .indexes()
                        .any(|next_index| index::covers(next_index, next_fk)),
                    None => false,
                }
            })
    }

    pub(crate) fn primary_key_changed(&self) -> bool {
        match (self.previous().primary_key(), self.next().primary_key()) {
            (Some(previous_pk), Some(next_pk)) => !index::indexes_match(previous_pk, next_pk),
            _ => false,
        }
    }

    /// The primary key present in `next` but not `previous`, if applicable.
    pub(crate) fn created_primary_key(&self) -> Option<IndexWalker<'schema>> {
        match (self.previous().primary_key(), self.next().primary_key()) {
            (None, Some(pk)) => Some(pk),
            _ => None,
        }
    }

    /// The primary key present in `previous` but not `next`, if applicable.
    pub(crate) fn dropped_primary_key(&self) -> Option<IndexWalker<'schema>> {
        match (self.previous().primary_key(), self.next().primary_key()) {
            (Some(pk), None) => Some(pk),
            _ => None,
        }
    }

    fn previous_indexes(&self) -> impl Iterator<Item = IndexWalker<'schema>> + '_ {
        self.previous().indexes().filter(|idx| !idx.is_primary_key())
    }

    fn next_indexes(&self) -> impl Iterator<Item = IndexWalker<'schema>> + '_ {
        self.next().indexes().filter(|idx| !idx.is_primary_key())
    }

    pub(crate) fn previous(&self) -> TableWalker<'schema> {
        self.tables.previous
    }

    pub(crate) fn next(&self) -> TableWalker<'schema> {
        self.tables.next
    }
}
