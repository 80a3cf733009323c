use crate::pair::Pair;
use enumflags2::BitFlags;
use sql_schema_model::TableColumnWalker;

#[enumflags2::bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ColumnChange {
    Arity = 1,
    TypeChanged = 1 << 1,
    Default = 1 << 2,
    Autoincrement = 1 << 3,
}

/// The change mask for a column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnChanges {
    changes: BitFlags<ColumnChange>,
}

impl ColumnChanges {
    pub fn differs_in_something(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn type_changed(&self) -> bool {
        self.changes.contains(ColumnChange::TypeChanged)
    }

    pub fn arity_changed(&self) -> bool {
        self.changes.contains(ColumnChange::Arity)
    }

    pub fn autoincrement_changed(&self) -> bool {
        self.changes.contains(ColumnChange::Autoincrement)
    }

    pub fn default_changed(&self) -> bool {
        self.changes.contains(ColumnChange::Default)
    }
}

pub(crate) fn column_changes(columns: Pair<TableColumnWalker<'_>>) -> ColumnChanges {
    let mut changes = BitFlags::empty();

    if columns.previous.arity() != columns.next.arity() {
        changes |= ColumnChange::Arity;
    }

    if column_type_changed(columns) {
        changes |= ColumnChange::TypeChanged;
    }

    if columns.previous.default() != columns.next.default() {
        changes |= ColumnChange::Default;
    }

    if columns.previous.is_autoincrement() != columns.next.is_autoincrement() {
        changes |= ColumnChange::Autoincrement;
    }

    ColumnChanges { changes }
}

fn column_type_changed(columns: Pair<TableColumnWalker<'_>>) -> bool {
    if columns.previous.column_type_family() != columns.next.column_type_family() {
        return true;
    }

    let previous_full = &columns.previous.column_type().full_data_type;
    let next_full = &columns.next.column_type().full_data_type;

    // The full data type is only compared when both sides carry one: an empty
    // one means "derive from the family".
    !previous_full.is_empty() && !next_full.is_empty() && previous_full != next_full
}
