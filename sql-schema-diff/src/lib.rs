//! Schema diffing for MySQL: lower entity metadata to a schema description,
//! diff two schema descriptions into migration steps, and render the steps as
//! a DDL script.
//!
//! ```
//! use sql_schema_diff::{calculate_sql_schema, metadata::*, update_schema_sql, MysqlFlavour};
//! use sql_schema_model::ColumnTypeFamily;
//!
//! let mut previous = EntityModel::new();
//! previous.push_entity(
//!     Entity::new("Author")
//!         .property(Property::primary_key("id"))
//!         .property(Property::scalar("name", ColumnTypeFamily::String)),
//! );
//!
//! let mut next = EntityModel::new();
//! next.push_entity(
//!     Entity::new("Author")
//!         .property(Property::primary_key("id"))
//!         .property(Property::scalar("name", ColumnTypeFamily::String).indexed()),
//! );
//!
//! let previous = calculate_sql_schema(&previous).unwrap();
//! let next = calculate_sql_schema(&next).unwrap();
//! let script = update_schema_sql(&previous, &next, &MysqlFlavour::default());
//!
//! assert_eq!(script, "-- CreateIndex\nCREATE INDEX `author_name_idx` ON `author`(`name`);\n");
//! ```

#![deny(rust_2018_idioms, unsafe_code)]

pub mod metadata;

mod error;
mod flavour;
mod pair;
mod sql_migration;
mod sql_renderer;
mod sql_schema_calculator;
mod sql_schema_differ;

pub use error::CalculatorError;
pub use flavour::{Circumstances, MysqlFlavour};
pub use pair::Pair;
pub use sql_migration::{AlterColumn, AlterTable, SqlMigrationStep, TableChange};
pub use sql_schema_calculator::calculate_sql_schema;
pub use sql_schema_differ::ColumnChanges;

use sql_schema_model::SqlSchema;

/// Diff two schemas into migration steps, in execution order.
pub fn diff(schemas: Pair<&SqlSchema>, flavour: &MysqlFlavour) -> Vec<SqlMigrationStep> {
    sql_schema_differ::calculate_steps(schemas, flavour)
}

/// Render steps previously calculated by [`diff`] over the same schema pair.
pub fn render_steps(steps: &[SqlMigrationStep], schemas: Pair<&SqlSchema>) -> String {
    sql_renderer::render_migration_script(steps, schemas)
}

/// Diff two schemas and render the migration script that takes the database
/// from `previous` to `next`. Returns an empty string when the schemas match.
pub fn update_schema_sql(previous: &SqlSchema, next: &SqlSchema, flavour: &MysqlFlavour) -> String {
    let schemas = Pair::new(previous, next);
    let steps = diff(schemas, flavour);

    render_steps(&steps, schemas)
}
