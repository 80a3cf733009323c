//! Rendering migration steps as MySQL DDL.

mod common;
mod mysql_renderer;

pub(crate) use mysql_renderer::render_migration_script;
