//! Lowering entity metadata to a [`SqlSchema`].

use crate::{
    error::CalculatorError,
    metadata::{Entity, EntityModel, IndexAnnotation, IndexRequest, PropertyKind},
};
use once_cell::sync::Lazy;
use regex::Regex;
use sql_schema_model::{
    Column, ColumnArity, ColumnType, ColumnTypeFamily, ForeignKeyAction, IndexType, SqlSchema,
    TableColumnId, TableId,
};
use std::collections::{HashMap, HashSet};

pub fn calculate_sql_schema(model: &EntityModel) -> Result<SqlSchema, CalculatorError> {
    let mut ctx = Context {
        model,
        schema: SqlSchema::default(),
        table_ids: Vec::new(),
        column_ids: HashMap::new(),
    };

    // Tables and columns first, so foreign keys can reference columns of
    // entities declared later.
    for (entity_idx, entity) in model.entities().enumerate() {
        ctx.push_table_and_columns(entity_idx, entity);
    }

    for (entity_idx, entity) in model.entities().enumerate() {
        ctx.push_indexes(entity_idx, entity)?;
        ctx.push_foreign_keys(entity_idx, entity)?;
    }

    tracing::debug!(
        tables = ctx.schema.tables_count(),
        indexes = ctx.schema.indexes_count(),
        "Calculated SQL schema from entity metadata."
    );

    Ok(ctx.schema)
}

struct Context<'a> {
    model: &'a EntityModel,
    schema: SqlSchema,
    table_ids: Vec<TableId>,
    column_ids: HashMap<(usize, usize), TableColumnId>,
}

/// An index as resolved from the annotations, before it is pushed to the
/// schema.
struct ResolvedIndex {
    name: String,
    tpe: IndexType,
    parts: Vec<ResolvedPart>,
    raw_definition: Option<String>,
}

enum ResolvedPart {
    Column(TableColumnId),
    Expression(String),
}

impl<'a> Context<'a> {
    fn push_table_and_columns(&mut self, entity_idx: usize, entity: &Entity) {
        let table_id = self.schema.push_table(entity.table_name.clone());
        self.table_ids.push(table_id);

        for (property_idx, property) in entity.properties.iter().enumerate() {
            let (family, arity, auto_increment) = match &property.kind {
                PropertyKind::PrimaryKey => (ColumnTypeFamily::Int, ColumnArity::Required, true),
                PropertyKind::Scalar(family) => (family.clone(), ColumnArity::Required, false),
                PropertyKind::ManyToOne { nullable, .. } => {
                    let arity = if *nullable {
                        ColumnArity::Nullable
                    } else {
                        ColumnArity::Required
                    };
                    (ColumnTypeFamily::Int, arity, false)
                }
            };

            let column_id = self.schema.push_column(
                table_id,
                Column {
                    name: property.column_name(),
                    tpe: ColumnType::pure(family, arity),
                    default: None,
                    auto_increment,
                },
            );

            self.column_ids.insert((entity_idx, property_idx), column_id);
        }
    }

    fn push_indexes(&mut self, entity_idx: usize, entity: &Entity) -> Result<(), CalculatorError> {
        let table_id = self.table_ids[entity_idx];

        if let Some(pk_idx) = entity
            .properties
            .iter()
            .position(|p| matches!(p.kind, PropertyKind::PrimaryKey))
        {
            let index_id = self.schema.push_primary_key(table_id, "PRIMARY".to_owned());
            let column_id = self.column_ids[&(entity_idx, pk_idx)];
            self.schema.push_index_column(index_id, column_id);
        }

        let mut resolved: Vec<ResolvedIndex> = Vec::new();

        // Property-level index and unique requests, in property order.
        for (property_idx, property) in entity.properties.iter().enumerate() {
            let column_id = self.column_ids[&(entity_idx, property_idx)];
            let column_name = property.column_name();

            if property.index.is_requested() {
                resolved.push(ResolvedIndex {
                    name: requested_name(&property.index, &entity.table_name, &[&column_name], IndexType::Normal),
                    tpe: IndexType::Normal,
                    parts: vec![ResolvedPart::Column(column_id)],
                    raw_definition: None,
                });
            }

            if property.unique.is_requested() {
                resolved.push(ResolvedIndex {
                    name: requested_name(&property.unique, &entity.table_name, &[&column_name], IndexType::Unique),
                    tpe: IndexType::Unique,
                    parts: vec![ResolvedPart::Column(column_id)],
                    raw_definition: None,
                });
            }
        }

        // Entity-level annotations, in declaration order.
        for annotation in &entity.indexes {
            resolved.push(self.resolve_annotation(entity_idx, entity, annotation)?);
        }

        // MySQL creates an index for every foreign key. The implied index is
        // only materialized when no explicit plain index over exactly the
        // constrained column exists.
        for (property_idx, property) in entity.properties.iter().enumerate() {
            if !matches!(property.kind, PropertyKind::ManyToOne { .. }) {
                continue;
            }

            let column_id = self.column_ids[&(entity_idx, property_idx)];
            let covered = resolved.iter().any(|index| {
                index.raw_definition.is_none()
                    && !index.tpe.is_unique()
                    && index.parts.len() == 1
                    && matches!(index.parts.first(), Some(ResolvedPart::Column(id)) if *id == column_id)
            });

            if !covered {
                let column_name = property.column_name();
                resolved.push(ResolvedIndex {
                    name: generated_index_name(&entity.table_name, &[&column_name], IndexType::Normal),
                    tpe: IndexType::Normal,
                    parts: vec![ResolvedPart::Column(column_id)],
                    raw_definition: None,
                });
            }
        }

        let mut seen_names: HashSet<&str> = HashSet::new();
        for index in &resolved {
            if !seen_names.insert(index.name.as_str()) {
                return Err(CalculatorError::DuplicateIndexName {
                    table: entity.table_name.clone(),
                    name: index.name.clone(),
                });
            }
        }

        for index in resolved {
            let index_id = match index.tpe {
                IndexType::Unique => self.schema.push_unique_constraint(table_id, index.name),
                _ => self.schema.push_index(table_id, index.name),
            };

            for part in index.parts {
                match part {
                    ResolvedPart::Column(column_id) => {
                        self.schema.push_index_column(index_id, column_id);
                    }
                    ResolvedPart::Expression(expression) => {
                        self.schema.push_index_expression(index_id, expression);
                    }
                }
            }

            if let Some(definition) = index.raw_definition {
                self.schema.set_index_definition(index_id, definition);
            }
        }

        Ok(())
    }

    fn resolve_annotation(
        &self,
        entity_idx: usize,
        entity: &Entity,
        annotation: &IndexAnnotation,
    ) -> Result<ResolvedIndex, CalculatorError> {
        if annotation.parts.is_empty() {
            return Err(CalculatorError::EmptyIndex {
                entity: entity.name.clone(),
            });
        }

        let tpe = if annotation.unique {
            IndexType::Unique
        } else {
            IndexType::Normal
        };

        let mut parts = Vec::with_capacity(annotation.parts.len());
        let mut part_columns: Vec<String> = Vec::new();
        let mut has_json_path = false;

        for path in &annotation.parts {
            let mut segments = path.split('.');
            let property_name = segments.next().expect("split always yields one segment");
            let json_path: Vec<&str> = segments.collect();

            let (property_idx, property) = entity
                .properties
                .iter()
                .enumerate()
                .find(|(_, p)| p.name == property_name)
                .ok_or_else(|| CalculatorError::UnknownProperty {
                    entity: entity.name.clone(),
                    property: property_name.to_owned(),
                })?;

            let column_id = self.column_ids[&(entity_idx, property_idx)];
            let column_name = property.column_name();

            if json_path.is_empty() {
                parts.push(ResolvedPart::Column(column_id));
            } else {
                if !matches!(&property.kind, PropertyKind::Scalar(family) if family.is_json()) {
                    return Err(CalculatorError::JsonPathOnNonJsonProperty {
                        entity: entity.name.clone(),
                        property: property_name.to_owned(),
                    });
                }

                has_json_path = true;
                parts.push(ResolvedPart::Expression(json_value_expression(
                    &column_name,
                    &json_path,
                    annotation.returning.as_deref(),
                )));
            }

            if !part_columns.contains(&column_name) {
                part_columns.push(column_name);
            }
        }

        if annotation.returning.is_some() && !has_json_path {
            return Err(CalculatorError::ReturningWithoutJsonPath {
                entity: entity.name.clone(),
            });
        }

        let part_column_refs: Vec<&str> = part_columns.iter().map(|s| s.as_str()).collect();

        if let Some(expression) = &annotation.expression {
            // Raw indexes live in the database under the name declared in
            // the statement; fall back to it when no name is annotated.
            let name = annotation
                .name
                .clone()
                .or_else(|| index_name_from_definition(expression))
                .unwrap_or_else(|| generated_index_name(&entity.table_name, &part_column_refs, tpe));

            return Ok(ResolvedIndex {
                name,
                tpe,
                parts: Vec::new(),
                raw_definition: Some(expression.clone()),
            });
        }

        let name = annotation
            .name
            .clone()
            .unwrap_or_else(|| generated_index_name(&entity.table_name, &part_column_refs, tpe));

        Ok(ResolvedIndex {
            name,
            tpe,
            parts,
            raw_definition: None,
        })
    }

    fn push_foreign_keys(&mut self, entity_idx: usize, entity: &Entity) -> Result<(), CalculatorError> {
        let table_id = self.table_ids[entity_idx];

        for (property_idx, property) in entity.properties.iter().enumerate() {
            let (referenced_entity, nullable) = match &property.kind {
                PropertyKind::ManyToOne {
                    referenced_entity,
                    nullable,
                } => (referenced_entity, *nullable),
                _ => continue,
            };

            let (referenced_idx, referenced) = self
                .model
                .entities()
                .enumerate()
                .find(|(_, e)| &e.name == referenced_entity)
                .ok_or_else(|| CalculatorError::UnknownReferencedEntity {
                    entity: entity.name.clone(),
                    property: property.name.clone(),
                    referenced: referenced_entity.clone(),
                })?;

            let referenced_pk_idx = referenced
                .properties
                .iter()
                .position(|p| matches!(p.kind, PropertyKind::PrimaryKey))
                .ok_or_else(|| CalculatorError::MissingPrimaryKey {
                    entity: referenced.name.clone(),
                })?;

            let constrained_column = self.column_ids[&(entity_idx, property_idx)];
            let referenced_column = self.column_ids[&(referenced_idx, referenced_pk_idx)];

            let on_delete = if nullable {
                ForeignKeyAction::SetNull
            } else {
                ForeignKeyAction::Restrict
            };

            let constraint_name = format!("{}_{}_fkey", entity.table_name, property.column_name());
            let fk_id = self.schema.push_foreign_key(
                Some(constraint_name),
                [table_id, self.table_ids[referenced_idx]],
                [on_delete, ForeignKeyAction::Cascade],
            );
            self.schema
                .push_foreign_key_column(fk_id, [constrained_column, referenced_column]);
        }

        Ok(())
    }
}

/// `{table}_{columns}_idx`, `{table}_{columns}_key` for uniques, the
/// conventional generated constraint names.
fn generated_index_name(table_name: &str, column_names: &[&str], tpe: IndexType) -> String {
    let suffix = match tpe {
        IndexType::Unique => "key",
        _ => "idx",
    };

    format!("{}_{}_{}", table_name, column_names.join("_"), suffix)
}

fn requested_name(
    request: &IndexRequest,
    table_name: &str,
    column_names: &[&str],
    tpe: IndexType,
) -> String {
    match request {
        IndexRequest::Named(name) => name.clone(),
        _ => generated_index_name(table_name, column_names, tpe),
    }
}

fn json_value_expression(column_name: &str, json_path: &[&str], returning: Option<&str>) -> String {
    let returning = returning
        .map(|tpe| format!(" returning {tpe}"))
        .unwrap_or_default();

    format!(
        "json_value(`{}`, '$.{}'{})",
        column_name,
        json_path.join("."),
        returning
    )
}

/// The name of the index created by a raw DDL statement, e.g.
/// ``alter table `book` add index `custom_index_expr`(`title`)``.
fn index_name_from_definition(definition: &str) -> Option<String> {
    static INDEX_NAME_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\bindex\s+`([^`]+)`").unwrap());

    INDEX_NAME_RE
        .captures(definition)
        .map(|captures| captures[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Entity, EntityModel, IndexAnnotation, Property};

    fn author() -> Entity {
        Entity::new("Author")
            .property(Property::primary_key("id"))
            .property(Property::scalar("name", ColumnTypeFamily::String))
    }

    #[test]
    fn foreign_keys_imply_an_index() {
        let mut model = EntityModel::new();
        model.push_entity(author());
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::many_to_one("author", "Author")),
        );

        let schema = calculate_sql_schema(&model).unwrap();
        let book = schema.table_walker("book").unwrap();

        let index_names: Vec<&str> = book.indexes().map(|idx| idx.name()).collect();
        assert_eq!(index_names, &["PRIMARY", "book_author_id_idx"]);

        let fk = book.foreign_keys().next().unwrap();
        assert_eq!(fk.constraint_name(), Some("book_author_id_fkey"));
        assert_eq!(fk.referenced_table().name(), "author");
    }

    #[test]
    fn explicit_index_on_fk_column_absorbs_the_implied_one() {
        let mut model = EntityModel::new();
        model.push_entity(author());
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::many_to_one("author", "Author").indexed_named("author_idx")),
        );

        let schema = calculate_sql_schema(&model).unwrap();
        let book = schema.table_walker("book").unwrap();

        let index_names: Vec<&str> = book.indexes().map(|idx| idx.name()).collect();
        assert_eq!(index_names, &["PRIMARY", "author_idx"]);
    }

    #[test]
    fn json_path_parts_lower_to_json_value_expressions() {
        let mut model = EntityModel::new();
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::scalar("metaData", ColumnTypeFamily::Json))
                .index(IndexAnnotation::on(["metaData.foo.bar"]).returning("char(200)")),
        );

        let schema = calculate_sql_schema(&model).unwrap();
        let book = schema.table_walker("book").unwrap();
        let index = book.indexes().find(|idx| !idx.is_primary_key()).unwrap();

        assert_eq!(index.name(), "book_meta_data_idx");
        assert_eq!(
            index.parts().next().unwrap().expression(),
            Some("json_value(`meta_data`, '$.foo.bar' returning char(200))")
        );
    }

    #[test]
    fn json_paths_on_non_json_properties_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::scalar("title", ColumnTypeFamily::String))
                .index(IndexAnnotation::on(["title.foo"])),
        );

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::JsonPathOnNonJsonProperty { .. }));
    }

    #[test]
    fn raw_index_names_are_parsed_from_the_definition() {
        assert_eq!(
            index_name_from_definition("alter table `book` add index `custom_index_expr`(`title`)").as_deref(),
            Some("custom_index_expr")
        );
        assert_eq!(index_name_from_definition("create table `foo` (id int)"), None);
    }

    #[test]
    fn nullable_relations_lower_to_set_null_foreign_keys() {
        let mut model = EntityModel::new();
        model.push_entity(author());
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::many_to_one("author", "Author").nullable()),
        );

        let schema = calculate_sql_schema(&model).unwrap();
        let book = schema.table_walker("book").unwrap();

        let column = book.column("author_id").unwrap();
        assert!(column.arity().is_nullable());

        let fk = book.foreign_keys().next().unwrap();
        assert_eq!(fk.on_delete_action(), ForeignKeyAction::SetNull);
        assert_eq!(fk.on_update_action(), ForeignKeyAction::Cascade);
    }

    #[test]
    fn unknown_referenced_entities_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::many_to_one("author", "Writer")),
        );

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::UnknownReferencedEntity { .. }));
    }

    #[test]
    fn references_to_entities_without_a_primary_key_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(
            Entity::new("Author").property(Property::scalar("name", ColumnTypeFamily::String)),
        );
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::many_to_one("author", "Author")),
        );

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn unknown_properties_in_annotations_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(author().index(IndexAnnotation::on(["nope"])));

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::UnknownProperty { .. }));
    }

    #[test]
    fn returning_requires_a_json_path_part() {
        let mut model = EntityModel::new();
        model.push_entity(author().index(IndexAnnotation::on(["name"]).returning("char(100)")));

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::ReturningWithoutJsonPath { .. }));
    }

    #[test]
    fn empty_annotations_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(author().index(IndexAnnotation::on(std::iter::empty())));

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::EmptyIndex { .. }));
    }

    #[test]
    fn duplicate_index_names_are_rejected() {
        let mut model = EntityModel::new();
        model.push_entity(
            Entity::new("Book")
                .property(Property::primary_key("id"))
                .property(Property::scalar("title", ColumnTypeFamily::String))
                .property(Property::scalar("isbn", ColumnTypeFamily::String))
                .index(IndexAnnotation::on(["title"]).named("dup"))
                .index(IndexAnnotation::on(["isbn"]).named("dup")),
        );

        let err = calculate_sql_schema(&model).unwrap_err();
        assert!(matches!(err, CalculatorError::DuplicateIndexName { .. }));
    }
}
