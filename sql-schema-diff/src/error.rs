/// Errors produced while lowering entity metadata to a SQL schema.
#[derive(Debug, thiserror::Error)]
pub enum CalculatorError {
    #[error("property `{property}` on `{entity}` references unknown entity `{referenced}`")]
    UnknownReferencedEntity {
        entity: String,
        property: String,
        referenced: String,
    },

    #[error("referenced entity `{entity}` has no primary key")]
    MissingPrimaryKey { entity: String },

    #[error("index on `{entity}` references unknown property `{property}`")]
    UnknownProperty { entity: String, property: String },

    #[error("JSON path on non-JSON property `{property}` in index on `{entity}`")]
    JsonPathOnNonJsonProperty { entity: String, property: String },

    #[error("RETURNING type on an index of `{entity}` that has no JSON path part")]
    ReturningWithoutJsonPath { entity: String },

    #[error("index annotation on `{entity}` has no parts")]
    EmptyIndex { entity: String },

    #[error("duplicate index name `{name}` on table `{table}`")]
    DuplicateIndexName { table: String, name: String },
}
