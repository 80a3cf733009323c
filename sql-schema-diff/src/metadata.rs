//! Entity metadata: the ORM-level description of entities, properties and
//! index annotations that gets lowered to a [`SqlSchema`](sql_schema_model::SqlSchema)
//! by the schema calculator.

use sql_schema_model::ColumnTypeFamily;

/// The set of entities the schema is calculated from.
#[derive(Debug, Default)]
pub struct EntityModel {
    pub(crate) entities: Vec<Entity>,
}

impl EntityModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn entities(&self) -> impl ExactSizeIterator<Item = &Entity> {
        self.entities.iter()
    }
}

/// An entity declaration.
#[derive(Debug)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) table_name: String,
    pub(crate) properties: Vec<Property>,
    pub(crate) indexes: Vec<IndexAnnotation>,
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Entity {
            name: name.to_owned(),
            table_name: snake_case(name),
            properties: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Override the default (snake cased) table name.
    pub fn with_table_name(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_owned();
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Add an entity-level index annotation.
    pub fn index(mut self, annotation: IndexAnnotation) -> Self {
        self.indexes.push(annotation);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// A single property of an entity.
#[derive(Debug)]
pub struct Property {
    pub(crate) name: String,
    pub(crate) kind: PropertyKind,
    pub(crate) index: IndexRequest,
    pub(crate) unique: IndexRequest,
}

impl Property {
    /// An auto-incrementing integer primary key.
    pub fn primary_key(name: &str) -> Self {
        Property::new(name, PropertyKind::PrimaryKey)
    }

    pub fn scalar(name: &str, family: ColumnTypeFamily) -> Self {
        Property::new(name, PropertyKind::Scalar(family))
    }

    /// A many-to-one relation. Lowers to a foreign key column named
    /// `{property}_id`.
    pub fn many_to_one(name: &str, referenced_entity: &str) -> Self {
        Property::new(
            name,
            PropertyKind::ManyToOne {
                referenced_entity: referenced_entity.to_owned(),
                nullable: false,
            },
        )
    }

    fn new(name: &str, kind: PropertyKind) -> Self {
        Property {
            name: name.to_owned(),
            kind,
            index: IndexRequest::None,
            unique: IndexRequest::None,
        }
    }

    /// Mark a many-to-one relation as nullable: the FK column becomes
    /// nullable and the foreign key gets ON DELETE SET NULL. Has no effect
    /// on other property kinds.
    pub fn nullable(mut self) -> Self {
        if let PropertyKind::ManyToOne { nullable, .. } = &mut self.kind {
            *nullable = true;
        }
        self
    }

    /// Request an index on the property, with a generated name.
    pub fn indexed(mut self) -> Self {
        self.index = IndexRequest::Auto;
        self
    }

    /// Request an index on the property, with an explicit name.
    pub fn indexed_named(mut self, name: &str) -> Self {
        self.index = IndexRequest::Named(name.to_owned());
        self
    }

    /// Request a unique constraint on the property, with a generated name.
    pub fn unique(mut self) -> Self {
        self.unique = IndexRequest::Auto;
        self
    }

    /// Request a unique constraint on the property, with an explicit name.
    pub fn unique_named(mut self, name: &str) -> Self {
        self.unique = IndexRequest::Named(name.to_owned());
        self
    }

    /// The column the property lowers to.
    pub fn column_name(&self) -> String {
        match self.kind {
            PropertyKind::ManyToOne { .. } => format!("{}_id", snake_case(&self.name)),
            _ => snake_case(&self.name),
        }
    }
}

#[derive(Debug)]
pub enum PropertyKind {
    PrimaryKey,
    Scalar(ColumnTypeFamily),
    ManyToOne {
        referenced_entity: String,
        nullable: bool,
    },
}

/// Whether and how an index was requested on a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRequest {
    None,
    Auto,
    Named(String),
}

impl IndexRequest {
    pub(crate) fn is_requested(&self) -> bool {
        !matches!(self, IndexRequest::None)
    }
}

/// An entity-level index annotation.
///
/// Parts are property paths: either a plain property name (`"author1"`) or a
/// dotted path into a JSON property (`"metaData.foo.bar.baz"`).
#[derive(Debug)]
pub struct IndexAnnotation {
    pub(crate) name: Option<String>,
    pub(crate) unique: bool,
    pub(crate) parts: Vec<String>,
    pub(crate) returning: Option<String>,
    pub(crate) expression: Option<String>,
}

impl IndexAnnotation {
    pub fn on<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        IndexAnnotation {
            name: None,
            unique: false,
            parts: parts.into_iter().map(ToOwned::to_owned).collect(),
            returning: None,
            expression: None,
        }
    }

    pub fn unique_on<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut annotation = Self::on(parts);
        annotation.unique = true;
        annotation
    }

    /// An index declared through a raw DDL statement, anchored at a property
    /// for naming purposes.
    pub fn raw(anchor_property: &str, expression: &str) -> Self {
        let mut annotation = Self::on([anchor_property]);
        annotation.expression = Some(expression.to_owned());
        annotation
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// The `RETURNING` type for JSON path parts (MySQL `json_value`).
    pub fn returning(mut self, tpe: &str) -> Self {
        self.returning = Some(tpe.to_owned());
        self
    }
}

/// `camelCase` and `PascalCase` to `snake_case`, the way the ORM derives
/// table and column names.
pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
