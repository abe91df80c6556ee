//! Raw catalog config types matching the JSON catalog document.

use serde::{Deserialize, Serialize};

/// Scalar type of a catalog field. Decides value validation, SQL casts and DDL column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Boolean,
    Float,
    Timestamp,
    Json,
}

impl FieldType {
    /// PostgreSQL column type, used in DDL and as the cast on bind placeholders
    /// (so NULLs and text-encoded timestamps bind to the right type).
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Integer => "bigint",
            FieldType::Boolean => "boolean",
            FieldType::Float => "double precision",
            FieldType::Timestamp => "timestamptz",
            FieldType::Json => "jsonb",
        }
    }
}

/// Timestamp fields filled in by the translator rather than the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoStamp {
    /// Set on insert when the record does not carry a value.
    Created,
    /// Set on every update-in-place.
    Updated,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Column name; defaults to the snake_case form of `name`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Kind of the parent record this field points at (by the parent's natural key).
    #[serde(default)]
    pub references: Option<String>,
    #[serde(default)]
    pub auto: Option<AutoStamp>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub kind: String,
    pub table: String,
    /// Natural key field names. One field means a scalar identifier, more means composite.
    pub key: Vec<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Whole catalog document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub entities: Vec<EntityConfig>,
}

pub fn default_schema() -> String {
    "app_catalog".into()
}
