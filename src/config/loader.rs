//! Load the catalog from the embedded document or a JSON file, and resolve it.

use crate::case::to_snake_case;
use crate::config::resolved::{KeyShape, ResolvedCatalog, ResolvedEntity, ResolvedField};
use crate::config::{validate, CatalogConfig};
use crate::error::ConfigError;
use crate::kind::EntityKind;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../catalog/app_catalog.json");

/// Build the resolved catalog from raw config (validates first).
pub fn resolve(config: &CatalogConfig) -> Result<ResolvedCatalog, ConfigError> {
    validate(config)?;

    let mut entities = HashMap::new();
    for e in &config.entities {
        let kind: EntityKind = e.kind.parse()?;
        let mut fields = Vec::with_capacity(e.fields.len());
        for f in &e.fields {
            let references = match &f.references {
                Some(parent) => Some(parent.parse::<EntityKind>()?),
                None => None,
            };
            fields.push(ResolvedField {
                name: f.name.clone(),
                column: f.column.clone().unwrap_or_else(|| to_snake_case(&f.name)),
                field_type: f.type_,
                nullable: f.nullable,
                references,
                auto: f.auto,
            });
        }
        let field_index = fields.iter().enumerate().map(|(i, f)| (f.name.clone(), i)).collect();
        let column_index = fields.iter().enumerate().map(|(i, f)| (f.column.clone(), i)).collect();
        let key = if e.key.len() == 1 {
            KeyShape::Scalar(e.key[0].clone())
        } else {
            KeyShape::Composite(e.key.clone())
        };
        entities.insert(
            kind,
            ResolvedEntity {
                kind,
                schema_name: config.schema.clone(),
                table_name: e.table.clone(),
                key,
                fields,
                field_index,
                column_index,
            },
        );
    }

    Ok(ResolvedCatalog {
        schema_name: config.schema.clone(),
        entities,
    })
}

pub fn load_from_str(json: &str) -> Result<CatalogConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<CatalogConfig, ConfigError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&json)
}

/// The application catalog shipped with the crate.
pub fn builtin_config() -> Result<CatalogConfig, ConfigError> {
    load_from_str(BUILTIN_CATALOG)
}

pub fn builtin() -> Result<ResolvedCatalog, ConfigError> {
    resolve(&builtin_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutoStamp, FieldType};

    #[test]
    fn builtin_covers_every_kind() {
        let catalog = builtin().expect("builtin catalog resolves");
        for kind in EntityKind::ALL {
            assert!(catalog.entity(*kind).is_ok(), "missing {}", kind);
        }
    }

    #[test]
    fn compute_resource_definition() {
        let catalog = builtin().unwrap();
        let e = catalog.entity(EntityKind::ComputeResource).unwrap();
        assert_eq!(e.table_name, "compute_resource");
        assert_eq!(e.key, KeyShape::Scalar("resourceID".into()));
        assert_eq!(e.field("resourceID").unwrap().column, "resource_id");
        assert_eq!(e.field("description").unwrap().column, "resource_description");
        assert_eq!(e.field("hostName").unwrap().column, "host_name");
        assert_eq!(e.field("creationTime").unwrap().auto, Some(AutoStamp::Created));
        assert_eq!(e.field("enabled").unwrap().field_type, FieldType::Boolean);
    }

    #[test]
    fn link_tables_have_composite_keys() {
        let catalog = builtin().unwrap();
        for kind in [
            EntityKind::DataMovementInterface,
            EntityKind::PreJobCommand,
            EntityKind::PostJobCommand,
            EntityKind::GsisshExport,
            EntityKind::ComputeResourcePreference,
        ] {
            assert!(catalog.entity(kind).unwrap().key.is_composite(), "{} should be composite", kind);
        }
    }

    #[test]
    fn ssh_submission_references_compute_resource() {
        let catalog = builtin().unwrap();
        let e = catalog.entity(EntityKind::SshSubmission).unwrap();
        assert_eq!(
            e.field("resourceID").unwrap().references,
            Some(EntityKind::ComputeResource)
        );
    }

    #[test]
    fn parents_are_ordered_first() {
        let catalog = builtin().unwrap();
        let order = catalog.kinds_parents_first();
        assert_eq!(order.len(), catalog.entities.len());
        let pos = |k: EntityKind| order.iter().position(|x| *x == k).unwrap();
        assert!(pos(EntityKind::ComputeResource) < pos(EntityKind::SshSubmission));
        assert!(pos(EntityKind::ApplicationModule) < pos(EntityKind::ApplicationDeployment));
        assert!(pos(EntityKind::ApplicationDeployment) < pos(EntityKind::PreJobCommand));
    }

    #[test]
    fn schema_override() {
        let catalog = builtin().unwrap().with_schema("tenant_a");
        assert_eq!(catalog.entity(EntityKind::Workflow).unwrap().schema_name, "tenant_a");
    }

    #[test]
    fn load_from_str_reports_parse_errors() {
        let err = load_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[tokio::test]
    async fn load_from_missing_path_fails() {
        let err = load_from_path("/nonexistent/catalog.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(ref m) if m.contains("/nonexistent/catalog.json")));
    }
}
