//! HTTP handlers over the CRUD gateway. Kinds come from the path, values from path or
//! query strings are coerced to the field's declared type.

use crate::config::{KeyShape, ResolvedEntity};
use crate::error::CatalogError;
use crate::kind::EntityKind;
use crate::record::{Identifier, ResourceRecord};
use crate::response::{listing, single};
use crate::state::AppState;
use crate::store::Store;
use crate::value;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

fn entity<'a, S: Store>(state: &'a AppState<S>, kind: &str) -> Result<&'a ResolvedEntity, CatalogError> {
    let kind: EntityKind = kind.parse()?;
    Ok(state.gateway.catalog().entity(kind)?)
}

fn query_value_for_field(entity: &ResolvedEntity, field: &str, s: &str) -> Value {
    match entity.field(field) {
        Some(f) => value::from_text(f.field_type, s),
        None => Value::String(s.to_string()),
    }
}

fn scalar_id(entity: &ResolvedEntity, id_str: &str) -> Identifier {
    match &entity.key {
        KeyShape::Scalar(field) => Identifier::Scalar(query_value_for_field(entity, field, id_str)),
        KeyShape::Composite(_) => Identifier::Scalar(Value::String(id_str.to_string())),
    }
}

fn composite_id(entity: &ResolvedEntity, params: HashMap<String, String>) -> Identifier {
    let map: BTreeMap<String, Value> = params
        .into_iter()
        .map(|(k, v)| {
            let val = query_value_for_field(entity, &k, &v);
            (k, val)
        })
        .collect();
    Identifier::Composite(map)
}

/// `?field=..&value=..` as a single predicate; both or neither.
fn filter_param(entity: &ResolvedEntity, params: &HashMap<String, String>) -> Result<Option<(String, Value)>, CatalogError> {
    match (params.get("field"), params.get("value")) {
        (Some(field), Some(v)) => Ok(Some((field.clone(), query_value_for_field(entity, field, v)))),
        (None, None) => Ok(None),
        _ => Err(CatalogError::invalid_identifier(
            entity.kind,
            "query parameters field and value must be given together",
        )),
    }
}

fn body_to_record(kind: EntityKind, body: Value) -> Result<ResourceRecord, CatalogError> {
    match body {
        Value::Object(m) => Ok(ResourceRecord {
            kind,
            fields: m.into_iter().collect(),
            parents: Vec::new(),
        }),
        _ => Err(CatalogError::mapping(kind, "body must be a JSON object")),
    }
}

pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let records = match filter_param(entity, &params)? {
        Some((field, v)) => state.gateway.get_many(entity.kind, &field, v).await?,
        None => state.gateway.get_all(entity.kind).await?,
    };
    Ok(listing(entity.kind, records))
}

pub async fn save<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let record = body_to_record(entity.kind, body)?;
    let saved = state.gateway.save(entity.kind, &record).await?;
    Ok(single(saved))
}

pub async fn read<S: Store>(
    State(state): State<AppState<S>>,
    Path((kind, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let record = state.gateway.get_one(entity.kind, &scalar_id(entity, &id_str)).await?;
    Ok(single(record))
}

pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    Path((kind, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    state.gateway.remove(entity.kind, &scalar_id(entity, &id_str)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn exists<S: Store>(
    State(state): State<AppState<S>>,
    Path((kind, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let found = state.gateway.exists(entity.kind, &scalar_id(entity, &id_str)).await?;
    Ok(single(serde_json::json!({ "exists": found })))
}

pub async fn ids<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let ids = match filter_param(entity, &params)? {
        Some((field, v)) => state.gateway.get_ids(entity.kind, &field, v).await?,
        None => state.gateway.get_all_ids(entity.kind).await?,
    };
    Ok(listing(entity.kind, ids))
}

pub async fn read_by_key<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let record = state.gateway.get_one(entity.kind, &composite_id(entity, params)).await?;
    Ok(single(record))
}

pub async fn delete_by_key<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    state.gateway.remove(entity.kind, &composite_id(entity, params)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn exists_by_key<S: Store>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, CatalogError> {
    let entity = entity(&state, &kind)?;
    let found = state.gateway.exists(entity.kind, &composite_id(entity, params)).await?;
    Ok(single(serde_json::json!({ "exists": found })))
}
