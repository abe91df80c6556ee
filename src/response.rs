//! Response envelopes: `{"data": ..}` for single results and
//! `{"data": [..], "meta": {"kind": .., "count": ..}}` for lists.

use crate::kind::EntityKind;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Single<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct Listing<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Serialize)]
pub struct ListMeta {
    pub kind: EntityKind,
    pub count: usize,
}

pub fn single<T: Serialize>(data: T) -> (StatusCode, Json<Single<T>>) {
    (StatusCode::OK, Json(Single { data }))
}

pub fn listing<T: Serialize>(kind: EntityKind, data: Vec<T>) -> (StatusCode, Json<Listing<T>>) {
    let meta = ListMeta { kind, count: data.len() };
    (StatusCode::OK, Json(Listing { data, meta }))
}
