//! Bind values for PostgreSQL placeholders.
//!
//! Every placeholder is rendered with a cast to its column type (`$1::bigint`), so a value only
//! needs a wire type the server can cast from. `jsonb` columns are the exception: any non-null
//! value, scalars included, goes over as JSONB.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Jsonb(Value),
}

impl PgBindValue {
    /// Value for a placeholder cast to `cast`.
    pub fn for_cast(v: &Value, cast: Option<&str>) -> Self {
        match (v, cast) {
            (Value::Null, _) => PgBindValue::Null,
            (_, Some("jsonb")) => PgBindValue::Jsonb(v.clone()),
            (Value::Bool(b), _) => PgBindValue::Bool(*b),
            (Value::Number(n), _) => match n.as_i64() {
                Some(i) => PgBindValue::I64(i),
                None => PgBindValue::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            (Value::String(s), _) => PgBindValue::Text(s.clone()),
            (Value::Array(_) | Value::Object(_), _) => PgBindValue::Jsonb(v.clone()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            PgBindValue::Null | PgBindValue::Text(_) => "TEXT",
            PgBindValue::Bool(_) => "BOOL",
            PgBindValue::I64(_) => "INT8",
            PgBindValue::F64(_) => "FLOAT8",
            PgBindValue::Jsonb(_) => "JSONB",
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Null => Ok(IsNull::Yes),
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
            PgBindValue::Jsonb(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(PgTypeInfo::with_name(self.type_name()))
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
