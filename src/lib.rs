//! App catalog SDK: catalog-driven CRUD gateway over PostgreSQL or an in-memory store,
//! with a query builder, an entity/resource translator and an axum REST surface.

pub mod case;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod kind;
pub mod migration;
pub mod record;
pub mod response;
pub mod routes;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod translator;
pub mod value;

pub use config::{builtin, load_from_path, resolve, CatalogConfig, ResolvedCatalog, ResolvedEntity};
pub use error::{CatalogError, ConfigError};
pub use gateway::{CrudGateway, ScopeState, TransactionScope};
pub use kind::EntityKind;
pub use migration::{apply_catalog_schema, catalog_ddl};
pub use record::{Identifier, ParentRef, RawEntity, ResourceRecord};
pub use routes::{app, catalog_routes, common_routes};
pub use settings::Settings;
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store, Transaction, TxStats};
pub use translator::Translator;
