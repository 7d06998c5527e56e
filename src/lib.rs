pub mod catalog;
pub mod config;
pub mod db;
pub mod declaration;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod ident;
pub mod maintenance;
pub mod query;
pub mod registry;
pub mod schema;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use catalog::{MemoryCatalog, MetadataStore};
pub use config::EngineConfig;
pub use db::{Connection, PgConnection, RecordingConnection};
pub use descriptor::TableDescriptor;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use query::{FilterParams, TableQuery};
pub use registry::DescriptorRegistry;
