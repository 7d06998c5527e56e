//! Metadata catalog
//! ----------------
//! Dataset/Version/Table/Field rows as consumed by the engine. The catalog is
//! owned by an external store; the engine reads it through `MetadataStore` and
//! only ever writes back a field's cached choices.

pub mod memory;
pub mod model;

pub use memory::{CatalogData, MemoryCatalog};
pub use model::*;

use crate::error::{EngineError, EngineResult};

pub trait MetadataStore: Send + Sync {
    fn dataset(&self, id: DatasetId) -> EngineResult<Dataset>;
    fn datasets(&self) -> EngineResult<Vec<Dataset>>;
    fn versions(&self, dataset_id: DatasetId) -> EngineResult<Vec<Version>>;
    fn version(&self, id: VersionId) -> EngineResult<Version>;
    fn table(&self, id: TableId) -> EngineResult<Table>;
    /// All tables of a dataset, across versions.
    fn tables(&self, dataset_id: DatasetId) -> EngineResult<Vec<Table>>;
    /// Fields of a table sorted by `order`.
    fn fields(&self, table_id: TableId) -> EngineResult<Vec<Field>>;
    fn field(&self, id: FieldId) -> EngineResult<Field>;
    fn set_field_choices(&self, field_id: FieldId, choices: FieldChoices) -> EngineResult<()>;

    fn dataset_by_slug(&self, slug: &str) -> EngineResult<Dataset> {
        self.datasets()?
            .into_iter()
            .find(|d| d.slug == slug)
            .ok_or_else(|| EngineError::not_found(format!("dataset '{}'", slug)))
    }

    /// The current version: highest `order`.
    fn last_version(&self, dataset_id: DatasetId) -> EngineResult<Option<Version>> {
        Ok(self.versions(dataset_id)?.into_iter().max_by_key(|v| v.order))
    }

    /// Tables of the current version, sorted by name.
    fn current_tables(&self, dataset_id: DatasetId) -> EngineResult<Vec<Table>> {
        let Some(version) = self.last_version(dataset_id)? else { return Ok(Vec::new()) };
        let mut tables: Vec<Table> = self.tables(dataset_id)?.into_iter().filter(|t| t.version_id == version.id).collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    fn table_named(&self, dataset_id: DatasetId, name: &str) -> EngineResult<Table> {
        self.tables(dataset_id)?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| EngineError::not_found(format!("table '{}' of dataset {}", name, dataset_id)))
    }

    fn default_table(&self, dataset_id: DatasetId) -> EngineResult<Table> {
        self.tables(dataset_id)?
            .into_iter()
            .find(|t| t.default)
            .ok_or_else(|| EngineError::not_found(format!("default table of dataset {}", dataset_id)))
    }

    /// Default table of the current version.
    fn current_default_table(&self, dataset_id: DatasetId) -> EngineResult<Table> {
        let version = self
            .last_version(dataset_id)?
            .ok_or_else(|| EngineError::not_found(format!("versions of dataset {}", dataset_id)))?;
        self.tables(dataset_id)?
            .into_iter()
            .find(|t| t.default && t.version_id == version.id)
            .ok_or_else(|| EngineError::not_found(format!("default table of dataset {} version '{}'", dataset_id, version.name)))
    }

    fn choiceable_fields(&self, table_id: TableId) -> EngineResult<Vec<Field>> {
        Ok(self.fields(table_id)?.into_iter().filter(Field::is_choiceable).collect())
    }
}
