//! In-process metadata store backed by a JSON snapshot of the catalog.

use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::*;
use super::MetadataStore;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    data: RwLock<CatalogData>,
}

impl MemoryCatalog {
    pub fn new(data: CatalogData) -> Self { Self { data: RwLock::new(data) } }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        let data: CatalogData = serde_json::from_str(text).map_err(|e| EngineError::Config(format!("invalid catalog json: {}", e)))?;
        Ok(Self::new(data))
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read catalog '{}': {}", path.display(), e)))?;
        debug!("loaded catalog snapshot from '{}' ({} bytes)", path.display(), text.len());
        Self::from_json_str(&text)
    }

    pub fn write_json_file(&self, path: &Path) -> EngineResult<()> {
        let text = serde_json::to_string_pretty(&*self.data.read()).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| EngineError::Config(format!("cannot write catalog '{}': {}", path.display(), e)))
    }

    pub fn snapshot(&self) -> CatalogData { self.data.read().clone() }

    /// Replace a table row, as an administrative metadata edit would.
    pub fn upsert_table(&self, table: Table) {
        let mut data = self.data.write();
        match data.tables.iter_mut().find(|t| t.id == table.id) {
            Some(existing) => *existing = table,
            None => data.tables.push(table),
        }
    }

    pub fn upsert_field(&self, field: Field) {
        let mut data = self.data.write();
        match data.fields.iter_mut().find(|f| f.id == field.id) {
            Some(existing) => *existing = field,
            None => data.fields.push(field),
        }
    }
}

impl MetadataStore for MemoryCatalog {
    fn dataset(&self, id: DatasetId) -> EngineResult<Dataset> {
        self.data.read().datasets.iter().find(|d| d.id == id).cloned().ok_or_else(|| EngineError::not_found(format!("dataset {}", id)))
    }

    fn datasets(&self) -> EngineResult<Vec<Dataset>> { Ok(self.data.read().datasets.clone()) }

    fn versions(&self, dataset_id: DatasetId) -> EngineResult<Vec<Version>> {
        Ok(self.data.read().versions.iter().filter(|v| v.dataset_id == dataset_id).cloned().collect())
    }

    fn version(&self, id: VersionId) -> EngineResult<Version> {
        self.data.read().versions.iter().find(|v| v.id == id).cloned().ok_or_else(|| EngineError::not_found(format!("version {}", id)))
    }

    fn table(&self, id: TableId) -> EngineResult<Table> {
        self.data.read().tables.iter().find(|t| t.id == id).cloned().ok_or_else(|| EngineError::not_found(format!("table {}", id)))
    }

    fn tables(&self, dataset_id: DatasetId) -> EngineResult<Vec<Table>> {
        Ok(self.data.read().tables.iter().filter(|t| t.dataset_id == dataset_id).cloned().collect())
    }

    fn fields(&self, table_id: TableId) -> EngineResult<Vec<Field>> {
        let mut fields: Vec<Field> = self.data.read().fields.iter().filter(|f| f.table_id == table_id).cloned().collect();
        fields.sort_by_key(|f| (f.order, f.id));
        Ok(fields)
    }

    fn field(&self, id: FieldId) -> EngineResult<Field> {
        self.data.read().fields.iter().find(|f| f.id == id).cloned().ok_or_else(|| EngineError::not_found(format!("field {}", id)))
    }

    fn set_field_choices(&self, field_id: FieldId, choices: FieldChoices) -> EngineResult<()> {
        let mut data = self.data.write();
        let field = data.fields.iter_mut().find(|f| f.id == field_id).ok_or_else(|| EngineError::not_found(format!("field {}", field_id)))?;
        field.choices = Some(choices);
        Ok(())
    }
}
