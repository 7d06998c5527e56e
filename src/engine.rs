//! Engine facade: metadata store + descriptor registry + configuration.
//! Operations take table/field ids, resolve the descriptor through the registry,
//! and run against the caller's connection.

use std::sync::Arc;

use crate::catalog::{DatasetId, FieldChoices, FieldId, MetadataStore, TableId};
use crate::config::EngineConfig;
use crate::db::Connection;
use crate::declaration;
use crate::descriptor::TableDescriptor;
use crate::error::{EngineError, EngineResult};
use crate::maintenance;
use crate::query::TableQuery;
use crate::registry::DescriptorRegistry;
use crate::schema;

pub struct Engine {
    store: Arc<dyn MetadataStore>,
    registry: Arc<DescriptorRegistry>,
    config: EngineConfig,
}

impl Engine {
    /// Engine over the process-wide registry.
    pub fn new(store: Arc<dyn MetadataStore>, config: EngineConfig) -> Self {
        Self::with_registry(store, DescriptorRegistry::global(), config)
    }

    pub fn with_registry(store: Arc<dyn MetadataStore>, registry: Arc<DescriptorRegistry>, config: EngineConfig) -> Self {
        Self { store, registry, config }
    }

    pub fn store(&self) -> &dyn MetadataStore { self.store.as_ref() }
    pub fn registry(&self) -> &DescriptorRegistry { &self.registry }
    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn get_descriptor(&self, table_id: TableId, use_cache: bool) -> EngineResult<Arc<TableDescriptor>> {
        self.registry.get_descriptor(self.store.as_ref(), table_id, use_cache)
    }

    pub fn descriptor(&self, table_id: TableId) -> EngineResult<Arc<TableDescriptor>> { self.get_descriptor(table_id, true) }

    /// Must be called after editing a table's or its fields' metadata.
    pub fn invalidate(&self, table_id: TableId) -> bool { self.registry.invalidate(table_id) }

    pub fn create_table(&self, conn: &mut dyn Connection, table_id: TableId, create_indexes: bool) -> EngineResult<()> {
        schema::create_table(conn, &*self.descriptor(table_id)?, create_indexes)
    }

    pub fn create_indexes(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<()> {
        schema::create_indexes(conn, &*self.descriptor(table_id)?)
    }

    pub fn analyse_table(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<()> {
        schema::analyse_table(conn, &*self.descriptor(table_id)?)
    }

    pub fn delete_table(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<()> {
        schema::delete_table(conn, &*self.descriptor(table_id)?)
    }

    /// Whether the table's physical relation exists in the connected database.
    pub fn table_exists(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<bool> {
        let desc = self.descriptor(table_id)?;
        schema::table_exists(conn, &desc).map_err(|e| EngineError::query(&desc.db_table, e))
    }

    /// Base query over the table, ordered by its default ordering.
    pub fn query(&self, table_id: TableId) -> EngineResult<TableQuery> {
        Ok(TableQuery::new(self.descriptor(table_id)?).with_search_config(self.config.search_config.clone()))
    }

    pub fn update_choices(&self, conn: &mut dyn Connection, field_id: FieldId) -> EngineResult<Option<FieldChoices>> {
        let field = self.store.field(field_id)?;
        let desc = self.descriptor(field.table_id)?;
        maintenance::update_choices(conn, self.store.as_ref(), &desc, &field)
    }

    pub fn update_table_choices(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<usize> {
        maintenance::update_table_choices(conn, self.store.as_ref(), &*self.descriptor(table_id)?)
    }

    pub fn update_search_index(&self, conn: &mut dyn Connection, table_id: TableId) -> EngineResult<u64> {
        maintenance::update_search_index(conn, &*self.descriptor(table_id)?, self.config.search_config.as_deref())
    }

    pub fn declaration(&self, table_id: TableId) -> EngineResult<String> {
        Ok(declaration::declaration(&*self.descriptor(table_id)?))
    }

    /// Declaration of the dataset's default table in its current version.
    pub fn dataset_declaration(&self, dataset_id: DatasetId) -> EngineResult<String> {
        let table = self.store.current_default_table(dataset_id)?;
        self.declaration(table.id)
    }
}
