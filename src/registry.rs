//! Descriptor registry: process-wide cache of compiled table descriptors.
//!
//! Lookups take the read lock only; compilation happens outside any lock and the
//! result is published under a short write lock. Nothing here watches the catalog:
//! whoever edits a table or its fields must call `invalidate` for that table id,
//! otherwise the old descriptor keeps being served. Each process holds its own cache.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::catalog::{MetadataStore, TableId};
use crate::descriptor::{self, TableDescriptor};
use crate::error::EngineResult;

#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    entries: RwLock<HashMap<TableId, Arc<TableDescriptor>>>,
}

static GLOBAL: OnceCell<Arc<DescriptorRegistry>> = OnceCell::new();

impl DescriptorRegistry {
    pub fn new() -> Self { Self::default() }

    /// The registry shared by every engine in this process.
    pub fn global() -> Arc<DescriptorRegistry> {
        GLOBAL.get_or_init(|| Arc::new(DescriptorRegistry::new())).clone()
    }

    pub fn get_descriptor(&self, store: &dyn MetadataStore, table_id: TableId, use_cache: bool) -> EngineResult<Arc<TableDescriptor>> {
        if use_cache {
            if let Some(d) = self.entries.read().get(&table_id) {
                return Ok(Arc::clone(d));
            }
        }
        let table = store.table(table_id)?;
        let dataset = store.dataset(table.dataset_id)?;
        let fields = store.fields(table_id)?;
        let compiled = Arc::new(descriptor::compile(&dataset, &table, &fields)?);
        debug!(target: "dyntables::registry", "compiled descriptor for table {} ({}), {} columns", table_id, compiled.db_table, compiled.columns.len());
        let mut entries = self.entries.write();
        if use_cache {
            // another caller may have published while we compiled; keep the first one
            if let Some(existing) = entries.get(&table_id) { return Ok(Arc::clone(existing)); }
        }
        entries.insert(table_id, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn cached(&self, table_id: TableId) -> Option<Arc<TableDescriptor>> { self.entries.read().get(&table_id).cloned() }

    /// Evict one table's descriptor. Returns whether an entry was present.
    pub fn invalidate(&self, table_id: TableId) -> bool {
        let removed = self.entries.write().remove(&table_id).is_some();
        if removed { debug!(target: "dyntables::registry", "invalidated descriptor for table {}", table_id); }
        removed
    }

    pub fn clear(&self) { self.entries.write().clear(); }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::error::EngineError;
    use crate::fixtures::*;

    #[test]
    fn caches_until_invalidated() {
        let store = MemoryCatalog::new(issues_catalog());
        let reg = DescriptorRegistry::new();
        let a = reg.get_descriptor(&store, 100, true).unwrap();
        let b = reg.get_descriptor(&store, 100, true).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // metadata edit without invalidation keeps serving the old descriptor
        let mut t = store.table(100).unwrap();
        t.filtering.push("title".to_string());
        store.upsert_table(t);
        assert_eq!(reg.get_descriptor(&store, 100, true).unwrap().config.filtering, vec!["status"]);

        assert!(reg.invalidate(100));
        assert!(!reg.invalidate(100));
        let c = reg.get_descriptor(&store, 100, true).unwrap();
        assert_eq!(c.config.filtering, vec!["status", "title"]);
    }

    #[test]
    fn bypassing_the_cache_recompiles_and_replaces() {
        let store = MemoryCatalog::new(issues_catalog());
        let reg = DescriptorRegistry::new();
        let a = reg.get_descriptor(&store, 100, true).unwrap();
        let b = reg.get_descriptor(&store, 100, false).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &reg.cached(100).unwrap()));
    }

    #[test]
    fn compile_errors_are_not_cached() {
        let store = MemoryCatalog::new(issues_catalog());
        let mut f = store.field(1003).unwrap();
        f.type_tag = "blob".to_string();
        store.upsert_field(f);
        let reg = DescriptorRegistry::new();
        assert!(matches!(reg.get_descriptor(&store, 100, true), Err(EngineError::UnknownFieldType { .. })));
        assert!(reg.is_empty());
        assert!(matches!(reg.get_descriptor(&store, 404, true), Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn concurrent_readers_share_one_entry() {
        let store = Arc::new(MemoryCatalog::new(issues_catalog()));
        let reg = Arc::new(DescriptorRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (store, reg) = (Arc::clone(&store), Arc::clone(&reg));
                std::thread::spawn(move || {
                    for _ in 0..100 { reg.get_descriptor(store.as_ref(), 100, true).unwrap(); }
                })
            })
            .collect();
        for h in handles { h.join().unwrap(); }
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn global_is_shared() {
        assert!(Arc::ptr_eq(&DescriptorRegistry::global(), &DescriptorRegistry::global()));
    }
}
