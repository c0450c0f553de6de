use std::collections::HashMap;

use tracing::debug;

use crate::{
    storage::{
        bplus_tree::BTreeIndex,
        page_store::PageStore,
        schema::{ColumnSchema, TableSchema},
    },
    types::{
        PageId, RowId,
        error::{DatabaseError, Result},
    },
};

struct CatalogEntry {
    key: RowId,
    schema: TableSchema,
}

/// Table name to schema mapping, persisted as bincode-encoded entries in
/// the reserved B-tree rooted at the header's catalog root page.
pub struct Catalog {
    root_page_id: PageId,
    tables: HashMap<String, CatalogEntry>,
}

fn encode_schema(schema: &TableSchema) -> Result<Vec<u8>> {
    bincode::encode_to_vec(schema, bincode::config::standard())
        .map_err(|e| DatabaseError::corruption(format!("cannot encode catalog entry: {}", e)))
}

fn decode_schema(key: RowId, bytes: &[u8]) -> Result<TableSchema> {
    let (schema, _) = bincode::decode_from_slice(bytes, bincode::config::standard()).map_err(
        |e| DatabaseError::corruption(format!("catalog entry {} is unreadable: {}", key, e)),
    )?;
    Ok(schema)
}

impl Catalog {
    pub fn load(store: &mut PageStore) -> Result<Self> {
        let root_page_id = store.catalog_root();
        let index = BTreeIndex::open(store, root_page_id);

        let mut tables = HashMap::new();
        for entry in index.scan_all() {
            let (key, bytes) = entry?;
            let schema = decode_schema(key, &bytes)?;
            tables.insert(
                schema.table_name.to_lowercase(),
                CatalogEntry { key, schema },
            );
        }

        debug!(tables = tables.len(), "loaded catalog");
        Ok(Self {
            root_page_id,
            tables,
        })
    }

    /// Register a table and allocate its (empty) B-tree.
    pub fn create_table(
        &mut self,
        store: &mut PageStore,
        name: &str,
        columns: Vec<ColumnSchema>,
    ) -> Result<PageId> {
        let cache_key = name.to_lowercase();
        if self.tables.contains_key(&cache_key) {
            return Err(DatabaseError::DuplicateTable {
                name: name.to_string(),
            });
        }

        let root_page_id = BTreeIndex::create(store)?;
        let schema = TableSchema::new(name, columns, root_page_id);
        let bytes = encode_schema(&schema)?;

        let mut index = BTreeIndex::open(store, self.root_page_id);
        let key = index.last_key()?.map_or(1, |last| last + 1);
        index.insert(key, bytes)?;

        debug!(table = name, root_page_id, "created table");
        self.tables.insert(cache_key, CatalogEntry { key, schema });
        Ok(root_page_id)
    }

    pub fn lookup_table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(&name.to_lowercase())
            .map(|entry| &entry.schema)
            .ok_or_else(|| DatabaseError::UnknownTable {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Remove the table's entry and free every page of its B-tree.
    pub fn drop_table(&mut self, store: &mut PageStore, name: &str) -> Result<()> {
        let cache_key = name.to_lowercase();
        let Some(entry) = self.tables.get(&cache_key) else {
            return Err(DatabaseError::UnknownTable {
                name: name.to_string(),
            });
        };
        let key = entry.key;
        let table_root = entry.schema.root_page_id;

        BTreeIndex::open(store, self.root_page_id).delete(key)?;
        let freed = BTreeIndex::open(store, table_root).destroy()?;

        debug!(table = name, pages = freed, "dropped table");
        self.tables.remove(&cache_key);
        Ok(())
    }

    /// Table names in their declared spelling, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .values()
            .map(|entry| entry.schema.table_name.clone())
            .collect();
        names.sort();
        names
    }
}
