//! Document store over a flat key-value backend.
//!
//! Each document lives under `"{collection}:{id}"` as JSON; every collection
//! keeps its ids in insertion order under `"{collection}_list"`.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Minimal byte-oriented backend a [`Store`] is built on.
pub trait KeyValue {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local backend used by the native server and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

pub fn document_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

fn index_key(collection: &str) -> String {
    format!("{}_list", collection)
}

pub struct Store<K> {
    kv: K,
    index_lock: Mutex<()>,
    write_lock: Mutex<()>,
}

impl<K: KeyValue> Store<K> {
    pub fn new(kv: K) -> Self {
        Store {
            kv,
            index_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.kv.set(key, &serde_json::to_vec(value)?)
    }

    fn ids(&self, collection: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.get_json(&index_key(collection))?.unwrap_or_default())
    }

    pub fn find_by_id<D: Document>(&self, id: &str) -> anyhow::Result<Option<D>> {
        self.get_json(&document_key(D::COLLECTION, id))
    }

    /// Every document of the collection matching `filter`, in insertion order.
    pub fn find<D, F>(&self, filter: F) -> anyhow::Result<Vec<D>>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        let mut found = Vec::new();
        for id in self.ids(D::COLLECTION)? {
            if let Some(doc) = self.find_by_id::<D>(&id)? {
                if filter(&doc) {
                    found.push(doc);
                }
            }
        }
        Ok(found)
    }

    pub fn find_one<D, F>(&self, filter: F) -> anyhow::Result<Option<D>>
    where
        D: Document,
        F: Fn(&D) -> bool,
    {
        for id in self.ids(D::COLLECTION)? {
            if let Some(doc) = self.find_by_id::<D>(&id)? {
                if filter(&doc) {
                    return Ok(Some(doc));
                }
            }
        }
        Ok(None)
    }

    /// Runs `f` with the write lock held, so check-then-write sequences on
    /// shared documents cannot interleave with each other. Not reentrant:
    /// `f` must not call `locked` or `update`.
    pub fn locked<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<anyhow::Error>,
    {
        // Guards no data; a panicked holder leaves nothing half-written here.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Load, mutate and save one document under the write lock. `Ok(None)`
    /// when it does not exist; nothing is written when `f` fails.
    pub fn update<D, E, F>(&self, id: &str, f: F) -> Result<Option<D>, E>
    where
        D: Document,
        F: FnOnce(&mut D) -> Result<(), E>,
        E: From<anyhow::Error>,
    {
        self.locked(|| {
            let Some(mut doc) = self.find_by_id::<D>(id)? else {
                return Ok(None);
            };
            f(&mut doc)?;
            self.save(&doc)?;
            Ok(Some(doc))
        })
    }

    /// Inserts or replaces the document.
    pub fn save<D: Document>(&self, doc: &D) -> anyhow::Result<()> {
        let key = document_key(D::COLLECTION, doc.id());
        let is_new = self.kv.get(&key)?.is_none();
        self.set_json(&key, doc)?;

        if is_new {
            let _guard = self
                .index_lock
                .lock()
                .map_err(|_| anyhow::anyhow!("index lock poisoned"))?;
            let mut ids = self.ids(D::COLLECTION)?;
            if !ids.iter().any(|id| id == doc.id()) {
                ids.push(doc.id().to_string());
                self.set_json(&index_key(D::COLLECTION), &ids)?;
            }
        }
        Ok(())
    }

    /// Returns whether a document was removed.
    pub fn delete_by_id<D: Document>(&self, id: &str) -> anyhow::Result<bool> {
        let key = document_key(D::COLLECTION, id);
        if self.kv.get(&key)?.is_none() {
            return Ok(false);
        }
        self.kv.delete(&key)?;

        let _guard = self
            .index_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("index lock poisoned"))?;
        let mut ids = self.ids(D::COLLECTION)?;
        ids.retain(|existing| existing != id);
        self.set_json(&index_key(D::COLLECTION), &ids)?;
        Ok(true)
    }
}
