use crate::error::{Error, Result};
use crate::model::{DocumentType, Property};
use crate::repo::{DocumentTypeRepository, PropertyRepository};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// On-disk shape of a repository snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub doc_types: Vec<DocumentType>,
}

/// Records keyed by name, kept in insertion order.
#[derive(Debug)]
struct Table<T> {
    rows: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    /// Replaces a row in place, or appends a new one.
    fn upsert(&mut self, name: String, row: T) {
        match self.index.get(&name) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(name, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.rows[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.index.get(name).map(|&i| &mut self.rows[i])
    }
}

/// Repository held entirely in memory, optionally backed by a JSON snapshot.
#[derive(Default)]
pub struct MemoryRepository {
    properties: Mutex<Table<Property>>,
    doc_types: Mutex<Table<DocumentType>>,
    updates: Mutex<Vec<String>>,
    failing_updates: Mutex<HashSet<String>>,
    failing_lookups: Mutex<HashSet<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let repo = Self::new();
        for p in snapshot.properties {
            repo.insert_property(p);
        }
        for dt in snapshot.doc_types {
            repo.insert_doc_type(dt);
        }
        repo
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Msg(format!("Failed to read {}: {}", path.display(), e)))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .map_err(|e| Error::Msg(format!("Failed to parse {}: {}", path.display(), e)))?;
        tracing::debug!(
            path = %path.display(),
            properties = snapshot.properties.len(),
            doc_types = snapshot.doc_types.len(),
            "loaded snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            properties: lock(&self.properties).rows.clone(),
            doc_types: lock(&self.doc_types).rows.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|e| Error::Msg(e.to_string()))?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "snapshot written");
        Ok(())
    }

    pub fn insert_property(&self, prop: Property) {
        lock(&self.properties).upsert(prop.name.clone(), prop);
    }

    pub fn insert_doc_type(&self, doc_type: DocumentType) {
        lock(&self.doc_types).upsert(doc_type.name.clone(), doc_type);
    }

    /// Make every later update of `name` fail.
    pub fn fail_updates_for(&self, name: impl Into<String>) {
        lock(&self.failing_updates).insert(name.into());
    }

    /// Make every later lookup of a property or document type called `name`
    /// fail as if the repository were unreachable.
    pub fn fail_lookups_for(&self, name: impl Into<String>) {
        lock(&self.failing_lookups).insert(name.into());
    }

    fn check_lookup(&self, name: &str) -> Result<()> {
        if lock(&self.failing_lookups).contains(name) {
            return Err(Error::Msg(format!("repository unavailable while looking up [{name}]")));
        }
        Ok(())
    }

    /// Names of document types updated so far, in call order.
    pub fn updates(&self) -> Vec<String> {
        lock(&self.updates).clone()
    }

    pub fn doc_type(&self, name: &str) -> Option<DocumentType> {
        lock(&self.doc_types).get(name).cloned()
    }
}

impl PropertyRepository for MemoryRepository {
    async fn find_property(&self, name: &str) -> Result<Option<Property>> {
        self.check_lookup(name)?;
        Ok(lock(&self.properties).get(name).cloned())
    }
}

impl DocumentTypeRepository for MemoryRepository {
    async fn find_doc_type(&self, name: &str) -> Result<Option<DocumentType>> {
        self.check_lookup(name)?;
        Ok(self.doc_type(name))
    }

    async fn update_doc_type(&self, doc_type: &DocumentType) -> Result<()> {
        if lock(&self.failing_updates).contains(&doc_type.name) {
            return Err(Error::Persistence {
                name: doc_type.name.clone(),
                detail: "update rejected by repository".to_string(),
            });
        }
        let mut doc_types = lock(&self.doc_types);
        match doc_types.get_mut(&doc_type.name) {
            Some(existing) => *existing = doc_type.clone(),
            None => {
                return Err(Error::Persistence {
                    name: doc_type.name.clone(),
                    detail: "no such document type".to_string(),
                });
            }
        }
        lock(&self.updates).push(doc_type.name.clone());
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
