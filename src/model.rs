//! Records fetched from the document repository.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A custom property definition. Everything besides the name is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Property {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sig_verify_interval: i32,
    #[serde(default)]
    pub workflow_template_id: Option<String>,
    #[serde(default)]
    pub props: Vec<Property>,
}

fn default_active() -> bool {
    true
}

impl DocumentType {
    pub fn new(name: impl Into<String>, props: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_active: true,
            sig_verify_interval: 0,
            workflow_template_id: None,
            props,
        }
    }

    /// Same document type with its property collection replaced.
    pub fn with_props(&self, props: Vec<Property>) -> Self {
        Self {
            props,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Property,
    DocumentType,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Property => f.write_str("Property"),
            EntityKind::DocumentType => f.write_str("Document Type"),
        }
    }
}

/// Property names to strip. Keeps the configured order for reporting and a
/// hash index for membership.
#[derive(Debug, Clone, Default)]
pub struct RemovalSet {
    names: Vec<String>,
    index: HashSet<String>,
}

impl RemovalSet {
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RemovalSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RemovalSet::default();
        for name in iter {
            let name = name.into();
            if set.index.insert(name.clone()) {
                set.names.push(name);
            }
        }
        set
    }
}
