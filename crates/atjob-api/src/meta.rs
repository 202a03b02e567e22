//! Object identity and metadata.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace + name identity of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Namespace the resource lives in.
    pub namespace: String,
    /// Resource name, unique within the namespace.
    pub name: String,
}

impl ResourceKey {
    /// Create a new key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reference to the owning resource of a dependent.
///
/// Deleting the owner cascades to every dependent carrying a matching
/// reference; the store enforces this, not the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Kind of the owner ("AtJob").
    pub kind: String,
    /// Owner name; the owner shares the dependent's namespace.
    pub name: String,
    /// Owner uid, guarding against name reuse.
    pub uid: Uuid,
}

/// Metadata common to all resource kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Resource name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Unique id assigned at creation.
    pub uid: Uuid,
    /// Store-assigned version, bumped on every successful write.
    #[serde(default)]
    pub resource_version: u64,
    /// Free-form labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Owner reference for cascading deletion, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_ref: Option<OwnerRef>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// Create metadata for a new, not-yet-stored object.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: Uuid::new_v4(),
            resource_version: 0,
            labels: BTreeMap::new(),
            owner_ref: None,
            created_at: Utc::now(),
        }
    }

    /// Namespace + name key of this object.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }
}
