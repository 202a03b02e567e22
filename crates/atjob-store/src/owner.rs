//! Owner linking for cascading deletion.

use atjob_api::{AtJob, OwnerRef, Workload};

use crate::error::StoreError;

/// Owner kind stamped on dependents of an [`AtJob`].
pub const OWNER_KIND: &str = "AtJob";

/// Establishes that deleting an owner cascades to its dependent.
pub trait OwnerLinker: Send + Sync {
    /// Stamp an owner reference onto the dependent.
    ///
    /// Must be applied before the dependent is created; the store only
    /// honors references present at creation time.
    fn link(&self, owner: &AtJob, dependent: &mut Workload) -> Result<(), StoreError>;
}

/// Linker stamping an [`OwnerRef`] onto the dependent's metadata.
#[derive(Debug, Default)]
pub struct RefLinker;

impl RefLinker {
    /// Create a new linker.
    pub fn new() -> Self {
        Self
    }
}

impl OwnerLinker for RefLinker {
    fn link(&self, owner: &AtJob, dependent: &mut Workload) -> Result<(), StoreError> {
        if owner.meta.namespace != dependent.meta.namespace {
            return Err(StoreError::InvalidOwner(format!(
                "owner {} and dependent {} are in different namespaces",
                owner.key(),
                dependent.key(),
            )));
        }
        if let Some(existing) = &dependent.meta.owner_ref {
            if existing.uid != owner.meta.uid {
                return Err(StoreError::InvalidOwner(format!(
                    "dependent {} is already owned by {}/{}",
                    dependent.key(),
                    existing.kind,
                    existing.name,
                )));
            }
        }
        dependent.meta.owner_ref = Some(OwnerRef {
            kind: OWNER_KIND.to_string(),
            name: owner.meta.name.clone(),
            uid: owner.meta.uid,
        });
        Ok(())
    }
}
