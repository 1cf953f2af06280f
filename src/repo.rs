//! Lookup and persistence contracts the driver needs from a document
//! repository. `Ok(None)` is "not found"; `Err` is a repository failure.

use crate::error::Result;
use crate::model::{DocumentType, Property};

#[allow(async_fn_in_trait)]
pub trait PropertyRepository {
    async fn find_property(&self, name: &str) -> Result<Option<Property>>;
}

#[allow(async_fn_in_trait)]
pub trait DocumentTypeRepository {
    async fn find_doc_type(&self, name: &str) -> Result<Option<DocumentType>>;

    /// Persist every field of `doc_type`, replacing its whole property collection.
    async fn update_doc_type(&self, doc_type: &DocumentType) -> Result<()>;
}
