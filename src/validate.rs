use crate::error::{Error, Result};
use crate::model::{DocumentType, EntityKind, Property, RemovalSet};
use crate::repo::{DocumentTypeRepository, PropertyRepository};

/// Inputs after every configured name resolved against the repository.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub removal: RemovalSet,
    pub properties: Vec<Property>,
    pub doc_types: Vec<DocumentType>,
}

/// Resolve every property to remove and every target document type.
///
/// All or nothing: the first name that does not resolve fails the whole
/// call with [`Error::NotFound`] and nothing resolved so far is returned.
/// Properties are checked before document types.
pub async fn validate<R>(repo: &R, removal: &RemovalSet, doc_type_names: &[String]) -> Result<Resolved>
where
    R: PropertyRepository + DocumentTypeRepository,
{
    let mut properties = Vec::with_capacity(removal.len());
    for name in removal.names() {
        match repo.find_property(name).await? {
            Some(prop) => {
                tracing::debug!(property = %name, attributes = ?prop.attributes, "property found");
                properties.push(prop);
            }
            None => {
                tracing::error!(property = %name, "property not found");
                return Err(Error::NotFound {
                    kind: EntityKind::Property,
                    name: name.clone(),
                });
            }
        }
    }

    let mut doc_types = Vec::with_capacity(doc_type_names.len());
    for name in doc_type_names {
        match repo.find_doc_type(name).await? {
            Some(dt) => {
                tracing::debug!(doc_type = %name, props = dt.props.len(), "document type found");
                doc_types.push(dt);
            }
            None => {
                tracing::error!(doc_type = %name, "document type not found");
                return Err(Error::NotFound {
                    kind: EntityKind::DocumentType,
                    name: name.clone(),
                });
            }
        }
    }

    Ok(Resolved {
        removal: removal.clone(),
        properties,
        doc_types,
    })
}
