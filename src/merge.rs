use crate::model::{DocumentType, Property, RemovalSet};

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Nothing on the document type is marked for removal.
    Unchanged,
    /// Surviving properties, in their original order.
    Changed(Vec<Property>),
}

/// Compute which properties of `doc_type` survive removal of `removal`.
pub fn merge(doc_type: &DocumentType, removal: &RemovalSet) -> MergeOutcome {
    if doc_type.props.is_empty() {
        tracing::debug!(doc_type = %doc_type.name, "no existing properties on the document type");
        return MergeOutcome::Unchanged;
    }

    let mut kept = Vec::with_capacity(doc_type.props.len());
    for prop in &doc_type.props {
        if removal.contains(&prop.name) {
            tracing::debug!(doc_type = %doc_type.name, property = %prop.name, "property will be removed");
        } else {
            tracing::debug!(doc_type = %doc_type.name, property = %prop.name, "property remains attached");
            kept.push(prop.clone());
        }
    }

    if kept.len() == doc_type.props.len() {
        return MergeOutcome::Unchanged;
    }
    tracing::debug!(
        doc_type = %doc_type.name,
        kept = ?kept.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "merged properties"
    );
    MergeOutcome::Changed(kept)
}
