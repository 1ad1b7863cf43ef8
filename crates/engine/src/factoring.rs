//! Common-field factoring
//!
//! Splits a batch into the attribute-value pairs shared by every element
//! and what is left of each element once those are removed. The split is
//! derived from the elements themselves; how the caller grouped fields on
//! input plays no part.

use annostore_core::{json_eq, Document};

/// Result of factoring a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactoredBatch {
    /// Pairs present with an equal value in every element
    pub common: Document,
    /// Each element minus the keys in `common`, in input order
    pub residuals: Vec<Document>,
}

impl FactoredBatch {
    /// Rebuild the original elements
    pub fn expand(&self) -> Vec<Document> {
        self.residuals
            .iter()
            .map(|residual| {
                let mut element = self.common.clone();
                element.extend(residual.iter().map(|(k, v)| (k.clone(), v.clone())));
                element
            })
            .collect()
    }
}

/// Factor out the maximal set of attribute-value pairs common to all elements
///
/// Starts from the first element's attributes and drops any attribute that
/// a later element lacks or holds with a different value. An empty batch
/// has no common fields.
pub fn factor_common(elements: &[Document]) -> FactoredBatch {
    let Some((first, rest)) = elements.split_first() else {
        return FactoredBatch::default();
    };

    let mut common = first.clone();
    for element in rest {
        common.retain(|key, value| element.get(key).map_or(false, |other| json_eq(value, other)));
        if common.is_empty() {
            break;
        }
    }

    let residuals = elements
        .iter()
        .map(|element| {
            element
                .iter()
                .filter(|(key, _)| !common.contains_key(key.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .collect();

    FactoredBatch { common, residuals }
}
