//! Dataset catalog listing and selection resolution.
//!
//! Resolution happens once, before any export job is submitted: the user's
//! selection is filtered against the datasets the account can see, and every
//! unknown identifier is dropped with a warning.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::export::DatasetId;
use crate::markup;
use crate::session::{EcotaxaSession, SessionError};

/// Project listing page.
const PROJECT_LIST_PATH: &str = "/prj/";

/// Selector value meaning "every accessible dataset".
pub const ALL_DATASETS_SENTINEL: u64 = 0;

/// Lists the datasets the authenticated account may export.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Returns the accessible dataset ids, in listing order.
    async fn list_datasets(&self) -> Result<Vec<DatasetId>, SessionError>;
}

#[async_trait]
impl ResourceCatalog for EcotaxaSession {
    #[instrument(skip(self))]
    async fn list_datasets(&self) -> Result<Vec<DatasetId>, SessionError> {
        let page = self.get_html(PROJECT_LIST_PATH).await?;
        let ids = markup::project_ids(&page);
        debug!(count = ids.len(), "catalog listed");
        Ok(ids)
    }
}

/// The user's dataset selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSelection {
    /// Every dataset in the catalog.
    All,
    /// Specific datasets, in requested order.
    Ids(Vec<DatasetId>),
}

impl DatasetSelection {
    /// Builds a selection from raw command-line ids.
    ///
    /// No ids, or the single sentinel `0`, selects everything.
    #[must_use]
    pub fn from_raw(ids: Option<&[u64]>) -> Self {
        match ids {
            None | Some([]) | Some([ALL_DATASETS_SENTINEL]) => Self::All,
            Some(ids) => Self::Ids(ids.iter().copied().map(DatasetId).collect()),
        }
    }
}

/// Outcome of resolving a selection against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Requested ids present in the catalog, each once, in requested order.
    pub resolved: Vec<DatasetId>,
    /// Requested ids absent from the catalog, each once.
    pub dropped: Vec<DatasetId>,
}

impl Resolution {
    /// True when nothing is left to export.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Resolves `selection` against `catalog` in a single pass.
///
/// The catalog does not change during resolution, so one set difference is
/// enough. Each dropped id is reported with a warning.
#[must_use]
pub fn resolve(selection: &DatasetSelection, catalog: &[DatasetId]) -> Resolution {
    let known: HashSet<DatasetId> = catalog.iter().copied().collect();
    let requested: &[DatasetId] = match selection {
        DatasetSelection::All => catalog,
        DatasetSelection::Ids(ids) => ids,
    };

    let mut seen = HashSet::new();
    let mut resolution = Resolution::default();
    for &id in requested {
        if !seen.insert(id) {
            continue;
        }
        if known.contains(&id) {
            resolution.resolved.push(id);
        } else {
            warn!(dataset = %id, "Project id not found, continuing without it");
            resolution.dropped.push(id);
        }
    }
    resolution
}

/// Lists the catalog and resolves `selection` against it.
///
/// # Errors
///
/// Returns the catalog's [`SessionError`] if the listing cannot be fetched.
pub async fn resolve_selection(
    catalog: &dyn ResourceCatalog,
    selection: &DatasetSelection,
) -> Result<Resolution, SessionError> {
    let listed = catalog.list_datasets().await?;
    Ok(resolve(selection, &listed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<DatasetId> {
        raw.iter().copied().map(DatasetId).collect()
    }

    #[test]
    fn test_unknown_id_dropped_and_known_kept() {
        let catalog = ids(&[5, 7, 12]);
        let selection = DatasetSelection::Ids(ids(&[5, 99]));
        let resolution = resolve(&selection, &catalog);
        assert_eq!(resolution.resolved, ids(&[5]));
        assert_eq!(resolution.dropped, ids(&[99]));
    }

    #[test]
    fn test_sentinel_and_all_select_full_catalog() {
        let catalog = ids(&[5, 7, 12]);
        let from_sentinel = resolve(&DatasetSelection::from_raw(Some(&[0])), &catalog);
        let from_missing = resolve(&DatasetSelection::from_raw(None), &catalog);
        let from_all = resolve(&DatasetSelection::All, &catalog);
        assert_eq!(from_sentinel, from_all);
        assert_eq!(from_missing, from_all);
        assert_eq!(from_all.resolved, catalog);
        assert!(from_all.dropped.is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let catalog = ids(&[1, 2, 3, 4]);
        let selection = DatasetSelection::Ids(ids(&[4, 9, 2]));
        let first = resolve(&selection, &catalog);
        let second = resolve(&selection, &catalog);
        assert_eq!(first, second);
        let again = resolve(&DatasetSelection::Ids(first.resolved.clone()), &catalog);
        assert_eq!(again.resolved, first.resolved);
    }

    #[test]
    fn test_resolved_is_subset_with_each_member_once() {
        let catalog = ids(&[3, 8, 13, 21]);
        let requested = ids(&[21, 3, 3, 40, 21, 8, 40]);
        let resolution = resolve(&DatasetSelection::Ids(requested.clone()), &catalog);

        assert!(resolution.resolved.iter().all(|id| catalog.contains(id)));
        for id in requested.iter().filter(|id| catalog.contains(id)) {
            let count = resolution.resolved.iter().filter(|r| *r == id).count();
            assert_eq!(count, 1, "{id} should appear exactly once");
        }
        assert_eq!(resolution.resolved, ids(&[21, 3, 8]));
        assert_eq!(resolution.dropped, ids(&[40]));
    }

    #[test]
    fn test_all_unknown_resolves_empty() {
        let resolution = resolve(&DatasetSelection::Ids(ids(&[99, 100])), &ids(&[1]));
        assert!(resolution.is_empty());
        assert_eq!(resolution.dropped.len(), 2);
    }

    #[test]
    fn test_zero_among_other_ids_is_not_a_sentinel() {
        let selection = DatasetSelection::from_raw(Some(&[0, 5]));
        assert_eq!(selection, DatasetSelection::Ids(ids(&[0, 5])));
        let resolution = resolve(&selection, &ids(&[5]));
        assert_eq!(resolution.resolved, ids(&[5]));
        assert_eq!(resolution.dropped, ids(&[0]));
    }

    struct FixedCatalog(Vec<DatasetId>);

    #[async_trait]
    impl ResourceCatalog for FixedCatalog {
        async fn list_datasets(&self) -> Result<Vec<DatasetId>, SessionError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_resolve_selection_uses_listed_catalog() {
        let catalog = FixedCatalog(ids(&[5, 7, 12]));
        let resolution = resolve_selection(&catalog, &DatasetSelection::Ids(ids(&[12, 6])))
            .await
            .unwrap();
        assert_eq!(resolution.resolved, ids(&[12]));
        assert_eq!(resolution.dropped, ids(&[6]));
    }
}
