/// Snapshot date and file naming helpers.
pub mod date_helpers;
/// Daily snapshot download, ingestion, and local id cache.
pub mod snapshot;

pub use snapshot::SnapshotIdSource;

use crate::config::Category;
use crate::errors::ExportError;
use crate::types::RecordId;

/// Produces the identifiers a run should try to fetch for one category.
pub trait IdentifierSource {
    /// Every identifier for `category`, in processing order.
    fn load_ids(&self, category: &Category) -> Result<Vec<RecordId>, ExportError>;
}

/// Fixed identifier list, useful for targeted reruns.
#[derive(Clone, Debug, Default)]
pub struct InMemoryIdSource {
    ids: Vec<RecordId>,
}

impl InMemoryIdSource {
    /// Serve the same identifiers for every category.
    pub fn new(ids: Vec<RecordId>) -> Self {
        Self { ids }
    }
}

impl IdentifierSource for InMemoryIdSource {
    fn load_ids(&self, _category: &Category) -> Result<Vec<RecordId>, ExportError> {
        Ok(self.ids.clone())
    }
}
