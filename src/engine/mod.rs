use std::sync::Arc;

use crate::client::XsoarApi;
use crate::instance::IntegrationInstance;

pub mod assembler;
pub mod lifecycle;
pub mod reconciler;
pub mod resolver;
pub mod router;
pub mod secrets;

pub use assembler::{assemble_request, Assembly, AssemblyMode};
pub use lifecycle::{parse_import_id, ImportTarget};
pub use secrets::{separate, MergedConfiguration};

/// What a refresh found on the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Present(IntegrationInstance),
    /// The instance, or the account owning it, is gone. Drop local state.
    Absent,
}

/// Runs the integration-instance lifecycle against one platform.
///
/// Holds no state between calls, so one reconciler can serve operations on
/// distinct instances concurrently.
#[derive(Clone)]
pub struct InstanceReconciler {
    api: Arc<dyn XsoarApi>,
}

impl InstanceReconciler {
    pub fn new(api: Arc<dyn XsoarApi>) -> Self {
        Self { api }
    }
}
