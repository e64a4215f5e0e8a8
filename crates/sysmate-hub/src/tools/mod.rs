//! Tool catalog — wires the probe and report store into a registry.

pub mod report;
pub mod system;

use std::sync::Arc;

use sysmate_core::tool::ToolRegistry;

use crate::probe::SystemProbe;
use crate::report::ReportStore;

pub use report::StoreInFileTool;
pub use system::{ProbeKind, ProbeTool};

/// Build the full tool registry: six read-only probe tools plus the
/// report writer, in the order the model's instructions list them.
pub fn build_registry(probe: Arc<dyn SystemProbe>, store: Arc<dyn ReportStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for kind in ProbeKind::ALL {
        registry.register(ProbeTool::new(kind, probe.clone()));
    }
    registry.register(StoreInFileTool::new(store));
    registry
}
