//! Instance state module.
//!
//! This module provides the persisted instance state tree that changesets are
//! computed against, plus storage backends for instances and staged
//! changesets.

mod local;
mod store;
mod types;

pub use local::LocalStateStore;
pub use store::StateStore;
#[cfg(test)]
pub use store::MockStateStore;
pub use types::{
    ExportState, InstanceState, InstanceStatus, LinkState, LinkStatus, PreciseLinkStatus,
    PreciseResourceStatus, ResourceState, ResourceStatus,
};
