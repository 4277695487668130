//! `FleetGrid` Core — domain records, deployment descriptors, and patch payloads.

pub mod descriptor;
pub mod messages;
pub mod types;

pub use descriptor::{
    ApplicationDescriptor, ApplicationUpdateDescriptor, DistributionDescriptor, NodeDescriptor,
    ServerDescriptor, ServerInstanceDescriptor,
};
pub use messages::{PatchReport, PatchRequest};
pub use types::{
    AdapterInfo, ApplicationInfo, ApplicationUpdateInfo, LoadInfo, NodeInfo, ObjectId, ObjectInfo,
    RegistryInfo, ServerInfo, ServerState,
};
