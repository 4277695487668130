//! `FleetGrid` Server — master-election-aware admin facade with patch fan-out.

pub mod admin;
pub mod catalog;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{
    AdminConfig, AdminError, AdminService, CallbackRegistry, PatchJob, PatchOutcome, ServerProxy,
};
pub use catalog::{
    Catalog, DescriptorResolver, DistributionResolver, LocalRegistry, MemoryCatalog, NodeEntry,
    ReplicaEntry, ResolvedServer,
};
pub use transport::{NodeEndpoint, ReplicaEndpoint, RpcError, ServerEndpoint};
