//! Facade configuration.

use fleetgrid_core::ApplicationDescriptor;

/// Configuration for one `AdminService` instance.
///
/// One facade exists per administrative session; `session_user` stamps the
/// audit fields of catalog mutations performed through it.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// Session user recorded in application create/update audit fields.
    pub session_user: String,
    /// Template served by `default_application_descriptor`, typically
    /// loaded from the registry's deployment defaults. `None` when the
    /// registry has no defaults configured.
    pub default_descriptor: Option<ApplicationDescriptor>,
}
