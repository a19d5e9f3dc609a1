//! Format-facing layer: file handles, structural discovery and the registry
//! that maps paths to adapters.

pub mod io;
pub mod registry;
pub mod schema;

/// Initialize the module layer, seeding the default registry
pub fn initialize() {
    let registry = registry::default_registry().read();
    log::info!("Format registry ready with {} pattern(s)", registry.len());
}
