//! Feature modules shipped with the crate

pub mod incidents;
pub mod litter_crew;

pub use incidents::IncidentDispatchModule;
pub use litter_crew::{LitterCrewConfig, LitterCrewModule};

use crate::host::ModuleFactory;

/// Factories for every built-in module, in update order
pub fn builtin_factories() -> Vec<ModuleFactory> {
    vec![
        ModuleFactory::new(incidents::NAME, IncidentDispatchModule::create),
        ModuleFactory::new(litter_crew::NAME, LitterCrewModule::create),
    ]
}
