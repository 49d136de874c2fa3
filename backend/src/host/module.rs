//! Module capability and factory registry
//!
//! A feature module is anything implementing [`Module`]. Modules are not
//! discovered at runtime; each one contributes a [`ModuleFactory`] to a
//! [`ModuleRegistry`] built at program start.

use crate::core::context::SimContext;
use crate::models::state::WorldError;
use std::any::Any;
use thiserror::Error;

/// Errors a module may report from its lifecycle calls
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModuleError {
    #[error("construction failed: {0}")]
    Construct(String),

    #[error("initialization failed: {0}")]
    Init(String),

    #[error("update failed: {0}")]
    Update(String),

    #[error("dispose failed: {0}")]
    Dispose(String),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// The contract every feature module fulfils.
///
/// No module may assume an initialization order relative to other modules.
pub trait Module {
    /// Stable name used in logs and events
    fn name(&self) -> &str;

    /// Called once after construction. An error here means the module is
    /// never updated.
    fn initialize(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError>;

    /// Called once per frame, before the scheduler drains
    fn update(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError>;

    /// Called once at shutdown
    fn dispose(&mut self, _ctx: &mut SimContext) -> Result<(), ModuleError> {
        Ok(())
    }

    /// For downcasting in tests and tooling only
    fn as_any(&self) -> &dyn Any;
}

/// Constructor signature for a module
pub type ModuleConstructor = fn() -> Result<Box<dyn Module>, ModuleError>;

/// Named, no-argument module constructor
#[derive(Clone, Copy)]
pub struct ModuleFactory {
    pub name: &'static str,
    pub create: ModuleConstructor,
}

impl ModuleFactory {
    pub const fn new(name: &'static str, create: ModuleConstructor) -> Self {
        Self { name, create }
    }
}

impl std::fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFactory").field("name", &self.name).finish()
    }
}

/// Ordered list of module factories
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    factories: Vec<ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of every module shipped with the crate
    pub fn builtin() -> Self {
        Self {
            factories: crate::modules::builtin_factories(),
        }
    }

    /// Add a factory
    pub fn register(&mut self, factory: ModuleFactory) {
        self.factories.push(factory);
    }

    /// Builder-style `register`
    pub fn with(mut self, factory: ModuleFactory) -> Self {
        self.register(factory);
        self
    }

    pub fn factories(&self) -> &[ModuleFactory] {
        &self.factories
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Module for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn initialize(&mut self, _ctx: &mut SimContext) -> Result<(), ModuleError> {
            Ok(())
        }

        fn update(&mut self, _ctx: &mut SimContext) -> Result<(), ModuleError> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn make_noop() -> Result<Box<dyn Module>, ModuleError> {
        Ok(Box::new(Noop))
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = ModuleRegistry::new()
            .with(ModuleFactory::new("first", make_noop))
            .with(ModuleFactory::new("second", make_noop));

        let names: Vec<_> = registry.factories().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_builtin_registry_is_not_empty() {
        assert!(!ModuleRegistry::builtin().is_empty());
    }
}
