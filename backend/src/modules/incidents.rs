//! Incident dispatch as a feature module

use crate::core::context::SimContext;
use crate::dispatch::IncidentEngine;
use crate::host::{Module, ModuleError};
use std::any::Any;

pub const NAME: &str = "incidents";

/// Drives the [`IncidentEngine`] once per frame
#[derive(Debug, Default)]
pub struct IncidentDispatchModule {
    engine: Option<IncidentEngine>,
}

impl IncidentDispatchModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create() -> Result<Box<dyn Module>, ModuleError> {
        Ok(Box::new(Self::new()))
    }

    /// The engine, once initialized
    pub fn engine(&self) -> Option<&IncidentEngine> {
        self.engine.as_ref()
    }
}

impl Module for IncidentDispatchModule {
    fn name(&self) -> &str {
        NAME
    }

    fn initialize(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        let config = ctx.config.dispatch.clone();
        config
            .validate()
            .map_err(|err| ModuleError::Init(err.to_string()))?;
        self.engine = Some(IncidentEngine::new(config));
        Ok(())
    }

    fn update(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| ModuleError::Update("engine not initialized".to_string()))?;
        engine.update(ctx);
        Ok(())
    }

    fn dispose(&mut self, ctx: &mut SimContext) -> Result<(), ModuleError> {
        if let Some(mut engine) = self.engine.take() {
            engine.clear(ctx);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
