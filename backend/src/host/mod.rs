//! Module lifecycle host
//!
//! Constructs every registered module, initializes it, updates it once per
//! frame and disposes it at shutdown. Each lifecycle call is isolated: an
//! `Err` return or a panic from one module is logged and recorded, and never
//! suppresses another module's turn.
//!
//! ```text
//! discover:    for each factory: construct -> initialize -> subscribe
//! update_all:  for each module: update;  then scheduler drain (once)
//! dispose_all: for each module: dispose; then clear
//! ```

pub mod guard;
pub mod module;

pub use guard::spawn_guarded;
pub use module::{Module, ModuleConstructor, ModuleError, ModuleFactory, ModuleRegistry};

use crate::core::context::SimContext;
use crate::models::event::{Event, LifecyclePhase};
use crate::scheduler::{panic_message, DrainReport};
use log::{error, info};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of one `update_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Modules whose `update` failed this frame
    pub module_failures: usize,
    /// Scheduler drain that followed the updates
    pub drain: DrainReport,
}

/// Owns the live modules
#[derive(Default)]
pub struct ModuleHost {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and initialize every module in `registry`
    ///
    /// A candidate that fails to construct or initialize is logged and
    /// skipped; discovery continues with the rest.
    pub fn discover(registry: &ModuleRegistry, ctx: &mut SimContext) -> Self {
        let mut host = Self::new();

        for factory in registry.factories() {
            let created = catch_unwind(factory.create);
            let module = match created {
                Ok(Ok(module)) => module,
                Ok(Err(err)) => {
                    record_failure(ctx, factory.name, LifecyclePhase::Construct, err.to_string());
                    continue;
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    record_failure(ctx, factory.name, LifecyclePhase::Construct, reason);
                    continue;
                }
            };
            host.register(module, ctx);
        }

        info!("module host started with {} module(s)", host.len());
        host
    }

    /// Initialize `module` and subscribe it on success
    ///
    /// Returns whether the module was subscribed.
    pub fn register(&mut self, mut module: Box<dyn Module>, ctx: &mut SimContext) -> bool {
        let name = module.name().to_string();
        let ok = run_isolated(ctx, &name, LifecyclePhase::Initialize, |ctx| {
            module.initialize(ctx)
        });
        if ok {
            let time = ctx.now_ms();
            ctx.log_event(Event::ModuleInitialized {
                time,
                module: name.clone(),
            });
            info!("module '{}' initialized", name);
            self.modules.push(module);
        }
        ok
    }

    /// One frame: update every module, then drain the scheduler once
    pub fn update_all(&mut self, ctx: &mut SimContext) -> UpdateReport {
        let mut report = UpdateReport::default();

        for module in self.modules.iter_mut() {
            let name = module.name().to_string();
            if !run_isolated(ctx, &name, LifecyclePhase::Update, |ctx| module.update(ctx)) {
                report.module_failures += 1;
            }
        }

        let scheduler = ctx.scheduler.clone();
        report.drain = scheduler.tick(ctx);
        report
    }

    /// Dispose every module and clear the registry
    ///
    /// Returns the number of modules whose `dispose` failed.
    pub fn dispose_all(&mut self, ctx: &mut SimContext) -> usize {
        let mut failures = 0;

        for mut module in self.modules.drain(..) {
            let name = module.name().to_string();
            if run_isolated(ctx, &name, LifecyclePhase::Dispose, |ctx| module.dispose(ctx)) {
                let time = ctx.now_ms();
                ctx.log_event(Event::ModuleDisposed { time, module: name });
            } else {
                failures += 1;
            }
        }

        failures
    }

    /// Names of the subscribed modules, in update order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// First subscribed module of concrete type `T`
    pub fn find<T: 'static>(&self) -> Option<&T> {
        self.modules
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Run one lifecycle call, containing both `Err` returns and panics
fn run_isolated<F>(ctx: &mut SimContext, name: &str, phase: LifecyclePhase, call: F) -> bool
where
    F: FnOnce(&mut SimContext) -> Result<(), ModuleError>,
{
    let reason = match catch_unwind(AssertUnwindSafe(|| call(ctx))) {
        Ok(Ok(())) => return true,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    record_failure(ctx, name, phase, reason);
    false
}

fn record_failure(ctx: &mut SimContext, name: &str, phase: LifecyclePhase, reason: String) {
    error!("module '{}' failed during {:?}: {}", name, phase, reason);
    let time = ctx.now_ms();
    ctx.log_event(Event::ModuleFailed {
        time,
        module: name.to_string(),
        phase,
        reason,
    });
}
