//! Effect Implementation
//!
//! An effect is a re-runnable computation whose reads are tracked. When any
//! value it read changes, the effect runs again (or its scheduler is told
//! that it should).
//!
//! # How Effects Work
//!
//! 1. Unless created lazy, the effect runs once immediately to establish
//!    its initial dependencies.
//!
//! 2. Before every tracked run, the effect unsubscribes from every Dep it
//!    joined last time. Dependencies are re-derived from scratch on each
//!    run, so a branch that is no longer taken stops notifying the effect.
//!
//! 3. During the run the effect sits on the context stack, and every
//!    tracked read attributes to it (or to a more deeply nested effect).
//!
//! # Recursion
//!
//! Running an effect that is already on the stack calls its function
//! directly without touching tracking. A trigger that reaches a running
//! effect still fires `on_trigger` and calls its scheduler, but skips the
//! default re-run, so an effect that writes what it reads does not loop.
//!
//! # Ownership
//!
//! Deps hold their effects weakly. The [`ReactiveEffect`] handle returned by
//! [`effect`] keeps the effect alive; dropping the last handle unsubscribes
//! it from every Dep it joined.
//!
//! # Stopping
//!
//! [`stop`] unsubscribes the effect for good and fires its `on_stop` hook.
//! A stopped effect can still be run by hand; it then behaves like a plain
//! function call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::runtime::{Dep, DepCell, DepKey};
use super::{EffectId, OperationType};
use crate::value::Value;

type EffectFn = dyn Fn() -> Value;

/// Replaces the default re-run when a dependency changes.
pub type Scheduler = Rc<dyn Fn(&ReactiveEffect)>;

/// Receives [`DebuggerEvent`]s in development builds.
pub type DebuggerHook = Rc<dyn Fn(&DebuggerEvent)>;

/// A track or trigger, as reported to `on_track` / `on_trigger`.
#[derive(Debug, Clone)]
pub struct DebuggerEvent {
    pub effect: ReactiveEffect,
    pub target: Value,
    pub op: OperationType,
    pub key: Option<DepKey>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub old_target: Option<Value>,
}

/// Configuration for [`effect_with`].
///
/// ```rust,ignore
/// let runner = effect_with(
///     move || state.get("count"),
///     EffectOptions::new().lazy().scheduler(|e| queue.push(e.clone())),
/// );
/// ```
#[derive(Clone, Default)]
pub struct EffectOptions {
    lazy: bool,
    computed: bool,
    scheduler: Option<Scheduler>,
    on_track: Option<DebuggerHook>,
    on_trigger: Option<DebuggerHook>,
    on_stop: Option<Rc<dyn Fn()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Mark as a computed runner, notified before plain effects.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Fn(&ReactiveEffect) + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Called once per new subscription. Development builds only.
    pub fn on_track(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_track = Some(Rc::new(hook));
        self
    }

    /// Called for every trigger that reaches the effect. Development builds
    /// only.
    pub fn on_trigger(mut self, hook: impl Fn(&DebuggerEvent) + 'static) -> Self {
        self.on_trigger = Some(Rc::new(hook));
        self
    }

    pub fn on_stop(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_stop = Some(Rc::new(hook));
        self
    }
}

struct EffectInner {
    id: EffectId,
    raw: Rc<EffectFn>,
    active: Cell<bool>,
    deps: RefCell<SmallVec<[Weak<DepCell>; 4]>>,
    computed: bool,
    scheduler: Option<Scheduler>,
    on_track: Option<DebuggerHook>,
    on_trigger: Option<DebuggerHook>,
    on_stop: Option<Rc<dyn Fn()>>,
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().iter().filter_map(Dep::upgrade) {
            dep.remove(self.id);
        }
    }
}

/// A handle to an effect. Clones share the same effect.
#[derive(Clone)]
pub struct ReactiveEffect(Rc<EffectInner>);

/// A non-owning effect handle, as stored in Deps.
#[derive(Clone)]
pub(crate) struct WeakEffect(Weak<EffectInner>);

impl WeakEffect {
    pub(crate) fn upgrade(&self) -> Option<ReactiveEffect> {
        self.0.upgrade().map(ReactiveEffect)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl ReactiveEffect {
    fn new(raw: Rc<EffectFn>, options: EffectOptions) -> Self {
        Self(Rc::new(EffectInner {
            id: EffectId::new(),
            raw,
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            computed: options.computed,
            scheduler: options.scheduler,
            on_track: options.on_track,
            on_trigger: options.on_trigger,
            on_stop: options.on_stop,
        }))
    }

    pub fn id(&self) -> EffectId {
        self.0.id
    }

    /// Run the effect with tracking and return what its function returned.
    pub fn run(&self) -> Value {
        if !self.is_active() {
            return (self.0.raw)();
        }
        if ReactiveContext::is_running(self.id()) {
            return (self.0.raw)();
        }

        self.cleanup();
        tracing::trace!(effect = self.id().raw(), "running effect");

        let _ctx = ReactiveContext::enter(self);
        (self.0.raw)()
    }

    /// Hand the effect to its scheduler, or run it if it has none.
    pub fn schedule(&self) {
        match &self.0.scheduler {
            Some(scheduler) => scheduler(self),
            None => {
                self.run();
            }
        }
    }

    /// The wrapped function, untracked.
    pub fn raw(&self) -> Rc<dyn Fn() -> Value> {
        self.0.raw.clone()
    }

    /// Number of Deps the effect is currently subscribed to.
    pub fn deps(&self) -> usize {
        self.0
            .deps
            .borrow()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_computed(&self) -> bool {
        self.0.computed
    }

    pub fn on_stop(&self) -> Option<Rc<dyn Fn()>> {
        self.0.on_stop.clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakEffect {
        WeakEffect(Rc::downgrade(&self.0))
    }

    pub(crate) fn has_scheduler(&self) -> bool {
        self.0.scheduler.is_some()
    }

    #[cfg(debug_assertions)]
    pub(crate) fn on_track_hook(&self) -> Option<&DebuggerHook> {
        self.0.on_track.as_ref()
    }

    #[cfg(debug_assertions)]
    pub(crate) fn on_trigger_hook(&self) -> Option<&DebuggerHook> {
        self.0.on_trigger.as_ref()
    }

    /// Remember that `dep` now holds this effect.
    pub(crate) fn record_dep(&self, dep: &Dep) {
        self.0.deps.borrow_mut().push(dep.downgrade());
    }

    /// The live Deps this effect belongs to.
    pub(crate) fn dep_handles(&self) -> Vec<Dep> {
        self.0.deps.borrow().iter().filter_map(Dep::upgrade).collect()
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        for dep in deps.iter().filter_map(Dep::upgrade) {
            dep.remove(self.id());
        }
    }
}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id().raw())
            .field("active", &self.is_active())
            .field("computed", &self.is_computed())
            .field("deps", &self.deps())
            .finish()
    }
}

/// Anything [`effect`] can wrap: a closure, or an existing effect whose
/// original function is reused instead of being wrapped twice.
pub trait EffectSource {
    fn into_raw(self) -> Rc<dyn Fn() -> Value>;
}

impl<F, R> EffectSource for F
where
    F: Fn() -> R + 'static,
    R: Into<Value>,
{
    fn into_raw(self) -> Rc<dyn Fn() -> Value> {
        Rc::new(move || self().into())
    }
}

impl EffectSource for ReactiveEffect {
    fn into_raw(self) -> Rc<dyn Fn() -> Value> {
        self.raw()
    }
}

impl EffectSource for &ReactiveEffect {
    fn into_raw(self) -> Rc<dyn Fn() -> Value> {
        self.raw()
    }
}

/// Create an effect and run it once.
pub fn effect(source: impl EffectSource) -> ReactiveEffect {
    effect_with(source, EffectOptions::default())
}

/// Create an effect with options. Runs it once unless `lazy` is set.
pub fn effect_with(source: impl EffectSource, options: EffectOptions) -> ReactiveEffect {
    let lazy = options.lazy;
    let effect = ReactiveEffect::new(source.into_raw(), options);
    if !lazy {
        effect.run();
    }
    effect
}

/// Permanently unsubscribe `effect` and fire its `on_stop` hook.
pub fn stop(effect: &ReactiveEffect) {
    if !effect.is_active() {
        return;
    }
    effect.cleanup();
    if let Some(on_stop) = &effect.0.on_stop {
        on_stop();
    }
    effect.0.active.set(false);
    tracing::trace!(effect = effect.id().raw(), "stopped effect");
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
