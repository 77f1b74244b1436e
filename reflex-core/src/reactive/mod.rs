//! Reactive Primitives
//!
//! This module implements the core reactive system: observed objects,
//! effects, computed values and refs. Together they let arbitrary code
//! re-run automatically whenever the plain data it read changes.
//!
//! # Concepts
//!
//! ## Observed Views
//!
//! [`reactive`] and [`readonly`] wrap a raw object in an [`Observed`] view.
//! Every property read through the view is recorded against the effect that
//! is currently running; every write through it notifies the effects that
//! read the written key. Nested objects are wrapped lazily as they are read.
//! Each raw object has at most one view per mode.
//!
//! ## Effects
//!
//! An effect is a function whose dependencies are collected while it runs.
//! When one of them changes, the effect runs again (or its scheduler is
//! called instead). Dependencies are collected afresh on every run, so a
//! branch that is no longer taken stops subscribing.
//!
//! ## Computed Values
//!
//! A computed value is a lazy, cached derivation. It recomputes only when
//! read after one of its inputs changed.
//!
//! ## Refs
//!
//! A [`Ref`] is a single observable slot, for values that do not live in an
//! object property.
//!
//! # Implementation Notes
//!
//! Dependencies are stored in one thread-local table keyed by target, then
//! by property key. Each bucket (a Dep) holds the set of subscribed
//! effects, and each effect remembers the Deps it belongs to so that it can
//! unsubscribe before re-running. Both links are weak: the table never keeps
//! an effect or a target alive, and dropping the last effect handle
//! unsubscribes it.
//!
//! Everything here is single-threaded: the handles are `Rc`-based and the
//! tables are thread-local.

mod base_handlers;
mod collection_handlers;
mod computed;
mod context;
mod effect;
mod ids;
mod lock;
mod observed;
mod operations;
mod reference;
pub(crate) mod registry;
pub(crate) mod runtime;

pub use computed::{computed, computed_with, ComputedRef};
pub use context::{is_tracking, pause_tracking, resume_tracking, untracked, ReactiveContext};
pub use effect::{
    effect, effect_with, stop, DebuggerEvent, DebuggerHook, EffectOptions, EffectSource,
    ReactiveEffect, Scheduler,
};
pub use ids::{EffectId, TargetId};
pub use lock::{is_locked, lock, unlock, unlocked};
pub use observed::Observed;
pub use operations::OperationType;
pub use reference::{is_ref, to_refs, Ref};
pub use registry::{
    is_reactive, is_readonly, mark_non_reactive, mark_readonly, reactive, readonly, to_raw,
};
pub use runtime::{is_tracked, subscriber_count, track, trigger, DepKey, Trackable, TriggerInfo};
