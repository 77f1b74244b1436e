//! Reactive Runtime
//!
//! The runtime owns the dependency store and implements the two primitives
//! everything else is built from: [`track`] records that the running effect
//! read a key, [`trigger`] re-runs (or schedules) everything that read it.
//!
//! # How It Works
//!
//! 1. The store maps a target's [`TargetId`] to its keys, and each key to a
//!    [`Dep`]: the set of effects that read that key on that target.
//!
//! 2. When an observed value is read inside an effect, `track` adds the
//!    innermost running effect to the key's Dep, and records the Dep on the
//!    effect so it can unsubscribe in O(deps) before its next run.
//!
//! 3. When an observed value is written, `trigger` gathers the affected
//!    Deps, splits their effects into computed and plain runners, and runs
//!    computed runners first so cached values are invalidated before any
//!    plain effect re-reads them.
//!
//! Enumeration-style reads share one bucket ([`DepKey::Iterate`]), so adding
//! or removing a key notifies every effect that listed the target's keys.
//! Arrays use their `length` key for the same purpose.
//!
//! # Thread Model
//!
//! The store is thread-local. Each thread owns an independent runtime, and
//! no value tracked on one thread is ever seen by another.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::{self, ReactiveContext};
use super::effect::{ReactiveEffect, WeakEffect};
use super::{registry, EffectId, OperationType, Ref, TargetId};
use crate::value::{Key, Object, Value};

/// The key an effect subscribed under.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    /// The shared enumeration bucket.
    Iterate,
    /// A named or indexed property.
    Prop(Key),
    /// An entry of a keyed collection.
    Entry(Value),
}

impl From<Key> for DepKey {
    fn from(key: Key) -> Self {
        DepKey::Prop(key)
    }
}

impl From<&Key> for DepKey {
    fn from(key: &Key) -> Self {
        DepKey::Prop(key.clone())
    }
}

impl From<&str> for DepKey {
    fn from(name: &str) -> Self {
        DepKey::Prop(Key::from(name))
    }
}

impl fmt::Debug for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Iterate => f.write_str("<iterate>"),
            DepKey::Prop(key) => write!(f, "{key:?}"),
            DepKey::Entry(value) => write!(f, "{value:?}"),
        }
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Iterate => f.write_str("<iterate>"),
            DepKey::Prop(key) => write!(f, "{key}"),
            DepKey::Entry(value) => write!(f, "{value}"),
        }
    }
}

pub(crate) type DepCell = RefCell<IndexMap<EffectId, WeakEffect>>;

/// The set of effects subscribed to one key on one target.
///
/// Membership is keyed by [`EffectId`], so adding an effect twice is a
/// no-op. Deps and effects hold each other weakly: the store never keeps an
/// effect alive, and an effect never keeps a target's Deps alive. Entries
/// whose effect was dropped are pruned on the next read.
#[derive(Clone, Default)]
pub(crate) struct Dep(Rc<DepCell>);

impl Dep {
    /// Subscribe `effect`. Returns `false` if it was already subscribed.
    pub(crate) fn insert(&self, effect: &ReactiveEffect) -> bool {
        let mut effects = self.0.borrow_mut();
        if effects.contains_key(&effect.id()) {
            return false;
        }
        effects.insert(effect.id(), effect.downgrade());
        true
    }

    pub(crate) fn remove(&self, id: EffectId) {
        if let Ok(mut effects) = self.0.try_borrow_mut() {
            effects.shift_remove(&id);
        }
    }

    /// Snapshot of the live subscribed effects in subscription order.
    pub(crate) fn effects(&self) -> Vec<ReactiveEffect> {
        let mut effects = self.0.borrow_mut();
        effects.retain(|_, effect| effect.is_live());
        effects.values().filter_map(WeakEffect::upgrade).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().values().filter(|effect| effect.is_live()).count()
    }

    pub(crate) fn downgrade(&self) -> Weak<DepCell> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<DepCell>) -> Option<Self> {
        weak.upgrade().map(Self)
    }
}

type KeyToDepMap = HashMap<DepKey, Dep>;

thread_local! {
    static TARGET_MAP: RefCell<HashMap<TargetId, KeyToDepMap>> = RefCell::new(HashMap::new());
}

/// Something whose reads can be tracked: a raw object or a reference cell.
pub trait Trackable {
    fn target_id(&self) -> TargetId;

    /// Arrays report `length` as their structural key instead of the
    /// iteration bucket.
    fn is_array(&self) -> bool {
        false
    }

    /// The target as a value, for debugger events.
    fn to_value(&self) -> Value;
}

impl Trackable for Object {
    fn target_id(&self) -> TargetId {
        self.id()
    }

    fn is_array(&self) -> bool {
        Object::is_array(self)
    }

    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl Trackable for Ref {
    fn target_id(&self) -> TargetId {
        self.id()
    }

    fn to_value(&self) -> Value {
        Value::Ref(self.clone())
    }
}

/// Extra payload a write reports to `on_trigger` hooks.
#[derive(Debug, Clone, Default)]
pub struct TriggerInfo {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// A snapshot of a collection's contents before a clear.
    pub old_target: Option<Value>,
}

impl TriggerInfo {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn change(old_value: Value, new_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            new_value: Some(new_value),
            old_target: None,
        }
    }

    pub fn removed(old_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::default()
        }
    }

    pub fn added(new_value: Value) -> Self {
        Self {
            new_value: Some(new_value),
            ..Self::default()
        }
    }
}

/// Make sure `id` has a (possibly empty) key map.
pub(crate) fn ensure_target(id: TargetId) {
    TARGET_MAP.with(|map| {
        map.borrow_mut().entry(id).or_default();
    });
}

/// Whether `id` has dependency state at all.
pub fn is_tracked(id: TargetId) -> bool {
    TARGET_MAP.with(|map| map.borrow().contains_key(&id))
}

/// Number of effects currently subscribed to `key` on `id`.
pub fn subscriber_count(id: TargetId, key: &DepKey) -> usize {
    TARGET_MAP.with(|map| {
        map.borrow()
            .get(&id)
            .and_then(|deps| deps.get(key))
            .map_or(0, Dep::len)
    })
}

/// Drop every dependency and registry entry for a target that no longer
/// exists.
///
/// Called from `Drop`, possibly while the thread is shutting down, so it
/// must never panic: it skips the cleanup if the store is unavailable.
/// Removed Deps are released only after the store borrow ends, since
/// dropping them can drop effects that own further targets.
pub(crate) fn forget_target(id: TargetId) {
    let removed = TARGET_MAP
        .try_with(|map| map.try_borrow_mut().ok().and_then(|mut map| map.remove(&id)))
        .ok()
        .flatten();
    drop(removed);
    registry::forget(id);
}

/// Record that the running effect read `key` on `target`.
///
/// A no-op while tracking is paused or when no effect is running. Reads
/// with [`OperationType::Iterate`] always land in the shared enumeration
/// bucket, whatever `key` says.
pub fn track<T>(target: &T, op: OperationType, key: DepKey)
where
    T: Trackable + ?Sized,
{
    if !context::is_tracking() {
        return;
    }
    let Some(effect) = ReactiveContext::current() else {
        return;
    };
    if !effect.is_active() {
        return;
    }

    let key = if op == OperationType::Iterate {
        DepKey::Iterate
    } else {
        key
    };

    let dep = TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target.target_id())
            .or_default()
            .entry(key.clone())
            .or_default()
            .clone()
    });

    if dep.insert(&effect) {
        effect.record_dep(&dep);

        #[cfg(debug_assertions)]
        if let Some(hook) = effect.on_track_hook() {
            hook(&super::DebuggerEvent {
                effect: effect.clone(),
                target: target.to_value(),
                op,
                key: Some(key),
                old_value: None,
                new_value: None,
                old_target: None,
            });
        }
    }
}

/// Notify every effect that depends on `key` of `target`.
///
/// A no-op for targets that were never tracked. [`OperationType::Clear`]
/// notifies every key on the target. `Add` and `Delete` additionally notify
/// the structural bucket (`length` for arrays, the enumeration bucket
/// otherwise); `Set` does not, since it leaves the key count unchanged.
///
/// Every active effect is handed to `schedule_run`, including ones on the
/// running stack. Those still see `on_trigger` and their scheduler, but are
/// never re-run directly: an effect that writes a value it also reads runs
/// once per outer trigger, not forever.
pub fn trigger<T>(target: &T, op: OperationType, key: Option<DepKey>, info: TriggerInfo)
where
    T: Trackable + ?Sized,
{
    let deps: Option<SmallVec<[Dep; 4]>> = TARGET_MAP.with(|map| {
        let map = map.borrow();
        let deps = map.get(&target.target_id())?;
        let mut gathered = SmallVec::new();

        if op == OperationType::Clear {
            gathered.extend(deps.values().cloned());
        } else {
            if let Some(dep) = key.as_ref().and_then(|k| deps.get(k)) {
                gathered.push(dep.clone());
            }
            if op.changes_key_count() {
                let structural = if target.is_array() {
                    DepKey::Prop(Key::length())
                } else {
                    DepKey::Iterate
                };
                if let Some(dep) = deps.get(&structural) {
                    gathered.push(dep.clone());
                }
            }
        }
        Some(gathered)
    });

    let Some(deps) = deps else {
        return;
    };

    let mut computed_runners: IndexMap<EffectId, ReactiveEffect> = IndexMap::new();
    let mut effects: IndexMap<EffectId, ReactiveEffect> = IndexMap::new();
    for dep in &deps {
        for effect in dep.effects() {
            if !effect.is_active() {
                continue;
            }
            if effect.is_computed() {
                computed_runners.entry(effect.id()).or_insert(effect);
            } else {
                effects.entry(effect.id()).or_insert(effect);
            }
        }
    }
    drop(deps);

    for effect in computed_runners.values().chain(effects.values()) {
        schedule_run(effect, target, op, key.as_ref(), &info);
    }
}

#[cfg_attr(not(debug_assertions), allow(unused_variables))]
fn schedule_run<T>(
    effect: &ReactiveEffect,
    target: &T,
    op: OperationType,
    key: Option<&DepKey>,
    info: &TriggerInfo,
) where
    T: Trackable + ?Sized,
{
    #[cfg(debug_assertions)]
    if let Some(hook) = effect.on_trigger_hook() {
        hook(&super::DebuggerEvent {
            effect: effect.clone(),
            target: target.to_value(),
            op,
            key: key.cloned(),
            old_value: info.old_value.clone(),
            new_value: info.new_value.clone(),
            old_target: info.old_target.clone(),
        });
    }

    if effect.has_scheduler() || !ReactiveContext::is_running(effect.id()) {
        effect.schedule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect, effect_with, stop, EffectOptions};
    use std::cell::Cell;

    fn count_runs() -> (Rc<Cell<i32>>, impl Fn() + 'static) {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        (runs, move || counter.set(counter.get() + 1))
    }

    #[test]
    fn track_is_noop_outside_effects() {
        let target = Object::new();
        track(&target, OperationType::Get, DepKey::from("a"));
        assert!(!is_tracked(target.id()));
    }

    #[test]
    fn trigger_reaches_tracked_effects() {
        let target = Object::new();
        let (runs, bump) = count_runs();

        let tracked = target.clone();
        let _effect = effect(move || {
            bump();
            track(&tracked, OperationType::Get, DepKey::from("a"));
        });
        assert_eq!(runs.get(), 1);
        assert_eq!(subscriber_count(target.id(), &DepKey::from("a")), 1);

        trigger(&target, OperationType::Set, Some(DepKey::from("a")), TriggerInfo::none());
        assert_eq!(runs.get(), 2);

        // Unrelated keys do nothing.
        trigger(&target, OperationType::Set, Some(DepKey::from("b")), TriggerInfo::none());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn iterate_bucket_follows_key_count_changes() {
        let target = Object::new();
        let (runs, bump) = count_runs();

        let tracked = target.clone();
        let _effect = effect(move || {
            bump();
            track(&tracked, OperationType::Iterate, DepKey::from("ignored"));
        });
        assert_eq!(subscriber_count(target.id(), &DepKey::Iterate), 1);

        trigger(&target, OperationType::Set, Some(DepKey::from("x")), TriggerInfo::none());
        assert_eq!(runs.get(), 1);

        trigger(&target, OperationType::Add, Some(DepKey::from("x")), TriggerInfo::none());
        assert_eq!(runs.get(), 2);

        trigger(&target, OperationType::Delete, Some(DepKey::from("x")), TriggerInfo::none());
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn clear_notifies_every_key() {
        let target = Object::map();
        let (runs, bump) = count_runs();

        let tracked = target.clone();
        let _effect = effect(move || {
            bump();
            track(&tracked, OperationType::Get, DepKey::Entry(Value::from("k")));
        });

        trigger(&target, OperationType::Clear, None, TriggerInfo::none());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn stopped_effects_are_unsubscribed() {
        let target = Object::new();
        let (runs, bump) = count_runs();

        let tracked = target.clone();
        let runner = effect(move || {
            bump();
            track(&tracked, OperationType::Get, DepKey::from("a"));
        });
        stop(&runner);
        assert_eq!(subscriber_count(target.id(), &DepKey::from("a")), 0);

        trigger(&target, OperationType::Set, Some(DepKey::from("a")), TriggerInfo::none());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dropped_effects_are_unsubscribed() {
        let target = Object::new();
        let (runs, bump) = count_runs();

        let tracked = target.clone();
        let runner = effect(move || {
            bump();
            track(&tracked, OperationType::Get, DepKey::from("a"));
        });
        assert_eq!(subscriber_count(target.id(), &DepKey::from("a")), 1);

        drop(runner);
        assert_eq!(subscriber_count(target.id(), &DepKey::from("a")), 0);

        trigger(&target, OperationType::Set, Some(DepKey::from("a")), TriggerInfo::none());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn running_effects_still_reach_their_scheduler() {
        let target = Object::new();
        let (scheduled, bump) = count_runs();
        let (runs, run) = count_runs();

        let tracked = target.clone();
        let _effect = effect_with(
            move || {
                run();
                track(&tracked, OperationType::Get, DepKey::from("a"));
                trigger(&tracked, OperationType::Set, Some(DepKey::from("a")), TriggerInfo::none());
            },
            EffectOptions::new().scheduler(move |_| bump()),
        );

        assert_eq!(runs.get(), 1);
        assert_eq!(scheduled.get(), 1);
    }

    #[test]
    fn computed_runners_go_first() {
        let target = Object::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let (tracked, log) = (target.clone(), order.clone());
        let _plain = effect(move || {
            log.borrow_mut().push("plain");
            track(&tracked, OperationType::Get, DepKey::from("a"));
        });

        let (tracked, log) = (target.clone(), order.clone());
        let _computed = effect_with(
            move || {
                log.borrow_mut().push("computed");
                track(&tracked, OperationType::Get, DepKey::from("a"));
            },
            EffectOptions::new().computed(),
        );

        order.borrow_mut().clear();
        trigger(&target, OperationType::Set, Some(DepKey::from("a")), TriggerInfo::none());
        assert_eq!(*order.borrow(), vec!["computed", "plain"]);
    }

    #[test]
    fn dropping_a_target_forgets_its_deps() {
        let target = Object::new();
        let id = target.id();
        ensure_target(id);
        assert!(is_tracked(id));

        drop(target);
        assert!(!is_tracked(id));
    }
}
