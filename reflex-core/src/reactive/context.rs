//! Reactive Context
//!
//! The reactive context tracks which effect is currently running. This
//! enables automatic dependency tracking: when an observed value is read,
//! the innermost running effect is recorded as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack of running effects. Running an effect pushes
//! it; the returned guard pops it when dropped. Because the pop lives in
//! `Drop`, the stack stays balanced even when an effect body panics.
//!
//! A second thread-local flag pauses tracking altogether, for internal
//! reads that must not create dependency edges.

use std::cell::{Cell, RefCell};

use super::effect::ReactiveEffect;
use super::EffectId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ReactiveEffect>> = const { RefCell::new(Vec::new()) };
    static SHOULD_TRACK: Cell<bool> = const { Cell::new(true) };
}

/// Guard that pops the effect stack when dropped.
pub struct ReactiveContext {
    effect_id: EffectId,
}

impl ReactiveContext {
    /// Push `effect` as the innermost running effect.
    ///
    /// The effect is popped automatically when the returned guard drops.
    pub fn enter(effect: &ReactiveEffect) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(effect.clone()));
        Self {
            effect_id: effect.id(),
        }
    }

    /// Check if any effect is running.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost running effect, if any.
    pub fn current() -> Option<ReactiveEffect> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Whether `id` is anywhere on the running stack.
    pub fn is_running(id: EffectId) -> bool {
        CONTEXT_STACK.with(|stack| stack.borrow().iter().any(|e| e.id() == id))
    }

    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(effect) = popped {
            debug_assert_eq!(
                effect.id(),
                self.effect_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.effect_id,
                effect.id()
            );
        }
    }
}

/// Suspend all tracking on this thread until [`resume_tracking`].
pub fn pause_tracking() {
    SHOULD_TRACK.with(|flag| flag.set(false));
}

pub fn resume_tracking() {
    SHOULD_TRACK.with(|flag| flag.set(true));
}

pub fn is_tracking() -> bool {
    SHOULD_TRACK.with(Cell::get)
}

/// Run `f` with tracking paused, restoring the previous state afterwards.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            SHOULD_TRACK.with(|flag| flag.set(self.0));
        }
    }

    let _restore = Restore(SHOULD_TRACK.with(|flag| flag.replace(false)));
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect_with, EffectOptions};

    fn lazy_effect() -> ReactiveEffect {
        effect_with(|| {}, EffectOptions::new().lazy())
    }

    #[test]
    fn context_tracks_effect() {
        let effect = lazy_effect();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current().is_none());

        {
            let _ctx = ReactiveContext::enter(&effect);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(effect.id()));
            assert!(ReactiveContext::is_running(effect.id()));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(!ReactiveContext::is_running(effect.id()));
    }

    #[test]
    fn nested_contexts() {
        let outer = lazy_effect();
        let inner = lazy_effect();

        {
            let _ctx1 = ReactiveContext::enter(&outer);
            assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(outer.id()));

            {
                let _ctx2 = ReactiveContext::enter(&inner);
                assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(inner.id()));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current().map(|e| e.id()), Some(outer.id()));
        }

        assert!(ReactiveContext::current().is_none());
    }

    #[test]
    fn untracked_restores_previous_flag() {
        assert!(is_tracking());
        untracked(|| assert!(!is_tracking()));
        assert!(is_tracking());

        pause_tracking();
        untracked(|| {});
        assert!(!is_tracking());
        resume_tracking();
        assert!(is_tracking());
    }
}
