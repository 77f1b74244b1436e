//! The read-only lock.
//!
//! Read-only views refuse mutation only while the lock is engaged. The
//! lock starts engaged; a framework layer releases it around privileged
//! internal writes and re-engages it afterwards.

use std::cell::Cell;

thread_local! {
    static LOCKED: Cell<bool> = const { Cell::new(true) };
}

pub fn lock() {
    LOCKED.with(|locked| locked.set(true));
}

pub fn unlock() {
    LOCKED.with(|locked| locked.set(false));
}

pub fn is_locked() -> bool {
    LOCKED.with(Cell::get)
}

/// Run `f` with the lock released, restoring its previous state after.
pub fn unlocked<T>(f: impl FnOnce() -> T) -> T {
    struct Relock(bool);

    impl Drop for Relock {
        fn drop(&mut self) {
            LOCKED.with(|locked| locked.set(self.0));
        }
    }

    let _relock = Relock(LOCKED.with(|locked| locked.replace(false)));
    f()
}
