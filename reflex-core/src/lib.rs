//! Reflex Core
//!
//! This crate provides a fine-grained reactivity engine over plain,
//! dynamically shaped data. It implements:
//!
//! - Observed views over objects, arrays and keyed collections
//! - Automatic dependency tracking and change propagation
//! - Effects with optional schedulers and debugging hooks
//! - Lazy computed values and single-slot refs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: The dynamic value model and raw object storage
//! - `reactive`: Views, dependency tracking, effects, computed values, refs
//! - `error`: Error types for refused operations and conversions
//!
//! # Example
//!
//! ```rust,ignore
//! use reflex_core::{computed, effect, reactive};
//! use serde_json::json;
//!
//! // Create an observed object
//! let state = reactive(json!({ "count": 0 }));
//!
//! // Create a derived value
//! let reader = state.clone();
//! let doubled = computed(move || reader.get("count").as_number().unwrap_or_default() * 2.0);
//!
//! // Create an effect; it stays subscribed while the handle lives
//! let (reader, cell) = (state.clone(), doubled.clone());
//! let _logger = effect(move || {
//!     println!("Count: {}, Doubled: {}", reader.get("count"), cell.value());
//! });
//!
//! // Update the state
//! state.set("count", 5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: 10"
//! ```

pub mod error;
pub mod reactive;
pub mod value;

pub use error::{ReactivityError, ValueError};
pub use reactive::{
    computed, computed_with, effect, effect_with, is_reactive, is_readonly, is_ref, lock,
    mark_non_reactive, mark_readonly, reactive, readonly, stop, to_raw, to_refs, unlock,
    ComputedRef, EffectOptions, Observed, OperationType, ReactiveEffect, Ref,
};
pub use value::{Key, Object, ObjectKind, Symbol, Value};
