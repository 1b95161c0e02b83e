//! Per-visitor experiment session
//!
//! Orchestrates get-or-assign bucketing over the assignment store and
//! allocator, and reports conversions against the stored assignment. One
//! session per visitor; nothing here is shared across visitors.
//!
//! Overlapping get-or-assign calls for the same experiment (two views
//! racing before either persisted) may both allocate; the store keeps the
//! last write. There is no compare-and-set, mirroring the low-stakes
//! nature of a mis-bucketed visitor.

use tracing::{debug, info};

use crate::allocator::{allocate, RandomSource, ThreadRngSource};
use crate::config::ExperimentDefinition;
use crate::events::{EventSink, NullSink, TrackedEvent};
use crate::storage::AssignmentStore;

/// Host-environment capability flags.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    /// False while persistent storage is not yet reachable, e.g. before
    /// the first render. Bucketing then returns the default variant
    /// without persisting or emitting anything.
    pub has_persistent_storage: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            has_persistent_storage: true,
        }
    }
}

impl ExecutionContext {
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn prerender() -> Self {
        Self {
            has_persistent_storage: false,
        }
    }
}

/// Experiment session manager for a single visitor.
pub struct ExperimentSession {
    store: AssignmentStore,
    sink: Box<dyn EventSink>,
    rng: Box<dyn RandomSource>,
    context: ExecutionContext,
}

impl ExperimentSession {
    /// Build a session from explicit capabilities.
    pub fn new(
        store: AssignmentStore,
        sink: Box<dyn EventSink>,
        rng: Box<dyn RandomSource>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            store,
            sink,
            rng,
            context,
        }
    }

    /// Session with in-memory storage, a silent sink and thread-local
    /// randomness.
    pub fn in_memory() -> Self {
        Self::new(
            AssignmentStore::in_memory(),
            Box::new(NullSink),
            Box::new(ThreadRngSource::new()),
            ExecutionContext::ready(),
        )
    }

    /// Get the visitor's variant for an experiment, assigning one if
    /// needed.
    ///
    /// Sticky: once a valid assignment exists it is returned as-is and no
    /// event is emitted. A stored value that is no longer a member of the
    /// definition (the experiment changed underneath the visitor) is
    /// replaced by a fresh allocation. Exactly one assignment event is
    /// emitted per fresh allocation.
    pub fn get_variant(&mut self, definition: &ExperimentDefinition) -> String {
        if !self.context.has_persistent_storage {
            // Transient fallback, not an assignment
            return definition.default_variant.clone();
        }

        if let Some(existing) = self.store.get(&definition.id) {
            if definition.contains(&existing) {
                return existing;
            }
            debug!(
                experiment = %definition.id,
                variant = %existing,
                "Stored variant no longer in definition, reallocating"
            );
        }

        let variant = allocate(definition, self.rng.as_mut()).to_string();
        self.store.set(&definition.id, &variant);
        self.emit(&TrackedEvent::assignment(&definition.id, &variant));

        info!(
            experiment = %definition.id,
            variant = %variant,
            "Assigned variant"
        );

        variant
    }

    /// Stored variant for an experiment, if the visitor has one.
    pub fn current_variant(&self, experiment_id: &str) -> Option<String> {
        if !self.context.has_persistent_storage {
            return None;
        }
        self.store.get(experiment_id)
    }

    /// Force a specific variant, bypassing allocation. QA only; callers
    /// should refresh dependent views afterward.
    pub fn set_test_variant(&mut self, experiment_id: &str, variant: &str) {
        if !self.context.has_persistent_storage {
            return;
        }
        self.store.set(experiment_id, variant);
    }

    /// Remove every assignment this visitor holds.
    pub fn clear_all_experiments(&mut self) {
        self.store.clear_all();
    }

    /// Record a conversion against the visitor's assigned variant.
    ///
    /// Emits nothing when the visitor holds no assignment for the
    /// experiment. Never raises.
    pub fn track_conversion(
        &mut self,
        experiment_id: &str,
        event_name: &str,
        value: Option<f64>,
    ) {
        if !self.context.has_persistent_storage {
            return;
        }

        let variant = match self.store.get(experiment_id) {
            Some(variant) => variant,
            None => {
                debug!(
                    experiment = experiment_id,
                    event = event_name,
                    "Conversion without assignment, dropping"
                );
                return;
            }
        };

        self.emit(&TrackedEvent::conversion(
            experiment_id,
            &variant,
            event_name,
            value,
        ));
    }

    fn emit(&self, event: &TrackedEvent) {
        if let Err(err) = self.sink.record(event) {
            debug!(action = %event.action, error = %err, "Event sink failed, dropping event");
        }
    }
}
