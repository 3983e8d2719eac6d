// Lifecycle Tests - initial state resolution, transitions and persistence

use super::helpers::FailingStore;
use crate::lifecycle::*;
use crate::store::{MemoryStore, StateStore};
use std::sync::Arc;

const KEY: &str = "widget-state-s1-example.com";

fn lifecycle_with(store: Arc<MemoryStore>, rules: TransitionRules) -> WidgetLifecycle {
    WidgetLifecycle::new(store, "s1", "example.com", rules)
}

fn stored(store: &MemoryStore) -> Option<String> {
    store.get(KEY).expect("memory store get")
}

// Pure resolution rules

#[test]
fn test_desktop_prefers_stored_over_default() {
    let r = resolve_initial_state(
        Some(VisualState::Collapsed),
        VisualState::Expanded,
        false,
        MobileStatePolicy::ForceClosed,
    );
    assert_eq!(r.state, VisualState::Collapsed);
    assert!(!r.forced);

    let r = resolve_initial_state(None, VisualState::Closed, false, MobileStatePolicy::Auto);
    assert_eq!(r.state, VisualState::Closed);
}

#[test]
fn test_mobile_respect_saved_keeps_closed() {
    let r = resolve_initial_state(
        Some(VisualState::Closed),
        VisualState::Expanded,
        true,
        MobileStatePolicy::RespectSaved,
    );
    assert_eq!(r.state, VisualState::Closed);
}

#[test]
fn test_mobile_force_policies_ignore_stored_and_default() {
    for stored in [None, Some(VisualState::Expanded), Some(VisualState::Closed)] {
        let r = resolve_initial_state(stored, VisualState::Expanded, true, MobileStatePolicy::ForceCollapsed);
        assert_eq!(r.state, VisualState::Collapsed);
        assert!(r.forced);

        let r = resolve_initial_state(stored, VisualState::Expanded, true, MobileStatePolicy::ForceClosed);
        assert_eq!(r.state, VisualState::Closed);
        assert!(r.forced);
    }
}

#[test]
fn test_mobile_auto_downgrades_stored_closed() {
    let r = resolve_initial_state(
        Some(VisualState::Closed),
        VisualState::Expanded,
        true,
        MobileStatePolicy::Auto,
    );
    assert_eq!(r.state, VisualState::Collapsed);
}

#[test]
fn test_mobile_auto_keeps_default_expanded() {
    let r = resolve_initial_state(None, VisualState::Expanded, true, MobileStatePolicy::Auto);
    assert_eq!(r.state, VisualState::Expanded);
    assert!(!r.forced);
}

#[test]
fn test_mobile_auto_keeps_default_closed() {
    let r = resolve_initial_state(None, VisualState::Closed, true, MobileStatePolicy::Auto);
    assert_eq!(r.state, VisualState::Closed);
    assert!(!r.forced);
}

#[test]
fn test_next_state_rules() {
    let floating = TransitionRules::default();
    assert_eq!(next_state(VisualState::Closed, Transition::Expand, floating), VisualState::Expanded);
    assert_eq!(next_state(VisualState::Expanded, Transition::Collapse, floating), VisualState::Collapsed);
    assert_eq!(next_state(VisualState::Collapsed, Transition::Close, floating), VisualState::Closed);

    let embedded = TransitionRules {
        is_floating: false,
        allow_close: true,
    };
    assert_eq!(next_state(VisualState::Expanded, Transition::Collapse, embedded), VisualState::Expanded);

    let no_close = TransitionRules {
        is_floating: true,
        allow_close: false,
    };
    for current in [VisualState::Expanded, VisualState::Collapsed, VisualState::Closed] {
        assert_eq!(next_state(current, Transition::Close, no_close), VisualState::Collapsed);
    }
}

// Persistence

#[test]
fn test_first_visit_persists_resolved_default() {
    let store = Arc::new(MemoryStore::new());
    let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());

    let state = lifecycle.resolve(VisualState::Collapsed, false, MobileStatePolicy::Auto);

    assert_eq!(state, VisualState::Collapsed);
    assert_eq!(stored(&store).as_deref(), Some("collapsed"));
}

#[test]
fn test_existing_value_is_not_rewritten() {
    let store = Arc::new(MemoryStore::new());
    store.set(KEY, "closed").unwrap();
    let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());

    // Mobile auto shows collapsed but the saved "closed" stays for desktop
    let state = lifecycle.resolve(VisualState::Expanded, true, MobileStatePolicy::Auto);

    assert_eq!(state, VisualState::Collapsed);
    assert_eq!(stored(&store).as_deref(), Some("closed"));
}

#[test]
fn test_forced_state_is_not_persisted() {
    let store = Arc::new(MemoryStore::new());
    let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());

    let state = lifecycle.resolve(VisualState::Collapsed, true, MobileStatePolicy::ForceClosed);

    assert_eq!(state, VisualState::Closed);
    assert_eq!(stored(&store), None);
}

#[test]
fn test_unrecognized_stored_value_falls_back_to_default() {
    let store = Arc::new(MemoryStore::new());
    store.set(KEY, "minimized").unwrap();
    let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());

    let state = lifecycle.resolve(VisualState::Expanded, false, MobileStatePolicy::Auto);

    assert_eq!(state, VisualState::Expanded);
    assert_eq!(stored(&store).as_deref(), Some("expanded"));
}

#[test]
fn test_transition_persists_every_result() {
    let store = Arc::new(MemoryStore::new());
    let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());
    lifecycle.resolve(VisualState::Expanded, false, MobileStatePolicy::Auto);

    assert_eq!(lifecycle.transition(Transition::Collapse), VisualState::Collapsed);
    assert_eq!(stored(&store).as_deref(), Some("collapsed"));

    assert_eq!(lifecycle.transition(Transition::Close), VisualState::Closed);
    assert_eq!(stored(&store).as_deref(), Some("closed"));

    assert_eq!(lifecycle.transition(Transition::Expand), VisualState::Expanded);
    assert_eq!(stored(&store).as_deref(), Some("expanded"));
}

#[test]
fn test_close_disabled_never_persists_closed() {
    let store = Arc::new(MemoryStore::new());
    let rules = TransitionRules {
        is_floating: true,
        allow_close: false,
    };
    let mut lifecycle = lifecycle_with(store.clone(), rules);
    lifecycle.resolve(VisualState::Expanded, false, MobileStatePolicy::Auto);

    assert_eq!(lifecycle.transition(Transition::Close), VisualState::Collapsed);
    assert_eq!(stored(&store).as_deref(), Some("collapsed"));
}

#[test]
fn test_transition_then_resolve_roundtrip() {
    let store = Arc::new(MemoryStore::new());

    for action in [Transition::Collapse, Transition::Close, Transition::Expand] {
        let mut lifecycle = lifecycle_with(store.clone(), TransitionRules::default());
        lifecycle.resolve(VisualState::Expanded, false, MobileStatePolicy::Auto);
        let written = lifecycle.transition(action);

        let mut reloaded = lifecycle_with(store.clone(), TransitionRules::default());
        assert_eq!(
            reloaded.resolve(VisualState::Expanded, false, MobileStatePolicy::Auto),
            written
        );
    }
}

#[test]
fn test_store_failure_degrades_to_memory() {
    let mut lifecycle = WidgetLifecycle::new(
        Arc::new(FailingStore),
        "s1",
        "example.com",
        TransitionRules::default(),
    );

    let state = lifecycle.resolve(VisualState::Collapsed, false, MobileStatePolicy::Auto);
    assert_eq!(state, VisualState::Collapsed);
    assert!(lifecycle.is_memory_only());

    assert_eq!(lifecycle.transition(Transition::Expand), VisualState::Expanded);
    assert_eq!(lifecycle.current(), Some(VisualState::Expanded));
}
