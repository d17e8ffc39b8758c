//! Rewind scenarios, run against every backend.

#![allow(unused_results)]

mod common;

use std::sync::Arc;

use chrono::Duration;

use rewind_core::{Breakpoint, ConversationId, DialogContent, Role, StateEntry, StateValue};
use rewind_logging::{ContentLogEntry, SqliteAuditLog, StateLogEntry};
use rewind_store::ConversationStore;

use common::{backends, create, message_ids, t, timeline};

fn dialog_count(store: &ConversationStore, id: &ConversationId) -> u64 {
    store.get_conversation(id).unwrap().unwrap().dialog_count
}

#[test]
fn truncate_keeps_prefix_before_first_occurrence() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store
            .dialogs()
            .append(&id, &timeline(&["m1", "m1", "m2", "m3", "m4"]))
            .unwrap();

        let removed = store.truncate(&id, "m2", false).unwrap();

        assert_eq!(removed, vec!["m2", "m3", "m4"], "{}", b.name);
        let remaining = store.dialogs().list(&id).unwrap();
        assert_eq!(message_ids(&remaining), vec!["m1", "m1"], "{}", b.name);
        assert_eq!(dialog_count(store, &id), 2, "{}", b.name);
    }
}

#[test]
fn truncate_excludes_turn_values_of_cutoff() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2"])).unwrap();
        let a = StateValue::text("A", "agent").for_message("m1").at(t(0));
        let topic = StateEntry::turn("topic")
            .with_value(a.clone())
            .with_value(StateValue::text("B", "agent").for_message("m2").at(t(10)));
        store.state().replace(&id, vec![topic]).unwrap();

        store.truncate(&id, "m2", false).unwrap();

        let state = store.state().get(&id).unwrap();
        assert_eq!(state.len(), 1, "{}", b.name);
        assert_eq!(state[0].values, vec![a], "{}", b.name);
    }
}

#[test]
fn truncate_preserves_session_state() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2", "m3"])).unwrap();
        let locale = StateEntry::session("locale")
            .with_value(StateValue::text("en-US", "user").for_message("m3").at(t(25)));
        store.state().replace(&id, vec![locale.clone()]).unwrap();

        for cutoff in ["m3", "m2", "m1"] {
            store.truncate(&id, cutoff, false).unwrap();
            assert_eq!(store.state().get(&id).unwrap(), vec![locale.clone()], "{}", b.name);
        }
    }
}

#[test]
fn truncate_drops_breakpoints_at_or_after_boundary() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2"])).unwrap();
        let b1 = Breakpoint::new(t(0)).for_message("m1").created_at(t(5));
        let b2 = Breakpoint::new(t(10)).for_message("m2").created_at(t(25));
        store.breakpoints().append(&id, b1.clone()).unwrap();
        store.breakpoints().append(&id, b2.clone()).unwrap();
        assert_eq!(store.breakpoints().latest(&id).unwrap(), Some(b2), "{}", b.name);

        store.truncate(&id, "m2", false).unwrap();

        assert_eq!(store.breakpoints().list(&id).unwrap(), vec![b1.clone()], "{}", b.name);
        assert_eq!(store.breakpoints().latest(&id).unwrap(), Some(b1), "{}", b.name);
    }
}

#[test]
fn unknown_cutoff_mutates_nothing() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2"])).unwrap();
        store
            .state()
            .replace(&id, vec![StateEntry::turn("k").with_value(StateValue::text("v", "a").at(t(15)))])
            .unwrap();
        store.breakpoints().append(&id, Breakpoint::new(t(0)).created_at(t(15))).unwrap();
        let summary = store.get_conversation(&id).unwrap();
        let state = store.state().get(&id).unwrap();

        let removed = store.truncate(&id, "m9", true).unwrap();

        assert!(removed.is_empty(), "{}", b.name);
        assert_eq!(store.dialogs().count(&id).unwrap(), 2, "{}", b.name);
        assert_eq!(store.state().get(&id).unwrap(), state, "{}", b.name);
        assert_eq!(store.breakpoints().list(&id).unwrap().len(), 1, "{}", b.name);
        assert_eq!(store.get_conversation(&id).unwrap(), summary, "{}", b.name);
    }
}

#[test]
fn second_truncate_is_noop() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2", "m3"])).unwrap();

        let first = store.truncate(&id, "m2", false).unwrap();
        let after_first = store.dialogs().list(&id).unwrap();
        let second = store.truncate(&id, "m2", false).unwrap();

        assert_eq!(first, vec!["m2", "m3"], "{}", b.name);
        assert!(second.is_empty(), "{}", b.name);
        assert_eq!(store.dialogs().list(&id).unwrap(), after_first, "{}", b.name);
        assert_eq!(dialog_count(store, &id), 1, "{}", b.name);
    }
}

#[test]
fn sub_microsecond_times_rewind_alike_on_every_backend() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        let m1 = common::entry("m1", 0);
        let m2 = common::entry("m2", 0).at(t(0) + Duration::nanoseconds(900));
        store.dialogs().append(&id, &[m1, m2]).unwrap();
        let early = StateValue::text("A", "agent")
            .for_message("m1")
            .at(t(0) + Duration::nanoseconds(100));
        store
            .state()
            .replace(&id, vec![StateEntry::turn("topic").with_value(early)])
            .unwrap();
        store
            .breakpoints()
            .append(&id, Breakpoint::new(t(0)).created_at(t(0) + Duration::nanoseconds(500)))
            .unwrap();

        assert_eq!(store.truncate(&id, "m2", false).unwrap(), vec!["m2"], "{}", b.name);

        assert!(store.state().get(&id).unwrap().is_empty(), "{}", b.name);
        assert!(store.breakpoints().list(&id).unwrap().is_empty(), "{}", b.name);
        assert_eq!(dialog_count(store, &id), 1, "{}", b.name);
    }
}

#[test]
fn truncate_unknown_or_empty_conversation() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "empty");
        assert!(store.truncate(&id, "m1", false).unwrap().is_empty(), "{}", b.name);
        assert!(
            store
                .truncate(&ConversationId::from("ghost"), "m1", true)
                .unwrap()
                .is_empty(),
            "{}",
            b.name
        );
    }
}

#[test]
fn truncate_leaves_other_conversations_alone() {
    for b in backends() {
        let store = &b.store;
        let a = create(store, "a");
        let other = create(store, "b");
        store.dialogs().append(&a, &timeline(&["m1", "m2"])).unwrap();
        store.dialogs().append(&other, &timeline(&["m1", "m2"])).unwrap();

        store.truncate(&a, "m1", false).unwrap();

        assert_eq!(store.dialogs().count(&a).unwrap(), 0, "{}", b.name);
        assert_eq!(store.dialogs().count(&other).unwrap(), 2, "{}", b.name);
        assert_eq!(dialog_count(store, &other), 2, "{}", b.name);
    }
}

#[test]
fn append_after_truncate_keeps_counter_in_sync() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m2", "m3"])).unwrap();
        store.truncate(&id, "m2", false).unwrap();
        store.dialogs().append(&id, &timeline(&["m2b", "m3b"])).unwrap();

        let listed = store.dialogs().list(&id).unwrap();
        assert_eq!(message_ids(&listed), vec!["m1", "m2b", "m3b"], "{}", b.name);
        assert_eq!(dialog_count(store, &id), 3, "{}", b.name);
    }
}

#[test]
fn update_entry_content_everywhere() {
    for b in backends() {
        let store = &b.store;
        let id = create(store, "c1");
        store.dialogs().append(&id, &timeline(&["m1", "m1"])).unwrap();

        let updated = store
            .dialogs()
            .update_entry_content(&id, "m1", Role::User, 1, &DialogContent::text("edited"))
            .unwrap();

        assert!(updated, "{}", b.name);
        let listed = store.dialogs().list(&id).unwrap();
        assert_ne!(listed[0].content, "edited", "{}", b.name);
        assert_eq!(listed[1].content, "edited", "{}", b.name);
    }
}

#[test]
fn clean_logs_purges_audit_log_from_boundary() {
    for b in backends() {
        let audit = Arc::new(SqliteAuditLog::in_memory().unwrap());
        let store = b.store.clone().with_log_purger(audit.clone());
        let id = create(&store, "c1");
        let entries = timeline(&["m1", "m2", "m3"]);
        store.dialogs().append(&id, &entries).unwrap();
        for e in &entries {
            audit.record_content(&ContentLogEntry::from_dialog(&id, e)).unwrap();
        }
        let value = StateValue::text("x", "agent").for_message("m3").at(t(20));
        audit
            .record_state(&StateLogEntry::from_value(&id, "topic", &value))
            .unwrap();

        store.truncate(&id, "m2", true).unwrap();

        let content = audit.content_logs(&id).unwrap();
        assert_eq!(content.len(), 1, "{}", b.name);
        assert_eq!(content[0].message_id, "m1", "{}", b.name);
        assert!(audit.state_logs(&id).unwrap().is_empty(), "{}", b.name);
    }
}

#[test]
fn clean_logs_disabled_keeps_audit_log() {
    let b = common::memory();
    let audit = Arc::new(SqliteAuditLog::in_memory().unwrap());
    let store = b.store.clone().with_log_purger(audit.clone());
    let id = create(&store, "c1");
    let entries = timeline(&["m1", "m2"]);
    store.dialogs().append(&id, &entries).unwrap();
    for e in &entries {
        audit.record_content(&ContentLogEntry::from_dialog(&id, e)).unwrap();
    }

    store.truncate(&id, "m1", false).unwrap();

    assert_eq!(audit.content_logs(&id).unwrap().len(), 2);
}
