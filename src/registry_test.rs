use super::*;
use std::sync::Arc;

#[test]
fn join_creates_room_and_counts_members() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    let b = ConnectionId::new();

    assert_eq!(registry.join("abc", a), 1);
    assert_eq!(registry.join("abc", b), 2);
    assert_eq!(registry.room_count(), 1);
    assert!(registry.contains("abc", a));
    assert!(registry.contains("abc", b));
}

#[test]
fn join_is_idempotent() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    assert_eq!(registry.join("abc", a), 1);
    assert_eq!(registry.join("abc", a), 1);
    assert_eq!(registry.member_count("abc"), 1);
}

#[test]
fn room_ids_are_case_sensitive() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    registry.join("abc", a);
    assert!(!registry.contains("ABC", a));
    assert_eq!(registry.member_count("ABC"), 0);
}

#[test]
fn leave_reports_remaining_then_emptied() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    registry.join("abc", a);
    registry.join("abc", b);

    assert_eq!(registry.leave("abc", a), Departure::Remaining(1));
    assert_eq!(registry.leave("abc", b), Departure::Emptied);
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn leave_by_non_member_is_a_no_op() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    let stranger = ConnectionId::new();
    registry.join("abc", a);

    assert_eq!(registry.leave("abc", stranger), Departure::NotMember);
    assert_eq!(registry.leave("missing", a), Departure::NotMember);
    assert_eq!(registry.member_count("abc"), 1);
    assert_eq!(registry.room_count(), 1);
}

#[test]
fn remove_everywhere_reports_only_touched_rooms() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    registry.join("r1", a);
    registry.join("r1", b);
    registry.join("r2", a);
    registry.join("r3", b);

    let mut touched = registry.remove_connection_everywhere(a);
    touched.sort();
    assert_eq!(touched, vec![("r1".to_string(), 1), ("r2".to_string(), 0)]);

    assert_eq!(registry.member_count("r1"), 1);
    assert_eq!(registry.member_count("r3"), 1);
    assert_eq!(registry.room_count(), 2, "emptied r2 is dropped");
}

#[test]
fn remove_everywhere_for_unknown_connection_touches_nothing() {
    let registry = RoomRegistry::new();
    registry.join("r1", ConnectionId::new());
    assert!(registry.remove_connection_everywhere(ConnectionId::new()).is_empty());
    assert_eq!(registry.member_count("r1"), 1);
}

#[test]
fn with_members_sees_live_set() {
    let registry = RoomRegistry::new();
    let a = ConnectionId::new();
    registry.join("abc", a);

    let seen = registry.with_members("abc", |members| members.contains(&a));
    assert_eq!(seen, Some(true));
    assert!(registry.with_members("missing", |_| ()).is_none());
}

#[test]
fn concurrent_joins_and_leaves_are_not_lost() {
    let registry = Arc::new(RoomRegistry::new());
    let stayers: Vec<ConnectionId> = (0..64).map(|_| ConnectionId::new()).collect();
    let leavers: Vec<ConnectionId> = (0..64).map(|_| ConnectionId::new()).collect();
    for id in &leavers {
        registry.join("busy", *id);
    }

    let mut handles = Vec::new();
    for (stay, leave) in stayers.iter().copied().zip(leavers.iter().copied()) {
        let registry = Arc::clone(&registry);
        handles.push(std::thread::spawn(move || {
            registry.join("busy", stay);
            registry.leave("busy", leave);
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    assert_eq!(registry.member_count("busy"), stayers.len());
    for id in &stayers {
        assert!(registry.contains("busy", *id));
    }
}
