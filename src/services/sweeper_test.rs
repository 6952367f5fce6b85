use super::*;
use crate::state::test_helpers::rect;
use uuid::Uuid;

#[test]
fn empty_room_is_discarded_and_occupied_room_kept() {
    let mut rooms = RoomStore::new();
    let mut presence = PresenceRegistry::new();
    rooms.append_element("empty", rect(0.0, 0.0, 1.0, 1.0));
    rooms.append_element("busy", rect(0.0, 0.0, 2.0, 2.0));
    presence.add(Uuid::new_v4(), "A", "busy");

    let reclaimed = sweep(&mut rooms, &presence);

    assert_eq!(reclaimed, vec!["empty".to_owned()]);
    assert!(!rooms.contains("empty"));
    assert_eq!(rooms.get_elements("busy"), vec![rect(0.0, 0.0, 2.0, 2.0)]);
}

#[test]
fn room_emptied_before_sweep_loses_canvas() {
    let mut rooms = RoomStore::new();
    let mut presence = PresenceRegistry::new();
    let c1 = Uuid::new_v4();
    presence.add(c1, "A", "R");
    rooms.append_element("R", rect(0.0, 0.0, 1.0, 1.0));

    presence.remove(c1);
    sweep(&mut rooms, &presence);

    // The next joiner finds nothing.
    presence.add(Uuid::new_v4(), "B", "R");
    assert!(rooms.get_elements("R").is_empty());
    assert!(rooms.room("R").is_none());
}

#[test]
fn rejoin_before_sweep_keeps_canvas() {
    let mut rooms = RoomStore::new();
    let mut presence = PresenceRegistry::new();
    let c1 = Uuid::new_v4();
    presence.add(c1, "A", "R");
    rooms.append_element("R", rect(0.0, 0.0, 1.0, 1.0));

    presence.remove(c1);
    presence.add(Uuid::new_v4(), "A", "R");
    assert!(sweep(&mut rooms, &presence).is_empty());
    assert_eq!(rooms.get_elements("R").len(), 1);
}

#[test]
fn sweep_of_empty_store_is_noop() {
    let mut rooms = RoomStore::new();
    assert!(sweep(&mut rooms, &PresenceRegistry::new()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn interval_does_not_fire_immediately() {
    let mut ticker = sweep_interval(Duration::from_secs(60));
    let early = tokio::time::timeout(Duration::from_secs(59), ticker.tick()).await;
    assert!(early.is_err(), "first tick must wait a full period");
    ticker.tick().await;
}
