use super::*;
use crate::state::test_helpers::rect;
use serde_json::json;
use tokio::time::timeout;

const SWEEP: Duration = Duration::from_secs(3600);

async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("frame timeout")
        .expect("channel closed")
}

async fn recv_event(rx: &mut mpsc::Receiver<Frame>, event: &str) -> Frame {
    loop {
        let frame = recv(rx).await;
        if frame.event == event {
            return frame;
        }
    }
}

async fn connect(hub: &HubHandle) -> (Uuid, mpsc::Receiver<Frame>) {
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(64);
    hub.connect(id, tx).await.expect("connect");
    assert_eq!(recv(&mut rx).await.event, "connected");
    (id, rx)
}

#[tokio::test]
async fn snapshot_of_unknown_room_does_not_create_it() {
    let (hub, _task) = spawn(16, SWEEP);

    let snapshot = hub.snapshot("nowhere").await.expect("snapshot");
    assert_eq!(snapshot, RoomSnapshot { room_id: "nowhere".into(), exists: false, elements: vec![] });

    let stats = hub.stats().await.expect("stats");
    assert_eq!(stats.rooms, 0);
}

#[tokio::test]
async fn commands_apply_in_order_and_queries_observe_them() {
    let (hub, _task) = spawn(16, SWEEP);
    let (a, mut rx_a) = connect(&hub).await;

    hub.inbound(a, Frame::request("userJoined", json!({"name": "A", "roomid": "R"})))
        .await
        .expect("inbound");
    hub.inbound(
        a,
        Frame::request(
            "draw",
            json!({"roomid": "R", "element": {"type": "rect", "x1": 0, "y1": 0, "x2": 1, "y2": 1}}),
        ),
    )
    .await
    .expect("inbound");

    let snapshot = hub.snapshot("R").await.expect("snapshot");
    assert!(snapshot.exists);
    assert_eq!(snapshot.elements, vec![rect(0.0, 0.0, 1.0, 1.0)]);

    let users = hub.users("R").await.expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "A");

    assert_eq!(hub.stats().await.expect("stats"), HubStats { connections: 1, rooms: 1, users: 1 });
    assert!(recv_event(&mut rx_a, "userIsJoined").await.parent_id.is_some());
}

#[tokio::test]
async fn disconnect_through_handle_notifies_peers() {
    let (hub, _task) = spawn(16, SWEEP);
    let (a, _rx_a) = connect(&hub).await;
    let (b, mut rx_b) = connect(&hub).await;
    for (id, name) in [(a, "A"), (b, "B")] {
        hub.inbound(id, Frame::request("userJoined", json!({"name": name, "roomid": "R"})))
            .await
            .expect("inbound");
    }

    hub.disconnect(a).await.expect("disconnect");

    let left = recv_event(&mut rx_b, "userLeftNotification").await;
    assert_eq!(left.data, json!("A left the room"));
    assert_eq!(hub.stats().await.expect("stats"), HubStats { connections: 1, rooms: 0, users: 1 });
}

#[tokio::test(start_paused = true)]
async fn sweep_reclaims_room_after_last_user_leaves() {
    let (hub, _task) = spawn(16, Duration::from_secs(60));
    let (a, _rx_a) = connect(&hub).await;
    hub.inbound(a, Frame::request("userJoined", json!({"name": "A", "roomid": "R"})))
        .await
        .expect("inbound");
    hub.inbound(a, Frame::request("clearCanvas", json!({"roomid": "R"})))
        .await
        .expect("inbound");
    assert!(hub.snapshot("R").await.expect("snapshot").exists);

    hub.disconnect(a).await.expect("disconnect");
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(!hub.snapshot("R").await.expect("snapshot").exists);
}

#[tokio::test]
async fn stopped_hub_reports_closed() {
    let (hub, task) = spawn(16, SWEEP);
    task.abort();
    let _ = task.await;

    assert!(matches!(hub.stats().await, Err(HubError::Closed)));
    assert!(matches!(hub.disconnect(Uuid::new_v4()).await, Err(HubError::Closed)));
}
