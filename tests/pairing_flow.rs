//! Integration tests for the core rendezvous flow: joining, pairing,
//! relaying, mode switching, and disconnect requeue.

mod common;

use common::TestServer;

#[tokio::test]
async fn happy_text_pairing() {
    let server = TestServer::spawn(18180).await.expect("spawn server");

    let mut x = server.connect("X", "fp-x").await.expect("connect X");
    let mut y = server.connect("Y", "fp-y").await.expect("connect Y");

    x.join_text("X").await.expect("X join-text");
    let waiting = x.recv().await.expect("X waiting");
    assert_eq!(common::TestClient::msg_type(&waiting), "waiting");

    y.join_text("Y").await.expect("Y join-text");

    let x_paired = x.recv().await.expect("X paired");
    assert_eq!(common::TestClient::msg_type(&x_paired), "paired");
    assert_eq!(x_paired["partnerId"], "Y");
    assert!(x_paired.get("isOfferer").is_none());

    let y_paired = y.recv().await.expect("Y paired");
    assert_eq!(common::TestClient::msg_type(&y_paired), "paired");
    assert_eq!(y_paired["partnerId"], "X");

    y.text_message("Y", "X", "hi").await.expect("Y sends text");
    let delivered = x.recv().await.expect("X receives text");
    assert_eq!(common::TestClient::msg_type(&delivered), "text-message");
    assert_eq!(delivered["from"], "Y");
    assert_eq!(delivered["message"], "hi");
}

#[tokio::test]
async fn self_pair_guard_rejoin_does_not_pair_with_self() {
    let server = TestServer::spawn(18181).await.expect("spawn server");
    let mut x = server.connect("dup", "fp-dup").await.expect("connect");

    x.join_text("dup").await.expect("first join");
    let first = x.recv().await.expect("first reply");
    assert_eq!(common::TestClient::msg_type(&first), "waiting");

    // Re-joining with the same userId moves the existing queue entry
    // rather than creating a second one to match against.
    x.join_text("dup").await.expect("second join");
    let second = x.recv().await.expect("second reply");
    assert_eq!(common::TestClient::msg_type(&second), "waiting");
}

#[tokio::test]
async fn mode_switch_text_to_video() {
    let server = TestServer::spawn(18182).await.expect("spawn server");
    let mut x = server.connect("X", "fp-x").await.expect("connect X");
    let mut y = server.connect("Y", "fp-y").await.expect("connect Y");

    x.join_text("X").await.expect("X join");
    let _ = x.recv().await.expect("X waiting");
    y.join_text("Y").await.expect("Y join");
    let _ = x.recv().await.expect("X paired");
    let _ = y.recv().await.expect("Y paired");

    x.mode_switch_to_video("X", "Y").await.expect("X requests switch");
    // Nothing is sent to either side yet.
    let nothing_yet = x
        .recv_timeout(std::time::Duration::from_millis(200))
        .await;
    assert!(nothing_yet.is_err());

    y.mode_switch_to_video("Y", "X").await.expect("Y completes switch");

    let x_ready = x.recv().await.expect("X video-mode-ready");
    assert_eq!(common::TestClient::msg_type(&x_ready), "video-mode-ready");
    assert_eq!(x_ready["isOfferer"], true);
    assert_eq!(x_ready["partnerId"], "Y");

    let y_ready = y.recv().await.expect("Y video-mode-ready");
    assert_eq!(common::TestClient::msg_type(&y_ready), "video-mode-ready");
    assert_eq!(y_ready["isOfferer"], false);
    assert_eq!(y_ready["partnerId"], "X");
}

#[tokio::test]
async fn disconnect_requeues_partner() {
    let server = TestServer::spawn(18183).await.expect("spawn server");
    let mut x = server.connect("X", "fp-x").await.expect("connect X");
    let mut y = server.connect("Y", "fp-y").await.expect("connect Y");

    x.join_text("X").await.expect("X join");
    let _ = x.recv().await.expect("X waiting");
    y.join_text("Y").await.expect("Y join");
    let _ = x.recv().await.expect("X paired");
    let _ = y.recv().await.expect("Y paired");

    drop(x);

    let partner_disconnected = y.recv().await.expect("Y partner-disconnected");
    assert_eq!(
        common::TestClient::msg_type(&partner_disconnected),
        "partner-disconnected"
    );
    let waiting = y.recv().await.expect("Y requeued");
    assert_eq!(common::TestClient::msg_type(&waiting), "waiting");
}
