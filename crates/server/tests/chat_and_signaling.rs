#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end coverage over a real bound socket: register/login, private
//! messaging with delivery tracking, and the WebRTC signaling room flow.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use parlor_config::ServerConfig;
use parlor_db::Repository;
use parlor_server::{ServerState, server::build_app};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

async fn start_server() -> SocketAddr {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    parlor_db::run_migrations(&pool).await.unwrap();
    let repo = Repository::new(pool);
    let config = ServerConfig {
        pbkdf2_iterations: 10, // cheap hashing for fast tests
        ..ServerConfig::default()
    };
    let state = ServerState::new(repo, &config);
    let app = build_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn recv_json(ws: &mut WsStream) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(t) => return serde_json::from_str(&t).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn register_and_login(ws: &mut WsStream, username: &str) -> i64 {
    send(ws, json!({
        "type": "register",
        "username": username,
        "password": "hunter2hunter",
        "email": format!("{username}@example.com"),
    }))
    .await;
    let resp = recv_json(ws).await;
    assert_eq!(resp["status"], "success");

    send(ws, json!({
        "type": "login",
        "username": username,
        "password": "hunter2hunter",
    }))
    .await;
    let resp = recv_json(ws).await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["type"], "auth_success");
    resp["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn register_then_login_round_trips_user_id() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;
    let user_id = register_and_login(&mut ws, "alice").await;
    assert!(user_id > 0);
}

#[tokio::test]
async fn rejects_unknown_message_type_without_closing_connection() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;
    send(&mut ws, json!({ "type": "frobnicate" })).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["status"], "error");

    // Connection is still alive — a valid request afterwards still works.
    let user_id = register_and_login(&mut ws, "bob").await;
    assert!(user_id > 0);
}

#[tokio::test]
async fn private_message_delivers_to_online_recipient() {
    let addr = start_server().await;

    let mut alice_ws = connect(addr).await;
    let alice_id = register_and_login(&mut alice_ws, "alice2").await;

    let mut bob_ws = connect(addr).await;
    let bob_id = register_and_login(&mut bob_ws, "bob2").await;

    send(&mut alice_ws, json!({
        "type": "private_message",
        "sender_id": alice_id,
        "receiver_id": bob_id,
        "content": "hey bob",
    }))
    .await;

    let ack = recv_json(&mut alice_ws).await;
    assert_eq!(ack["type"], "message_sent");
    assert_eq!(ack["data"]["delivered"], true);

    let push = recv_json(&mut bob_ws).await;
    assert_eq!(push["type"], "private_message");
    assert_eq!(push["data"]["content"], "hey bob");
}

#[tokio::test]
async fn private_message_to_offline_user_is_not_delivered() {
    let addr = start_server().await;

    let mut alice_ws = connect(addr).await;
    let alice_id = register_and_login(&mut alice_ws, "alice3").await;

    // Register bob but never log in on a live connection.
    send(&mut alice_ws, json!({
        "type": "register",
        "username": "bob3",
        "password": "hunter2hunter",
        "email": "bob3@example.com",
    }))
    .await;
    let resp = recv_json(&mut alice_ws).await;
    let bob_id = resp["data"]["id"].as_i64().unwrap();

    send(&mut alice_ws, json!({
        "type": "private_message",
        "sender_id": alice_id,
        "receiver_id": bob_id,
        "content": "are you there?",
    }))
    .await;
    let ack = recv_json(&mut alice_ws).await;
    assert_eq!(ack["data"]["delivered"], false);
}

#[tokio::test]
async fn second_login_evicts_first_connection() {
    let addr = start_server().await;

    let mut first = connect(addr).await;
    register_and_login(&mut first, "carol").await;

    let mut second = connect(addr).await;
    send(&mut second, json!({
        "type": "login",
        "username": "carol",
        "password": "hunter2hunter",
    }))
    .await;
    let resp = recv_json(&mut second).await;
    assert_eq!(resp["status"], "success");

    let notice = recv_json(&mut first).await;
    assert_eq!(notice["status"], "error");
}

#[tokio::test]
async fn unauthenticated_non_auth_message_is_rejected() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;

    send(&mut ws, json!({ "type": "join", "room_id": "room-1", "name": "alice" })).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["status"], "error");

    send(&mut ws, json!({ "type": "get_user_contacts" })).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["status"], "error");

    // The connection is still alive and can still authenticate afterwards.
    let user_id = register_and_login(&mut ws, "dave").await;
    assert!(user_id > 0);
}

#[tokio::test]
async fn signaling_room_join_offer_answer_and_leave() {
    let addr = start_server().await;

    let mut a = connect(addr).await;
    register_and_login(&mut a, "signal_alice").await;
    send(&mut a, json!({ "type": "join", "room_id": "room-1", "name": "alice" })).await;
    let a_list = recv_json(&mut a).await;
    assert_eq!(a_list["type"], "user-list");
    assert_eq!(a_list["users"].as_array().unwrap().len(), 0);

    let mut b = connect(addr).await;
    register_and_login(&mut b, "signal_bob").await;
    send(&mut b, json!({ "type": "join", "room_id": "room-1", "name": "bob" })).await;
    let b_list = recv_json(&mut b).await;
    assert_eq!(b_list["users"].as_array().unwrap().len(), 1);

    let joined = recv_json(&mut a).await;
    assert_eq!(joined["type"], "user-joined");
    let bob_conn_id = joined["user_id"].as_str().unwrap().to_string();

    send(&mut b, json!({
        "type": "offer",
        "target_id": b_list["users"][0]["id"],
        "offer": "sdp-offer-blob",
    }))
    .await;
    let offer = recv_json(&mut a).await;
    assert_eq!(offer["type"], "offer");
    assert_eq!(offer["sender_id"], bob_conn_id);
    assert_eq!(offer["offer"], "sdp-offer-blob");

    send(&mut a, json!({
        "type": "answer",
        "target_id": bob_conn_id,
        "answer": "sdp-answer-blob",
    }))
    .await;
    let answer = recv_json(&mut b).await;
    assert_eq!(answer["type"], "answer");
    assert_eq!(answer["answer"], "sdp-answer-blob");

    send(&mut b, json!({ "type": "leave" })).await;
    let left = recv_json(&mut a).await;
    assert_eq!(left["type"], "user-left");
}

#[tokio::test]
async fn user_contacts_reply_includes_contacts_and_groups() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;
    register_and_login(&mut ws, "contactsuser").await;

    send(&mut ws, json!({ "type": "get_user_contacts" })).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["type"], "user_contacts");
    assert!(resp["data"]["contacts"].as_array().unwrap().is_empty());
    assert!(resp["data"]["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn group_message_fans_out_to_online_members() {
    let addr = start_server().await;

    let mut owner_ws = connect(addr).await;
    register_and_login(&mut owner_ws, "group_owner").await;

    let mut member_ws = connect(addr).await;
    let member_id = register_and_login(&mut member_ws, "group_member").await;

    send(&mut owner_ws, json!({
        "type": "create_group",
        "name": "team room",
        "members": [member_id],
    }))
    .await;
    let resp = recv_json(&mut owner_ws).await;
    assert_eq!(resp["type"], "group_created");
    let group_id = resp["data"]["group_id"].as_i64().unwrap();

    send(&mut owner_ws, json!({
        "type": "group_message",
        "group_id": group_id,
        "content": "hello team",
    }))
    .await;
    let ack = recv_json(&mut owner_ws).await;
    assert_eq!(ack["type"], "message_sent");
    assert_eq!(ack["data"]["delivered_count"], 1);

    let push = recv_json(&mut member_ws).await;
    assert_eq!(push["type"], "group_message");
    assert_eq!(push["data"]["content"], "hello team");
}
