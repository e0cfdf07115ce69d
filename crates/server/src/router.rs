//! The message router: matches the decoded
//! [`InboundMessage`] sum type and dispatches to the handler for that
//! operation. One router, one match arm per variant — no string-keyed
//! method table.

use parlor_common::ServerError;
use parlor_protocol::{
    InboundMessage,
    inbound::{
        CreateGroupPayload, CreateRoomPayload, GroupMessagePayload, IceCandidatePayload,
        JoinPayload, LoginPayload, OfferPayload, PrivateMessagePayload, RegisterPayload,
        allowed_pre_auth,
    },
    outbound::{Envelope, RelayFrame},
};
use serde_json::json;

use crate::{
    connection::{ConnectionHandle, ConnectionState},
    delivery,
    sessions::Registered,
    signaling,
    state::ServerState,
};

/// What the caller should do after a successful dispatch.
pub enum Outcome {
    /// Send this envelope back to the requesting connection.
    Reply(Envelope),
    /// The handler already sent everything it needed to (signaling
    /// handlers talk to the room registry directly); nothing more to do.
    Handled,
}

/// Dispatch one decoded message. `conn_state`/`current_room` are the
/// connection's local, mutable state — owned by the connection task, not
/// shared — so handlers update them in place.
pub async fn dispatch(
    state: &ServerState,
    conn: &ConnectionHandle,
    conn_state: &mut ConnectionState,
    current_room: &mut Option<String>,
    msg: InboundMessage,
) -> Result<Outcome, ServerError> {
    if !allowed_pre_auth(&msg) && !conn_state.is_authorized() {
        return Err(ServerError::Unauthorized);
    }

    match msg {
        InboundMessage::Register(p) => handle_register(state, p).await,
        InboundMessage::Login(p) => handle_login(state, conn, conn_state, p).await,
        InboundMessage::CreateGroup(p) => {
            let owner_id = conn_state.user_id().expect("gated by allowed_pre_auth");
            handle_create_group(state, owner_id, p).await
        },
        InboundMessage::PrivateMessage(p) => {
            let sender_id = conn_state.user_id().expect("gated by allowed_pre_auth");
            handle_private_message(state, sender_id, p).await
        },
        InboundMessage::GroupMessage(p) => {
            let sender_id = conn_state.user_id().expect("gated by allowed_pre_auth");
            handle_group_message(state, sender_id, p).await
        },
        InboundMessage::GetUserContacts => {
            let user_id = conn_state.user_id().expect("gated by allowed_pre_auth");
            handle_get_contacts(state, user_id).await
        },
        InboundMessage::Join(p) => handle_join(state, conn, current_room, p).await,
        InboundMessage::Leave => handle_leave(state, conn, current_room).await,
        InboundMessage::CreateRoom(p) => handle_create_room(p),
        InboundMessage::Offer(p) => handle_offer(state, conn, current_room, p).await,
        InboundMessage::Answer(p) => handle_answer(state, conn, current_room, p).await,
        InboundMessage::IceCandidate(p) => {
            handle_ice_candidate(state, conn, current_room, p).await
        },
    }
}

async fn handle_register(state: &ServerState, p: RegisterPayload) -> Result<Outcome, ServerError> {
    let salt = parlor_auth::new_salt();
    let hash = state.hasher.hash(&p.password, &salt);
    let user = state
        .repo
        .create_user(&p.username, &p.email, &hash, &salt)
        .await?;
    let data = serde_json::to_value(&user).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Outcome::Reply(Envelope::success("auth_success", Some(data))))
}

async fn handle_login(
    state: &ServerState,
    conn: &ConnectionHandle,
    conn_state: &mut ConnectionState,
    p: LoginPayload,
) -> Result<Outcome, ServerError> {
    let user = state
        .repo
        .get_user_by_username(&p.username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !state
        .hasher
        .verify(&p.password, &user.salt, &user.password_hash)
    {
        return Err(ServerError::InvalidCredentials);
    }

    // A second login for the same user evicts the first rather than being
    // rejected: the displaced connection is notified, then closed.
    if let Registered::Evicted(old) = state.sessions.register(user.id, conn.clone()).await {
        let notice = Envelope::error("logged in from another connection");
        if let Ok(json) = serde_json::to_string(&notice) {
            old.send(&json);
        }
        old.close();
    }

    *conn_state = ConnectionState::Authorized {
        user_id: user.id,
        username: user.username.clone(),
    };

    let data = serde_json::to_value(&user).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Outcome::Reply(Envelope::success("auth_success", Some(data))))
}

async fn handle_create_group(
    state: &ServerState,
    owner_id: i64,
    p: CreateGroupPayload,
) -> Result<Outcome, ServerError> {
    let group = state
        .repo
        .create_group(&p.name, owner_id, &p.members)
        .await?;
    let members = state.repo.list_group_members(group.id).await?;
    Ok(Outcome::Reply(Envelope::success(
        "group_created",
        Some(json!({
            "group_id": group.id,
            "name": group.name,
            "members": members,
        })),
    )))
}

async fn handle_private_message(
    state: &ServerState,
    sender_id: i64,
    p: PrivateMessagePayload,
) -> Result<Outcome, ServerError> {
    if p.sender_id != sender_id {
        return Err(ServerError::Unauthorized);
    }
    if state.repo.get_user_by_id(p.receiver_id).await?.is_none() {
        return Err(ServerError::Validation("receiver does not exist".into()));
    }

    let message = state
        .repo
        .create_private_message(sender_id, p.receiver_id, &p.content)
        .await?;

    let push = Envelope::success(
        "private_message",
        Some(json!({
            "message_id": message.id,
            "sender_id": message.sender_id,
            "content": message.content,
            "sent_at": message.sent_at,
        })),
    );
    let delivered = delivery::deliver(
        &state.sessions,
        &state.repo,
        message.id,
        p.receiver_id,
        &push,
    )
    .await?;

    Ok(Outcome::Reply(Envelope::success(
        "message_sent",
        Some(json!({ "message_id": message.id, "delivered": delivered })),
    )))
}

/// Persists the message and fans it out to every other group member
/// currently online. The shared message row's delivery state isn't touched
/// by fan-out — a group message has many recipients, and no single push
/// should flip `is_delivered` for the row they all share.
async fn handle_group_message(
    state: &ServerState,
    sender_id: i64,
    p: GroupMessagePayload,
) -> Result<Outcome, ServerError> {
    if !state.repo.is_group_member(p.group_id, sender_id).await? {
        return Err(ServerError::Unauthorized);
    }

    let message = state
        .repo
        .create_group_message(sender_id, p.group_id, &p.content)
        .await?;
    let members = state.repo.list_group_members(p.group_id).await?;

    let push = Envelope::success(
        "group_message",
        Some(json!({
            "message_id": message.id,
            "group_id": p.group_id,
            "sender_id": sender_id,
            "content": message.content,
            "sent_at": message.sent_at,
        })),
    );

    let mut delivered_count = 0u32;
    for member_id in members.into_iter().filter(|id| *id != sender_id) {
        if delivery::push(&state.sessions, member_id, &push).await? {
            delivered_count += 1;
        }
    }

    Ok(Outcome::Reply(Envelope::success(
        "message_sent",
        Some(json!({ "message_id": message.id, "delivered_count": delivered_count })),
    )))
}

async fn handle_get_contacts(state: &ServerState, user_id: i64) -> Result<Outcome, ServerError> {
    let contacts = state.repo.list_contacts(user_id).await?;
    let groups: Vec<_> = state
        .repo
        .list_groups_for_user(user_id)
        .await?
        .into_iter()
        .map(|g| json!({ "group_id": g.id, "group_name": g.name }))
        .collect();
    let data = json!({ "contacts": contacts, "groups": groups });
    Ok(Outcome::Reply(Envelope::success("user_contacts", Some(data))))
}

async fn handle_join(
    state: &ServerState,
    conn: &ConnectionHandle,
    current_room: &mut Option<String>,
    p: JoinPayload,
) -> Result<Outcome, ServerError> {
    if let Some(prev) = current_room.take() {
        signaling::leave_room(&state.rooms, &prev, &conn.conn_id).await;
    }

    signaling::join_room(&state.rooms, &p.room_id, &conn.conn_id, &p.name, conn.clone()).await;
    *current_room = Some(p.room_id);
    Ok(Outcome::Handled)
}

async fn handle_leave(
    state: &ServerState,
    conn: &ConnectionHandle,
    current_room: &mut Option<String>,
) -> Result<Outcome, ServerError> {
    if let Some(room_id) = current_room.take() {
        signaling::leave_room(&state.rooms, &room_id, &conn.conn_id).await;
    }
    Ok(Outcome::Handled)
}

/// Allocates a room id for the caller to `join` next; it does not join them
/// automatically.
fn handle_create_room(p: CreateRoomPayload) -> Result<Outcome, ServerError> {
    let room_id = p.room_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    Ok(Outcome::Reply(Envelope::success(
        "create-room",
        Some(json!({ "room_id": room_id })),
    )))
}

async fn handle_offer(
    state: &ServerState,
    conn: &ConnectionHandle,
    current_room: &Option<String>,
    p: OfferPayload,
) -> Result<Outcome, ServerError> {
    let room_id = current_room
        .as_deref()
        .ok_or_else(|| ServerError::Validation("not in a room".into()))?;
    signaling::relay(&state.rooms, room_id, &p.target_id, RelayFrame::Offer {
        sender_id: conn.conn_id.clone(),
        offer: p.offer,
    })
    .await?;
    Ok(Outcome::Handled)
}

async fn handle_answer(
    state: &ServerState,
    conn: &ConnectionHandle,
    current_room: &Option<String>,
    p: parlor_protocol::inbound::AnswerPayload,
) -> Result<Outcome, ServerError> {
    let room_id = current_room
        .as_deref()
        .ok_or_else(|| ServerError::Validation("not in a room".into()))?;
    signaling::relay(&state.rooms, room_id, &p.target_id, RelayFrame::Answer {
        sender_id: conn.conn_id.clone(),
        answer: p.answer,
    })
    .await?;
    Ok(Outcome::Handled)
}

async fn handle_ice_candidate(
    state: &ServerState,
    conn: &ConnectionHandle,
    current_room: &Option<String>,
    p: IceCandidatePayload,
) -> Result<Outcome, ServerError> {
    let room_id = current_room
        .as_deref()
        .ok_or_else(|| ServerError::Validation("not in a room".into()))?;
    signaling::relay(&state.rooms, room_id, &p.target_id, RelayFrame::IceCandidate {
        sender_id: conn.conn_id.clone(),
        candidate: p.candidate,
    })
    .await?;
    Ok(Outcome::Handled)
}
