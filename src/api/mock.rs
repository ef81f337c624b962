//! In-process stand-in for the Tripful API, used by unit tests.
//!
//! Implements just enough of the real behaviour for the endpoints the suites
//! call: cookie auth, pending invitations resolved on re-authentication,
//! muting, soft deletes and unread notification counts.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct User {
    id: String,
    phone: String,
    display_name: String,
}

#[derive(Clone)]
struct Membership {
    user_id: String,
    status: String,
    muted: bool,
    organizer: bool,
}

struct Message {
    id: String,
    author_id: String,
    parent_id: Option<String>,
    content: String,
    edited_at: Option<String>,
    deleted: bool,
    pinned: bool,
}

struct Trip {
    members: Vec<Membership>,
    pending_phones: Vec<String>,
    messages: Vec<Message>,
    events: usize,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    users: Vec<User>,
    tokens: HashMap<String, String>,
    trips: HashMap<String, Trip>,
    unread: HashMap<String, u64>,
    total_notifications: HashMap<String, u64>,
    /// When set, every `POST /trips` is rejected with this status
    reject_trips: Option<u16>,
    /// Muted members can still post
    ignore_mutes: bool,
    /// `read-all` leaves unread counts untouched
    sticky_unread: bool,
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<String> {
        let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = crate::api::client::extract_cookie(cookie, "auth_token")?;
        self.tokens.get(&token).cloned()
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Running mock server; stops when the test runtime shuts down
pub struct MockApi {
    addr: SocketAddr,
    state: Shared,
}

impl MockApi {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/api/health", get(health))
            .route("/api/plain", get(|| async { "not json" }))
            .route("/api/auth/request-code", post(request_code))
            .route("/api/auth/verify-code", post(verify_code))
            .route("/api/auth/complete-profile", post(complete_profile))
            .route("/api/trips", post(create_trip))
            .route("/api/trips/:id/events", post(create_event))
            .route("/api/trips/:id/invitations", post(invite))
            .route("/api/trips/:id/rsvp", post(rsvp))
            .route("/api/trips/:id/members", get(members))
            .route("/api/trips/:id/members/:mid/mute", post(mute).delete(unmute))
            .route("/api/trips/:id/messages", get(list_messages).post(post_message))
            .route("/api/trips/:id/messages/count", get(message_count))
            .route("/api/trips/:id/messages/latest", get(latest_message))
            .route(
                "/api/trips/:id/messages/:mid",
                delete(delete_message).put(edit_message),
            )
            .route("/api/trips/:id/messages/:mid/pin", patch(pin_message))
            .route("/api/trips/:id/messages/:mid/reactions", post(react))
            .route(
                "/api/trips/:id/notification-preferences",
                get(notification_preferences),
            )
            .route("/api/notifications", get(notifications))
            .route("/api/notifications/read-all", patch(read_all))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr = listener.local_addr().expect("mock api addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    /// API base including the `/api` prefix
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn reject_trip_creation(&self, status: u16) {
        self.state.lock().unwrap().reject_trips = Some(status);
    }

    pub fn ignore_mutes(&self) {
        self.state.lock().unwrap().ignore_mutes = true;
    }

    pub fn keep_unread(&self) {
        self.state.lock().unwrap().sticky_unread = true;
    }

    pub fn event_count(&self, trip_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .trips
            .get(trip_id)
            .map(|t| t.events)
            .unwrap_or(0)
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(
        StatusCode::UNAUTHORIZED,
        json!({ "success": false, "error": { "code": "UNAUTHORIZED" } }),
    )
}

fn not_found(what: &str) -> Response {
    reply(
        StatusCode::NOT_FOUND,
        json!({ "success": false, "error": { "message": format!("{} not found", what) } }),
    )
}

async fn health() -> Response {
    reply(StatusCode::OK, json!({ "status": "ok", "database": "connected" }))
}

async fn request_code(Json(body): Json<Value>) -> Response {
    if body.get("phoneNumber").and_then(Value::as_str).is_none() {
        return reply(StatusCode::BAD_REQUEST, json!({ "success": false }));
    }
    reply(StatusCode::OK, json!({ "success": true }))
}

async fn verify_code(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let phone = body["phoneNumber"].as_str().unwrap_or_default().to_string();
    if body["code"].as_str() != Some("123456") || phone.is_empty() {
        return reply(StatusCode::BAD_REQUEST, json!({ "success": false }));
    }

    let mut s = state.lock().unwrap();
    let user_id = match s.users.iter().find(|u| u.phone == phone) {
        Some(u) => u.id.clone(),
        None => {
            let id = s.id("user");
            s.users.push(User {
                id: id.clone(),
                phone: phone.clone(),
                display_name: String::new(),
            });
            id
        }
    };

    for trip in s.trips.values_mut() {
        if let Some(pos) = trip.pending_phones.iter().position(|p| *p == phone) {
            trip.pending_phones.remove(pos);
            trip.members.push(Membership {
                user_id: user_id.clone(),
                status: "no_response".to_string(),
                muted: false,
                organizer: false,
            });
        }
    }

    let token = s.id("tok");
    s.tokens.insert(token.clone(), user_id.clone());

    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            format!("auth_token={}; Path=/; HttpOnly; SameSite=Lax", token),
        )],
        Json(json!({ "success": true, "user": { "id": user_id } })),
    )
        .into_response()
}

async fn complete_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let name = body["displayName"].as_str().unwrap_or_default().to_string();
    if let Some(user) = s.users.iter_mut().find(|u| u.id == user_id) {
        user.display_name = name.clone();
    }
    reply(
        StatusCode::OK,
        json!({ "success": true, "user": { "id": user_id, "displayName": name } }),
    )
}

async fn create_trip(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    if let Some(code) = s.reject_trips {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
        return reply(status, json!({ "success": false, "error": "rejected" }));
    }
    let id = s.id("trip");
    s.trips.insert(
        id.clone(),
        Trip {
            members: vec![Membership {
                user_id,
                status: "going".to_string(),
                muted: false,
                organizer: true,
            }],
            pending_phones: Vec::new(),
            messages: Vec::new(),
            events: 0,
        },
    );
    reply(
        StatusCode::CREATED,
        json!({ "success": true, "trip": { "id": id, "name": body["name"] } }),
    )
}

async fn create_event(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    if body.get("name").and_then(Value::as_str).is_none() {
        return reply(StatusCode::BAD_REQUEST, json!({ "success": false }));
    }
    let event_id = s.id("event");
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id) {
        return not_found("Trip");
    }
    trip.events += 1;
    reply(
        StatusCode::CREATED,
        json!({ "success": true, "event": { "id": event_id, "name": body["name"] } }),
    )
}

async fn invite(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let phones: Vec<String> = body["phoneNumbers"]
        .as_array()
        .map(|a| a.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id && m.organizer) {
        return reply(StatusCode::FORBIDDEN, json!({ "success": false }));
    }
    trip.pending_phones.extend(phones.iter().cloned());
    let invitations: Vec<Value> = phones
        .iter()
        .map(|p| json!({ "inviteePhone": p, "status": "pending" }))
        .collect();
    reply(
        StatusCode::CREATED,
        json!({ "success": true, "invitations": invitations }),
    )
}

async fn rsvp(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let status = body["status"].as_str().unwrap_or_default().to_string();
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    match trip.members.iter_mut().find(|m| m.user_id == user_id) {
        Some(m) => {
            m.status = status.clone();
            reply(StatusCode::OK, json!({ "success": true, "status": status }))
        }
        None => not_found("Trip"),
    }
}

async fn members(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get(&id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id) {
        return not_found("Trip");
    }
    let list: Vec<Value> = trip
        .members
        .iter()
        .map(|m| {
            let name = s
                .users
                .iter()
                .find(|u| u.id == m.user_id)
                .map(|u| u.display_name.clone())
                .unwrap_or_default();
            json!({ "id": format!("mem-{}", m.user_id), "userId": m.user_id, "displayName": name, "status": m.status })
        })
        .collect();
    reply(StatusCode::OK, json!({ "success": true, "members": list }))
}

fn set_muted(state: &Shared, headers: &HeaderMap, id: &str, member: &str, muted: bool) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get_mut(id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id && m.organizer) {
        return reply(StatusCode::FORBIDDEN, json!({ "success": false }));
    }
    match trip.members.iter_mut().find(|m| m.user_id == member) {
        Some(m) => {
            m.muted = muted;
            reply(StatusCode::OK, json!({ "success": true }))
        }
        None => not_found("Member"),
    }
}

async fn mute(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, member)): Path<(String, String)>,
) -> Response {
    set_muted(&state, &headers, &id, &member, true)
}

async fn unmute(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, member)): Path<(String, String)>,
) -> Response {
    set_muted(&state, &headers, &id, &member, false)
}

fn message_json(m: &Message) -> Value {
    json!({
        "id": m.id,
        "authorId": m.author_id,
        "parentId": m.parent_id,
        "content": if m.deleted { Value::Null } else { json!(m.content) },
        "isPinned": m.pinned,
        "editedAt": m.edited_at,
        "deletedAt": if m.deleted { json!("2026-01-01T00:00:00.000Z") } else { Value::Null },
    })
}

async fn list_messages(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get(&id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id) {
        return not_found("Trip");
    }
    let top: Vec<Value> = trip
        .messages
        .iter()
        .filter(|m| m.parent_id.is_none())
        .map(message_json)
        .collect();
    let total = top.len();
    reply(
        StatusCode::OK,
        json!({ "success": true, "messages": top, "meta": { "total": total } }),
    )
}

async fn post_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = state.lock().unwrap();
    let s = &mut *guard;
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let message_id = s.id("msg");
    let ignore_mutes = s.ignore_mutes;
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    let Some(member) = trip.members.iter().find(|m| m.user_id == user_id) else {
        return not_found("Trip");
    };
    if member.muted && !ignore_mutes {
        return reply(
            StatusCode::FORBIDDEN,
            json!({ "success": false, "error": { "code": "MEMBER_MUTED" } }),
        );
    }
    let message = Message {
        id: message_id,
        author_id: user_id.clone(),
        parent_id: body["parentId"].as_str().map(str::to_string),
        content: body["content"].as_str().unwrap_or_default().to_string(),
        edited_at: None,
        deleted: false,
        pinned: false,
    };
    let out = message_json(&message);
    trip.messages.push(message);

    let others: Vec<String> = trip
        .members
        .iter()
        .filter(|m| m.user_id != user_id)
        .map(|m| m.user_id.clone())
        .collect();
    for other in others {
        *s.unread.entry(other.clone()).or_default() += 1;
        *s.total_notifications.entry(other).or_default() += 1;
    }

    reply(StatusCode::CREATED, json!({ "success": true, "message": out }))
}

async fn edit_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, mid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    match trip.messages.iter_mut().find(|m| m.id == mid) {
        Some(m) if m.author_id == user_id => {
            m.content = body["content"].as_str().unwrap_or_default().to_string();
            m.edited_at = Some("2026-01-01T12:00:00.000Z".to_string());
            reply(StatusCode::OK, json!({ "success": true, "message": message_json(m) }))
        }
        Some(_) => reply(StatusCode::FORBIDDEN, json!({ "success": false })),
        None => not_found("Message"),
    }
}

async fn delete_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, mid)): Path<(String, String)>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    let organizer = trip.members.iter().any(|m| m.user_id == user_id && m.organizer);
    match trip.messages.iter_mut().find(|m| m.id == mid) {
        Some(m) if organizer || m.author_id == user_id => {
            m.deleted = true;
            reply(StatusCode::OK, json!({ "success": true }))
        }
        Some(_) => reply(StatusCode::FORBIDDEN, json!({ "success": false })),
        None => not_found("Message"),
    }
}

async fn pin_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, mid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let Some(trip) = s.trips.get_mut(&id) else {
        return not_found("Trip");
    };
    if !trip.members.iter().any(|m| m.user_id == user_id && m.organizer) {
        return reply(StatusCode::FORBIDDEN, json!({ "success": false }));
    }
    match trip.messages.iter_mut().find(|m| m.id == mid) {
        Some(m) => {
            m.pinned = body["pinned"].as_bool().unwrap_or(false);
            reply(StatusCode::OK, json!({ "success": true, "message": message_json(m) }))
        }
        None => not_found("Message"),
    }
}

async fn react(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, _mid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let s = state.lock().unwrap();
    if s.user_for(&headers).is_none() {
        return unauthorized();
    }
    if !s.trips.contains_key(&id) {
        return not_found("Trip");
    }
    let emoji = body["emoji"].as_str().unwrap_or_default();
    reply(
        StatusCode::OK,
        json!({ "success": true, "reactions": [{ "emoji": emoji, "count": 1, "reacted": true }] }),
    )
}

async fn message_count(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let s = state.lock().unwrap();
    if s.user_for(&headers).is_none() {
        return unauthorized();
    }
    match s.trips.get(&id) {
        Some(trip) => {
            let count = trip.messages.iter().filter(|m| !m.deleted).count();
            reply(StatusCode::OK, json!({ "success": true, "count": count }))
        }
        None => not_found("Trip"),
    }
}

async fn latest_message(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let s = state.lock().unwrap();
    if s.user_for(&headers).is_none() {
        return unauthorized();
    }
    match s.trips.get(&id) {
        Some(trip) => {
            let latest = trip.messages.iter().rev().find(|m| !m.deleted).map(message_json);
            reply(StatusCode::OK, json!({ "success": true, "message": latest }))
        }
        None => not_found("Trip"),
    }
}

async fn notification_preferences(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let s = state.lock().unwrap();
    if s.user_for(&headers).is_none() {
        return unauthorized();
    }
    if !s.trips.contains_key(&id) {
        return not_found("Trip");
    }
    reply(
        StatusCode::OK,
        json!({ "success": true, "preferences": { "dailyItinerary": true, "tripMessages": true } }),
    )
}

async fn notifications(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    let unread = s.unread.get(&user_id).copied().unwrap_or(0);
    let total = s.total_notifications.get(&user_id).copied().unwrap_or(0);
    reply(
        StatusCode::OK,
        json!({ "success": true, "notifications": [], "unreadCount": unread, "meta": { "total": total } }),
    )
}

async fn read_all(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock().unwrap();
    let Some(user_id) = s.user_for(&headers) else {
        return unauthorized();
    };
    if !s.sticky_unread {
        s.unread.insert(user_id, 0);
    }
    reply(StatusCode::OK, json!({ "success": true }))
}
