//! Seed data created through the API before any check runs

pub mod phone;
pub mod session;

pub use phone::PhoneGenerator;
pub use session::{Role, Session};

use log::{debug, info};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::api::{ApiClient, ApiResponse, NewEvent, NewTrip, RsvpStatus};
use crate::error::{HarnessError, HarnessResult};

/// Per-run state produced by setup and read by check groups
#[derive(Debug, Default)]
pub struct FixtureContext {
    pub sessions: Vec<Session>,
    pub trip_id: Option<String>,
    /// Named entity ids, e.g. `message`, `reply`, `bob`
    ids: HashMap<String, String>,
}

impl FixtureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    /// Session by display name
    pub fn session(&self, display_name: &str) -> HarnessResult<&Session> {
        self.sessions
            .iter()
            .find(|s| s.display_name == display_name)
            .ok_or_else(|| HarnessError::AssertionGap(format!("no session for '{}'", display_name)))
    }

    /// First session with the given role
    pub fn by_role(&self, role: Role) -> HarnessResult<&Session> {
        self.sessions
            .iter()
            .find(|s| s.role == role)
            .ok_or_else(|| HarnessError::AssertionGap(format!("no {} session", role)))
    }

    pub fn trip(&self) -> HarnessResult<&str> {
        self.trip_id
            .as_deref()
            .ok_or_else(|| HarnessError::AssertionGap("no trip was seeded".to_string()))
    }

    pub fn set_id(&mut self, key: &str, id: impl Into<String>) {
        self.ids.insert(key.to_string(), id.into());
    }

    pub fn id(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }
}

/// Seeding helpers bound to one API client
pub struct Fixtures {
    api: ApiClient,
    phones: PhoneGenerator,
    code: String,
}

impl Fixtures {
    pub fn new(api: ApiClient, phones: PhoneGenerator, verification_code: &str) -> Self {
        Self {
            api,
            phones,
            code: verification_code.to_string(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn next_phone(&mut self) -> String {
        self.phones.next_phone()
    }

    /// Create a fresh user with a newly generated phone number
    pub async fn create_user(&mut self, role: Role, display_name: &str) -> HarnessResult<Session> {
        let phone = self.next_phone();
        self.authenticate(role, display_name, &phone).await
    }

    /// request-code, verify-code and complete-profile for `phone`.
    ///
    /// Signing in again with an already-invited phone is what makes the
    /// API process that user's pending invitations.
    pub async fn authenticate(
        &self,
        role: Role,
        display_name: &str,
        phone: &str,
    ) -> HarnessResult<Session> {
        let step = format!("create user '{}'", display_name);

        self.api
            .post("/auth/request-code", Some(&json!({ "phoneNumber": phone })), None)
            .await
            .and_then(ApiResponse::error_for_status)
            .map_err(|e| HarnessError::fixture(&step, e))?;

        let verified = self
            .api
            .post(
                "/auth/verify-code",
                Some(&json!({ "phoneNumber": phone, "code": self.code })),
                None,
            )
            .await
            .and_then(ApiResponse::error_for_status)
            .map_err(|e| HarnessError::fixture(&step, e))?;

        let token = verified.auth_token().ok_or_else(|| {
            HarnessError::fixture(&step, "verify-code response carried no auth_token cookie")
        })?;

        let mut session = Session::new(role, display_name, phone, &token);
        session.user_id = verified.str_at("/user/id").map(str::to_string);

        self.api
            .post(
                "/auth/complete-profile",
                Some(&json!({ "displayName": display_name, "timezone": "UTC" })),
                Some(&session),
            )
            .await
            .and_then(ApiResponse::error_for_status)
            .map_err(|e| HarnessError::fixture(&step, e))?;

        debug!("Authenticated {} as {} ({})", display_name, role, phone);
        Ok(session)
    }

    /// Sign in again with the same phone, returning a fresh session
    pub async fn reauthenticate(&self, session: &Session) -> HarnessResult<Session> {
        self.authenticate(session.role, &session.display_name, &session.phone)
            .await
    }

    pub async fn create_trip(&self, session: &Session, trip: &NewTrip) -> HarnessResult<String> {
        let step = format!("create trip '{}'", trip.name);
        let body = serde_json::to_value(trip)?;
        let res = self.expect(&step, self.api.post("/trips", Some(&body), Some(session)).await)?;

        let id = res
            .str_at("/trip/id")
            .map(str::to_string)
            .ok_or_else(|| HarnessError::fixture(&step, format!("no trip id in {}", res.body_snippet(200))))?;
        info!("Seeded trip '{}' ({})", trip.name, id);
        Ok(id)
    }

    pub async fn create_event(
        &self,
        session: &Session,
        trip_id: &str,
        event: &NewEvent,
    ) -> HarnessResult<String> {
        let step = format!("create event '{}'", event.name);
        let body = serde_json::to_value(event)?;
        let path = format!("/trips/{}/events", trip_id);
        let res = self.expect(&step, self.api.post(&path, Some(&body), Some(session)).await)?;
        Ok(res.str_at("/event/id").unwrap_or_default().to_string())
    }

    /// Invite phone numbers; returns the number of invitations created
    pub async fn invite(
        &self,
        session: &Session,
        trip_id: &str,
        phones: &[&str],
    ) -> HarnessResult<usize> {
        let path = format!("/trips/{}/invitations", trip_id);
        let body = json!({ "phoneNumbers": phones });
        let res = self.expect("invite members", self.api.post(&path, Some(&body), Some(session)).await)?;
        Ok(res
            .at("/invitations")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0))
    }

    pub async fn rsvp(&self, session: &Session, trip_id: &str, status: RsvpStatus) -> HarnessResult<()> {
        let step = format!("rsvp {:?} as '{}'", status, session.display_name);
        let path = format!("/trips/{}/rsvp", trip_id);
        let body = json!({ "status": status });
        self.expect(&step, self.api.post(&path, Some(&body), Some(session)).await)?;
        Ok(())
    }

    pub async fn post_message(
        &self,
        session: &Session,
        trip_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> HarnessResult<String> {
        let path = format!("/trips/{}/messages", trip_id);
        let mut body = json!({ "content": content });
        if let Some(parent) = parent_id {
            body["parentId"] = json!(parent);
        }
        let res = self.expect("post message", self.api.post(&path, Some(&body), Some(session)).await)?;
        res.str_at("/message/id")
            .map(str::to_string)
            .ok_or_else(|| HarnessError::fixture("post message", "no message id in response"))
    }

    fn expect(&self, step: &str, res: HarnessResult<ApiResponse>) -> HarnessResult<ApiResponse> {
        res.and_then(ApiResponse::error_for_status)
            .map_err(|e| HarnessError::fixture(step, e))
    }
}
