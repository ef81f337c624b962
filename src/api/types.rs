use serde::{Deserialize, Serialize};

/// Body of `POST /trips`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub name: String,
    pub destination: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTrip {
    pub fn new(name: &str, destination: &str, timezone: &str) -> Self {
        Self {
            name: name.to_string(),
            destination: destination.to_string(),
            timezone: timezone.to_string(),
            start_date: None,
            end_date: None,
            description: None,
        }
    }

    pub fn dates(mut self, start: &str, end: &str) -> Self {
        self.start_date = Some(start.to_string());
        self.end_date = Some(end.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Travel,
    Meal,
    Activity,
}

/// Body of `POST /trips/{id}/events`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub event_type: EventType,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl NewEvent {
    pub fn new(name: &str, event_type: EventType, start: &str, end: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            event_type,
            start_time: start.to_string(),
            end_time: end.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    NotGoing,
    Maybe,
}

/// Reaction identifiers accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Heart,
    ThumbsUp,
    Laugh,
    Surprised,
    Party,
    Plane,
}

/// Entry of `GET /trips/{id}/members`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Member {
    /// The user id, falling back to the membership id
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.id.as_deref())
    }
}

/// Find a member's user id by display name in a members listing body
pub fn find_member_id(body: &serde_json::Value, display_name: &str) -> Option<String> {
    let members = body.get("members")?.as_array()?;
    members
        .iter()
        .filter_map(|m| serde_json::from_value::<Member>(m.clone()).ok())
        .find(|m| m.display_name.as_deref() == Some(display_name))
        .and_then(|m| m.user_id().map(str::to_string))
}
