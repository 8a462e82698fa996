use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A change to a timetable resource, as published on the bus.
///
/// Field names follow the iCalendar property names used on the wire;
/// all-lowercase spellings are accepted too. Missing fields decode as empty
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "UID", alias = "uid")]
    pub uid: String,
    #[serde(rename = "DTSTAMP", alias = "dtstamp")]
    pub dtstamp: String,
    #[serde(rename = "DTSTART", alias = "dtstart")]
    pub dtstart: String,
    #[serde(rename = "DTEND", alias = "dtend")]
    pub dtend: String,
    #[serde(rename = "DESCRIPTION", alias = "description")]
    pub description: String,
    #[serde(rename = "LOCATION", alias = "location")]
    pub location: String,
    #[serde(rename = "CREATED", alias = "created")]
    pub created: String,
    #[serde(rename = "LAST-MODIFIED", alias = "last-modified")]
    pub last_modified: String,
    #[serde(rename = "RESOURCE-ID", alias = "resource-id")]
    pub resource_id: String,
}

impl Event {
    /// Decode an event from a raw bus payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// An event that was never modified is a creation, anything else is an update.
    pub fn is_new(&self) -> bool {
        self.last_modified.is_empty()
    }
}

/// One recipient's standing interest, as returned by the alert directory.
///
/// Every field is optional on the wire so that one partial row never makes
/// the whole directory reply undecodable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subscription {
    pub id: Option<Uuid>,
    pub email: String,
    /// Subscribed to every resource; `resource_id` is ignored when set
    pub all: bool,
    pub resource_id: Option<String>,
}
