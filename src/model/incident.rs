//! Incidents: correlated timelines of classified events for one release.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::event::ClassifiedEvent;

const ID_PREFIX: &str = "incident";

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// `incident:<release>:<namespace>`.
///
/// Stable across repeated failures of the same release so that events
/// correlate. The query layer reads the release name back out of field 1,
/// so neither component may contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IncidentId {
    release_name: String,
    namespace: String,
}

impl IncidentId {
    pub fn new(release_name: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let release_name = release_name.into();
        let namespace = namespace.into();
        for part in [&release_name, &namespace] {
            if part.is_empty() || part.contains(':') {
                return Err(Error::InvalidIncidentId(format!(
                    "{ID_PREFIX}:{release_name}:{namespace}"
                )));
            }
        }
        Ok(Self {
            release_name,
            namespace,
        })
    }

    pub fn for_event(event: &ClassifiedEvent) -> Result<Self> {
        Self::new(event.release_name(), &event.namespace)
    }

    pub fn release_name(&self) -> &str {
        &self.release_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ID_PREFIX}:{}:{}", self.release_name, self.namespace)
    }
}

impl FromStr for IncidentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(ID_PREFIX), Some(release), Some(namespace), None) => {
                Self::new(release, namespace)
            }
            _ => Err(Error::InvalidIncidentId(s.to_string())),
        }
    }
}

impl TryFrom<String> for IncidentId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<IncidentId> for String {
    fn from(id: IncidentId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentState {
    Ongoing,
    Resolved,
}

impl IncidentState {
    /// Label served by the query layer.
    pub fn label(self) -> &'static str {
        match self {
            IncidentState::Ongoing => "ONGOING",
            IncidentState::Resolved => "RESOLVED",
        }
    }

    pub fn is_resolved(self) -> bool {
        self == IncidentState::Resolved
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for IncidentState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ONGOING" => Ok(IncidentState::Ongoing),
            "RESOLVED" => Ok(IncidentState::Resolved),
            other => Err(Error::Other(format!("unknown incident state: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// What recording an event did to an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentTransition {
    /// First critical event for the identity.
    Opened,
    /// Appended to an ongoing incident.
    Appended,
    /// A critical event arrived for a resolved incident.
    Reopened,
    /// A healthy event closed an ongoing incident.
    Resolved,
    /// Not recorded: a non-critical event with nothing ongoing to attach to.
    Ignored,
}

impl IncidentTransition {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentTransition::Opened => "opened",
            IncidentTransition::Appended => "appended",
            IncidentTransition::Reopened => "reopened",
            IncidentTransition::Resolved => "resolved",
            IncidentTransition::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub state: IncidentState,
    /// Oldest first.
    pub events: Vec<ClassifiedEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Open an incident from its first event. Returns `None` for events
    /// that cannot open one (non-critical).
    pub fn open(event: ClassifiedEvent) -> Result<Option<Self>> {
        if !event.is_critical() {
            return Ok(None);
        }
        let now = Utc::now();
        Ok(Some(Self {
            id: IncidentId::for_event(&event)?,
            state: IncidentState::Ongoing,
            events: vec![event],
            created_at: now,
            updated_at: now,
        }))
    }

    /// Fold a subsequent event for the same identity into the incident.
    pub fn record(&mut self, event: ClassifiedEvent) -> IncidentTransition {
        let transition = match self.state {
            IncidentState::Ongoing if event.is_healthy() => {
                self.state = IncidentState::Resolved;
                IncidentTransition::Resolved
            }
            IncidentState::Ongoing => IncidentTransition::Appended,
            IncidentState::Resolved if event.is_critical() => {
                self.state = IncidentState::Ongoing;
                IncidentTransition::Reopened
            }
            IncidentState::Resolved => return IncidentTransition::Ignored,
        };
        self.events.push(event);
        self.updated_at = Utc::now();
        transition
    }

    pub fn latest_event(&self) -> Option<&ClassifiedEvent> {
        self.events.last()
    }

    pub fn latest_reason(&self) -> &str {
        self.latest_event().map_or("", |e| e.reason.as_str())
    }

    pub fn latest_message(&self) -> &str {
        self.latest_event().map_or("", |e| e.message.as_str())
    }
}
