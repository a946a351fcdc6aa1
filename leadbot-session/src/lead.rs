//! Lead records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Sales pipeline stage of a lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Created on the first chat turn, nothing captured yet.
    #[default]
    New,
    /// Contact details are known.
    Contacted,
    /// Scored at or above the qualification bar.
    Qualified,
    /// A meeting was requested.
    MeetingScheduled,
}

impl LeadStatus {
    /// The snake_case name stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::MeetingScheduled => "meeting_scheduled",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "meeting_scheduled" => Ok(LeadStatus::MeetingScheduled),
            other => Err(SessionError::Validation(format!("unknown lead status '{other}'"))),
        }
    }
}

/// Something that happened to a lead, e.g. a meeting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event type, e.g. `meeting_scheduled`.
    pub kind: String,
    /// The date exactly as the visitor gave it.
    pub requested: String,
    /// `requested` parsed, when it could be.
    pub date: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A prospective customer talking to a tenant's widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    /// Qualification score, 0 to 100.
    pub interest_score: Option<u8>,
    pub interests: Vec<String>,
    pub timeline: Vec<TimelineEvent>,
    /// Id of the mirrored record in the external CRM.
    pub crm_id: Option<String>,
}

impl Lead {
    /// A fresh lead in [`LeadStatus::New`].
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            created_at: Utc::now(),
            name: None,
            company: None,
            job_title: None,
            email: None,
            phone: None,
            status: LeadStatus::New,
            interest_score: None,
            interests: Vec::new(),
            timeline: Vec::new(),
            crm_id: None,
        }
    }
}
