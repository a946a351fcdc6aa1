//! The CRM synchronization trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};

/// Lead fields mirrored to the CRM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmLead {
    pub name: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

/// A partial update of a CRM lead. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmLeadUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

impl CrmLeadUpdate {
    /// An update that only replaces the description.
    pub fn description(description: impl Into<String>) -> Self {
        Self { description: Some(description.into()), ..Self::default() }
    }

    /// `true` when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.description.is_none()
    }
}

/// A meeting to record on a CRM lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmAppointment {
    pub date: DateTime<Utc>,
    pub summary: String,
    pub note: Option<String>,
}

impl CrmAppointment {
    pub fn new(date: DateTime<Utc>, summary: impl Into<String>) -> Self {
        Self { date, summary: summary.into(), note: None }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Mirrors lead activity into an external CRM.
///
/// Calls are made off the request path; callers log failures and move on.
#[async_trait]
pub trait CrmSync: Send + Sync {
    /// `false` when no CRM is set up; callers skip synchronization entirely.
    fn is_configured(&self) -> bool;

    /// Create a lead and return its CRM id.
    async fn create_lead(&self, lead: &CrmLead) -> Result<String>;

    /// Apply `update` to the lead `crm_id`.
    async fn update_lead(&self, crm_id: &str, update: &CrmLeadUpdate) -> Result<()>;

    /// Schedule a meeting activity on the lead `crm_id`.
    async fn schedule_appointment(&self, crm_id: &str, appointment: &CrmAppointment) -> Result<()>;
}

/// A [`CrmSync`] for deployments without a CRM.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCrm;

#[async_trait]
impl CrmSync for DisabledCrm {
    fn is_configured(&self) -> bool {
        false
    }

    async fn create_lead(&self, _lead: &CrmLead) -> Result<String> {
        Err(CrmError::NotConfigured)
    }

    async fn update_lead(&self, _crm_id: &str, _update: &CrmLeadUpdate) -> Result<()> {
        Err(CrmError::NotConfigured)
    }

    async fn schedule_appointment(&self, _crm_id: &str, _appointment: &CrmAppointment) -> Result<()> {
        Err(CrmError::NotConfigured)
    }
}
