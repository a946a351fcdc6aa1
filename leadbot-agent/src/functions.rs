//! Sales functions the model can call.
//!
//! Each function updates the lead locally and may hand back a [`CrmTask`]
//! for the orchestrator to run in the background.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use leadbot_crm::{CrmAppointment, CrmLead, CrmLeadUpdate};
use leadbot_model::FunctionCall;
use leadbot_session::{Lead, LeadStatus, LeadStore, SessionError, TimelineEvent};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::crm_task::CrmTask;
use crate::error::{AgentError, Result};
use crate::prompt::{CAPTURE_CONTACT_INFO, QUALIFY_LEAD, SCHEDULE_MEETING};

const DEFAULT_CRM_LEAD_NAME: &str = "Lead desde chat";
const MEETING_NOTE: &str = "Agendado automáticamente desde Chat IA especializado en PNL.";
const MEETING_EVENT: &str = "meeting_scheduled";

/// The result of executing one function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionOutcome {
    /// JSON handed back to the model.
    pub result: Value,
    pub succeeded: bool,
    pub crm_task: Option<CrmTask>,
}

impl FunctionOutcome {
    fn success(result: Value, crm_task: Option<CrmTask>) -> Self {
        Self { result, succeeded: true, crm_task }
    }

    fn failure(result: Value) -> Self {
        Self { result, succeeded: false, crm_task: None }
    }
}

/// Execute `call` for the lead. Never fails: problems become an error result
/// the model can talk about.
pub async fn execute_function(
    store: &dyn LeadStore,
    tenant_id: &str,
    lead_id: &str,
    call: &FunctionCall,
) -> FunctionOutcome {
    let args = parse_arguments(&call.arguments);
    let handled = match call.name.as_str() {
        CAPTURE_CONTACT_INFO => capture_contact_info(store, tenant_id, lead_id, &args).await,
        QUALIFY_LEAD => qualify_lead(store, tenant_id, lead_id, &args).await,
        SCHEDULE_MEETING => schedule_meeting(store, tenant_id, lead_id, &args).await,
        other => {
            warn!(function = other, lead_id, "unknown function requested");
            return FunctionOutcome::failure(json!({ "error": "Unknown function" }));
        }
    };

    match handled {
        Ok(outcome) => {
            info!(function = %call.name, lead_id, "function executed");
            outcome
        }
        Err(e) => {
            error!(function = %call.name, lead_id, error = %e, "function failed");
            FunctionOutcome::failure(json!({ "status": "error", "message": e.to_string() }))
        }
    }
}

/// Score a lead from its budget bracket and urgency, capped at 100.
pub fn qualification_score(budget: Option<&str>, urgency: Option<&str>) -> u8 {
    let mut score: u32 = 50;
    score += match budget {
        Some(">50k") => 30,
        Some("20k-50k") => 20,
        Some("5k-20k") => 10,
        _ => 0,
    };
    if urgency == Some("inmediata") {
        score += 20;
    }
    score.min(100) as u8
}

/// Parse the date a visitor asked for. Accepts RFC 3339, `YYYY-MM-DD HH:MM`,
/// `YYYY-MM-DDTHH:MM` and `YYYY-MM-DD` (midnight UTC).
pub fn parse_meeting_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// Malformed or non-object arguments count as no arguments.
fn parse_arguments(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(args)) => args,
        _ => Map::new(),
    }
}

/// The first non-blank string among `keys`.
fn arg_str(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| args.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

async fn load_lead(store: &dyn LeadStore, tenant_id: &str, lead_id: &str) -> Result<Lead> {
    store
        .get_lead(tenant_id, lead_id)
        .await?
        .ok_or_else(|| AgentError::Session(SessionError::NotFound { lead_id: lead_id.to_string() }))
}

async fn capture_contact_info(
    store: &dyn LeadStore,
    tenant_id: &str,
    lead_id: &str,
    args: &Map<String, Value>,
) -> Result<FunctionOutcome> {
    let mut lead = load_lead(store, tenant_id, lead_id).await?;

    let name = arg_str(args, &["name"]);
    let company = arg_str(args, &["company_name", "company"]);
    let job_title = arg_str(args, &["job_title", "role"]);
    let email = arg_str(args, &["email"]);
    let phone = arg_str(args, &["phone"]);

    if email.is_some() && lead.status == LeadStatus::New {
        lead.status = LeadStatus::Contacted;
    }
    lead.name = name.clone().or(lead.name);
    lead.company = company.or(lead.company);
    lead.job_title = job_title.or(lead.job_title);
    lead.email = email.clone().or(lead.email);
    lead.phone = phone.clone().or(lead.phone);
    store.save_lead(&lead).await?;

    let crm_task = match &lead.crm_id {
        Some(crm_id) => {
            let update = CrmLeadUpdate { name, email, phone, description: None };
            (!update.is_empty()).then(|| CrmTask::UpdateLead { crm_id: crm_id.clone(), update })
        }
        None => Some(CrmTask::CreateLead {
            tenant_id: tenant_id.to_string(),
            lead_id: lead_id.to_string(),
            lead: CrmLead {
                name: lead.name.clone().unwrap_or_else(|| DEFAULT_CRM_LEAD_NAME.to_string()),
                company: lead.company.clone(),
                job_title: lead.job_title.clone(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
                description: Some(format!("Lead capturado desde chat web.\nLead Local ID: {lead_id}")),
            },
        }),
    };

    let captured: Vec<&String> = args.keys().collect();
    Ok(FunctionOutcome::success(
        json!({
            "status": "success",
            "captured": captured,
            "info": "Lead updated successfully in local database",
        }),
        crm_task,
    ))
}

async fn qualify_lead(
    store: &dyn LeadStore,
    tenant_id: &str,
    lead_id: &str,
    args: &Map<String, Value>,
) -> Result<FunctionOutcome> {
    let mut lead = load_lead(store, tenant_id, lead_id).await?;

    let needs = arg_str(args, &["needs"]);
    let location = arg_str(args, &["location"]);
    let budget = arg_str(args, &["budget"]);
    let urgency = arg_str(args, &["urgency"]);
    let score = qualification_score(budget.as_deref(), urgency.as_deref());

    lead.interests = needs.iter().cloned().collect();
    lead.interest_score = Some(score);
    lead.status = if score >= 70 { LeadStatus::Qualified } else { LeadStatus::Contacted };
    store.save_lead(&lead).await?;

    let crm_task = lead.crm_id.clone().map(|crm_id| {
        let mut description = format!(
            "[ACTUALIZACIÓN CUALIFICACIÓN]\nNecesidad: {}\nPresupuesto: {}\nUrgencia: {}",
            needs.as_deref().unwrap_or("N/A"),
            budget.as_deref().unwrap_or("N/A"),
            urgency.as_deref().unwrap_or("N/A"),
        );
        if let Some(location) = &location {
            description.push_str(&format!("\nUbicación: {location}"));
        }
        description.push_str(&format!("\nScore IA: {score}/100"));
        CrmTask::UpdateLead { crm_id, update: CrmLeadUpdate::description(description) }
    });

    Ok(FunctionOutcome::success(json!({ "status": "success", "score": score }), crm_task))
}

async fn schedule_meeting(
    store: &dyn LeadStore,
    tenant_id: &str,
    lead_id: &str,
    args: &Map<String, Value>,
) -> Result<FunctionOutcome> {
    let requested = arg_str(args, &["preferred_date"])
        .ok_or_else(|| AgentError::Validation("preferred_date is required".to_string()))?;
    let notes = arg_str(args, &["notes"]);
    let date = parse_meeting_date(&requested);
    if date.is_none() {
        warn!(lead_id, %requested, "meeting date kept as free text");
    }

    let mut lead = load_lead(store, tenant_id, lead_id).await?;
    lead.timeline.push(TimelineEvent {
        kind: MEETING_EVENT.to_string(),
        requested: requested.clone(),
        date,
        notes: notes.clone(),
        recorded_at: Utc::now(),
    });
    lead.status = LeadStatus::MeetingScheduled;
    store.save_lead(&lead).await?;

    let crm_task = match (lead.crm_id.clone(), date) {
        (Some(crm_id), Some(date)) => {
            let summary = format!("Reunión IA: {}", notes.as_deref().unwrap_or("Sin notas"));
            let description = format!(
                "[NUEVA REUNIÓN] Fecha: {requested}. Notas: {}",
                notes.as_deref().unwrap_or("N/A")
            );
            Some(CrmTask::ScheduleMeeting {
                crm_id,
                appointment: CrmAppointment::new(date, summary).with_note(MEETING_NOTE),
                update: CrmLeadUpdate::description(description),
            })
        }
        _ => None,
    };

    Ok(FunctionOutcome::success(json!({ "status": "success", "date": requested }), crm_task))
}
