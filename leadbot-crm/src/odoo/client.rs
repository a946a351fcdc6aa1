//! Odoo JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::config::OdooConfig;
use crate::error::{CrmError, Result};
use crate::sync::{CrmAppointment, CrmLead, CrmLeadUpdate, CrmSync};

/// Activity type used for meetings ("Meeting" in a stock Odoo install).
pub const DEFAULT_MEETING_ACTIVITY_TYPE: i64 = 4;

const LEAD_MODEL: &str = "crm.lead";
const ACTIVITY_MODEL: &str = "mail.activity";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: String,
}

impl RpcError {
    fn detail(self) -> String {
        match self.data {
            Some(data) if !data.message.is_empty() => data.message,
            _ => self.message,
        }
    }
}

/// [`CrmSync`] backed by an Odoo instance.
///
/// Authenticates lazily on the first call and reuses the uid afterwards.
pub struct OdooClient {
    client: reqwest::Client,
    config: OdooConfig,
    meeting_activity_type: i64,
    uid: OnceCell<i64>,
    request_id: AtomicU64,
}

impl OdooClient {
    pub fn new(config: OdooConfig) -> Result<Self> {
        if !config.is_complete() {
            return Err(CrmError::NotConfigured);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            meeting_activity_type: DEFAULT_MEETING_ACTIVITY_TYPE,
            uid: OnceCell::new(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Use a different `mail.activity.type` id for meetings.
    pub fn with_meeting_activity_type(mut self, activity_type: i64) -> Self {
        self.meeting_activity_type = activity_type;
        self
    }

    pub fn config(&self) -> &OdooConfig {
        &self.config
    }

    async fn call(&self, service: &str, method: &str, args: Value, label: &str) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": id,
        });
        debug!(call = label, id, "odoo rpc");

        let response = self.client.post(self.config.endpoint()).json(&body).send().await.map_err(|e| {
            error!(call = label, error = %e, "odoo request failed");
            CrmError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(call = label, %status, "odoo http error");
            return Err(CrmError::Request(format!("HTTP {status}")));
        }

        let payload: RpcResponse = response.json().await.map_err(|e| CrmError::Rpc {
            call: label.to_string(),
            message: format!("invalid response: {e}"),
        })?;

        if let Some(err) = payload.error {
            let message = err.detail();
            error!(call = label, error = %message, "odoo rpc error");
            return Err(CrmError::Rpc { call: label.to_string(), message });
        }
        Ok(payload.result.unwrap_or(Value::Null))
    }

    async fn uid(&self) -> Result<i64> {
        self.uid
            .get_or_try_init(|| async {
                let result = self
                    .call(
                        "common",
                        "authenticate",
                        json!([self.config.db, self.config.username, self.config.password, {}]),
                        "common.authenticate",
                    )
                    .await?;
                // Odoo answers `false` for bad credentials.
                match result.as_i64() {
                    Some(uid) if uid > 0 => {
                        info!(uid, db = %self.config.db, "odoo authenticated");
                        Ok(uid)
                    }
                    _ => Err(CrmError::Auth(format!(
                        "Odoo rejected the credentials of '{}'",
                        self.config.username
                    ))),
                }
            })
            .await
            .copied()
    }

    async fn execute_kw(&self, model: &str, method: &str, args: Value, kwargs: Value) -> Result<Value> {
        let uid = self.uid().await?;
        let label = format!("{model}.{method}");
        self.call(
            "object",
            "execute_kw",
            json!([self.config.db, uid, self.config.password, model, method, args, kwargs]),
            &label,
        )
        .await
    }

    async fn lead_model_id(&self) -> Result<i64> {
        let rows = self
            .execute_kw(
                "ir.model",
                "search_read",
                json!([[["model", "=", LEAD_MODEL]]]),
                json!({ "fields": ["id"], "limit": 1 }),
            )
            .await?;
        rows.get(0).and_then(|row| row.get("id")).and_then(Value::as_i64).ok_or_else(|| {
            CrmError::Rpc { call: "ir.model.search_read".into(), message: "crm.lead model not found".into() }
        })
    }
}

fn record_id(crm_id: &str) -> Result<i64> {
    crm_id.trim().parse::<i64>().map_err(|_| CrmError::InvalidId(crm_id.to_string()))
}

fn lead_fields(lead: &CrmLead) -> Value {
    let mut fields = Map::new();
    fields.insert("name".into(), json!(lead.name));
    fields.insert("type".into(), json!("lead"));
    let optional = [
        ("email_from", &lead.email),
        ("phone", &lead.phone),
        ("partner_name", &lead.company),
        ("function", &lead.job_title),
        ("description", &lead.description),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            fields.insert(key.into(), json!(value));
        }
    }
    Value::Object(fields)
}

fn update_fields(update: &CrmLeadUpdate) -> Value {
    let mut fields = Map::new();
    let optional = [
        ("name", &update.name),
        ("email_from", &update.email),
        ("phone", &update.phone),
        ("description", &update.description),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            fields.insert(key.into(), json!(value));
        }
    }
    Value::Object(fields)
}

#[async_trait]
impl CrmSync for OdooClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_lead(&self, lead: &CrmLead) -> Result<String> {
        let result =
            self.execute_kw(LEAD_MODEL, "create", json!([lead_fields(lead)]), json!({})).await?;
        let id = result.as_i64().ok_or_else(|| CrmError::Rpc {
            call: "crm.lead.create".into(),
            message: format!("expected a record id, got {result}"),
        })?;
        info!(crm_id = id, "odoo lead created");
        Ok(id.to_string())
    }

    async fn update_lead(&self, crm_id: &str, update: &CrmLeadUpdate) -> Result<()> {
        let id = record_id(crm_id)?;
        if update.is_empty() {
            return Ok(());
        }
        self.execute_kw(LEAD_MODEL, "write", json!([[id], update_fields(update)]), json!({}))
            .await?;
        debug!(crm_id = id, "odoo lead updated");
        Ok(())
    }

    async fn schedule_appointment(&self, crm_id: &str, appointment: &CrmAppointment) -> Result<()> {
        let id = record_id(crm_id)?;
        let model_id = self.lead_model_id().await?;

        let mut activity = Map::new();
        activity.insert("res_model_id".into(), json!(model_id));
        activity.insert("res_id".into(), json!(id));
        activity.insert("activity_type_id".into(), json!(self.meeting_activity_type));
        activity.insert("summary".into(), json!(appointment.summary));
        activity.insert(
            "date_deadline".into(),
            json!(appointment.date.format("%Y-%m-%d").to_string()),
        );
        if let Some(note) = &appointment.note {
            activity.insert("note".into(), json!(note));
        }

        self.execute_kw(ACTIVITY_MODEL, "create", json!([Value::Object(activity)]), json!({}))
            .await?;
        info!(crm_id = id, date = %appointment.date, "odoo meeting scheduled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_fields_skip_missing_values() {
        let lead = CrmLead {
            name: "Ana".into(),
            email: Some("ana@example.com".into()),
            company: Some("Acme".into()),
            ..CrmLead::default()
        };
        let fields = lead_fields(&lead);
        assert_eq!(fields["name"], "Ana");
        assert_eq!(fields["type"], "lead");
        assert_eq!(fields["email_from"], "ana@example.com");
        assert_eq!(fields["partner_name"], "Acme");
        assert!(fields.get("phone").is_none());
    }

    #[test]
    fn update_maps_email_to_email_from() {
        let update = CrmLeadUpdate { email: Some("ana@example.com".into()), ..CrmLeadUpdate::default() };
        let fields = update_fields(&update);
        assert_eq!(fields, json!({ "email_from": "ana@example.com" }));
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        assert!(matches!(record_id("abc"), Err(CrmError::InvalidId(_))));
        assert_eq!(record_id(" 42 ").unwrap(), 42);
    }

    #[test]
    fn incomplete_config_is_refused() {
        let config = OdooConfig::new("https://crm.example.com", "", "bot", "pw");
        assert!(matches!(OdooClient::new(config), Err(CrmError::NotConfigured)));
    }
}
