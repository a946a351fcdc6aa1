//! In-memory lead store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::lead::Lead;
use crate::message::{NewMessage, StoredMessage};
use crate::store::LeadStore;

/// A [`LeadStore`] held in process memory. Suitable for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<String, Lead>>,
    messages: RwLock<HashMap<String, Vec<StoredMessage>>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leads across all tenants.
    pub async fn lead_count(&self) -> usize {
        self.leads.read().await.len()
    }
}

fn ensure_tenant(tenant_id: &str) -> Result<()> {
    if tenant_id.trim().is_empty() {
        return Err(SessionError::Validation("tenant_id must not be empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn create_lead(&self, tenant_id: &str) -> Result<Lead> {
        ensure_tenant(tenant_id)?;
        let lead = Lead::new(tenant_id);
        self.leads.write().await.insert(lead.id.clone(), lead.clone());
        Ok(lead)
    }

    async fn get_lead(&self, tenant_id: &str, lead_id: &str) -> Result<Option<Lead>> {
        let leads = self.leads.read().await;
        Ok(leads.get(lead_id).filter(|lead| lead.tenant_id == tenant_id).cloned())
    }

    async fn save_lead(&self, lead: &Lead) -> Result<()> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(&lead.id) {
            Some(stored) if stored.tenant_id == lead.tenant_id => {
                let crm_id = lead.crm_id.clone().or_else(|| stored.crm_id.take());
                *stored = Lead { crm_id, ..lead.clone() };
                Ok(())
            }
            _ => Err(SessionError::NotFound { lead_id: lead.id.clone() }),
        }
    }

    async fn set_crm_id(&self, tenant_id: &str, lead_id: &str, crm_id: &str) -> Result<()> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(lead_id) {
            Some(stored) if stored.tenant_id == tenant_id => {
                stored.crm_id = Some(crm_id.to_string());
                Ok(())
            }
            _ => Err(SessionError::NotFound { lead_id: lead_id.to_string() }),
        }
    }

    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage> {
        if self.get_lead(&message.tenant_id, &message.lead_id).await?.is_none() {
            return Err(SessionError::NotFound { lead_id: message.lead_id });
        }

        let stored = StoredMessage {
            id: Uuid::new_v4().to_string(),
            lead_id: message.lead_id,
            tenant_id: message.tenant_id,
            role: message.role,
            content: message.content,
            function_called: message.function_called,
            created_at: Utc::now(),
        };
        self.messages
            .write()
            .await
            .entry(stored.lead_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn recent_messages(
        &self,
        tenant_id: &str,
        lead_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;
        let Some(history) = messages.get(lead_id) else {
            return Ok(Vec::new());
        };
        let owned: Vec<&StoredMessage> = history.iter().filter(|m| m.tenant_id == tenant_id).collect();
        let start = owned.len().saturating_sub(limit);
        Ok(owned[start..].iter().map(|m| (*m).clone()).collect())
    }
}
