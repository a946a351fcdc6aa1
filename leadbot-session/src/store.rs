//! The lead and message store trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::lead::Lead;
use crate::message::{NewMessage, StoredMessage};

/// Persistence for leads and their conversation history.
///
/// Every lookup is scoped by tenant: a lead id that belongs to another
/// tenant behaves exactly like an unknown id.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Create and persist a new lead for `tenant_id`.
    async fn create_lead(&self, tenant_id: &str) -> Result<Lead>;

    /// Fetch a lead of the tenant.
    async fn get_lead(&self, tenant_id: &str, lead_id: &str) -> Result<Option<Lead>>;

    /// Replace the stored record of `lead`.
    ///
    /// A `None` `crm_id` keeps the stored one, so a stale snapshot never
    /// erases a CRM link recorded in the meantime.
    ///
    /// Fails with [`SessionError::NotFound`](crate::SessionError::NotFound)
    /// if the lead does not exist for its tenant.
    async fn save_lead(&self, lead: &Lead) -> Result<()>;

    /// Record the external CRM id of a lead without touching other fields.
    async fn set_crm_id(&self, tenant_id: &str, lead_id: &str, crm_id: &str) -> Result<()>;

    /// Append a message to the lead's conversation.
    async fn append_message(&self, message: NewMessage) -> Result<StoredMessage>;

    /// The `limit` most recent messages of the lead, oldest first.
    async fn recent_messages(
        &self,
        tenant_id: &str,
        lead_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>>;
}
