//! Background CRM synchronization produced by sales functions.

use std::collections::HashMap;
use std::sync::Arc;

use leadbot_crm::{CrmAppointment, CrmLead, CrmLeadUpdate, CrmSync};
use leadbot_session::LeadStore;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// CRM work a sales function asks for. Executed off the request path.
#[derive(Debug, Clone, PartialEq)]
pub enum CrmTask {
    /// Create the lead in the CRM and remember its id locally.
    CreateLead { tenant_id: String, lead_id: String, lead: CrmLead },
    /// Update an already mirrored lead.
    UpdateLead { crm_id: String, update: CrmLeadUpdate },
    /// Record a meeting activity, then update the lead.
    ScheduleMeeting { crm_id: String, appointment: CrmAppointment, update: CrmLeadUpdate },
}

impl CrmTask {
    /// Short name used in logs and side-effect reports.
    pub fn operation(&self) -> &'static str {
        match self {
            CrmTask::CreateLead { .. } => "create_lead",
            CrmTask::UpdateLead { .. } => "update_lead",
            CrmTask::ScheduleMeeting { .. } => "schedule_meeting",
        }
    }
}

/// Serializes CRM tasks per lead.
///
/// Tasks for one lead run in turn, so a create finishes and records its CRM
/// id before a later task for the same lead looks at it.
#[derive(Default)]
pub struct CrmSyncQueue {
    leads: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl CrmSyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once no other task for the same lead is running.
    pub async fn run(
        &self,
        crm: &dyn CrmSync,
        store: &dyn LeadStore,
        tenant_id: &str,
        lead_id: &str,
        task: CrmTask,
    ) {
        let key = (tenant_id.to_string(), lead_id.to_string());
        let lead_lock = Arc::clone(self.leads.lock().await.entry(key.clone()).or_default());
        {
            let _turn = lead_lock.lock().await;
            run_crm_task(crm, store, task).await;
        }
        drop(lead_lock);

        let mut leads = self.leads.lock().await;
        if leads.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            leads.remove(&key);
        }
    }

    /// Number of leads with a task queued or running.
    pub async fn pending_leads(&self) -> usize {
        self.leads.lock().await.len()
    }
}

/// Run `task` against `crm`. Failures are logged, never returned.
///
/// A create for a lead that already has a CRM id becomes an update with the
/// lead's current contact details.
pub async fn run_crm_task(crm: &dyn CrmSync, store: &dyn LeadStore, task: CrmTask) {
    let operation = task.operation();
    match task {
        CrmTask::CreateLead { tenant_id, lead_id, lead } => {
            match store.get_lead(&tenant_id, &lead_id).await {
                Ok(Some(local)) => {
                    if let Some(crm_id) = local.crm_id {
                        info!(%tenant_id, %lead_id, %crm_id, "lead already in CRM, updating instead");
                        let update = CrmLeadUpdate {
                            name: local.name,
                            email: local.email,
                            phone: local.phone,
                            description: None,
                        };
                        if !update.is_empty() {
                            if let Err(e) = crm.update_lead(&crm_id, &update).await {
                                error!(%crm_id, operation, error = %e, "CRM sync failed");
                            }
                        }
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(%tenant_id, %lead_id, error = %e, "could not re-read lead before CRM create"),
            }
            create_lead(crm, store, &tenant_id, &lead_id, &lead).await;
        }
        CrmTask::UpdateLead { crm_id, update } => {
            if let Err(e) = crm.update_lead(&crm_id, &update).await {
                error!(%crm_id, operation, error = %e, "CRM sync failed");
            }
        }
        CrmTask::ScheduleMeeting { crm_id, appointment, update } => {
            if let Err(e) = crm.schedule_appointment(&crm_id, &appointment).await {
                error!(%crm_id, operation, error = %e, "CRM meeting could not be scheduled");
            }
            if let Err(e) = crm.update_lead(&crm_id, &update).await {
                error!(%crm_id, operation, error = %e, "CRM sync failed");
            }
        }
    }
}

async fn create_lead(crm: &dyn CrmSync, store: &dyn LeadStore, tenant_id: &str, lead_id: &str, lead: &CrmLead) {
    match crm.create_lead(lead).await {
        Ok(crm_id) => match store.set_crm_id(tenant_id, lead_id, &crm_id).await {
            Ok(()) => info!(tenant_id, lead_id, %crm_id, "lead mirrored to CRM"),
            Err(e) => error!(tenant_id, lead_id, %crm_id, error = %e, "failed to record CRM id"),
        },
        Err(e) => error!(tenant_id, lead_id, operation = "create_lead", error = %e, "CRM sync failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use leadbot_session::InMemoryLeadStore;

    use super::*;

    /// Counts calls; `create_lead` takes `delay` and returns id `77`.
    #[derive(Default)]
    struct CountingCrm {
        delay: Duration,
        creates: AtomicUsize,
        updates: Mutex<Vec<(String, CrmLeadUpdate)>>,
    }

    #[async_trait]
    impl CrmSync for CountingCrm {
        fn is_configured(&self) -> bool {
            true
        }

        async fn create_lead(&self, _lead: &CrmLead) -> leadbot_crm::Result<String> {
            tokio::time::sleep(self.delay).await;
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok("77".to_string())
        }

        async fn update_lead(&self, crm_id: &str, update: &CrmLeadUpdate) -> leadbot_crm::Result<()> {
            self.updates.lock().await.push((crm_id.to_string(), update.clone()));
            Ok(())
        }

        async fn schedule_appointment(
            &self,
            _crm_id: &str,
            _appointment: &CrmAppointment,
        ) -> leadbot_crm::Result<()> {
            Ok(())
        }
    }

    fn create_task(tenant_id: &str, lead_id: &str) -> CrmTask {
        CrmTask::CreateLead {
            tenant_id: tenant_id.to_string(),
            lead_id: lead_id.to_string(),
            lead: CrmLead { name: "Lead desde chat".to_string(), ..CrmLead::default() },
        }
    }

    #[tokio::test]
    async fn create_for_a_mirrored_lead_becomes_an_update() {
        let crm = CountingCrm::default();
        let store = InMemoryLeadStore::new();
        let mut lead = store.create_lead("rtd").await.unwrap();
        lead.email = Some("ana@acme.com".to_string());
        store.save_lead(&lead).await.unwrap();
        store.set_crm_id("rtd", &lead.id, "41").await.unwrap();

        run_crm_task(&crm, &store, create_task("rtd", &lead.id)).await;

        assert_eq!(crm.creates.load(Ordering::SeqCst), 0);
        let updates = crm.updates.lock().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "41");
        assert_eq!(updates[0].1.email.as_deref(), Some("ana@acme.com"));
    }

    #[tokio::test]
    async fn queued_creates_for_one_lead_create_once() {
        let crm = Arc::new(CountingCrm { delay: Duration::from_millis(100), ..CountingCrm::default() });
        let store = Arc::new(InMemoryLeadStore::new());
        let lead = store.create_lead("rtd").await.unwrap();
        let queue = Arc::new(CrmSyncQueue::new());

        let mut handles = Vec::new();
        for _ in 0..2 {
            let (crm, store, queue, lead_id) =
                (crm.clone(), store.clone(), queue.clone(), lead.id.clone());
            handles.push(tokio::spawn(async move {
                queue.run(crm.as_ref(), store.as_ref(), "rtd", &lead_id, create_task("rtd", &lead_id)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(crm.creates.load(Ordering::SeqCst), 1);
        let stored = store.get_lead("rtd", &lead.id).await.unwrap().unwrap();
        assert_eq!(stored.crm_id.as_deref(), Some("77"));
        assert_eq!(queue.pending_leads().await, 0);
    }
}
