//! End-to-end chat turns over in-memory stores, the hashing embedder and a
//! scripted completion model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadbot_agent::{
    AgentError, ConversationOrchestrator, FALLBACK_REPLY, OrchestratorConfig, SideEffect,
    TurnOutcome, TurnRequest,
};
use leadbot_agent::prompt::CONTEXT_HEADER;
use leadbot_crm::{CrmAppointment, CrmLead, CrmLeadUpdate, CrmSync};
use leadbot_model::{FunctionCall, MockCompletionModel, ModelError, Reply, Role};
use leadbot_rag::{
    HashingEmbeddingProvider, InMemoryKnowledgeStore, IngestionPipeline, Metadata, RagConfig,
    RetrievalService,
};
use leadbot_session::{InMemoryLeadStore, LeadStatus, LeadStore, MessageRole};
use serde_json::json;
use tokio::sync::mpsc;

const TENANT: &str = "rtd";
const KB_DOCUMENT: &str = "Escaneado 3D de precisión. Modelado BIM avanzado.";

#[derive(Debug, Clone, PartialEq)]
enum CrmCall {
    Create(CrmLead),
    Update(String, CrmLeadUpdate),
    Schedule(String, CrmAppointment),
}

/// Reports every call on a channel and hands out CRM id `900`.
struct RecordingCrm {
    calls: mpsc::UnboundedSender<CrmCall>,
    create_delay: Duration,
}

impl RecordingCrm {
    fn new() -> (Arc<dyn CrmSync>, mpsc::UnboundedReceiver<CrmCall>) {
        Self::slow(Duration::ZERO)
    }

    /// Lead creation takes `create_delay` before answering.
    fn slow(create_delay: Duration) -> (Arc<dyn CrmSync>, mpsc::UnboundedReceiver<CrmCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls: tx, create_delay }), rx)
    }
}

#[async_trait]
impl CrmSync for RecordingCrm {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_lead(&self, lead: &CrmLead) -> leadbot_crm::Result<String> {
        tokio::time::sleep(self.create_delay).await;
        let _ = self.calls.send(CrmCall::Create(lead.clone()));
        Ok("900".to_string())
    }

    async fn update_lead(&self, crm_id: &str, update: &CrmLeadUpdate) -> leadbot_crm::Result<()> {
        let _ = self.calls.send(CrmCall::Update(crm_id.to_string(), update.clone()));
        Ok(())
    }

    async fn schedule_appointment(
        &self,
        crm_id: &str,
        appointment: &CrmAppointment,
    ) -> leadbot_crm::Result<()> {
        let _ = self.calls.send(CrmCall::Schedule(crm_id.to_string(), appointment.clone()));
        Ok(())
    }
}

async fn next_crm_call(rx: &mut mpsc::UnboundedReceiver<CrmCall>) -> CrmCall {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("CRM call expected")
        .expect("CRM channel open")
}

struct Harness {
    orchestrator: ConversationOrchestrator,
    model: Arc<MockCompletionModel>,
    leads: Arc<InMemoryLeadStore>,
}

async fn harness(
    model: MockCompletionModel,
    crm: Option<Arc<dyn CrmSync>>,
    config: OrchestratorConfig,
) -> Harness {
    let embedder = Arc::new(HashingEmbeddingProvider::new(256));
    let knowledge = Arc::new(InMemoryKnowledgeStore::new());
    let pipeline = IngestionPipeline::builder()
        .config(RagConfig::builder().chunk_size(30).build().unwrap())
        .embedding_provider(embedder.clone())
        .knowledge_store(knowledge.clone())
        .build()
        .unwrap();
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), json!("Real to Digital KB"));
    assert_eq!(pipeline.ingest_document(KB_DOCUMENT, TENANT, &metadata).await.unwrap(), 2);

    let model = Arc::new(model);
    let leads = Arc::new(InMemoryLeadStore::new());
    let mut builder = ConversationOrchestrator::builder()
        .model(model.clone())
        .retrieval(RetrievalService::new(embedder, knowledge))
        .lead_store(leads.clone())
        .config(config);
    if let Some(crm) = crm {
        builder = builder.crm(crm);
    }

    Harness { orchestrator: builder.build().unwrap(), model, leads }
}

fn has_effect(outcome: &TurnOutcome, effect: &SideEffect) -> bool {
    outcome.side_effects.iter().any(|e| e == effect)
}

#[tokio::test]
async fn text_reply_is_grounded_and_persisted() {
    let h = harness(
        MockCompletionModel::new("mock").with_text("Es un placer saludarle. ¿Con quién hablo?"),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Escaneado 3D de precisión."))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Es un placer saludarle. ¿Con quién hablo?");
    assert_eq!(outcome.function_called, None);
    assert!(has_effect(&outcome, &SideEffect::LeadCreated { lead_id: outcome.lead_id.clone() }));
    assert!(has_effect(&outcome, &SideEffect::UserMessageStored));
    assert!(has_effect(&outcome, &SideEffect::AssistantMessageStored));

    let requests = h.model.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.functions.len(), 3);
    assert_eq!(request.temperature, Some(0.5));
    assert_eq!(request.max_tokens, Some(300));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0].content.contains(CONTEXT_HEADER));
    assert!(request.messages[0].content.contains("- Escaneado 3D de precisión."));
    assert_eq!(request.messages[1].role, Role::User);

    let history = h.leads.recent_messages(TENANT, &outcome.lead_id, 20).await.unwrap();
    let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
}

#[tokio::test]
async fn history_is_replayed_on_the_next_turn() {
    let h = harness(
        MockCompletionModel::new("mock").with_text("¿Con quién hablo?").with_text("Gracias, Luis."),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let first = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Hola")).await.unwrap();
    let second = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Soy Luis.").with_lead_id(first.lead_id.clone()))
        .await
        .unwrap();

    assert_eq!(second.lead_id, first.lead_id);
    assert!(!has_effect(&second, &SideEffect::LeadCreated { lead_id: second.lead_id.clone() }));

    let requests = h.model.requests();
    let messages = &requests[1].messages;
    let transcript: Vec<(Role, &str)> =
        messages.iter().skip(1).map(|m| (m.role, m.content.as_str())).collect();
    assert_eq!(
        transcript,
        vec![(Role::User, "Hola"), (Role::Assistant, "¿Con quién hablo?"), (Role::User, "Soy Luis.")]
    );
}

#[tokio::test]
async fn unknown_or_foreign_lead_ids_start_a_new_lead() {
    let h = harness(
        MockCompletionModel::new("mock").with_text("Hola.").with_text("Hola de nuevo."),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let unknown = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Hola").with_lead_id("does-not-exist"))
        .await
        .unwrap();
    assert_ne!(unknown.lead_id, "does-not-exist");

    let foreign = h.leads.create_lead("other-tenant").await.unwrap();
    let outcome = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Hola").with_lead_id(foreign.id.clone()))
        .await
        .unwrap();
    assert_ne!(outcome.lead_id, foreign.id);
    assert!(h.leads.recent_messages("other-tenant", &foreign.id, 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn contact_capture_round_trip_syncs_crm() {
    let (crm, mut calls) = RecordingCrm::new();
    let h = harness(
        MockCompletionModel::new("mock")
            .with_function_call(
                "capture_contact_info",
                json!({ "name": "Ana Ruiz", "company_name": "Acme", "email": "ana@acme.com" }),
            )
            .with_text("Gracias, Ana. Le enviaré el dossier."),
        Some(crm),
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Soy Ana Ruiz de Acme, ana@acme.com"))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Gracias, Ana. Le enviaré el dossier.");
    assert_eq!(outcome.function_called.as_deref(), Some("capture_contact_info"));
    assert!(has_effect(
        &outcome,
        &SideEffect::FunctionExecuted { name: "capture_contact_info".into(), succeeded: true }
    ));
    assert!(has_effect(&outcome, &SideEffect::CrmSyncScheduled { operation: "create_lead".into() }));

    let requests = h.model.requests();
    assert_eq!(requests.len(), 2);
    let followup = &requests[1];
    assert_eq!(followup.max_tokens, Some(50));
    assert!(followup.functions.is_empty());
    let n = followup.messages.len();
    assert_eq!(followup.messages[n - 2].role, Role::Assistant);
    assert!(followup.messages[n - 2].function_call.is_some());
    assert_eq!(followup.messages[n - 1].role, Role::Tool);
    assert!(followup.messages[n - 1].content.contains("\"status\":\"success\""));

    let CrmCall::Create(crm_lead) = next_crm_call(&mut calls).await else {
        panic!("expected a CRM lead creation");
    };
    assert_eq!(crm_lead.name, "Ana Ruiz");
    assert_eq!(crm_lead.company.as_deref(), Some("Acme"));
    assert!(crm_lead.description.unwrap().contains(&outcome.lead_id));

    let mut lead = h.leads.get_lead(TENANT, &outcome.lead_id).await.unwrap().unwrap();
    for _ in 0..50 {
        if lead.crm_id.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        lead = h.leads.get_lead(TENANT, &outcome.lead_id).await.unwrap().unwrap();
    }
    assert_eq!(lead.crm_id.as_deref(), Some("900"));
    assert_eq!(lead.email.as_deref(), Some("ana@acme.com"));
    assert_eq!(lead.status, LeadStatus::Contacted);

    let history = h.leads.recent_messages(TENANT, &outcome.lead_id, 20).await.unwrap();
    assert_eq!(history[1].function_called.as_deref(), Some("capture_contact_info"));
}

#[tokio::test]
async fn back_to_back_captures_create_the_crm_lead_once() {
    let (crm, mut calls) = RecordingCrm::slow(Duration::from_millis(200));
    let h = harness(
        MockCompletionModel::new("mock")
            .with_function_call("capture_contact_info", json!({ "name": "Ana Ruiz", "email": "ana@acme.com" }))
            .with_text("Gracias, Ana.")
            .with_function_call("capture_contact_info", json!({ "phone": "+34 600 000 000" }))
            .with_text("Anotado su teléfono."),
        Some(crm),
        OrchestratorConfig::default(),
    )
    .await;

    let first = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Soy Ana Ruiz, ana@acme.com"))
        .await
        .unwrap();
    let second = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Mi teléfono es +34 600 000 000").with_lead_id(first.lead_id.clone()))
        .await
        .unwrap();
    assert_eq!(second.lead_id, first.lead_id);
    assert!(h.leads.get_lead(TENANT, &first.lead_id).await.unwrap().unwrap().crm_id.is_none());

    let CrmCall::Create(created) = next_crm_call(&mut calls).await else {
        panic!("expected a CRM lead creation");
    };
    assert_eq!(created.email.as_deref(), Some("ana@acme.com"));

    let CrmCall::Update(crm_id, update) = next_crm_call(&mut calls).await else {
        panic!("expected the second capture to update the created lead");
    };
    assert_eq!(crm_id, "900");
    assert_eq!(update.phone.as_deref(), Some("+34 600 000 000"));
    assert_eq!(update.email.as_deref(), Some("ana@acme.com"));

    assert!(tokio::time::timeout(Duration::from_millis(300), calls.recv()).await.is_err());
    let lead = h.leads.get_lead(TENANT, &first.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.crm_id.as_deref(), Some("900"));
}

#[tokio::test]
async fn untagged_tenant_knowledge_reaches_the_prompt() {
    let embedder = Arc::new(HashingEmbeddingProvider::new(256));
    let knowledge = Arc::new(InMemoryKnowledgeStore::new());
    let pipeline = IngestionPipeline::builder()
        .embedding_provider(embedder.clone())
        .knowledge_store(knowledge.clone())
        .build()
        .unwrap();
    pipeline.ingest_document("Escaneado 3D de precisión.", "acme", &Metadata::new()).await.unwrap();

    let turn = |config: OrchestratorConfig| {
        let model = Arc::new(MockCompletionModel::new("mock").with_text("Claro."));
        let orchestrator = ConversationOrchestrator::builder()
            .model(model.clone())
            .retrieval(RetrievalService::new(embedder.clone(), knowledge.clone()))
            .lead_store(Arc::new(InMemoryLeadStore::new()))
            .config(config)
            .build()
            .unwrap();
        async move {
            orchestrator.handle_turn(TurnRequest::new("acme", "Escaneado 3D de precisión.")).await.unwrap();
            model.requests()[0].messages[0].content.clone()
        }
    };

    let prompt = turn(OrchestratorConfig::default()).await;
    assert!(prompt.contains(CONTEXT_HEADER));
    assert!(prompt.contains("- Escaneado 3D de precisión."));

    let narrowed = turn(OrchestratorConfig::default().with_knowledge_source("Real to Digital KB")).await;
    assert!(!narrowed.contains(CONTEXT_HEADER));
}

#[tokio::test]
async fn text_alongside_a_call_skips_the_confirmation() {
    let call = FunctionCall::new("qualify_lead", r#"{"needs":"nube de puntos"}"#).with_id("call_1");
    let h = harness(
        MockCompletionModel::new("mock")
            .with_reply(Reply::FunctionCall { call, text: Some("Perfecto, tomo nota.".into()) }),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Necesito una nube de puntos")).await.unwrap();

    assert_eq!(outcome.reply, "Perfecto, tomo nota.");
    assert_eq!(h.model.requests().len(), 1);
    let lead = h.leads.get_lead(TENANT, &outcome.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.interests, vec!["nube de puntos".to_string()]);
    assert_eq!(lead.interest_score, Some(50));
}

#[tokio::test]
async fn qualification_updates_a_mirrored_lead() {
    let (crm, mut calls) = RecordingCrm::new();
    let h = harness(
        MockCompletionModel::new("mock")
            .with_text("¿Con quién hablo?")
            .with_function_call(
                "qualify_lead",
                json!({ "needs": "Escaneado de planta", "budget": ">50k", "urgency": "inmediata" }),
            )
            .with_text("Entendido."),
        Some(crm),
        OrchestratorConfig::default(),
    )
    .await;

    let first = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Hola")).await.unwrap();
    h.leads.set_crm_id(TENANT, &first.lead_id, "900").await.unwrap();

    let outcome = h
        .orchestrator
        .handle_turn(TurnRequest::new(TENANT, "Presupuesto alto, lo antes posible").with_lead_id(first.lead_id.clone()))
        .await
        .unwrap();
    assert!(has_effect(&outcome, &SideEffect::CrmSyncScheduled { operation: "update_lead".into() }));

    let lead = h.leads.get_lead(TENANT, &first.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.interest_score, Some(100));
    assert_eq!(lead.status, LeadStatus::Qualified);

    let CrmCall::Update(crm_id, update) = next_crm_call(&mut calls).await else {
        panic!("expected a CRM update");
    };
    assert_eq!(crm_id, "900");
    let description = update.description.unwrap();
    assert!(description.starts_with("[ACTUALIZACIÓN CUALIFICACIÓN]"));
    assert!(description.ends_with("Score IA: 100/100"));
}

#[tokio::test]
async fn meeting_is_recorded_and_scheduled_in_crm() {
    let (crm, mut calls) = RecordingCrm::new();
    let h = harness(
        MockCompletionModel::new("mock")
            .with_text("Hola.")
            .with_function_call(
                "schedule_meeting",
                json!({ "preferred_date": "2026-11-03 10:00", "notes": "visita a planta" }),
            )
            .with_text("Reunión agendada."),
        Some(crm),
        OrchestratorConfig::default(),
    )
    .await;

    let first = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Hola")).await.unwrap();
    h.leads.set_crm_id(TENANT, &first.lead_id, "900").await.unwrap();
    h.orchestrator
        .handle_turn(TurnRequest::new(TENANT, "El 3 de noviembre a las 10").with_lead_id(first.lead_id.clone()))
        .await
        .unwrap();

    let lead = h.leads.get_lead(TENANT, &first.lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::MeetingScheduled);
    assert_eq!(lead.timeline.len(), 1);
    assert_eq!(lead.timeline[0].requested, "2026-11-03 10:00");
    assert!(lead.timeline[0].date.is_some());

    let CrmCall::Schedule(crm_id, appointment) = next_crm_call(&mut calls).await else {
        panic!("expected a CRM meeting");
    };
    assert_eq!(crm_id, "900");
    assert_eq!(appointment.summary, "Reunión IA: visita a planta");
    let CrmCall::Update(_, update) = next_crm_call(&mut calls).await else {
        panic!("expected a CRM update after the meeting");
    };
    assert_eq!(
        update.description.as_deref(),
        Some("[NUEVA REUNIÓN] Fecha: 2026-11-03 10:00. Notas: visita a planta")
    );
}

#[tokio::test]
async fn unknown_function_is_reported_to_the_model() {
    let h = harness(
        MockCompletionModel::new("mock")
            .with_function_call("launch_rocket", json!({}))
            .with_text("No puedo hacer eso."),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Lanza el cohete")).await.unwrap();

    assert!(has_effect(
        &outcome,
        &SideEffect::FunctionExecuted { name: "launch_rocket".into(), succeeded: false }
    ));
    let requests = h.model.requests();
    let followup = &requests[1];
    let result = followup.messages.last().unwrap();
    assert_eq!(result.content, r#"{"error":"Unknown function"}"#);
}

#[tokio::test]
async fn completion_failure_falls_back() {
    let h = harness(
        MockCompletionModel::new("mock").with_error(ModelError::Request {
            provider: "mock".into(),
            message: "connection reset".into(),
        }),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Hola")).await.unwrap();
    assert_eq!(outcome.reply, FALLBACK_REPLY);

    let history = h.leads.recent_messages(TENANT, &outcome.lead_id, 20).await.unwrap();
    assert_eq!(history.last().unwrap().content, FALLBACK_REPLY);
}

#[tokio::test]
async fn slow_completion_times_out_to_the_fallback() {
    let h = harness(
        MockCompletionModel::new("mock").with_text("demasiado tarde").with_delay(Duration::from_millis(500)),
        None,
        OrchestratorConfig::default().with_completion_timeout(Duration::from_millis(20)),
    )
    .await;

    let outcome = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Hola")).await.unwrap();
    assert_eq!(outcome.reply, FALLBACK_REPLY);
}

#[tokio::test]
async fn blank_confirmation_falls_back() {
    let h = harness(
        MockCompletionModel::new("mock")
            .with_function_call("capture_contact_info", json!({ "phone": "600000000" }))
            .with_text("   "),
        None,
        OrchestratorConfig::default(),
    )
    .await;

    let outcome = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "Mi teléfono es 600000000")).await.unwrap();
    assert_eq!(outcome.reply, FALLBACK_REPLY);
    assert_eq!(outcome.function_called.as_deref(), Some("capture_contact_info"));
    // No CRM configured, nothing scheduled.
    assert!(!outcome.side_effects.iter().any(|e| matches!(e, SideEffect::CrmSyncScheduled { .. })));
}

#[tokio::test]
async fn blank_fields_are_rejected_before_any_work() {
    let h = harness(MockCompletionModel::new("mock"), None, OrchestratorConfig::default()).await;

    let err = h.orchestrator.handle_turn(TurnRequest::new(TENANT, "   ")).await.unwrap_err();
    assert!(matches!(err, AgentError::Validation(_)));
    let err = h.orchestrator.handle_turn(TurnRequest::new("", "Hola")).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(h.leads.lead_count().await, 0);
    assert!(h.model.requests().is_empty());
}
