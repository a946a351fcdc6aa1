//! Prompt assembly for the sales assistant.

use leadbot_model::FunctionSchema;
use leadbot_rag::SearchResult;
use serde_json::json;

/// Persona and rules of the sales consultant.
pub const SALES_AGENT_SYSTEM_PROMPT: &str = r#"Eres el Consultor Senior de Ingeniería de Real to Digital, experto en Metrología 3D, BIM y Optimización de Activos.

TU PERFIL ESTRATÉGICO:
- Tono: Formal, técnico y ejecutivo.
- Adaptabilidad:
    * Perfil Técnico (Ingenieros/BIM): Habla de "precisión milimétrica", "nubes de puntos" y "LOD".
    * Perfil Directivo (CEO/Gerente): Habla de "ROI", "reducción de costes operativos" y "eficiencia de activos".

REGLAS DE ORO (ESTRICTAS):
1. UNA SOLA PREGUNTA: Máximo una pregunta por mensaje para no abrumar.
2. BREVEDAD: Máximo 30 palabras.
3. CIERRE PERSISTENTE: Si no tienes el Email Corporativo, cualquier explicación técnica debe terminar invitando a enviarle el "Dossier de Especificaciones Técnicas" a su correo.
4. GESTIÓN DE PRECIOS: Di que "Cada proyecto industrial es único. Tras analizar su caso vía email, el departamento de proyectos emitirá una valoración técnico-económica precisa".
5. PNL DE AUTORIDAD: Valida el reto y posiciona a Real to Digital como el socio estratégico.

FLUJO DE ÉLITE:
- Paso 1: Saludo formal y Nombre.
- Paso 2: Validación del reto + Valor Técnico/Estratégico (RAG).
- Paso 3: Captura de Empresa y Email Corporativo para el dossier."#;

/// Example exchanges that anchor tone and length.
pub const FEW_SHOT_EXAMPLES: &str = r#"User: Hola, necesito escanear una nave industrial.
Assistant: Es un placer saludarle. Para este tipo de activos, la precisión en la nube de puntos es crítica. ¿Con quién tengo el gusto de hablar para detallar los requisitos?

User: Soy Luis.
Assistant: Gracias, Luis. Respecto a la nave, ¿qué nivel de detalle (LOD) o tolerancias milimétricas requieren para su integración en el flujo de trabajo BIM?"#;

/// Header that introduces retrieved knowledge in the system message.
pub const CONTEXT_HEADER: &str = "CONTEXTO DE LA BASE DE CONOCIMIENTO (Usa esto para responder):";

pub const CAPTURE_CONTACT_INFO: &str = "capture_contact_info";
pub const QUALIFY_LEAD: &str = "qualify_lead";
pub const SCHEDULE_MEETING: &str = "schedule_meeting";

/// The retrieved chunks as a context block, or an empty string when nothing
/// was retrieved.
pub fn context_block(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = results.iter().map(|r| format!("- {}", r.content)).collect();
    format!("\n\n{CONTEXT_HEADER}\n{}", lines.join("\n"))
}

/// The single system message: instructions, examples and retrieved context.
pub fn system_message(results: &[SearchResult]) -> String {
    format!("{SALES_AGENT_SYSTEM_PROMPT}\n\n{FEW_SHOT_EXAMPLES}{}", context_block(results))
}

/// The functions offered to the model on every turn.
pub fn function_schemas() -> Vec<FunctionSchema> {
    vec![
        FunctionSchema::new(
            CAPTURE_CONTACT_INFO,
            "Guarda la información de contacto y corporativa del lead para el CRM Odoo.",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Nombre completo" },
                    "company_name": { "type": "string", "description": "Nombre de la empresa" },
                    "job_title": { "type": "string", "description": "Cargo o puesto" },
                    "email": { "type": "string", "description": "Correo electrónico" },
                    "phone": { "type": "string", "description": "Teléfono" }
                }
            }),
        ),
        FunctionSchema::new(
            QUALIFY_LEAD,
            "Registra detalles técnicos del proyecto.",
            json!({
                "type": "object",
                "properties": {
                    "needs": { "type": "string", "description": "Descripción técnica de lo que busca" },
                    "location": { "type": "string", "description": "Ubicación" },
                    "budget": {
                        "type": "string",
                        "enum": ["<5k", "5k-20k", "20k-50k", ">50k"],
                        "description": "Presupuesto estimado"
                    },
                    "urgency": {
                        "type": "string",
                        "enum": ["inmediata", "1-3 meses", "3-6 meses", "sin prisa"],
                        "description": "Plazo del proyecto"
                    }
                }
            }),
        ),
        FunctionSchema::new(
            SCHEDULE_MEETING,
            "Inicia el proceso de agendar la reunión técnica previa.",
            json!({
                "type": "object",
                "properties": {
                    "preferred_date": { "type": "string", "description": "Fecha/hora sugerida" },
                    "notes": { "type": "string", "description": "Breve nota del motivo" }
                },
                "required": ["preferred_date"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use leadbot_rag::Metadata;

    use super::*;

    fn result(content: &str) -> SearchResult {
        SearchResult {
            id: "1".into(),
            content: content.into(),
            similarity: 0.8,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn empty_retrieval_adds_no_context() {
        assert_eq!(context_block(&[]), "");
        let system = system_message(&[]);
        assert!(system.starts_with(SALES_AGENT_SYSTEM_PROMPT));
        assert!(system.ends_with(FEW_SHOT_EXAMPLES));
    }

    #[test]
    fn context_lists_each_chunk() {
        let block = context_block(&[result("Escaneado 3D."), result("Modelado BIM.")]);
        assert_eq!(block, format!("\n\n{CONTEXT_HEADER}\n- Escaneado 3D.\n- Modelado BIM."));
        assert!(system_message(&[result("Escaneado 3D.")]).contains("- Escaneado 3D."));
    }

    #[test]
    fn schedule_meeting_requires_a_date() {
        let schemas = function_schemas();
        let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![CAPTURE_CONTACT_INFO, QUALIFY_LEAD, SCHEDULE_MEETING]);
        assert_eq!(schemas[2].parameters["required"], json!(["preferred_date"]));
    }
}
