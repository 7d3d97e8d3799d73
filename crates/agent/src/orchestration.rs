use std::sync::{Arc, OnceLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use qualcel_core::domain::conversation::{last_user_turn, ConversationTurn};
use qualcel_core::domain::criterion::{
    is_allowed_type, Criterion, ALLOWED_CRITERION_TYPES, FREE_TEXT_TYPE, PRICE_INTERVAL_TYPE,
};
use qualcel_core::domain::selectors::SelectorMap;

use crate::criteria;
use crate::llm::LlmClient;

/// Canonical question returned whenever the model call or its answer fails.
pub const FALLBACK_ERROR_PROMPT: &str =
    "Desculpe, tive um problema ao processar seu pedido. Pode tentar de novo?";

fn fallback_question_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)desculpe,\s*tive um problema").expect("fallback regex must compile")
    })
}

fn json_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("object regex must compile"))
}

fn json_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("array regex must compile"))
}

/// Whether a question is the adapter's own failure prompt rather than a
/// genuine clarifying question from the model.
pub fn is_fallback_question(question: Option<&str>) -> bool {
    question.is_some_and(|question| {
        question.trim() == FALLBACK_ERROR_PROMPT || fallback_question_re().is_match(question)
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrchestratorDecision {
    Ask { question: Option<String> },
    Search { criteria: Vec<Criterion> },
}

impl OrchestratorDecision {
    pub fn fallback() -> Self {
        Self::Ask { question: Some(FALLBACK_ERROR_PROMPT.to_string()) }
    }

    pub fn criteria(&self) -> Option<&[Criterion]> {
        match self {
            Self::Search { criteria } => Some(criteria),
            Self::Ask { .. } => None,
        }
    }

    pub fn question(&self) -> Option<&str> {
        match self {
            Self::Ask { question } => question.as_deref(),
            Self::Search { .. } => None,
        }
    }
}

/// Ask-or-search decision plus free-text extraction. Implementations never
/// fail: errors degrade to [`OrchestratorDecision::fallback`] or an empty list.
#[async_trait]
pub trait CriteriaOrchestrator: Send + Sync {
    async fn orchestrate(
        &self,
        history: &[ConversationTurn],
        selectors: &SelectorMap,
    ) -> OrchestratorDecision;

    async fn extract(&self, text: &str) -> Vec<Criterion>;
}

pub struct LlmOrchestrator {
    llm: Option<Arc<dyn LlmClient>>,
}

impl LlmOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// No model configured: always searches with no AI criteria.
    pub fn disabled() -> Self {
        Self { llm: None }
    }

    pub fn from_client(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CriteriaOrchestrator for LlmOrchestrator {
    async fn orchestrate(
        &self,
        history: &[ConversationTurn],
        selectors: &SelectorMap,
    ) -> OrchestratorDecision {
        let Some(llm) = &self.llm else {
            return OrchestratorDecision::Search { criteria: Vec::new() };
        };

        let user_text = criteria::user_text(last_user_turn(history));
        let outcome = match build_orchestration_prompt(history, selectors, user_text.as_deref()) {
            Ok(prompt) => llm
                .complete(&prompt)
                .await
                .and_then(|raw| interpret_orchestration(&raw, user_text.as_deref())),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(decision) => {
                debug!(
                    event_name = "agent.orchestration.decided",
                    search = decision.criteria().is_some(),
                    "ai orchestration decided"
                );
                decision
            }
            Err(error) => {
                warn!(
                    event_name = "agent.orchestration.fallback",
                    error = %error,
                    "ai orchestration failed, falling back to a clarifying question"
                );
                OrchestratorDecision::fallback()
            }
        }
    }

    async fn extract(&self, text: &str) -> Vec<Criterion> {
        let Some(llm) = &self.llm else {
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        let raw = match llm.complete(&build_extraction_prompt(text)).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    event_name = "agent.extraction.failed",
                    error = %error,
                    "ai extraction failed"
                );
                return Vec::new();
            }
        };

        parse_extracted_criteria(&raw).unwrap_or_else(|| {
            warn!(
                event_name = "agent.extraction.invalid_payload",
                "ai extraction answer was not a criteria array"
            );
            Vec::new()
        })
    }
}

/// Strict envelope first, then the lazy key/value shape, else an error.
pub fn interpret_orchestration(
    raw: &str,
    user_text: Option<&str>,
) -> Result<OrchestratorDecision> {
    let value =
        parse_json_object(raw).ok_or_else(|| anyhow!("model answer carried no JSON object"))?;

    if let Some(decision) = decision_from_envelope(&value, user_text) {
        return Ok(decision);
    }
    if let Some(decision) = decision_from_lazy_shape(&value) {
        warn!(
            event_name = "agent.orchestration.lazy_shape",
            "model answered with bare criteria, reshaping into a search"
        );
        return Ok(decision);
    }
    bail!("unexpected orchestration answer: {raw}")
}

/// Direct parse, else the outermost `{...}` block.
pub fn parse_json_object(raw: &str) -> Option<Value> {
    let direct = serde_json::from_str::<Value>(raw.trim()).ok().filter(Value::is_object);
    direct.or_else(|| {
        let block = json_object_re().find(raw)?;
        serde_json::from_str::<Value>(block.as_str()).ok().filter(Value::is_object)
    })
}

fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(*name))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn criterion_from_value(value: &Value) -> Option<Criterion> {
    let kind = field(value, &["type", "tipo"])?.as_str()?;
    let description = scalar_text(field(value, &["description", "descricao"])?)?;
    Criterion::new(kind, description).normalized()
}

/// `{action, data}` answers. A search without criteria falls back to the
/// user's own words so a search never runs empty after the user said something.
pub fn decision_from_envelope(
    value: &Value,
    user_text: Option<&str>,
) -> Option<OrchestratorDecision> {
    let action = field(value, &["action", "acao"])?.as_str()?.trim().to_uppercase();
    let data = field(value, &["data", "dados"]);

    match action.as_str() {
        "ASK" | "PERGUNTAR" => {
            let question = data
                .and_then(|data| field(data, &["question", "pergunta"]))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|question| !question.is_empty())
                .map(str::to_owned);
            Some(OrchestratorDecision::Ask { question })
        }
        "SEARCH" | "PESQUISAR" => {
            let mut criteria: Vec<Criterion> = data
                .and_then(|data| field(data, &["criteria", "filtros"]))
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(criterion_from_value).collect())
                .unwrap_or_default();
            if criteria.is_empty() {
                if let Some(text) = user_text.map(str::trim).filter(|text| !text.is_empty()) {
                    criteria.push(Criterion::free_text(text));
                }
            }
            Some(OrchestratorDecision::Search { criteria })
        }
        _ => None,
    }
}

fn lazy_key_type(key: &str) -> Option<&'static str> {
    let key = key.trim().to_lowercase();
    match key.as_str() {
        "price_range" => Some(PRICE_INTERVAL_TYPE),
        FREE_TEXT_TYPE => Some(FREE_TEXT_TYPE),
        other => ALLOWED_CRITERION_TYPES.iter().find(|allowed| **allowed == other).copied(),
    }
}

/// Bare `{ "ram": "8" }` answers. `None` when no key names a criterion type.
pub fn decision_from_lazy_shape(value: &Value) -> Option<OrchestratorDecision> {
    let object = value.as_object()?;
    let recognized: Vec<(&'static str, &Value)> =
        object.iter().filter_map(|(key, raw)| Some((lazy_key_type(key)?, raw))).collect();
    if recognized.is_empty() {
        return None;
    }

    let criteria = recognized
        .into_iter()
        .filter_map(|(kind, raw)| Criterion::new(kind, scalar_text(raw)?).normalized())
        .collect();
    Some(OrchestratorDecision::Search { criteria })
}

/// Criteria array from an extraction answer, keeping allowed and free-text
/// types only. `None` when no array can be recovered.
pub fn parse_extracted_criteria(raw: &str) -> Option<Vec<Criterion>> {
    let direct = serde_json::from_str::<Value>(raw.trim()).ok().filter(Value::is_array);
    let value = direct.or_else(|| {
        let block = json_array_re().find(raw)?;
        serde_json::from_str::<Value>(block.as_str()).ok()
    })?;

    let criteria = value
        .as_array()?
        .iter()
        .filter_map(criterion_from_value)
        .filter(|criterion| is_allowed_type(&criterion.kind) || criterion.is_free_text())
        .collect();
    Some(criteria)
}

pub fn build_orchestration_prompt(
    history: &[ConversationTurn],
    selectors: &SelectorMap,
    user_text: Option<&str>,
) -> Result<String> {
    let history_json = serde_json::to_string(history)?;
    let selectors_json = serde_json::to_string(selectors)?;
    let allowed = ALLOWED_CRITERION_TYPES.join(", ");
    let user_text = user_text.unwrap_or_default();

    Ok(format!(
        r#"Você ajuda a escolher um celular. Decida o próximo passo da conversa e, se for pesquisar, extraia os critérios.

Responda SOMENTE com JSON puro, sem texto fora do JSON.

Histórico da conversa:
{history_json}

Filtros escolhidos na interface:
{selectors_json}

Tipos de critério permitidos: {allowed}, {FREE_TEXT_TYPE}

Regras:
1. Se faltar informação (por exemplo, orçamento) ou o usuário só cumprimentou, pergunte:
   {{"action": "ASK", "data": {{"question": "..."}}}}
2. Se houver informação suficiente, pesquise e extraia TODOS os critérios da última mensagem:
   {{"action": "SEARCH", "data": {{"criteria": [{{"type": "ram", "description": "8"}}]}}}}

Texto do usuário:
"""{user_text}""""#
    ))
}

pub fn build_extraction_prompt(text: &str) -> String {
    let allowed = ALLOWED_CRITERION_TYPES.join(", ");
    format!(
        r#"Você extrai critérios técnicos de celular a partir de texto livre.
Responda SOMENTE com um array JSON válido:
[{{"type": "um dos tipos permitidos", "description": "valor convertido"}}]

Tipos permitidos: {allowed}, {FREE_TEXT_TYPE}

Regras:
- Extraia todas as características citadas, mesmo vagas, uma entrada por característica.
- Câmeras diferentes (principal, frontal...) viram entradas separadas.
- Nomes técnicos (ex.: Snapdragon) são devolvidos exatamente como citados.
- Sem correspondência, use "{FREE_TEXT_TYPE}" com o texto original.

Conversões de termos vagos:
RAM: "básica" -> 4; "intermediária" -> 6; "boa", "ótima" -> 8; "excelente", "topo" -> 12
ROM: "baixo" -> 64; "intermediário" -> 128; "grande espaço" -> 256; "muito espaço", "máximo" -> 512
Bateria: "uso leve" -> 4000; "uso moderado" -> 4500; "boa bateria", "dura o dia todo" -> 5000; "dura mais de um dia" -> 6000
Benchmark: "básico" -> 400000; "intermediário" -> 700000; "avançado" -> 1000000; "topo de linha" -> 1500000
Tela (screen_size): "pequena" -> 5.5; "média" -> 6.0; "grande" -> 6.5; "gigante" -> 6.8
Câmeras: "fraca" -> 12; "razoável" -> 20; "boa" -> 50; "top" -> 64
Taxa de atualização (refresh_rate): "normal" -> 60; "boa" -> 90; "ótima" -> 120

Exemplo:
Usuário: "quero 6GB de RAM, tela gigante e bateria que dure o dia todo"
Saída: [{{"type": "ram", "description": "6"}}, {{"type": "screen_size", "description": "6.8"}}, {{"type": "battery", "description": "5000"}}]

Texto do usuário:
"""{text}""""#
    )
}
