//! Active-recall tutor with three modes: learn, quiz and teach back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::str::FromStr;
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{check_cancelled, no_parameters, opt_str_arg, str_arg, Tool, ToolError, ToolResult, Toolbox};
use crate::commerce::orders::utc_now;
use crate::store::JsonListStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LearningMode {
    Learn,
    Quiz,
    TeachBack,
}

pub struct Concept {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub quiz_question: &'static str,
    pub key_terms: &'static [&'static str],
}

pub static CONCEPTS: &[Concept] = &[
    Concept {
        id: "variables",
        title: "Variables",
        summary: "A variable is a named box that stores a value. You give it a name, assign a value, and can change or read that value later in the program.",
        quiz_question: "What is a variable, and why would you give it a name?",
        key_terms: &["name", "value", "store", "assign"],
    },
    Concept {
        id: "loops",
        title: "Loops",
        summary: "A loop repeats a block of code. A for loop runs once per item or for a fixed count, and a while loop keeps going while a condition stays true.",
        quiz_question: "What is the difference between a for loop and a while loop?",
        key_terms: &["repeat", "condition", "for", "while", "each"],
    },
    Concept {
        id: "functions",
        title: "Functions",
        summary: "A function is a reusable block of code with a name. It takes parameters as input, does some work, and can return a value to the caller.",
        quiz_question: "Why do we write functions instead of copying the same code around?",
        key_terms: &["reuse", "parameter", "return", "call", "input"],
    },
    Concept {
        id: "conditionals",
        title: "Conditionals",
        summary: "Conditionals let a program make decisions. An if statement checks a condition and runs one branch when it is true, and an else branch otherwise.",
        quiz_question: "What happens in an if-else statement when the condition is false?",
        key_terms: &["if", "else", "condition", "true", "false", "branch"],
    },
];

pub fn concept_by_id(id: &str) -> Option<&'static Concept> {
    let id = id.trim().to_lowercase();
    CONCEPTS
        .iter()
        .find(|c| c.id == id || c.title.to_lowercase() == id)
}

/// Which key terms appear in an explanation, and the share of them as a 0-100 score
pub fn score_explanation(concept: &Concept, explanation: &str) -> (u32, Vec<&'static str>, Vec<&'static str>) {
    let text = explanation.to_lowercase();
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    // "repeats" counts for "repeat", "returned" for "return"
    let (matched, missing): (Vec<&'static str>, Vec<&'static str>) = concept
        .key_terms
        .iter()
        .partition(|term| words.iter().any(|w| w.starts_with(**term)));

    let score = if concept.key_terms.is_empty() {
        0
    } else {
        (matched.len() * 100 / concept.key_terms.len()) as u32
    };
    (score, matched, missing)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachBackRecord {
    pub concept_id: String,
    pub mode: LearningMode,
    pub score: u32,
    pub matched_terms: Vec<String>,
    pub missing_terms: Vec<String>,
    pub explanation: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TutorState {
    pub mode: LearningMode,
    pub concept: Option<&'static str>,
}

pub struct TutorTools {
    state: Mutex<TutorState>,
    store: JsonListStore<TeachBackRecord>,
}

impl TutorTools {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            state: Mutex::new(TutorState {
                mode: LearningMode::Learn,
                concept: None,
            }),
            store: JsonListStore::new(path),
        }
    }

    pub async fn state(&self) -> TutorState {
        *self.state.lock().await
    }

    pub fn progress(&self) -> Vec<TeachBackRecord> {
        self.store.load_all()
    }

    fn unknown_concept(id: &str) -> ToolResult {
        let ids: Vec<_> = CONCEPTS.iter().map(|c| c.id).collect();
        ToolResult::Escalation(format!(
            "There is no concept called '{}'. Available: {}.",
            id,
            ids.join(", ")
        ))
    }

    async fn list_concepts(&self) -> Result<ToolResult, ToolError> {
        let lines: Vec<String> = CONCEPTS
            .iter()
            .map(|c| format!("- {} (id: {})", c.title, c.id))
            .collect();
        Ok(ToolResult::Response(format!("Concepts we can cover:\n{}", lines.join("\n"))))
    }

    async fn set_learning_mode(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let raw_mode = str_arg(arguments, "mode")?;
        let mode = LearningMode::from_str(&raw_mode.to_lowercase().replace(['-', ' '], "_"))
            .map_err(|_| {
                ToolError::InvalidParameters(format!(
                    "Unknown mode '{}', expected learn, quiz or teach_back",
                    raw_mode
                ))
            })?;

        let mut state = self.state.lock().await;
        let concept = match opt_str_arg(arguments, "concept_id") {
            Some(id) => match concept_by_id(&id) {
                Some(concept) => Some(concept),
                None => return Ok(Self::unknown_concept(&id)),
            },
            None => state.concept.and_then(concept_by_id),
        };

        state.mode = mode;
        state.concept = concept.map(|c| c.id);
        log::info!("🎓 Learning mode set to {} ({:?})", mode, state.concept);

        let Some(concept) = concept else {
            return Ok(ToolResult::Response(format!(
                "Mode is now {}. Ask which concept the learner wants to work on.",
                mode
            )));
        };

        let guidance = match mode {
            LearningMode::Learn => format!("Explain {}: {}", concept.title, concept.summary),
            LearningMode::Quiz => format!("Ask the learner: {}", concept.quiz_question),
            LearningMode::TeachBack => format!(
                "Ask the learner to explain {} in their own words, then call record_teach_back with their explanation.",
                concept.title
            ),
        };
        Ok(ToolResult::Response(format!("Mode is now {}. {}", mode, guidance)))
    }

    async fn get_concept(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let id = str_arg(arguments, "concept_id")?;
        let Some(concept) = concept_by_id(&id) else {
            return Ok(Self::unknown_concept(&id));
        };
        Ok(ToolResult::Response(format!(
            "{}: {} Quiz question: {}",
            concept.title, concept.summary, concept.quiz_question
        )))
    }

    async fn record_teach_back(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let id = str_arg(arguments, "concept_id")?;
        let explanation = str_arg(arguments, "explanation")?;
        let Some(concept) = concept_by_id(&id) else {
            return Ok(Self::unknown_concept(&id));
        };

        let (score, matched, missing) = score_explanation(concept, &explanation);
        let mode = self.state.lock().await.mode;
        let record = TeachBackRecord {
            concept_id: concept.id.to_string(),
            mode,
            score,
            matched_terms: matched.iter().map(|t| t.to_string()).collect(),
            missing_terms: missing.iter().map(|t| t.to_string()).collect(),
            explanation,
            timestamp: utc_now(),
        };
        self.store
            .append(record)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        log::info!("📝 Teach-back for {} scored {}", concept.id, score);

        let feedback = if missing.is_empty() {
            "Excellent, every key idea was covered.".to_string()
        } else {
            format!("Gently point out what was missing: {}.", missing.join(", "))
        };
        Ok(ToolResult::Response(format!(
            "Score {} out of 100 for {}. {}",
            score, concept.title, feedback
        )))
    }
}

#[async_trait::async_trait]
impl Toolbox for TutorTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new("list_concepts", "List the concepts available for study.", no_parameters()),
            Tool::new(
                "set_learning_mode",
                "Switch between learn, quiz and teach_back, optionally choosing a concept.",
                json!({
                    "type": "object",
                    "properties": {
                        "mode": {"type": "string", "enum": ["learn", "quiz", "teach_back"]},
                        "concept_id": {"type": "string", "description": "Concept id (optional)"}
                    },
                    "required": ["mode"]
                }),
            ),
            Tool::new(
                "get_concept",
                "Fetch the explanation and quiz question for a concept.",
                json!({
                    "type": "object",
                    "properties": {
                        "concept_id": {"type": "string"}
                    },
                    "required": ["concept_id"]
                }),
            ),
            Tool::new(
                "record_teach_back",
                "Score the learner's own explanation of a concept and save it.",
                json!({
                    "type": "object",
                    "properties": {
                        "concept_id": {"type": "string"},
                        "explanation": {"type": "string", "description": "What the learner said"}
                    },
                    "required": ["concept_id", "explanation"]
                }),
            ),
        ]
    }

    async fn call(
        &self,
        name: &str,
        arguments: Value,
        cancel_token: CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        check_cancelled(&cancel_token)?;

        match name {
            "list_concepts" => self.list_concepts().await,
            "set_learning_mode" => self.set_learning_mode(&arguments).await,
            "get_concept" => self.get_concept(&arguments).await,
            "record_teach_back" => self.record_teach_back(&arguments).await,
            _ => Err(ToolError::NotFound(format!("Tool '{}' not found", name))),
        }
    }
}
