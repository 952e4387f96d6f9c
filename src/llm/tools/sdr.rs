//! Sales development rep: answers product questions from a fixed FAQ and
//! qualifies the caller as a lead.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{check_cancelled, no_parameters, opt_str_arg, str_arg, Tool, ToolError, ToolResult, Toolbox};
use crate::commerce::orders::utc_now;
use crate::store::JsonListStore;

pub const COMPANY: &str = "Dr Abhishek Shop for Business";

pub struct FaqEntry {
    pub question: &'static str,
    pub keywords: &'static [&'static str],
    pub answer: &'static str,
}

pub static FAQ: &[FaqEntry] = &[
    FaqEntry {
        question: "What do you offer?",
        keywords: &["offer", "what do you", "product", "service", "do you sell"],
        answer: "We supply branded merchandise for teams: mugs, tees, hoodies and raincoats, plus laptops, phones and storage for offices.",
    },
    FaqEntry {
        question: "How does pricing work?",
        keywords: &["price", "pricing", "cost", "discount", "expensive", "cheap"],
        answer: "Catalog prices apply for small orders. Orders above 50 units get 10 percent off, and above 200 units 18 percent off.",
    },
    FaqEntry {
        question: "Do you customize products?",
        keywords: &["custom", "logo", "print", "branding", "brand"],
        answer: "Yes. We print your logo on mugs, tees and hoodies at no extra cost for orders of 25 units or more.",
    },
    FaqEntry {
        question: "How long does delivery take?",
        keywords: &["deliver", "delivery", "shipping", "ship", "how long", "when"],
        answer: "Stock items ship in 2 to 4 business days anywhere in India. Customized items take 7 to 10 business days.",
    },
    FaqEntry {
        question: "Is there a minimum order?",
        keywords: &["minimum", "moq", "small order", "least"],
        answer: "There is no minimum for stock items. Customized items need at least 25 units.",
    },
    FaqEntry {
        question: "What payment options do you support?",
        keywords: &["payment", "pay", "invoice", "upi", "credit", "gst"],
        answer: "We accept UPI, cards and bank transfer, and issue GST invoices. Net 30 terms are available for registered businesses.",
    },
    FaqEntry {
        question: "Can I return items?",
        keywords: &["return", "refund", "exchange", "replace", "damaged"],
        answer: "Stock items can be returned within 7 days. Damaged items are replaced free of charge.",
    },
];

/// Best FAQ entry for a question: most keyword hits wins, ties go to the earlier entry
pub fn match_faq(question: &str) -> Option<&'static FaqEntry> {
    let question = question.to_lowercase();
    FAQ.iter()
        .map(|entry| {
            let hits = entry
                .keywords
                .iter()
                .filter(|k| question.contains(*k))
                .count();
            (hits, entry)
        })
        .filter(|(hits, _)| *hits > 0)
        .fold(None, |best: Option<(usize, &'static FaqEntry)>, (hits, entry)| match best {
            Some((best_hits, _)) if best_hits >= hits => best,
            _ => Some((hits, entry)),
        })
        .map(|(_, entry)| entry)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub use_case: Option<String>,
    pub team_size: Option<String>,
    pub timeline: Option<String>,
}

impl Lead {
    pub fn summary(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".to_string());
        format!(
            "{} ({}) from {}, team of {}, wants {} on a {} timeline. Contact: {}.",
            field(&self.name),
            field(&self.role),
            field(&self.company),
            field(&self.team_size),
            field(&self.use_case),
            field(&self.timeline),
            field(&self.email)
        )
    }

    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub summary: String,
    pub timestamp: String,
}

pub struct SdrTools {
    lead: Mutex<Lead>,
    store: JsonListStore<SavedLead>,
}

/// Team size arrives as a number or as words ("about 40")
fn team_size_arg(arguments: &Value) -> Option<String> {
    match arguments.get("team_size")? {
        Value::Number(n) => Some(n.to_string()),
        _ => opt_str_arg(arguments, "team_size"),
    }
}

impl SdrTools {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            lead: Mutex::new(Lead::default()),
            store: JsonListStore::new(path),
        }
    }

    pub async fn current_lead(&self) -> Lead {
        self.lead.lock().await.clone()
    }

    pub fn saved_leads(&self) -> Vec<SavedLead> {
        self.store.load_all()
    }

    async fn update_lead(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let email = opt_str_arg(arguments, "email");
        if let Some(email) = &email {
            if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                return Ok(ToolResult::Escalation(format!(
                    "'{}' does not look like an email address. Ask the caller to spell it out.",
                    email
                )));
            }
        }

        let mut lead = self.lead.lock().await;
        let set = |slot: &mut Option<String>, value: Option<String>| {
            if value.is_some() {
                *slot = value;
            }
        };
        set(&mut lead.name, opt_str_arg(arguments, "name"));
        set(&mut lead.company, opt_str_arg(arguments, "company"));
        set(&mut lead.email, email.map(|e| e.to_lowercase()));
        set(&mut lead.role, opt_str_arg(arguments, "role"));
        set(&mut lead.use_case, opt_str_arg(arguments, "use_case"));
        set(&mut lead.team_size, team_size_arg(arguments));
        set(&mut lead.timeline, opt_str_arg(arguments, "timeline"));

        Ok(ToolResult::Response(format!("Lead so far: {}", lead.summary())))
    }

    async fn answer_faq(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let question = str_arg(arguments, "question")?;
        match match_faq(&question) {
            Some(entry) => Ok(ToolResult::Response(entry.answer.to_string())),
            None => Ok(ToolResult::Escalation(
                "That is not covered in the FAQ. Offer to have a specialist follow up by email instead of guessing."
                    .to_string(),
            )),
        }
    }

    async fn save_lead(&self) -> Result<ToolResult, ToolError> {
        let mut lead = self.lead.lock().await;
        let missing = lead.missing_required();
        if !missing.is_empty() {
            return Ok(ToolResult::Escalation(format!(
                "Cannot save the lead yet. Still need: {}.",
                missing.join(", ")
            )));
        }

        let saved = SavedLead {
            summary: lead.summary(),
            lead: lead.clone(),
            timestamp: utc_now(),
        };
        self.store
            .append(saved.clone())
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        log::info!("📇 Saved lead: {}", saved.summary);

        *lead = Lead::default();
        Ok(ToolResult::Response(format!(
            "Lead saved. Summary: {} Thank the caller and let them know someone will reach out.",
            saved.summary
        )))
    }
}

#[async_trait::async_trait]
impl Toolbox for SdrTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "update_lead",
                "Record any lead details the caller shared. Unmentioned fields stay as they are.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "company": {"type": "string"},
                        "email": {"type": "string"},
                        "role": {"type": "string"},
                        "use_case": {"type": "string", "description": "What they want to use us for"},
                        "team_size": {"type": "string", "description": "Number of people, e.g. '40'"},
                        "timeline": {"type": "string", "description": "e.g. 'this month', 'next quarter'"}
                    },
                    "required": []
                }),
            ),
            Tool::new(
                "answer_faq",
                &format!("Answer a question about {} from the FAQ.", COMPANY),
                json!({
                    "type": "object",
                    "properties": {
                        "question": {"type": "string", "description": "The caller's question"}
                    },
                    "required": ["question"]
                }),
            ),
            Tool::new(
                "save_lead",
                "Save the qualified lead at the end of the call. Needs at least name and email.",
                no_parameters(),
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
            "update_lead" => self.update_lead(&arguments).await,
            "answer_faq" => self.answer_faq(&arguments).await,
            "save_lead" => self.save_lead().await,
            _ => Err(ToolError::NotFound(format!("Tool '{}' not found", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn run(tools: &SdrTools, name: &str, args: Value) -> ToolResult {
        tools.call(name, args, CancellationToken::new()).await.unwrap()
    }

    #[test]
    fn test_match_faq() {
        assert_eq!(match_faq("How much does it cost?").unwrap().question, "How does pricing work?");
        assert_eq!(
            match_faq("Can you print our logo on hoodies?").unwrap().question,
            "Do you customize products?"
        );
        assert!(match_faq("Tell me a joke").is_none());
    }

    #[tokio::test]
    async fn test_answer_faq_tool() {
        let dir = tempdir().unwrap();
        let tools = SdrTools::new(dir.path().join("leads.json"));

        let result = run(&tools, "answer_faq", json!({"question": "Do you accept UPI payment?"})).await;
        assert!(matches!(result, ToolResult::Response(ref s) if s.contains("GST invoices")));

        let result = run(&tools, "answer_faq", json!({"question": "Who won the match?"})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
    }

    #[tokio::test]
    async fn test_lead_capture_and_save() {
        let dir = tempdir().unwrap();
        let tools = SdrTools::new(dir.path().join("leads.json"));

        run(&tools, "update_lead", json!({"name": "Nisha Rao", "company": "Acme Labs", "team_size": 40})).await;
        let result = run(&tools, "save_lead", json!({})).await;
        assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains("email")));

        run(&tools, "update_lead", json!({"email": "Nisha@Acme.io", "use_case": "onboarding kits"})).await;
        let lead = tools.current_lead().await;
        assert_eq!(lead.team_size.as_deref(), Some("40"));
        assert_eq!(lead.email.as_deref(), Some("nisha@acme.io"));

        let result = run(&tools, "save_lead", json!({})).await;
        assert!(matches!(result, ToolResult::Response(ref s) if s.contains("Nisha Rao (unknown) from Acme Labs")));

        let saved = tools.saved_leads();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].lead.company.as_deref(), Some("Acme Labs"));
        assert_eq!(tools.current_lead().await, Lead::default());
    }

    #[tokio::test]
    async fn test_rejects_malformed_email() {
        let dir = tempdir().unwrap();
        let tools = SdrTools::new(dir.path().join("leads.json"));

        let result = run(&tools, "update_lead", json!({"email": "nisha at acme", "name": "Nisha"})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
        assert_eq!(tools.current_lead().await.name, None);
    }
}
