//! Tools for the bank fraud alert desk.
//!
//! The caller must answer the case's security question before the agent may
//! read out the transaction or record an outcome. Three wrong answers close
//! the case as `verification_failed`.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    check_cancelled, no_parameters, opt_str_arg, str_arg, Tool, ToolError, ToolResult, Toolbox,
};
use crate::fraud::{CaseStatus, FraudCase, FraudDatabase, FraudDbError};

pub const MAX_VERIFICATION_ATTEMPTS: u32 = 3;

#[derive(Debug, Default, Clone)]
pub struct FraudSession {
    pub case: Option<FraudCase>,
    pub verified: bool,
    pub attempts: u32,
    /// Wrong answers per case id, kept across reloads of the same case
    failed_attempts: HashMap<String, u32>,
}

pub struct FraudTools {
    db: Arc<FraudDatabase>,
    session: Mutex<FraudSession>,
}

fn db_error(e: FraudDbError) -> ToolError {
    ToolError::ExecutionFailed(e.to_string())
}

fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl FraudTools {
    pub fn new(db: Arc<FraudDatabase>) -> Self {
        Self {
            db,
            session: Mutex::new(FraudSession::default()),
        }
    }

    pub async fn session(&self) -> FraudSession {
        self.session.lock().await.clone()
    }

    async fn load_fraud_case(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let card_ending = opt_str_arg(arguments, "card_ending");
        let user_name = opt_str_arg(arguments, "user_name");

        let case = match (&card_ending, &user_name) {
            (Some(card), _) => self.db.case_by_card(card).map_err(db_error)?,
            (None, Some(name)) => self.db.case_by_user_name(name).map_err(db_error)?,
            (None, None) => {
                return Err(ToolError::InvalidParameters(
                    "Provide either 'user_name' or 'card_ending'".to_string(),
                ))
            }
        };

        let Some(case) = case else {
            return Ok(ToolResult::Escalation(
                "No fraud case matches those details. Ask the customer to repeat their name or the last four digits of the card."
                    .to_string(),
            ));
        };

        log::info!("📂 Loaded fraud case {} for {}", case.id, case.user_name);
        let mut session = self.session.lock().await;
        session.attempts = session.failed_attempts.get(&case.id).copied().unwrap_or(0);
        session.verified = false;
        session.case = Some(case.clone());

        if !case.is_open() {
            return Ok(ToolResult::Response(format!(
                "Case {} for {} is already closed as {}. No further action is needed.",
                case.id, case.user_name, case.status
            )));
        }

        Ok(ToolResult::Response(format!(
            "Loaded case {} for {} (reference {}). Before sharing any details, ask the security question: \"{}\"",
            case.id, case.user_name, case.security_identifier, case.security_question
        )))
    }

    async fn verify_security_answer(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let answer = str_arg(arguments, "answer")?;
        let mut session = self.session.lock().await;

        let Some(case) = session.case.clone() else {
            return Ok(ToolResult::Escalation(
                "No case is loaded yet. Ask for the customer's name or card ending first.".to_string(),
            ));
        };
        if session.verified {
            return Ok(ToolResult::Response("The customer is already verified.".to_string()));
        }
        if !case.is_open() {
            return Ok(ToolResult::Escalation(format!(
                "Case {} is closed as {}. Verification is no longer possible.",
                case.id, case.status
            )));
        }

        if normalize_answer(&answer) == normalize_answer(&case.security_answer) {
            session.verified = true;
            log::info!("🔓 Caller verified for case {}", case.id);
            return Ok(ToolResult::Response(
                "Verification successful. You may now read out the suspicious transaction.".to_string(),
            ));
        }

        session.attempts += 1;
        let attempts = session.attempts;
        session.failed_attempts.insert(case.id.clone(), attempts);
        let remaining = MAX_VERIFICATION_ATTEMPTS.saturating_sub(session.attempts);
        log::warn!(
            "🔒 Wrong security answer for case {} ({} attempts left)",
            case.id,
            remaining
        );

        if remaining == 0 {
            let note = format!(
                "Security answer failed {} times",
                MAX_VERIFICATION_ATTEMPTS
            );
            self.db
                .update_case_status(&case.id, CaseStatus::VerificationFailed, "verification_failed", &note)
                .map_err(db_error)?;
            if let Some(case) = session.case.as_mut() {
                case.status = CaseStatus::VerificationFailed;
                case.outcome = "verification_failed".to_string();
                case.outcome_note = note;
            }
            return Ok(ToolResult::Escalation(
                "Verification failed too many times. Do not share any details. Tell the customer to call the number on the back of their card, then end the call politely."
                    .to_string(),
            ));
        }

        Ok(ToolResult::Escalation(format!(
            "That answer does not match. {} attempt{} left.",
            remaining,
            if remaining == 1 { "" } else { "s" }
        )))
    }

    /// The loaded case, provided the caller has been verified and it is still open
    async fn verified_case(&self) -> Result<FraudCase, ToolResult> {
        let session = self.session.lock().await;
        let Some(case) = session.case.clone() else {
            return Err(ToolResult::Escalation(
                "No case is loaded yet. Ask for the customer's name or card ending first.".to_string(),
            ));
        };
        if !session.verified {
            return Err(ToolResult::Escalation(
                "The customer has not been verified. Ask the security question first.".to_string(),
            ));
        }
        if !case.is_open() {
            return Err(ToolResult::Escalation(format!(
                "Case {} is already closed as {}.",
                case.id, case.status
            )));
        }
        Ok(case)
    }

    async fn read_suspicious_transaction(&self) -> Result<ToolResult, ToolError> {
        let case = match self.verified_case().await {
            Ok(case) => case,
            Err(refusal) => return Ok(refusal),
        };
        Ok(ToolResult::Response(format!(
            "{} Ask the customer whether they made this transaction.",
            case.transaction_summary()
        )))
    }

    async fn close_case(
        &self,
        arguments: &Value,
        status: CaseStatus,
        default_note: &str,
    ) -> Result<ToolResult, ToolError> {
        let case = match self.verified_case().await {
            Ok(case) => case,
            Err(refusal) => return Ok(refusal),
        };
        let note = opt_str_arg(arguments, "note").unwrap_or_else(|| default_note.to_string());
        let outcome = status.to_string();

        self.db
            .update_case_status(&case.id, status, &outcome, &note)
            .map_err(db_error)?;

        let mut session = self.session.lock().await;
        if let Some(case) = session.case.as_mut() {
            case.status = status;
            case.outcome = outcome;
            case.outcome_note = note;
        }

        let message = match status {
            CaseStatus::ConfirmedFraud => format!(
                "Case {} marked as fraud. The card ending in {} is blocked and a dispute has been raised. A replacement card will be sent.",
                case.id, case.card_ending
            ),
            _ => format!(
                "Case {} marked as safe. The transaction stands and the card remains active.",
                case.id
            ),
        };
        Ok(ToolResult::Response(message))
    }
}

#[async_trait::async_trait]
impl Toolbox for FraudTools {
    fn tools(&self) -> Vec<Tool> {
        let note = json!({
            "type": "object",
            "properties": {
                "note": {"type": "string", "description": "Short note about the customer's answer (optional)"}
            },
            "required": []
        });

        vec![
            Tool::new(
                "load_fraud_case",
                "Look up the pending fraud case by the customer's name or the last four digits of their card.",
                json!({
                    "type": "object",
                    "properties": {
                        "user_name": {"type": "string", "description": "Customer's full name"},
                        "card_ending": {"type": "string", "description": "Last four digits of the card"}
                    },
                    "required": []
                }),
            ),
            Tool::new(
                "verify_security_answer",
                "Check the customer's answer to the security question.",
                json!({
                    "type": "object",
                    "properties": {
                        "answer": {"type": "string", "description": "The customer's answer"}
                    },
                    "required": ["answer"]
                }),
            ),
            Tool::new(
                "read_suspicious_transaction",
                "Describe the flagged transaction. Only works after verification.",
                no_parameters(),
            ),
            Tool::new(
                "mark_transaction_safe",
                "Record that the customer made the transaction.",
                note.clone(),
            ),
            Tool::new(
                "mark_transaction_fraudulent",
                "Record that the customer did not make the transaction; blocks the card.",
                note,
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
            "load_fraud_case" => self.load_fraud_case(&arguments).await,
            "verify_security_answer" => self.verify_security_answer(&arguments).await,
            "read_suspicious_transaction" => self.read_suspicious_transaction().await,
            "mark_transaction_safe" => {
                self.close_case(&arguments, CaseStatus::ConfirmedSafe, "Customer confirmed the transaction")
                    .await
            }
            "mark_transaction_fraudulent" => {
                self.close_case(&arguments, CaseStatus::ConfirmedFraud, "Customer denied the transaction")
                    .await
            }
            _ => Err(ToolError::NotFound(format!("Tool '{}' not found", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> (FraudTools, Arc<FraudDatabase>) {
        let db = Arc::new(FraudDatabase::open_in_memory().unwrap());
        db.seed_sample_cases().unwrap();
        (FraudTools::new(db.clone()), db)
    }

    async fn run(tools: &FraudTools, name: &str, args: Value) -> ToolResult {
        tools.call(name, args, CancellationToken::new()).await.unwrap()
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  St   Xavier's "), "st xavier's");
        assert_eq!(normalize_answer("BRUNO"), "bruno");
    }

    #[tokio::test]
    async fn test_load_by_card_asks_security_question() {
        let (tools, _db) = tools();
        let result = run(&tools, "load_fraud_case", json!({"card_ending": "1881"})).await;

        match result {
            ToolResult::Response(text) => {
                assert!(text.contains("Priya Patel"));
                assert!(text.contains("In which city were you born?"));
                assert!(!text.contains("surat"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_requires_identifier() {
        let (tools, _db) = tools();
        let result = tools
            .call("load_fraud_case", json!({}), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidParameters(_))));

        let result = run(&tools, "load_fraud_case", json!({"user_name": "Nobody Here"})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
    }

    #[tokio::test]
    async fn test_transaction_hidden_until_verified() {
        let (tools, _db) = tools();
        run(&tools, "load_fraud_case", json!({"user_name": "aarav sharma"})).await;

        let result = run(&tools, "read_suspicious_transaction", json!({})).await;
        assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains("not been verified")));

        let result = run(&tools, "mark_transaction_fraudulent", json!({})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
    }

    #[tokio::test]
    async fn test_verified_caller_confirms_fraud() {
        let (tools, db) = tools();
        run(&tools, "load_fraud_case", json!({"card_ending": "4242"})).await;

        let result = run(&tools, "verify_security_answer", json!({"answer": " Bruno "})).await;
        assert!(matches!(result, ToolResult::Response(_)));
        assert!(tools.session().await.verified);

        let summary = run(&tools, "read_suspicious_transaction", json!({})).await;
        assert!(matches!(summary, ToolResult::Response(ref s) if s.contains("ABC Industry Electronics")));

        let result = run(
            &tools,
            "mark_transaction_fraudulent",
            json!({"note": "Customer was asleep"}),
        )
        .await;
        assert!(matches!(result, ToolResult::Response(ref s) if s.contains("blocked")));

        let stored = db.case_by_id("case-001").unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::ConfirmedFraud);
        assert_eq!(stored.outcome, "confirmed_fraud");
        assert_eq!(stored.outcome_note, "Customer was asleep");

        // a closed case cannot be decided twice
        let again = run(&tools, "mark_transaction_safe", json!({})).await;
        assert!(matches!(again, ToolResult::Escalation(_)));
    }

    #[tokio::test]
    async fn test_mark_safe_uses_default_note() {
        let (tools, db) = tools();
        run(&tools, "load_fraud_case", json!({"card_ending": "7305"})).await;
        run(&tools, "verify_security_answer", json!({"answer": "ST XAVIER'S"})).await;
        run(&tools, "mark_transaction_safe", json!({})).await;

        let stored = db.case_by_id("case-003").unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::ConfirmedSafe);
        assert_eq!(stored.outcome_note, "Customer confirmed the transaction");
    }

    #[tokio::test]
    async fn test_three_wrong_answers_fail_verification() {
        let (tools, db) = tools();
        run(&tools, "load_fraud_case", json!({"card_ending": "1881"})).await;

        for expected_left in ["2 attempts left", "1 attempt left"] {
            let result = run(&tools, "verify_security_answer", json!({"answer": "mumbai"})).await;
            assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains(expected_left)));
        }
        let result = run(&tools, "verify_security_answer", json!({"answer": "pune"})).await;
        assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains("too many times")));

        let stored = db.case_by_id("case-002").unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::VerificationFailed);

        // even the right answer is refused now
        let result = run(&tools, "verify_security_answer", json!({"answer": "surat"})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
        assert!(!tools.session().await.verified);
    }

    #[tokio::test]
    async fn test_reloading_case_keeps_wrong_answer_count() {
        let (tools, db) = tools();

        for _ in 0..2 {
            run(&tools, "load_fraud_case", json!({"card_ending": "1881"})).await;
            run(&tools, "verify_security_answer", json!({"answer": "mumbai"})).await;
        }
        assert_eq!(tools.session().await.attempts, 2);

        // switching to another case and back does not reset the count either
        run(&tools, "load_fraud_case", json!({"card_ending": "4242"})).await;
        assert_eq!(tools.session().await.attempts, 0);
        run(&tools, "load_fraud_case", json!({"user_name": "Priya Patel"})).await;
        assert_eq!(tools.session().await.attempts, 2);

        let result = run(&tools, "verify_security_answer", json!({"answer": "delhi"})).await;
        assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains("too many times")));
        let stored = db.case_by_id("case-002").unwrap().unwrap();
        assert_eq!(stored.status, CaseStatus::VerificationFailed);

        run(&tools, "load_fraud_case", json!({"card_ending": "1881"})).await;
        let result = run(&tools, "verify_security_answer", json!({"answer": "surat"})).await;
        assert!(matches!(result, ToolResult::Escalation(_)));
        assert!(!tools.session().await.verified);
    }

    #[tokio::test]
    async fn test_verify_without_case() {
        let (tools, _db) = tools();
        let result = run(&tools, "verify_security_answer", json!({"answer": "bruno"})).await;
        assert!(matches!(result, ToolResult::Escalation(ref s) if s.contains("No case is loaded")));
    }
}
