//! SQLite persistence for fraud cases.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use super::{CaseStatistics, CaseStatus, FraudCase, FraudDbError};
use crate::commerce::orders::utc_now;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS fraud_cases (
        id TEXT PRIMARY KEY,
        userName TEXT NOT NULL,
        securityIdentifier TEXT,
        cardEnding TEXT NOT NULL,
        cardType TEXT,
        transactionName TEXT,
        transactionAmount TEXT,
        transactionTime TEXT,
        transactionLocation TEXT,
        transactionCategory TEXT,
        transactionSource TEXT,
        status TEXT DEFAULT 'pending',
        securityQuestion TEXT,
        securityAnswer TEXT,
        outcome TEXT DEFAULT 'pending',
        outcomeNote TEXT,
        createdAt TEXT,
        lastUpdated TEXT,
        UNIQUE(cardEnding)
    );";

const SELECT_COLUMNS: &str = "
    id, userName, securityIdentifier, cardEnding, cardType,
    transactionName, transactionAmount, transactionTime,
    transactionLocation, transactionCategory, transactionSource,
    status, securityQuestion, securityAnswer, createdAt, outcome, outcomeNote";

/// On-disk JSON backup layout
#[derive(Debug, Serialize, Deserialize)]
struct Backup {
    fraud_cases: Vec<FraudCase>,
}

pub struct FraudDatabase {
    conn: Mutex<Connection>,
}

impl FraudDatabase {
    /// Open (creating if needed) the database file and make sure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FraudDbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self::with_connection(conn)?;
        log::info!("✅ Fraud database ready at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, FraudDbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, FraudDbError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, FraudDbError> {
        self.conn.lock().map_err(|_| FraudDbError::Poisoned)
    }

    pub fn add_case(&self, case: &FraudCase) -> Result<(), FraudDbError> {
        let conn = self.conn()?;
        insert_case(&conn, case)?;
        log::info!("✅ Added fraud case: {}", case.id);
        Ok(())
    }

    pub fn case_by_card(&self, card_ending: &str) -> Result<Option<FraudCase>, FraudDbError> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM fraud_cases WHERE cardEnding = ?1"),
                [card_ending.trim()],
                map_row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    pub fn case_by_id(&self, case_id: &str) -> Result<Option<FraudCase>, FraudDbError> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM fraud_cases WHERE id = ?1"),
                [case_id],
                map_row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    /// Most recent pending case for a card holder, falling back to any case for them
    pub fn case_by_user_name(&self, user_name: &str) -> Result<Option<FraudCase>, FraudDbError> {
        let conn = self.conn()?;
        let case = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM fraud_cases
                     WHERE lower(userName) = lower(?1)
                     ORDER BY (status = 'pending') DESC, createdAt DESC
                     LIMIT 1"
                ),
                [user_name.trim()],
                map_row_to_case,
            )
            .optional()?;
        Ok(case)
    }

    pub fn all_cases(&self) -> Result<Vec<FraudCase>, FraudDbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM fraud_cases ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], map_row_to_case)?;
        let mut cases = Vec::new();
        for row in rows {
            cases.push(row?);
        }
        Ok(cases)
    }

    pub fn update_case_status(
        &self,
        case_id: &str,
        status: CaseStatus,
        outcome: &str,
        note: &str,
    ) -> Result<(), FraudDbError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE fraud_cases
             SET status = ?1, outcome = ?2, outcomeNote = ?3, lastUpdated = ?4
             WHERE id = ?5",
            params![status.to_string(), outcome, note, utc_now(), case_id],
        )?;
        if changed == 0 {
            return Err(FraudDbError::NotFound(case_id.to_string()));
        }
        log::info!(
            "✅ Updated fraud case {}: status={}, outcome={}",
            case_id,
            status,
            outcome
        );
        Ok(())
    }

    pub fn delete_case(&self, case_id: &str) -> Result<bool, FraudDbError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM fraud_cases WHERE id = ?1", [case_id])?;
        if changed > 0 {
            log::info!("✅ Deleted fraud case: {}", case_id);
        }
        Ok(changed > 0)
    }

    pub fn clear_all(&self) -> Result<usize, FraudDbError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM fraud_cases", [])?;
        log::info!("✅ Cleared {} fraud cases", removed);
        Ok(removed)
    }

    /// Write every case to `path` as `{"fraud_cases": [...]}`
    pub fn export_to_json(&self, path: impl AsRef<Path>) -> Result<usize, FraudDbError> {
        let backup = Backup {
            fraud_cases: self.all_cases()?,
        };
        let json = serde_json::to_string_pretty(&backup)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!(
            "✅ Exported {} cases to {}",
            backup.fraud_cases.len(),
            path.as_ref().display()
        );
        Ok(backup.fraud_cases.len())
    }

    /// Replace the table contents with the cases in a JSON backup.
    ///
    /// Runs in one transaction: a bad record leaves the existing cases in place.
    pub fn import_from_json(&self, path: impl AsRef<Path>) -> Result<usize, FraudDbError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let backup: Backup = serde_json::from_str(&raw)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM fraud_cases", [])?;
        for case in &backup.fraud_cases {
            insert_case(&tx, case)?;
        }
        tx.commit()?;

        log::info!(
            "✅ Imported {} cases from {}",
            backup.fraud_cases.len(),
            path.as_ref().display()
        );
        Ok(backup.fraud_cases.len())
    }

    pub fn statistics(&self) -> Result<CaseStatistics, FraudDbError> {
        let conn = self.conn()?;
        let count = |status: Option<CaseStatus>| -> Result<u64, rusqlite::Error> {
            let n: i64 = match status {
                Some(status) => conn.query_row(
                    "SELECT COUNT(*) FROM fraud_cases WHERE status = ?1",
                    [status.to_string()],
                    |row| row.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM fraud_cases", [], |row| row.get(0))?,
            };
            Ok(n.max(0) as u64)
        };

        Ok(CaseStatistics {
            total_cases: count(None)?,
            confirmed_fraud: count(Some(CaseStatus::ConfirmedFraud))?,
            confirmed_safe: count(Some(CaseStatus::ConfirmedSafe))?,
            pending: count(Some(CaseStatus::Pending))?,
            verification_failed: count(Some(CaseStatus::VerificationFailed))?,
        })
    }

    /// Insert the demo cases unless the table already has rows. Returns how many were added.
    pub fn seed_sample_cases(&self) -> Result<usize, FraudDbError> {
        if self.statistics()?.total_cases > 0 {
            log::info!("ℹ️  Fraud database already populated, skipping seed");
            return Ok(0);
        }
        let cases = super::sample_cases();
        for case in &cases {
            self.add_case(case)?;
        }
        Ok(cases.len())
    }
}

fn insert_case(conn: &Connection, case: &FraudCase) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fraud_cases (
            id, userName, securityIdentifier, cardEnding, cardType,
            transactionName, transactionAmount, transactionTime,
            transactionLocation, transactionCategory, transactionSource,
            status, securityQuestion, securityAnswer, outcome, outcomeNote,
            createdAt, lastUpdated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            case.id,
            case.user_name,
            case.security_identifier,
            case.card_ending,
            case.card_type,
            case.transaction_name,
            case.transaction_amount,
            case.transaction_time,
            case.transaction_location,
            case.transaction_category,
            case.transaction_source,
            case.status.to_string(),
            case.security_question,
            case.security_answer,
            case.outcome,
            case.outcome_note,
            case.created_at,
            utc_now(),
        ],
    )?;
    Ok(())
}

fn map_row_to_case(row: &Row<'_>) -> Result<FraudCase, rusqlite::Error> {
    let status_raw: String = row.get(11)?;
    let status = CaseStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let text = |idx: usize| -> Result<String, rusqlite::Error> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    Ok(FraudCase {
        id: row.get(0)?,
        user_name: row.get(1)?,
        security_identifier: text(2)?,
        card_ending: row.get(3)?,
        card_type: text(4)?,
        transaction_name: text(5)?,
        transaction_amount: text(6)?,
        transaction_time: text(7)?,
        transaction_location: text(8)?,
        transaction_category: text(9)?,
        transaction_source: text(10)?,
        status,
        security_question: text(12)?,
        security_answer: text(13)?,
        created_at: text(14)?,
        outcome: row
            .get::<_, Option<String>>(15)?
            .unwrap_or_else(|| "pending".to_string()),
        outcome_note: text(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fraud::sample_cases;

    #[test]
    fn test_add_and_lookup() {
        let db = FraudDatabase::open_in_memory().unwrap();
        let case = sample_cases().remove(0);
        db.add_case(&case).unwrap();

        assert_eq!(db.case_by_card("4242").unwrap().unwrap(), case);
        assert_eq!(db.case_by_id("case-001").unwrap().unwrap().user_name, "Aarav Sharma");
        assert!(db.case_by_card("0000").unwrap().is_none());
    }

    #[test]
    fn test_card_ending_is_unique() {
        let db = FraudDatabase::open_in_memory().unwrap();
        let mut case = sample_cases().remove(0);
        db.add_case(&case).unwrap();

        case.id = "case-dup".to_string();
        assert!(matches!(db.add_case(&case), Err(FraudDbError::Sqlite(_))));
    }

    #[test]
    fn test_lookup_by_user_name_ignores_case() {
        let db = FraudDatabase::open_in_memory().unwrap();
        db.seed_sample_cases().unwrap();

        let case = db.case_by_user_name("  priya patel ").unwrap().unwrap();
        assert_eq!(case.card_ending, "1881");
        assert!(db.case_by_user_name("Nobody").unwrap().is_none());
    }

    #[test]
    fn test_update_status_and_statistics() {
        let db = FraudDatabase::open_in_memory().unwrap();
        assert_eq!(db.seed_sample_cases().unwrap(), 3);
        assert_eq!(db.seed_sample_cases().unwrap(), 0);

        db.update_case_status("case-001", CaseStatus::ConfirmedFraud, "card_blocked", "customer denied")
            .unwrap();
        db.update_case_status("case-002", CaseStatus::ConfirmedSafe, "no_action", "")
            .unwrap();

        let stats = db.statistics().unwrap();
        assert_eq!(
            stats,
            CaseStatistics {
                total_cases: 3,
                confirmed_fraud: 1,
                confirmed_safe: 1,
                pending: 1,
                verification_failed: 0,
            }
        );

        let case = db.case_by_id("case-001").unwrap().unwrap();
        assert_eq!(case.outcome, "card_blocked");
        assert_eq!(case.outcome_note, "customer denied");

        assert!(matches!(
            db.update_case_status("case-999", CaseStatus::ConfirmedSafe, "x", ""),
            Err(FraudDbError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_and_clear() {
        let db = FraudDatabase::open_in_memory().unwrap();
        db.seed_sample_cases().unwrap();

        assert!(db.delete_case("case-003").unwrap());
        assert!(!db.delete_case("case-003").unwrap());
        assert_eq!(db.all_cases().unwrap().len(), 2);

        assert_eq!(db.clear_all().unwrap(), 2);
        assert!(db.all_cases().unwrap().is_empty());
    }

    #[test]
    fn test_export_import_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("fraud_cases_backup.json");

        let source = FraudDatabase::open(dir.path().join("source.db")).unwrap();
        source.seed_sample_cases().unwrap();
        source
            .update_case_status("case-003", CaseStatus::ConfirmedSafe, "no_action", "known merchant")
            .unwrap();
        assert_eq!(source.export_to_json(&backup).unwrap(), 3);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
        assert_eq!(raw["fraud_cases"][0]["userName"], "Aarav Sharma");
        assert_eq!(raw["fraud_cases"][2]["status"], "confirmed_safe");

        let target = FraudDatabase::open_in_memory().unwrap();
        target.add_case(&sample_cases().remove(1)).unwrap();
        assert_eq!(target.import_from_json(&backup).unwrap(), 3);
        assert_eq!(target.all_cases().unwrap(), source.all_cases().unwrap());
    }

    #[test]
    fn test_failed_import_keeps_existing_cases() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("dupes.json");
        let mut cases = sample_cases();
        cases[1].card_ending = cases[0].card_ending.clone();
        std::fs::write(
            &backup,
            serde_json::to_string(&serde_json::json!({ "fraud_cases": cases })).unwrap(),
        )
        .unwrap();

        let db = FraudDatabase::open_in_memory().unwrap();
        db.add_case(&sample_cases().remove(2)).unwrap();

        assert!(db.import_from_json(&backup).is_err());
        assert_eq!(db.all_cases().unwrap().len(), 1);
    }
}
