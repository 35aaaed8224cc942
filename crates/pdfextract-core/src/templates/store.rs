//! Template Store (C6): durable record of learned document classes and
//! their per-field rules, backed by `rusqlite` (bundled SQLite).

use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::TemplateStoreError;
use crate::templates::rules::ExtractionRule;

/// Default maturity threshold (§4.6, §4.11): a template must have been
/// confirmed against this many documents before the fast path trusts it.
pub const MATURE_THRESHOLD: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: i64,
    pub label: String,
    pub sample_count: i64,
    pub confidence: f64,
    pub structural_signature: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TemplateStoreStats {
    pub templates: i64,
    pub rules: i64,
    pub mature_templates: i64,
}

/// All writes serialise on a single connection lock (§5): SQLite's own
/// file locking is per-process, not per-thread, so a `Mutex<Connection>`
/// is the simplest correct discipline here.
pub struct TemplateStore {
    conn: Mutex<Connection>,
}

impl TemplateStore {
    pub fn open(path: &std::path::Path) -> Result<Self, TemplateStoreError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(TemplateStore { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, TemplateStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(TemplateStore { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<(), TemplateStoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL UNIQUE,
                sample_count INTEGER DEFAULT 0,
                confidence REAL DEFAULT 0.0,
                structural_signature TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS extraction_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                template_id INTEGER NOT NULL,
                field_name TEXT NOT NULL,
                rule_type TEXT NOT NULL,
                rule_data TEXT NOT NULL,
                confidence REAL DEFAULT 0.0,
                FOREIGN KEY (template_id) REFERENCES templates(id)
            );",
        )?;
        Ok(())
    }

    pub fn find_by_label(&self, label: &str) -> Result<Option<Template>, TemplateStoreError> {
        let conn = self.conn.lock().expect("template store lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, label, sample_count, confidence, structural_signature \
                 FROM templates WHERE label = ?1 LIMIT 1",
                params![label],
                |row| {
                    let signature_json: String = row.get(4)?;
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?, row.get::<_, f64>(3)?, signature_json))
                },
            )
            .optional()?;

        Ok(match row {
            Some((id, label, sample_count, confidence, signature_json)) => {
                let structural_signature: Vec<String> = serde_json::from_str(&signature_json)?;
                Some(Template { id, label, sample_count, confidence, structural_signature })
            }
            None => None,
        })
    }

    /// Creates a template with `sample_count = 1`, `confidence = 0.5` (§4.6).
    pub fn create(&self, label: &str, signature: &[String]) -> Result<i64, TemplateStoreError> {
        let mut sorted = signature.to_vec();
        sorted.sort();
        let signature_json = serde_json::to_string(&sorted)?;
        let conn = self.conn.lock().expect("template store lock poisoned");
        conn.execute(
            "INSERT INTO templates (label, structural_signature, sample_count, confidence) \
             VALUES (?1, ?2, 1, 0.5)",
            params![label, signature_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Unions `new_elements` into the stored signature, increments
    /// `sample_count`, bumps `updated_at` (§4.6, §4.11).
    pub fn extend_signature(&self, template_id: i64, new_elements: &[String]) -> Result<(), TemplateStoreError> {
        let conn = self.conn.lock().expect("template store lock poisoned");
        let signature_json: String = conn.query_row(
            "SELECT structural_signature FROM templates WHERE id = ?1",
            params![template_id],
            |row| row.get(0),
        )?;
        let mut signature: std::collections::BTreeSet<String> = serde_json::from_str(&signature_json)?;
        signature.extend(new_elements.iter().cloned());
        let merged: Vec<String> = signature.into_iter().collect();
        let merged_json = serde_json::to_string(&merged)?;

        conn.execute(
            "UPDATE templates SET structural_signature = ?1, sample_count = sample_count + 1, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![merged_json, template_id],
        )?;
        Ok(())
    }

    /// Deletes any prior rule for `(template_id, field_name)` before
    /// inserting the new one — the one-rule-per-field invariant.
    pub fn upsert_rule(
        &self,
        template_id: i64,
        field_name: &str,
        rule: &ExtractionRule,
        confidence: f64,
    ) -> Result<(), TemplateStoreError> {
        let rule_type = rule.rule_type_name();
        let rule_data = serde_json::to_string(rule)?;
        let conn = self.conn.lock().expect("template store lock poisoned");
        conn.execute(
            "DELETE FROM extraction_rules WHERE template_id = ?1 AND field_name = ?2",
            params![template_id, field_name],
        )?;
        conn.execute(
            "INSERT INTO extraction_rules (template_id, field_name, rule_type, rule_data, confidence) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![template_id, field_name, rule_type, rule_data, confidence],
        )?;
        Ok(())
    }

    pub fn rules_of(&self, template_id: i64) -> Result<Vec<(String, ExtractionRule)>, TemplateStoreError> {
        let conn = self.conn.lock().expect("template store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT field_name, rule_data FROM extraction_rules WHERE template_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![template_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (field_name, rule_data) in rows {
            out.push((field_name, serde_json::from_str(&rule_data)?));
        }
        Ok(out)
    }

    pub fn stats(&self) -> Result<TemplateStoreStats, TemplateStoreError> {
        let conn = self.conn.lock().expect("template store lock poisoned");
        let templates: i64 = conn.query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))?;
        let rules: i64 = conn.query_row("SELECT COUNT(*) FROM extraction_rules", [], |row| row.get(0))?;
        let mature_templates: i64 = conn.query_row(
            "SELECT COUNT(*) FROM templates WHERE sample_count >= ?1",
            params![MATURE_THRESHOLD],
            |row| row.get(0),
        )?;
        Ok(TemplateStoreStats { templates, rules, mature_templates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::rules::ExtractionRule;

    #[test]
    fn create_then_find_by_label() {
        let store = TemplateStore::open_in_memory().unwrap();
        let id = store.create("oab", &["nome".to_string(), "cpf".to_string()]).unwrap();
        let found = store.find_by_label("oab").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.sample_count, 1);
        assert_eq!(found.confidence, 0.5);
        assert_eq!(found.structural_signature, vec!["cpf".to_string(), "nome".to_string()]);
    }

    #[test]
    fn missing_label_returns_none() {
        let store = TemplateStore::open_in_memory().unwrap();
        assert!(store.find_by_label("nope").unwrap().is_none());
    }

    #[test]
    fn extend_signature_unions_and_increments_sample_count() {
        let store = TemplateStore::open_in_memory().unwrap();
        let id = store.create("oab", &["nome".to_string()]).unwrap();
        store.extend_signature(id, &["cpf".to_string(), "nome".to_string()]).unwrap();
        let found = store.find_by_label("oab").unwrap().unwrap();
        assert_eq!(found.sample_count, 2);
        assert_eq!(found.structural_signature, vec!["cpf".to_string(), "nome".to_string()]);
    }

    #[test]
    fn upsert_rule_replaces_prior_rule_for_same_field() {
        let store = TemplateStore::open_in_memory().unwrap();
        let id = store.create("oab", &["nome".to_string()]).unwrap();
        store.upsert_rule(id, "nome", &ExtractionRule::None { reason: "value_is_null".to_string() }, 0.9).unwrap();
        store.upsert_rule(id, "nome", &ExtractionRule::Regex { pattern_name: "texto".to_string(), regex: ".*".to_string() }, 0.4).unwrap();

        let rules = store.rules_of(id).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(matches!(rules[0].1, ExtractionRule::Regex { .. }));
    }

    #[test]
    fn stats_counts_mature_templates() {
        let store = TemplateStore::open_in_memory().unwrap();
        let young = store.create("young", &[]).unwrap();
        let old = store.create("old", &[]).unwrap();
        store.extend_signature(old, &[]).unwrap();
        let _ = young;

        let stats = store.stats().unwrap();
        assert_eq!(stats.templates, 2);
        assert_eq!(stats.mature_templates, 1);
    }
}
