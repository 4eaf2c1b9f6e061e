//! Bulk export and import of the whole journal as a versioned JSON document.
//!
//! Export wraps `list_tastings` in an envelope carrying the format version and
//! a timestamp. Import reconciles an envelope against the store by identifier:
//! known ids are merged, unknown ones inserted. The batch runs inside a single
//! transaction with one savepoint per record, so a bad record is rolled back
//! on its own while the rest of the batch still commits.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{
    format_timestamp, get_tasting, insert_tasting, list_tastings, now_timestamp, replace_tasting,
};
use crate::error::{JournalError, SUPPORTED_EXPORT_VERSION};
use crate::models::TastingEntry;

/// Envelope written by `export_document` and accepted by `import_from_str`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub tastings: Vec<TastingEntry>,
}

/// Per-import tally shown to the user once the batch commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub errors: usize,
}

enum RecordOutcome {
    Added,
    Updated,
}

/// Snapshot the journal, newest entries first.
pub fn export_document(conn: &Connection) -> Result<ExportDocument> {
    Ok(ExportDocument {
        version: SUPPORTED_EXPORT_VERSION,
        timestamp: now_timestamp(),
        tastings: list_tastings(conn)?,
    })
}

/// Pretty-printed JSON text of `export_document`.
pub fn export_json(conn: &Connection) -> Result<String> {
    let document = export_document(conn)?;
    serde_json::to_string_pretty(&document).context("failed to serialize export document")
}

/// `sipscribe-export-YYYY-MM-DD.json`
pub fn export_filename(date: NaiveDate) -> String {
    format!("sipscribe-export-{}.json", date.format("%Y-%m-%d"))
}

/// Write an export document into `dir`, named after today's (UTC) date.
/// A second export on the same day replaces the first.
pub fn export_to_dir(conn: &Connection, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;

    let json = export_json(conn)?;
    let path = dir.join(export_filename(Utc::now().date_naive()));
    fs::write(&path, json)
        .with_context(|| format!("failed to write export file {}", path.display()))?;

    info!("Exported journal to {}", path.display());
    Ok(path)
}

/// Read `path` as UTF-8 text and import it.
pub fn import_from_path(conn: &Connection, path: &Path) -> Result<ImportSummary> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read import file {}", path.display()))?;
    import_from_str(conn, &text)
}

/// Merge an export document into the store.
///
/// Invalid JSON, a missing or non-array `tastings` field, or a version newer
/// than this build understands abort the call before anything is written.
/// Past that gate every record is handled independently and failures are only
/// counted.
pub fn import_from_str(conn: &Connection, text: &str) -> Result<ImportSummary> {
    let document: Value = serde_json::from_str(text)
        .map_err(|err| JournalError::InvalidImport(format!("not valid JSON ({err})")))?;
    let records = envelope_records(&document)?;

    let mut tx = conn
        .unchecked_transaction()
        .context("failed to open import transaction")?;
    let mut summary = ImportSummary::default();

    for (index, record) in records.iter().enumerate() {
        let savepoint = tx
            .savepoint()
            .context("failed to open import savepoint")?;

        match import_record(&savepoint, record) {
            Ok(outcome) => {
                savepoint
                    .commit()
                    .context("failed to release import savepoint")?;
                match outcome {
                    RecordOutcome::Added => summary.added += 1,
                    RecordOutcome::Updated => summary.updated += 1,
                }
            }
            Err(err) => {
                // Dropping the savepoint rolls back this record only.
                warn!("Skipping import record {index}: {err:#}");
                summary.errors += 1;
            }
        }
    }

    tx.commit().context("failed to commit import")?;
    info!(
        "Import finished: {} added, {} updated, {} errors",
        summary.added, summary.updated, summary.errors
    );
    Ok(summary)
}

/// Validate the envelope and hand back its record list.
fn envelope_records(document: &Value) -> Result<&Vec<Value>> {
    let records = document
        .get("tastings")
        .and_then(Value::as_array)
        .ok_or_else(|| JournalError::InvalidImport("missing 'tastings' array".to_string()))?;

    if let Some(version) = document.get("version") {
        match version.as_u64() {
            Some(found) if found <= SUPPORTED_EXPORT_VERSION => {}
            Some(found) => return Err(JournalError::UnsupportedVersion(found).into()),
            None => {
                return Err(JournalError::InvalidImport(format!(
                    "unrecognised version {version}"
                ))
                .into())
            }
        }
    }

    Ok(records)
}

fn import_record(conn: &Connection, record: &Value) -> Result<RecordOutcome> {
    let incoming = record
        .as_object()
        .ok_or_else(|| anyhow!("record is not a JSON object"))?;
    let id = record_id(incoming)?;
    let now = now_timestamp();

    if let Some(existing) = match &id {
        Some(id) => get_tasting(conn, id)?,
        None => None,
    } {
        let mut merged = match serde_json::to_value(&existing)? {
            Value::Object(fields) => fields,
            _ => return Err(anyhow!("stored tasting did not serialize to an object")),
        };
        overlay(&mut merged, incoming);

        let mut entry: TastingEntry =
            serde_json::from_value(Value::Object(merged)).context("invalid tasting record")?;
        entry.updated_at = now.max(existing.updated_at);

        replace_tasting(conn, &entry)?;
        return Ok(RecordOutcome::Updated);
    }

    let mut fields = incoming.clone();
    fields.insert(
        "id".to_string(),
        Value::String(id.unwrap_or_else(|| Uuid::new_v4().to_string())),
    );
    if is_blank(fields.get("createdAt")) {
        fields.insert("createdAt".to_string(), Value::String(format_timestamp(&now)));
    }
    // Inserts always restamp `updatedAt`, whatever the record carried.
    fields.insert("updatedAt".to_string(), Value::String(format_timestamp(&now)));

    let mut entry: TastingEntry =
        serde_json::from_value(Value::Object(fields)).context("invalid tasting record")?;
    entry.updated_at = now.max(entry.created_at);
    insert_tasting(conn, &entry)?;
    Ok(RecordOutcome::Added)
}

/// Identifier of an incoming record. Numeric ids are kept as their decimal
/// text so a re-import reconciles against the row the first import created.
fn record_id(incoming: &Map<String, Value>) -> Result<Option<String>> {
    match incoming.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(anyhow!("record id must be a string, found {other}")),
    }
}

/// Copy incoming fields over a stored record. The identity and timestamp keys
/// belong to the stored row and are never overlaid.
fn overlay(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        if matches!(key.as_str(), "id" | "createdAt" | "updatedAt") {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::{add_tasting, count_tastings, open_in_memory};
    use crate::models::{BeverageType, NewTasting};

    fn wine(name: &str) -> NewTasting {
        NewTasting {
            beverage_type: BeverageType::Wine,
            name: name.to_string(),
            image_base64: None,
            nose_notes: "Black cherries".to_string(),
            palate_notes: "Rich tannins".to_string(),
            finish_notes: "Long".to_string(),
            color_notes: "Deep ruby".to_string(),
            pairing_suggestions: "Aged cheese".to_string(),
            aroma_score: 9,
            palate_score: 8,
            finish_score: 8,
            overall_score: 25.0 / 3.0,
            vintage: Some(2015),
            varietal: Some("Cabernet Sauvignon".to_string()),
            region: Some("Bordeaux".to_string()),
            distillery: None,
            age_statement: None,
            mash_bill: None,
        }
    }

    fn record(id: Option<&str>, name: &str) -> Value {
        let mut value = json!({
            "type": "whisky",
            "name": name,
            "noseNotes": "Peat smoke",
            "palateNotes": "Brine",
            "finishNotes": "Ash",
            "colorNotes": "Straw",
            "pairingSuggestions": "Oysters",
            "aromaScore": 8,
            "palateScore": 8,
            "finishScore": 9,
            "overallScore": 25.0 / 3.0,
            "distillery": "Laphroaig",
        });
        if let Some(id) = id {
            value["id"] = json!(id);
        }
        value
    }

    #[test]
    fn export_wraps_the_ordered_collection() {
        let conn = open_in_memory().unwrap();
        let first = add_tasting(&conn, wine("First")).unwrap();
        let second = add_tasting(&conn, wine("Second")).unwrap();

        let document = export_document(&conn).unwrap();
        assert_eq!(document.version, 1);
        let ids: Vec<&str> = document.tastings.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id.as_str()));
        assert!(ids.contains(&second.id.as_str()));
        assert!(document.tastings[0].created_at >= document.tastings[1].created_at);

        let value: Value = serde_json::from_str(&export_json(&conn).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert!(value["timestamp"].is_string());
        assert_eq!(value["tastings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn export_filename_embeds_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_filename(date), "sipscribe-export-2024-03-09.json");
    }

    #[test]
    fn reimporting_an_export_only_touches_updated_at() {
        let conn = open_in_memory().unwrap();
        add_tasting(&conn, wine("Margaux")).unwrap();
        add_tasting(&conn, wine("Barolo")).unwrap();
        let before = list_tastings(&conn).unwrap();

        let summary = import_from_str(&conn, &export_json(&conn).unwrap()).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                added: 0,
                updated: 2,
                errors: 0
            }
        );

        let after = list_tastings(&conn).unwrap();
        assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(after.iter()) {
            assert!(new.updated_at >= old.updated_at);
            let mut normalized = new.clone();
            normalized.updated_at = old.updated_at;
            assert_eq!(&normalized, old);
        }
    }

    #[test]
    fn non_array_tastings_fail_without_writes() {
        let conn = open_in_memory().unwrap();
        add_tasting(&conn, wine("Existing")).unwrap();

        for text in [
            r#"{"version": 1, "tastings": {"id": "x"}}"#,
            r#"{"version": 1}"#,
            r#"[1, 2, 3]"#,
            "not json at all",
        ] {
            let err = import_from_str(&conn, text).unwrap_err();
            assert!(
                matches!(JournalError::find(&err), Some(JournalError::InvalidImport(_))),
                "unexpected error for {text}: {err:#}"
            );
        }
        assert_eq!(count_tastings(&conn).unwrap(), 1);
    }

    #[test]
    fn newer_versions_are_rejected_before_any_write() {
        let conn = open_in_memory().unwrap();
        let text = json!({ "version": 2, "tastings": [record(None, "Future")] }).to_string();

        let err = import_from_str(&conn, &text).unwrap_err();
        assert!(matches!(
            JournalError::find(&err),
            Some(JournalError::UnsupportedVersion(2))
        ));
        assert_eq!(count_tastings(&conn).unwrap(), 0);
    }

    #[test]
    fn missing_version_is_accepted() {
        let conn = open_in_memory().unwrap();
        let text = json!({ "tastings": [record(Some("a"), "Ardbeg")] }).to_string();
        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!(summary.added, 1);
    }

    #[test]
    fn malformed_record_is_counted_and_the_rest_commit() {
        let conn = open_in_memory().unwrap();
        let mut missing_scores = record(Some("bad"), "Broken");
        missing_scores
            .as_object_mut()
            .unwrap()
            .remove("aromaScore");

        let text = json!({
            "version": 1,
            "timestamp": "2024-01-01T00:00:00.000Z",
            "tastings": [
                record(Some("a"), "Ardbeg"),
                missing_scores,
                record(Some("b"), "Bowmore"),
                "not an object",
                record(Some("c"), "   "),
            ]
        })
        .to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                added: 2,
                updated: 0,
                errors: 3
            }
        );
        assert_eq!(count_tastings(&conn).unwrap(), 2);
        assert!(get_tasting(&conn, "bad").unwrap().is_none());
    }

    #[test]
    fn records_without_id_or_timestamps_get_defaults() {
        let conn = open_in_memory().unwrap();
        let mut no_id = record(None, "Anonymous");
        no_id["id"] = json!("");
        let text = json!({ "version": 1, "tastings": [no_id, record(None, "Nameless id")] })
            .to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!(summary.added, 2);

        let entries = list_tastings(&conn).unwrap();
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].id, entries[1].id);
        assert!(entries.iter().all(|e| !e.id.is_empty()));
        assert!(entries.iter().all(|e| e.created_at == e.updated_at));
    }

    #[test]
    fn imported_created_at_is_kept_and_updated_at_restamped() {
        let conn = open_in_memory().unwrap();
        let mut value = record(Some("dated"), "Dated");
        value["createdAt"] = json!("2023-05-01T10:00:00.000Z");
        value["updatedAt"] = json!("2023-06-01T10:00:00.000Z");
        let text = json!({ "version": 1, "tastings": [value] }).to_string();

        import_from_str(&conn, &text).unwrap();
        let entry = get_tasting(&conn, "dated").unwrap().unwrap();
        assert_eq!(format_timestamp(&entry.created_at), "2023-05-01T10:00:00.000000Z");
        assert!(entry.updated_at > entry.created_at);
        assert!(format_timestamp(&entry.updated_at).as_str() > "2023-06-01T10:00:00.000000Z");
    }

    #[test]
    fn stale_updated_at_without_created_at_is_not_kept() {
        let conn = open_in_memory().unwrap();
        let mut value = record(Some("stale"), "Stale");
        value["updatedAt"] = json!("2020-01-01T00:00:00Z");
        let text = json!({ "version": 1, "tastings": [value] }).to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!(summary.added, 1);
        let entry = get_tasting(&conn, "stale").unwrap().unwrap();
        assert!(entry.updated_at >= entry.created_at);
    }

    #[test]
    fn numeric_ids_reconcile_on_reimport() {
        let conn = open_in_memory().unwrap();
        let mut value = record(None, "Numbered");
        value["id"] = json!(5);
        let text = json!({ "version": 1, "tastings": [value] }).to_string();

        let first = import_from_str(&conn, &text).unwrap();
        let second = import_from_str(&conn, &text).unwrap();

        assert_eq!((first.added, first.updated, first.errors), (1, 0, 0));
        assert_eq!((second.added, second.updated, second.errors), (0, 1, 0));
        assert_eq!(count_tastings(&conn).unwrap(), 1);
        assert!(get_tasting(&conn, "5").unwrap().is_some());
    }

    #[test]
    fn non_scalar_ids_are_counted_as_errors() {
        let conn = open_in_memory().unwrap();
        let mut value = record(None, "Odd id");
        value["id"] = json!({ "nested": true });
        let text = json!({ "version": 1, "tastings": [value] }).to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!((summary.added, summary.errors), (0, 1));
        assert_eq!(count_tastings(&conn).unwrap(), 0);
    }

    #[test]
    fn merge_ignores_unusable_incoming_timestamps() {
        let conn = open_in_memory().unwrap();
        let stored = add_tasting(&conn, wine("Pauillac")).unwrap();

        let text = json!({
            "version": 1,
            "tastings": [{
                "id": stored.id,
                "name": "Pauillac Grand Vin",
                "createdAt": "yesterday",
                "updatedAt": null
            }]
        })
        .to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!((summary.updated, summary.errors), (1, 0));

        let merged = get_tasting(&conn, &stored.id).unwrap().unwrap();
        assert_eq!(merged.name, "Pauillac Grand Vin");
        assert_eq!(merged.created_at, stored.created_at);
        assert!(merged.updated_at >= stored.updated_at);
    }

    #[test]
    fn existing_ids_merge_incoming_fields() {
        let conn = open_in_memory().unwrap();
        let stored = add_tasting(&conn, wine("Margaux")).unwrap();

        let text = json!({
            "version": 1,
            "tastings": [{
                "id": stored.id,
                "name": "Chateau Margaux",
                "region": null,
                "createdAt": "1999-01-01T00:00:00Z"
            }]
        })
        .to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!(summary.updated, 1);

        let merged = get_tasting(&conn, &stored.id).unwrap().unwrap();
        assert_eq!(merged.name, "Chateau Margaux");
        assert_eq!(merged.region, None);
        assert_eq!(merged.varietal, stored.varietal);
        assert_eq!(merged.created_at, stored.created_at);
        assert!(merged.updated_at >= stored.updated_at);
    }

    #[test]
    fn duplicate_ids_within_one_batch_add_then_update() {
        let conn = open_in_memory().unwrap();
        let text = json!({
            "version": 1,
            "tastings": [record(Some("dup"), "First"), record(Some("dup"), "Second")]
        })
        .to_string();

        let summary = import_from_str(&conn, &text).unwrap();
        assert_eq!((summary.added, summary.updated), (1, 1));
        assert_eq!(get_tasting(&conn, "dup").unwrap().unwrap().name, "Second");
    }
}
