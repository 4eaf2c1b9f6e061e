use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use log::debug;
use rusqlite::{params, Connection, Row, ToSql};
use uuid::Uuid;

use crate::error::JournalError;
use crate::models::{BeverageType, MashBill, NewTasting, TastingEntry, TastingPatch};

/// Column list shared by every SELECT so `row_to_tasting` can rely on names.
const TASTING_COLUMNS: &str = "id, type, name, image_base64, nose_notes, palate_notes,
     finish_notes, color_notes, pairing_suggestions, aroma_score, palate_score,
     finish_score, overall_score, vintage, varietal, region, distillery,
     age_statement, mash_bill, created_at, updated_at";

/// Current time at the precision the store keeps. Truncating here means an
/// entry handed back to the caller compares equal to the one read back later.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so ordering by the column is chronological.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

fn row_to_tasting(row: &Row) -> Result<TastingEntry> {
    let beverage_type: String = row.get("type")?;
    let mash_bill: Option<String> = row.get("mash_bill")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(TastingEntry {
        id: row.get("id")?,
        beverage_type: beverage_type.parse()?,
        name: row.get("name")?,
        image_base64: row.get("image_base64")?,
        nose_notes: row.get("nose_notes")?,
        palate_notes: row.get("palate_notes")?,
        finish_notes: row.get("finish_notes")?,
        color_notes: row.get("color_notes")?,
        pairing_suggestions: row.get("pairing_suggestions")?,
        aroma_score: row.get("aroma_score")?,
        palate_score: row.get("palate_score")?,
        finish_score: row.get("finish_score")?,
        overall_score: row.get("overall_score")?,
        vintage: row.get("vintage")?,
        varietal: row.get("varietal")?,
        region: row.get("region")?,
        distillery: row.get("distillery")?,
        age_statement: row.get("age_statement")?,
        mash_bill: mash_bill
            .map(|raw| serde_json::from_str::<MashBill>(&raw))
            .transpose()
            .context("failed to decode mash_bill")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

fn encode_mash_bill(entry: &TastingEntry) -> Result<Option<String>> {
    entry
        .mash_bill
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("failed to encode mash_bill")
}

fn ensure_named(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(JournalError::MissingName.into())
    } else {
        Ok(())
    }
}

fn collect_tastings(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<TastingEntry>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare tasting query")?;
    let mut rows = stmt.query(args).context("failed to load tastings")?;

    let mut tastings = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch tasting row")? {
        tastings.push(row_to_tasting(row)?);
    }
    Ok(tastings)
}

/// Insert a complete entry exactly as given. Used by `add_tasting` and by
/// imports, which bring their own identifiers and timestamps.
pub(crate) fn insert_tasting(conn: &Connection, entry: &TastingEntry) -> Result<()> {
    ensure_named(&entry.name)?;
    let mash_bill = encode_mash_bill(entry)?;

    conn.execute(
        "INSERT INTO tastings (
            id, type, name, image_base64, nose_notes, palate_notes, finish_notes,
            color_notes, pairing_suggestions, aroma_score, palate_score, finish_score,
            overall_score, vintage, varietal, region, distillery, age_statement,
            mash_bill, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                   ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            entry.id,
            entry.beverage_type.as_str(),
            entry.name,
            entry.image_base64,
            entry.nose_notes,
            entry.palate_notes,
            entry.finish_notes,
            entry.color_notes,
            entry.pairing_suggestions,
            entry.aroma_score,
            entry.palate_score,
            entry.finish_score,
            entry.overall_score,
            entry.vintage,
            entry.varietal,
            entry.region,
            entry.distillery,
            entry.age_statement,
            mash_bill,
            format_timestamp(&entry.created_at),
            format_timestamp(&entry.updated_at),
        ],
    )
    .context("failed to insert tasting")?;

    Ok(())
}

/// Overwrite every mutable column of an existing row. `id` and `created_at`
/// are never touched.
pub(crate) fn replace_tasting(conn: &Connection, entry: &TastingEntry) -> Result<()> {
    ensure_named(&entry.name)?;
    let mash_bill = encode_mash_bill(entry)?;

    let updated = conn
        .execute(
            "UPDATE tastings SET
                type = ?2, name = ?3, image_base64 = ?4, nose_notes = ?5,
                palate_notes = ?6, finish_notes = ?7, color_notes = ?8,
                pairing_suggestions = ?9, aroma_score = ?10, palate_score = ?11,
                finish_score = ?12, overall_score = ?13, vintage = ?14, varietal = ?15,
                region = ?16, distillery = ?17, age_statement = ?18, mash_bill = ?19,
                updated_at = ?20
             WHERE id = ?1",
            params![
                entry.id,
                entry.beverage_type.as_str(),
                entry.name,
                entry.image_base64,
                entry.nose_notes,
                entry.palate_notes,
                entry.finish_notes,
                entry.color_notes,
                entry.pairing_suggestions,
                entry.aroma_score,
                entry.palate_score,
                entry.finish_score,
                entry.overall_score,
                entry.vintage,
                entry.varietal,
                entry.region,
                entry.distillery,
                entry.age_statement,
                mash_bill,
                format_timestamp(&entry.updated_at),
            ],
        )
        .context("failed to update tasting")?;

    if updated == 0 {
        Err(JournalError::NotFound(entry.id.clone()).into())
    } else {
        Ok(())
    }
}

/// Stamp a fresh identifier and timestamps onto `tasting`, persist it and
/// return the stored entry.
pub fn add_tasting(conn: &Connection, tasting: NewTasting) -> Result<TastingEntry> {
    let now = now_timestamp();
    let entry = TastingEntry {
        id: Uuid::new_v4().to_string(),
        beverage_type: tasting.beverage_type,
        name: tasting.name,
        image_base64: tasting.image_base64,
        nose_notes: tasting.nose_notes,
        palate_notes: tasting.palate_notes,
        finish_notes: tasting.finish_notes,
        color_notes: tasting.color_notes,
        pairing_suggestions: tasting.pairing_suggestions,
        aroma_score: tasting.aroma_score,
        palate_score: tasting.palate_score,
        finish_score: tasting.finish_score,
        overall_score: tasting.overall_score,
        vintage: tasting.vintage,
        varietal: tasting.varietal,
        region: tasting.region,
        distillery: tasting.distillery,
        age_statement: tasting.age_statement,
        mash_bill: tasting.mash_bill,
        created_at: now,
        updated_at: now,
    };

    insert_tasting(conn, &entry)?;
    debug!("added tasting {}", entry.id);
    Ok(entry)
}

/// Merge `patch` into the stored entry and refresh `updated_at`. Unknown ids
/// surface `JournalError::NotFound` instead of silently doing nothing.
pub fn update_tasting(conn: &Connection, id: &str, patch: TastingPatch) -> Result<TastingEntry> {
    let mut entry =
        get_tasting(conn, id)?.ok_or_else(|| JournalError::NotFound(id.to_string()))?;

    patch.apply_to(&mut entry);
    entry.updated_at = now_timestamp().max(entry.updated_at);

    replace_tasting(conn, &entry)?;
    debug!("updated tasting {id}");
    Ok(entry)
}

/// Remove an entry. Deleting an id that does not exist is not an error.
pub fn delete_tasting(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM tastings WHERE id = ?1", params![id])
        .context("failed to delete tasting")?;
    debug!("deleted {deleted} tasting row(s) for {id}");
    Ok(())
}

/// Point lookup by identifier.
pub fn get_tasting(conn: &Connection, id: &str) -> Result<Option<TastingEntry>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {TASTING_COLUMNS} FROM tastings WHERE id = ?1"))
        .context("failed to prepare tasting lookup")?;
    let mut rows = stmt.query(params![id]).context("failed to look up tasting")?;

    match rows.next().context("failed to fetch tasting row")? {
        Some(row) => Ok(Some(row_to_tasting(row)?)),
        None => Ok(None),
    }
}

/// Every entry, newest first.
pub fn list_tastings(conn: &Connection) -> Result<Vec<TastingEntry>> {
    collect_tastings(
        conn,
        &format!("SELECT {TASTING_COLUMNS} FROM tastings ORDER BY created_at DESC, id DESC"),
        &[],
    )
}

/// Entries of one beverage type, looked up through the type index.
pub fn list_tastings_by_type(
    conn: &Connection,
    beverage_type: BeverageType,
) -> Result<Vec<TastingEntry>> {
    collect_tastings(
        conn,
        &format!(
            "SELECT {TASTING_COLUMNS} FROM tastings WHERE type = ?1
             ORDER BY created_at DESC, id DESC"
        ),
        &[&beverage_type.as_str()],
    )
}

pub fn count_tastings(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tastings", [], |row| row.get(0))
        .context("failed to count tastings")?;
    Ok(count as usize)
}
