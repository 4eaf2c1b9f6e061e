//! Domain models that mirror the `tastings` table and travel through every
//! layer: the TUI renders them, the record operations persist them, and the
//! interchange module serializes them verbatim into export documents.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of beverages the journal knows about. The variant decides
/// which optional attribute group (wine or whisky) is meaningful for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeverageType {
    Wine,
    Whisky,
}

impl BeverageType {
    /// Stable lowercase key used both in SQLite and in export documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            BeverageType::Wine => "wine",
            BeverageType::Whisky => "whisky",
        }
    }

    /// Flip between the two beverage kinds. The form uses this for its type
    /// selector.
    pub fn toggled(self) -> Self {
        match self {
            BeverageType::Wine => BeverageType::Whisky,
            BeverageType::Whisky => BeverageType::Wine,
        }
    }
}

impl fmt::Display for BeverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeverageType::Wine => write!(f, "Wine"),
            BeverageType::Whisky => write!(f, "Whisky"),
        }
    }
}

impl FromStr for BeverageType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wine" => Ok(BeverageType::Wine),
            "whisky" => Ok(BeverageType::Whisky),
            other => Err(anyhow!("unknown beverage type '{other}'")),
        }
    }
}

/// Grain proportions for a whisky. Part of the schema even though the form
/// never fills it in, so imports carrying a mash bill keep it intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MashBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rye: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barley: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheat: Option<f64>,
}

/// One journaled tasting. Field names serialize in camelCase, which is also
/// the export document format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TastingEntry {
    /// Opaque identifier assigned at creation and never reassigned.
    pub id: String,
    #[serde(rename = "type")]
    pub beverage_type: BeverageType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub nose_notes: String,
    pub palate_notes: String,
    pub finish_notes: String,
    pub color_notes: String,
    pub pairing_suggestions: String,
    pub aroma_score: i64,
    pub palate_score: i64,
    pub finish_score: i64,
    /// Mean of the three sub-scores as computed by whoever wrote the entry.
    /// The store never recomputes it.
    pub overall_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub varietal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distillery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_statement: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mash_bill: Option<MashBill>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TastingEntry {
    /// Short attribute summary for list rows: vintage/varietal/region for wine,
    /// distillery/age for whisky. Empty pieces are skipped.
    pub fn attribute_summary(&self) -> String {
        let parts: Vec<String> = match self.beverage_type {
            BeverageType::Wine => vec![
                self.vintage.map(|year| year.to_string()),
                self.varietal.clone(),
                self.region.clone(),
            ],
            BeverageType::Whisky => vec![
                self.distillery.clone(),
                self.age_statement.map(|years| format!("{years} Years")),
            ],
        }
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();

        parts.join(" · ")
    }

    /// Overall score the way every view prints it.
    pub fn display_score(&self) -> String {
        format!("{:.1}/10", self.overall_score)
    }
}

/// Everything the add flow supplies. Identifier and timestamps are stamped by
/// the record operations.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTasting {
    pub beverage_type: BeverageType,
    pub name: String,
    pub image_base64: Option<String>,
    pub nose_notes: String,
    pub palate_notes: String,
    pub finish_notes: String,
    pub color_notes: String,
    pub pairing_suggestions: String,
    pub aroma_score: i64,
    pub palate_score: i64,
    pub finish_score: i64,
    pub overall_score: f64,
    pub vintage: Option<i64>,
    pub varietal: Option<String>,
    pub region: Option<String>,
    pub distillery: Option<String>,
    pub age_statement: Option<i64>,
    pub mash_bill: Option<MashBill>,
}

/// Partial update. `None` leaves a field untouched; for optional attributes
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TastingPatch {
    pub beverage_type: Option<BeverageType>,
    pub name: Option<String>,
    pub image_base64: Option<Option<String>>,
    pub nose_notes: Option<String>,
    pub palate_notes: Option<String>,
    pub finish_notes: Option<String>,
    pub color_notes: Option<String>,
    pub pairing_suggestions: Option<String>,
    pub aroma_score: Option<i64>,
    pub palate_score: Option<i64>,
    pub finish_score: Option<i64>,
    pub overall_score: Option<f64>,
    pub vintage: Option<Option<i64>>,
    pub varietal: Option<Option<String>>,
    pub region: Option<Option<String>>,
    pub distillery: Option<Option<String>>,
    pub age_statement: Option<Option<i64>>,
    pub mash_bill: Option<Option<MashBill>>,
}

impl TastingPatch {
    /// Patch that only renames an entry.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Overwrite the matching fields of `entry`. Timestamps and the id are left
    /// to the caller.
    pub fn apply_to(self, entry: &mut TastingEntry) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut entry.beverage_type, self.beverage_type);
        set(&mut entry.name, self.name);
        set(&mut entry.image_base64, self.image_base64);
        set(&mut entry.nose_notes, self.nose_notes);
        set(&mut entry.palate_notes, self.palate_notes);
        set(&mut entry.finish_notes, self.finish_notes);
        set(&mut entry.color_notes, self.color_notes);
        set(&mut entry.pairing_suggestions, self.pairing_suggestions);
        set(&mut entry.aroma_score, self.aroma_score);
        set(&mut entry.palate_score, self.palate_score);
        set(&mut entry.finish_score, self.finish_score);
        set(&mut entry.overall_score, self.overall_score);
        set(&mut entry.vintage, self.vintage);
        set(&mut entry.varietal, self.varietal);
        set(&mut entry.region, self.region);
        set(&mut entry.distillery, self.distillery);
        set(&mut entry.age_statement, self.age_statement);
        set(&mut entry.mash_bill, self.mash_bill);
    }
}

/// Arithmetic mean of the three component scores. Callers use this when
/// building a `NewTasting` or `TastingPatch`.
pub fn overall_score(aroma: i64, palate: i64, finish: i64) -> f64 {
    (aroma + palate + finish) as f64 / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> TastingEntry {
        let now = Utc::now();
        TastingEntry {
            id: "abc".to_string(),
            beverage_type: BeverageType::Wine,
            name: "Chateau Margaux 2015".to_string(),
            image_base64: None,
            nose_notes: "Black cherries".to_string(),
            palate_notes: "Full-bodied".to_string(),
            finish_notes: "Long".to_string(),
            color_notes: "Deep ruby".to_string(),
            pairing_suggestions: "Ribeye".to_string(),
            aroma_score: 9,
            palate_score: 8,
            finish_score: 7,
            overall_score: 8.0,
            vintage: Some(2015),
            varietal: Some("Cabernet Sauvignon".to_string()),
            region: None,
            distillery: None,
            age_statement: None,
            mash_bill: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overall_score_is_the_mean() {
        assert_eq!(overall_score(9, 8, 7), 8.0);
        assert!((overall_score(5, 5, 6) - 16.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn beverage_type_parses_case_insensitively() {
        assert_eq!("Wine".parse::<BeverageType>().unwrap(), BeverageType::Wine);
        assert_eq!(" whisky ".parse::<BeverageType>().unwrap(), BeverageType::Whisky);
        assert!("beer".parse::<BeverageType>().is_err());
    }

    #[test]
    fn serializes_in_camel_case_and_omits_absent_options() {
        let value = serde_json::to_value(sample_entry()).unwrap();
        assert_eq!(value["type"], "wine");
        assert_eq!(value["noseNotes"], "Black cherries");
        assert_eq!(value["vintage"], 2015);
        assert!(value.get("region").is_none());
        assert!(value.get("imageBase64").is_none());
    }

    #[test]
    fn patch_clears_and_replaces_fields() {
        let mut entry = sample_entry();
        let patch = TastingPatch {
            name: Some("Renamed".to_string()),
            varietal: Some(None),
            region: Some(Some("Bordeaux".to_string())),
            ..TastingPatch::default()
        };
        patch.apply_to(&mut entry);

        assert_eq!(entry.name, "Renamed");
        assert_eq!(entry.varietal, None);
        assert_eq!(entry.region.as_deref(), Some("Bordeaux"));
        assert_eq!(entry.vintage, Some(2015));
    }

    #[test]
    fn attribute_summary_follows_the_type() {
        let mut entry = sample_entry();
        assert_eq!(entry.attribute_summary(), "2015 · Cabernet Sauvignon");

        entry.beverage_type = BeverageType::Whisky;
        entry.distillery = Some("The Macallan".to_string());
        entry.age_statement = Some(18);
        assert_eq!(entry.attribute_summary(), "The Macallan · 18 Years");
    }
}
