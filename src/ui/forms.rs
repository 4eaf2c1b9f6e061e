use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{overall_score, BeverageType, NewTasting, TastingEntry, TastingPatch};

/// Fields available within the tasting form, in tab order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TastingField {
    Type,
    Name,
    Vintage,
    Varietal,
    Region,
    Distillery,
    AgeStatement,
    AromaScore,
    PalateScore,
    FinishScore,
    ColorNotes,
    NoseNotes,
    PalateNotes,
    FinishNotes,
    Pairing,
    Image,
}

const WINE_FIELDS: &[TastingField] = &[
    TastingField::Type,
    TastingField::Name,
    TastingField::Vintage,
    TastingField::Varietal,
    TastingField::Region,
    TastingField::AromaScore,
    TastingField::PalateScore,
    TastingField::FinishScore,
    TastingField::ColorNotes,
    TastingField::NoseNotes,
    TastingField::PalateNotes,
    TastingField::FinishNotes,
    TastingField::Pairing,
    TastingField::Image,
];

const WHISKY_FIELDS: &[TastingField] = &[
    TastingField::Type,
    TastingField::Name,
    TastingField::Distillery,
    TastingField::AgeStatement,
    TastingField::AromaScore,
    TastingField::PalateScore,
    TastingField::FinishScore,
    TastingField::ColorNotes,
    TastingField::NoseNotes,
    TastingField::PalateNotes,
    TastingField::FinishNotes,
    TastingField::Pairing,
    TastingField::Image,
];

impl TastingField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            TastingField::Type => "Type",
            TastingField::Name => "Name",
            TastingField::Vintage => "Vintage",
            TastingField::Varietal => "Varietal",
            TastingField::Region => "Region",
            TastingField::Distillery => "Distillery",
            TastingField::AgeStatement => "Age (years)",
            TastingField::AromaScore => "Aroma (1-10)",
            TastingField::PalateScore => "Palate (1-10)",
            TastingField::FinishScore => "Finish (1-10)",
            TastingField::ColorNotes => "Color",
            TastingField::NoseNotes => "Nose",
            TastingField::PalateNotes => "Palate notes",
            TastingField::FinishNotes => "Finish notes",
            TastingField::Pairing => "Pairings",
            TastingField::Image => "Image file",
        }
    }

    fn is_required(self) -> bool {
        !matches!(
            self,
            TastingField::Vintage
                | TastingField::Varietal
                | TastingField::Region
                | TastingField::Distillery
                | TastingField::AgeStatement
                | TastingField::Image
        )
    }

    /// Maximum digit count for numeric fields, `None` for free text.
    fn digit_limit(self) -> Option<usize> {
        match self {
            TastingField::AromaScore | TastingField::PalateScore | TastingField::FinishScore => {
                Some(2)
            }
            TastingField::Vintage => Some(4),
            TastingField::AgeStatement => Some(3),
            _ => None,
        }
    }
}

/// Editable state behind the add/edit popup. Every value is kept as raw text
/// until `parse_inputs` turns it into typed data.
#[derive(Clone, Debug)]
pub(crate) struct TastingForm {
    pub(crate) beverage_type: BeverageType,
    pub(crate) name: String,
    pub(crate) vintage: String,
    pub(crate) varietal: String,
    pub(crate) region: String,
    pub(crate) distillery: String,
    pub(crate) age_statement: String,
    pub(crate) aroma_score: String,
    pub(crate) palate_score: String,
    pub(crate) finish_score: String,
    pub(crate) color_notes: String,
    pub(crate) nose_notes: String,
    pub(crate) palate_notes: String,
    pub(crate) finish_notes: String,
    pub(crate) pairing: String,
    /// Path typed into the image field; read when the form is saved.
    pub(crate) image_path: String,
    /// Data URL currently attached to the entry.
    pub(crate) image: Option<String>,
    pub(crate) active: TastingField,
    pub(crate) error: Option<String>,
}

impl Default for TastingForm {
    fn default() -> Self {
        Self {
            beverage_type: BeverageType::Wine,
            name: String::new(),
            vintage: String::new(),
            varietal: String::new(),
            region: String::new(),
            distillery: String::new(),
            age_statement: String::new(),
            aroma_score: "5".to_string(),
            palate_score: "5".to_string(),
            finish_score: "5".to_string(),
            color_notes: String::new(),
            nose_notes: String::new(),
            palate_notes: String::new(),
            finish_notes: String::new(),
            pairing: String::new(),
            image_path: String::new(),
            image: None,
            active: TastingField::Name,
            error: None,
        }
    }
}

impl TastingForm {
    /// Populate the form from an existing entry when editing.
    pub(crate) fn from_entry(entry: &TastingEntry) -> Self {
        Self {
            beverage_type: entry.beverage_type,
            name: entry.name.clone(),
            vintage: entry.vintage.map(|v| v.to_string()).unwrap_or_default(),
            varietal: entry.varietal.clone().unwrap_or_default(),
            region: entry.region.clone().unwrap_or_default(),
            distillery: entry.distillery.clone().unwrap_or_default(),
            age_statement: entry
                .age_statement
                .map(|v| v.to_string())
                .unwrap_or_default(),
            aroma_score: entry.aroma_score.to_string(),
            palate_score: entry.palate_score.to_string(),
            finish_score: entry.finish_score.to_string(),
            color_notes: entry.color_notes.clone(),
            nose_notes: entry.nose_notes.clone(),
            palate_notes: entry.palate_notes.clone(),
            finish_notes: entry.finish_notes.clone(),
            pairing: entry.pairing_suggestions.clone(),
            image_path: String::new(),
            image: entry.image_base64.clone(),
            active: TastingField::Name,
            error: None,
        }
    }

    /// Fields shown for the currently selected beverage type.
    pub(crate) fn fields(&self) -> &'static [TastingField] {
        match self.beverage_type {
            BeverageType::Wine => WINE_FIELDS,
            BeverageType::Whisky => WHISKY_FIELDS,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.step_field(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.step_field(-1);
    }

    fn step_field(&mut self, offset: isize) {
        let fields = self.fields();
        let len = fields.len() as isize;
        let current = fields
            .iter()
            .position(|field| *field == self.active)
            .unwrap_or(0) as isize;
        let next = (current + offset).rem_euclid(len);
        self.active = fields[next as usize];
    }

    /// Switch between wine and whisky. Values typed into the other group's
    /// fields are kept so toggling back does not lose them.
    pub(crate) fn toggle_type(&mut self) {
        self.beverage_type = self.beverage_type.toggled();
        if !self.fields().contains(&self.active) {
            self.active = TastingField::Type;
        }
    }

    fn value(&self, field: TastingField) -> &str {
        match field {
            TastingField::Type => self.beverage_type.as_str(),
            TastingField::Name => &self.name,
            TastingField::Vintage => &self.vintage,
            TastingField::Varietal => &self.varietal,
            TastingField::Region => &self.region,
            TastingField::Distillery => &self.distillery,
            TastingField::AgeStatement => &self.age_statement,
            TastingField::AromaScore => &self.aroma_score,
            TastingField::PalateScore => &self.palate_score,
            TastingField::FinishScore => &self.finish_score,
            TastingField::ColorNotes => &self.color_notes,
            TastingField::NoseNotes => &self.nose_notes,
            TastingField::PalateNotes => &self.palate_notes,
            TastingField::FinishNotes => &self.finish_notes,
            TastingField::Pairing => &self.pairing,
            TastingField::Image => &self.image_path,
        }
    }

    fn value_mut(&mut self, field: TastingField) -> Option<&mut String> {
        match field {
            TastingField::Type => None,
            TastingField::Name => Some(&mut self.name),
            TastingField::Vintage => Some(&mut self.vintage),
            TastingField::Varietal => Some(&mut self.varietal),
            TastingField::Region => Some(&mut self.region),
            TastingField::Distillery => Some(&mut self.distillery),
            TastingField::AgeStatement => Some(&mut self.age_statement),
            TastingField::AromaScore => Some(&mut self.aroma_score),
            TastingField::PalateScore => Some(&mut self.palate_score),
            TastingField::FinishScore => Some(&mut self.finish_score),
            TastingField::ColorNotes => Some(&mut self.color_notes),
            TastingField::NoseNotes => Some(&mut self.nose_notes),
            TastingField::PalateNotes => Some(&mut self.palate_notes),
            TastingField::FinishNotes => Some(&mut self.finish_notes),
            TastingField::Pairing => Some(&mut self.pairing),
            TastingField::Image => Some(&mut self.image_path),
        }
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let field = self.active;
        let Some(value) = self.value_mut(field) else {
            return false;
        };

        match field.digit_limit() {
            Some(limit) => {
                if ch.is_ascii_digit() && value.chars().count() < limit {
                    value.push(ch);
                    true
                } else {
                    false
                }
            }
            None => {
                if !ch.is_control() {
                    value.push(ch);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove the last character from the active field. On an empty image
    /// field this detaches the current image instead.
    pub(crate) fn backspace(&mut self) {
        let field = self.active;
        if field == TastingField::Image && self.image_path.is_empty() {
            self.image = None;
            return;
        }
        if let Some(value) = self.value_mut(field) {
            value.pop();
        }
    }

    /// Live mean of the three scores, or `None` while any of them is invalid.
    pub(crate) fn overall_preview(&self) -> Option<f64> {
        let aroma = parse_score(&self.aroma_score, "Aroma").ok()?;
        let palate = parse_score(&self.palate_score, "Palate").ok()?;
        let finish = parse_score(&self.finish_score, "Finish").ok()?;
        Some(overall_score(aroma, palate, finish))
    }

    /// Validate the inputs and return typed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<NewTasting> {
        let name = required(&self.name, "Name")?;
        let aroma_score = parse_score(&self.aroma_score, "Aroma")?;
        let palate_score = parse_score(&self.palate_score, "Palate")?;
        let finish_score = parse_score(&self.finish_score, "Finish")?;
        let color_notes = required(&self.color_notes, "Color notes")?;
        let nose_notes = required(&self.nose_notes, "Nose notes")?;
        let palate_notes = required(&self.palate_notes, "Palate notes")?;
        let finish_notes = required(&self.finish_notes, "Finish notes")?;
        let pairing_suggestions = required(&self.pairing, "Pairing suggestions")?;
        let image_base64 = self.resolve_image()?;

        let is_wine = self.beverage_type == BeverageType::Wine;
        let (vintage, varietal, region) = if is_wine {
            (
                optional_number(&self.vintage, "Vintage")?,
                optional_text(&self.varietal),
                optional_text(&self.region),
            )
        } else {
            (None, None, None)
        };
        let (distillery, age_statement) = if is_wine {
            (None, None)
        } else {
            (
                optional_text(&self.distillery),
                optional_number(&self.age_statement, "Age statement")?,
            )
        };

        Ok(NewTasting {
            beverage_type: self.beverage_type,
            name,
            image_base64,
            nose_notes,
            palate_notes,
            finish_notes,
            color_notes,
            pairing_suggestions,
            aroma_score,
            palate_score,
            finish_score,
            overall_score: overall_score(aroma_score, palate_score, finish_score),
            vintage,
            varietal,
            region,
            distillery,
            age_statement,
            mash_bill: None,
        })
    }

    /// Edit-flow variant of `parse_inputs`. Only the attribute group of the
    /// selected type is written; the other group and the mash bill stay as
    /// stored. The image is always written, so a detached image is cleared.
    pub(crate) fn to_patch(&self) -> Result<TastingPatch> {
        let parsed = self.parse_inputs()?;
        let is_wine = parsed.beverage_type == BeverageType::Wine;

        Ok(TastingPatch {
            beverage_type: Some(parsed.beverage_type),
            name: Some(parsed.name),
            image_base64: Some(parsed.image_base64),
            nose_notes: Some(parsed.nose_notes),
            palate_notes: Some(parsed.palate_notes),
            finish_notes: Some(parsed.finish_notes),
            color_notes: Some(parsed.color_notes),
            pairing_suggestions: Some(parsed.pairing_suggestions),
            aroma_score: Some(parsed.aroma_score),
            palate_score: Some(parsed.palate_score),
            finish_score: Some(parsed.finish_score),
            overall_score: Some(parsed.overall_score),
            vintage: is_wine.then_some(parsed.vintage),
            varietal: is_wine.then_some(parsed.varietal),
            region: is_wine.then_some(parsed.region),
            distillery: (!is_wine).then_some(parsed.distillery),
            age_statement: (!is_wine).then_some(parsed.age_statement),
            mash_bill: None,
        })
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, field: TastingField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if field == TastingField::Type {
            format!("< {} >", self.beverage_type)
        } else if field == TastingField::Image && value.is_empty() {
            match &self.image {
                Some(image) => format!(
                    "<attached, {} KB; Backspace removes>",
                    image.len().div_ceil(1024)
                ),
                None => "<optional path>".to_string(),
            }
        } else if value.is_empty() {
            if field.is_required() {
                "<required>".to_string()
            } else {
                "<optional>".to_string()
            }
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::styled(
                format!("{}: ", field.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(display, style),
        ])
    }

    /// A freshly chosen file wins over the attached image.
    fn resolve_image(&self) -> Result<Option<String>> {
        match optional_text(&self.image_path) {
            Some(path) => image_data_url(Path::new(&path)).map(Some),
            None => Ok(self.image.clone()),
        }
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: TastingField) -> usize {
        self.value(field).chars().count()
    }
}

fn required(value: &str, label: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(anyhow!("{label} is required."))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Read an image file into a `data:<mime>;base64,...` URL.
pub(crate) fn image_data_url(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => bail!("Image must be a PNG, JPEG, GIF, WebP, BMP or SVG file."),
    };
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn optional_number(value: &str, label: &str) -> Result<Option<i64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| anyhow!("{label} must be a whole number."))
}

fn parse_score(value: &str, label: &str) -> Result<i64> {
    match value.trim().parse::<i64>() {
        Ok(score) if (1..=10).contains(&score) => Ok(score),
        _ => Err(anyhow!("{label} score must be between 1 and 10.")),
    }
}

/// Confirmation state for deleting a tasting.
#[derive(Clone, Debug)]
pub(crate) struct ConfirmTastingDelete {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl ConfirmTastingDelete {
    /// Build the confirmation state from the entry being considered.
    pub(crate) fn from(entry: &TastingEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
        }
    }
}

/// Single-line prompt used to collect the path of an import file.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathPrompt {
    pub(crate) path: String,
}

impl PathPrompt {
    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.path.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> TastingForm {
        TastingForm {
            name: " Chateau Margaux 2015 ".to_string(),
            vintage: "2015".to_string(),
            varietal: "Cabernet Sauvignon".to_string(),
            aroma_score: "9".to_string(),
            palate_score: "8".to_string(),
            finish_score: "7".to_string(),
            color_notes: "Deep ruby".to_string(),
            nose_notes: "Black cherries".to_string(),
            palate_notes: "Full-bodied".to_string(),
            finish_notes: "Long".to_string(),
            pairing: "Ribeye".to_string(),
            ..TastingForm::default()
        }
    }

    #[test]
    fn parse_inputs_builds_a_wine_tasting() {
        let tasting = filled_form().parse_inputs().unwrap();
        assert_eq!(tasting.beverage_type, BeverageType::Wine);
        assert_eq!(tasting.name, "Chateau Margaux 2015");
        assert_eq!(tasting.vintage, Some(2015));
        assert_eq!(tasting.region, None);
        assert_eq!(tasting.overall_score, 8.0);
        assert_eq!(tasting.distillery, None);
    }

    #[test]
    fn parse_inputs_reports_missing_required_fields() {
        let mut form = filled_form();
        form.name = "   ".to_string();
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Name is required.");

        let mut form = filled_form();
        form.pairing.clear();
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Pairing suggestions is required.");
    }

    #[test]
    fn scores_must_stay_within_range() {
        let mut form = filled_form();
        form.aroma_score = "11".to_string();
        assert!(form.parse_inputs().is_err());
        assert_eq!(form.overall_preview(), None);

        form.aroma_score = "0".to_string();
        assert!(form.parse_inputs().is_err());

        form.aroma_score = "6".to_string();
        assert_eq!(form.overall_preview(), Some(7.0));
    }

    #[test]
    fn numeric_fields_accept_digits_only() {
        let mut form = TastingForm::default();
        form.active = TastingField::AromaScore;
        form.aroma_score.clear();
        assert!(form.push_char('1'));
        assert!(!form.push_char('x'));
        assert!(form.push_char('0'));
        assert!(!form.push_char('0'));
        assert_eq!(form.aroma_score, "10");

        form.active = TastingField::Type;
        assert!(!form.push_char('a'));
    }

    #[test]
    fn field_navigation_wraps_and_follows_the_type() {
        let mut form = TastingForm::default();
        form.active = TastingField::Type;
        form.previous_field();
        assert_eq!(form.active, TastingField::Image);
        form.next_field();
        assert_eq!(form.active, TastingField::Type);

        form.toggle_type();
        assert_eq!(form.beverage_type, BeverageType::Whisky);
        form.next_field();
        form.next_field();
        assert_eq!(form.active, TastingField::Distillery);
    }

    #[test]
    fn whisky_patch_leaves_wine_attributes_alone() {
        let mut form = filled_form();
        form.toggle_type();
        form.distillery = "The Macallan".to_string();
        form.age_statement = "18".to_string();

        let patch = form.to_patch().unwrap();
        assert_eq!(patch.beverage_type, Some(BeverageType::Whisky));
        assert_eq!(patch.distillery, Some(Some("The Macallan".to_string())));
        assert_eq!(patch.age_statement, Some(Some(18)));
        assert_eq!(patch.vintage, None);
        assert_eq!(patch.image_base64, Some(None));
    }

    #[test]
    fn image_path_is_read_into_a_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.PNG");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let mut form = filled_form();
        form.image_path = path.display().to_string();
        let tasting = form.parse_inputs().unwrap();
        assert_eq!(
            tasting.image_base64.as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );
    }

    #[test]
    fn unreadable_or_unknown_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut form = filled_form();
        form.image_path = dir.path().join("missing.jpg").display().to_string();
        assert!(form.parse_inputs().is_err());

        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "not an image").unwrap();
        form.image_path = notes.display().to_string();
        let err = form.parse_inputs().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Image must be a PNG, JPEG, GIF, WebP, BMP or SVG file."
        );
    }

    #[test]
    fn edit_keeps_or_clears_the_attached_image() {
        let mut form = filled_form();
        form.image = Some("data:image/png;base64,AAAA".to_string());

        let patch = form.to_patch().unwrap();
        assert_eq!(
            patch.image_base64,
            Some(Some("data:image/png;base64,AAAA".to_string()))
        );

        form.active = TastingField::Image;
        form.image_path = "x".to_string();
        form.backspace();
        assert!(form.image.is_some());
        form.backspace();
        assert!(form.image.is_none());

        let patch = form.to_patch().unwrap();
        assert_eq!(patch.image_base64, Some(None));
    }
}
