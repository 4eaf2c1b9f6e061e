use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{BeverageType, TastingEntry};

/// Accent colour per beverage: burgundy-ish for wine, amber for whisky.
pub(crate) fn type_style(beverage_type: BeverageType) -> Style {
    match beverage_type {
        BeverageType::Wine => Style::default().fg(Color::Magenta),
        BeverageType::Whisky => Style::default().fg(Color::Yellow),
    }
}

/// Render a 1-10 score as a ten-cell bar, e.g. `#######...`.
pub(crate) fn score_bar(score: i64) -> String {
    let filled = score.clamp(0, 10) as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled))
}

/// Two-line list row: name, type badge and overall score, then the attribute
/// summary and sub-scores.
pub(crate) fn entry_row_lines(entry: &TastingEntry, selected: bool) -> Vec<Line<'static>> {
    let accent = type_style(entry.beverage_type);
    let name_style = if selected {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let summary = entry.attribute_summary();
    let mut detail = vec![Span::styled(
        format!(
            "Aroma {} · Palate {} · Finish {}",
            entry.aroma_score, entry.palate_score, entry.finish_score
        ),
        Style::default().fg(Color::Gray),
    )];
    if !summary.is_empty() {
        detail.insert(0, Span::styled(format!("{summary}   "), accent));
    }

    vec![
        Line::from(vec![
            Span::styled(entry.name.clone(), name_style),
            Span::raw("  "),
            Span::styled(format!("[{}]", entry.beverage_type.as_str()), accent),
            Span::raw("  "),
            Span::styled(entry.display_score(), accent.add_modifier(Modifier::BOLD)),
        ]),
        Line::from(detail),
    ]
}

/// Full detail view body for one entry.
pub(crate) fn detail_lines(entry: &TastingEntry) -> Vec<Line<'static>> {
    let accent = type_style(entry.beverage_type);
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                entry.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(format!("[{}]", entry.beverage_type.as_str()), accent),
        ]),
        Line::from(Span::styled(
            format!("Tasted {}", entry.created_at.format("%Y-%m-%d")),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled("Details", heading)),
    ];

    let attributes: Vec<(&str, Option<String>)> = match entry.beverage_type {
        BeverageType::Wine => vec![
            ("Vintage", entry.vintage.map(|v| v.to_string())),
            ("Varietal", entry.varietal.clone()),
            ("Region", entry.region.clone()),
        ],
        BeverageType::Whisky => vec![
            ("Distillery", entry.distillery.clone()),
            ("Age", entry.age_statement.map(|v| format!("{v} Years"))),
        ],
    };
    for (label, value) in attributes {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(labelled(label, value));
        }
    }
    if let Some(image) = &entry.image_base64 {
        lines.push(labelled(
            "Image",
            format!("attached ({} KB)", image.len().div_ceil(1024)),
        ));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Scores", heading)));
    lines.push(Line::from(vec![
        Span::raw("Overall: "),
        Span::styled(entry.display_score(), accent.add_modifier(Modifier::BOLD)),
    ]));
    for (label, score) in [
        ("Aroma ", entry.aroma_score),
        ("Palate", entry.palate_score),
        ("Finish", entry.finish_score),
    ] {
        lines.push(Line::from(vec![
            Span::raw(format!("{label}  ")),
            Span::styled(score_bar(score), accent),
            Span::raw(format!("  {score}/10")),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Tasting Notes", heading)));
    for (label, text) in [
        ("Color", &entry.color_notes),
        ("Nose", &entry.nose_notes),
        ("Palate", &entry.palate_notes),
        ("Finish", &entry.finish_notes),
        ("Pairings", &entry.pairing_suggestions),
    ] {
        lines.push(labelled(label, text.clone()));
    }

    lines
}

fn labelled(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label}: "),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Terminal position of a text cursor `column` cells right and `row` lines
/// down from the top-left of `area`, clamped to stay inside it.
pub(crate) fn cursor_in(area: Rect, column: usize, row: usize) -> (u16, u16) {
    let column = u16::try_from(column).unwrap_or(u16::MAX);
    let row = u16::try_from(row).unwrap_or(u16::MAX);
    (
        area.x
            .saturating_add(column)
            .min(area.right().saturating_sub(1)),
        area.y.saturating_add(row).min(area.bottom().saturating_sub(1)),
    )
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;

    #[test]
    fn score_bar_is_clamped_to_ten_cells() {
        assert_eq!(score_bar(7), "#######...");
        assert_eq!(score_bar(12), "##########");
        assert_eq!(score_bar(-1), "..........");
    }

    #[test]
    fn surface_error_prefers_the_root_cause() {
        let err = Err::<(), _>(anyhow!("disk full"))
            .context("failed to insert tasting")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }

    #[test]
    fn cursor_is_clamped_for_very_long_text() {
        let area = Rect::new(10, 5, 40, 8);
        assert_eq!(cursor_in(area, 3, 1), (13, 6));
        assert_eq!(cursor_in(area, 200_000, 0), (49, 5));
        assert_eq!(cursor_in(area, usize::MAX, usize::MAX), (49, 12));
    }

    #[test]
    fn centered_rect_stays_inside_the_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 15);
    }
}
