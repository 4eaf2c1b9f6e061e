use std::mem;
use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::KeyCode;
use log::error;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    add_tasting, delete_tasting, get_tasting, list_tastings, list_tastings_by_type,
    update_tasting,
};
use crate::error::JournalError;
use crate::interchange::{export_to_dir, import_from_path, ImportSummary};
use crate::models::TastingEntry;

use super::forms::{ConfirmTastingDelete, PathPrompt, TastingField, TastingForm};
use super::helpers::{centered_rect, cursor_in, detail_lines, entry_row_lines, surface_error};
use super::screens::{DetailScreen, ListScreen, TypeFilter};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states.
enum Screen {
    List,
    Detail(DetailScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    Adding(TastingForm),
    Editing { id: String, form: TastingForm },
    ConfirmDelete(ConfirmTastingDelete),
    Importing(PathPrompt),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Debug, PartialEq, Eq)]
enum StatusKind {
    Info,
    Warning,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    export_dir: PathBuf,
    list: ListScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection, entries: Vec<TastingEntry>, export_dir: PathBuf) -> Self {
        Self {
            conn,
            export_dir,
            list: ListScreen::new(entries),
            screen: Screen::List,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Dispatch one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Adding(form) => self.handle_add(code, form)?,
            Mode::Editing { id, form } => self.handle_edit(code, id, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::Importing(prompt) => self.handle_import_prompt(code, prompt)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::List => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Up => self.list.move_selection(-1),
                    KeyCode::Down => self.list.move_selection(1),
                    KeyCode::PageUp => self.list.move_selection(-5),
                    KeyCode::PageDown => self.list.move_selection(5),
                    KeyCode::Home => self.list.select_first(),
                    KeyCode::End => self.list.select_last(),
                    KeyCode::Enter => {
                        if let Some(id) = self.current_id() {
                            self.clear_status();
                            self.open_detail(&id)?;
                        } else {
                            self.set_status("No tasting selected.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('t') | KeyCode::Char('T') => {
                        self.list.filter = self.list.filter.next();
                        self.reload_entries(None)?;
                        self.set_status(
                            format!("Showing {}.", self.list.filter.label()),
                            StatusKind::Info,
                        );
                    }
                    KeyCode::Char('+') | KeyCode::Char('a') => {
                        self.clear_status();
                        return Ok(Mode::Adding(TastingForm::default()));
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(id) = self.current_id() {
                            return self.begin_edit(&id);
                        }
                        self.set_status("No tasting selected to edit.", StatusKind::Error);
                    }
                    KeyCode::Char('-') | KeyCode::Delete => {
                        if let Some(entry) = self.list.current() {
                            let confirm = ConfirmTastingDelete::from(entry);
                            self.clear_status();
                            return Ok(Mode::ConfirmDelete(confirm));
                        }
                        self.set_status("No tasting selected to delete.", StatusKind::Error);
                    }
                    KeyCode::Char('x') | KeyCode::Char('X') => self.export_journal(),
                    KeyCode::Char('i') | KeyCode::Char('I') => {
                        self.clear_status();
                        return Ok(Mode::Importing(PathPrompt::default()));
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Detail(ref mut detail) => {
                let id = detail.entry.id.clone();
                match code {
                    KeyCode::Char('q') => {
                        *exit = true;
                    }
                    KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
                        self.screen = Screen::List;
                        self.clear_status();
                    }
                    KeyCode::Up => detail.scroll_by(-1),
                    KeyCode::Down => detail.scroll_by(1),
                    KeyCode::PageUp => detail.scroll_by(-10),
                    KeyCode::PageDown => detail.scroll_by(10),
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        return self.begin_edit(&id);
                    }
                    KeyCode::Char('-') | KeyCode::Delete => {
                        let confirm = ConfirmTastingDelete::from(&detail.entry);
                        return Ok(Mode::ConfirmDelete(confirm));
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
        }
    }

    fn handle_add(&mut self, code: KeyCode, mut form: TastingForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add tasting cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Enter => match self.save_new_tasting(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            _ => edit_form(&mut form, code),
        }

        if keep_open {
            Ok(Mode::Adding(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit(&mut self, code: KeyCode, id: String, mut form: TastingForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Enter => match self.save_existing_tasting(&id, &form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    if matches!(JournalError::find(&err), Some(JournalError::NotFound(_))) {
                        self.return_to_list_missing()?;
                        return Ok(Mode::Normal);
                    }
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            _ => edit_form(&mut form, code),
        }

        if keep_open {
            Ok(Mode::Editing { id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmTastingDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_import_prompt(&mut self, code: KeyCode, mut prompt: PathPrompt) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Import cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Backspace => {
                prompt.backspace();
                Ok(Mode::Importing(prompt))
            }
            KeyCode::Char(ch) => {
                prompt.push_char(ch);
                Ok(Mode::Importing(prompt))
            }
            KeyCode::Enter => {
                let path = prompt.path.trim();
                if path.is_empty() {
                    self.set_status("Enter the path of an export file.", StatusKind::Error);
                    return Ok(Mode::Importing(prompt));
                }
                self.import_journal(PathBuf::from(path))?;
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::Importing(prompt)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::List => self.draw_list(frame, content_area),
            Screen::Detail(detail) => self.draw_detail(frame, content_area, detail),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Adding(form) => self.draw_form(frame, area, "Add New Tasting", form),
            Mode::Editing { form, .. } => self.draw_form(frame, area, "Edit Tasting", form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Importing(prompt) => self.draw_import_prompt(frame, area, prompt),
            Mode::Normal => {}
        }
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " SipScribe | Tasting Journal ({}) ",
            self.list.filter.label()
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        if self.list.entries.is_empty() {
            let message = Paragraph::new(vec![
                Line::from("No tastings found."),
                Line::from("Press '+' to add your first tasting note."),
            ])
            .alignment(Alignment::Center)
            .block(block)
            .wrap(Wrap { trim: true });
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = self
            .list
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut lines = entry_row_lines(entry, idx == self.list.selected);
                lines.push(Line::from(""));
                ListItem::new(lines)
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(self.list.selected));
        let list = List::new(items).block(block).highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect, detail: &DetailScreen) {
        let block = Block::default()
            .title(" Tasting Detail ")
            .borders(Borders::ALL);
        let paragraph = Paragraph::new(detail_lines(&detail.entry))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((detail.scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::Adding(_)) | (_, Mode::Editing { .. }) => &[
                ("[Tab/↑↓]", "Field"),
                ("[←→/Space]", "Type"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ],
            (_, Mode::ConfirmDelete(_)) => &[("[y]", "Delete"), ("[n/Esc]", "Keep")],
            (_, Mode::Importing(_)) => &[("[Enter]", "Import"), ("[Esc]", "Cancel")],
            (Screen::List, Mode::Normal) => &[
                ("[↑↓]", "Navigate"),
                ("[Enter]", "Open"),
                ("[+]", "Add"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[t]", "Filter"),
                ("[x]", "Export"),
                ("[i]", "Import"),
                ("[q]", "Quit"),
            ],
            (Screen::Detail(_), Mode::Normal) => &[
                ("[↑↓]", "Scroll"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[Esc]", "Back"),
                ("[q]", "Quit"),
            ],
        };

        let mut spans = Vec::with_capacity(hints.len() * 2);
        for (key, action) in hints {
            spans.push(Span::styled(key.to_string(), key_style));
            spans.push(Span::raw(format!(" {action}   ")));
        }
        Line::from(spans)
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &TastingForm) {
        let popup_area = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let fields = form.fields();
        let mut lines: Vec<Line> = fields.iter().map(|field| form.build_line(*field)).collect();
        lines.push(Line::from(""));

        let overall = form
            .overall_preview()
            .map(|score| format!("{score:.1}/10"))
            .unwrap_or_else(|| "-".to_string());
        lines.push(Line::from(vec![
            Span::styled(
                "Overall Score: ",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(overall),
        ]));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch field • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        // No wrapping: one field per row keeps the cursor arithmetic simple.
        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        if form.active != TastingField::Type {
            if let Some(row) = fields.iter().position(|field| *field == form.active) {
                let column = form.active.label().chars().count() + 2 + form.value_len(form.active);
                frame.set_cursor_position(cursor_in(inner, column, row));
            }
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmTastingDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete Tasting")
            .borders(Borders::ALL);
        let lines = vec![
            Line::from(format!("Delete '{}'?", confirm.name)),
            Line::from(""),
            Line::from(Span::styled(
                "This cannot be undone. Press y to delete or n to keep it.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_import_prompt(&self, frame: &mut Frame, area: Rect, prompt: &PathPrompt) {
        let popup_area = centered_rect(70, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Import Tastings")
            .borders(Borders::ALL);
        let inner = block.inner(popup_area);
        let lines = vec![
            Line::from(format!("File: {}", prompt.path)),
            Line::from(""),
            Line::from(Span::styled(
                "Path to a SipScribe export (.json). Existing ids are updated, new ones added.",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), popup_area);

        let column = "File: ".len() + prompt.path.chars().count();
        frame.set_cursor_position(cursor_in(inner, column, 0));
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn current_id(&self) -> Option<String> {
        self.list.current().map(|entry| entry.id.clone())
    }

    fn open_detail(&mut self, id: &str) -> Result<()> {
        match get_tasting(&self.conn, id)? {
            Some(entry) => self.screen = Screen::Detail(DetailScreen::new(entry)),
            None => self.return_to_list_missing()?,
        }
        Ok(())
    }

    fn begin_edit(&mut self, id: &str) -> Result<Mode> {
        match get_tasting(&self.conn, id)? {
            Some(entry) => {
                self.clear_status();
                Ok(Mode::Editing {
                    id: entry.id.clone(),
                    form: TastingForm::from_entry(&entry),
                })
            }
            None => {
                self.return_to_list_missing()?;
                Ok(Mode::Normal)
            }
        }
    }

    /// The entry behind the current view vanished; fall back to the list.
    fn return_to_list_missing(&mut self) -> Result<()> {
        self.screen = Screen::List;
        self.reload_entries(None)?;
        self.set_status("Tasting not found.", StatusKind::Error);
        Ok(())
    }

    fn save_new_tasting(&mut self, form: &TastingForm) -> Result<()> {
        let tasting = form.parse_inputs()?;
        let entry = add_tasting(&self.conn, tasting)?;
        self.reload_entries(Some(&entry.id))?;
        self.set_status(format!("Added {}.", entry.name), StatusKind::Info);
        Ok(())
    }

    fn save_existing_tasting(&mut self, id: &str, form: &TastingForm) -> Result<()> {
        let patch = form.to_patch()?;
        let entry = update_tasting(&self.conn, id, patch)?;
        self.reload_entries(Some(id))?;
        if let Screen::Detail(ref mut detail) = self.screen {
            if detail.entry.id == entry.id {
                detail.entry = entry.clone();
            }
        }
        self.set_status(format!("Updated {}.", entry.name), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmTastingDelete) -> Result<()> {
        delete_tasting(&self.conn, &confirm.id)?;
        self.reload_entries(None)?;
        self.screen = Screen::List;
        self.set_status(format!("Deleted {}.", confirm.name), StatusKind::Info);
        Ok(())
    }

    fn export_journal(&mut self) {
        match export_to_dir(&self.conn, &self.export_dir) {
            Ok(path) => self.set_status(
                format!("Exported journal to {}.", path.display()),
                StatusKind::Info,
            ),
            Err(err) => {
                error!("Export failed: {err:#}");
                self.set_status(
                    format!("Export failed: {}", surface_error(&err)),
                    StatusKind::Error,
                );
            }
        }
    }

    fn import_journal(&mut self, path: PathBuf) -> Result<()> {
        match import_from_path(&self.conn, &path) {
            Ok(summary) => {
                self.reload_entries(None)?;
                let kind = if summary.errors > 0 {
                    StatusKind::Warning
                } else {
                    StatusKind::Info
                };
                self.set_status(import_banner(&summary), kind);
            }
            Err(err) => {
                error!("Import of {} failed: {err:#}", path.display());
                self.set_status(surface_error(&err), StatusKind::Error);
            }
        }
        Ok(())
    }

    /// Reload the list honouring the active type filter.
    fn reload_entries(&mut self, focus_id: Option<&str>) -> Result<()> {
        let entries = match self.list.filter {
            TypeFilter::All => list_tastings(&self.conn)?,
            TypeFilter::Only(beverage_type) => list_tastings_by_type(&self.conn, beverage_type)?,
        };
        self.list.set_entries(entries, focus_id);
        Ok(())
    }
}

/// Route a key press to the form's field editing.
fn edit_form(form: &mut TastingForm, code: KeyCode) {
    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.previous_field(),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
            if form.active == TastingField::Type =>
        {
            form.toggle_type();
        }
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(ch) => {
            if form.push_char(ch) {
                form.error = None;
            }
        }
        _ => {}
    }
}

fn import_banner(summary: &ImportSummary) -> String {
    format!(
        "Imported: {} added, {} updated, {} errors.",
        summary.added, summary.updated, summary.errors
    )
}
