//! Terminal front end: list, detail and form views over the tasting journal.
mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
