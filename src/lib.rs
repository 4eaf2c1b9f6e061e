//! Core library surface for the SipScribe tasting journal.
//!
//! The binary only glues these pieces together: `config` finds the data
//! directory, `db` owns the SQLite store, `interchange` moves the journal in
//! and out as JSON, and `ui`/`cli` are the two front ends.
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod interchange;
pub mod logging;
pub mod models;
pub mod ui;

/// Record operations over the embedded store.
pub use db::{
    add_tasting, count_tastings, delete_tasting, get_tasting, list_tastings,
    list_tastings_by_type, open_database, open_in_memory, update_tasting,
};

pub use error::JournalError;
pub use interchange::{ExportDocument, ImportSummary};
pub use models::{BeverageType, MashBill, NewTasting, TastingEntry, TastingPatch};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
