//! Headless command line: the same record and interchange operations the TUI
//! drives, runnable from scripts.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::config::AppPaths;
use crate::db::{list_tastings, list_tastings_by_type};
use crate::interchange::{export_to_dir, import_from_path};
use crate::models::{BeverageType, TastingEntry};

#[derive(Parser, Debug)]
#[command(name = "sipscribe", about = "SipScribe - wine and whisky tasting journal")]
pub struct CliArgs {
    /// Data directory (overrides SIPSCRIBE_HOME and ~/.sipscribe)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Run a headless command instead of the terminal UI
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print every tasting, newest first
    List {
        /// Only show one beverage type (wine or whisky)
        #[arg(short = 't', long = "type")]
        beverage_type: Option<BeverageType>,
    },
    /// Write the journal to a dated JSON export file
    Export {
        /// Destination directory (defaults to <data-dir>/exports)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Merge a JSON export file into the journal
    Import {
        /// Path to the export file
        file: PathBuf,
    },
}

/// Execute one headless command, writing human-readable output to `out`.
pub fn run_command(
    conn: &Connection,
    paths: &AppPaths,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::List { beverage_type } => {
            let entries = match beverage_type {
                Some(beverage_type) => list_tastings_by_type(conn, beverage_type)?,
                None => list_tastings(conn)?,
            };
            if entries.is_empty() {
                writeln!(out, "No tastings found.")?;
            }
            for entry in &entries {
                writeln!(out, "{}", list_line(entry))?;
            }
        }
        Command::Export { dir } => {
            let dir = dir.unwrap_or_else(|| paths.export_dir());
            let path = export_to_dir(conn, &dir)?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Import { file } => {
            let summary = import_from_path(conn, &file)?;
            writeln!(
                out,
                "added: {}, updated: {}, errors: {}",
                summary.added, summary.updated, summary.errors
            )?;
        }
    }
    out.flush().context("failed to flush output")
}

fn list_line(entry: &TastingEntry) -> String {
    let summary = entry.attribute_summary();
    let mut line = format!(
        "{}  {:<6}  {:>7}  {}",
        entry.created_at.format("%Y-%m-%d"),
        entry.beverage_type.as_str(),
        entry.display_score(),
        entry.name
    );
    if !summary.is_empty() {
        line.push_str(&format!("  ({summary})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{add_tasting, open_in_memory};
    use crate::models::{overall_score, NewTasting};

    fn whisky(name: &str) -> NewTasting {
        NewTasting {
            beverage_type: BeverageType::Whisky,
            name: name.to_string(),
            image_base64: None,
            nose_notes: "Peat".to_string(),
            palate_notes: "Smoke".to_string(),
            finish_notes: "Long".to_string(),
            color_notes: "Gold".to_string(),
            pairing_suggestions: "Oysters".to_string(),
            aroma_score: 8,
            palate_score: 7,
            finish_score: 9,
            overall_score: overall_score(8, 7, 9),
            vintage: None,
            varietal: None,
            region: None,
            distillery: Some("Ardbeg".to_string()),
            age_statement: Some(10),
            mash_bill: None,
        }
    }

    #[test]
    fn parses_subcommands_and_global_flag() {
        let args = CliArgs::parse_from([
            "sipscribe",
            "list",
            "--type",
            "Whisky",
            "--data-dir",
            "/tmp/j",
        ]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/j")));
        assert_eq!(
            args.command,
            Some(Command::List {
                beverage_type: Some(BeverageType::Whisky)
            })
        );

        let args = CliArgs::parse_from(["sipscribe"]);
        assert!(args.command.is_none());
    }

    #[test]
    fn rejects_unknown_beverage_type() {
        assert!(CliArgs::try_parse_from(["sipscribe", "list", "--type", "gin"]).is_err());
    }

    #[test]
    fn list_prints_one_line_per_entry() {
        let conn = open_in_memory().unwrap();
        add_tasting(&conn, whisky("Uigeadail")).unwrap();
        let paths = AppPaths::at(std::env::temp_dir());

        let mut out = Vec::new();
        run_command(&conn, &paths, Command::List { beverage_type: None }, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("Uigeadail"));
        assert!(text.contains("8.0/10"));
        assert!(text.contains("Ardbeg"));
    }

    #[test]
    fn list_reports_an_empty_journal() {
        let conn = open_in_memory().unwrap();
        let paths = AppPaths::at(std::env::temp_dir());

        let mut out = Vec::new();
        let command = Command::List {
            beverage_type: Some(BeverageType::Wine),
        };
        run_command(&conn, &paths, command, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No tastings found.\n");
    }
}
