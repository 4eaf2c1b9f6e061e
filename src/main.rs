//! Binary entry point. With a subcommand it runs headless against the store;
//! without one it loads the journal and drives the Ratatui event loop until
//! the user exits.
use std::io;

use clap::Parser;
use log::info;

use sipscribe::cli::{run_command, CliArgs};
use sipscribe::config::AppPaths;
use sipscribe::{list_tastings, logging, open_database, run_app, App};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let paths = AppPaths::resolve(args.data_dir)?;
    paths.ensure_data_dir()?;

    match args.command {
        Some(command) => {
            logging::init_stderr();
            let conn = open_database(&paths.database_path())?;
            run_command(&conn, &paths, command, &mut io::stdout().lock())
        }
        None => {
            logging::init_file(&paths.log_path())?;
            let conn = open_database(&paths.database_path())?;
            let entries = list_tastings(&conn)?;
            info!("Loaded {} tastings", entries.len());

            let mut app = App::new(conn, entries, paths.export_dir());
            run_app(&mut app)
        }
    }
}
