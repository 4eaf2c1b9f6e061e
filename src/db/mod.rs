//! Persistence module split across logical submodules.

mod connection;
mod tastings;

pub use connection::{open_database, open_in_memory};
pub use tastings::{
    add_tasting, count_tastings, delete_tasting, get_tasting, list_tastings,
    list_tastings_by_type, now_timestamp, update_tasting,
};
pub(crate) use tastings::{format_timestamp, insert_tasting, replace_tasting};
