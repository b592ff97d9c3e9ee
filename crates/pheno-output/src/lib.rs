//! Output writers: BIDS-style TSV tables and JSON data dictionaries.

pub mod dictionary;
pub mod error;
pub mod frame;
pub mod tsv;

pub use dictionary::{render_dictionary, write_dictionary};
pub use error::{OutputError, Result};
pub use frame::table_to_frame;
pub use tsv::{render_tsv, write_table, write_tsv};
