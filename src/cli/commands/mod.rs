//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod index;
mod list;
mod query;
mod run;
mod search;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::run_index;
pub use list::run_list;
pub use query::run_query;
pub use run::run_pipeline;
pub use search::run_search;

use crate::config::Settings;
use std::path::PathBuf;

/// Resolve the folder to load from, falling back to the configured input directory.
fn resolve_dir(dir: Option<String>, settings: &Settings) -> PathBuf {
    dir.map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.input_dir())
}
