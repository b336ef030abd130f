//! Bundled source adapters
//!
//! All of them consume the plain-text list format from [`listing`]:
//! - **text_file** - local list file
//! - **http_list** - list served over HTTP(S)
//! - **static_list** - fixed in-memory entries
//!
//! Adapters are built from the `[[sources]]` table of the config file by
//! [`build_adapters`].

pub mod http_list;
pub mod listing;
pub mod static_list;
pub mod text_file;

pub use http_list::HttpListAdapter;
pub use static_list::StaticAdapter;
pub use text_file::TextFileAdapter;

use crate::types::SourceAdapter;
use marquee_common::config::{SourceKind, SourceSpec};
use marquee_common::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Build one adapter per configured source, keeping order
pub fn build_adapters(specs: &[SourceSpec]) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    specs.iter().map(build_adapter).collect()
}

fn build_adapter(spec: &SourceSpec) -> Result<Arc<dyn SourceAdapter>> {
    debug!(source = %spec.id, kind = ?spec.kind, location = %spec.location, "Building adapter");
    let adapter: Arc<dyn SourceAdapter> = match spec.kind {
        SourceKind::File => Arc::new(TextFileAdapter::new(&spec.id, &spec.location)),
        SourceKind::Http => Arc::new(HttpListAdapter::new(&spec.id, &spec.location).map_err(|e| {
            Error::Config(format!("Source '{}': {}", spec.id, e))
        })?),
    };
    Ok(adapter)
}
