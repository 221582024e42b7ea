//! Shared building blocks for the generic process-interface host.
//!
//! Everything here is deliberately small: path-template rendering, the
//! atomic-replace write primitive used for snapshots and job records, and
//! the timestamp helpers the rest of the workspace shares.

pub mod fsio;
pub mod paths;
pub mod time;

pub use fsio::{atomic_replace, read_json_file, read_to_string_opt};
pub use paths::{render_template, template_has_token, PathTemplateSet, TemplateArgs};
pub use time::{now_epoch_ms, now_rfc3339};
