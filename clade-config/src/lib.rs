//! Clade Config - layered configuration resolution.
//!
//! Loads a base JSON document and an optional overlay, deep-merges them
//! (overlay wins), substitutes environment variables through the merged
//! tree, and materializes validated per-server records ready for the
//! process launcher.

mod expand;
mod merge;
mod resolver;
mod server;

pub use expand::{expand_str, expand_tree};
pub use merge::{deep_merge, merge_layers};
pub use resolver::ConfigResolver;
pub use server::{RawServerConfig, ServerConfig, DEFAULT_PORT};
