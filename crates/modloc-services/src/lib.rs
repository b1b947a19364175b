//! High-level orchestration layer over lower-level crates.
//! Intentionally thin: exposes stable functions used by the CLI.

pub use modloc_core::{LangFileEntry, LocaleMap, Result};

pub mod assemble;
pub mod batch;
pub mod merge;
pub mod overrides;
pub mod process;
pub mod session;
pub mod translate;

pub use session::Session;
