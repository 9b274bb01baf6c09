//! Magic spell language server
//! Schema-driven completion and hover for Magic spell and effect YAML files

mod server;
pub mod config;
pub mod error;
pub mod schema;
pub mod parser;
pub mod hierarchy;
pub mod scanner;
pub mod completion;
pub mod hover;
pub mod diagnostics;

// Re-export the modules needed for public API
pub use completion::{request_completions, Candidate, CompletionList, CompletionOptions, Cursor, Dialect, Target};
pub use hierarchy::resolve_hierarchy;
pub use schema::MagicSchema;
pub use server::Backend;
