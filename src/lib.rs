#![warn(clippy::pedantic)]
// Noisy doc/signature lints: would require annotating every pub function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Sizes and counts cross between u32/u64/usize at the API boundary
#![allow(clippy::cast_possible_truncation)]
// chat::ChatSyncEngine, chat::ChatEvent etc.
#![allow(clippy::module_name_repetitions)]

pub mod chat;
pub mod cli;
pub mod config;
pub mod errors;
pub(crate) mod utils;

pub use errors::{ChatError, ChatResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
