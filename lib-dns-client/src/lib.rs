#![warn(clippy::pedantic)]
// TODO: fix
#![allow(clippy::missing_errors_doc)]
// Don't care enough to fix
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::wildcard_imports)]

pub mod lookup;
pub mod net;
pub mod pipeline;
pub mod pooled;
pub mod types;

pub use self::lookup::resolve;
pub use self::pipeline::bulk_resolve_a;
pub use self::pooled::bulk_resolve_a_pooled;
pub use self::types::{Answer, Config, ResolveError};
