// Devdash Storage - engine selection
//
// A DatabaseHandle carries the schema binding it was wired to. The factory
// inspects that binding once and hands out the matching repositories for the
// life of the process.

mod factory;
mod handle;
mod selector;

pub use factory::{Repositories, RepositoryFactory};
pub use handle::{DatabaseHandle, Pool};
pub use selector::{detect_engine, Engine};
