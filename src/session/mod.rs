pub mod memory;
pub mod resolver;
pub mod store;

pub use memory::{CommandRecord, SessionMemory};
pub use resolver::{resolve_reference, RefKind};
pub use store::SessionStore;
