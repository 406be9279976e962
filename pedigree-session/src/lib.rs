pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use config::{SessionConfig, StorageBackend};
pub use error::{Result, SessionError};
pub use session::{NewParents, ParentLink, Parents, PedigreeSession};
