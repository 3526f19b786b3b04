pub mod archivers;
pub mod core;
pub mod orchestration;
pub mod security;
pub mod targets;

pub use core::*;
pub use orchestration::{ReleasePublisher, RunOutcome, RunReport};
pub use security::{CommandError, SafeCommandExecutor, SecureTokenManager};
