//! Capability services for the Shadow assistant
//!
//! Each capability trait from `shadow-core` has a real implementation and a
//! no-op one. [`CapabilityRegistry`] picks between them once, from settings.

pub mod automation;
pub mod error;
pub mod file_ops;
pub mod knowledge;
pub mod messaging;
pub mod registry;
pub mod scheduler;

pub use automation::{NoOpAutomation, ProcessAutomation};
pub use error::CapabilityError;
pub use file_ops::{LocalFileOps, NoOpFileOps};
pub use knowledge::{HttpKnowledge, NoOpKnowledge};
pub use messaging::{NoOpMessenger, WebhookMessenger};
pub use registry::CapabilityRegistry;
pub use scheduler::{Notification, NoOpScheduler, TokioScheduler};
