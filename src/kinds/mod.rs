//! Resource kinds plugged into the lifecycle controller.
//!
//! Each kind supplies its builder steps, its client calls and the provider
//! statuses that end polling.

pub mod attachment;
pub mod compute;
pub mod dbaas;

pub use attachment::{ATTACHMENT_STATUSES, AttachmentKind};
pub use compute::{COMPUTE_STATUSES, ComputeKind};
pub use dbaas::{DB_SYSTEM_STATUSES, DbaasKind};
