//! Polling
//!
//! - [`PollingPolicy`]: interval, failure ceiling and quiet statuses per site
//! - [`JobPoller`]: submit a report job and poll until the report is ready
//! - [`UnreadCountPoller`]: bounded-retry badge poller
//! - [`ConversationWatcher`]: message list of an open conversation
//! - [`RequestGeneration`]: discards responses of superseded requests
//!
//! All loops run as tokio tasks owned by their handle; dropping the handle
//! aborts the task.

mod conversation;
mod generation;
mod job;
mod policy;
mod unread;

pub use conversation::ConversationWatcher;
pub use generation::RequestGeneration;
pub use job::{JobPoller, JobState};
pub use policy::{ComputedAt, PollingPolicy, ReadinessPredicate};
pub use unread::{UnreadCountPoller, UnreadState};
