//! Open conversation watcher
//!
//! Re-fetches the messages of one conversation on a fixed interval while the
//! watcher is alive. Fetch errors are logged and the last list is kept.

use crate::notify::Notifier;
use crate::polling::policy::PollingPolicy;
use numero_api::{ApiError, ChatBackend, Message};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Live view of one conversation
pub struct ConversationWatcher {
    conversation_id: String,
    backend: Arc<dyn ChatBackend>,
    notifier: Arc<dyn Notifier>,
    messages: watch::Receiver<Vec<Message>>,
    task: JoinHandle<()>,
}

impl fmt::Debug for ConversationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationWatcher")
            .field("conversation_id", &self.conversation_id)
            .field("messages", &self.messages.borrow().len())
            .finish_non_exhaustive()
    }
}

impl ConversationWatcher {
    /// Start watching with the default 3 s policy
    #[must_use]
    pub fn spawn(
        conversation_id: impl Into<String>,
        backend: Arc<dyn ChatBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::spawn_with(
            conversation_id,
            backend,
            notifier,
            PollingPolicy::conversation_messages(),
        )
    }

    /// Start watching with a custom policy
    #[must_use]
    pub fn spawn_with(
        conversation_id: impl Into<String>,
        backend: Arc<dyn ChatBackend>,
        notifier: Arc<dyn Notifier>,
        policy: PollingPolicy,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let (tx, rx) = watch::channel(Vec::new());
        let task = tokio::spawn(watch_task(
            conversation_id.clone(),
            Arc::clone(&backend),
            policy,
            tx,
        ));

        Self {
            conversation_id,
            backend,
            notifier,
            messages: rx,
            task,
        }
    }

    /// Conversation being watched
    #[inline]
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Latest fetched messages
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Watch message list updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }

    /// Post a message; failures are toasted
    pub async fn send(&self, content: &str) -> Result<Message, ApiError> {
        match self
            .backend
            .send_message(&self.conversation_id, content)
            .await
        {
            Ok(message) => Ok(message),
            Err(e) => {
                tracing::warn!(conversation = %self.conversation_id, error = %e, "Send failed");
                self.notifier.error(&e.user_message());
                Err(e)
            }
        }
    }
}

impl Drop for ConversationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_task(
    conversation_id: String,
    backend: Arc<dyn ChatBackend>,
    policy: PollingPolicy,
    messages: watch::Sender<Vec<Message>>,
) {
    let start = if policy.poll_immediately {
        Instant::now()
    } else {
        Instant::now() + policy.interval
    };
    let mut ticker = time::interval_at(start, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match backend.messages(&conversation_id).await {
            Ok(latest) => {
                messages.send_if_modified(|current| {
                    if *current == latest {
                        false
                    } else {
                        tracing::debug!(conversation = %conversation_id, count = latest.len(), "Messages updated");
                        *current = latest;
                        true
                    }
                });
            }
            Err(e) => {
                tracing::warn!(conversation = %conversation_id, error = %e, "Message poll failed");
            }
        }
    }
}
