//! Composition root
//!
//! [`NumeroApp`] owns the store, notifier, backends and services, and wires
//! them together once:
//! - the subscription service listens to auth user changes
//! - the stored session is restored on construction
//! - pollers are handed out with the configured policies

use crate::auth::AuthService;
use crate::config::Config;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::polling::{ConversationWatcher, JobPoller, UnreadCountPoller};
use crate::preferences::Preferences;
use crate::validation::validate_report_request;
use numero_api::{
    ApiClient, AuthBackend, ChatBackend, ConsultationBackend, JobId, NotificationBackend,
    NumerologyBackend, PaymentsBackend, ReportBackend, ReportKind, ReportRequest,
};
use numero_storage::{FileStore, KeyValueStore, MemoryStore};
use numero_subscription::{required_tier, Gate, GateDecision, SubscriptionService};
use std::fmt;
use std::sync::Arc;

/// One implementation per backend seam
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthBackend>,
    pub reports: Arc<dyn ReportBackend>,
    pub notifications: Arc<dyn NotificationBackend>,
    pub chat: Arc<dyn ChatBackend>,
    pub numerology: Arc<dyn NumerologyBackend>,
    pub payments: Arc<dyn PaymentsBackend>,
    pub consultations: Arc<dyn ConsultationBackend>,
}

impl Backends {
    /// Every seam served by the REST client
    #[must_use]
    pub fn from_client(client: Arc<ApiClient>) -> Self {
        Self::uniform(client)
    }

    /// Every seam served by one value
    #[must_use]
    pub fn uniform<T>(backend: Arc<T>) -> Self
    where
        T: AuthBackend
            + ReportBackend
            + NotificationBackend
            + ChatBackend
            + NumerologyBackend
            + PaymentsBackend
            + ConsultationBackend
            + 'static,
    {
        Self {
            auth: backend.clone(),
            reports: backend.clone(),
            notifications: backend.clone(),
            chat: backend.clone(),
            numerology: backend.clone(),
            payments: backend.clone(),
            consultations: backend,
        }
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// Client application state
pub struct NumeroApp {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    backends: Backends,
    auth: Arc<AuthService>,
    subscription: Arc<SubscriptionService>,
    preferences: Preferences,
}

impl fmt::Debug for NumeroApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumeroApp")
            .field("api_url", &self.config.api_url)
            .field("auth", &self.auth)
            .field("tier", &self.subscription.tier())
            .finish_non_exhaustive()
    }
}

impl NumeroApp {
    /// Wire services and restore the stored session
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        backends: Backends,
    ) -> Self {
        let subscription = Arc::new(SubscriptionService::new(Arc::clone(&store)));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&backends.auth),
            Arc::clone(&store),
            Arc::clone(&notifier),
        ));
        auth.add_listener(subscription.clone());
        auth.restore();

        tracing::info!(
            api_url = %config.api_url,
            authenticated = auth.is_authenticated(),
            tier = %subscription.tier(),
            "Numero client ready"
        );

        Self {
            preferences: Preferences::new(Arc::clone(&store)),
            config,
            store,
            notifier,
            backends,
            auth,
            subscription,
        }
    }

    /// Build the store and REST client described by `config`
    ///
    /// # Errors
    /// - `AppError::Config` if the config is invalid
    /// - `AppError::Api` if the HTTP client cannot be built
    pub fn from_config(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        config.validate()?;

        let store: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(FileStore::open(path.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        let client = Arc::new(ApiClient::new(config.api_config())?);

        Ok(Self::new(
            config,
            store,
            notifier,
            Backends::from_client(client),
        ))
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    #[inline]
    #[must_use]
    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    #[inline]
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    #[must_use]
    pub fn subscription(&self) -> &SubscriptionService {
        &self.subscription
    }

    #[inline]
    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Gate decision for `feature` under the current tier
    #[must_use]
    pub fn gate(&self, feature: &str, locked_preview: bool) -> GateDecision {
        Gate::new(required_tier(feature))
            .locked_preview(locked_preview)
            .evaluate(self.subscription.tier())
    }

    /// Poller for one report kind, using the configured policy
    #[must_use]
    pub fn job_poller(&self, kind: ReportKind) -> JobPoller {
        let policy = match kind {
            ReportKind::Phone => self.config.polling.phone_report.clone(),
            ReportKind::Name => self.config.polling.name_report.clone(),
        };
        JobPoller::new(
            kind,
            Arc::clone(&self.backends.reports),
            Arc::clone(&self.notifier),
        )
        .with_policy(policy)
    }

    /// Start the unread badge poller
    #[must_use]
    pub fn unread_poller(&self) -> UnreadCountPoller {
        UnreadCountPoller::spawn_with(
            Arc::clone(&self.backends.notifications),
            self.config.polling.unread_notifications.clone(),
        )
    }

    /// Start watching a conversation
    #[must_use]
    pub fn watch_conversation(&self, conversation_id: &str) -> ConversationWatcher {
        ConversationWatcher::spawn_with(
            conversation_id,
            Arc::clone(&self.backends.chat),
            Arc::clone(&self.notifier),
            self.config.polling.conversation_messages.clone(),
        )
    }

    /// Check access and quota, submit the report job, then charge usage
    ///
    /// Nothing is sent when the tier is too low or the counter is exhausted;
    /// the user gets an upgrade toast instead. Usage is only charged once the
    /// backend accepted the job.
    pub async fn generate_report(
        &self,
        poller: &JobPoller,
        request: ReportRequest,
    ) -> Result<JobId, AppError> {
        let request = validate_report_request(request)?;
        let kind = request.kind();
        let feature = kind.feature();

        if !self.subscription.has_access(feature) {
            let required = required_tier(feature);
            tracing::info!(feature, %required, tier = %self.subscription.tier(), "Feature locked");
            self.notifier
                .info(&format!("Upgrade to {required} to unlock {feature}."));
            return Err(AppError::UpgradeRequired {
                feature: feature.to_string(),
                required,
            });
        }

        let counter = kind.usage_counter();
        if !self.subscription.can_use_feature(counter) {
            tracing::info!(counter, "Usage limit reached");
            self.notifier
                .info("You've reached your plan's limit for this report. Upgrade for more.");
            return Err(AppError::LimitReached {
                feature: counter.to_string(),
            });
        }

        let job_id = poller.submit(&request).await?;
        self.subscription.increment_usage(counter);
        Ok(job_id)
    }
}
