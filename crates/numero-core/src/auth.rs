//! Auth session service
//!
//! Holds the current user and tokens, persists them to the injected store,
//! and tells registered [`AuthListener`]s whenever the user changes (login,
//! profile refresh, logout, restore).
//!
//! Failure policy:
//! - validation errors are returned before any network call
//! - backend errors are toasted with the backend's message (or the generic one)
//! - a failed profile refresh is logged and keeps the session
//! - logout always clears local state, even if the backend call fails

use crate::error::AuthError;
use crate::notify::Notifier;
use crate::validation::{
    required, validate_email, validate_new_password, validate_otp, RegistrationForm,
    ValidationError,
};
use numero_api::{
    ApiError, AuthBackend, AuthResponse, GoogleLoginRequest, LoginRequest, PasswordResetConfirm,
    RegisterResponse, User, VerifyOtpRequest,
};
use numero_storage::{get_json, keys, set_json, KeyValueStore};
use numero_subscription::SubscriptionService;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Observer of user changes
pub trait AuthListener: Send + Sync {
    /// Called with the new user, `None` after logout
    fn user_changed(&self, user: Option<&User>);
}

impl AuthListener for SubscriptionService {
    fn user_changed(&self, user: Option<&User>) {
        self.sync_user(user);
    }
}

#[derive(Debug, Clone, Default)]
struct Session {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<User>,
}

/// Session state plus the auth flows that change it
pub struct AuthService {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    session: RwLock<Session>,
    listeners: RwLock<Vec<Arc<dyn AuthListener>>>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.read();
        f.debug_struct("AuthService")
            .field("user", &session.user.as_ref().map(|u| &u.email))
            .field("authenticated", &session.access.is_some())
            .field("listeners", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a signed-out service; call [`restore`](Self::restore) to load a stored session
    #[must_use]
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            store,
            notifier,
            session: RwLock::new(Session::default()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to user changes
    pub fn add_listener(&self, listener: Arc<dyn AuthListener>) {
        self.listeners.write().push(listener);
    }

    /// Load tokens and user from the store
    ///
    /// Missing or corrupt entries mean "signed out". Listeners hear only
    /// about a loaded user; an anonymous start keeps derived state as stored.
    pub fn restore(&self) -> bool {
        let access = self.store.get(keys::ACCESS_TOKEN);
        let refresh = self.store.get(keys::REFRESH_TOKEN);
        let user = access
            .as_ref()
            .and_then(|_| get_json::<User>(self.store.as_ref(), keys::USER));

        self.backend.set_access_token(access.as_deref());
        let restored = access.is_some();
        *self.session.write() = Session {
            access,
            refresh,
            user: user.clone(),
        };

        tracing::info!(restored, "Session restored from storage");
        if let Some(user) = user.as_ref() {
            self.notify_listeners(Some(user));
        }
        restored
    }

    /// Current user
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.read().user.clone()
    }

    /// Bearer token of the session
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session.read().access.clone()
    }

    /// Whether a session token is held
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.read().access.is_some()
    }

    /// Create an account; the backend then emails an OTP
    pub async fn register(&self, form: RegistrationForm) -> Result<RegisterResponse, AuthError> {
        let request = form.into_request()?;
        let response = self.surface(self.backend.register(&request).await)?;

        tracing::info!(email = %request.email, "Registration accepted, awaiting OTP");
        self.notifier
            .success("Registration successful. Check your email for the verification code.");
        Ok(response)
    }

    /// Confirm the emailed code and sign in
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<User, AuthError> {
        validate_email(email)?;
        validate_otp(otp)?;
        let request = VerifyOtpRequest {
            email: email.trim().to_lowercase(),
            otp: otp.trim().to_string(),
        };

        let response = self.surface(self.backend.verify_otp(&request).await)?;
        self.notifier.success("Email verified.");
        Ok(self.establish(response))
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::Required("password").into());
        }

        let request = LoginRequest::new(email.trim().to_lowercase(), password);
        let response = self.surface(self.backend.login(&request).await)?;
        let user = self.establish(response);
        self.notifier.success("Welcome back!");
        Ok(user)
    }

    /// Sign in with a Google OAuth access token
    pub async fn login_with_google(&self, access_token: &str) -> Result<User, AuthError> {
        let access_token = required("Google token", access_token)?;
        let request = GoogleLoginRequest {
            access_token: access_token.to_string(),
        };

        let response = self.surface(self.backend.login_with_google(&request).await)?;
        let user = self.establish(response);
        self.notifier.success("Welcome!");
        Ok(user)
    }

    /// Sign out
    ///
    /// The backend call blacklists the refresh token. Its failure is logged
    /// only; local state is cleared regardless.
    pub async fn logout(&self) {
        let refresh = self.session.read().refresh.clone();
        if let Some(refresh) = refresh {
            if let Err(e) = self.backend.logout(&refresh).await {
                tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
            }
        }

        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER] {
            self.store.remove(key);
        }
        self.backend.set_access_token(None);
        *self.session.write() = Session::default();

        tracing::info!("Signed out");
        self.notify_listeners(None);
        self.notifier.info("You have been logged out.");
    }

    /// Re-fetch the profile
    ///
    /// On failure the session is kept and the error returned; nothing is toasted.
    pub async fn refresh_profile(&self) -> Result<User, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        match self.backend.profile().await {
            Ok(user) => {
                set_json(self.store.as_ref(), keys::USER, &user);
                self.session.write().user = Some(user.clone());
                tracing::debug!(user_id = %user.id, "Profile refreshed");
                self.notify_listeners(Some(&user));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile refresh failed, keeping session");
                Err(e.into())
            }
        }
    }

    /// Email a password reset link
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;
        let email = email.trim().to_lowercase();
        self.surface(self.backend.request_password_reset(&email).await)?;
        self.notifier
            .success("If that email is registered, a reset link is on its way.");
        Ok(())
    }

    /// Set a new password from the emailed link
    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let uid = required("reset link", uid)?;
        let token = required("reset link", token)?;
        validate_new_password(new_password, confirm)?;

        let request = PasswordResetConfirm {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        self.surface(self.backend.confirm_password_reset(&request).await)?;
        self.notifier.success("Password updated. You can now sign in.");
        Ok(())
    }

    fn establish(&self, response: AuthResponse) -> User {
        let AuthResponse {
            access,
            refresh,
            user,
        } = response;

        self.store.set(keys::ACCESS_TOKEN, access.clone());
        self.store.set(keys::REFRESH_TOKEN, refresh.clone());
        set_json(self.store.as_ref(), keys::USER, &user);
        self.backend.set_access_token(Some(&access));

        *self.session.write() = Session {
            access: Some(access),
            refresh: Some(refresh),
            user: Some(user.clone()),
        };

        tracing::info!(user_id = %user.id, plan = ?user.subscription_plan, "Signed in");
        self.notify_listeners(Some(&user));
        user
    }

    fn surface<T>(&self, result: Result<T, ApiError>) -> Result<T, AuthError> {
        result.map_err(|e| {
            tracing::warn!(error = %e, "Auth request failed");
            self.notifier.error(&e.user_message());
            AuthError::Api(e)
        })
    }

    fn notify_listeners(&self, user: Option<&User>) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.user_changed(user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use async_trait::async_trait;
    use numero_storage::MemoryStore;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Toasts(Mutex<Vec<(Severity, String)>>);

    impl Notifier for Toasts {
        fn notify(&self, severity: Severity, message: &str) {
            self.0.lock().push((severity, message.to_string()));
        }
    }

    #[derive(Default)]
    struct FakeAuth {
        login_error: Option<ApiError>,
        token: Mutex<Option<String>>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn register(
            &self,
            req: &numero_api::RegisterRequest,
        ) -> Result<RegisterResponse, ApiError> {
            self.calls.lock().push("register");
            Ok(RegisterResponse {
                message: None,
                email: Some(req.email.clone()),
            })
        }

        async fn verify_otp(&self, _: &VerifyOtpRequest) -> Result<AuthResponse, ApiError> {
            self.calls.lock().push("verify_otp");
            Err(ApiError::from_response(400, r#"{"detail": "Invalid OTP"}"#))
        }

        async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.calls.lock().push("login");
            if let Some(e) = &self.login_error {
                return Err(e.clone());
            }
            Ok(AuthResponse {
                access: "acc".into(),
                refresh: "ref".into(),
                user: User::new("1", req.email.clone()).with_plan("elite"),
            })
        }

        async fn login_with_google(&self, _: &GoogleLoginRequest) -> Result<AuthResponse, ApiError> {
            unreachable!()
        }

        async fn logout(&self, _: &str) -> Result<(), ApiError> {
            self.calls.lock().push("logout");
            Err(ApiError::Network("offline".into()))
        }

        async fn request_password_reset(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn confirm_password_reset(&self, _: &PasswordResetConfirm) -> Result<(), ApiError> {
            Ok(())
        }

        async fn profile(&self) -> Result<User, ApiError> {
            Err(ApiError::from_response(500, ""))
        }

        fn set_access_token(&self, token: Option<&str>) {
            *self.token.lock() = token.map(str::to_string);
        }
    }

    fn service(backend: FakeAuth) -> (Arc<FakeAuth>, Arc<MemoryStore>, Arc<Toasts>, AuthService) {
        let backend = Arc::new(backend);
        let store = Arc::new(MemoryStore::new());
        let toasts = Arc::new(Toasts::default());
        let svc = AuthService::new(backend.clone(), store.clone(), toasts.clone());
        (backend, store, toasts, svc)
    }

    #[tokio::test]
    async fn login_persists_session() {
        let (backend, store, _, svc) = service(FakeAuth::default());
        let user = svc.login(" A@B.co ", "hunter22").await.unwrap();

        assert_eq!(user.email, "a@b.co");
        assert_eq!(store.get(keys::ACCESS_TOKEN).as_deref(), Some("acc"));
        assert_eq!(store.get(keys::REFRESH_TOKEN).as_deref(), Some("ref"));
        assert!(store.get(keys::USER).is_some());
        assert_eq!(backend.token.lock().as_deref(), Some("acc"));
        assert!(svc.is_authenticated());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_backend() {
        let (backend, _, toasts, svc) = service(FakeAuth::default());

        assert!(matches!(
            svc.login("not-an-email", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(svc.verify_otp("a@b.co", "12").await.is_err());
        assert!(backend.calls.lock().is_empty());
        assert!(toasts.0.lock().is_empty());
    }

    #[tokio::test]
    async fn backend_error_is_toasted() {
        let (_, _, toasts, svc) = service(FakeAuth::default());
        let err = svc.verify_otp("a@b.co", "123456").await.unwrap_err();

        assert!(matches!(err, AuthError::Api(_)));
        assert_eq!(
            toasts.0.lock().as_slice(),
            &[(Severity::Error, "Invalid OTP".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_error_body_falls_back_to_generic_message() {
        let backend = FakeAuth {
            login_error: Some(ApiError::from_response(503, "<html>down</html>")),
            ..FakeAuth::default()
        };
        let (_, _, toasts, svc) = service(backend);
        svc.login("a@b.co", "hunter22").await.unwrap_err();

        assert_eq!(toasts.0.lock()[0].1, numero_api::GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() {
        let (backend, store, _, svc) = service(FakeAuth::default());
        svc.login("a@b.co", "hunter22").await.unwrap();
        svc.logout().await;

        assert!(backend.calls.lock().contains(&"logout"));
        assert!(store.get(keys::ACCESS_TOKEN).is_none());
        assert!(store.get(keys::USER).is_none());
        assert!(backend.token.lock().is_none());
        assert!(svc.current_user().is_none());
    }

    #[tokio::test]
    async fn failed_profile_refresh_keeps_session() {
        let (_, _, toasts, svc) = service(FakeAuth::default());
        svc.login("a@b.co", "hunter22").await.unwrap();
        toasts.0.lock().clear();

        assert!(svc.refresh_profile().await.is_err());
        assert!(svc.is_authenticated());
        assert!(svc.current_user().is_some());
        assert!(toasts.0.lock().is_empty());
    }

    #[tokio::test]
    async fn subscription_follows_user() {
        let (_, store, _, svc) = service(FakeAuth::default());
        let subscription = Arc::new(SubscriptionService::new(store));
        svc.add_listener(subscription.clone());

        svc.login("a@b.co", "hunter22").await.unwrap();
        assert!(subscription.has_access("auspicious-dates"));

        svc.logout().await;
        assert!(!subscription.has_access("auspicious-dates"));
    }

    #[test]
    fn restore_ignores_user_without_token() {
        let (backend, store, _, svc) = service(FakeAuth::default());
        set_json(store.as_ref(), keys::USER, &User::new("1", "a@b.co"));

        assert!(!svc.restore());
        assert!(svc.current_user().is_none());
        assert!(backend.token.lock().is_none());
    }

    #[test]
    fn restore_loads_session() {
        let (backend, store, _, svc) = service(FakeAuth::default());
        store.set(keys::ACCESS_TOKEN, "stored".into());
        set_json(store.as_ref(), keys::USER, &User::new("7", "a@b.co"));

        assert!(svc.restore());
        assert_eq!(svc.current_user().map(|u| u.id), Some("7".to_string()));
        assert_eq!(backend.token.lock().as_deref(), Some("stored"));
    }
}
