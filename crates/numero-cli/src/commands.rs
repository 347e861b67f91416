//! Subcommand handlers

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use numero_api::{NameReportRequest, NumerologyBackend, PhoneReportRequest, ReportRequest};
use numero_core::{AppError, AuthError, JobError, JobState, NumeroApp, RegistrationForm};
use numero_subscription::{required_tier, GateDecision, Tier};

pub(crate) async fn login(app: &NumeroApp, email: &str, password: &str) -> Result<()> {
    let user = app.auth().login(email, password).await?;
    println!(
        "Signed in as {} ({} plan)",
        user.display_name(),
        app.subscription().tier()
    );
    Ok(())
}

pub(crate) async fn register(app: &NumeroApp, form: RegistrationForm) -> Result<()> {
    let email = form.email.clone();
    app.auth().register(form).await?;
    println!("Run `numero verify-otp --email {email} --otp <code>` with the emailed code.");
    Ok(())
}

pub(crate) async fn verify_otp(app: &NumeroApp, email: &str, otp: &str) -> Result<()> {
    let user = app.auth().verify_otp(email, otp).await?;
    println!("Verified. Signed in as {}", user.display_name());
    Ok(())
}

pub(crate) async fn reset_password(app: &NumeroApp, email: &str) -> Result<()> {
    app.auth().request_password_reset(email).await?;
    Ok(())
}

pub(crate) async fn logout(app: &NumeroApp) {
    app.auth().logout().await;
}

pub(crate) async fn whoami(app: &NumeroApp) -> Result<()> {
    if !app.auth().is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    // Stale but valid session beats no answer
    let user = match app.auth().refresh_profile().await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Showing cached profile");
            app.auth()
                .current_user()
                .context("session has no cached profile")?
        }
    };

    println!("{} <{}>", user.display_name(), user.email);
    println!(
        "plan: {}  tier: {}",
        user.subscription_plan.as_deref().unwrap_or("none"),
        app.subscription().tier()
    );
    Ok(())
}

pub(crate) fn tier(app: &NumeroApp, set: Option<&str>) {
    if let Some(raw) = set {
        app.subscription().set_tier(Tier::parse_lenient(raw));
    }

    let subscription = app.subscription();
    println!("tier: {}", subscription.tier());
    for (feature, usage) in subscription.usage().iter() {
        let limit = if usage.is_unlimited() {
            "unlimited".to_string()
        } else {
            usage.limit.to_string()
        };
        println!("  {feature:<16} {used}/{limit}", used = usage.used);
    }
}

pub(crate) fn access(app: &NumeroApp, feature: &str) {
    let required = required_tier(feature);
    match app.gate(feature, true) {
        GateDecision::Render => println!("{feature}: open (requires {required})"),
        GateDecision::Hidden | GateDecision::LockedPreview { .. } => {
            println!(
                "{feature}: locked, upgrade to {required} (current {})",
                app.subscription().tier()
            );
        }
    }
}

pub(crate) fn use_feature(app: &NumeroApp, feature: &str) -> Result<()> {
    let subscription = app.subscription();
    if !subscription.can_use_feature(feature) {
        bail!("{feature} is not available on the {} plan", subscription.tier());
    }

    let usage = subscription.increment_usage(feature);
    match usage.remaining() {
        Some(left) => println!("{feature}: {left} left"),
        None => println!("{feature}: unlimited"),
    }
    Ok(())
}

/// Arguments of `report name` / `report phone`
pub(crate) enum ReportArgs {
    Name {
        full_name: String,
        birth_date: Option<NaiveDate>,
        system: Option<String>,
    },
    Phone {
        number: String,
        country_code: Option<String>,
    },
}

pub(crate) async fn report(app: &NumeroApp, args: ReportArgs, wait: bool) -> Result<()> {
    let request = match args {
        ReportArgs::Name {
            full_name,
            birth_date,
            system,
        } => ReportRequest::Name(NameReportRequest {
            full_name,
            birth_date,
            system,
        }),
        ReportArgs::Phone {
            number,
            country_code,
        } => ReportRequest::Phone(PhoneReportRequest {
            phone_number: number,
            country_code,
        }),
    };

    let poller = app.job_poller(request.kind());
    let job_id = app.generate_report(&poller, request).await?;
    println!("job {job_id} submitted");
    if !wait {
        return Ok(());
    }

    let report = tokio::select! {
        report = poller.wait_resolved() => report,
        _ = tokio::signal::ctrl_c() => {
            poller.cancel();
            None
        }
    };

    match report {
        Some(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        None => match poller.state() {
            JobState::Idle => bail!("report polling stopped before a result arrived"),
            state => bail!("report not ready: {state:?}"),
        },
    }
}

pub(crate) async fn unread(app: &NumeroApp) -> Result<()> {
    let poller = app.unread_poller();
    let mut rx = poller.subscribe();
    rx.changed().await.context("unread poller ended")?;

    let state = *rx.borrow();
    if state.consecutive_failures > 0 {
        bail!("unread count unavailable");
    }
    println!("{} unread", state.count);
    Ok(())
}

pub(crate) async fn daily(app: &NumeroApp, date: Option<NaiveDate>) -> Result<()> {
    let reading = app
        .backends()
        .numerology
        .daily_reading(date)
        .await
        .map_err(|e| {
            app.notifier().error(&e.user_message());
            e
        })?;
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

pub(crate) fn locale(app: &NumeroApp, set: Option<&str>) {
    if let Some(tag) = set {
        app.preferences().set_locale(tag);
    }
    println!("{}", app.preferences().locale());
}

pub(crate) fn show_config(app: &NumeroApp) -> Result<()> {
    print!("{}", toml::to_string_pretty(app.config())?);
    Ok(())
}

/// Whether the error was already shown to the user as a toast
pub(crate) fn already_shown(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<AuthError>() {
        return matches!(e, AuthError::Api(_));
    }
    if let Some(e) = err.downcast_ref::<AppError>() {
        return matches!(
            e,
            AppError::UpgradeRequired { .. }
                | AppError::LimitReached { .. }
                | AppError::Job(JobError::Submit(_))
        );
    }
    err.downcast_ref::<numero_api::ApiError>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasted_errors_are_not_repeated() {
        let toasted = anyhow::Error::from(AuthError::Api(numero_api::ApiError::from_response(
            400, "",
        )));
        assert!(already_shown(&toasted));

        let inline = anyhow::Error::from(AuthError::NotAuthenticated);
        assert!(!already_shown(&inline));

        let locked = anyhow::Error::from(AppError::LimitReached {
            feature: "nameAnalyses".into(),
        });
        assert!(already_shown(&locked));
    }
}
