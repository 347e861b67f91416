//! `numero` - command-line client for the numerology backend

mod commands;
mod console;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::ReportArgs;
use console::{init_logging, ConsoleNotifier};
use numero_core::{Config, NumeroApp, RegistrationForm};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn cli() -> Command {
    let email = || Arg::new("email").long("email").required(true).help("Account email");

    Command::new("numero")
        .version(numero_core::VERSION)
        .about("Numerology client: sessions, subscription gating and reports")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .env("NUMERO_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .help("TOML config file"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .global(true)
                .help("Backend base URL (overrides config and environment)"),
        )
        .arg(
            Arg::new("state")
                .long("state")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("State file holding the session and counters"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Log level when RUST_LOG is unset"),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(email())
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("NUMERO_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account; a verification code is emailed")
                .arg(email())
                .arg(Arg::new("password").long("password").required(true))
                .arg(Arg::new("confirm").long("confirm").required(true))
                .arg(Arg::new("first-name").long("first-name").required(true))
                .arg(Arg::new("last-name").long("last-name")),
        )
        .subcommand(
            Command::new("verify-otp")
                .about("Confirm the emailed code and sign in")
                .arg(email())
                .arg(Arg::new("otp").long("otp").required(true)),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Email a password reset link")
                .arg(email()),
        )
        .subcommand(Command::new("logout").about("Sign out and clear the stored session"))
        .subcommand(Command::new("whoami").about("Show the signed-in user and tier"))
        .subcommand(
            Command::new("tier")
                .about("Show tier and usage, or override the tier locally")
                .arg(
                    Arg::new("set")
                        .long("set")
                        .value_parser(["free", "premium", "enterprise"]),
                ),
        )
        .subcommand(
            Command::new("access")
                .about("Check whether the current tier opens a feature")
                .arg(Arg::new("feature").required(true)),
        )
        .subcommand(
            Command::new("use")
                .about("Record one use of a metered feature")
                .arg(Arg::new("feature").required(true)),
        )
        .subcommand(
            Command::new("report")
                .about("Generate a report and wait for it")
                .subcommand_required(true)
                .arg(
                    Arg::new("no-wait")
                        .long("no-wait")
                        .global(true)
                        .action(ArgAction::SetTrue)
                        .help("Return after submitting"),
                )
                .subcommand(
                    Command::new("name")
                        .about("Name numerology")
                        .arg(Arg::new("full-name").required(true))
                        .arg(
                            Arg::new("birth-date")
                                .long("birth-date")
                                .value_parser(value_parser!(NaiveDate)),
                        )
                        .arg(
                            Arg::new("system")
                                .long("system")
                                .value_parser(["pythagorean", "chaldean"]),
                        ),
                )
                .subcommand(
                    Command::new("phone")
                        .about("Phone numerology")
                        .arg(Arg::new("number").required(true))
                        .arg(Arg::new("country-code").long("country-code")),
                ),
        )
        .subcommand(Command::new("unread").about("Fetch the unread notification count"))
        .subcommand(
            Command::new("daily")
                .about("Daily reading")
                .arg(
                    Arg::new("date")
                        .long("date")
                        .value_parser(value_parser!(NaiveDate)),
                ),
        )
        .subcommand(
            Command::new("locale")
                .about("Show or set the preferred locale")
                .arg(Arg::new("set").long("set")),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn string(args: &ArgMatches, id: &str) -> String {
    args.get_one::<String>(id).cloned().unwrap_or_default()
}

fn opt_string(args: &ArgMatches, id: &str) -> Option<String> {
    args.get_one::<String>(id).cloned()
}

fn default_state_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".numero")
        .join("state.json")
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = Config::load(path.map(PathBuf::as_path)).with_context(|| match path {
        Some(p) => format!("loading config {}", p.display()),
        None => "loading default config".to_string(),
    })?;

    if let Some(url) = matches.get_one::<String>("api-url") {
        config = config.with_api_url(url.clone());
    }
    if let Some(state) = matches.get_one::<PathBuf>("state") {
        config = config.with_storage_path(state.clone());
    }
    if config.storage_path.is_none() {
        config = config.with_storage_path(default_state_path());
    }
    Ok(config)
}

async fn run(matches: ArgMatches) -> Result<()> {
    let config = load_config(&matches)?;
    let app = NumeroApp::from_config(config, Arc::new(ConsoleNotifier))?;

    match matches.subcommand() {
        Some(("login", args)) => {
            commands::login(&app, &string(args, "email"), &string(args, "password")).await
        }
        Some(("register", args)) => {
            let form = RegistrationForm {
                email: string(args, "email"),
                password: string(args, "password"),
                confirm_password: string(args, "confirm"),
                first_name: string(args, "first-name"),
                last_name: opt_string(args, "last-name"),
            };
            commands::register(&app, form).await
        }
        Some(("verify-otp", args)) => {
            commands::verify_otp(&app, &string(args, "email"), &string(args, "otp")).await
        }
        Some(("reset-password", args)) => {
            commands::reset_password(&app, &string(args, "email")).await
        }
        Some(("logout", _)) => {
            commands::logout(&app).await;
            Ok(())
        }
        Some(("whoami", _)) => commands::whoami(&app).await,
        Some(("tier", args)) => {
            commands::tier(&app, args.get_one::<String>("set").map(String::as_str));
            Ok(())
        }
        Some(("access", args)) => {
            commands::access(&app, &string(args, "feature"));
            Ok(())
        }
        Some(("use", args)) => commands::use_feature(&app, &string(args, "feature")),
        Some(("report", args)) => {
            let wait = !args.get_flag("no-wait");
            let report_args = match args.subcommand() {
                Some(("name", sub)) => ReportArgs::Name {
                    full_name: string(sub, "full-name"),
                    birth_date: sub.get_one::<NaiveDate>("birth-date").copied(),
                    system: opt_string(sub, "system"),
                },
                Some(("phone", sub)) => ReportArgs::Phone {
                    number: string(sub, "number"),
                    country_code: opt_string(sub, "country-code"),
                },
                _ => anyhow::bail!("report kind must be `name` or `phone`"),
            };
            commands::report(&app, report_args, wait).await
        }
        Some(("unread", _)) => commands::unread(&app).await,
        Some(("daily", args)) => {
            commands::daily(&app, args.get_one::<NaiveDate>("date").copied()).await
        }
        Some(("locale", args)) => {
            commands::locale(&app, args.get_one::<String>("set").map(String::as_str));
            Ok(())
        }
        Some(("config", _)) => commands::show_config(&app),
        _ => unreachable!("subcommand_required"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(
        matches
            .get_one::<String>("log-level")
            .map_or("info", String::as_str),
        matches.get_flag("json-logs"),
    );

    match run(matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if commands::already_shown(&e) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
