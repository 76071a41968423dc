#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use session_warden::{
    collaborators::{
        JsonLinesEventStore, LocalAuthProvider, LogNotifier, RestBackend,
        StaticProfileLookup,
    },
    ActivitySignal, Collaborators, RedirectRules, SessionLifecycleController, User,
    WardenSettings,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEMO_USER_ENV: &str = "WARDEN_USER";
const ACCESS_TOKEN_ENV: &str = "WARDEN_ACCESS_TOKEN";

/// Either auth provider the demo can drive
enum Provider {
    Local(Arc<LocalAuthProvider>),
    Rest(Arc<RestBackend>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = WardenSettings::load().context("Failed to load settings")?;

    let (provider, collaborators) = build_collaborators(&settings).await?;
    let redirects = RedirectRules::from_settings(&settings.redirects);

    print_startup_info(&settings);
    let controller = SessionLifecycleController::start(collaborators, redirects).await;
    let mut logouts = controller.subscribe_logouts();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            outcome = logouts.recv() => {
                if let Ok(outcome) = outcome {
                    println!("→ redirect to {}", outcome.redirect_path);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    // The outcome arrives on `logouts` like a forced one
                    "logout" => {
                        controller.logout().await;
                    }
                    "refresh" => {
                        if let Provider::Local(local) = &provider {
                            local.refresh_token();
                        }
                    }
                    "quit" | "exit" => break,
                    command => {
                        if let Some(user_id) = command.strip_prefix("login ") {
                            sign_in(&provider, user_id.trim()).await;
                        } else {
                            controller.activity_monitor().record(ActivitySignal::KeyPress);
                        }
                    }
                }
            }
        }
    }

    controller.dispose().await;
    Ok(())
}

async fn build_collaborators(settings: &WardenSettings) -> anyhow::Result<(Provider, Collaborators)> {
    let notifier = Arc::new(LogNotifier);

    if settings.backend.is_enabled() {
        let backend =
            Arc::new(RestBackend::new(&settings.backend).context("Failed to create backend client")?);
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            let user = backend
                .set_access_token(token)
                .await
                .context("Failed to resolve access token")?;
            println!("✓ Signed in as {} via backend", user.id);
        }
        let collaborators = Collaborators {
            auth: backend.clone(),
            settings: Arc::new(settings.clone()),
            persistence: backend.clone(),
            profiles: backend.clone(),
            notifier,
        };
        return Ok((Provider::Rest(backend), collaborators));
    }

    let user_id = std::env::var(DEMO_USER_ENV).unwrap_or_else(|_| "demo-user".to_string());
    let local = Arc::new(LocalAuthProvider::new(Some(User::new(user_id))));
    let collaborators = Collaborators {
        auth: local.clone(),
        settings: Arc::new(settings.clone()),
        persistence: Arc::new(JsonLinesEventStore::new(&settings.storage.events_path)),
        profiles: Arc::new(StaticProfileLookup::new(
            HashMap::new(),
            Some("member".to_string()),
        )),
        notifier,
    };
    Ok((Provider::Local(local), collaborators))
}

async fn sign_in(provider: &Provider, user_id: &str) {
    match provider {
        Provider::Local(local) => local.sign_in(User::new(user_id)),
        Provider::Rest(backend) => {
            if let Err(e) = backend.set_access_token(user_id).await {
                eprintln!("Sign-in failed: {e}");
            }
        }
    }
}

fn print_startup_info(settings: &WardenSettings) {
    let policy = settings.session.policy();
    println!("Starting session-warden {}", session_warden::VERSION);
    println!();
    println!("Session policy:");
    println!("  inactivity timeout: {}s", policy.inactivity_timeout_seconds);
    println!("  absolute timeout:   {}s", policy.absolute_timeout_seconds);
    println!(
        "  inactivity tracking: {}",
        if policy.inactivity_tracking_enabled { "on" } else { "off" }
    );
    println!("  absolute expiry:    {:?}", policy.absolute_expiry_action);
    println!();
    println!("Commands (one per line on stdin):");
    println!("  logout          - Sign out and print the redirect path");
    println!("  login <id>      - Sign in (a user id locally, an access token with a backend)");
    println!("  refresh         - Report a token refresh");
    println!("  quit            - Dispose the controller and exit");
    println!("  anything else   - Counts as user activity");
}
