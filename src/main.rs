// Session check entry point - restores (or signs in) and reports the
// resulting auth state and organizational scope

use ancr_portal::auth::{AuthContext, GuardDecision, ProfileResolver, RouteGuard, SessionStore};
use ancr_portal::config::Config;
use ancr_portal::infra::{
    CredentialVerifier, GoTrueClient, ObjectStore, PostgrestClient, RecordStore, StorageClient,
};
use ancr_portal::panel::PanelService;
use secrecy::SecretString;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("Starting ANCR portal session check");

    // 3. Build the Supabase-shaped collaborators
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(GoTrueClient::new(&config));
    let records: Arc<dyn RecordStore> = Arc::new(PostgrestClient::new(&config));
    let objects: Arc<dyn ObjectStore> = Arc::new(StorageClient::new(&config));

    // 4. Session store and profile resolver
    let sessions = Arc::new(SessionStore::new(config.session_file.clone()));
    let profiles = Arc::new(ProfileResolver::new(Arc::clone(&records), &config));

    // 5. Compose the context and restore silently
    let context = Arc::new(AuthContext::new(verifier, sessions, profiles));
    context.restore().await;

    // 6. Optional credential sign-in from the environment
    if let (Ok(email), Ok(password)) = (env::var("PORTAL_EMAIL"), env::var("PORTAL_PASSWORD")) {
        match context.sign_in(&email, &SecretString::new(password)).await {
            Ok(()) => info!(email = %email, "Signed in"),
            Err(e) => {
                error!(error = %e, "Sign-in failed");
                println!("{}", e.user_message());
            }
        }
    }

    // 7. Report what the guard and the scope filter would do
    let state = context.state();
    let guard = RouteGuard::new(config.login_path.clone());
    match guard.evaluate(&state) {
        GuardDecision::Pending => println!("session: still restoring"),
        GuardDecision::RedirectToLogin { login_path } => {
            println!("session: none (would redirect to {})", login_path)
        }
        GuardDecision::Allow => match state.profile {
            Some(ref profile) => println!(
                "session: {} ({})",
                profile.full_name.as_deref().unwrap_or("unnamed"),
                profile.role
            ),
            None => println!("session: valid, but no leader profile (role-gated features hidden)"),
        },
    }

    if state.is_authenticated() && state.profile.is_some() {
        let panel = PanelService::new(records, objects);
        match panel.selectable_churches(&state).await {
            Ok(churches) if churches.is_empty() => {
                println!("churches in scope: none");
            }
            Ok(churches) => {
                println!("churches in scope:");
                for church in churches {
                    println!("  {} {}", church.id, church.name);
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not load organizations");
                println!("{}", e.user_message());
            }
        }
    }

    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
