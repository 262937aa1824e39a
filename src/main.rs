// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! me-card command line client
//!
//! Drives the session manager against Firestore and the Identity Toolkit,
//! or against in-memory stores when `MECARD_OFFLINE` is set.

use anyhow::{Context, Result};
use clap::Parser;
use mecard::{
    config::Config,
    db::{FirestoreDb, MemoryRemoteStore, RemoteStore},
    models::{AuthClaims, AuthState, CardRecord, ProviderKind, Session},
    services::{IdentityProvider, IdentityToolkitProvider, SessionManager, StaticIdentityProvider},
    storage::{FileStore, LocalStore},
    time_utils::{describe_age, format_utc_rfc3339},
};
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mecard")]
#[command(version)]
#[command(about = "Digital business cards: sign in, cache profile, sync cards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with a provider (github, google, twitter, facebook)
    SignIn { provider: ProviderKind },
    /// Clear the cached profile and end the session
    SignOut {
        /// Provider used to sign in first, so there is a session to end
        #[arg(long)]
        provider: Option<ProviderKind>,
    },
    /// Show session and login flag
    Status,
    /// Show the cached profile
    Profile,
    /// List cards stored remotely for the cached user
    Cards,
    /// List cards from the local snapshot
    CardsLocal,
    /// Save a card remotely (signs in first)
    SaveCard {
        #[arg(long)]
        provider: ProviderKind,
        /// Card name (document id)
        #[arg(long)]
        name: String,
        /// Extra fields as key=value
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Replace the local snapshot with the remote cards
    Pull,
    /// Upload the local snapshot (signs in first)
    Push {
        #[arg(long)]
        provider: ProviderKind,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let manager = build_manager(&config).await?;

    let mut faults = manager.faults();
    let outcome = run(&manager, cli.command).await;

    if let Some(rx) = faults.as_mut() {
        while let Ok(fault) = rx.try_recv() {
            eprintln!(
                "warning: {} failed for {}: {}",
                fault.operation, fault.target, fault.message
            );
        }
    }

    outcome
}

async fn build_manager(config: &Config) -> Result<SessionManager> {
    let local: Arc<dyn LocalStore> = Arc::new(FileStore::new(&config.store_path));

    let (identity, remote): (Arc<dyn IdentityProvider>, Arc<dyn RemoteStore>) = if config.offline
    {
        tracing::info!("Offline mode: in-memory remote store and static identity");
        let identity = StaticIdentityProvider::new(AuthState::new(
            "offline-user",
            AuthClaims {
                email: "offline@localhost".to_string(),
                display_name: "Offline User".to_string(),
                ..Default::default()
            },
        ));
        (Arc::new(identity), Arc::new(MemoryRemoteStore::new()))
    } else {
        let api_key = config
            .api_key
            .clone()
            .context("MECARD_API_KEY is required when online")?;
        let mut identity =
            IdentityToolkitProvider::new(api_key, config.provider_credentials.clone())?;
        if let Some(url) = &config.identity_base_url {
            identity = identity.with_base_url(url.clone());
        }
        let db = FirestoreDb::new(&config.gcp_project_id).await?;
        (Arc::new(identity), Arc::new(db))
    };

    Ok(SessionManager::builder(identity, local, remote)
        .sign_out_policy(config.sign_out_policy)
        .build())
}

async fn run(manager: &SessionManager, command: Commands) -> Result<()> {
    match command {
        Commands::SignIn { provider } => {
            let session = manager.sign_in(provider).await?;
            print_session(&session);
        }
        Commands::SignOut { provider } => {
            if let Some(provider) = provider {
                manager.sign_in(provider).await?;
            }
            manager.sign_out().await?;
            println!("Signed out");
        }
        Commands::Status => {
            print_session(&manager.session());
            println!("Has logged in: {}", manager.has_logged_in().await?);
        }
        Commands::Profile => {
            let profile = manager.profile_cache().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Cards => print_cards(&manager.get_cards().await?),
        Commands::CardsLocal => print_cards(&manager.load_local_cards().await?),
        Commands::SaveCard {
            provider,
            name,
            fields,
        } => {
            manager.sign_in(provider).await?;
            let mut card = CardRecord::new(name);
            for field in fields {
                let (key, value) = field
                    .split_once('=')
                    .with_context(|| format!("Field must be KEY=VALUE: {}", field))?;
                card = card.with_field(key, Value::String(value.to_string()));
            }
            let write = manager.save_card(&card)?;
            let path = write.path().to_string();
            write.wait().await?;
            println!("Saved {}", path);
        }
        Commands::Pull => {
            let cards = manager.pull_cards().await?;
            println!("Pulled {} card(s)", cards.len());
        }
        Commands::Push { provider } => {
            manager.sign_in(provider).await?;
            let pushed = manager.push_local_cards().await?;
            println!("Pushed {} card(s)", pushed);
        }
    }
    Ok(())
}

fn print_session(session: &Session) {
    match session.active() {
        Some(active) => println!(
            "Signed in as {} <{}> (id {}, since {}, {})",
            active.display_name(),
            active.email(),
            active.user_id(),
            format_utc_rfc3339(active.since),
            describe_age(active.since, chrono::Utc::now()),
        ),
        None => println!("Not signed in"),
    }
}

fn print_cards(cards: &[CardRecord]) {
    if cards.is_empty() {
        println!("No cards");
        return;
    }
    for card in cards {
        let extra: Vec<String> = card
            .fields
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}={}", key, s),
                other => format!("{}={}", key, other),
            })
            .collect();
        println!("{}\t{}", card.card_name, extra.join(", "));
    }
}

/// Initialize logging: JSON when `MECARD_LOG_FORMAT=json`, human-readable otherwise.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mecard=debug,info"));

    let json = std::env::var("MECARD_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
