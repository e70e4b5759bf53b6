//! Bazaar CLI - Command-line front end for the marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and check who you are
//! bazaar login alice
//! bazaar whoami
//!
//! # Browse and fill the cart
//! bazaar products list
//! bazaar cart add 12
//! bazaar cart total
//!
//! # Talk to another member
//! bazaar dm open bob
//! bazaar dm send 4 "Is this still available?" --file photo.jpg
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `whoami`, `logout` - Account session
//! - `products` - Browse listings and shops
//! - `cart` - Local cart
//! - `shop` - Seller shop and listing management
//! - `admin` - Categories, shop categories and discount codes
//! - `dm` - Direct messages

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_storefront::{AppContext, StorefrontConfig};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{admin, auth, cart, catalog, dm, seller};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login(auth::LoginArgs),
    /// Create an account
    Register(auth::RegisterArgs),
    /// Show the signed-in member, refreshed from the backend
    Whoami,
    /// Sign out
    Logout {
        /// Also remove the persisted store and any legacy keys
        #[arg(long)]
        wipe: bool,
    },
    /// Browse product listings and shops
    Products {
        #[command(subcommand)]
        action: catalog::ProductsAction,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: cart::CartAction,
    },
    /// Manage your shop and listings
    Shop {
        #[command(subcommand)]
        action: seller::ShopAction,
    },
    /// Administer categories and discount codes
    Admin {
        #[command(subcommand)]
        action: admin::AdminAction,
    },
    /// Direct messages
    Dm {
        #[command(subcommand)]
        action: dm::DmAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.expose_secret(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.sentry.environment.clone().into()),
            sample_rate: config.sentry.sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            commands::fail(&format!("Configuration error: {e}"));
            return std::process::ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_storefront=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            sentry_guard
                .is_some()
                .then(|| sentry_tracing::layer().event_filter(sentry_event_filter)),
        )
        .init();

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            commands::fail(&format!("Failed to start: {e}"));
            return std::process::ExitCode::FAILURE;
        }
    };

    match run(&ctx, cli.command).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            tracing::debug!(error = %e, "Command failed");
            commands::fail(&e.user_message());
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(ctx: &AppContext, command: Commands) -> bazaar_storefront::Result<()> {
    match command {
        Commands::Login(args) => auth::login(ctx, args).await,
        Commands::Register(args) => auth::register(ctx, args).await,
        Commands::Whoami => auth::whoami(ctx).await,
        Commands::Logout { wipe } => {
            auth::logout(ctx, wipe);
            Ok(())
        }
        Commands::Products { action } => catalog::run(ctx, action).await,
        Commands::Cart { action } => cart::run(ctx, action).await,
        Commands::Shop { action } => seller::run(ctx, action).await,
        Commands::Admin { action } => admin::run(ctx, action).await,
        Commands::Dm { action } => dm::run(ctx, action).await,
    }
}
