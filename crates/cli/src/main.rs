//! Kiosk CLI - drive a shopper cart against the commerce API.
//!
//! # Usage
//!
//! ```bash
//! # Show the remote cart with resolved prices
//! kiosk cart show
//!
//! # Add two units; prompts before replacing another shop's cart
//! kiosk cart add p-123 --quantity 2
//!
//! # Apply a coupon
//! kiosk coupon apply SAVE10
//!
//! # Reconcile a payment redirect
//! kiosk payment reconcile --query "payment_intent=pi_123&redirect_status=succeeded"
//! ```
//!
//! # Commands
//!
//! - `cart` - Show, add, update, remove, clear
//! - `coupon apply` - Attach a coupon code
//! - `price` - Effective price of a product
//! - `payment reconcile` - Confirm a payment and clear the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use kiosk_storefront::ShopperSession;
use kiosk_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "kiosk")]
#[command(author, version, about = "Kiosk cart engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage coupons
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Show the effective price of a product
    Price {
        /// Product id
        product_id: String,
    },
    /// Payment redirect handling
    Payment {
        #[command(subcommand)]
        action: PaymentAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Owning shop (looked up in the catalog when omitted)
        #[arg(short, long)]
        shop: Option<String>,

        /// Replace a cart from another shop without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Set the quantity of a line
    Update {
        /// Product id
        product_id: String,

        /// New quantity
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product id
        product_id: String,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CouponAction {
    /// Apply a coupon code
    Apply {
        /// Coupon code
        code: String,
    },
}

#[derive(Subcommand)]
enum PaymentAction {
    /// Reconcile a provider redirect
    Reconcile {
        /// Redirect query string
        #[arg(short, long)]
        query: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
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
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kiosk_storefront=info,kiosk_cli=info".into());

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the subscriber
    let _sentry_guard = init_sentry(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        commands::print_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CommandError> {
    let session = ShopperSession::start(config)?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&session).await?,
            CartAction::Add {
                product_id,
                quantity,
                shop,
                yes,
            } => commands::cart::add(&session, &product_id, quantity, shop, yes).await?,
            CartAction::Update {
                product_id,
                quantity,
            } => commands::cart::update(&session, &product_id, quantity).await?,
            CartAction::Remove { product_id } => {
                commands::cart::remove(&session, &product_id).await?;
            }
            CartAction::Clear => commands::cart::clear(&session).await?,
        },
        Commands::Coupon { action } => match action {
            CouponAction::Apply { code } => commands::coupon::apply(&session, &code).await?,
        },
        Commands::Price { product_id } => commands::price::show(&session, &product_id).await?,
        Commands::Payment { action } => match action {
            PaymentAction::Reconcile { query } => {
                commands::payment::reconcile(&session, &query).await?;
            }
        },
    }
    Ok(())
}
