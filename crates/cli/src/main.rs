//! Bakery CLI - drive the storefront client against a live API.
//!
//! # Usage
//!
//! ```bash
//! # Show (and create on first run) the anonymous session id
//! bakery session
//!
//! # Cart
//! bakery cart show
//! bakery cart add 12 -q 2 --notes "Sin nueces"
//! bakery cart add-custom --name "Torta personalizada" --price 25000
//! bakery cart update 31 4
//! bakery cart remove 31
//! bakery cart clear
//!
//! # Account
//! bakery auth register --email ana@example.cl --password secreto --name "Ana"
//! bakery auth login --email ana@example.cl --password secreto
//! bakery auth me
//! bakery auth logout
//!
//! # Orders and payments
//! bakery orders availability --from 2026-10-20 --to 2026-11-20
//! bakery orders create --name "Ana" --email ana@example.cl --phone "+56912345678"
//! bakery orders pay ORD-20261019-0001
//!
//! # Catalog
//! bakery products list --search torta --sort-by price
//! bakery products show selva-negra
//! bakery products categories
//! ```
//!
//! # Environment Variables
//!
//! See `bakery_storefront::config`. `BAKERY_API_URL` is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bakery_core::{CartLineId, DeliveryType, Email, Phone, ProductId};
use bakery_storefront::Environment;
use bakery_storefront::config::StorefrontConfig;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "bakery")]
#[command(author, version, about = "Bakery storefront client")]
struct Cli {
    /// Run without identity side effects (no session id, no hydration)
    #[arg(long, global = true)]
    headless: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the anonymous cart session id
    Session,
    /// Sign in, register and manage the account
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place and track orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the current cart
    Show,
    /// Add a catalog product
    Add {
        /// Product ID
        product: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Instructions for the bakery
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Add a custom item with no catalog entry
    AddCustom {
        /// Display name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,

        /// Instructions for the bakery
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Set the quantity of a line (0 or less removes it)
    Update {
        /// Cart line ID
        line: CartLineId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        line: CartLineId,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Sign in and store the tokens
    Login {
        #[arg(long)]
        email: Email,

        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: Email,

        #[arg(long)]
        password: String,

        /// Full name
        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: Option<Phone>,
    },
    /// Show the signed-in customer
    Me,
    /// Forget the stored tokens
    Logout,
    /// Change the password
    ChangePassword {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,
    },
    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: Email,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Show booked vs. available capacity per day
    Availability {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },
    /// Place an order from the current cart
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: Email,

        #[arg(long)]
        phone: Phone,

        /// `delivery` or `pickup`
        #[arg(long, default_value = "pickup")]
        delivery_type: DeliveryType,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// Delivery day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        time_slot: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Show an order
    Show {
        /// Order number
        number: String,
    },
    /// List the signed-in customer's orders
    List,
    /// Start payment for an order
    Pay {
        /// Order number
        number: String,
    },
    /// Show the payment status of an order
    PaymentStatus {
        /// Order number
        number: String,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Category slug
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,

        /// Only featured products
        #[arg(long)]
        featured: bool,

        #[arg(long, value_enum)]
        sort_by: Option<SortField>,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// List featured products
    Featured {
        #[arg(short, long, default_value_t = 8)]
        limit: u32,
    },
    /// Show a product
    Show {
        /// Product slug
        slug: String,
    },
    /// List categories
    Categories,
    /// List home page covers
    Covers,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortField {
    Position,
    Price,
    Name,
    Newest,
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

    Some(guard)
}

/// Map tracing levels to Sentry: errors become events, the rest breadcrumbs.
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

    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bakery_storefront=info,bakery_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config = if cli.headless {
        config.with_environment(Environment::Headless)
    } else {
        config
    };
    let storefront = bakery_storefront::Storefront::connect(config).await?;

    match cli.command {
        Commands::Session => commands::session::show(&storefront),
        Commands::Auth { action } => match action {
            AuthAction::Login { email, password } => {
                commands::auth::login(&storefront, email, password).await?;
            }
            AuthAction::Register {
                email,
                password,
                name,
                phone,
            } => commands::auth::register(&storefront, email, password, name, phone).await?,
            AuthAction::Me => commands::auth::me(&storefront).await?,
            AuthAction::Logout => commands::auth::logout(&storefront)?,
            AuthAction::ChangePassword { current, new } => {
                commands::auth::change_password(&storefront, current, new).await?;
            }
            AuthAction::ForgotPassword { email } => {
                commands::auth::forgot_password(&storefront, &email).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add {
                product,
                quantity,
                notes,
            } => commands::cart::add(&storefront, product, quantity, notes).await?,
            CartAction::AddCustom {
                name,
                price,
                quantity,
                image_url,
                notes,
            } => {
                let item = commands::cart::custom_item(name, price, quantity, image_url, notes);
                commands::cart::add_custom(&storefront, item).await?;
            }
            CartAction::Update { line, quantity } => {
                commands::cart::update(&storefront, line, quantity).await?;
            }
            CartAction::Remove { line } => commands::cart::remove(&storefront, line).await?,
            CartAction::Clear => commands::cart::clear(&storefront).await,
        },
        Commands::Orders { action } => match action {
            OrdersAction::Availability { from, to } => {
                commands::orders::availability(&storefront, from, to).await?;
            }
            OrdersAction::Create {
                name,
                email,
                phone,
                delivery_type,
                address,
                city,
                date,
                time_slot,
                notes,
            } => {
                let request = bakery_storefront::models::CreateOrderRequest {
                    customer_name: name,
                    customer_email: email,
                    customer_phone: phone,
                    delivery_type,
                    delivery_address: address,
                    delivery_city: city,
                    delivery_date: date,
                    delivery_time_slot: time_slot,
                    notes,
                };
                commands::orders::create(&storefront, &request).await?;
            }
            OrdersAction::Show { number } => commands::orders::show(&storefront, &number).await?,
            OrdersAction::List => commands::orders::list(&storefront).await?,
            OrdersAction::Pay { number } => commands::orders::pay(&storefront, &number).await?,
            OrdersAction::PaymentStatus { number } => {
                commands::orders::payment_status(&storefront, &number).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List {
                page,
                page_size,
                category,
                search,
                featured,
                sort_by,
                desc,
            } => {
                let query = commands::products::query(
                    page,
                    page_size,
                    category,
                    search,
                    featured,
                    sort_by.map(SortField::into_sort_by),
                    desc,
                );
                commands::products::list(&storefront, &query).await?;
            }
            ProductsAction::Featured { limit } => {
                commands::products::featured(&storefront, limit).await?;
            }
            ProductsAction::Show { slug } => commands::products::show(&storefront, &slug).await?,
            ProductsAction::Categories => commands::products::categories(&storefront).await?,
            ProductsAction::Covers => commands::products::covers(&storefront).await?,
        },
    }
    Ok(())
}

impl SortField {
    const fn into_sort_by(self) -> bakery_storefront::models::SortBy {
        use bakery_storefront::models::SortBy;
        match self {
            Self::Position => SortBy::SortOrder,
            Self::Price => SortBy::Price,
            Self::Name => SortBy::Name,
            Self::Newest => SortBy::CreatedAt,
        }
    }
}
