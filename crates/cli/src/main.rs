//! Crumb & Co CLI - migrations, catalog seeding and a terminal shopper.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! crumb migrate
//!
//! # Seed the catalog from YAML
//! crumb seed --file crates/cli/seed/catalog.yaml
//!
//! # Shop against a running storefront
//! crumb shop browse --category pastries
//! crumb shop add butter-croissant
//! crumb shop checkout --name "Nadia Rahman" --phone 01712345678 \
//!     --address "House 12, Road 5" --city 1 --zone 10 --area 100
//!
//! # Courier reference data
//! crumb courier cities
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use crumb_core::PaymentMethod;

mod commands;

use commands::shop::{self, BrowseArgs, CheckoutArgs, Lookup, ShopConfig};

#[derive(Parser)]
#[command(name = "crumb")]
#[command(author, version, about = "Crumb & Co CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed categories and products from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: PathBuf,
    },
    /// Browse, fill a cart and check out
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Courier locations, as served by the storefront
    Courier {
        #[command(subcommand)]
        lookup: CourierLookup,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// List products
    Browse {
        /// Category slug
        #[arg(long)]
        category: Option<String>,
        /// Price bands, e.g. `0-200,200-500`
        #[arg(long)]
        price: Option<String>,
        /// Search text
        #[arg(short, long)]
        search: Option<String>,
        /// Dietary tags, e.g. `vegan,gluten-free`
        #[arg(long)]
        dietary: Option<String>,
        /// featured, price-low, price-high, newest or bestselling
        #[arg(long)]
        sort: Option<String>,
        /// Pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Show the cart
    Cart,
    /// Add a product by slug
    Add {
        slug: String,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Remove a cart line
    Remove {
        /// Line number as shown by `cart`
        line: usize,
    },
    /// Change a cart line's quantity
    Set { line: usize, quantity: u32 },
    /// Empty the cart
    Clear,
    /// Quote delivery and place the order
    Checkout {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: String,
        /// Courier city id
        #[arg(long)]
        city: i64,
        /// Courier zone id
        #[arg(long)]
        zone: i64,
        /// Courier area id
        #[arg(long)]
        area: i64,
        /// Same-day delivery
        #[arg(long)]
        on_demand: bool,
        #[arg(long, value_enum, default_value_t = Payment::Cod)]
        payment: Payment,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show an order receipt
    Order { id: i64 },
}

#[derive(Subcommand)]
enum CourierLookup {
    /// List cities
    Cities,
    /// List zones of a city
    Zones { city: i64 },
    /// List areas of a zone
    Areas { zone: i64 },
}

#[derive(Clone, Copy, ValueEnum)]
enum Payment {
    Cod,
    Bkash,
    Card,
}

impl From<Payment> for PaymentMethod {
    fn from(payment: Payment) -> Self {
        match payment {
            Payment::Cod => Self::CashOnDelivery,
            Payment::Bkash => Self::Bkash,
            Payment::Card => Self::Card,
        }
    }
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crumb=info,crumb_client=warn".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Shop { action } => run_shop(&ShopConfig::from_env()?, action).await?,
        Commands::Courier { lookup } => {
            let lookup = match lookup {
                CourierLookup::Cities => Lookup::Cities,
                CourierLookup::Zones { city } => Lookup::Zones(city),
                CourierLookup::Areas { zone } => Lookup::Areas(zone),
            };
            shop::courier(&ShopConfig::from_env()?, lookup).await?;
        }
    }
    Ok(())
}

async fn run_shop(config: &ShopConfig, action: ShopAction) -> Result<(), shop::ShopError> {
    match action {
        ShopAction::Browse {
            category,
            price,
            search,
            dietary,
            sort,
            pages,
        } => {
            let args = BrowseArgs {
                category,
                price,
                search,
                dietary,
                sort,
                pages,
            };
            shop::browse(config, args).await
        }
        ShopAction::Cart => {
            shop::show_cart(config);
            Ok(())
        }
        ShopAction::Add { slug, size, color } => shop::add(config, &slug, size, color).await,
        ShopAction::Remove { line } => shop::remove(config, line),
        ShopAction::Set { line, quantity } => shop::set_quantity(config, line, quantity),
        ShopAction::Clear => shop::clear(config),
        ShopAction::Checkout {
            name,
            phone,
            email,
            address,
            city,
            zone,
            area,
            on_demand,
            payment,
            note,
        } => {
            let args = CheckoutArgs {
                name,
                phone,
                email,
                address,
                city,
                zone,
                area,
                on_demand,
                payment_method: payment.into(),
                note,
            };
            shop::checkout(config, args).await
        }
        ShopAction::Order { id } => shop::order(config, id).await,
    }
}
