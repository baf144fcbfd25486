//! Terminal shopper built on `crumb-client`.
//!
//! # Usage
//!
//! ```bash
//! crumb shop browse --dietary vegan --sort price-low
//! crumb shop add butter-croissant
//! crumb shop cart
//! crumb shop checkout --name "Nadia Rahman" --phone 01712345678 \
//!     --address "House 12, Road 5" --city 1 --zone 10 --area 100
//! ```
//!
//! # Environment Variables
//!
//! - `CRUMB_API_URL` - storefront base URL (default `http://127.0.0.1:3000`)
//! - `CRUMB_CART_PATH` - cart file (default `.crumb/cart.json`)

#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use crumb_client::api::DEFAULT_TIMEOUT;
use crumb_client::{
    CartStore, CatalogBrowser, CheckoutDetails, CheckoutFlow, ClientError, DispatchStatus,
    FileStorage, ListingState, Outcome, Place, QuoteInput, StorefrontApi,
};
use crumb_core::{
    AddOptions, AreaId, CartKey, CityId, CustomerContact, DeliverySelection, DeliveryType, Email,
    EmailError, FilterError, Order, OrderId, PaymentMethod, Phone, PhoneError, ProductFilter,
    SortOrder, ZoneId,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_CART_PATH: &str = ".crumb/cart.json";

/// Errors surfaced by shopper commands.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Invalid CRUMB_API_URL: {0}")]
    ApiUrl(#[from] url::ParseError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Invalid phone: {0}")]
    Phone(#[from] PhoneError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid sort order: {0}")]
    Sort(String),

    #[error("No product with slug '{0}'")]
    UnknownProduct(String),

    #[error("Cart has no line {0}")]
    UnknownLine(usize),

    #[error("Cart is empty")]
    EmptyCart,
}

/// Where the shopper talks to and keeps its cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopConfig {
    pub api_url: Url,
    pub cart_path: PathBuf,
}

impl ShopConfig {
    /// Load from `CRUMB_API_URL` and `CRUMB_CART_PATH`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ApiUrl` if the URL does not parse.
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok();
        Self::from_values(
            std::env::var("CRUMB_API_URL").ok().as_deref(),
            std::env::var("CRUMB_CART_PATH").ok().as_deref(),
        )
    }

    fn from_values(api_url: Option<&str>, cart_path: Option<&str>) -> Result<Self, ShopError> {
        let mut api_url = Url::parse(api_url.unwrap_or(DEFAULT_API_URL))?;
        // Relative joins need a trailing slash.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            api_url,
            cart_path: PathBuf::from(cart_path.unwrap_or(DEFAULT_CART_PATH)),
        })
    }

    fn api(&self) -> Result<StorefrontApi, ShopError> {
        Ok(StorefrontApi::new(self.api_url.clone(), DEFAULT_TIMEOUT)?)
    }

    fn cart(&self) -> CartStore<FileStorage> {
        CartStore::open(FileStorage::new(&self.cart_path))
    }
}

/// Server-side filters and client-side sort for `browse`.
#[derive(Debug, Default)]
pub struct BrowseArgs {
    pub category: Option<String>,
    pub price: Option<String>,
    pub search: Option<String>,
    pub dietary: Option<String>,
    pub sort: Option<String>,
    pub pages: usize,
}

/// Checkout details collected from flags.
#[derive(Debug)]
pub struct CheckoutArgs {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub city: i64,
    pub zone: i64,
    pub area: i64,
    pub on_demand: bool,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

/// List products page by page.
///
/// # Errors
///
/// Returns `ShopError` for bad filters or a failed request.
pub async fn browse(config: &ShopConfig, args: BrowseArgs) -> Result<(), ShopError> {
    let api = config.api()?;
    let filter = ProductFilter::parse(
        args.category.as_deref(),
        args.price.as_deref(),
        args.search.as_deref(),
        args.dietary.as_deref(),
    )?;
    let sort = match args.sort.as_deref() {
        Some(sort) => sort.parse::<SortOrder>().map_err(ShopError::Sort)?,
        None => SortOrder::default(),
    };

    let mut browser = CatalogBrowser::new();
    browser.set_filter(filter);
    browser.set_sort(sort);

    for _ in 0..args.pages.max(1) {
        if !browser.has_more() {
            break;
        }
        browser.load_more(&api).await?;
    }

    match browser.listing() {
        ListingState::Ready(products) => {
            for product in &products {
                let mut badges = Vec::new();
                if product.featured {
                    badges.push("featured");
                }
                if product.is_bestseller {
                    badges.push("bestseller");
                }
                if product.is_new {
                    badges.push("new");
                }
                println!(
                    "{:<28} {:>10}  {}  {}",
                    product.slug,
                    money(product.price),
                    product.name,
                    badges.join(" ")
                );
            }
            if browser.has_more() {
                println!("... more available, use --pages to load further");
            }
        }
        ListingState::Empty => println!("No products match these filters."),
        ListingState::Loading => println!("Nothing loaded."),
        ListingState::Failed(error) => println!("Could not load products: {error}"),
    }
    Ok(())
}

/// Print the cart.
pub fn show_cart(config: &ShopConfig) {
    let store = config.cart();
    let cart = store.cart();
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for (index, item) in cart.items().iter().enumerate() {
        let variant: Vec<&str> = [item.size.as_deref(), item.color.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        println!(
            "{:>3}. {} {} x{} @ {} = {}",
            index + 1,
            item.name,
            if variant.is_empty() {
                String::new()
            } else {
                format!("({})", variant.join(", "))
            },
            item.quantity,
            money(item.price),
            money(item.line_total()),
        );
    }
    println!("Subtotal: {}", money(cart.subtotal()));
}

/// Add one unit of the product with `slug`.
///
/// # Errors
///
/// Returns `ShopError::UnknownProduct` if no product has that slug.
pub async fn add(
    config: &ShopConfig,
    slug: &str,
    size: Option<String>,
    color: Option<String>,
) -> Result<(), ShopError> {
    let api = config.api()?;
    let product = api
        .product(slug)
        .await?
        .ok_or_else(|| ShopError::UnknownProduct(slug.to_owned()))?;

    let mut store = config.cart();
    store.add_item(
        &product,
        AddOptions {
            price: None,
            size,
            color,
        },
    )?;
    println!(
        "Added {}. Subtotal: {}",
        product.name,
        money(store.cart().subtotal())
    );
    Ok(())
}

/// Remove a cart line by its 1-based position.
///
/// # Errors
///
/// Returns `ShopError::UnknownLine` if there is no such line.
pub fn remove(config: &ShopConfig, line: usize) -> Result<(), ShopError> {
    let mut store = config.cart();
    let key = line_key(&store, line)?;
    store.remove_item(&key)?;
    show_cart(config);
    Ok(())
}

/// Set the quantity of a cart line. Quantities below 1 are ignored.
///
/// # Errors
///
/// Returns `ShopError::UnknownLine` if there is no such line.
pub fn set_quantity(config: &ShopConfig, line: usize, quantity: u32) -> Result<(), ShopError> {
    let mut store = config.cart();
    let key = line_key(&store, line)?;
    if !store.update_quantity(&key, quantity)? {
        println!("Quantity unchanged.");
    }
    show_cart(config);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `ShopError` if the cart file cannot be written.
pub fn clear(config: &ShopConfig) -> Result<(), ShopError> {
    config.cart().clear()?;
    println!("Cart cleared.");
    Ok(())
}

fn line_key<S: crumb_client::CartStorage>(
    store: &CartStore<S>,
    line: usize,
) -> Result<CartKey, ShopError> {
    line.checked_sub(1)
        .and_then(|index| store.cart().items().get(index))
        .map(|item| CartKey {
            product_id: item.product_id,
            size: item.size.clone(),
            color: item.color.clone(),
        })
        .ok_or(ShopError::UnknownLine(line))
}

/// Quote delivery, then place the order.
///
/// # Errors
///
/// Returns `ShopError` for an empty cart, invalid contact details or a
/// rejected request.
pub async fn checkout(config: &ShopConfig, args: CheckoutArgs) -> Result<(), ShopError> {
    let api = config.api()?;
    let mut store = config.cart();
    if store.cart().is_empty() {
        return Err(ShopError::EmptyCart);
    }

    let contact = CustomerContact {
        name: args.name,
        phone: Phone::parse(&args.phone)?,
        email: args.email.as_deref().map(Email::parse).transpose()?,
    };
    let delivery = DeliverySelection {
        city_id: CityId::new(args.city),
        zone_id: ZoneId::new(args.zone),
        area_id: AreaId::new(args.area),
        delivery_type: if args.on_demand {
            DeliveryType::OnDemand
        } else {
            DeliveryType::Normal
        },
    };

    let flow = CheckoutFlow::new();
    flow.enter();

    let quote = QuoteInput {
        city_id: delivery.city_id,
        zone_id: delivery.zone_id,
        delivery_type: delivery.delivery_type,
        subtotal: store.cart().subtotal(),
        payment_method: args.payment_method,
    };
    if let Outcome::Applied(quote) = flow.request_quote(&api, &quote).await? {
        println!("Delivery: {}", money(quote.total_price));
        println!("Estimated total: {}", money(store.cart().subtotal() + quote.total_price));
    }

    let details = CheckoutDetails {
        contact,
        address: args.address,
        delivery,
        payment_method: args.payment_method,
        note: args.note,
    };
    match flow.submit(&api, &mut store, details).await? {
        Outcome::Applied(placed) => {
            print_order(&placed.order);
            match placed.dispatch {
                DispatchStatus::Skipped => {}
                DispatchStatus::Dispatched { consignment_id } => {
                    println!("Handed to courier: {consignment_id}");
                }
                DispatchStatus::Failed { error } => {
                    println!("Courier dispatch pending: {error}");
                }
            }
        }
        Outcome::Discarded => debug!("Checkout left before the order was confirmed"),
    }
    Ok(())
}

/// Show an order receipt.
///
/// # Errors
///
/// Returns `ShopError` if the order cannot be fetched.
pub async fn order(config: &ShopConfig, id: i64) -> Result<(), ShopError> {
    let order = config.api()?.order(OrderId::new(id)).await?;
    print_order(&order);
    Ok(())
}

fn print_order(order: &Order) {
    println!("Order #{} ({})", order.id, order.status.as_str());
    for item in &order.items {
        println!(
            "  {} x{} = {}",
            item.name,
            item.quantity,
            money(item.line_total())
        );
    }
    println!("  Subtotal: {}", money(order.subtotal));
    println!("  Delivery: {}", money(order.delivery_quote.total_price));
    println!("  Total:    {}", money(order.total));
    if let Some(shipment) = &order.shipment {
        println!(
            "  Courier:  {} ({})",
            shipment.consignment_id, shipment.status
        );
    }
}

// =============================================================================
// Courier reference data
// =============================================================================

/// Which level of the courier's location hierarchy to list.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    Cities,
    Zones(i64),
    Areas(i64),
}

/// List courier cities, zones or areas through the storefront.
///
/// # Errors
///
/// Returns `ShopError` if the request fails.
pub async fn courier(config: &ShopConfig, lookup: Lookup) -> Result<(), ShopError> {
    let api = config.api()?;
    match lookup {
        Lookup::Cities => print_places(&api.cities().await?),
        Lookup::Zones(city) => print_places(&api.zones(CityId::new(city)).await?),
        Lookup::Areas(zone) => print_places(&api.areas(ZoneId::new(zone)).await?),
    }
    Ok(())
}

fn print_places<Id: std::fmt::Display>(places: &[Place<Id>]) {
    for place in places {
        println!("{:>6}  {}", place.id, place.name);
    }
}

fn money(amount: Decimal) -> String {
    format!("৳{}", amount.round_dp(2))
}
