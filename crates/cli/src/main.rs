//! Loomline CLI - command-line client for the garment marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Log in (token and cart persist under the state directory)
//! loom auth login -u millco -p secret
//!
//! # Browse the catalog
//! loom catalog materials --search denim
//! loom catalog design paisley-block-print
//!
//! # Build a cart and check out
//! loom cart add raw-denim --kind material --quantity 4
//! loom cart show
//! loom orders checkout --shipping "12 Mill Road"
//! ```
//!
//! # Commands
//!
//! - `auth` - Log in, register, log out, show the current account
//! - `catalog` - Browse material and design listings
//! - `cart` - Manage the persistent shopping cart
//! - `orders` - Check out and review past orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use loomline_core::ItemKind;

mod commands;

#[derive(Parser)]
#[command(name = "loom")]
#[command(author, version, about = "Loomline marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the authenticated session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse material and design listings
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Check out and review orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Log in with username and password
    Login {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create a new account
    Register {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Account role (`buyer`, `seller`, `designer`, `manufacturer`)
        #[arg(short = 't', long, default_value = "buyer")]
        user_type: String,

        /// Company or studio name
        #[arg(short, long)]
        company: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the current account
    Whoami,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List material listings
    Materials {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Result page
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show one material by slug
    Material { slug: String },
    /// List design listings
    Designs {
        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Result page
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show one design by slug
    Design { slug: String },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart lines and subtotal
    Show,
    /// Add a listing to the cart by slug
    Add {
        /// Listing slug
        slug: String,

        /// Listing kind (`material` or `design`)
        #[arg(short, long)]
        kind: ItemKind,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (floors at 1; use `remove` to delete)
    Update {
        /// Line's listing ID
        id: String,

        /// Listing kind (`material` or `design`)
        #[arg(short, long)]
        kind: ItemKind,

        /// New quantity
        #[arg(short, long)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Line's listing ID
        id: String,

        /// Listing kind (`material` or `design`)
        #[arg(short, long)]
        kind: ItemKind,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order from the current cart
    Checkout {
        /// Shipping address
        #[arg(short, long)]
        shipping: Option<String>,

        /// Billing address
        #[arg(short, long)]
        billing: Option<String>,
    },
    /// List your orders
    List,
    /// Show one order by ID
    Show { id: String },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Auth { action } => match action {
            AuthAction::Login { username, password } => {
                commands::auth::login(&username, &password).await?;
            }
            AuthAction::Register {
                username,
                email,
                password,
                user_type,
                company,
            } => {
                commands::auth::register(&username, &email, &password, &user_type, company)
                    .await?;
            }
            AuthAction::Logout => commands::auth::logout().await?,
            AuthAction::Whoami => commands::auth::whoami().await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Materials { search, page } => {
                commands::catalog::materials(search.as_deref(), page).await?;
            }
            CatalogAction::Material { slug } => commands::catalog::material(&slug).await?,
            CatalogAction::Designs { search, page } => {
                commands::catalog::designs(search.as_deref(), page).await?;
            }
            CatalogAction::Design { slug } => commands::catalog::design(&slug).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show().await?,
            CartAction::Add {
                slug,
                kind,
                quantity,
            } => commands::cart::add(&slug, kind, quantity).await?,
            CartAction::Update { id, kind, quantity } => {
                commands::cart::update(&id, kind, quantity).await?;
            }
            CartAction::Remove { id, kind } => commands::cart::remove(&id, kind).await?,
            CartAction::Clear => commands::cart::clear().await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::Checkout { shipping, billing } => {
                commands::orders::checkout(shipping, billing).await?;
            }
            OrderAction::List => commands::orders::list().await?,
            OrderAction::Show { id } => commands::orders::show(&id).await?,
        },
    }
    Ok(())
}
