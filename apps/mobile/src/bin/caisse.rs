//! `caisse` drives the Caisse POS commands from a terminal.
//!
//! Every run logs in, performs one action, and logs out. Handy to check a
//! backend or ring up a test vente without the mobile shell.
//!
//! ```text
//! caisse --user awa theme
//! caisse --user awa --module pharmacie login --remember
//! caisse --user awa --module depot products biere
//! caisse --user awa sell biere:casier:2 savon --method cash --tendered 20000
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use caisse_core::{ModuleActif, Money, PaymentMethod};
use caisse_mobile::commands::{auth, cart, config, product, sale};
use caisse_mobile::{init_tracing, App};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "caisse", about = "Caisse POS command-line client", version)]
struct Cli {
    /// Path to the client config file.
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    #[arg(long, short = 'u', global = true, env = "CAISSE_USER")]
    user: Option<String>,

    #[arg(long, global = true, env = "CAISSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Module actif (pharmacie, restaurant, depot, boutique).
    #[arg(long, short = 'm', global = true)]
    module: Option<ModuleActif>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check credentials and show the session.
    Login {
        /// Save the client config, so this terminal keeps its device id and
        /// starts in the module actif.
        #[arg(long)]
        remember: bool,
    },

    /// Search the catalogue of the module actif.
    Products {
        /// Name, reference or barcode.
        query: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Look a barcode up.
    Scan { code: String },

    /// Ring up a vente.
    Sell {
        /// `PRODUCT[:CONDITIONNEMENT][:QTY]`, e.g. `biere:casier:2`.
        #[arg(required = true)]
        items: Vec<String>,
        #[arg(long, default_value = "cash")]
        method: PaymentMethod,
        /// Cash handed over, in the smallest currency unit.
        #[arg(long)]
        tendered: Option<i64>,
        /// Mobile money or card reference.
        #[arg(long)]
        reference: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        /// Discount in basis points (1000 = 10 %).
        #[arg(long)]
        discount: Option<u32>,
    },

    /// Latest ventes.
    Sales {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Totals of a day.
    Summary {
        /// YYYY-MM-DD, today by default.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Theme, vocabulary and packagings of a module.
    Theme,
}

/// Parses `PRODUCT[:CONDITIONNEMENT][:QTY]`.
fn parse_item(item: &str) -> Result<cart::AddToCartRequest> {
    let mut parts = item.split(':');
    let product_id = parts
        .next()
        .filter(|p| !p.is_empty())
        .with_context(|| format!("missing product in '{}'", item))?;

    let mut conditionnement_id = None;
    let mut quantity = None;
    for part in parts {
        match part.parse::<i64>() {
            Ok(qty) if quantity.is_none() => quantity = Some(qty),
            Ok(_) => bail!("several quantities in '{}'", item),
            Err(_) if conditionnement_id.is_none() && quantity.is_none() => {
                conditionnement_id = Some(part.to_string())
            }
            Err(_) => bail!("unexpected '{}' in '{}'", part, item),
        }
    }

    Ok(cart::AddToCartRequest {
        product_id: product_id.to_string(),
        conditionnement_id,
        quantity,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes the running client config to `path` (or the default location),
/// with `module` as the starting module.
fn remember(app: &App, module: ModuleActif, path: Option<PathBuf>) -> Result<()> {
    let mut config = app.api.client().config().clone();
    config.device.default_module = module;
    config
        .save(path)
        .context("could not save the client config")?;
    Ok(())
}

async fn open_session(app: &App, cli: &Cli) -> Result<auth::SessionInfo> {
    let user = cli
        .user
        .as_deref()
        .context("--user or CAISSE_USER is required")?;
    let password = cli
        .password
        .as_deref()
        .context("--password or CAISSE_PASSWORD is required")?;

    let mut info = auth::login(&app.api, &app.session, &app.config, user, password).await?;
    if let Some(module) = cli.module {
        info = auth::switch_module(&app.api, &app.session, &app.cart, &app.catalog, module)
            .await?;
    }
    Ok(info)
}

async fn run(app: &App, cli: &Cli) -> Result<()> {
    if let Commands::Theme = cli.command {
        let module = cli.module.unwrap_or(app.config.default_module);
        let theme = config::ThemeResponse::from(module);
        if cli.json {
            return print_json(&theme);
        }
        println!("{} {}", theme.theme.emoji, theme.theme.title);
        println!("{} / {}", theme.vocabulary.catalog_title, theme.vocabulary.cart_title);
        for option in &theme.conditionnements {
            println!("  {} {}", option.emoji, option.label);
        }
        return Ok(());
    }

    let session = open_session(app, cli).await?;

    match &cli.command {
        Commands::Login { remember: save } => {
            if *save {
                remember(app, session.module, cli.config.clone())?;
            }
            if cli.json {
                print_json(&session)?;
            } else {
                println!(
                    "{} connecté · {} {}",
                    session.display_name, session.theme.emoji, session.theme.title
                );
            }
        }
        Commands::Products { query, limit } => {
            let products = product::search_products(
                &app.api,
                &app.session,
                &app.catalog,
                &app.config,
                query.as_deref(),
                *limit,
            )
            .await?;
            if cli.json {
                print_json(&products)?;
            } else {
                println!("{}", session.vocabulary.count_products(products.len()));
                for p in &products {
                    println!("{}  {}", p.id, p.name);
                    for c in &p.conditionnements {
                        let stock = c.stock.map_or_else(|| "∞".to_string(), |s| s.to_string());
                        println!("    {} {:<12} {:>14}  stock {}", c.emoji, c.label, c.price_display, stock);
                    }
                }
            }
        }
        Commands::Scan { code } => {
            let scan = product::scan_barcode(
                &app.api,
                &app.session,
                &app.catalog,
                &app.cart,
                &app.config,
                code,
                false,
            )
            .await?;
            if cli.json {
                print_json(&scan)?;
            } else {
                println!("{} ({})", scan.product.name, scan.conditionnement_id);
            }
        }
        Commands::Sell {
            items,
            method,
            tendered,
            reference,
            customer,
            discount,
        } => {
            for item in items {
                let request = parse_item(item)?;
                cart::add_to_cart(
                    &app.api,
                    &app.session,
                    &app.catalog,
                    &app.cart,
                    &app.config,
                    request,
                )
                .await?;
            }
            if let Some(bps) = discount {
                cart::set_discount(&app.cart, &app.config, *bps)?;
            }

            let done = sale::checkout(
                &app.api,
                &app.session,
                &app.catalog,
                &app.cart,
                &app.pending,
                &app.config,
                sale::CheckoutRequest {
                    method: *method,
                    tendered: tendered.map(Money::from_minor),
                    reference: reference.clone(),
                    customer_name: customer.clone(),
                },
            )
            .await?;

            if done.queued {
                // Pending ventes live in memory only.
                warn!(vente_id = %done.vente.id, "Backend unreachable, vente not recorded");
                eprintln!("{}", serde_json::to_string(&done.vente)?);
            }
            if cli.json {
                print_json(&done)?;
            } else {
                print!("{}", done.receipt);
            }
        }
        Commands::Sales { limit } => {
            let recent = sale::recent_sales(&app.api, &app.pending, *limit).await?;
            if cli.json {
                print_json(&recent)?;
            } else {
                for v in &recent.recorded {
                    println!(
                        "{}  {:<10} {:>14}  {}",
                        v.receipt_number,
                        v.module,
                        app.config.format_money(v.total),
                        v.payment.method
                    );
                }
            }
        }
        Commands::Summary { date } => {
            let summary = sale::daily_summary(&app.api, &app.config, *date).await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "{}: {} vente(s), {}",
                    summary.summary.date, summary.summary.sale_count, summary.revenue_display
                );
                for line in &summary.by_method {
                    println!("  {:<14} {:>3}  {}", line.label, line.count, line.amount_display);
                }
            }
        }
        Commands::Theme => {}
    }

    auth::logout(&app.api, &app.session, &app.cart, &app.catalog).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let app = App::from_env(cli.config.clone()).context("invalid client configuration")?;
    run(&app, &cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_api::ClientConfig;

    #[test]
    fn test_parse_item() {
        let item = parse_item("biere:casier:2").unwrap();
        assert_eq!(item.product_id, "biere");
        assert_eq!(item.conditionnement_id.as_deref(), Some("casier"));
        assert_eq!(item.quantity, Some(2));

        let item = parse_item("savon").unwrap();
        assert!(item.conditionnement_id.is_none());
        assert!(item.quantity.is_none());

        let item = parse_item("savon:3").unwrap();
        assert_eq!(item.quantity, Some(3));
        assert!(item.conditionnement_id.is_none());

        assert!(parse_item(":casier").is_err());
        assert!(parse_item("biere:2:casier").is_err());
    }

    #[test]
    fn test_cli_parses_login_remember() {
        let cli = Cli::try_parse_from(["caisse", "-u", "awa", "login", "--remember"]).unwrap();
        assert!(matches!(cli.command, Commands::Login { remember: true }));

        let cli = Cli::try_parse_from(["caisse", "login"]).unwrap();
        assert!(matches!(cli.command, Commands::Login { remember: false }));
    }

    #[test]
    fn test_remember_keeps_device_id() {
        let dir = std::env::temp_dir().join(format!("caisse-cli-{}", std::process::id()));
        let path = dir.join("caisse.toml");
        let app = App::new(
            caisse_mobile::state::ConfigState::default(),
            ClientConfig::with_base_url("https://pos.example.com"),
        )
        .unwrap();

        remember(&app, ModuleActif::Depot, Some(path.clone())).unwrap();

        let saved = ClientConfig::load(Some(path)).unwrap();
        assert_eq!(saved.device_id(), app.api.device_id());
        assert_eq!(saved.device.default_module, ModuleActif::Depot);
        assert_eq!(saved.server.base_url, "https://pos.example.com");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cli_parses_sell() {
        let cli = Cli::try_parse_from([
            "caisse", "--user", "awa", "-m", "depot", "sell", "biere:casier:2", "--tendered", "20000",
        ])
        .unwrap();
        assert_eq!(cli.module, Some(ModuleActif::Depot));
        match cli.command {
            Commands::Sell { items, method, tendered, .. } => {
                assert_eq!(items, vec!["biere:casier:2"]);
                assert_eq!(method, PaymentMethod::Cash);
                assert_eq!(tendered, Some(20_000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
