//! Swap quote tool.
//!
//! Resolves the route between two tokens over markets described in a JSON
//! file, loads their order books once and prints the quote of the trade.

mod config;

use std::{fs, path::Path, process::exit, sync::Arc};

use clap::Parser;
use fastnum::UD64;
use swap_sdk::{
    Cluster,
    error::SwapError,
    pricing::is_unwrap_sollet,
    route::{RouteResolver, TokenRegistry},
    session::{Quote, SwapSession},
    testing::{DexFixture, MockDex},
    types::Route,
};
use tracing::error;

use config::{CliConfig, EnvConfig};

type Session = SwapSession<MockDex, MockDex, MockDex, MockDex>;

fn read(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path.display(), e);
            exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse environment configuration
    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    let request = match cli_config.to_quote_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            exit(1);
        }
    };

    let mut swap_config = match env_config.to_swap_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };
    if let Some(slippage) = request.slippage {
        swap_config.slippage = slippage;
    }
    if let Err(e) = swap_config.validate() {
        eprintln!("Invalid configuration: {}", e);
        exit(1);
    }

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cluster = Cluster::mainnet();
    if is_unwrap_sollet(&cluster, &request.from, &request.to) {
        println!("Sollet tokens can be unwrapped to native tokens through the bridge");
    }

    let fixture = match DexFixture::from_json(&read(&cli_config.markets)) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("Invalid market data: {}", e);
            exit(1);
        }
    };
    let tokens = match &cli_config.tokens {
        Some(path) => match TokenRegistry::from_json(&cluster, &read(path)) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("Invalid token list: {}", e);
                exit(1);
            }
        },
        None => TokenRegistry::from_tokens(&cluster, Vec::new()),
    };
    let tokens = Arc::new(tokens);

    let dex = match MockDex::from_fixture(&cluster, &fixture) {
        Ok(dex) => dex,
        Err(e) => {
            eprintln!("Invalid market data: {}", e);
            exit(1);
        }
    };

    let resolver = RouteResolver::new(cluster, tokens.clone(), dex.clone(), dex.clone());
    let session: Session = SwapSession::new(swap_config, resolver, dex.clone(), dex);
    if let Err(e) = session.set_fair_override(request.fair) {
        eprintln!("Invalid fair price: {}", e);
        exit(1);
    }
    session.set_from_amount(request.amount);

    let route = match session.set_pair(request.from, request.to).await {
        Ok(route) => route,
        Err(e) if e.is_soft() => {
            println!("Swap unavailable: {e}");
            return;
        }
        Err(e) => {
            error!(%e, "Failed to load the route");
            exit(1);
        }
    };

    print_route(&session, &tokens, route.as_ref());
    print_quote(&session.quote(), session.reverse_fair().ok());
    match session.swap_params() {
        Ok(params) => println!("Swap parameters: {params:?}"),
        Err(SwapError::Fatal(reason)) => println!("Swap not possible: {reason}"),
        Err(e) => println!("Swap unavailable: {e}"),
    }
}

fn print_route(session: &Session, tokens: &TokenRegistry, route: Option<&Route>) {
    let Some(route) = route else {
        println!("Route: wrap/unwrap of the native token");
        return;
    };
    println!("Route: {:?}", route.kind());
    for address in route.markets() {
        let name = session
            .cache()
            .market(address)
            .map(|m| tokens.market_name(&m))
            .unwrap_or_else(|| "-".to_string());
        let bbo = session.cache().bbo(address).unwrap_or_default();
        println!(
            "  {address} {name:<16} bid {:>12} ask {:>12}",
            bbo.best_bid.map(|p| p.to_string()).unwrap_or("-".to_string()),
            bbo.best_offer.map(|p| p.to_string()).unwrap_or("-".to_string()),
        );
    }
}

fn print_quote(quote: &Quote, reverse_fair: Option<UD64>) {
    let or_dash = |value: Option<String>| value.unwrap_or("-".to_string());
    println!("Fair price:          {}", or_dash(quote.fair.map(|f| f.to_string())));
    println!("Reverse fair price:  {}", or_dash(reverse_fair.map(|f| f.to_string())));
    println!("Sell:                {}", quote.from_amount);
    println!("Expected output:     {}", quote.to_amount);
    println!("Fee multiplier:      {}", quote.fee_multiplier);
    println!(
        "Price impact:        {}",
        or_dash(quote.price_impact.map(|i| format!("{i}%")))
    );
    println!(
        "Min exchange rate:   {}",
        or_dash(quote.min_exchange_rate.map(|r| r.to_string()))
    );
    if let Some(min) = quote.min_swap_amount {
        println!("Below minimum order size of {min:?}");
    }
}
