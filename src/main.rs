//! Command-line front end for the dispatcher.
//!
//! Sends one request through the configured transports and prints the
//! normalized response.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use fetch_dispatch::config::{load_config, DispatchConfig};
use fetch_dispatch::observability::{init_logging, init_metrics};
use fetch_dispatch::transport::{BlockingSessionFactory, ReqwestTransport};
use fetch_dispatch::{Dispatcher, Request};

#[derive(Parser)]
#[command(name = "fetch-dispatch")]
#[command(about = "Fetch a URL through the default or the alternate transport", long_about = None)]
struct Cli {
    /// Target URL
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Route through the alternate session transport
    #[arg(long)]
    alt: bool,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print response headers
    #[arg(short, long)]
    include: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatchConfig::default(),
    };

    init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut builder = Request::builder(&cli.method, &cli.url).alternate_transport(cli.alt);
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("malformed header {:?}, expected \"Name: value\"", raw))?;
        builder = builder.header(name.trim(), value.trim());
    }
    if let Some(data) = cli.data {
        builder = builder.body(data);
    }
    let request = builder.build()?;

    let default = Arc::new(ReqwestTransport::new(&config.default_transport)?);
    let factory = Arc::new(BlockingSessionFactory::new(config.session.clone()));
    let dispatcher = Dispatcher::new(default, factory, &config);

    dispatcher.start().await?;
    let result = dispatcher.dispatch(request).await;
    dispatcher.close().await;
    let response = result?;

    println!("{} {}", response.status(), response.url());
    if cli.include {
        for (name, value) in response.headers().iter() {
            println!("{}: {}", name, value);
        }
        println!();
    }
    match response.text() {
        Some(text) => println!("{}", text),
        None => println!("<{} bytes of binary data>", response.body().len()),
    }
    if !response.flags().is_empty() {
        eprintln!("flags: {}", response.flags().join(", "));
    }

    Ok(())
}
