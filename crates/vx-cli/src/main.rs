//! `vx` - storefront tooling

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vx_commerce::StorefrontConfig;

mod commands;
mod demo;

fn cli() -> Command {
    Command::new("vx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Venkat Express storefront tooling")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Storefront config (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("coupon")
                .about("Validate a coupon code against an order total")
                .arg(Arg::new("code").long("code").required(true).help("Coupon code"))
                .arg(
                    Arg::new("total")
                        .long("total")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Order total in rupees"),
                )
                .arg(
                    Arg::new("coupons")
                        .long("coupons")
                        .required(true)
                        .help("Coupons as a JSON array, or a path to a JSON file"),
                )
                .arg(
                    Arg::new("now")
                        .long("now")
                        .help("Evaluate at this RFC 3339 time instead of now"),
                ),
        )
        .subcommand(
            Command::new("upi")
                .about("Build UPI payment links")
                .arg(Arg::new("vpa").long("vpa").required(true).help("Payee address, handle@psp"))
                .arg(Arg::new("name").long("name").required(true).help("Payee name"))
                .arg(
                    Arg::new("amount")
                        .long("amount")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("Amount in rupees"),
                )
                .arg(Arg::new("order").long("order").required(true).help("Order id"))
                .arg(Arg::new("currency").long("currency").help("Currency code")),
        )
        .subcommand(
            Command::new("media")
                .about("Classify media URLs")
                .arg(Arg::new("urls").required(true).num_args(1..).help("URLs to check")),
        )
        .subcommand(
            Command::new("demo")
                .about("Run an in-process store and print live binding transitions")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .default_value("rice")
                        .help("Search text to feed the suggestions box"),
                ),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<StorefrontConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => StorefrontConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(StorefrontConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    let ok = match matches.subcommand() {
        Some(("coupon", args)) => commands::coupon(args)?,
        Some(("upi", args)) => commands::upi(args, &config.payment)?,
        Some(("media", args)) => commands::media(args),
        Some(("demo", args)) => {
            let query = args.get_one::<String>("query").map_or("rice", String::as_str);
            demo::run(&config, query).await?;
            true
        }
        _ => anyhow::bail!("unknown subcommand"),
    };

    std::process::exit(if ok { 0 } else { 1 });
}
