//! One-shot subcommands

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use serde_json::Value;
use vx_commerce::{
    build_payment_links, classify_url, validate_coupon, Coupon, MediaKind, PaymentConfig,
    PaymentIntent,
};

fn arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String> {
    args.get_one::<String>(name)
        .ok_or_else(|| anyhow!("missing --{name}"))
}

fn number(args: &ArgMatches, name: &str) -> Result<f64> {
    args.get_one::<f64>(name)
        .copied()
        .ok_or_else(|| anyhow!("missing --{name}"))
}

/// Parse coupons from inline JSON or a file
///
/// Entries may omit `id` and `createdAt`; the position and the epoch stand in.
pub(crate) fn parse_coupons(source: &str) -> Result<Vec<Coupon>> {
    let text = if source.trim_start().starts_with('[') {
        source.to_string()
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    let entries: Vec<Value> = serde_json::from_str(&text).context("coupons must be a JSON array")?;
    entries
        .into_iter()
        .enumerate()
        .map(|(index, mut entry)| {
            let object = entry
                .as_object_mut()
                .ok_or_else(|| anyhow!("coupon #{index} is not an object"))?;
            object
                .entry("id")
                .or_insert_with(|| Value::String(index.to_string()));
            object.entry("createdAt").or_insert(Value::from(0));
            serde_json::from_value(entry).with_context(|| format!("coupon #{index} is malformed"))
        })
        .collect()
}

pub(crate) fn coupon(args: &ArgMatches) -> Result<bool> {
    let code = arg(args, "code")?;
    let total = number(args, "total")?;
    let coupons = parse_coupons(arg(args, "coupons")?)?;
    let now = match args.get_one::<String>("now") {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid --now {text}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    tracing::debug!("Validating {} against {} coupons", code, coupons.len());
    let result = validate_coupon(&coupons, code, total, now);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.valid)
}

pub(crate) fn upi(args: &ArgMatches, payment: &PaymentConfig) -> Result<bool> {
    let currency = args
        .get_one::<String>("currency")
        .map_or(payment.currency.as_str(), String::as_str);
    let intent = PaymentIntent::new(
        arg(args, "vpa")?.as_str(),
        arg(args, "name")?.as_str(),
        number(args, "amount")?,
        arg(args, "order")?.as_str(),
    )
    .with_currency(currency);

    let links = build_payment_links(&intent, &payment.providers)?;
    if links.is_empty() {
        bail!("no payment providers configured");
    }
    for link in links {
        println!("{:<11} {}", link.provider.label(), link.uri);
    }
    Ok(true)
}

/// Human label for a classification
pub(crate) fn describe(url: &str) -> &'static str {
    match classify_url(url) {
        Some(MediaKind::Image) => "image",
        Some(MediaKind::Video) => "video",
        None => "unrecognized",
    }
}

pub(crate) fn media(args: &ArgMatches) -> bool {
    let mut all_known = true;
    for url in args.get_many::<String>("urls").into_iter().flatten() {
        let kind = describe(url);
        all_known &= kind != "unrecognized";
        println!("{kind:<12} {url}");
    }
    all_known
}
