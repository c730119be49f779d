//! In-process store walk-through
//!
//! Seeds a memory store, opens the catalog, settings and search bindings,
//! then performs a few writes and prints every state each binding reaches.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use vx_binding::{Binder, BindingState, SuggestionState};
use vx_commerce::{
    CatalogFilter, NewProduct, ProductCatalog, SearchSuggestions, SettingsPatch, SettingsStore,
    StorefrontConfig,
};
use vx_gateway::{MemoryAuth, MemoryGateway, Principal};

const SETTLE: Duration = Duration::from_millis(50);

fn catalog_line(state: &BindingState<Vec<vx_commerce::Product>>) -> String {
    match state.data() {
        Some(products) => {
            let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
            format!("{} [{}]", state.label(), names.join(", "))
        }
        None => state.label().to_string(),
    }
}

fn suggestion_line(state: &SuggestionState<vx_commerce::Product>) -> String {
    match state {
        SuggestionState::Matches(products) => {
            let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
            format!("matches [{}]", names.join(", "))
        }
        SuggestionState::Failed(err) => format!("failed: {err}"),
        other => format!("{other:?}").to_lowercase(),
    }
}

/// Print every change of a watch channel until it closes or the task is aborted
fn follow<T, F>(label: &'static str, mut rx: watch::Receiver<T>, render: F) -> tokio::task::JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> String + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let line = render(&*rx.borrow_and_update());
            println!("{label:<10} {line}");
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
}

pub(crate) async fn run(config: &StorefrontConfig, query: &str) -> Result<()> {
    let gateway = Arc::new(MemoryGateway::new());
    let auth = Arc::new(MemoryAuth::new());
    let binder = Binder::new(gateway.clone()).with_auth(auth.clone());

    let catalog = ProductCatalog::open(&binder, &CatalogFilter::storefront());
    let settings = SettingsStore::open(&binder, &config.settings)?;
    let search = SearchSuggestions::new(&binder, &config.search);

    let watchers = [
        follow("catalog", catalog.binding().watch(), catalog_line),
        follow("settings", settings.binding().watch(), |s| s.label().to_string()),
        follow("search", search.watch(), suggestion_line),
    ];
    tokio::time::sleep(SETTLE).await;

    for product in [
        NewProduct::new("Basmati Rice 5kg", 650.0, "grocery").with_stock(20),
        NewProduct::new("Rice Flour 1kg", 80.0, "grocery").with_stock(15),
        NewProduct::new("Green Tea", 240.0, "beverages").with_stock(8),
    ] {
        catalog.add(product).await.context("seeding catalog")?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    tracing::info!("Signing in as demo admin");
    auth.sign_in(Principal::new("demo-admin"));
    settings
        .binding()
        .wait_until(|s| !s.is_loading() && !s.is_unauthenticated())
        .await;
    settings
        .update(SettingsPatch {
            tagline: Some("Fresh from Nellore".into()),
            ..SettingsPatch::default()
        })
        .await
        .context("updating settings")?;

    search.set_query(query);
    let quiet = Duration::from_millis(config.search.debounce_ms);
    tokio::time::sleep(quiet + SETTLE).await;

    auth.sign_out();
    tokio::time::sleep(SETTLE).await;

    let stats = gateway.stats();
    println!(
        "\n{} channels opened, {} still open, {} writes",
        stats.subscriptions_opened, stats.open_channels, stats.writes
    );

    catalog.close();
    settings.close();
    search.clear();
    for watcher in watchers {
        watcher.abort();
    }
    Ok(())
}
