// This is the entry point of the MetricMaster bot.
//
// **Architecture Overview:**
// - `core/` = Tool logic (GA4, GTM, setup, scheduled reports), platform-agnostic
// - `infra/` = Implementations of core traits (Google REST clients, OAuth, SQLite)
// - `bot/` = Host-facing adapters (config, tool registry, stdio bridge, manifest)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the scheduled report loop
// 4. Serve tool calls from the host
//
// Usage: `metricmaster [serve|manifest]` (default `serve`).

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "bot/bot_layer.rs"]
mod bot;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use crate::bot::install::{build_manifest, metricmaster_tools};
use crate::bot::{BotConfig, GoogleCredentials, StdioBridge, ToolRegistry};
use crate::core::analytics::{analytics_service, AnalyticsService, EnhancedAnalyticsService};
use crate::core::auth::{AuthCallback, AuthIdentity, ExternalAuth, GoogleSession};
use crate::core::reports::{ReportWindow, ScheduledReportService};
use crate::core::setup::BotSetup;
use crate::core::tag_manager::{tag_manager_service, TagManagerService};
use crate::core::tooling::ArgDefaults;
use crate::infra::analytics::Ga4ApiClient;
use crate::infra::google_auth::{
    GoogleOAuthClient, OAuthClientConfig, ServiceAccountAuth, TokenFileStore,
};
use crate::infra::reports::SqliteReportStore;
use crate::infra::tag_manager::GtmApiClient;

type SharedAuth = Arc<dyn ExternalAuth>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries bridge replies, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let command = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    match command.as_str() {
        "manifest" => {
            let manifest = build_manifest(&metricmaster_tools());
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            Ok(())
        }
        "serve" => serve().await,
        other => bail!("unknown command '{}', expected 'serve' or 'manifest'", other),
    }
}

/// Picks the credential source. Only the consent flow has a callback.
async fn google_auth(
    config: &BotConfig,
) -> anyhow::Result<(SharedAuth, Option<Arc<dyn AuthCallback>>)> {
    let all_scopes: Vec<&str> = analytics_service::REQUIRED_SCOPES
        .iter()
        .chain(tag_manager_service::REQUIRED_SCOPES.iter())
        .copied()
        .collect();

    match &config.credentials {
        GoogleCredentials::OAuth {
            client_id,
            client_secret,
            redirect_uri,
        } => {
            let store = TokenFileStore::open(config.data_dir.join("google_tokens.json")).await?;
            let client = Arc::new(GoogleOAuthClient::new(
                OAuthClientConfig {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    redirect_uri: redirect_uri.clone(),
                },
                store,
            )?);
            tracing::info!("Using Google OAuth consent flow");
            let auth: SharedAuth = client.clone();
            let callback: Arc<dyn AuthCallback> = client;
            Ok((auth, Some(callback)))
        }
        GoogleCredentials::ServiceAccountFile(path) => {
            let account = ServiceAccountAuth::from_file(path, &all_scopes).await?;
            tracing::info!(email = account.client_email(), "Using Google service account");
            Ok((Arc::new(account), None))
        }
        GoogleCredentials::ServiceAccountJson(json) => {
            let account = ServiceAccountAuth::from_json(json, &all_scopes)?;
            tracing::info!(email = account.client_email(), "Using Google service account");
            Ok((Arc::new(account), None))
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // Keep runtime files in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let setup = BotSetup::load(&config.persona_setup().await?);
    tracing::info!(
        ga_property = ?setup.ga_default_property,
        gtm_account = ?setup.gtm_default_account,
        gtm_container = ?setup.gtm_default_container,
        github_repo = ?setup.github_repo_url,
        "Loaded bot setup"
    );
    let identity = AuthIdentity::new(config.workspace_id.clone(), config.user_id.clone());
    let (auth, callback) = google_auth(&config).await?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let gtm_service = TagManagerService::new(
        GtmApiClient::new()?,
        GoogleSession::new(
            Arc::clone(&auth),
            identity.clone(),
            tag_manager_service::REQUIRED_SCOPES,
        ),
    )
    .with_defaults(
        ArgDefaults::default()
            .with("accountId", setup.gtm_default_account.clone())
            .with("containerId", setup.gtm_default_container.clone()),
    );

    let property_default =
        ArgDefaults::default().with("propertyId", setup.ga_default_property.clone());
    let analytics = Arc::new(
        AnalyticsService::new(
            Ga4ApiClient::new()?,
            GoogleSession::new(
                Arc::clone(&auth),
                identity.clone(),
                analytics_service::REQUIRED_SCOPES,
            ),
        )
        .with_defaults(property_default),
    );
    let enhanced_service = EnhancedAnalyticsService::new(Arc::clone(&analytics));

    let mut registry = ToolRegistry::new();
    registry.register(analytics);
    registry.register(Arc::new(enhanced_service));
    registry.register(Arc::new(gtm_service));

    // Scheduled reports get their own session.
    if setup.scheduled_reports.is_empty() {
        tracing::info!("No scheduled reports configured");
    } else {
        let report_source = AnalyticsService::new(
            Ga4ApiClient::new()?,
            GoogleSession::new(
                Arc::clone(&auth),
                identity.clone(),
                analytics_service::REQUIRED_SCOPES,
            ),
        );
        let report_store = SqliteReportStore::open(config.data_dir.join("reports.db"))
            .await
            .context("failed to open report database")?;
        let reports = ScheduledReportService::new(
            report_source,
            report_store,
            ReportWindow::new(config.report_timezone),
            setup.scheduled_reports.clone(),
        );
        let every = config.report_check_interval;
        tracing::info!(
            count = reports.reports().len(),
            timezone = %config.report_timezone,
            "Scheduled reports enabled"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                tracing::debug!("Checking scheduled reports...");
                let generated = reports.run_due(Utc::now()).await;
                if !generated.is_empty() {
                    tracing::info!("Generated {} scheduled reports", generated.len());
                }
            }
        });
    }

    StdioBridge::new(registry, callback).run().await
}
