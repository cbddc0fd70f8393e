//! Probe binary - checks the root redirect and locale pages of a running deployment
//!
//! Usage:
//!   cargo run --bin probe                                   # Probe http://127.0.0.1:4321
//!   cargo run --bin probe -- --base-url https://docs.su8.codes
//!   cargo run --bin probe -- --page /zh/tools/models/ --page /en/codex/install/
//!   cargo run --bin probe -- --page '/zh/faq/,+常见问题,!starlight-theme-select'
//!
//! A --page value is a path followed by optional comma-separated markers:
//! `+TEXT` must appear in the body, `!TEXT` must not.
//!   cargo run --bin probe -- --no-wait                      # Skip the readiness poll
//!
//! Optional environment variables:
//! - PROBE_BASE_URL (overridden by --base-url)
//! - LOCALE_COOKIE_NAME, DEFAULT_LOCALE, SUPPORTED_LOCALES (must match the server)

use anyhow::{bail, Context, Result};
use docs_locale_gate::config::LocaleConfig;
use docs_locale_gate::probe::{default_pages, default_scenarios, PageCheck, Prober};
use docs_locale_gate::retry::RetryConfig;
use tracing::info;

struct ProbeArgs {
    base_url: String,
    extra_pages: Vec<PageCheck>,
    wait: bool,
}

impl ProbeArgs {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Self {
            base_url: std::env::var("PROBE_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:4321".to_string()),
            extra_pages: Vec::new(),
            wait: true,
        };

        let mut args = args.skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--base-url" => {
                    parsed.base_url = args.next().context("--base-url needs a value")?;
                }
                "--page" => {
                    let value = args.next().context("--page needs a value")?;
                    parsed.extra_pages.push(value.parse()?);
                }
                "--no-wait" => parsed.wait = false,
                other => bail!("Unknown argument: {}", other),
            }
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docs_locale_gate=info".parse()?),
        )
        .init();

    let args = ProbeArgs::parse(std::env::args())?;
    let locale = LocaleConfig::from_env()?;

    let scenarios = default_scenarios(&locale);
    let mut pages = default_pages(&locale);
    pages.extend(args.extra_pages);

    let prober = Prober::new(&args.base_url, locale)?;

    if args.wait {
        let ready_path = pages.first().map(|page| page.path.as_str()).unwrap_or("/");
        prober
            .wait_until_ready(ready_path, &RetryConfig::server_ready())
            .await
            .context("Server did not become ready")?;
    }

    info!("Probing {}", args.base_url);
    let report = prober.run(&scenarios, &pages).await;

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!("- {}", failure);
        }
        bail!(
            "Probe failed: {} passed, {} failed",
            report.passed,
            report.failures.len()
        );
    }

    info!("Probe passed ({} checks)", report.passed);
    Ok(())
}
