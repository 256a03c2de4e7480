//! OUI-backed [`VendorRepository`].
//!
//! The table is loaded once at startup. A refreshed copy is downloaded into a
//! cache file first when enabled; if that fails the embedded table is used, and
//! without any table every lookup reports the unknown-vendor sentinel.

use std::path::{Path, PathBuf};

use anyhow::{Context, ensure};
use mac_oui::Oui;
use pnet::util::MacAddr;
use reqwest::Client;
use tracing::debug;

use whodis_common::config::VendorConfig;
use whodis_common::vendors::VendorRepository;
use whodis_common::{info, warn};

/// What happened to the vendor table before it was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRefresh {
    Refreshed { path: PathBuf },
    Skipped,
    Failed { reason: String },
}

pub struct OuiVendorRepo {
    db: Option<Oui>,
}

impl VendorRepository for OuiVendorRepo {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let db = self.db.as_ref()?;
        let mac_str = mac.to_string();
        match db.lookup_by_mac(&mac_str) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

impl OuiVendorRepo {
    /// Refreshes the cached table if configured to, then loads the best table available.
    pub async fn initialize(cfg: &VendorConfig) -> (Self, TableRefresh) {
        let refresh = refresh_table(cfg).await;
        let cache_path = cfg.cache_path.clone();

        let repo = tokio::task::spawn_blocking(move || Self::load(cache_path.as_deref()))
            .await
            .unwrap_or_else(|e| {
                warn!("Vendor table loader failed: {e}");
                Self::unavailable()
            });
        (repo, refresh)
    }

    /// Cached table if it parses, else the embedded one.
    pub fn load(cache_path: Option<&Path>) -> Self {
        if let Some(path) = cache_path.filter(|path| path.is_file()) {
            match load_csv(path) {
                Ok(db) => return Self { db: Some(db) },
                Err(e) => warn!("Ignoring cached vendor table {}: {e:#}", path.display()),
            }
        }
        Self::embedded()
    }

    pub fn embedded() -> Self {
        match Oui::default() {
            Ok(db) => Self { db: Some(db) },
            Err(e) => {
                warn!("Vendor table unavailable, every vendor will be unknown: {e}");
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { db: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.db.is_some()
    }
}

async fn refresh_table(cfg: &VendorConfig) -> TableRefresh {
    let path = match (&cfg.cache_path, cfg.refresh) {
        (Some(path), true) => path,
        _ => return TableRefresh::Skipped,
    };

    match download_table(cfg, path).await {
        Ok(()) => {
            info!("Vendor table refreshed from {}", cfg.source_url);
            TableRefresh::Refreshed { path: path.clone() }
        }
        Err(e) => {
            debug!("vendor table refresh failed: {e:#}");
            TableRefresh::Failed {
                reason: format!("{e:#}"),
            }
        }
    }
}

async fn download_table(cfg: &VendorConfig, path: &Path) -> anyhow::Result<()> {
    let client = Client::builder()
        .timeout(cfg.refresh_timeout)
        .build()
        .context("building HTTP client")?;
    let body = client
        .get(&cfg.source_url)
        .send()
        .await
        .with_context(|| format!("requesting {}", cfg.source_url))?
        .error_for_status()
        .with_context(|| format!("requesting {}", cfg.source_url))?
        .bytes()
        .await
        .context("reading vendor table body")?;
    ensure!(!body.is_empty(), "empty vendor table from {}", cfg.source_url);

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    // Readers never see a half-written table.
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, &body)
        .await
        .with_context(|| format!("writing {}", partial.display()))?;
    if let Err(e) = validate_table(&partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.context(format!("rejecting download from {}", cfg.source_url)));
    }
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// A captive portal or truncated body must not replace a working table.
async fn validate_table(path: &Path) -> anyhow::Result<()> {
    let path = path.to_path_buf();
    let records = tokio::task::spawn_blocking(move || load_csv(&path).map(|db| db.get_total_records()))
        .await
        .context("vendor table parser failed")??;
    ensure!(records > 0, "vendor table has no records");
    Ok(())
}

fn load_csv(path: &Path) -> anyhow::Result<Oui> {
    Oui::from_csv_file(path).map_err(|e| anyhow::anyhow!("{e}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
