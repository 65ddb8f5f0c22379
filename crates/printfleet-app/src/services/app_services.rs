// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: loads configuration, opens storage, and builds the
// fleet service the daemon runs against.
//
// Configuration lives in `config.json` inside the data directory and is
// written with defaults on first start so operators have a file to edit.
// A few settings can be overridden from the environment without touching it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use printfleet_core::FleetConfig;
use printfleet_core::error::Result;
use printfleet_device::{DeviceConnector, HttpConnector};
use printfleet_fleet::FleetService;
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `status_interval_secs`.
pub const STATUS_INTERVAL_ENV: &str = "PRINTFLEET_STATUS_INTERVAL";

/// Shared handles for the daemon. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    fleet: Arc<FleetService>,
    config: Arc<FleetConfig>,
    data_dir: PathBuf,
}

impl AppServices {
    /// Initialise against the real data directory and real controllers.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        let lookup = |key: &str| std::env::var(key).ok();
        let config = load_or_create_config(&dir, lookup)?;
        let connector = Arc::new(HttpConnector::new(config.timeouts.clone()));
        Self::open(dir, config, connector)
    }

    pub(crate) fn open(
        dir: PathBuf,
        config: FleetConfig,
        connector: Arc<dyn DeviceConnector>,
    ) -> Result<Self> {
        let store_dir = config.data_dir.clone().unwrap_or_else(|| dir.clone());
        info!(path = %store_dir.display(), "initialising app services");

        let fleet = FleetService::open(&config, &store_dir, connector)?;
        info!("app services initialised");

        Ok(Self {
            fleet: Arc::new(fleet),
            config: Arc::new(config),
            data_dir: dir,
        })
    }

    pub fn fleet(&self) -> &Arc<FleetService> {
        &self.fleet
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Read `config.json`, writing defaults first if it does not exist, then
/// apply environment overrides.
pub(crate) fn load_or_create_config(
    dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<FleetConfig> {
    std::fs::create_dir_all(dir)?;
    let mut config = match load_config(dir) {
        Some(config) => config,
        None => {
            let config = FleetConfig::default();
            if !dir.join(CONFIG_FILE).exists() {
                persist_config(dir, &config)?;
                info!(path = %dir.join(CONFIG_FILE).display(), "wrote default config");
            }
            config
        }
    };
    apply_overrides(&mut config, lookup);
    Ok(config)
}

fn load_config(dir: &Path) -> Option<FleetConfig> {
    let path = dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            None
        }
    }
}

fn persist_config(dir: &Path, config: &FleetConfig) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

fn apply_overrides(config: &mut FleetConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(STATUS_INTERVAL_ENV) {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => config.status_interval_secs = secs,
            _ => warn!(value = %raw, "ignoring invalid {STATUS_INTERVAL_ENV}"),
        }
    }
}
