//! Kaivac provisioning firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  ProvisioningManager   WifiLink      NvsAdapter   StatusLed  │
//! │  (ProvisioningPort)    (LinkPort)    (Config)     (OutputPin)│
//! │                                                              │
//! │  esp_event ─▶ event_bridge ─▶ EVENT_QUEUE                    │
//! │                                   │                          │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                   ▼                          │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        Dispatcher ─▶ Orchestrator (pure policy)        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Heartbeat thread (reads StatusBoard only)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{debug, error, info, warn};

use kaivac::adapters::device_id;
use kaivac::adapters::event_bridge;
use kaivac::adapters::nvs::NvsAdapter;
use kaivac::adapters::prov_mgr::ProvisioningManager;
use kaivac::adapters::wifi::WifiLink;
use kaivac::app::orchestrator::{Dispatcher, Orchestrator};
use kaivac::app::ports::ConfigPort;
use kaivac::app::status::StatusBoard;
use kaivac::config::ProvisioningConfig;
use kaivac::drivers::status_led::StatusLed;
use kaivac::events::EVENT_QUEUE;
use kaivac::heartbeat::Heartbeat;

fn load_config(nvs: &NvsAdapter) -> ProvisioningConfig {
    let config = match nvs.load() {
        Ok(c) => c,
        Err(e) => {
            warn!("Stored config unusable ({}), using defaults", e);
            return ProvisioningConfig::default();
        }
    };
    if let Err(e) = config.validate() {
        warn!("Stored config invalid ({}), using defaults", e);
        return ProvisioningConfig::default();
    }
    config
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Kaivac provisioning v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. NVS and configuration ──────────────────────────────
    let nvs = NvsAdapter::new().context("NVS init")?;
    let config = load_config(&nvs);
    if config.log_credentials {
        warn!("Credential logging enabled: Wi-Fi passwords will appear in the log");
    }

    // ── 3. Event loop, bridge and Wi-Fi driver ────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let wifi_nvs = EspDefaultNvsPartition::take()?;
    event_bridge::register().context("event handler registration")?;
    let wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(wifi_nvs))?;

    // ── 4. Orchestrator and provisioning launch ───────────────
    let mac = device_id::read_mac().map_err(kaivac::Error::from)?;
    let status = Arc::new(StatusBoard::new());
    let mut orchestrator = Orchestrator::new(
        config.clone(),
        &mac,
        ProvisioningManager::new(),
        WifiLink::new(wifi),
        status.clone(),
    )?;
    orchestrator.launch().context("provisioning launch")?;
    let dispatcher = Dispatcher::new(orchestrator);

    // ── 5. Heartbeat ──────────────────────────────────────────
    let led = match config.blink.map(|b| StatusLed::new(b.gpio)) {
        Some(Ok(led)) => Some(led),
        Some(Err(e)) => {
            warn!("Heartbeat LED unavailable ({}), blinking disabled", e);
            None
        }
        None => None,
    };
    let _heartbeat = Heartbeat::new(&config, led, status).spawn()?;

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let event = futures_lite::future::block_on(EVENT_QUEUE.next());
        match dispatcher.dispatch(event) {
            Ok(Some(cmd)) => debug!("Dispatched -> {}", cmd),
            Ok(None) => {}
            Err(e) if e.halts_provisioning() => {
                error!("{}", e);
                error!("Provisioning stopped; reboot or factory reset required");
            }
            Err(e) => error!("{}", e),
        }
    }
}
