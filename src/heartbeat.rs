//! Application heartbeat.
//!
//! An independent periodic task: prints a banner with a status snapshot
//! every heartbeat interval and, when an LED is configured, toggles it
//! every blink interval in between.  It only reads the [`StatusBoard`], so
//! it never waits on event handling and event handling never waits on it.
//!
//! ```text
//!   tick ─ tick ─ tick ─ tick ─ tick ─ tick ─ ...      (blink interval)
//!   ▲ banner                    ▲ banner               (every N ticks)
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use embedded_hal::digital::{OutputPin, PinState};
use log::{info, warn};

use crate::app::status::StatusBoard;
use crate::config::ProvisioningConfig;
use crate::drivers::task_pin::{self, Core};

const HEARTBEAT_PRIORITY: u8 = 2;
const HEARTBEAT_STACK_KB: usize = 4;

pub struct Heartbeat<P: OutputPin> {
    led: Option<P>,
    status: Arc<StatusBoard>,
    tick_interval: Duration,
    ticks_per_beat: u32,
    tick: u32,
    beats: u64,
    level: PinState,
}

impl<P: OutputPin> Heartbeat<P> {
    /// Without an LED or blink settings the task ticks once per heartbeat.
    pub fn new(config: &ProvisioningConfig, led: Option<P>, status: Arc<StatusBoard>) -> Self {
        let heartbeat_ms = config.heartbeat_interval_ms.max(1);
        let (tick_ms, ticks_per_beat, led) = match (config.blink, led) {
            (Some(blink), Some(led)) => {
                let toggle_ms = blink.toggle_interval_ms.clamp(1, heartbeat_ms);
                (toggle_ms, heartbeat_ms / toggle_ms, Some(led))
            }
            _ => (heartbeat_ms, 1, None),
        };

        Self {
            led,
            status,
            tick_interval: Duration::from_millis(u64::from(tick_ms)),
            ticks_per_beat: ticks_per_beat.max(1),
            tick: 0,
            beats: 0,
            level: PinState::Low,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn led(&self) -> Option<&P> {
        self.led.as_ref()
    }

    /// Advance one tick.  Returns `true` when a banner was printed.
    pub fn tick(&mut self) -> bool {
        let beat = self.tick == 0;
        if beat {
            self.beats += 1;
            let s = self.status.snapshot();
            info!("===== ===== ===== < App Heartbeat > ===== ===== =====");
            info!(
                "phase={} link_up={} failed_attempts={} accepted={} halted={}",
                s.phase.name(),
                s.link_up,
                s.failed_attempts,
                s.accepted,
                s.halted
            );
        }

        if let Some(led) = self.led.as_mut() {
            if let Err(e) = led.set_state(self.level) {
                warn!("Heartbeat: LED write failed: {:?}", e);
            }
            self.level = !self.level;
        }

        self.tick = (self.tick + 1) % self.ticks_per_beat;
        beat
    }

    /// Tick forever on the `async-io-mini` reactor.
    pub async fn run(mut self) {
        loop {
            self.tick();
            async_io_mini::Timer::after(self.tick_interval).await;
        }
    }
}

impl<P: OutputPin + Send + 'static> Heartbeat<P> {
    /// Run the heartbeat in its own thread on the application core.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        task_pin::spawn_on_core(
            Core::App,
            HEARTBEAT_PRIORITY,
            HEARTBEAT_STACK_KB,
            "heartbeat\0",
            move || {
                let executor: edge_executor::LocalExecutor<'_, 1> =
                    edge_executor::LocalExecutor::new();
                futures_lite::future::block_on(executor.run(self.run()));
            },
        )
    }
}
