//! Tokio driver for the engine.
//!
//! The engine lives inside a single task that selects over incoming readings
//! and timer fires; timers are spawned tasks that sleep and then send the
//! device handle back, so a fire is always a fresh event on the same loop.

use log::{debug, info};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use crate::device::DeviceId;
use crate::engine::{Engine, TimerService};
use crate::error::ScheduleError;
use crate::models::RawReading;
use crate::publish::StatusSink;

/// Timer service backed by tokio tasks
pub struct TokioTimers {
    tx: mpsc::UnboundedSender<DeviceId>,
}

/// Create the timer service and the receiving end of its fires
pub fn timer_channel() -> (TokioTimers, mpsc::UnboundedReceiver<DeviceId>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TokioTimers { tx }, rx)
}

impl TimerService for TokioTimers {
    fn schedule(&mut self, device: DeviceId, delay: Duration) -> Result<(), ScheduleError> {
        if self.tx.is_closed() {
            return Err(ScheduleError::ChannelClosed);
        }
        if delay.is_zero() {
            return self
                .tx
                .send(device)
                .map_err(|_| ScheduleError::ChannelClosed);
        }

        let handle = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        let tx = self.tx.clone();
        handle.spawn(async move {
            sleep(delay).await;
            // Receiver gone means the service is shutting down
            let _ = tx.send(device);
        });
        Ok(())
    }
}

/// Drive `engine` until the reading source closes and every device is resting
///
/// When the source closes, devices left resting with unpublished data are
/// armed once more; one that still cannot be armed is given up on.
/// Returns the engine so callers can inspect or reuse its final state.
pub async fn run<S>(
    mut engine: Engine<S, TokioTimers>,
    mut readings: mpsc::Receiver<RawReading>,
    mut fired: mpsc::UnboundedReceiver<DeviceId>,
) -> Engine<S, TokioTimers>
where
    S: StatusSink,
{
    let mut readings_open = true;

    loop {
        if !readings_open && engine.is_quiescent() {
            break;
        }

        tokio::select! {
            reading = readings.recv(), if readings_open => match reading {
                Some(reading) => {
                    engine.reading_observed(&reading, Instant::now());
                }
                None => {
                    info!("Reading source closed, flushing pending updates");
                    readings_open = false;
                    let armed = engine.rearm_pending();
                    if armed > 0 {
                        debug!("Re-armed {} devices with unpublished data", armed);
                    }
                }
            },
            Some(device) = fired.recv() => {
                let outcome = engine.timer_fired(device, Instant::now());
                debug!("Timer for {}: {:?}", device, outcome);
            }
            else => break,
        }
    }

    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::publish::JsonLineSink;

    fn reading(cnt: u8, temp_cc: i16) -> RawReading {
        RawReading {
            mac: "A4:C1:38:11:22:33".parse().unwrap(),
            temp_cc: Some(temp_cc),
            cnt,
            ..Default::default()
        }
    }

    fn status_lines(sink: JsonLineSink<Vec<u8>>) -> Vec<serde_json::Value> {
        String::from_utf8(sink.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .filter(|v| v.get("status").is_some())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesces_and_flushes_on_close() {
        let config = BridgeConfig {
            min_period: Duration::from_secs(30),
            ..Default::default()
        };
        let (timers, fired) = timer_channel();
        let engine = Engine::new(config, JsonLineSink::new(Vec::new()), timers, Instant::now());
        let (tx, rx) = mpsc::channel(16);
        let started = Instant::now();

        let driver = tokio::spawn(run(engine, rx, fired));

        tx.send(reading(1, 2000)).await.unwrap();
        sleep(Duration::from_secs(1)).await;
        for (cnt, temp) in [(2, 2010), (3, 2020), (4, 2030)] {
            tx.send(reading(cnt, temp)).await.unwrap();
            sleep(Duration::from_secs(2)).await;
        }
        drop(tx);

        let engine = driver.await.unwrap();
        assert!(engine.is_quiescent());
        assert!(started.elapsed() >= Duration::from_secs(60));

        let lines = status_lines(engine.into_sink());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["object"], "atc_112233");
        assert_eq!(lines[0]["status"]["temperature"], 20.0);
        assert_eq!(lines[1]["status"]["temperature"], 20.3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_without_devices_returns_immediately() {
        let (timers, fired) = timer_channel();
        let engine = Engine::new(
            BridgeConfig::default(),
            JsonLineSink::new(Vec::new()),
            timers,
            Instant::now(),
        );
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let engine = run(engine, rx, fired).await;
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_schedule_fails_once_receiver_is_gone() {
        let (mut timers, fired) = timer_channel();
        drop(fired);
        assert_eq!(
            timers.schedule(DeviceId::from_index(0), Duration::ZERO),
            Err(ScheduleError::ChannelClosed)
        );
    }

    #[test]
    fn test_delayed_schedule_needs_runtime() {
        let (mut timers, _fired) = timer_channel();
        assert_eq!(
            timers.schedule(DeviceId::from_index(0), Duration::from_secs(1)),
            Err(ScheduleError::NoRuntime)
        );
        assert!(timers
            .schedule(DeviceId::from_index(0), Duration::ZERO)
            .is_ok());
    }
}
