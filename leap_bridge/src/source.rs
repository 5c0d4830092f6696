//! Tracking event sources and the event loop.
//!
//! Sources run on their own thread and push `Event`s into a crossbeam channel.
//! The event loop multiplexes that channel with the shutdown signal and hands
//! each event to the active bridge.
use std::f64::consts::PI;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select};
use leap_common::tracking::{Event, Hand, HandType, Palm, TrackingFrame, Vector};
use leap_common::{BridgeError, Listener, Result};
use log::{debug, error, info, warn};
use rand::Rng;

/// Spawn a thread that parses one JSON event per line from `reader`.
///
/// Blank lines are skipped and malformed lines are logged and dropped. The
/// thread ends at EOF or when the receiving side goes away.
pub fn spawn_line_source<R>(reader: R, tx: Sender<Event>) -> JoinHandle<Result<()>>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Event::from_json(trimmed) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Skipping line {}: {}", index + 1, e),
            }
        }
        info!("Event source reached end of input");
        Ok(())
    })
}

/// Spawn a thread producing random hand poses at `rate_hz`.
///
/// The right hand's openness follows a bounded random walk and its palm sways
/// sideways; now and then an open left hand appears.
pub fn spawn_synthetic_source(rate_hz: f64, tx: Sender<Event>) -> Result<JoinHandle<Result<()>>> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(BridgeError::InvalidArgument(format!(
            "synthetic rate must be positive, got {}",
            rate_hz
        )));
    }
    let interval = Duration::from_secs_f64(1.0 / rate_hz);

    Ok(thread::spawn(move || {
        let mut rng = rand::rng();
        let mut openness: f64 = 60.0;
        let mut phase: f64 = 0.0;

        if tx.send(Event::Connection).is_err() {
            return Ok(());
        }
        for frame_id in 0u64.. {
            openness = (openness + rng.random_range(-4.0..4.0)).clamp(15.0, 95.0);
            phase += 2.0 * PI / (rate_hz * 4.0);

            let mut hands = vec![synthetic_hand(
                HandType::Right,
                openness,
                phase.sin() * 0.9,
            )];
            if rng.random_bool(0.02) {
                hands.push(synthetic_hand(HandType::Left, 85.0, 0.0));
            }

            let event = Event::Tracking(TrackingFrame { frame_id, hands });
            if tx.send(event).is_err() {
                debug!("Synthetic source stopping");
                break;
            }
            thread::sleep(interval);
        }
        Ok(())
    }))
}

fn synthetic_hand(hand_type: HandType, openness: f64, normal_x: f64) -> Hand {
    let palm = Palm {
        position: Vector::new(0.0, 200.0, 0.0),
        normal: Vector::new(normal_x, -(1.0 - normal_x * normal_x).max(0.0).sqrt(), 0.0),
        direction: Vector::new(0.0, 0.0, -1.0),
    };
    Hand::with_tip_distances(hand_type, palm, &[openness; 5])
}

/// Feed events to `listener` until the source ends or shutdown is signalled.
///
/// Errors from individual events are logged and do not stop the loop.
/// `on_shutdown` runs exactly once on the way out.
pub fn run_event_loop<L>(listener: &mut L, events: Receiver<Event>, shutdown: Receiver<()>) -> Result<()>
where
    L: Listener + ?Sized,
{
    loop {
        select! {
            recv(shutdown) -> _ => {
                info!("Shutdown requested");
                break;
            },
            recv(events) -> msg => match msg {
                Ok(event) => {
                    if let Err(e) = listener.on_event(&event) {
                        error!("Bridge failed to handle event: {}", e);
                    }
                },
                Err(_) => {
                    info!("Event source closed");
                    break;
                },
            }
        }
    }
    listener.on_shutdown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        shutdowns: usize,
    }

    impl Listener for Recorder {
        fn on_event(&mut self, event: &Event) -> Result<()> {
            self.events.push(event.clone());
            match event {
                Event::DeviceError { message } => Err(BridgeError::Format(message.clone())),
                Event::Tracking(_) | Event::Connection | Event::ConnectionLost => Ok(()),
            }
        }

        fn on_shutdown(&mut self) -> Result<()> {
            self.shutdowns += 1;
            Ok(())
        }
    }

    #[test]
    fn line_source_skips_blank_and_bad_lines() {
        let input = "{\"type\":\"connection\"}\n\nnot json\n{\"type\":\"connection_lost\"}\n";
        let (tx, rx) = unbounded();
        spawn_line_source(Cursor::new(input), tx)
            .join()
            .unwrap()
            .unwrap();
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(events, vec![Event::Connection, Event::ConnectionLost]);
    }

    #[test]
    fn loop_survives_listener_errors_and_shuts_down_once() {
        let (tx, rx) = unbounded();
        let (_shutdown_tx, shutdown_rx) = unbounded();
        tx.send(Event::DeviceError {
            message: "glitch".to_string(),
        })
        .unwrap();
        tx.send(Event::Connection).unwrap();
        drop(tx);

        let mut recorder = Recorder::default();
        run_event_loop(&mut recorder, rx, shutdown_rx).unwrap();
        assert_eq!(recorder.events.len(), 2);
        assert_eq!(recorder.shutdowns, 1);
    }

    #[test]
    fn loop_stops_on_shutdown_signal() {
        let (_tx, rx) = unbounded::<Event>();
        let (shutdown_tx, shutdown_rx) = unbounded();
        shutdown_tx.send(()).unwrap();

        let mut recorder = Recorder::default();
        run_event_loop(&mut recorder, rx, shutdown_rx).unwrap();
        assert!(recorder.events.is_empty());
        assert_eq!(recorder.shutdowns, 1);
    }

    #[test]
    fn synthetic_hands_have_five_tips() {
        let hand = synthetic_hand(HandType::Right, 80.0, 0.3);
        let distances = hand.tip_distances();
        assert_eq!(distances.len(), 5);
        assert!(distances.iter().all(|d| (d - 80.0).abs() < 1e-9));
    }

    #[test]
    fn synthetic_source_rejects_bad_rate() {
        let (tx, _rx) = unbounded();
        assert!(spawn_synthetic_source(0.0, tx).is_err());
    }
}
