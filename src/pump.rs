use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use lap_core::{Clock, CollaboratorError, TickSubscription};

use crate::{AppOp, Message};

enum PumpCtl {
    Start { id: u64, interval: Duration },
    Stop { id: u64 },
    Quit,
}

/// Tick source backed by a pump thread posting `AppOp::Pump` to the main loop.
///
/// Each tick carries its subscription id so the main loop can drop ticks
/// that were already queued when the subscription was cancelled.
pub struct PumpClock {
    ctl: Sender<PumpCtl>,
    next_id: u64,
}

/// Owner-side handle used to stop the pump thread at exit.
pub struct PumpHandle {
    ctl: Sender<PumpCtl>,
    thread: JoinHandle<()>,
}

impl PumpClock {
    pub fn spawn(main: Sender<Message>) -> (Self, PumpHandle) {
        let (ctl, rx) = mpsc::channel();
        let thread = std::thread::spawn(move || pump_thread(rx, main));
        (
            Self {
                ctl: ctl.clone(),
                next_id: 0,
            },
            PumpHandle { ctl, thread },
        )
    }
}

impl Clock for PumpClock {
    fn subscribe(&mut self, interval: Duration) -> Result<TickSubscription, CollaboratorError> {
        self.next_id += 1;
        let id = self.next_id;
        self.ctl
            .send(PumpCtl::Start { id, interval })
            .map_err(|_| CollaboratorError::Clock("pump thread has exited".into()))?;
        Ok(TickSubscription(id))
    }

    fn cancel(&mut self, subscription: TickSubscription) -> Result<(), CollaboratorError> {
        self.ctl
            .send(PumpCtl::Stop { id: subscription.0 })
            .map_err(|_| CollaboratorError::Clock("pump thread has exited".into()))
    }
}

impl PumpHandle {
    pub fn shutdown(self) {
        self.ctl.send(PumpCtl::Quit).ok();
        if self.thread.join().is_err() {
            log::error!("pump thread panicked");
        }
    }
}

fn pump_thread(ctl: Receiver<PumpCtl>, main: Sender<Message>) {
    let mut active: Option<(u64, Duration)> = None;

    loop {
        // Block when stopped; wait at most one interval when running.
        let received = match active {
            Some((id, interval)) => match ctl.recv_timeout(interval) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => {
                    let tick = Message::new_scalar(AppOp::Pump, id as usize, 0, 0, 0);
                    if main.send(tick).is_err() {
                        break;
                    }
                    None
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match ctl.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match received {
            Some(PumpCtl::Start { id, interval }) => {
                active = Some((id, interval));
            }
            Some(PumpCtl::Stop { id }) => {
                if matches!(active, Some((current, _)) if current == id) {
                    active = None;
                }
            }
            Some(PumpCtl::Quit) => break,
            None => {}
        }
    }
    log::debug!("pump thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_pump_ticks_with_subscription_id_until_cancelled() {
        let (tx, rx) = mpsc::channel();
        let (mut clock, handle) = PumpClock::spawn(tx);

        let sub = clock.subscribe(Duration::from_millis(5)).unwrap();
        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(AppOp::from_usize(msg.id), Some(AppOp::Pump)));
        assert_eq!(msg.args[0] as u64, sub.0);

        clock.cancel(sub).unwrap();
        // Drain anything queued before the cancel landed.
        std::thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        handle.shutdown();
    }

    #[test]
    fn test_stale_cancel_does_not_stop_new_subscription() {
        let (tx, rx) = mpsc::channel();
        let (mut clock, handle) = PumpClock::spawn(tx);

        let first = clock.subscribe(Duration::from_millis(5)).unwrap();
        let second = clock.subscribe(Duration::from_millis(5)).unwrap();
        clock.cancel(first).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut saw_second = false;
        while std::time::Instant::now() < deadline {
            if let Ok(msg) = rx.recv_timeout(Duration::from_millis(50)) {
                if msg.args[0] as u64 == second.0 {
                    saw_second = true;
                    break;
                }
            }
        }
        assert!(saw_second);
        handle.shutdown();
    }
}
