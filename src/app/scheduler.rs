use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::BackendEvent;

const FALLBACK_PERIOD: Duration = Duration::from_secs(5);

/// Periodic and on-demand capture triggers. Triggers are only requests; the
/// coordinator decides whether the busy/confirmation gate lets them through.
pub struct CaptureScheduler {
    period: Duration,
    sender: async_channel::Sender<BackendEvent>,
    ticker: Option<(CancellationToken, JoinHandle<()>)>,
}

impl CaptureScheduler {
    /// A zero period cannot drive a timer and is replaced by the 5 s default.
    pub fn new(period: Duration, sender: async_channel::Sender<BackendEvent>) -> Self {
        let period = if period.is_zero() {
            log::warn!("Zero capture interval, using {FALLBACK_PERIOD:?}");
            FALLBACK_PERIOD
        } else {
            period
        };
        Self {
            period,
            sender,
            ticker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Arm the periodic timer; the first tick fires one full period from now.
    /// No-op when already armed.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(self.period, self.sender.clone(), token.clone()));
        self.ticker = Some((token, handle));
        log::debug!("Capture timer armed ({:?})", self.period);
    }

    /// Disarm the periodic timer. No-op when not armed.
    pub fn stop(&mut self) {
        if let Some((token, _handle)) = self.ticker.take() {
            token.cancel();
            log::debug!("Capture timer suspended");
        }
    }

    /// Request an immediate capture.
    pub fn trigger_now(&self) {
        if self.sender.try_send(BackendEvent::RescanRequested).is_err() {
            log::warn!("Event loop closed, dropping rescan request");
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(
    period: Duration,
    sender: async_channel::Sender<BackendEvent>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if sender.send(BackendEvent::CaptureTick).await.is_err() {
                    break;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (tx, rx) = async_channel::unbounded();
        let mut scheduler = CaptureScheduler::new(PERIOD, tx);
        let armed_at = Instant::now();
        scheduler.start();

        let first = tokio::time::timeout(Duration::from_secs(6), rx.recv()).await;
        assert_eq!(first.unwrap().unwrap(), BackendEvent::CaptureTick);
        assert!(armed_at.elapsed() >= PERIOD);

        let second = tokio::time::timeout(Duration::from_secs(6), rx.recv()).await;
        assert_eq!(second.unwrap().unwrap(), BackendEvent::CaptureTick);
        assert!(armed_at.elapsed() >= PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_silences_the_timer() {
        let (tx, rx) = async_channel::unbounded();
        let mut scheduler = CaptureScheduler::new(PERIOD, tx);
        scheduler.start();
        scheduler.stop();
        assert!(!scheduler.is_running());

        let got = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await;
        assert!(got.is_err(), "no tick expected after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let (tx, rx) = async_channel::unbounded();
        let mut scheduler = CaptureScheduler::new(PERIOD, tx);
        scheduler.stop();
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(rx.len(), 1, "a second start must not spawn a second timer");

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_falls_back_to_default() {
        let (tx, rx) = async_channel::unbounded();
        let mut scheduler = CaptureScheduler::new(Duration::ZERO, tx);
        let armed_at = Instant::now();
        scheduler.start();

        let first = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert_eq!(first.unwrap().unwrap(), BackendEvent::CaptureTick);
        assert!(armed_at.elapsed() >= FALLBACK_PERIOD);
        assert!(scheduler.is_running());
    }

    #[tokio::test]
    async fn trigger_now_requests_a_rescan() {
        let (tx, rx) = async_channel::unbounded();
        let scheduler = CaptureScheduler::new(PERIOD, tx);
        scheduler.trigger_now();
        assert_eq!(rx.try_recv().unwrap(), BackendEvent::RescanRequested);
        assert!(!scheduler.is_running());
    }
}
