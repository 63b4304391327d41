//! Background scheduler: the context that keeps counting while the
//! foreground is suspended.
//!
//! Long waits are split into chunks of at most [`MAX_CHUNK_MS`]. Each chunk
//! boundary re-reads the wall clock and compares it with the target instead
//! of trusting how long the wait appeared to take, so time lost to a
//! suspended process is picked up at the next boundary.
//!
//! At most one wait is pending. A new schedule replaces it, a cancel drops
//! it, and in both cases the old wait resolves without firing. Messages
//! already queued are always handled before an expired chunk, so a cancel
//! sent straight after a schedule wins.

use std::sync::Arc;

use timer_core::{next_chunk_ms, MAX_CHUNK_MS};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

use crate::bridge::SchedulerMessage;
use crate::clock::Clock;
use crate::notify::{Notification, NotificationSurface, NotifyError, NOTIFICATION_TAG};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub chunks_armed: u32,
    pub fired: u32,
    /// Waits that reached their end but whose notification could not be shown.
    pub failed: u32,
    pub superseded: u32,
    pub cancelled: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Fired,
    Failed,
    Superseded,
    Cancelled,
}

#[derive(Debug)]
struct ScheduledRequest {
    end_time: u64,
    title: String,
    body: String,
}

/// The one armed wait. Owned by the scheduler task alone.
#[derive(Debug)]
struct PendingWait {
    request: ScheduledRequest,
    deadline: Instant,
}

enum Wake {
    Message(Option<SchedulerMessage>),
    ChunkExpired,
}

pub struct BackgroundScheduler<S: NotificationSurface> {
    surface: S,
    clock: Arc<dyn Clock>,
    pending: Option<PendingWait>,
    stats: SchedulerStats,
}

impl<S: NotificationSurface> BackgroundScheduler<S> {
    pub fn new(surface: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            surface,
            clock,
            pending: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Start the scheduler on its own task. The returned sender is the only
    /// way to reach it.
    pub fn spawn(self) -> (UnboundedSender<SchedulerMessage>, JoinHandle<SchedulerStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    /// Process messages until every sender is gone. A wait still pending at
    /// that point is carried through to its notification first.
    pub async fn run(mut self, mut rx: UnboundedReceiver<SchedulerMessage>) -> SchedulerStats {
        let mut rx_open = true;
        loop {
            let wake = match (self.pending.as_ref().map(|p| p.deadline), rx_open) {
                (Some(deadline), true) => tokio::select! {
                    biased;
                    msg = rx.recv() => Wake::Message(msg),
                    () = time::sleep_until(deadline) => Wake::ChunkExpired,
                },
                (Some(deadline), false) => {
                    time::sleep_until(deadline).await;
                    Wake::ChunkExpired
                }
                (None, true) => Wake::Message(rx.recv().await),
                (None, false) => break,
            };

            match wake {
                Wake::Message(Some(msg)) => self.handle_message(msg),
                Wake::Message(None) => {
                    log::debug!("foreground channel closed");
                    rx_open = false;
                }
                Wake::ChunkExpired => self.on_chunk_expired(),
            }
        }
        log::info!("background scheduler stopped: {:?}", self.stats);
        self.stats
    }

    fn handle_message(&mut self, msg: SchedulerMessage) {
        match msg {
            SchedulerMessage::ScheduleTimerEnd {
                end_time,
                title,
                body,
            } => {
                self.resolve_pending(Resolution::Superseded);
                self.arm(ScheduledRequest {
                    end_time,
                    title,
                    body,
                });
            }
            SchedulerMessage::CancelTimerEnd => {
                self.resolve_pending(Resolution::Cancelled);
                self.surface.close(NOTIFICATION_TAG);
            }
        }
    }

    /// Arm the next chunk toward `request.end_time`. A request that is
    /// already due gets a zero-length wait so it fires on the next turn,
    /// after any messages queued behind it.
    fn arm(&mut self, request: ScheduledRequest) {
        let chunk = next_chunk_ms(request.end_time, self.clock.now_ms());
        if chunk > 0 {
            self.stats.chunks_armed += 1;
            log::debug!(
                "armed {} ms chunk toward {} (max {} ms)",
                chunk,
                request.end_time,
                MAX_CHUNK_MS
            );
        }
        self.pending = Some(PendingWait {
            request,
            deadline: Instant::now() + Duration::from_millis(chunk),
        });
    }

    fn on_chunk_expired(&mut self) {
        let Some(wait) = self.pending.take() else {
            return;
        };
        if self.clock.now_ms() >= wait.request.end_time {
            let resolution = if self.fire(&wait.request) {
                Resolution::Fired
            } else {
                Resolution::Failed
            };
            self.resolve(wait, resolution);
        } else {
            self.arm(wait.request);
        }
    }

    /// Show the notification. Returns whether it reached the surface.
    fn fire(&mut self, request: &ScheduledRequest) -> bool {
        let notification = Notification::timer_end(request.title.clone(), request.body.clone());
        match self.surface.show(&notification) {
            Ok(()) => true,
            Err(NotifyError::PermissionDenied) => {
                log::debug!("notification suppressed: permission denied");
                false
            }
            Err(e) => {
                log::warn!("failed to show notification: {e}");
                false
            }
        }
    }

    fn resolve_pending(&mut self, resolution: Resolution) {
        if let Some(wait) = self.pending.take() {
            self.resolve(wait, resolution);
        }
    }

    fn resolve(&mut self, wait: PendingWait, resolution: Resolution) {
        match resolution {
            Resolution::Fired => self.stats.fired += 1,
            Resolution::Failed => self.stats.failed += 1,
            Resolution::Superseded => self.stats.superseded += 1,
            Resolution::Cancelled => self.stats.cancelled += 1,
        }
        log::debug!("timer end {} resolved: {:?}", wait.request.end_time, resolution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::TokioClock;
    use crate::notify::testing::RecordingSurface;

    const BASE: u64 = 1_700_000_000_000;

    fn schedule(end_time: u64, title: &str) -> SchedulerMessage {
        SchedulerMessage::ScheduleTimerEnd {
            end_time,
            title: title.to_string(),
            body: "body".to_string(),
        }
    }

    fn start(surface: RecordingSurface) -> (UnboundedSender<SchedulerMessage>, JoinHandle<SchedulerStats>) {
        let clock = Arc::new(TokioClock::new(BASE));
        BackgroundScheduler::new(surface, clock).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn splits_long_wait_into_bounded_chunks() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE + 150_000, "done")).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.chunks_armed, 3);
        assert_eq!(stats.fired, 1);
        let shown = shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].tag, NOTIFICATION_TAG);
        assert_eq!(shown[0].title, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_before_end_time() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let (tx, _handle) = start(surface);

        tx.send(schedule(BASE + 90_000, "done")).unwrap();
        time::sleep(Duration::from_millis(89_000)).await;
        assert!(shown.lock().unwrap().is_empty());

        time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(shown.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_right_after_schedule_never_fires() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let closed = surface.closed.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE + 30_000, "done")).unwrap();
        tx.send(SchedulerMessage::CancelTimerEnd).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.fired, 0);
        assert_eq!(stats.cancelled, 1);
        assert!(shown.lock().unwrap().is_empty());
        assert_eq!(*closed.lock().unwrap(), vec![NOTIFICATION_TAG.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wins_over_already_due_schedule() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE - 1_000, "late")).unwrap();
        tx.send(SchedulerMessage::CancelTimerEnd).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.chunks_armed, 0);
        assert_eq!(stats.fired, 0);
        assert!(shown.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn past_end_time_fires_immediately() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE - 1_000, "late")).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.chunks_armed, 0);
        assert_eq!(stats.fired, 1);
        assert_eq!(shown.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_supersedes_pending_chain() {
        let surface = RecordingSurface::default();
        let shown = surface.shown.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE + 120_000, "first")).unwrap();
        time::sleep(Duration::from_secs(30)).await;
        tx.send(schedule(BASE + 30_000 + 90_000, "second")).unwrap();
        tx.send(schedule(BASE + 30_000 + 45_000, "third")).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.fired, 1);
        assert_eq!(stats.superseded, 2);
        let shown = shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "third");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_without_pending_wait_still_closes_notification() {
        let surface = RecordingSurface::default();
        let closed = surface.closed.clone();
        let (tx, handle) = start(surface);

        tx.send(SchedulerMessage::CancelTimerEnd).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert_eq!(stats.cancelled, 0);
        assert_eq!(closed.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_surface_does_not_stop_the_scheduler() {
        let surface = RecordingSurface {
            deny: true,
            ..RecordingSurface::default()
        };
        let shown = surface.shown.clone();
        let (tx, handle) = start(surface);

        tx.send(schedule(BASE + 1_000, "a")).unwrap();
        time::sleep(Duration::from_secs(2)).await;
        tx.send(schedule(BASE + 5_000, "b")).unwrap();
        drop(tx);
        let stats = handle.await.unwrap();

        assert!(shown.lock().unwrap().is_empty());
        assert_eq!(stats.fired, 0);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.superseded, 0);
    }
}
