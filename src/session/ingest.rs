use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::asr::{AsrEvent, AsrStream};
use crate::events::SessionEvent;
use crate::segmentation::SegmentationEngine;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Lower bound on the deadline wait so a deadline that is already due does
/// not spin the loop.
const MIN_DEADLINE_WAIT: Duration = Duration::from_millis(5);

/// Wall-clock time derived from the tokio clock, so timer-driven checks
/// follow `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.mono.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }

    fn until(&self, at: DateTime<Utc>) -> Duration {
        (at - self.now()).to_std().unwrap_or_default()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward recognizer output into the engine until cancelled.
///
/// Hands the stream back on cancellation so a paused session can resume on
/// it; returns `None` once the recognizer closed the stream.
pub async fn ingest_loop(
    engine: Arc<Mutex<SegmentationEngine>>,
    mut stream: AsrStream,
    events: broadcast::Sender<SessionEvent>,
    cancel_token: CancellationToken,
) -> Option<AsrStream> {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("ingest loop cancelled");
                return Some(stream);
            }
            event = stream.recv() => {
                match event {
                    Some(AsrEvent::Partial(result)) => {
                        engine.lock().await.ingest(result).await;
                    }
                    Some(AsrEvent::Error(message)) => {
                        log_warn!("recognizer error, continuing: {}", message);
                        let _ = events.send(SessionEvent::AsrError { message });
                    }
                    None => {
                        log_info!("recognizer closed its stream");
                        let _ = events.send(SessionEvent::InputClosed);
                        return None;
                    }
                }
            }
        }
    }
}

/// Re-check the timer-driven rules every `period`, and once more right at
/// the forced-timeout deadline.
pub async fn fallback_loop(
    engine: Arc<Mutex<SegmentationEngine>>,
    period: Duration,
    clock: SessionClock,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline_wait = engine
            .lock()
            .await
            .next_forced_deadline()
            .map(|deadline| clock.until(deadline).max(MIN_DEADLINE_WAIT))
            .unwrap_or(period);

        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_debug!("fallback loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                engine.lock().await.tick(clock.now()).await;
            }
            _ = tokio::time::sleep(deadline_wait) => {
                engine.lock().await.tick(clock.now()).await;
            }
        }
    }
}

/// Drop whatever the recognizer queued while the session was paused.
///
/// Returns the number of events dropped, and `None` in place of the stream
/// if the recognizer closed it in the meantime.
pub fn discard_buffered(mut stream: AsrStream) -> (usize, Option<AsrStream>) {
    let mut dropped = 0;
    loop {
        match stream.try_recv() {
            Ok(_) => dropped += 1,
            Err(TryRecvError::Empty) => return (dropped, Some(stream)),
            Err(TryRecvError::Disconnected) => return (dropped, None),
        }
    }
}

/// The ingest and fallback tasks of one live session.
pub struct SessionWorkers {
    cancel_token: CancellationToken,
    ingest: Option<JoinHandle<Option<AsrStream>>>,
    fallback: JoinHandle<()>,
}

impl SessionWorkers {
    /// Spawn both loops. Without a stream only the timer loop runs.
    pub fn spawn(
        engine: Arc<Mutex<SegmentationEngine>>,
        stream: Option<AsrStream>,
        events: broadcast::Sender<SessionEvent>,
        period: Duration,
        clock: SessionClock,
    ) -> Self {
        let cancel_token = CancellationToken::new();

        let ingest = stream.map(|stream| {
            tokio::spawn(ingest_loop(
                Arc::clone(&engine),
                stream,
                events,
                cancel_token.clone(),
            ))
        });
        let fallback = tokio::spawn(fallback_loop(engine, period, clock, cancel_token.clone()));

        Self {
            cancel_token,
            ingest,
            fallback,
        }
    }

    /// Cancel both loops and wait for them. Returns the recognizer stream if
    /// it is still open.
    pub async fn shutdown(self) -> Option<AsrStream> {
        self.cancel_token.cancel();

        if let Err(e) = self.fallback.await {
            log_error!("fallback loop task failed to join: {}", e);
        }

        match self.ingest {
            Some(handle) => match handle.await {
                Ok(stream) => stream,
                Err(e) => {
                    log_error!("ingest loop task failed to join: {}", e);
                    None
                }
            },
            None => None,
        }
    }
}
