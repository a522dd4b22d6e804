use std::sync::Arc;
use std::time::Duration;

use headcheck_core::{
    encode_png, CycleOutcome, DetectorError, Frame, LandmarkProvider, LandmarkSet,
    LivenessMachine, SessionState, Step,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::camera::{Camera, CameraError};
use crate::config::Config;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("session task exited")]
    ChannelClosed,
}

/// Requests from handles. The task exits once every handle is dropped.
enum SessionRequest {
    Start {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
}

/// Events from the task's own ticker and detection tasks.
enum SessionEvent {
    Tick {
        epoch: u64,
    },
    Detected {
        epoch: u64,
        frame: Frame,
        result: Result<Option<LandmarkSet>, DetectorError>,
    },
}

/// Upper bound on detections running at once when the provider is slower
/// than the polling period.
const MAX_IN_FLIGHT_DETECTIONS: usize = 4;

/// Clone-safe handle to a session task.
///
/// The task exits, stopping the camera, once every handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::Sender<SessionRequest>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Reset the challenge, start the camera and begin polling.
    /// Starting an already active session is a no-op.
    pub async fn start(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionRequest::Start { reply }).await?;
        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Stop polling and the camera. Detections still in flight are discarded.
    /// The current step and captured image are kept.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionRequest::Stop { reply }).await?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Return the challenge to its initial state without touching the camera.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionRequest::Reset { reply }).await?;
        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the published state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the session has reached `step` or beyond.
    pub async fn wait_for_step(&self, step: Step) -> Result<SessionState, SessionError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| s.step() >= step)
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        Ok(state.clone())
    }

    async fn request(&self, req: SessionRequest) -> Result<(), SessionError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

/// Spawn a session task on the current tokio runtime.
///
/// The camera stays stopped until [`SessionHandle::start`] is called.
pub fn spawn_session<C, P>(camera: C, provider: P, config: &Config) -> SessionHandle
where
    C: Camera,
    P: LandmarkProvider,
{
    let id = Uuid::new_v4();
    let machine = LivenessMachine::new(config.turn_threshold, config.locale);
    let (state_tx, state_rx) = watch::channel(machine.state().clone());
    let (tx, rx) = mpsc::channel::<SessionRequest>(16);
    let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(16);

    let actor = SessionActor {
        id,
        camera,
        provider: Arc::new(provider),
        machine,
        poll_interval: config.poll_interval(),
        start_delay: config.start_delay(),
        epoch: 0,
        ticker: None,
        in_flight: 0,
        events_tx,
        state_tx,
    };

    tracing::info!(
        session_id = %id,
        poll_ms = config.poll_interval_ms,
        threshold = actor.machine.threshold(),
        locale = %config.locale,
        "session created"
    );
    tokio::spawn(actor.run(rx, events_rx));

    SessionHandle {
        id,
        tx,
        state: state_rx,
    }
}

/// Sole owner of the liveness machine. Every state change happens on this
/// task, so start/stop/reset and detection results never race.
struct SessionActor<C, P> {
    id: Uuid,
    camera: C,
    provider: Arc<P>,
    machine: LivenessMachine,
    poll_interval: Duration,
    start_delay: Duration,
    /// Bumped on every start and stop; ticks and detections carry the epoch
    /// they were issued under and are dropped if it no longer matches.
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    /// Detection tasks spawned and not yet reported back.
    in_flight: usize,
    events_tx: mpsc::Sender<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
}

impl<C: Camera, P: LandmarkProvider> SessionActor<C, P> {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<SessionRequest>,
        mut events: mpsc::Receiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                req = rx.recv() => match req {
                    Some(req) => self.on_request(req),
                    None => break,
                },
                // The task keeps its own sender, so this never yields `None`.
                Some(event) = events.recv() => match event {
                    SessionEvent::Tick { epoch } => self.on_tick(epoch),
                    SessionEvent::Detected {
                        epoch,
                        frame,
                        result,
                    } => {
                        self.in_flight = self.in_flight.saturating_sub(1);
                        self.on_detected(epoch, frame, result);
                    }
                },
            }
        }
        self.stop();
        tracing::info!(session_id = %self.id, "session task exiting");
    }

    fn on_request(&mut self, req: SessionRequest) {
        match req {
            SessionRequest::Start { reply } => {
                let _ = reply.send(self.start());
            }
            SessionRequest::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            SessionRequest::Reset { reply } => {
                self.machine.reset();
                tracing::info!(session_id = %self.id, "session reset");
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn active(&self) -> bool {
        self.machine.state().camera_active()
    }

    fn start(&mut self) -> Result<(), SessionError> {
        if self.active() {
            tracing::debug!(session_id = %self.id, "start ignored: already active");
            return Ok(());
        }

        self.machine.reset();
        if let Err(e) = self.camera.start() {
            tracing::error!(session_id = %self.id, error = %e, "camera start failed");
            self.publish();
            return Err(e.into());
        }

        self.epoch += 1;
        self.machine.set_camera_active(true);
        self.ticker = Some(self.spawn_ticker());
        self.publish();

        tracing::info!(
            session_id = %self.id,
            epoch = self.epoch,
            start_delay_ms = self.start_delay.as_millis() as u64,
            "session started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.epoch += 1;
        if self.active() {
            self.camera.stop();
            self.machine.set_camera_active(false);
            self.publish();
            tracing::info!(
                session_id = %self.id,
                step = self.machine.state().step().as_str(),
                "session stopped"
            );
        }
    }

    /// Repeating timer task, aborted by [`Self::stop`].
    fn spawn_ticker(&self) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        let epoch = self.epoch;
        let period = self.poll_interval;
        let first = Instant::now() + self.start_delay;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(SessionEvent::Tick { epoch }).await.is_err() {
                    break;
                }
            }
        })
    }

    fn on_tick(&mut self, epoch: u64) {
        if epoch != self.epoch || !self.active() {
            return;
        }
        if self.machine.state().step() == Step::Done {
            return;
        }
        let Some(frame) = self.camera.current_frame() else {
            tracing::trace!(session_id = %self.id, "no frame ready, skipping cycle");
            return;
        };
        if self.in_flight >= MAX_IN_FLIGHT_DETECTIONS {
            tracing::debug!(
                session_id = %self.id,
                in_flight = self.in_flight,
                "detections outstanding, skipping cycle"
            );
            return;
        }

        // Detections are not awaited here: a slow provider may have several
        // in flight, each applied against the step current when it returns.
        let provider = Arc::clone(&self.provider);
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = provider.detect(&frame).await;
            let _ = tx
                .send(SessionEvent::Detected {
                    epoch,
                    frame,
                    result,
                })
                .await;
        });
    }

    fn on_detected(
        &mut self,
        epoch: u64,
        frame: Frame,
        result: Result<Option<LandmarkSet>, DetectorError>,
    ) {
        if epoch != self.epoch || !self.active() {
            tracing::debug!(
                session_id = %self.id,
                epoch,
                current_epoch = self.epoch,
                "discarding stale detection"
            );
            return;
        }

        let detection = result.unwrap_or_else(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "landmark detection failed");
            None
        });

        let camera = &self.camera;
        let outcome = self.machine.on_cycle(detection.as_ref(), || {
            let still = camera.current_frame().unwrap_or(frame);
            encode_png(&still)
        });

        if let CycleOutcome::Advanced { to: Step::Done, .. } = outcome {
            tracing::info!(session_id = %self.id, "liveness confirmed, frame captured");
        }

        self.publish();
    }

    /// Push the machine's state to observers if it changed.
    fn publish(&self) {
        let next = self.machine.state();
        self.state_tx.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }
}
