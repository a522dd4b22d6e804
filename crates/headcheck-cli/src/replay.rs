//! `headcheck replay` — run a full session against a recorded detection trace.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use headcheck_core::{Frame, SessionState, Step};
use headcheck_session::{spawn_session, Config, ScriptedProvider, StillCamera, Trace};
use serde_json::{json, Value};
use tokio::sync::watch;

/// Consecutive idle polls after the trace runs out before giving up.
const IDLE_POLLS_AFTER_TRACE: u32 = 3;

pub struct ReplayArgs {
    pub trace: PathBuf,
    pub image: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub timeout: Duration,
}

pub async fn run(config: &Config, args: ReplayArgs) -> Result<()> {
    let text = fs::read_to_string(&args.trace)
        .with_context(|| format!("failed to read {}", args.trace.display()))?;
    let trace: Trace = serde_json::from_str(&text)
        .with_context(|| format!("invalid trace {}", args.trace.display()))?;

    let camera = match &args.image {
        Some(path) => StillCamera::open(path)?,
        None => StillCamera::new(Frame::solid(trace.width, trace.height, [0, 0, 0])?),
    };
    let provider = Arc::new(ScriptedProvider::from_trace(&trace));
    tracing::info!(
        detections = trace.detections.len(),
        width = trace.width,
        height = trace.height,
        "replaying trace"
    );

    let session = spawn_session(camera, Arc::clone(&provider), config);
    let mut updates = session.subscribe();
    session.start().await?;

    follow(&mut updates, &provider, config.poll_interval(), args.timeout).await;
    session.stop().await?;

    let state = session.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&summary(&session.id().to_string(), &state))?
    );

    let Some(image) = state.captured_image() else {
        bail!(
            "liveness check did not complete (stopped at step '{}')",
            state.step().as_str()
        );
    };
    if let Some(out) = &args.out {
        fs::write(out, image.png())
            .with_context(|| format!("failed to write {}", out.display()))?;
        tracing::info!(path = %out.display(), bytes = image.png().len(), "capture written");
    }
    Ok(())
}

/// Print each status change until the session is done, the trace is
/// exhausted, or `timeout` elapses.
async fn follow(
    updates: &mut watch::Receiver<SessionState>,
    provider: &ScriptedProvider,
    poll: Duration,
    timeout: Duration,
) {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut last = None;
    let mut idle_polls = 0;

    loop {
        let (step, message) = {
            let state = updates.borrow_and_update();
            (state.step(), state.message())
        };
        if last != Some((step, message)) {
            eprintln!("[{}] {}", step.as_str(), message);
            last = Some((step, message));
        }
        if step == Step::Done {
            return;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return;
                }
                idle_polls = 0;
            }
            _ = tokio::time::sleep(poll) => {
                if provider.remaining() == 0 {
                    idle_polls += 1;
                    if idle_polls >= IDLE_POLLS_AFTER_TRACE {
                        tracing::info!("trace exhausted");
                        return;
                    }
                }
            }
            _ = &mut deadline => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "replay timed out");
                return;
            }
        }
    }
}

fn summary(session_id: &str, state: &SessionState) -> Value {
    json!({
        "session_id": session_id,
        "step": state.step(),
        "message": state.message(),
        "locale": state.locale(),
        "camera_active": state.camera_active(),
        "captured": state.captured_image().map(|img| json!({
            "width": img.width,
            "height": img.height,
            "captured_at": img.captured_at.to_rfc3339(),
            "png_bytes": img.png().len(),
        })),
    })
}
