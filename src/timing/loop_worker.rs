use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use crate::geo::GpsSample;

use super::{RecordOutcome, TimingEngine, TimingEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Applies fixes from `receiver` to the engine until `cancel_token` fires or
/// the sampler goes away. Fixes still queued at cancellation are discarded.
pub async fn sample_loop(
    engine: Arc<Mutex<TimingEngine>>,
    mut receiver: broadcast::Receiver<GpsSample>,
    events: broadcast::Sender<TimingEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("sample loop cancelled");
                break;
            }
            received = receiver.recv() => match received {
                Ok(sample) => {
                    apply_sample(&engine, &events, sample).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log_warn!("sample loop lagged, {skipped} fixes skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    log_info!("location source closed, sample loop exiting");
                    break;
                }
            }
        }
    }
}

/// Records one fix and announces a lap if it closed one.
pub async fn apply_sample(
    engine: &Mutex<TimingEngine>,
    events: &broadcast::Sender<TimingEvent>,
    sample: GpsSample,
) -> RecordOutcome {
    let outcome = engine.lock().await.record(sample, Utc::now());

    if let RecordOutcome::LapCompleted(lap) = &outcome {
        log_info!(
            "lap {} completed in {} ms ({:.0} m)",
            lap.number,
            lap.lap_time().map(|t| t.num_milliseconds()).unwrap_or(0),
            lap.distance_m
        );
        TimingEvent::LapCompleted(lap.clone()).emit(events);
    }
    outcome
}
