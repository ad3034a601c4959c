//! Countdown scheduler background task

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::state::{AppState, TickOutcome};

/// Background task that drives the one-second countdown tick
///
/// The interval is armed exactly while the timer is running and torn down
/// on every exit from the running state (pause, reset, duration change,
/// expiry), so no stray tick can fire into a stale state.
pub async fn countdown_task(state: Arc<AppState>) {
    info!("Starting countdown task");

    let mut state_rx = state.timer_change_tx.subscribe();

    loop {
        // Wait for a timer change notification
        match state_rx.recv().await {
            Ok(snapshot) => {
                if !snapshot.running {
                    debug!("Timer not running, countdown stays disarmed");
                    continue;
                }

                // Queued notifications can be stale after a fast
                // start/pause sequence; confirm before arming.
                match state.get_timer_state() {
                    Ok(timer) if timer.running => {}
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Failed to read timer state: {}", e);
                        continue;
                    }
                }

                info!(
                    "Countdown armed with {} seconds remaining",
                    snapshot.remaining_seconds
                );

                let mut interval = tokio::time::interval(Duration::from_secs(1));
                // The first interval tick completes immediately; consume it
                // so the first decrement lands a full second after start.
                interval.tick().await;

                let mut cancelled = false;

                loop {
                    tokio::select! {
                        // One second elapsed - apply a tick
                        _ = interval.tick() => {
                            match state.apply_tick() {
                                Ok((_, TickOutcome::Expired)) => {
                                    info!("Countdown reached zero, disarming");
                                    break;
                                }
                                Ok((_, TickOutcome::Ignored)) => {
                                    // Running was cleared between
                                    // notifications; stand down.
                                    cancelled = true;
                                    break;
                                }
                                Ok((timer, TickOutcome::Decremented)) => {
                                    debug!("Tick: {} remaining", timer.remaining_seconds);
                                }
                                Err(e) => {
                                    error!("Failed to apply tick: {}", e);
                                }
                            }
                        }

                        // Timer change - check if the countdown was stopped
                        result = state_rx.recv() => {
                            match result {
                                Ok(new_snapshot) => {
                                    if !new_snapshot.running {
                                        info!("Timer stopped, cancelling countdown");
                                        cancelled = true;
                                        break;
                                    }
                                }
                                Err(RecvError::Lagged(skipped)) => {
                                    warn!("Countdown task lagged {} notifications, resyncing", skipped);
                                    match state.get_timer_state() {
                                        Ok(timer) if !timer.running => {
                                            cancelled = true;
                                            break;
                                        }
                                        Ok(_) => {}
                                        Err(e) => error!("Failed to resync timer state: {}", e),
                                    }
                                }
                                Err(RecvError::Closed) => {
                                    info!("Timer channel closed, stopping countdown task");
                                    return;
                                }
                            }
                        }
                    }
                }

                if cancelled {
                    debug!("Countdown cancelled, waiting for next timer change");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Countdown task lagged {} notifications while idle", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Timer channel closed, stopping countdown task");
                return;
            }
        }
    }
}
