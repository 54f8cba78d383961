//! Backend agnostic confirmation polling.

use std::{future::Future, time::Duration};

use tracing::{debug, info};

use crate::{CancelToken, Error, TxHash};

/// Used by backends that don't define their own default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Outcome of a single existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Waiting,
    Confirmed,
}

/// Polls `check` every `interval` until it reports the tx as confirmed.
///
/// The first check happens after one full interval. A zero `interval`
/// falls back to `default_interval`. `NotFound` from the check keeps
/// waiting, any other error ends the loop. Cancellation is observed while
/// sleeping and while a check is in flight, and yields
/// [`Error::Cancelled`].
pub async fn poll_confirmation<C, F, Fut>(
    tx: &TxHash,
    interval: Duration,
    default_interval: Duration,
    cancel: C,
    mut check: F,
) -> Result<bool, Error>
where
    C: CancelToken,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ConfirmationState, Error>>,
{
    let interval = if interval.is_zero() {
        default_interval
    } else {
        interval
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!("awaiting tx {tx}")));
            }
            _ = tokio::time::sleep(interval) => (),
        }

        let state = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!("awaiting tx {tx}")));
            }
            state = check() => state,
        };

        match state {
            Ok(ConfirmationState::Confirmed) => {
                info!(%tx, "tx confirmed");
                return Ok(true);
            }
            Ok(ConfirmationState::Waiting) => debug!(%tx, "tx not confirmed yet"),
            Err(err) if err.is_not_found() => debug!(%tx, "tx not found yet"),
            Err(err) => return Err(err.context(format!("awaiting tx {tx}"))),
        }
    }
}
