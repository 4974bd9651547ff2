// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use courier_core::CourierError;
use tokio_util::sync::CancellationToken;

/// Sleeps for `delay` unless `cancel` fires first.
pub(crate) async fn pause(cancel: &CancellationToken, delay: Duration) -> Result<(), CourierError> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(CourierError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
