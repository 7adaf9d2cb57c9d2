//! Date range planning.

use chrono::{Days, NaiveDate};

use crate::error::SyncError;
use crate::types::SyncWindow;

/// Splits the inclusive range `from..=to` into consecutive windows of at most
/// `window_days` days. The last window may be shorter.
pub fn plan_windows(
    from: NaiveDate,
    to: NaiveDate,
    window_days: u32,
) -> Result<Vec<SyncWindow>, SyncError> {
    if from > to {
        return Err(SyncError::InvalidRange { from, to });
    }
    if window_days == 0 {
        return Err(SyncError::ZeroWindow);
    }

    let span = Days::new(u64::from(window_days) - 1);
    let mut windows = Vec::new();
    let mut start = from;
    loop {
        let end = start.checked_add_days(span).map_or(to, |d| d.min(to));
        windows.push(SyncWindow::new(windows.len(), start, end));
        match end.succ_opt() {
            Some(next) if end < to => start = next,
            _ => break,
        }
    }
    Ok(windows)
}
