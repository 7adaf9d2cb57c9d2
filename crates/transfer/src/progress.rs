/// Highest percentage reported while chunks are still in flight.
///
/// 100 is reserved for a file the server has finished processing.
const MAX_UPLOAD_PERCENT: u8 = 99;

/// Upload progress after `completed` of `total` chunks have been acknowledged.
///
/// Computed from the chunk count, not bytes, and rounded to the nearest whole
/// percent. Capped at 99 so that only a completed file reads 100.
pub fn upload_percent(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    // Integer round-half-up of completed * 100 / total.
    let percent = (completed * 200 + total) / (total * 2);
    std::cmp::min(percent as u8, MAX_UPLOAD_PERCENT)
}
