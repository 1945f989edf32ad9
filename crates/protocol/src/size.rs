//! Human-readable byte counts.

/// Units used by [`format_size`], in ascending order.
pub const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 scaling and two decimals.
///
/// The chosen unit is the smallest one for which the scaled value is below
/// 1024. Anything at or above 1024 TB is still reported in TB.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let last = SIZE_UNITS.len() - 1;

    for (idx, unit) in SIZE_UNITS.iter().enumerate() {
        if size < 1024.0 || idx == last {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }

    unreachable!("SIZE_UNITS is not empty")
}
