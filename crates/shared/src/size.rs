const UNITS: [&str; 8] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB"];
const BLOCK: u64 = 1024;

/// Formats a byte count with a 1024 based unit, rounding up.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes;
    let mut remainder = false;
    let mut unit = 0;

    while (value > BLOCK || (value == BLOCK && remainder)) && unit + 1 < UNITS.len() {
        remainder |= value % BLOCK != 0;
        value /= BLOCK;
        unit += 1;
    }

    if remainder {
        value += 1;
    }

    let unit = UNITS.get(unit).copied().unwrap_or("B");
    format!("{value} {unit}")
}
