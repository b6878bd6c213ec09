/// `S.Ds` below a minute, `M:SS.S` from there on
pub fn format_duration(secs: f64) -> String {
    // Round to tenths first so 59.96 carries into the minute instead of printing 60.0
    let tenths = (secs.max(0.0) * 10.0).round() as u64;
    if tenths < 600 {
        return format!("{}.{}s", tenths / 10, tenths % 10);
    }
    let rest = tenths % 600;
    format!("{}:{:02}.{}", tenths / 600, rest / 10, rest % 10)
}

/// Binary-unit size: whole bytes, otherwise one decimal of K, M or G
pub fn format_size(bytes: u64) -> String {
    const K: u64 = 1 << 10;
    const M: u64 = 1 << 20;
    const G: u64 = 1 << 30;

    match bytes {
        b if b >= G => format!("{:.1}G", b as f64 / G as f64),
        b if b >= M => format!("{:.1}M", b as f64 / M as f64),
        b if b >= K => format!("{:.1}K", b as f64 / K as f64),
        b => format!("{b}B"),
    }
}
