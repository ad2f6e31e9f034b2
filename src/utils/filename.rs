/// Makes an uploaded file name unique by appending a millisecond timestamp.
///
/// The timestamp goes before the last extension (`report.pdf` becomes
/// `report_1700000000000.pdf`). Names without an extension get it appended
/// directly (`README1700000000000`). Any directory part sent by the client is
/// dropped. Returns `None` when nothing is left of the name.
pub fn timestamped_name(original: &str, millis: i64) -> Option<String> {
    suffixed_name(original, &millis.to_string())
}

/// Same as [`timestamped_name`] with a `-seq` after the timestamp, for the
/// second and later files of one batch that would otherwise share a name.
pub fn sequenced_name(original: &str, millis: i64, seq: usize) -> Option<String> {
    suffixed_name(original, &format!("{}-{}", millis, seq))
}

fn suffixed_name(original: &str, suffix: &str) -> Option<String> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    if base.is_empty() {
        return None;
    }

    match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => Some(format!("{}_{}.{}", stem, suffix, ext)),
        _ => Some(format!("{}{}", base, suffix)),
    }
}
