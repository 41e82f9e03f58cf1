//! Printable text embedded in a ROM (copyright banners, version strings, part numbers).

/// Runs shorter than this are almost always opcode bytes that happen to be printable.
pub const MIN_RUN_LEN: usize = 9;

/// Return every run of printable ASCII at least [`MIN_RUN_LEN`] bytes long, in buffer order.
///
/// A run is only complete once a non-printable byte ends it; text cut off by the end of the
/// buffer is dropped.
pub fn sane_strings(rom: &[u8]) -> Vec<String> {
    let mut runs: Vec<&[u8]> = rom.split(|b| !(0x20..=0x7E).contains(b)).collect();
    // The final piece of the split is never followed by a terminator.
    runs.pop();
    runs.into_iter()
        .filter(|run| run.len() >= MIN_RUN_LEN)
        .map(|run| run.iter().map(|&b| char::from(b)).collect())
        .collect()
}
