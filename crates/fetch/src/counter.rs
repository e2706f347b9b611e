/// Monotonic counter backing unique output filenames.
///
/// The current value names the in-flight download; it advances exactly once
/// per *successful* fetch. Failures leave it untouched, so a value is never
/// reused while also never colliding with a prior success.
#[derive(Debug, Default)]
pub struct FetchCounter(u64);

impl FetchCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value to name the next output file with. Does not advance.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.0
    }

    /// Advance after a confirmed success. Returns the value that was just
    /// consumed.
    pub fn advance(&mut self) -> u64 {
        let used = self.0;
        self.0 += 1;
        used
    }
}
