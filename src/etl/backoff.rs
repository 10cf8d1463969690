/// Backoff Module
///
/// Delay applied between listing pages. The policy is configuration, not a
/// constant; it never reacts to server rate-limit signals.
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// No delay between pages
    None,
    /// Same delay after every page
    Fixed(Duration),
    /// `base * 2^n` after the n-th page (0-based), capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(200))
    }
}

impl BackoffPolicy {
    /// Delay to wait after `page_index` pages have been fetched (0-based)
    pub fn delay(&self, page_index: usize) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 1u32.checked_shl(page_index.min(31) as u32).unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(max, |d| d.min(max))
            }
        }
    }
}
