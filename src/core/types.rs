/*!
 * Core Types
 * Common types used across the responder
 */

/// OS process ID type
pub type Pid = i32;

/// Logical CPU index
pub type CpuId = u32;

/// CPU frequency in kHz (cpufreq units)
pub type FreqKhz = u32;

/// Memory size in pages
pub type Pages = u64;

/// Monotonic time or duration in milliseconds
pub type Millis = u64;

/// Kill-priority score (-1000..=1000, higher is killed first)
pub type OomScoreAdj = i16;

/// Common result type for responder operations
pub type ResponderResult<T> = Result<T, super::errors::ResponderError>;

/// Convert a page count to whole MiB for a given page size
#[inline]
pub fn pages_to_mib(pages: Pages, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) / (1024 * 1024)
}

/// Convert MiB to a page count for a given page size
#[inline]
pub fn mib_to_pages(mib: u64, page_size: u64) -> Pages {
    if page_size == 0 {
        return 0;
    }
    mib.saturating_mul(1024 * 1024) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_conversions() {
        assert_eq!(mib_to_pages(100, 4096), 25_600);
        assert_eq!(pages_to_mib(25_600, 4096), 100);
        // Partial MiB rounds down
        assert_eq!(pages_to_mib(255, 4096), 0);
        assert_eq!(mib_to_pages(1, 0), 0);
    }
}
