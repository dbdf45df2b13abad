/*!
 * Priority Tiers
 * Kill-priority windows derived from the built-in break-point table
 */

use super::types::TierBounds;
use crate::core::limits::ADJ_PRIO;

/// Tiers from most to least disposable: tier i is `[ADJ_PRIO[i], ADJ_PRIO[i-1]]`.
///
/// Adjacent tiers share their boundary score, so a process sitting exactly on
/// a break-point is considered by both; the second scan skips it because it
/// has been signaled already.
pub fn tiers() -> impl Iterator<Item = TierBounds> {
    ADJ_PRIO.windows(2).map(|pair| TierBounds {
        min_adj: pair[1],
        max_adj: pair[0],
    })
}

pub fn tier_count() -> usize {
    ADJ_PRIO.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_descend_to_foreground() {
        let all: Vec<_> = tiers().collect();
        assert_eq!(all.len(), tier_count());
        assert_eq!(
            all[0],
            TierBounds {
                min_adj: 900,
                max_adj: 906
            }
        );
        assert_eq!(
            all[all.len() - 1],
            TierBounds {
                min_adj: 0,
                max_adj: 100
            }
        );
        assert!(all.windows(2).all(|w| w[0].min_adj == w[1].max_adj));
    }
}
