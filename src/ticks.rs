//! Tick-size table: price normalization by price band.
//!
//! The table is a sorted set of non-overlapping price bands, each carrying a
//! fixed minimum increment. Every non-zero price stored on the book must be
//! tick-compliant after entry normalization.

use crate::orders::Price;
use serde::{Deserialize, Serialize};

/// A contiguous price band with a fixed tick size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TickBand {
    min_price: Price,
    max_price: Price,
    tick_size: Price,
}

/// Error raised when configuring the table with an invalid band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TickTableError {
    /// `min_price > max_price`, negative bounds, or a non-positive tick.
    InvalidBand {
        /// Lower bound of the offending band.
        min_price: Price,
        /// Upper bound of the offending band.
        max_price: Price,
        /// Tick size of the offending band.
        tick_size: Price,
    },
    /// The new band intersects an existing one.
    OverlappingBand {
        /// Lower bound of the offending band.
        min_price: Price,
        /// Upper bound of the offending band.
        max_price: Price,
    },
}

impl std::fmt::Display for TickTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickTableError::InvalidBand {
                min_price,
                max_price,
                tick_size,
            } => write!(
                f,
                "invalid tick band: [{min_price}, {max_price}] tick {tick_size}"
            ),
            TickTableError::OverlappingBand {
                min_price,
                max_price,
            } => write!(
                f,
                "tick band [{min_price}, {max_price}] overlaps an existing band"
            ),
        }
    }
}

impl std::error::Error for TickTableError {}

/// Per-band tick-size table with half-up rounding.
///
/// The default table mirrors common equity-market bands: cent ticks up to
/// $999.99, then 5, 10 and 100 cent ticks as the price grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSizeTable {
    bands: Vec<TickBand>,
}

impl Default for TickSizeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        // Infallible: the default bands are disjoint by construction.
        let defaults = [
            (1, 99_999, 1),
            (100_000, 499_999, 5),
            (500_000, 999_999, 10),
            (1_000_000, Price::MAX, 100),
        ];
        for (min, max, tick) in defaults {
            let _ = table.add_band(min, max, tick);
        }
        table
    }
}

impl TickSizeTable {
    /// Creates a table with no bands. Every price maps to tick 0 until
    /// bands are added.
    #[must_use]
    pub fn empty() -> Self {
        Self { bands: Vec::new() }
    }

    /// Adds a price band with a fixed tick size.
    ///
    /// # Errors
    /// Returns [`TickTableError::InvalidBand`] for inverted or negative
    /// bounds or a non-positive tick, and [`TickTableError::OverlappingBand`]
    /// when the band intersects an existing one.
    pub fn add_band(
        &mut self,
        min_price: Price,
        max_price: Price,
        tick_size: Price,
    ) -> Result<(), TickTableError> {
        if min_price > max_price || min_price < 0 || tick_size <= 0 {
            return Err(TickTableError::InvalidBand {
                min_price,
                max_price,
                tick_size,
            });
        }
        for band in &self.bands {
            if !(max_price < band.min_price || min_price > band.max_price) {
                return Err(TickTableError::OverlappingBand {
                    min_price,
                    max_price,
                });
            }
        }
        self.bands.push(TickBand {
            min_price,
            max_price,
            tick_size,
        });
        self.bands.sort_by_key(|band| band.min_price);
        Ok(())
    }

    #[inline]
    fn band_for(&self, price: Price) -> Option<&TickBand> {
        // Bands are few; a linear scan beats a binary search here.
        self.bands
            .iter()
            .find(|band| band.min_price <= price && price <= band.max_price)
    }

    /// Rounds `price` to the nearest tick of its band, half up.
    ///
    /// Returns 0 when `price` is non-positive or no band covers it.
    #[must_use]
    pub fn round_to_tick(&self, price: Price) -> Price {
        if price <= 0 {
            return 0;
        }
        match self.band_for(price) {
            Some(band) => {
                let half_tick = band.tick_size / 2;
                price.saturating_add(half_tick) / band.tick_size * band.tick_size
            }
            None => 0,
        }
    }

    /// True when `price` is already aligned to its band's tick.
    #[must_use]
    #[inline]
    pub fn is_valid_price(&self, price: Price) -> bool {
        price == self.round_to_tick(price)
    }

    /// Tick size of the band containing `price`, or 0.
    #[must_use]
    pub fn tick_size(&self, price: Price) -> Price {
        if price <= 0 {
            return 0;
        }
        self.band_for(price).map_or(0, |band| band.tick_size)
    }

    /// The rounded neighbor one tick above `price`, or 0 when `price` is
    /// outside every band.
    #[must_use]
    pub fn next_tick_up(&self, price: Price) -> Price {
        let tick = self.tick_size(price);
        if tick == 0 {
            return 0;
        }
        let rounded = self.round_to_tick(price);
        if rounded == 0 {
            return 0;
        }
        self.round_to_tick(rounded + tick)
    }

    /// The rounded neighbor one tick below `price`, or 0 on underflow.
    #[must_use]
    pub fn next_tick_down(&self, price: Price) -> Price {
        let tick = self.tick_size(price);
        if tick == 0 {
            return 0;
        }
        let rounded = self.round_to_tick(price);
        if rounded == 0 {
            return 0;
        }
        let next = rounded - tick;
        if next > 0 {
            self.round_to_tick(next)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_cover_expected_ticks() {
        let table = TickSizeTable::default();
        assert_eq!(table.tick_size(50), 1);
        assert_eq!(table.tick_size(99_999), 1);
        assert_eq!(table.tick_size(100_000), 5);
        assert_eq!(table.tick_size(500_000), 10);
        assert_eq!(table.tick_size(5_000_000), 100);
        assert_eq!(table.tick_size(0), 0);
        assert_eq!(table.tick_size(-5), 0);
    }

    #[test]
    fn round_half_up() {
        let table = TickSizeTable::default();
        // Tick 5 band: 100_002 rounds down, 100_003 rounds up.
        assert_eq!(table.round_to_tick(100_002), 100_000);
        assert_eq!(table.round_to_tick(100_003), 100_005);
        // Tick 1 band is identity.
        assert_eq!(table.round_to_tick(12_345), 12_345);
        // Non-positive prices collapse to 0.
        assert_eq!(table.round_to_tick(0), 0);
        assert_eq!(table.round_to_tick(-100), 0);
    }

    #[test]
    fn round_outside_bands_is_zero() {
        let mut table = TickSizeTable::empty();
        table.add_band(100, 200, 10).unwrap();
        assert_eq!(table.round_to_tick(50), 0);
        assert_eq!(table.round_to_tick(150), 150);
        assert_eq!(table.round_to_tick(300), 0);
    }

    #[test]
    fn overlapping_band_rejected() {
        let mut table = TickSizeTable::empty();
        table.add_band(1, 100, 1).unwrap();
        assert!(matches!(
            table.add_band(100, 200, 5),
            Err(TickTableError::OverlappingBand { .. })
        ));
        assert!(matches!(
            table.add_band(50, 60, 1),
            Err(TickTableError::OverlappingBand { .. })
        ));
        // Adjacent but disjoint is fine.
        table.add_band(101, 200, 5).unwrap();
    }

    #[test]
    fn inverted_or_degenerate_band_rejected() {
        let mut table = TickSizeTable::empty();
        assert!(matches!(
            table.add_band(200, 100, 1),
            Err(TickTableError::InvalidBand { .. })
        ));
        assert!(matches!(
            table.add_band(1, 100, 0),
            Err(TickTableError::InvalidBand { .. })
        ));
        assert!(matches!(
            table.add_band(-10, 100, 1),
            Err(TickTableError::InvalidBand { .. })
        ));
    }

    #[test]
    fn tick_neighbors() {
        let table = TickSizeTable::default();
        assert_eq!(table.next_tick_up(100_000), 100_005);
        assert_eq!(table.next_tick_down(100_005), 100_000);
        // Crossing a band boundary downward still lands on a valid tick.
        assert_eq!(table.next_tick_down(100_000), 99_995);
        assert_eq!(table.next_tick_down(1), 0);
        assert_eq!(table.next_tick_up(0), 0);
    }

    #[test]
    fn is_valid_price_tracks_rounding() {
        let table = TickSizeTable::default();
        assert!(table.is_valid_price(100_005));
        assert!(!table.is_valid_price(100_003));
    }
}
