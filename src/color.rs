//! Per-level color allocation and the color path carried down the tree.

use crate::config::ColorRange;
use rand::Rng;
use std::sync::Arc;

/// Source of the color code assigned to a level each time a step starts there.
///
/// The default [`RandomColors`] picks uniformly inside a [`ColorRange`].
/// Implement it to get deterministic output.
pub trait ColorSource: Send + Sync {
    /// Returns the color code for a step starting at `level`.
    fn pick(&self, level: usize) -> u8;
}

/// Uniformly random colors inside an inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct RandomColors {
    range: ColorRange,
}

impl RandomColors {
    pub fn new(range: ColorRange) -> Self {
        Self { range }
    }
}

impl Default for RandomColors {
    fn default() -> Self {
        Self::new(ColorRange::default())
    }
}

impl ColorSource for RandomColors {
    fn pick(&self, _level: usize) -> u8 {
        // Deserialized ranges skip validation.
        let (lo, hi) = if self.range.min <= self.range.max {
            (self.range.min, self.range.max)
        } else {
            (self.range.max, self.range.min)
        };
        rand::thread_rng().gen_range(lo..=hi)
    }
}

impl<F> ColorSource for F
where
    F: Fn(usize) -> u8 + Send + Sync,
{
    fn pick(&self, level: usize) -> u8 {
        self(level)
    }
}

/// One color code per level visited so far.
///
/// Immutable: [`ColorPath::with_level`] returns a new path, so a child never
/// aliases its parent's codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorPath(Arc<[u8]>);

impl ColorPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `code` at `level`.
    ///
    /// The code is appended when `level` equals the current length and
    /// replaces the existing entry otherwise. Deeper entries are dropped so
    /// the path never outgrows the level being set.
    pub fn with_level(&self, level: usize, code: u8) -> Self {
        let mut codes: Vec<u8> = self.0.iter().copied().take(level).collect();
        // A gap can only appear if a level was never visited; pad with its parent's code.
        while codes.len() < level {
            codes.push(codes.last().copied().unwrap_or(code));
        }
        codes.push(code);
        Self(codes.into())
    }

    pub fn codes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_level_appends_then_overwrites() {
        let root = ColorPath::new().with_level(0, 10);
        assert_eq!(root.codes(), &[10]);

        let child = root.with_level(1, 20);
        assert_eq!(child.codes(), &[10, 20]);

        let sibling = child.with_level(1, 30);
        assert_eq!(sibling.codes(), &[10, 30]);
        // The source path is untouched.
        assert_eq!(child.codes(), &[10, 20]);
    }

    #[test]
    fn test_with_level_truncates_deeper_entries() {
        let deep = ColorPath::new()
            .with_level(0, 1)
            .with_level(1, 2)
            .with_level(2, 3);
        assert_eq!(deep.with_level(1, 9).codes(), &[1, 9]);
    }

    #[test]
    fn test_random_colors_stay_in_range() {
        let colors = RandomColors::new(ColorRange { min: 16, max: 18 });
        for level in 0..200 {
            let code = colors.pick(level);
            assert!((16..=18).contains(&code), "{} out of range", code);
        }
    }

    #[test]
    fn test_random_colors_tolerate_reversed_range() {
        let colors = RandomColors::new(ColorRange { min: 7, max: 5 });
        assert!((5..=7).contains(&colors.pick(0)));
    }

    #[test]
    fn test_closure_color_source() {
        let source = |level: usize| level as u8 + 100;
        assert_eq!(source.pick(3), 103);
    }
}
