//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::Tag;

/// Tag generator for IMAP commands.
///
/// Generates sequential tags in the format "A0001", "A0002", etc.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(0),
            prefix,
        }
    }

    /// Generates the next tag.
    ///
    /// The counter wraps after `u32::MAX` tags.
    #[must_use]
    pub fn next(&self) -> Tag {
        let n = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        Tag::new(format!("{}{n:04}", self.prefix))
    }

    /// Returns how many tags have been handed out.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_generation() {
        let generator = TagGenerator::default();
        assert_eq!(generator.next().as_str(), "A0001");
        assert_eq!(generator.next().as_str(), "A0002");
        assert_eq!(generator.current(), 2);
    }

    #[test]
    fn test_custom_prefix_and_padding() {
        let generator = TagGenerator::new('X');
        for _ in 0..99 {
            let _ = generator.next();
        }
        assert_eq!(generator.next().as_str(), "X0100");
    }

    #[test]
    fn test_uniqueness() {
        let generator = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10000 {
            assert!(seen.insert(generator.next()), "duplicate tag generated");
        }
    }

    #[test]
    fn test_wraps_instead_of_panicking() {
        let generator = TagGenerator::default();
        generator.counter.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(generator.next().as_str(), "A0000");
    }
}
