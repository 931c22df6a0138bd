//! Per-frame input boundary.
//!
//! The engine never polls devices. The host samples them once per frame
//! and hands an immutable [`InputSnapshot`] to [`GameWorld::update`].
//!
//! [`GameWorld::update`]: crate::game_loop::GameWorld::update

use bytemuck::{Pod, Zeroable};

/// Logical keys, one bit each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Key {
    /// Move forward.
    Forward = 0,
    /// Move backward.
    Back = 1,
    /// Strafe left.
    Left = 2,
    /// Strafe right.
    Right = 3,
    /// Primary action.
    Fire = 4,
    /// Toggle pause.
    Pause = 5,
}

impl Key {
    const fn bit(self) -> u64 {
        1 << self as u8
    }
}

/// Immutable input state for one frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InputSnapshot {
    /// Bitmask of held keys.
    pub keys_down: u64,
    /// Bitmask of keys pressed this frame.
    pub keys_pressed: u64,
    /// Cursor position in window coordinates.
    pub cursor: [f32; 2],
}

impl InputSnapshot {
    /// Snapshot with nothing held.
    pub const EMPTY: Self = Self {
        keys_down: 0,
        keys_pressed: 0,
        cursor: [0.0; 2],
    };

    /// Marks a key as held and newly pressed.
    #[must_use]
    pub const fn with_pressed(mut self, key: Key) -> Self {
        self.keys_down |= key.bit();
        self.keys_pressed |= key.bit();
        self
    }

    /// Whether `key` is held.
    #[inline]
    #[must_use]
    pub const fn is_down(&self, key: Key) -> bool {
        self.keys_down & key.bit() != 0
    }

    /// Whether `key` went down this frame.
    #[inline]
    #[must_use]
    pub const fn was_pressed(&self, key: Key) -> bool {
        self.keys_pressed & key.bit() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bits() {
        let input = InputSnapshot::EMPTY.with_pressed(Key::Fire);
        assert!(input.is_down(Key::Fire));
        assert!(input.was_pressed(Key::Fire));
        assert!(!input.is_down(Key::Pause));
        assert_eq!(std::mem::size_of::<InputSnapshot>(), 24);
    }
}
