//! Lock-free primitives shared between the control and audio contexts.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, AtomicUsize as StdAtomicUsize, Ordering};

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: f32) -> f32 {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Clone for AtomicFloat {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
///
/// Dirty flags use [`AtomicFlag::swap`]: the consumer swaps `false` in and
/// acts if the previous value was `true`, so a flag is only ever cleared by
/// the side that consumed it.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    /// Raise the flag.
    #[inline]
    pub fn raise(&self) {
        self.value.store(true, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }

    /// Consume the flag: clears it and returns whether it was raised.
    #[inline]
    pub fn take(&self) -> bool {
        self.value.swap(false, Ordering::AcqRel)
    }
}

impl Clone for AtomicFlag {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Cache-line aligned atomic usize, used for channel counts.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicCount {
    value: StdAtomicUsize,
}

impl AtomicCount {
    pub fn new(value: usize) -> Self {
        Self {
            value: StdAtomicUsize::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: usize) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: usize) -> usize {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Clone for AtomicCount {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicCount {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A direction as an azimuth/elevation pair of independent atomics, degrees.
///
/// The two components are written by the control side at slightly different
/// instants; consumers tolerate the momentary skew, which self-corrects
/// within one block.
#[derive(Debug, Default, Clone)]
pub struct AtomicDirection {
    azimuth: AtomicFloat,
    elevation: AtomicFloat,
}

impl AtomicDirection {
    pub fn new(azimuth_deg: f32, elevation_deg: f32) -> Self {
        Self {
            azimuth: AtomicFloat::new(azimuth_deg),
            elevation: AtomicFloat::new(elevation_deg),
        }
    }

    #[inline]
    pub fn get(&self) -> (f32, f32) {
        (self.azimuth.get(), self.elevation.get())
    }

    #[inline]
    pub fn set(&self, azimuth_deg: f32, elevation_deg: f32) {
        self.azimuth.set(azimuth_deg);
        self.elevation.set(elevation_deg);
    }

    #[inline]
    pub fn azimuth(&self) -> f32 {
        self.azimuth.get()
    }

    #[inline]
    pub fn elevation(&self) -> f32 {
        self.elevation.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_float() {
        let val = AtomicFloat::new(1.0);
        assert_eq!(val.get(), 1.0);
        val.set(2.5);
        assert_eq!(val.get(), 2.5);
        assert_eq!(val.swap(3.0), 2.5);
    }

    #[test]
    fn test_atomic_flag_take() {
        let flag = AtomicFlag::new(false);
        assert!(!flag.take());
        flag.raise();
        assert!(flag.take());
        assert!(!flag.get());
    }

    #[test]
    fn test_atomic_direction_pair() {
        let dir = AtomicDirection::new(45.0, -10.0);
        assert_eq!(dir.get(), (45.0, -10.0));
        dir.set(-90.0, 30.0);
        assert_eq!(dir.azimuth(), -90.0);
        assert_eq!(dir.elevation(), 30.0);
    }
}
