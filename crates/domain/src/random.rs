//! Randomness port.
//!
//! The domain crate never calls an RNG crate directly (see the crate's
//! `Cargo.toml`): callers inject a `RandomPort` so the state machines stay
//! deterministic and unit-testable. The engine crate supplies the real
//! implementation backed by `rand`; tests supply a fixed or scripted one.
pub trait RandomPort: Send + Sync {
    /// Inclusive-range integer in `[min, max]`.
    fn gen_range(&self, min: i32, max: i32) -> i32;
}

impl RandomPort for &dyn RandomPort {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        (**self).gen_range(min, max)
    }
}

/// Fisher-Yates shuffle expressed purely in terms of `RandomPort`.
pub fn shuffle<T>(items: &mut [T], rng: &dyn RandomPort) {
    let len = items.len();
    if len < 2 {
        return;
    }
    for i in (1..len).rev() {
        let j = rng.gen_range(0, i as i32) as usize;
        items.swap(i, j);
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FixedRandom(pub i32);

#[cfg(any(test, feature = "test-support"))]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, _max: i32) -> i32 {
        min.max(self.0)
    }
}

#[cfg(any(test, feature = "test-support"))]
/// Replays a scripted sequence of draws, one per call, then repeats the last.
pub struct ScriptedRandom(pub std::cell::RefCell<Vec<i32>>);

#[cfg(any(test, feature = "test-support"))]
impl RandomPort for ScriptedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        let mut draws = self.0.borrow_mut();
        let value = if draws.is_empty() { min } else { draws.remove(0) };
        value.clamp(min, max)
    }
}
