//! Production `RandomPort` implementation, backed by `rand`: one real port
//! implementation living in infrastructure, with a `FixedRandom`/
//! `ScriptedRandom` test double living in the domain crate for unit tests.

use rand::Rng;
use txwerewolves_domain::RandomPort;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}
