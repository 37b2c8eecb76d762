use crate::Result;
use crate::Transform;
use tangle_core::seed::Seed;
use tangle_core::Method;
use tracing::{debug, info};

/// Trait for running a sequence of obfuscation transforms over a file's methods.
pub trait Pass {
    /// Runs every transform over every method, returning for each method the names of the
    /// transforms that changed it.
    fn run(
        &self,
        methods: &mut [Method],
        passes: &[Box<dyn Transform>],
        seed: &Seed,
    ) -> Result<Vec<Vec<&'static str>>>;
}

/// Default implementation of the Pass trait.
///
/// Methods are processed in source order, each to completion before the next, with a single
/// RNG derived from the seed so a given seed and input always give the same output.
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(
        &self,
        methods: &mut [Method],
        passes: &[Box<dyn Transform>],
        seed: &Seed,
    ) -> Result<Vec<Vec<&'static str>>> {
        let mut rng = seed.rng();
        let mut applied = vec![Vec::new(); methods.len()];

        for pass in passes {
            let mut changed = 0usize;

            for (method, applied) in methods.iter_mut().zip(applied.iter_mut()) {
                let mut snapshot = method.clone();
                if !pass.apply(&mut snapshot, &mut rng)? {
                    debug!("{}: {} unchanged", pass.name(), method.name());
                    continue;
                }

                *method = snapshot;
                applied.push(pass.name());
                changed += 1;
            }

            info!("{:>14} {}/{} methods", pass.name(), changed, methods.len());
        }

        Ok(applied)
    }
}
