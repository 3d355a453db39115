use crate::config::ExperimentParameters;
use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffled keys handed out to rest breaks, each at most once per run
#[derive(Debug, Clone)]
pub struct KeyPool {
    keys: Vec<char>,
}

impl KeyPool {
    pub fn new<R: Rng + ?Sized>(mut keys: Vec<char>, rng: &mut R) -> Self {
        keys.sort_unstable();
        keys.dedup();
        keys.shuffle(rng);
        Self { keys }
    }

    /// Pool of `a..=z` without the task's response keys
    pub fn for_parameters<R: Rng + ?Sized>(params: &ExperimentParameters, rng: &mut R) -> Self {
        Self::new(params.break_key_candidates(), rng)
    }

    pub fn draw(&mut self) -> Option<char> {
        self.keys.pop()
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResponseKeys;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn draws_each_key_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = KeyPool::new(vec!['a', 'b', 'c'], &mut rng);
        let mut drawn: Vec<char> = std::iter::from_fn(|| pool.draw()).collect();
        drawn.sort_unstable();
        assert_eq!(drawn, vec!['a', 'b', 'c']);
        assert_eq!(pool.draw(), None);
    }

    #[test]
    fn excludes_response_keys() {
        let params = ExperimentParameters {
            response_keys: ResponseKeys {
                present: 'Z',
                absent: 'm',
            },
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let mut pool = KeyPool::for_parameters(&params, &mut rng);
        assert_eq!(pool.remaining(), 24);
        while let Some(key) = pool.draw() {
            assert!(key != 'z' && key != 'm');
        }
    }
}
