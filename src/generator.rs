use crate::types::{MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_DRAW, WinningCombination};
use rand::Rng;
use rand::seq::index;
use std::collections::HashSet;
use tracing::{debug, warn};

const PROGRESS_EVERY: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Found(WinningCombination),
    Exhausted { attempts: u64 },
}

/// How a batch treats combinations it has already handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Each pick is checked against the history only.
    #[default]
    AllowDuplicates,
    /// Picks are also checked against earlier picks of the same batch.
    Distinct,
}

/// Rejection-samples a combination that is not in `known`, giving up after
/// `max_attempts` draws.
pub fn generate<R>(
    known: &HashSet<WinningCombination>,
    max_attempts: u64,
    rng: &mut R,
) -> Generation
where
    R: Rng + ?Sized,
{
    sample_until(max_attempts, rng, |candidate| known.contains(candidate))
}

/// Produces up to `count` combinations against one fixed history snapshot.
/// The batch ends early at the first exhaustion.
pub fn generate_batch<R>(
    known: &HashSet<WinningCombination>,
    count: usize,
    max_attempts: u64,
    mode: BatchMode,
    rng: &mut R,
) -> Vec<WinningCombination>
where
    R: Rng + ?Sized,
{
    let mut batch = Vec::with_capacity(count);
    let mut issued: HashSet<WinningCombination> = HashSet::new();

    for i in 0..count {
        let outcome = match mode {
            BatchMode::AllowDuplicates => generate(known, max_attempts, rng),
            BatchMode::Distinct => sample_until(max_attempts, rng, |candidate| {
                known.contains(candidate) || issued.contains(candidate)
            }),
        };

        match outcome {
            Generation::Found(combination) => {
                debug!("[{}/{}] picked {}", i + 1, count, combination);
                if mode == BatchMode::Distinct {
                    issued.insert(combination);
                }
                batch.push(combination);
            }
            Generation::Exhausted { .. } => {
                warn!(
                    "stopping after {} of {} combinations: no unused combination found",
                    batch.len(),
                    count
                );
                break;
            }
        }
    }

    batch
}

fn sample_until<R, F>(max_attempts: u64, rng: &mut R, is_taken: F) -> Generation
where
    R: Rng + ?Sized,
    F: Fn(&WinningCombination) -> bool,
{
    let pool = usize::from(MAX_NUMBER - MIN_NUMBER + 1);

    for attempt in 1..=max_attempts {
        let mut numbers = [0u8; NUMBERS_PER_DRAW];
        let picks = index::sample(rng, pool, NUMBERS_PER_DRAW);
        for (slot, picked) in numbers.iter_mut().zip(picks.iter()) {
            *slot = picked as u8 + MIN_NUMBER;
        }
        let candidate = WinningCombination::from_distinct(numbers);

        if !is_taken(&candidate) {
            return Generation::Found(candidate);
        }

        if attempt % PROGRESS_EVERY == 0 {
            debug!("{} attempts so far without an unused combination", attempt);
        }
    }

    warn!("⚠ no unused combination found within {} attempts", max_attempts);
    Generation::Exhausted {
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn combo(numbers: [i64; 6]) -> WinningCombination {
        WinningCombination::new(&numbers).unwrap()
    }

    #[test]
    fn never_returns_a_known_combination() {
        let known: HashSet<_> = [combo([1, 2, 3, 4, 5, 6])].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            match generate(&known, 10, &mut rng) {
                Generation::Found(c) => assert!(!known.contains(&c)),
                Generation::Exhausted { .. } => panic!("a single known combination cannot exhaust"),
            }
        }
    }

    #[test]
    fn generated_combinations_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let Generation::Found(c) = generate(&HashSet::new(), 1, &mut rng) else {
                panic!("empty history cannot exhaust");
            };
            let n = c.numbers();
            assert!(n.windows(2).all(|w| w[0] < w[1]));
            assert!(n.iter().all(|&x| (1..=45).contains(&x)));
        }
    }

    #[test]
    fn every_number_can_be_drawn() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        for _ in 0..2_000 {
            if let Generation::Found(c) = generate(&HashSet::new(), 1, &mut rng) {
                seen.extend(c.numbers().iter().copied());
            }
        }
        assert_eq!(seen.len(), 45);
    }

    #[test]
    fn saturated_history_exhausts_the_budget() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            sample_until(2_000, &mut rng, |_| true),
            Generation::Exhausted { attempts: 2_000 }
        );
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            generate(&HashSet::new(), 0, &mut rng),
            Generation::Exhausted { attempts: 0 }
        );
    }

    #[test]
    fn same_seed_same_batch() {
        let known: HashSet<_> = [combo([5, 10, 15, 20, 25, 30])].into_iter().collect();
        let mode = BatchMode::AllowDuplicates;
        let a = generate_batch(&known, 5, 100, mode, &mut StdRng::seed_from_u64(9));
        let b = generate_batch(&known, 5, 100, mode, &mut StdRng::seed_from_u64(9));
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_batch_has_no_repeats() {
        let known: HashSet<_> = [combo([1, 2, 3, 4, 5, 6])].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(11);

        let batch = generate_batch(&known, 50, 100, BatchMode::Distinct, &mut rng);
        let unique: HashSet<_> = batch.iter().copied().collect();
        assert_eq!(batch.len(), 50);
        assert_eq!(unique.len(), 50);
        assert!(!unique.contains(&combo([1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn batch_stops_at_first_exhaustion() {
        let mut rng = StdRng::seed_from_u64(5);
        let batch = generate_batch(&HashSet::new(), 5, 0, BatchMode::AllowDuplicates, &mut rng);
        assert!(batch.is_empty());
    }
}
