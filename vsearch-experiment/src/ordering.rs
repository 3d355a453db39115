//! Block ordering: keep neighbouring trials in different distractor categories.
//!
//! Two strategies are provided. [`OrderingStrategy::Interleave`] builds the
//! order directly and only fails when no valid order exists.
//! [`OrderingStrategy::Rejection`] shuffles and checks up to a fixed number of
//! times. Both hand back their best attempt on failure so the caller can keep
//! going.

use crate::config::OrderingStrategy;
use rand::Rng;
use rand::seq::SliceRandom;
use vsearch_core::Categorized;

/// A block that could not be ordered without neighbouring repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingFailure<T> {
    /// Every input item exactly once, with as few repeats as the strategy found
    pub best_effort: Vec<T>,
    pub attempts: u32,
    pub adjacent_repeats: usize,
}

/// Number of neighbouring pairs sharing a category. A match between
/// `previous` and the first item counts too.
pub fn adjacent_repeats<T: Categorized>(items: &[T], previous: Option<&str>) -> usize {
    let boundary = match (previous, items.first()) {
        (Some(prev), Some(first)) if first.category() == prev => 1,
        _ => 0,
    };
    boundary
        + items
            .windows(2)
            .filter(|w| w[0].category() == w[1].category())
            .count()
}

fn distinct_categories<T: Categorized>(items: &[T]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for item in items {
        if !seen.contains(&item.category()) {
            seen.push(item.category());
        }
    }
    seen.len()
}

impl OrderingStrategy {
    /// Put `items` in a random order with no two neighbours of the same
    /// category. `previous` is the category emitted just before this block,
    /// if the order has to respect it.
    ///
    /// With fewer than two categories the constraint cannot apply and the
    /// items are just shuffled.
    pub fn arrange<T, R>(
        &self,
        mut items: Vec<T>,
        previous: Option<&str>,
        rng: &mut R,
    ) -> Result<Vec<T>, OrderingFailure<T>>
    where
        T: Categorized + Clone,
        R: Rng + ?Sized,
    {
        if distinct_categories(&items) < 2 {
            items.shuffle(rng);
            return Ok(items);
        }
        match *self {
            OrderingStrategy::Interleave => interleave(items, previous, rng),
            OrderingStrategy::Rejection { max_attempts } => {
                rejection(items, previous, max_attempts, rng)
            }
        }
    }
}

struct Bucket<T> {
    label: String,
    items: Vec<T>,
}

fn into_buckets<T: Categorized>(items: Vec<T>) -> Vec<Bucket<T>> {
    let mut buckets: Vec<Bucket<T>> = Vec::new();
    for item in items {
        match buckets.iter_mut().find(|b| b.label == item.category()) {
            Some(bucket) => bucket.items.push(item),
            None => buckets.push(Bucket {
                label: item.category().to_string(),
                items: vec![item],
            }),
        }
    }
    buckets
}

/// Whether the items left after taking one from `taken` can still be ordered
/// without repeats, given that they may not start with `taken`'s category.
///
/// For `rest` items a category fits iff its count is at most `ceil(rest / 2)`;
/// the forbidden first category loses a slot and gets `floor(rest / 2)`.
fn remainder_feasible<T>(buckets: &[Bucket<T>], taken: usize) -> bool {
    let rest = buckets.iter().map(|b| b.items.len()).sum::<usize>() - 1;
    buckets.iter().enumerate().all(|(j, b)| {
        if j == taken {
            b.items.len() - 1 <= rest / 2
        } else {
            b.items.len() <= rest.div_ceil(2)
        }
    })
}

/// Random pick, weighted by bucket size, among the moves that keep a valid
/// order reachable. `None` means no valid order exists from here.
fn pick_feasible<T, R>(buckets: &[Bucket<T>], last: Option<usize>, rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<(usize, usize)> = buckets
        .iter()
        .enumerate()
        .filter(|&(i, b)| !b.items.is_empty() && Some(i) != last && remainder_feasible(buckets, i))
        .map(|(i, b)| (i, b.items.len()))
        .collect();

    let total: usize = candidates.iter().map(|&(_, w)| w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_range(0..total);
    for &(i, weight) in &candidates {
        if roll < weight {
            return Some(i);
        }
        roll -= weight;
    }
    None
}

/// Largest bucket other than `last`; `last` itself once nothing else is left.
fn pick_largest<T>(buckets: &[Bucket<T>], last: Option<usize>) -> Option<usize> {
    buckets
        .iter()
        .enumerate()
        .filter(|&(i, b)| !b.items.is_empty() && Some(i) != last)
        .max_by_key(|&(i, b)| (b.items.len(), std::cmp::Reverse(i)))
        .map(|(i, _)| i)
        .or_else(|| last.filter(|&i| !buckets[i].items.is_empty()))
}

fn interleave<T, R>(
    items: Vec<T>,
    previous: Option<&str>,
    rng: &mut R,
) -> Result<Vec<T>, OrderingFailure<T>>
where
    T: Categorized,
    R: Rng + ?Sized,
{
    let total = items.len();
    let mut buckets = into_buckets(items);
    for bucket in &mut buckets {
        bucket.items.shuffle(rng);
    }

    let mut last = previous.and_then(|p| buckets.iter().position(|b| b.label == p));
    let mut out = Vec::with_capacity(total);
    let mut repeats = 0;

    while out.len() < total {
        let Some(next) =
            pick_feasible(&buckets, last, rng).or_else(|| pick_largest(&buckets, last))
        else {
            break;
        };
        if Some(next) == last {
            repeats += 1;
        }
        if let Some(item) = buckets[next].items.pop() {
            out.push(item);
        }
        last = Some(next);
    }

    if repeats == 0 {
        Ok(out)
    } else {
        Err(OrderingFailure {
            best_effort: out,
            attempts: 1,
            adjacent_repeats: repeats,
        })
    }
}

fn rejection<T, R>(
    mut items: Vec<T>,
    previous: Option<&str>,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<T>, OrderingFailure<T>>
where
    T: Categorized + Clone,
    R: Rng + ?Sized,
{
    let mut best: Option<(usize, Vec<T>)> = None;
    for _ in 0..max_attempts {
        items.shuffle(rng);
        let repeats = adjacent_repeats(&items, previous);
        if repeats == 0 {
            return Ok(items);
        }
        if best.as_ref().is_none_or(|(fewest, _)| repeats < *fewest) {
            best = Some((repeats, items.clone()));
        }
    }

    let (adjacent_repeats, best_effort) = match best {
        Some(found) => found,
        None => (adjacent_repeats(&items, previous), items),
    };
    Err(OrderingFailure {
        best_effort,
        attempts: max_attempts,
        adjacent_repeats,
    })
}
