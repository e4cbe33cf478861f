//! Generic grouped reduction.
//!
//! One primitive replaces the per-section group-by loops: records are
//! grouped by a caller-supplied key and reduced field-by-field according
//! to a typed reducer configuration. Groups are emitted in first-seen
//! order of the input, so a caller that pre-sorts its records fully
//! controls the output (and running-sum) order.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-output-field reduction behavior.
pub enum Reducer<R> {
    /// Sum of the extracted value across the group.
    Sum(Box<dyn Fn(&R) -> f64>),

    /// Count of distinct extracted values in the group.
    CountDistinct(Box<dyn Fn(&R) -> String>),

    /// Most frequent extracted value; ties broken by first-seen, never by
    /// map iteration order. `None` extractions are skipped.
    Mode(Box<dyn Fn(&R) -> Option<String>>),

    /// Cumulative sum as groups are emitted, in first-seen group order.
    RunningSum(Box<dyn Fn(&R) -> f64>),
}

impl<R> Reducer<R> {
    pub fn sum(f: impl Fn(&R) -> f64 + 'static) -> Self {
        Reducer::Sum(Box::new(f))
    }

    pub fn count_distinct(f: impl Fn(&R) -> String + 'static) -> Self {
        Reducer::CountDistinct(Box::new(f))
    }

    pub fn mode(f: impl Fn(&R) -> Option<String> + 'static) -> Self {
        Reducer::Mode(Box::new(f))
    }

    pub fn running_sum(f: impl Fn(&R) -> f64 + 'static) -> Self {
        Reducer::RunningSum(Box::new(f))
    }
}

/// A reduced output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    Sum(f64),
    Count(u32),
    Mode(Option<String>),
    RunningSum(f64),
}

impl Reduced {
    /// Extract a sum or running sum. Variant mismatch is a programmer
    /// error in the reducer configuration, not a runtime condition.
    pub fn as_sum(&self) -> f64 {
        match self {
            Reduced::Sum(v) | Reduced::RunningSum(v) => *v,
            other => panic!("expected sum, got {:?}", other),
        }
    }

    pub fn as_count(&self) -> u32 {
        match self {
            Reduced::Count(v) => *v,
            other => panic!("expected count, got {:?}", other),
        }
    }

    pub fn as_mode(&self) -> Option<&str> {
        match self {
            Reduced::Mode(v) => v.as_deref(),
            other => panic!("expected mode, got {:?}", other),
        }
    }
}

/// One group with its reduced values, in reducer order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow<K> {
    pub key: K,
    pub values: Vec<Reduced>,
}

// Accumulator mirroring each reducer variant.
enum Acc {
    Sum(f64),
    Distinct(HashSet<String>),
    // value -> (count, first-seen position within the group)
    Mode(HashMap<String, (u32, usize)>),
    Running(f64),
}

/// Group `records` by `key_fn` and reduce each group with `reducers`.
///
/// Grouping uses exact key equality; no normalization happens here.
pub fn aggregate<R, K>(
    records: &[R],
    key_fn: impl Fn(&R) -> K,
    reducers: &[Reducer<R>],
) -> Vec<GroupRow<K>>
where
    K: Ord + Clone,
{
    let mut group_index: BTreeMap<K, usize> = BTreeMap::new();
    let mut group_keys: Vec<K> = Vec::new();
    let mut group_accs: Vec<Vec<Acc>> = Vec::new();
    let mut seen_counter = 0usize;

    for record in records {
        let key = key_fn(record);
        let slot = match group_index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = group_keys.len();
                group_index.insert(key.clone(), slot);
                group_keys.push(key);
                group_accs.push(
                    reducers
                        .iter()
                        .map(|r| match r {
                            Reducer::Sum(_) => Acc::Sum(0.0),
                            Reducer::CountDistinct(_) => Acc::Distinct(HashSet::new()),
                            Reducer::Mode(_) => Acc::Mode(HashMap::new()),
                            Reducer::RunningSum(_) => Acc::Running(0.0),
                        })
                        .collect(),
                );
                slot
            }
        };

        for (reducer, acc) in reducers.iter().zip(group_accs[slot].iter_mut()) {
            match (reducer, acc) {
                (Reducer::Sum(f), Acc::Sum(total)) => *total += f(record),
                (Reducer::CountDistinct(f), Acc::Distinct(values)) => {
                    values.insert(f(record));
                }
                (Reducer::Mode(f), Acc::Mode(counts)) => {
                    if let Some(value) = f(record) {
                        let entry = counts.entry(value).or_insert((0, seen_counter));
                        entry.0 += 1;
                    }
                }
                (Reducer::RunningSum(f), Acc::Running(total)) => *total += f(record),
                _ => unreachable!("accumulator mirrors reducer configuration"),
            }
        }
        seen_counter += 1;
    }

    let mut rows = Vec::with_capacity(group_keys.len());
    let mut running_totals = vec![0.0f64; reducers.len()];

    for (key, accs) in group_keys.into_iter().zip(group_accs) {
        let values = accs
            .into_iter()
            .enumerate()
            .map(|(i, acc)| match acc {
                Acc::Sum(total) => Reduced::Sum(total),
                Acc::Distinct(values) => Reduced::Count(values.len() as u32),
                Acc::Mode(counts) => Reduced::Mode(pick_mode(counts)),
                Acc::Running(total) => {
                    running_totals[i] += total;
                    Reduced::RunningSum(running_totals[i])
                }
            })
            .collect();
        rows.push(GroupRow { key, values });
    }

    rows
}

// Highest count wins; equal counts fall back to the earliest first-seen
// position so the pick is stable for a fixed input order.
fn pick_mode(counts: HashMap<String, (u32, usize)>) -> Option<String> {
    counts
        .into_iter()
        .min_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.1 .1.cmp(&b.1 .1)))
        .map(|(value, _)| value)
}
