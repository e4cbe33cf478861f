//! Dense minimum-rank ("competition") ranking.

/// A keyed value annotated with its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<K> {
    pub key: K,
    pub value: f64,
    pub rank: u32,
}

/// Rank entries by value descending using minimum-rank semantics.
///
/// Ties share the lower rank number and the next distinct value skips
/// ahead: values `[10, 10, 5]` rank as `[1, 1, 3]`. Ties are ordered by
/// key ascending so output is reproducible for a fixed input.
pub fn rank_descending<K: Ord>(mut entries: Vec<(K, f64)>) -> Vec<Ranked<K>> {
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut ranked = Vec::with_capacity(entries.len());
    let mut prev_value: Option<f64> = None;
    let mut current_rank = 1u32;

    for (i, (key, value)) in entries.into_iter().enumerate() {
        if prev_value != Some(value) {
            current_rank = i as u32 + 1;
        }
        prev_value = Some(value);
        ranked.push(Ranked {
            key,
            value,
            rank: current_rank,
        });
    }

    ranked
}
