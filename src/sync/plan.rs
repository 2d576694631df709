use std::collections::{HashMap, VecDeque};

use crate::track::TrackId;

/// One positional edit of a destination playlist. Positions refer to the
/// playlist as it is right before the operation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    Insert { track: TrackId, position: usize },
    Remove { position: usize },
    /// Take the item at `from` out and put it back at `to` of the shortened
    /// list.
    Move { from: usize, to: usize },
}

/// Ordered edits turning a current playlist into a desired one.
///
/// Built from the longest common subsequence of both ID sequences: items on
/// it are never touched. Remaining current items are removed, remaining
/// desired items inserted, and an item that is both removed and inserted
/// becomes a single move. Operations must be applied in order: removals
/// from the highest position down, then moves, then insertions from the
/// lowest position up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    ops: Vec<SyncOp>,
}

impl SyncPlan {
    pub fn diff(current: &[TrackId], desired: &[TrackId]) -> Self {
        let pairs = lcs_pairs(current, desired);

        let mut stable_current = vec![false; current.len()];
        // For each desired position, the current index of the item that ends
        // up there, once that item is in its final relative place.
        let mut placed: Vec<Option<usize>> = vec![None; desired.len()];
        for &(c, d) in &pairs {
            stable_current[c] = true;
            placed[d] = Some(c);
        }

        let mut leftovers: HashMap<&TrackId, VecDeque<usize>> = HashMap::new();
        for (c, id) in current.iter().enumerate() {
            if !stable_current[c] {
                leftovers.entry(id).or_default().push_back(c);
            }
        }

        let mut moves = Vec::new();
        let mut inserts = Vec::new();
        for (d, id) in desired.iter().enumerate() {
            if placed[d].is_some() {
                continue;
            }
            match leftovers.get_mut(id).and_then(VecDeque::pop_front) {
                Some(c) => moves.push((d, c)),
                None => inserts.push(d),
            }
        }
        let mut removals: Vec<usize> = leftovers.into_values().flatten().collect();
        removals.sort_unstable();

        let mut ops = Vec::with_capacity(removals.len() + moves.len() + inserts.len());

        // Items are tracked by their index in `current` while they shift.
        let mut working: Vec<usize> = (0..current.len()).collect();
        for &c in removals.iter().rev() {
            working.remove(c);
            ops.push(SyncOp::Remove { position: c });
        }

        for (d, c) in moves {
            let Some(from) = working.iter().position(|&w| w == c) else {
                continue;
            };
            working.remove(from);
            let to = match (0..d).rev().find_map(|p| placed[p]) {
                Some(before) => working
                    .iter()
                    .position(|&w| w == before)
                    .map_or(0, |p| p + 1),
                None => 0,
            };
            working.insert(to, c);
            placed[d] = Some(c);
            if from != to {
                ops.push(SyncOp::Move { from, to });
            }
        }

        for d in inserts {
            ops.push(SyncOp::Insert {
                track: desired[d].clone(),
                position: d,
            });
        }

        Self { ops }
    }

    pub fn ops(&self) -> &[SyncOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Number of removals, moves and insertions.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.ops
            .iter()
            .fold((0, 0, 0), |(r, m, i), op| match op {
                SyncOp::Remove { .. } => (r + 1, m, i),
                SyncOp::Move { .. } => (r, m + 1, i),
                SyncOp::Insert { .. } => (r, m, i + 1),
            })
    }

    /// Replays the plan on a local copy of `current`.
    #[cfg(test)]
    pub fn apply(&self, current: &[TrackId]) -> Vec<TrackId> {
        let mut items = current.to_vec();
        for op in &self.ops {
            match op {
                SyncOp::Insert { track, position } => items.insert(*position, track.clone()),
                SyncOp::Remove { position } => {
                    items.remove(*position);
                }
                SyncOp::Move { from, to } => {
                    let item = items.remove(*from);
                    items.insert(*to, item);
                }
            }
        }
        items
    }
}

/// Index pairs `(current, desired)` of one longest common subsequence, in
/// ascending order.
fn lcs_pairs(a: &[TrackId], b: &[TrackId]) -> Vec<(usize, usize)> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    // table[i * width + j] = LCS length of a_mid[i..] and b_mid[j..]
    let width = b_mid.len() + 1;
    let mut table = vec![0u32; (a_mid.len() + 1) * width];
    for i in (0..a_mid.len()).rev() {
        for j in (0..b_mid.len()).rev() {
            table[i * width + j] = if a_mid[i] == b_mid[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    let (mut i, mut j) = (0, 0);
    while i < a_mid.len() && j < b_mid.len() {
        if a_mid[i] == b_mid[j] {
            pairs.push((prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs.extend((0..suffix).map(|k| (a.len() - suffix + k, b.len() - suffix + k)));
    pairs
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ids(names: &[&str]) -> Vec<TrackId> {
        names.iter().map(|n| TrackId::new(*n)).collect()
    }

    #[test]
    fn removes_head_and_appends_tail() {
        let current = ids(&["A", "B", "C"]);
        let desired = ids(&["B", "C", "D"]);
        let plan = SyncPlan::diff(&current, &desired);

        assert_eq!(
            plan.ops(),
            &[
                SyncOp::Remove { position: 0 },
                SyncOp::Insert {
                    track: TrackId::new("D"),
                    position: 2
                },
            ]
        );
        assert_eq!(plan.apply(&current), desired);
    }

    #[test]
    fn identical_sequences_need_no_operations() {
        let current = ids(&["A", "B", "C", "A"]);
        assert!(SyncPlan::diff(&current, &current).is_empty());
        assert!(SyncPlan::diff(&[], &[]).is_empty());
    }

    #[test]
    fn reordered_track_is_moved_not_reinserted() {
        let current = ids(&["A", "B", "C", "D"]);
        let desired = ids(&["D", "A", "B", "C"]);
        let plan = SyncPlan::diff(&current, &desired);

        assert_eq!(plan.ops(), &[SyncOp::Move { from: 3, to: 0 }]);
        assert_eq!(plan.apply(&current), desired);
    }

    #[test]
    fn removals_run_from_the_highest_position() {
        let current = ids(&["A", "X", "B", "Y", "C"]);
        let desired = ids(&["A", "B", "C"]);
        let plan = SyncPlan::diff(&current, &desired);

        assert_eq!(
            plan.ops(),
            &[SyncOp::Remove { position: 3 }, SyncOp::Remove { position: 1 }]
        );
    }

    #[test]
    fn insertions_run_from_the_lowest_position() {
        let plan = SyncPlan::diff(&[], &ids(&["A", "B"]));
        assert_eq!(
            plan.ops(),
            &[
                SyncOp::Insert {
                    track: TrackId::new("A"),
                    position: 0
                },
                SyncOp::Insert {
                    track: TrackId::new("B"),
                    position: 1
                },
            ]
        );
        assert_eq!(plan.counts(), (0, 0, 2));
    }

    #[test]
    fn duplicates_are_preserved() {
        let current = ids(&["A", "B"]);
        let desired = ids(&["A", "B", "A", "A"]);
        let plan = SyncPlan::diff(&current, &desired);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.apply(&current), desired);
    }

    fn sequence() -> impl Strategy<Value = Vec<TrackId>> {
        prop::collection::vec((0u8..8).prop_map(|n| TrackId::new(n.to_string())), 0..24)
    }

    proptest! {
        /// Replaying a plan always lands exactly on the desired sequence
        #[test]
        fn plan_transforms_current_into_desired(current in sequence(), desired in sequence()) {
            let plan = SyncPlan::diff(&current, &desired);
            prop_assert_eq!(plan.apply(&current), desired);
        }

        /// No plan does more edits than removing and inserting everything
        /// off the common subsequence
        #[test]
        fn plan_is_bounded_by_the_common_subsequence(current in sequence(), desired in sequence()) {
            let plan = SyncPlan::diff(&current, &desired);
            let common = lcs_pairs(&current, &desired).len();
            prop_assert!(plan.len() <= current.len() + desired.len() - 2 * common);
        }

        /// Running the diff again after applying it finds nothing to do
        #[test]
        fn applied_plan_is_idempotent(current in sequence(), desired in sequence()) {
            let synced = SyncPlan::diff(&current, &desired).apply(&current);
            prop_assert!(SyncPlan::diff(&synced, &desired).is_empty());
        }
    }
}
