//! Finds a path of migration steps between two schema versions.

use std::collections::HashMap;

use crate::error::{Error, Kind};
use crate::version::Version;

/// The minimal shape the planner needs from a migration step: it never
/// looks at `apply`, only at the versions a step bridges.
pub trait Step {
    fn base(&self) -> Version;
    fn target(&self) -> Version;
}

/// Resolves an ordered path of steps from `src` to `dest` over the
/// user-supplied `steps`, using a greedy longest-jump policy: for an
/// upgrade, prefer the single largest jump that does not overshoot `dest`;
/// for a downgrade, prefer the smallest jump (closest downgrade first).
/// Returns the indices of `steps`, in application order.
pub fn plan<S: Step>(steps: &[S], src: Version, dest: Version) -> Result<Vec<usize>, Error> {
    if src == dest {
        return Ok(Vec::new());
    }

    let index = index_by_base(steps);
    let is_upgrade = src < dest;
    let mut current = src;
    let mut path = Vec::new();

    while current != dest {
        let candidates = index.get(&current).map(Vec::as_slice).unwrap_or(&[]);
        if candidates.is_empty() {
            return Err(path_not_found(src, dest));
        }

        let mut step_found = None;
        if is_upgrade {
            // descending target order: largest jump that doesn't overshoot
            for &(idx, target) in candidates.iter().rev() {
                if target <= dest {
                    step_found = Some((idx, target));
                    break;
                }
            }
        } else {
            // ascending target order: smallest downgrade first
            for &(idx, target) in candidates.iter() {
                if target >= dest {
                    step_found = Some((idx, target));
                    break;
                }
            }
        }

        match step_found {
            Some((idx, target)) => {
                path.push(idx);
                current = target;
            }
            None => return Err(path_not_found(src, dest)),
        }
    }

    Ok(path)
}

fn path_not_found(from: Version, to: Version) -> Error {
    Error::new(Kind::PathNotFound { from, to })
}

/// Groups step indices by their base version, with each group's candidates
/// sorted by target version ascending (so upgrade search scans descending
/// via `.rev()` and downgrade search scans ascending directly).
fn index_by_base<S: Step>(steps: &[S]) -> HashMap<Version, Vec<(usize, Version)>> {
    let mut index: HashMap<Version, Vec<(usize, Version)>> = HashMap::new();
    for (idx, step) in steps.iter().enumerate() {
        index.entry(step.base()).or_default().push((idx, step.target()));
    }
    for candidates in index.values_mut() {
        candidates.sort_by_key(|&(_, target)| target);
    }
    index
}
