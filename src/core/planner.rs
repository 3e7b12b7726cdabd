//! Route planning over the state graph.
//!
//! Two modes: a plain uniform-cost [`shortest_path`] that ignores predecessor
//! constraints, and the primary [`constrained_path`] best-first search over
//! partial routes that honors per-action predecessor constraints and a
//! must-visit waypoint set. Routes are produced fresh per request and never
//! cached; constraint-aware results are path-dependent.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

use crate::core::graph::{Action, StateGraph};
use crate::core::types::IDENTIFY_STATE;
use crate::error::{Error, Result};

/// Ordered action sequence connecting a source to a target state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub actions: Vec<Action>,
}

impl Route {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Successor of the last action, i.e. where the route ends.
    pub fn final_state(&self) -> Option<&str> {
        self.actions.last().map(|action| action.successor.as_str())
    }
}

/// Uniform-cost shortest path ignoring predecessor constraints.
///
/// Fallback mode: breadth-first over uniform weights, ties broken by
/// action insertion order. Fails with [`Error::NoPathFound`] when the target
/// is unreachable.
pub fn shortest_path(graph: &StateGraph, source: &str, target: &str) -> Result<Route> {
    ensure_endpoints(graph, source, target)?;
    if source == target {
        return Ok(Route::default());
    }

    let mut visited: HashSet<String> = HashSet::from([source.to_string()]);
    let mut parent: HashMap<String, Action> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::from([source.to_string()]);

    while let Some(node) = queue.pop_front() {
        for action in graph.actions_from(&node) {
            if !visited.insert(action.successor.clone()) {
                continue;
            }
            parent.insert(action.successor.clone(), action.clone());
            if action.successor == target {
                return Ok(reconstruct(&parent, source, target));
            }
            queue.push_back(action.successor.clone());
        }
    }

    Err(Error::NoPathFound {
        from: source.to_string(),
        to: target.to_string(),
    })
}

fn reconstruct(parent: &HashMap<String, Action>, source: &str, target: &str) -> Route {
    let mut actions = Vec::new();
    let mut cursor = target.to_string();
    while cursor != source {
        let Some(action) = parent.get(&cursor) else {
            break;
        };
        actions.push(action.clone());
        cursor = action.source.clone();
    }
    actions.reverse();
    Route { actions }
}

/// A partial route under expansion: visited states, the actions that produced
/// them, accumulated cost, and a discovery sequence number for tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    cost: u32,
    seq: u64,
    path: Vec<String>,
    actions: Vec<Action>,
}

impl Ord for Partial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.cmp(&other.cost).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Partial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Predecessor-aware constrained search: the primary planning operation.
///
/// A partial route extends along an action `(u -> v)` only if `v` has not
/// been visited by that route (no revisits) and the action carries no
/// predecessor constraint, or the route has no state before `u`, or that
/// state equals the constraint. Expansion is by ascending accumulated cost
/// with discovery-order tie-break, so the first completed route reaching
/// `target` that contains every `must_visit` state is of minimum cost among
/// constraint-satisfying routes.
///
/// `source == target` yields the empty route. Exhaustion is a normal
/// [`Error::NoPathFound`] outcome for the caller to report.
pub fn constrained_path(
    graph: &StateGraph,
    source: &str,
    target: &str,
    must_visit: &BTreeSet<String>,
) -> Result<Route> {
    ensure_endpoints(graph, source, target)?;
    for waypoint in must_visit {
        if !graph.contains_node(waypoint) {
            return Err(Error::UnknownState(waypoint.clone()));
        }
    }
    if source == target {
        return Ok(Route::default());
    }

    let mut seq = 0u64;
    let mut frontier: BinaryHeap<Reverse<Partial>> = BinaryHeap::new();
    frontier.push(Reverse(Partial {
        cost: 0,
        seq,
        path: vec![source.to_string()],
        actions: Vec::new(),
    }));

    while let Some(Reverse(partial)) = frontier.pop() {
        let Some(last) = partial.path.last() else {
            continue;
        };
        if last == target && must_visit.iter().all(|s| partial.path.contains(s)) {
            return Ok(Route {
                actions: partial.actions,
            });
        }

        let before_last = partial
            .path
            .len()
            .checked_sub(2)
            .map(|index| partial.path[index].as_str());
        for action in graph.actions_from(last) {
            if partial.path.iter().any(|seen| *seen == action.successor) {
                continue;
            }
            if let (Some(required), Some(previous)) = (&action.predecessor, before_last) {
                if required != previous {
                    continue;
                }
            }
            seq += 1;
            let mut path = partial.path.clone();
            path.push(action.successor.clone());
            let mut actions = partial.actions.clone();
            actions.push(action.clone());
            frontier.push(Reverse(Partial {
                cost: partial.cost + 1,
                seq,
                path,
                actions,
            }));
        }
    }

    Err(Error::NoPathFound {
        from: source.to_string(),
        to: target.to_string(),
    })
}

fn ensure_endpoints(graph: &StateGraph, source: &str, target: &str) -> Result<()> {
    graph.state(source)?;
    if graph.contains_node(target) {
        return Ok(());
    }
    if target == IDENTIFY_STATE {
        // Sentinel exists only when some action routes to it; an unreferenced
        // sentinel target is unreachable rather than unknown.
        return Err(Error::NoPathFound {
            from: source.to_string(),
            to: target.to_string(),
        });
    }
    Err(Error::UnknownState(target.to_string()))
}
