//! Cycle-safe graph traversal
//!
//! Both walks track ancestors rather than globally visited nodes, so a node
//! reachable through several independent paths is visited once per path.
//! Install-list ordering relies on those repeat visits.
//!
//! Node identity is an explicit key extracted by the caller.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::rc::Rc;

/// What a walk should do after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDecision {
    WalkChildren,
    IgnoreChildren,
}

/// Keys from the root down to a node, shared between sibling entries
#[derive(Debug)]
struct Ancestors<K> {
    key: K,
    parent: Option<Rc<Ancestors<K>>>,
}

impl<K: PartialEq> Ancestors<K> {
    fn contains(&self, key: &K) -> bool {
        let mut current = Some(self);
        while let Some(link) = current {
            if link.key == *key {
                return true;
            }
            current = link.parent.as_deref();
        }
        false
    }
}

/// Breadth-first walk from several roots.
///
/// `visit` receives the parent the node was reached from (none for roots).
/// A child is queued only when it does not already appear on the path that
/// led to its parent, which includes the parent itself.
pub fn walk_breadth_first<N, K, R, KF, V, C, I>(roots: R, key_of: KF, mut visit: V, mut children: C)
where
    R: IntoIterator<Item = N>,
    K: PartialEq,
    KF: Fn(&N) -> K,
    V: FnMut(Option<&N>, &N) -> WalkDecision,
    C: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut queue: VecDeque<(N, Option<Rc<N>>, Option<Rc<Ancestors<K>>>)> =
        roots.into_iter().map(|root| (root, None, None)).collect();

    while let Some((node, parent, ancestors)) = queue.pop_front() {
        let path = Rc::new(Ancestors {
            key: key_of(&node),
            parent: ancestors,
        });

        if visit(parent.as_deref(), &node) == WalkDecision::IgnoreChildren {
            continue;
        }

        let next = children(&node);
        let node = Rc::new(node);
        for child in next {
            if !path.contains(&key_of(&child)) {
                queue.push_back((child, Some(Rc::clone(&node)), Some(Rc::clone(&path))));
            }
        }
    }
}

/// Depth-first, pre-order walk from a single root.
///
/// A node is skipped only while it is on the active path; once the branch
/// that opened it returns, a sibling branch may visit it again.
pub fn walk_depth_first<N, K, KF, V, C, I>(root: N, key_of: KF, mut visit: V, mut children: C)
where
    K: Eq + Hash,
    KF: Fn(&N) -> K,
    V: FnMut(Option<&N>, &N) -> WalkDecision,
    C: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut open = HashSet::new();
    descend(&root, None, &key_of, &mut visit, &mut children, &mut open);
}

fn descend<N, K, KF, V, C, I>(
    node: &N,
    parent: Option<&N>,
    key_of: &KF,
    visit: &mut V,
    children: &mut C,
    open: &mut HashSet<K>,
) where
    K: Eq + Hash,
    KF: Fn(&N) -> K,
    V: FnMut(Option<&N>, &N) -> WalkDecision,
    C: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let key = key_of(node);
    open.insert(key);

    if visit(parent, node) == WalkDecision::WalkChildren {
        let next: Vec<N> = children(node).into_iter().collect();
        for child in &next {
            if !open.contains(&key_of(child)) {
                descend(child, Some(node), key_of, visit, children, open);
            }
        }
    }

    open.remove(&key_of(node));
}
