//! Bounded-depth container tree expansion.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::store::ContainerHierarchy;

/// Roots plus every container at most `max_depth` child hops below a root.
///
/// Depth 0 returns exactly the roots. Cycles in the hierarchy are harmless:
/// each container is expanded at most once.
pub async fn resolve_containers<H>(
    hierarchy: &H,
    roots: &BTreeSet<u32>,
    max_depth: u32,
) -> Result<BTreeSet<u32>, StoreError>
where
    H: ContainerHierarchy + ?Sized,
{
    let mut resolved = roots.clone();
    let mut frontier: Vec<u32> = roots.iter().copied().collect();

    for _ in 0..max_depth {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for container in frontier {
            for child in hierarchy.children_of(container).await? {
                if resolved.insert(child) {
                    next.push(child);
                }
            }
        }
        frontier = next;
    }

    tracing::debug!(
        roots = roots.len(),
        depth = max_depth,
        resolved = resolved.len(),
        "expanded container tree"
    );
    Ok(resolved)
}

/// Synchronous variant of [`resolve_containers`] over a child lookup.
pub fn expand_containers(
    roots: &BTreeSet<u32>,
    max_depth: u32,
    mut children_of: impl FnMut(u32) -> Vec<u32>,
) -> BTreeSet<u32> {
    let mut resolved = roots.clone();
    let mut frontier: Vec<u32> = roots.iter().copied().collect();

    for _ in 0..max_depth {
        let mut next = Vec::new();
        for container in frontier {
            for child in children_of(container) {
                if resolved.insert(child) {
                    next.push(child);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    resolved
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    /// 1 -> 2 -> 3 -> 4, and an unrelated root 10 -> 11.
    struct Chain(BTreeMap<u32, Vec<u32>>);

    fn chain() -> Chain {
        Chain(BTreeMap::from([
            (1, vec![2]),
            (2, vec![3]),
            (3, vec![4]),
            (10, vec![11]),
        ]))
    }

    #[async_trait]
    impl ContainerHierarchy for Chain {
        async fn children_of(&self, container: u32) -> Result<Vec<u32>, StoreError> {
            Ok(self.0.get(&container).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn depth_zero_is_roots_only() {
        let resolved = resolve_containers(&chain(), &BTreeSet::from([1]), 0)
            .await
            .unwrap();
        assert_eq!(resolved, BTreeSet::from([1]));
    }

    #[tokio::test]
    async fn depth_one_includes_children_only() {
        let resolved = resolve_containers(&chain(), &BTreeSet::from([1]), 1)
            .await
            .unwrap();
        assert_eq!(resolved, BTreeSet::from([1, 2]));
    }

    #[tokio::test]
    async fn unrelated_roots_stay_out() {
        let resolved = resolve_containers(&chain(), &BTreeSet::from([1]), 99)
            .await
            .unwrap();
        assert_eq!(resolved, BTreeSet::from([1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let cyclic = Chain(BTreeMap::from([(1, vec![2]), (2, vec![1])]));
        let resolved = resolve_containers(&cyclic, &BTreeSet::from([1]), 50)
            .await
            .unwrap();
        assert_eq!(resolved, BTreeSet::from([1, 2]));
    }

    #[test]
    fn sync_expansion_matches() {
        let tree = chain();
        let lookup = |id: u32| tree.0.get(&id).cloned().unwrap_or_default();
        assert_eq!(
            expand_containers(&BTreeSet::from([1, 10]), 2, lookup),
            BTreeSet::from([1, 2, 3, 10, 11])
        );
    }
}
