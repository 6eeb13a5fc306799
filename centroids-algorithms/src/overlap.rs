//! Overlap grouping and pile-up rejection.
//!
//! Candidates whose fitting windows share at least one pixel are connected;
//! connected groups are found with union-find. A group larger than
//! `overlap_max` is an unresolvable pile-up and is dropped whole.

use crate::fit::Candidate;
use centroids_core::{FrameReject, ValidatedParams};

/// Union-Find data structure for connected component detection.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);

        if px == py {
            return;
        }

        match self.rank[px].cmp(&self.rank[py]) {
            std::cmp::Ordering::Less => self.parent[px] = py,
            std::cmp::Ordering::Greater => self.parent[py] = px,
            std::cmp::Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] += 1;
            }
        }
    }
}

/// Outcome of overlap resolution.
#[derive(Debug, Clone)]
pub struct Resolution<'a, P> {
    /// Accepted candidates, in input order.
    pub accepted: Vec<Candidate<'a, P>>,
    /// Rejections, one per discarded candidate.
    pub rejected: Vec<FrameReject>,
    /// Number of discarded groups.
    pub groups_discarded: usize,
}

/// Cluster-level pile-up filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapResolver {
    reach: usize,
    overlap_max: usize,
}

impl OverlapResolver {
    /// Creates a resolver for windows of half-size `box_size`.
    #[must_use]
    pub fn new(box_size: usize, overlap_max: usize) -> Self {
        Self {
            reach: 2 * box_size,
            overlap_max,
        }
    }

    /// Creates a resolver from validated parameters.
    #[must_use]
    pub fn from_params(params: &ValidatedParams) -> Self {
        Self {
            reach: params.overlap_reach(),
            overlap_max: params.overlap_max,
        }
    }

    /// Groups candidates by window intersection and drops oversized groups.
    ///
    /// Candidates are expected in row-major seed order, as produced by the
    /// scanner; the row sweep relies on it.
    #[must_use]
    pub fn resolve<'a, P>(&self, candidates: Vec<Candidate<'a, P>>) -> Resolution<'a, P> {
        let n = candidates.len();
        if n == 0 {
            return Resolution {
                accepted: candidates,
                rejected: Vec::new(),
                groups_discarded: 0,
            };
        }

        let mut uf = UnionFind::new(n);
        for i in 0..n {
            let a = candidates[i].seed;
            for (j, other) in candidates.iter().enumerate().skip(i + 1) {
                let b = other.seed;
                if b.y.saturating_sub(a.y) > self.reach {
                    break;
                }
                if a.x.abs_diff(b.x) <= self.reach {
                    uf.union(i, j);
                }
            }
        }

        let roots: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
        let mut group_size = vec![0usize; n];
        for &root in &roots {
            group_size[root] += 1;
        }
        let groups_discarded = group_size.iter().filter(|&&s| s > self.overlap_max).count();

        let mut accepted = Vec::with_capacity(n);
        let mut rejected = Vec::new();
        for (candidate, root) in candidates.into_iter().zip(roots) {
            let size = group_size[root];
            if size > self.overlap_max {
                rejected.push(FrameReject::PileUp { group_size: size });
            } else {
                accepted.push(candidate);
            }
        }

        Resolution {
            accepted,
            rejected,
            groups_discarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::CentroidFitter;
    use centroids_core::{FitModes, Frame, Seed};

    fn candidates<'a>(frame: Frame<'a, u16>, seeds: &[(usize, usize)]) -> Vec<Candidate<'a, u16>> {
        let fitter = CentroidFitter::new(2, FitModes::EMPTY);
        seeds
            .iter()
            .map(|&(x, y)| fitter.fit(frame, Seed::new(x, y, 1)).unwrap())
            .collect()
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 2);

        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
    }

    #[test]
    fn test_disjoint_windows_kept() {
        let data = vec![0u16; 40 * 40];
        let frame = Frame::new(&data, 40, 40).unwrap();
        // Reach is 4: distance 5 does not overlap
        let c = candidates(frame, &[(5, 5), (10, 5), (5, 10)]);
        let res = OverlapResolver::new(2, 1).resolve(c);
        assert_eq!(res.accepted.len(), 3);
        assert!(res.rejected.is_empty());
        assert_eq!(res.groups_discarded, 0);
    }

    #[test]
    fn test_overlapping_pair() {
        let data = vec![0u16; 40 * 40];
        let frame = Frame::new(&data, 40, 40).unwrap();

        let res = OverlapResolver::new(2, 1).resolve(candidates(frame, &[(5, 5), (9, 9)]));
        assert!(res.accepted.is_empty());
        assert_eq!(res.rejected, vec![FrameReject::PileUp { group_size: 2 }; 2]);
        assert_eq!(res.groups_discarded, 1);

        let res = OverlapResolver::new(2, 2).resolve(candidates(frame, &[(5, 5), (9, 9)]));
        assert_eq!(res.accepted.len(), 2);
    }

    #[test]
    fn test_chained_group_and_order() {
        let data = vec![0u16; 40 * 40];
        let frame = Frame::new(&data, 40, 40).unwrap();
        // (5,5)-(9,5)-(13,5) chain; (30,30) alone. Row-major order.
        let c = candidates(frame, &[(5, 5), (9, 5), (13, 5), (30, 30)]);
        let res = OverlapResolver::new(2, 2).resolve(c);
        assert_eq!(res.accepted.len(), 1);
        assert_eq!(res.accepted[0].seed, Seed::new(30, 30, 1));
        assert_eq!(res.rejected.len(), 3);

        let c = candidates(frame, &[(5, 5), (9, 5), (13, 5), (30, 30)]);
        let res = OverlapResolver::new(2, 3).resolve(c);
        let kept: Vec<_> = res.accepted.iter().map(|c| (c.seed.x, c.seed.y)).collect();
        assert_eq!(kept, vec![(5, 5), (9, 5), (13, 5), (30, 30)]);
    }

    #[test]
    fn test_row_sweep_connects_left_neighbor_on_later_row() {
        let data = vec![0u16; 40 * 40];
        let frame = Frame::new(&data, 40, 40).unwrap();
        // Later row, smaller x: still overlapping
        let c = candidates(frame, &[(20, 5), (17, 8)]);
        let res = OverlapResolver::new(2, 1).resolve(c);
        assert!(res.accepted.is_empty());
    }
}
