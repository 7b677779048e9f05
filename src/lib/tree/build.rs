use std::mem;

use crate::geom::Prim;
use crate::geom::bbox::BBox;

pub const MAX_DEPTH: usize = 50;

// A node at or below this many primitives is never split
pub const LEAF_PRIM_LIMIT: usize = 6;

// Below this count the cost model is skipped in favor of a
// perfectly balanced median split
pub const MEDIAN_SPLIT_LIMIT: usize = 20;

pub const SAH_TRY_COUNT: usize = 5;
pub const SAH_TRAVERSAL_COST: f32 = 0.125;

// Diagnostic counters, not consulted for correctness
#[derive(Clone, Copy, Default)]
#[derive(Debug)]
#[derive(serde::Serialize)]
pub struct Stats {
    pub depth: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub max_leaf: usize,
    pub prims: usize,
}

// Children are arena indices; a node without them is a leaf.
// `items` holds primitive indices and is emptied once distributed
#[derive(Debug)]
pub struct Node {
    pub bounds: BBox,
    pub children: Option<[usize; 2]>,
    pub items: Vec<usize>,
    pub axis: usize,
}

pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub stats: Stats,
}

impl Tree {
    pub fn build(prims: &[&Prim]) -> Self {
        let mut bounds = BBox::EMPTY;

        for prim in prims {
            prim.expand_box(&mut bounds);
        }

        let root = Node {
            bounds,
            children: None,
            items: (0..prims.len()).collect(),
            axis: 0,
        };

        let mut tree = Self {
            nodes: vec![root],
            stats: Stats {
                nodes: 1,
                prims: prims.len(),
                ..Default::default()
            },
        };

        tree.split(0, 0, prims);

        tree
    }

    fn seal_leaf(&mut self, at: usize, depth: usize) {
        let count = self.nodes[at].items.len();

        self.stats.leaves += 1;
        self.stats.max_leaf = self.stats.max_leaf.max(count);
        self.stats.depth = self.stats.depth.max(depth);
    }

    fn push_node(&mut self, items: Vec<usize>, prims: &[&Prim]) -> usize {
        let mut bounds = BBox::EMPTY;

        for &item in &items {
            prims[item].expand_box(&mut bounds);
        }

        let at = self.nodes.len();

        self.nodes.push(Node {
            bounds,
            children: None,
            items,
            axis: 0,
        });

        at
    }

    fn split(&mut self, at: usize, depth: usize, prims: &[&Prim]) {
        let count = self.nodes[at].items.len();

        if depth > MAX_DEPTH || count <= LEAF_PRIM_LIMIT {
            self.seal_leaf(at, depth);

            return;
        }

        // The bounding box of the item centroids picks the split axis
        let mut centroids = BBox::EMPTY;

        for &item in &self.nodes[at].items {
            centroids.add_point(prims[item].centroid());
        }

        let axis = centroids.longest_axis();

        self.nodes[at].axis = axis;

        let key = |item: usize| prims[item].centroid()[axis];

        let (fst, snd) = if count < MEDIAN_SPLIT_LIMIT {
            // Median split by index: both halves stay balanced
            // regardless of the spatial distribution
            let mut items = mem::take(&mut self.nodes[at].items);

            let mid = count / 2;

            items.select_nth_unstable_by(mid, |&a, &b| {
                key(a).total_cmp(&key(b))
            });

            let snd = items.split_off(mid);

            (items, snd)
        } else {
            let Some(split) = self.sah_split(at, &centroids, axis, prims) else {
                // No candidate beat leaving the node whole
                self.seal_leaf(at, depth);

                return;
            };

            let items = mem::take(&mut self.nodes[at].items);

            items.into_iter().partition(|&item| key(item) < split)
        };

        let fst = self.push_node(fst, prims);
        let snd = self.push_node(snd, prims);

        self.nodes[at].children = Some([fst, snd]);

        self.stats.nodes += 2;

        self.split(fst, depth + 1, prims);
        self.split(snd, depth + 1, prims);
    }

    // Evaluates the candidate planes and returns the winning split
    // value, or None when keeping the node whole is cheaper
    fn sah_split(
        &self,
        at: usize,
        centroids: &BBox,
        axis: usize,
        prims: &[&Prim],
    ) -> Option<f32> {
        let items = &self.nodes[at].items;

        let parent_area = self.nodes[at].bounds.surface_area();

        let mut best: Option<(f32, f32)> = None;

        for try_idx in 0..SAH_TRY_COUNT {
            let ratio = (try_idx + 1) as f32 / (SAH_TRY_COUNT + 1) as f32;

            // Reversed lerp: ratio 0 maps to the maximum, ratio 1 to
            // the minimum. The partition below applies the same plane,
            // so the mapping stays self-consistent
            let split = centroids.min[axis] * ratio
                + centroids.max[axis] * (1. - ratio);

            let mut fst_bounds = BBox::EMPTY;
            let mut snd_bounds = BBox::EMPTY;

            let mut fst_count = 0usize;
            let mut snd_count = 0usize;

            for &item in items {
                if prims[item].centroid()[axis] < split {
                    prims[item].expand_box(&mut fst_bounds);

                    fst_count += 1;
                } else {
                    prims[item].expand_box(&mut snd_bounds);

                    snd_count += 1;
                }
            }

            // An unpopulated side contributes nothing
            let fst_term = match fst_count {
                0 => 0.,
                n => fst_bounds.surface_area() * n as f32,
            };

            let snd_term = match snd_count {
                0 => 0.,
                n => snd_bounds.surface_area() * n as f32,
            };

            let cost = SAH_TRAVERSAL_COST
                + (fst_term + snd_term) / parent_area;

            if best.map_or(true, |(prev, _)| cost < prev) {
                best = Some((cost, split));
            }
        }

        // Not splitting costs one test per primitive
        best.and_then(|(cost, split)| {
            (cost <= items.len() as f32).then_some(split)
        })
    }
}
