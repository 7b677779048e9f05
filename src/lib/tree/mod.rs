pub mod build;

pub use build::{Stats, Tree};

use crate::geom;
use crate::geom::Prim;

// The construction tree gets rendered down into a pre-order array of
// GpuNode records. A node's left child is always the record that
// immediately follows it, so only the right child's position is stored
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuNode {
    pub min: [f32; 3],
    pub parent: u32,
    pub max: [f32; 3],
    pub right: u32,
    pub prim_offset: u32,
    pub prim_count: u32,
    _p0: u32,
    _p1: u32,
}

#[derive(Clone, Default)]
pub struct FlatBvh {
    pub nodes: Vec<GpuNode>,
    pub order: Vec<u32>,
}

impl FlatBvh {
    // Renders the finished construction tree down from its root
    pub fn new(tree: &Tree) -> Self {
        let mut data = Self::default();

        fn emit(data: &mut FlatBvh, tree: &Tree, at: usize, parent: u32) {
            let record = data.nodes.len();

            let node = &tree.nodes[at];

            data.nodes.push(GpuNode {
                min: node.bounds.min,
                parent,
                max: node.bounds.max,
                right: 0,
                prim_offset: 0,
                prim_count: 0,
                _p0: 0,
                _p1: 0,
            });

            match node.children {
                None => {
                    data.nodes[record].prim_offset = data.order.len() as u32;
                    data.nodes[record].prim_count = node.items.len() as u32;

                    data.order.extend(node.items.iter().map(|&i| i as u32));
                },
                Some([fst, snd]) => {
                    emit(data, tree, fst, record as u32);

                    // The right subtree begins wherever the array has
                    // grown to. 0 stays reserved as the leaf marker:
                    // the root is never anyone's right child
                    data.nodes[record].right = data.nodes.len() as u32;

                    emit(data, tree, snd, record as u32);
                },
            }
        }

        emit(&mut data, tree, 0, 0);

        data
    }

    // Serializes the reordered primitive list. Consumers address it
    // through prim_offset/prim_count, never through insertion order
    pub fn primitive_bytes(&self, prims: &[&Prim]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.order.len() * geom::PRIM_STRIDE);

        for &i in &self.order {
            prims[i as usize].write_to(&mut out);
        }

        out
    }
}
