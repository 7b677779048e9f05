// Needed for `device.create_buffer_init`
use wgpu::util::DeviceExt as _;

use crate::geom::{self, Prim};
use crate::scene;
use crate::tree;

// Tuning hint for `Accelerator::build`. Every mode currently builds
// the same way; the variants are a stable extension point
#[derive(Clone, Copy)]
#[derive(Debug)]
pub enum Purpose {
    Generic,
    Mesh,
    Instances,
}

// Primitives handed in by reference stay owned by the scene; the
// mesh-ingestion path allocates triangles the accelerator owns.
// `clear` relies on the distinction being carried per slot
pub enum PrimSlot<'a> {
    Owned(Box<Prim>),
    Borrowed(&'a Prim),
}

impl PrimSlot<'_> {
    pub fn get(&self) -> &Prim {
        match self {
            PrimSlot::Owned(prim) => prim,
            PrimSlot::Borrowed(prim) => prim,
        }
    }
}

#[derive(Default)]
pub struct Accelerator<'a> {
    prims: Vec<PrimSlot<'a>>,
    data: Option<tree::FlatBvh>,
    prim_bytes: Vec<u8>,
    stats: tree::Stats,
}

impl<'a> Accelerator<'a> {
    // When reloading scenes, we may want to write into our previous buffers
    const COPY_USAGES: wgpu::BufferUsages = {
        wgpu::BufferUsages::COPY_SRC //
            .union(wgpu::BufferUsages::COPY_DST) //
    };

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_primitive(&mut self, prim: &'a Prim) -> anyhow::Result<()> {
        if self.is_built() {
            anyhow::bail!("\
                Unable to add primitives to a built accelerator; \
                call clear first\
            ");
        }

        self.prims.push(PrimSlot::Borrowed(prim));

        Ok(())
    }

    // Bakes the world transform once and takes ownership of one
    // triangle per face
    pub fn add_mesh(
        &mut self,
        mesh: &scene::Mesh,
        transform: &scene::Transform,
        material: u32,
    ) -> anyhow::Result<()> {
        if self.is_built() {
            anyhow::bail!("\
                Unable to add a mesh to a built accelerator; \
                call clear first\
            ");
        }

        let baked = mesh.positions
            .iter()
            .map(|&position| transform.point(position))
            .collect::<Vec<_>>();

        for face in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [face[0], face[1], face[2]];

            let tri = geom::Triangle::new(
                [a, b, c],
                [
                    baked[a as usize],
                    baked[b as usize],
                    baked[c as usize],
                ],
                material,
            );

            self.prims.push(PrimSlot::Owned(Box::new(Prim::Triangle(tri))));
        }

        Ok(())
    }

    // Builds the construction tree, renders it down to the flat
    // arrays, and drops the tree. Fully replaces any prior build
    pub fn build(&mut self, purpose: Purpose) {
        let view = self.prims
            .iter()
            .map(PrimSlot::get)
            .collect::<Vec<_>>();

        let construction = tree::Tree::build(&view);

        self.stats = construction.stats;

        let data = tree::FlatBvh::new(&construction);

        self.prim_bytes = data.primitive_bytes(&view);
        self.data = Some(data);

        log::info!(
            "built {:?} accelerator: {} prims, {} nodes, {} leaves, depth {}",
            purpose,
            self.stats.prims,
            self.stats.nodes,
            self.stats.leaves,
            self.stats.depth,
        );
    }

    pub fn is_built(&self) -> bool {
        self.data.is_some()
    }

    pub fn stats(&self) -> tree::Stats {
        self.stats
    }

    pub fn nodes(&self) -> &[tree::GpuNode] {
        self.data
            .as_ref()
            .map(|data| data.nodes.as_slice())
            .unwrap_or_default()
    }

    pub fn primitive_bytes(&self) -> &[u8] {
        self.prim_bytes.as_slice()
    }

    // Drops every slot. Owned triangles are freed, borrowed
    // primitives stay with the scene. Safe from any state
    pub fn clear(&mut self) {
        self.prims.clear();
        self.prim_bytes.clear();

        self.data = None;
        self.stats = tree::Stats::default();
    }

    // Creates the storage buffers and bind group the traversal kernel
    // consumes: nodes at binding 0, primitives at binding 1. Handles
    // from an earlier pack go stale once the accelerator is rebuilt
    pub fn pack(&self, device: &wgpu::Device) -> anyhow::Result<AccelPack> {
        let Some(data) = self.data.as_ref() else {
            anyhow::bail!("\
                Unable to pack an accelerator that has not been built\
            ");
        };

        // A zero-length buffer cannot be bound; an empty build
        // uploads a single zeroed record instead
        let zero_record = [0u8; geom::PRIM_STRIDE];

        let contents: &[u8] = if self.prim_bytes.is_empty() {
            &zero_record
        } else {
            self.prim_bytes.as_slice()
        };

        let nodes = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::cast_slice(&data.nodes),
                usage: wgpu::BufferUsages::STORAGE | Self::COPY_USAGES,
            }
        );

        let prims = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: None,
                contents,
                usage: wgpu::BufferUsages::STORAGE | Self::COPY_USAGES,
            }
        );

        let layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        count: None,
                        ty: wgpu::BindingType::Buffer {
                            has_dynamic_offset: false,
                            min_binding_size: None,
                            ty: wgpu::BufferBindingType::Storage {
                                read_only: true
                            },
                        },
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        count: None,
                        ty: wgpu::BindingType::Buffer {
                            has_dynamic_offset: false,
                            min_binding_size: None,
                            ty: wgpu::BufferBindingType::Storage {
                                read_only: true
                            },
                        },
                    },
                ]
            }
        );

        let group = device.create_bind_group(
            &wgpu::BindGroupDescriptor {
                label: None,
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: nodes.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: prims.as_entire_binding(),
                    },
                ],
            }
        );

        Ok(AccelPack {
            nodes,
            prims,
            group,
            layout,
        })
    }
}

pub struct AccelPack {
    pub nodes: wgpu::Buffer,
    pub prims: wgpu::Buffer,
    pub group: wgpu::BindGroup,
    pub layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::geom::bbox::BBox;
    use crate::geom::{BoxPrim, Sphere};

    fn spread_boxes(count: usize) -> Vec<Prim> {
        (0..count)
            .map(|i| {
                let base = i as f32 * 2.;

                Prim::Box(BoxPrim::new(
                    BBox::new([base, 0., 0.], [base + 1., 1., 1.]),
                    0,
                ))
            })
            .collect()
    }

    fn quad_mesh() -> scene::Mesh {
        scene::Mesh {
            positions: vec![
                [0., 0., 0.],
                [1., 0., 0.],
                [1., 1., 0.],
                [0., 1., 0.],
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn empty_build_is_a_single_empty_leaf() {
        let mut accel = Accelerator::new();

        assert!(!accel.is_built());

        accel.build(Purpose::Generic);

        assert!(accel.is_built());
        assert_eq!(accel.nodes().len(), 1);
        assert_eq!(accel.nodes()[0].prim_count, 0);
        assert!(accel.primitive_bytes().is_empty());
    }

    #[test]
    fn add_after_build_is_rejected() {
        let prims = spread_boxes(3);

        let mut accel = Accelerator::new();

        accel.add_primitive(&prims[0]).unwrap();
        accel.build(Purpose::Generic);

        assert!(accel.add_primitive(&prims[1]).is_err());
        assert!(accel
            .add_mesh(&quad_mesh(), &scene::Transform::IDENTITY, 0)
            .is_err());

        accel.clear();

        assert!(accel.add_primitive(&prims[2]).is_ok());
    }

    #[test]
    fn mesh_ingestion_bakes_the_transform() {
        let mut accel = Accelerator::new();

        let transform = scene::Transform::from_translation([10., 0., 0.]);

        accel.add_mesh(&quad_mesh(), &transform, 4).unwrap();

        assert_eq!(accel.prims.len(), 2);

        for slot in &accel.prims {
            assert!(matches!(slot, PrimSlot::Owned(_)));

            let bounds = slot.get().bounds();

            assert!(bounds.min[0] >= 10.);
            assert!(bounds.max[0] <= 11.);

            assert_eq!(slot.get().material(), 4);
        }
    }

    #[test]
    fn clear_resets_and_rebuild_is_independent() {
        let fst = spread_boxes(21);

        let mut accel = Accelerator::new();

        for prim in &fst {
            accel.add_primitive(prim).unwrap();
        }

        accel.build(Purpose::Generic);

        assert!(accel.is_built());
        assert_eq!(accel.stats().prims, 21);
        assert!(accel.nodes().len() > 1);

        accel.clear();

        assert!(!accel.is_built());
        assert_eq!(accel.stats().prims, 0);
        assert_eq!(accel.stats().nodes, 0);
        assert!(accel.nodes().is_empty());
        assert!(accel.primitive_bytes().is_empty());

        // A fresh accumulation must not inherit anything
        let snd = vec![Prim::Sphere(Sphere::new([0.; 3], 1., 0))];

        accel.add_primitive(&snd[0]).unwrap();
        accel.build(Purpose::Generic);

        assert_eq!(accel.stats().prims, 1);
        assert_eq!(accel.nodes().len(), 1);
        assert_eq!(accel.primitive_bytes().len(), geom::PRIM_STRIDE);
    }

    #[test]
    fn borrowed_and_owned_primitives_mix() {
        let borrowed = spread_boxes(8);

        let mut accel = Accelerator::new();

        for prim in &borrowed {
            accel.add_primitive(prim).unwrap();
        }

        accel
            .add_mesh(&quad_mesh(), &scene::Transform::IDENTITY, 0)
            .unwrap();

        accel.build(Purpose::Mesh);

        assert_eq!(accel.stats().prims, 10);
        assert_eq!(
            accel.primitive_bytes().len(),
            10 * geom::PRIM_STRIDE,
        );
    }
}
