pub mod bbox;
pub mod v3;

use bbox::{BBox, Ray};
use v3::{V3, V3Ops as _};

// Type tags, first word of every serialized record
pub const TAG_TRIANGLE: u32 = 0;
pub const TAG_SPHERE: u32 = 1;
pub const TAG_BOX: u32 = 2;

// All variants serialize to the same fixed stride (8 4-byte words)
pub const PRIM_STRIDE: usize = 32;

// Degenerate determinant cutoff for the exact triangle test
const DET_EPS: f32 = 1e-7;

#[repr(C)]
#[derive(Clone, Copy)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
struct TriangleRecord {
    tag: u32,
    indices: [u32; 3],
    _p0: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
struct SphereRecord {
    tag: u32,
    center: [f32; 3],
    radius: f32,
    material: u32,
    _p0: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
struct BoxRecord {
    tag: u32,
    min: [f32; 3],
    material: u32,
    max: [f32; 3],
}

#[derive(Clone, Copy)]
#[derive(Debug)]
pub struct Triangle {
    pub indices: [u32; 3],
    pub positions: [V3<f32>; 3],
    pub material: u32,
    bounds: BBox,
}

impl Triangle {
    pub fn new(
        indices: [u32; 3],
        positions: [V3<f32>; 3],
        material: u32,
    ) -> Self {
        let mut bounds = BBox::EMPTY;

        for position in positions {
            bounds.add_point(position);
        }

        Self {
            indices,
            positions,
            material,
            bounds,
        }
    }

    pub fn centroid(&self) -> V3<f32> {
        let [a, b, c] = self.positions;

        // I'll let the compiler figure out the precision
        a.add(b).add(c).scale(1. / 3.)
    }

    // Exact segment/triangle test via Cramer's rule,
    // bounded to the segment's length
    fn segment_hit(&self, origin: V3<f32>, dir: V3<f32>) -> bool {
        let [p0, p1, p2] = self.positions;

        let e1 = p1.sub(p0);
        let e2 = p2.sub(p0);

        let p = dir.cross(e2);

        let det = e1.dot(p);

        if det.abs() < DET_EPS {
            return false;
        }

        let inv = 1. / det;

        let t0 = origin.sub(p0);

        let u = t0.dot(p) * inv;

        if !(0. ..=1.).contains(&u) {
            return false;
        }

        let q = t0.cross(e1);

        let v = dir.dot(q) * inv;

        if v < 0. || u + v > 1. {
            return false;
        }

        let t = e2.dot(q) * inv;

        (0. ..=1.).contains(&t)
    }

    // Combines three sub-tests, accepting on the first success:
    // a vertex inside the box, a triangle edge crossing the box,
    // or a box edge crossing the triangle itself
    pub fn box_overlap(&self, bb: &BBox) -> bool {
        if self.positions.iter().any(|&p| bb.contains(p)) {
            return true;
        }

        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            let pa = self.positions[a];
            let pb = self.positions[b];

            // Clipped to the segment, run in both directions
            for (origin, dir) in [(pa, pb.sub(pa)), (pb, pa.sub(pb))] {
                if let Some(t) = bb.intersect_ray(&Ray { origin, dir }) {
                    if (0. ..=1.).contains(&t) {
                        return true;
                    }
                }
            }
        }

        let [p0, p1, p2] = self.positions;

        let normal = p1.sub(p0).cross(p2.sub(p0));

        let d = normal.dot(p0);

        // Only box edges whose endpoints straddle the supporting plane
        // get the exact test
        for (a, b) in box_edges(bb) {
            let s0 = normal.dot(a) - d;
            let s1 = normal.dot(b) - d;

            if s0 * s1 > 0. {
                continue;
            }

            if self.segment_hit(a, b.sub(a)) {
                return true;
            }
        }

        false
    }
}

#[derive(Clone, Copy)]
#[derive(Debug)]
pub struct Sphere {
    pub center: V3<f32>,
    pub radius: f32,
    pub material: u32,
    bounds: BBox,
}

impl Sphere {
    pub fn new(center: V3<f32>, radius: f32, material: u32) -> Self {
        let bounds = BBox::new(
            center.sub([radius; 3]),
            center.add([radius; 3]),
        );

        Self {
            center,
            radius,
            material,
            bounds,
        }
    }
}

#[derive(Clone, Copy)]
#[derive(Debug)]
pub struct BoxPrim {
    pub material: u32,
    bounds: BBox,
}

impl BoxPrim {
    pub fn new(bounds: BBox, material: u32) -> Self {
        Self { material, bounds }
    }
}

#[derive(Clone, Copy)]
#[derive(Debug)]
pub enum Prim {
    Triangle(Triangle),
    Sphere(Sphere),
    Box(BoxPrim),
}

impl Prim {
    pub fn bounds(&self) -> &BBox {
        match self {
            Prim::Triangle(tri) => &tri.bounds,
            Prim::Sphere(sphere) => &sphere.bounds,
            Prim::Box(aabb) => &aabb.bounds,
        }
    }

    pub fn centroid(&self) -> V3<f32> {
        match self {
            Prim::Triangle(tri) => tri.centroid(),
            Prim::Sphere(sphere) => sphere.center,
            Prim::Box(aabb) => aabb.bounds.center(),
        }
    }

    pub fn material(&self) -> u32 {
        match self {
            Prim::Triangle(tri) => tri.material,
            Prim::Sphere(sphere) => sphere.material,
            Prim::Box(aabb) => aabb.material,
        }
    }

    pub fn expand_box(&self, bb: &mut BBox) {
        match self {
            Prim::Triangle(tri) => {
                for position in tri.positions {
                    bb.add_point(position);
                }
            },
            _ => bb.add(self.bounds()),
        }
    }

    // Triangles get the exact test; the other variants fall back to
    // their bounding boxes, an approximation
    pub fn box_overlap(&self, bb: &BBox) -> bool {
        match self {
            Prim::Triangle(tri) => tri.box_overlap(bb),
            _ => self.bounds().overlaps(bb),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Prim::Triangle(tri) => {
                let record = TriangleRecord {
                    tag: TAG_TRIANGLE,
                    indices: tri.indices,
                    _p0: [0; 4],
                };

                out.extend_from_slice(bytemuck::bytes_of(&record));
            },
            Prim::Sphere(sphere) => {
                let record = SphereRecord {
                    tag: TAG_SPHERE,
                    center: sphere.center,
                    radius: sphere.radius,
                    material: sphere.material,
                    _p0: [0; 2],
                };

                out.extend_from_slice(bytemuck::bytes_of(&record));
            },
            Prim::Box(aabb) => {
                let record = BoxRecord {
                    tag: TAG_BOX,
                    min: aabb.bounds.min,
                    material: aabb.material,
                    max: aabb.bounds.max,
                };

                out.extend_from_slice(bytemuck::bytes_of(&record));
            },
        }
    }
}

// The 12 edges of a box, as corner pairs differing along one axis
fn box_edges(bb: &BBox) -> [(V3<f32>, V3<f32>); 12] {
    let corner = |oct: usize| -> V3<f32> {
        let mut out = bb.max;

        for axis in 0..3 {
            if oct & (1 << axis) == 0 {
                out[axis] = bb.min[axis];
            }
        }

        out
    };

    let mut out = [([0.; 3], [0.; 3]); 12];
    let mut at = 0;

    for oct in 0..8 {
        for axis in 0..3 {
            let bit = 1 << axis;

            if oct & bit == 0 {
                out[at] = (corner(oct), corner(oct | bit));

                at += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_bounds_and_centroid() {
        let tri = Triangle::new(
            [0, 1, 2],
            [[0., 0., 0.], [3., 0., 0.], [0., 3., 0.]],
            0,
        );

        let prim = Prim::Triangle(tri);

        assert_eq!(prim.bounds().min, [0.; 3]);
        assert_eq!(prim.bounds().max, [3., 3., 0.]);

        let c = prim.centroid();

        assert!((c[0] - 1.).abs() < 1e-6);
        assert!((c[1] - 1.).abs() < 1e-6);
    }

    #[test]
    fn overlap_accepts_contained_vertex() {
        let tri = Triangle::new(
            [0, 1, 2],
            [[0.5, 0.5, 0.5], [5., 0., 0.], [0., 5., 0.]],
            0,
        );

        assert!(tri.box_overlap(&BBox::new([0.; 3], [1.; 3])));
    }

    #[test]
    fn overlap_accepts_crossing_edge() {
        // Both endpoints outside, the edge passes straight through
        let tri = Triangle::new(
            [0, 1, 2],
            [[-5., 0.5, 0.5], [5., 0.5, 0.5], [0., 9., 0.5]],
            0,
        );

        assert!(tri.box_overlap(&BBox::new([0.; 3], [1.; 3])));
    }

    #[test]
    fn overlap_accepts_plane_spanning_triangle() {
        // No vertex inside and no triangle edge through the box,
        // but the box pierces the triangle's interior
        let tri = Triangle::new(
            [0, 1, 2],
            [[-10., 0.5, -10.], [10., 0.5, -10.], [0., 0.5, 10.]],
            0,
        );

        assert!(tri.box_overlap(&BBox::new([-0.2; 3], [0.7; 3])));
    }

    #[test]
    fn overlap_rejects_distant_box() {
        let tri = Triangle::new(
            [0, 1, 2],
            [[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
            0,
        );

        assert!(!tri.box_overlap(&BBox::new([5.; 3], [6.; 3])));
    }

    #[test]
    fn sphere_bounds() {
        let prim = Prim::Sphere(Sphere::new([1., 2., 3.], 0.5, 7));

        assert_eq!(prim.bounds().min, [0.5, 1.5, 2.5]);
        assert_eq!(prim.bounds().max, [1.5, 2.5, 3.5]);
        assert_eq!(prim.centroid(), [1., 2., 3.]);
    }

    #[test]
    fn records_share_the_fixed_stride() {
        let prims = [
            Prim::Triangle(Triangle::new(
                [3, 4, 5],
                [[0.; 3], [1., 0., 0.], [0., 1., 0.]],
                0,
            )),
            Prim::Sphere(Sphere::new([1., 2., 3.], 0.5, 7)),
            Prim::Box(BoxPrim::new(BBox::new([-1.; 3], [1.; 3]), 9)),
        ];

        let mut out = Vec::new();

        for prim in &prims {
            prim.write_to(&mut out);
        }

        assert_eq!(out.len(), PRIM_STRIDE * prims.len());

        let words = out
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
            .collect::<Vec<_>>();

        // Triangle: tag then the mesh-vertex indices
        assert_eq!(&words[0..4], &[TAG_TRIANGLE, 3, 4, 5]);

        // Sphere: tag, center, radius, material
        assert_eq!(words[8], TAG_SPHERE);
        assert_eq!(f32::from_bits(words[12]), 0.5);
        assert_eq!(words[13], 7);

        // Box: tag, min, material, max
        assert_eq!(words[16], TAG_BOX);
        assert_eq!(f32::from_bits(words[17]), -1.);
        assert_eq!(words[20], 9);
        assert_eq!(f32::from_bits(words[23]), 1.);
    }
}
