use std::path;

use crate::geom::bbox::BBox;
use crate::geom::v3::V3;
use crate::geom::{BoxPrim, Prim, Sphere};

// Row-major affine transform. Applied once at ingestion; a moving
// mesh requires a full rebuild
#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self { Self::IDENTITY }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        matrix: [
            [1., 0., 0., 0.],
            [0., 1., 0., 0.],
            [0., 0., 1., 0.],
            [0., 0., 0., 1.],
        ],
    };

    pub const fn from_translation(offset: V3<f32>) -> Self {
        Self {
            matrix: [
                [1., 0., 0., offset[0]],
                [0., 1., 0., offset[1]],
                [0., 0., 1., offset[2]],
                [0., 0., 0., 1.],
            ],
        }
    }

    pub fn point(&self, p: V3<f32>) -> V3<f32> {
        let m = &self.matrix;

        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2] + m[0][3],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2] + m[1][3],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2] + m[2][3],
        ]
    }
}

// The slice of mesh data the accelerator consumes: a position buffer
// and a triangle index buffer
#[derive(Clone)]
#[derive(Debug, Default)]
pub struct Mesh {
    pub positions: Vec<V3<f32>>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn from_obj(obj: &wavefront::Obj) -> Self {
        let positions = obj.positions().to_vec();

        let mut indices = Vec::new();

        for [a, b, c] in obj.triangles() {
            indices.push(a.position_index() as u32);
            indices.push(b.position_index() as u32);
            indices.push(c.position_index() as u32);
        }

        Self { positions, indices }
    }
}

// A serialized scene description, the input to the construct tool

#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct SphereDesc {
    pub center: [f32; 3],
    pub radius: f32,
    #[serde(default)]
    pub material: u32,
}

#[derive(Clone, Copy)]
#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct BoxDesc {
    pub min: [f32; 3],
    pub max: [f32; 3],
    #[serde(default)]
    pub material: u32,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Deserialize)]
pub struct MeshDesc {
    pub path: path::PathBuf,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub material: u32,
}

#[derive(Debug, Default)]
#[derive(serde::Deserialize)]
#[serde(default)]
pub struct SceneDesc {
    pub spheres: Vec<SphereDesc>,
    pub boxes: Vec<BoxDesc>,
    pub meshes: Vec<MeshDesc>,
}

impl SceneDesc {
    // The analytic primitives; meshes go through the owned
    // ingestion path instead
    pub fn prims(&self) -> Vec<Prim> {
        let spheres = self.spheres.iter().map(|desc| {
            Prim::Sphere(Sphere::new(desc.center, desc.radius, desc.material))
        });

        let boxes = self.boxes.iter().map(|desc| {
            Prim::Box(BoxPrim::new(
                BBox::new(desc.min, desc.max),
                desc.material,
            ))
        });

        spheres.chain(boxes).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_points_alone() {
        let p = [1., -2., 3.];

        assert_eq!(Transform::IDENTITY.point(p), p);
    }

    #[test]
    fn translation_offsets_points() {
        let transform = Transform::from_translation([10., 0., -1.]);

        assert_eq!(transform.point([1., 2., 3.]), [11., 2., 2.]);
    }

    #[test]
    fn scene_description_parses() {
        let desc: SceneDesc = serde_json::from_str(r#"{
            "spheres": [
                { "center": [0.0, 1.0, 0.0], "radius": 0.5, "material": 2 }
            ],
            "boxes": [
                { "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0] }
            ]
        }"#).unwrap();

        let prims = desc.prims();

        assert_eq!(prims.len(), 2);
        assert_eq!(prims[0].material(), 2);
        assert_eq!(prims[1].centroid(), [0.; 3]);
        assert!(desc.meshes.is_empty());
    }
}
