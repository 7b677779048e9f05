use super::v3::{V3, V3Ops as _};

// Extents at or below this are treated as collapsed
pub const EXTENT_EPS: f32 = 1e-6;

#[derive(Clone, Copy)]
#[derive(Debug)]
pub struct Ray {
    pub origin: V3<f32>,
    pub dir: V3<f32>,
}

// An axis-aligned box. `add` only ever grows it,
// so a freshly-constructed EMPTY has inverted extrema
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct BBox {
    pub min: V3<f32>,
    pub max: V3<f32>,
}

impl Default for BBox {
    fn default() -> Self { Self::EMPTY }
}

impl BBox {
    pub const EMPTY: Self = Self {
        min: [f32::MAX; 3],
        max: [f32::MAX * -1.; 3],
    };

    pub const fn new(min: V3<f32>, max: V3<f32>) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        let d = self.max.sub(self.min);

        d[0] <= EXTENT_EPS || d[1] <= EXTENT_EPS || d[2] <= EXTENT_EPS
    }

    pub fn add(&mut self, other: &Self) {
        self.min = self.min.vmin(other.min);
        self.max = self.max.vmax(other.max);
    }

    pub fn add_point(&mut self, point: V3<f32>) {
        self.min = self.min.vmin(point);
        self.max = self.max.vmax(point);
    }

    pub fn contains(&self, point: V3<f32>) -> bool {
        point[0] >= self.min[0] &&
        point[0] <= self.max[0] &&
        point[1] >= self.min[1] &&
        point[1] <= self.max[1] &&
        point[2] >= self.min[2] &&
        point[2] <= self.max[2]
    }

    pub fn center(&self) -> V3<f32> {
        self.min.add(self.max).scale(0.5)
    }

    pub fn extent(&self) -> V3<f32> {
        self.max.sub(self.min)
    }

    pub fn longest_axis(&self) -> usize {
        let d = self.extent();

        if d[0] >= d[1] && d[0] >= d[2] {
            0
        } else if d[1] >= d[2] {
            1
        } else {
            2
        }
    }

    // Half the conventional AABB area.
    // Only ever consumed in cost ratios, where the factor cancels
    pub fn surface_area(&self) -> f32 {
        let d = self.extent();

        d[0] * d[1] + d[0] * d[2] + d[1] * d[2]
    }

    // Both operands must be non-empty
    pub fn intersection(&self, other: &Self) -> Self {
        debug_assert!(!self.is_empty() && !other.is_empty());

        Self {
            min: self.min.vmax(other.min),
            max: self.max.vmin(other.max),
        }
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.min[0] <= other.max[0] && self.max[0] >= other.min[0] &&
        self.min[1] <= other.max[1] && self.max[1] >= other.min[1] &&
        self.min[2] <= other.max[2] && self.max[2] >= other.min[2]
    }

    // Eight equal sub-boxes, one per octant around the center
    pub fn oct_split(&self) -> [Self; 8] {
        let c = self.center();

        let mut out = [Self::EMPTY; 8];

        for (oct, bb) in out.iter_mut().enumerate() {
            let mut min = c;
            let mut max = self.max;

            for axis in 0..3 {
                if oct & (1 << axis) == 0 {
                    min[axis] = self.min[axis];
                    max[axis] = c[axis];
                }
            }

            *bb = Self { min, max };
        }

        out
    }

    // Slab test. Returns the entry parameter, which is negative
    // when the origin sits inside the box
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_enter = f32::MAX * -1.;
        let mut t_exit = f32::MAX;

        for axis in 0..3 {
            let inv = 1. / ray.dir[axis];

            let t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let t1 = (self.max[axis] - ray.origin[axis]) * inv;

            t_enter = t_enter.max(t0.min(t1));
            t_exit = t_exit.min(t0.max(t1));
        }

        // A box entirely behind the origin is not a hit
        if t_enter <= t_exit && t_exit >= 0. {
            Some(t_enter)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_points_are_contained() {
        let mut bb = BBox::EMPTY;

        for point in [[0., 0., 0.], [1., 2., 3.], [-4., 0.5, 2.]] {
            bb.add_point(point);

            assert!(bb.contains(point));
        }

        assert!(bb.contains([0.5, 1., 2.]));
        assert!(!bb.contains([0., -1., 0.]));
    }

    #[test]
    fn empty_until_all_extents_open() {
        let mut bb = BBox::EMPTY;

        assert!(bb.is_empty());

        bb.add_point([0.; 3]);
        bb.add_point([1., 1., 0.]);

        // Still collapsed along z
        assert!(bb.is_empty());

        bb.add_point([0., 0., 1.]);

        assert!(!bb.is_empty());
    }

    #[test]
    fn intersection_commutes() {
        let a = BBox::new([-1.; 3], [2., 3., 4.]);
        let b = BBox::new([0.5, -2., 1.], [5.; 3]);

        assert_eq!(a.intersection(&b), b.intersection(&a));
        assert_eq!(a.intersection(&b), BBox::new([0.5, -1., 1.], [2., 3., 4.]));
    }

    #[test]
    fn slab_hit_from_outside() {
        let bb = BBox::new([-1.; 3], [1.; 3]);

        let ray = Ray {
            origin: [0., 0., -5.],
            dir: [0., 0., 1.],
        };

        let t = bb.intersect_ray(&ray).unwrap();

        assert!(t >= 0.);
        assert!((t - 4.).abs() < 1e-5);
    }

    #[test]
    fn slab_rejects_box_behind_origin() {
        let bb = BBox::new([-1.; 3], [1.; 3]);

        let ray = Ray {
            origin: [0., 0., 5.],
            dir: [0., 0., 1.],
        };

        assert!(bb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn slab_negative_entry_from_inside() {
        let bb = BBox::new([-1.; 3], [1.; 3]);

        let ray = Ray {
            origin: [0.; 3],
            dir: [1., 0., 0.],
        };

        let t = bb.intersect_ray(&ray).unwrap();

        assert!(t < 0.);
    }

    #[test]
    fn oct_split_tiles_parent() {
        let bb = BBox::new([0.; 3], [2., 4., 6.]);

        let mut union = BBox::EMPTY;

        for sub in bb.oct_split() {
            let d = sub.extent();

            assert!((d[0] - 1.).abs() < 1e-6);
            assert!((d[1] - 2.).abs() < 1e-6);
            assert!((d[2] - 3.).abs() < 1e-6);

            union.add(&sub);
        }

        assert_eq!(union, bb);
    }

    #[test]
    fn surface_area_is_half_conventional() {
        let bb = BBox::new([0.; 3], [1., 2., 3.]);

        assert!((bb.surface_area() - 11.).abs() < 1e-6);
    }
}
