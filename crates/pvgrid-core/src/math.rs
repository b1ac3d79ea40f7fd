//! Geometry helpers: bounding boxes, segments and frustum culling.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::constants::BOX_CORNERS;

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at `center` with given half-extents
    #[inline]
    pub fn from_center_extent(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB enclosing all given points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::new(Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY));
        for point in points {
            bounds.expand_to_include(point);
        }
        bounds
    }

    /// Get the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the half-extents of the AABB
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// The eight corners; bit 0 of the index selects max x, bit 1 max y, bit 2 max z.
    pub fn vertices(&self) -> [Vec3; BOX_CORNERS] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// Grow every face outward by `amount`
    #[inline]
    pub fn expanded(&self, amount: Vec3) -> Self {
        Self {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    /// Scale the box about its center
    #[inline]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::from_center_extent(self.center(), self.half_extents() * factor)
    }

    /// Check if a point is inside the AABB
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if `other` lies entirely inside this AABB
    #[inline]
    pub fn contains_aabb(&self, other: &Self) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Check whether the segment `a -> b` passes through the open interior of the box.
    ///
    /// Segments that only graze a face, an edge or a corner do not count.
    pub fn segment_hits_interior(&self, a: Vec3, b: Vec3) -> bool {
        let dir = b - a;
        let mut t_near = 0.0_f32;
        let mut t_far = 1.0_f32;

        for axis in 0..3 {
            let origin = a[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];

            if dir[axis].abs() <= f32::EPSILON {
                if origin <= lo || origin >= hi {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / dir[axis];
            let t1 = (lo - origin) * inv;
            let t2 = (hi - origin) * inv;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
            if t_near >= t_far {
                return false;
            }
        }

        true
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

/// Frustum for culling operations.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    /// Six frustum planes (left, right, bottom, top, near, far)
    /// Each plane is (nx, ny, nz, d) where n is normal and d is distance
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from view-projection matrix
    pub fn from_view_projection(vp: Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let planes = [
            normalize_plane(row3 + row0), // Left
            normalize_plane(row3 - row0), // Right
            normalize_plane(row3 + row1), // Bottom
            normalize_plane(row3 - row1), // Top
            normalize_plane(row3 + row2), // Near
            normalize_plane(row3 - row2), // Far
        ];

        Self { planes }
    }

    /// Test if an AABB is inside or intersects the frustum
    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let normal = plane.truncate();

            // Find the positive vertex (furthest along plane normal)
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);

            if normal.dot(p) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }
}

/// Normalize a plane by the length of its normal so `w` is a true distance.
fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > 0.0 {
        plane / length
    } else {
        plane
    }
}
