use glam::{Mat4, Vec3, Vec4};

/// Convex volume bounded by the six planes of a projection.
///
/// Planes are stored as `(normal, d)` with normals pointing inward, so a
/// point `p` is inside a plane when `dot(normal, p) + d >= 0`.
/// Clip space is expected to be `x, y ∈ [-w, w]` and `z ∈ [0, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConvexVolume {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl ConvexVolume {
    /// Extracts the planes of `m` (Gribb-Hartmann).
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near (z >= 0)
            rows[3] - rows[2], // Far (z <= w)
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Sphere test. Conservative: may report spheres near corners as inside.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// Axis-aligned box test against every plane.
    #[must_use]
    pub fn intersects_box(&self, origin: Vec3, extent: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let push_out = normal.abs().dot(extent);
            normal.dot(origin) + plane.w >= -push_out
        })
    }
}
