//! Shadow Frustum Math
//!
//! Pure functions that turn a light space setup and a subject bounding
//! sphere into the three projections a projected shadow needs:
//!
//! - **pre-subject**: from the light's near plane to the far side of the
//!   subject (preshadow casters)
//! - **subject**: tightly around the subject sphere
//! - **post-subject**: from the subject to the light's far plane (receivers)
//!
//! All three share one face basis and W axis, so they agree on X/Y and only
//! differ in their depth range.

use glam::{Mat4, Vec3, Vec4};

use crate::scene::bounds::Sphere;

/// Index list of the 12 triangles of a frustum box whose vertices are laid
/// out by [`cube_vertex_index`].
pub const FRUSTUM_INDICES: [u16; 36] = [
    0, 2, 3, 0, 3, 1, //
    4, 5, 7, 4, 7, 6, //
    0, 1, 5, 0, 5, 4, //
    2, 6, 7, 2, 7, 3, //
    0, 4, 6, 0, 6, 2, //
    1, 3, 7, 1, 7, 5, //
];

/// Vertex pairs of the 12 edges of a frustum box.
pub const FRUSTUM_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// The projections of one shadow. A pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumTransforms {
    pub pre_subject_matrix: Mat4,
    pub subject_matrix: Mat4,
    pub post_subject_matrix: Mat4,
    /// Subject space depth of the subject sphere's far surface point, used
    /// to normalize stored shadow depth.
    pub max_subject_depth: f32,
    pub is_directional: bool,
}

/// Per light type setup produced by
/// [`Light::projected_shadow_initializer`](crate::scene::light::Light::projected_shadow_initializer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedShadowInitializer {
    /// World to light space. Light space depth runs along `face_direction`.
    pub world_to_light: Mat4,
    pub face_direction: Vec3,
    /// Face space plane producing clip W: `(0,0,1,0)` for perspective,
    /// `(0,0,0,1)` for parallel projection.
    pub w_axis: Vec4,
    pub min_light_w: f32,
    pub max_light_w: f32,
    pub is_directional: bool,
}

impl ProjectedShadowInitializer {
    #[must_use]
    pub fn calc_transforms(&self, subject: Sphere) -> FrustumTransforms {
        calc_transforms(
            &self.world_to_light,
            self.face_direction,
            subject,
            self.w_axis,
            self.min_light_w,
            self.max_light_w,
            self.is_directional,
        )
    }
}

// ============================================================================
// Basis
// ============================================================================

/// Two axes perpendicular to `direction` and to each other.
///
/// World Z is projected out of the direction, unless the direction is mostly
/// along Z, in which case world X is used.
#[must_use]
pub fn find_best_axis_vectors(direction: Vec3) -> (Vec3, Vec3) {
    let a = direction.abs();
    let seed = if a.z > a.x && a.z > a.y { Vec3::X } else { Vec3::Z };

    let axis1 = (seed - direction * seed.dot(direction)).normalize_or_zero();
    let axis2 = axis1.cross(direction);
    (axis1, axis2)
}

/// World to face space: light space rotated so `face_direction` becomes +Z.
#[must_use]
pub fn world_to_face(world_to_light: &Mat4, face_direction: Vec3) -> Mat4 {
    let face = face_direction.normalize_or_zero();
    let (axis1, axis2) = find_best_axis_vectors(face);

    // Rows are the basis axes (-axis1, axis2, face).
    let basis = Mat4::from_cols(
        (-axis1).extend(0.0),
        axis2.extend(0.0),
        face.extend(0.0),
        Vec4::W,
    )
    .transpose();

    basis * *world_to_light
}

// ============================================================================
// Projection
// ============================================================================

/// Projection of face space depth range `[min_z, max_z]`.
///
/// Output is `x' = x`, `y' = y`, `z' = s·(z − min_z)`,
/// `w' = dot(w_axis, (x, y, z, 1))` with
/// `s = (w_axis.z·max_z + w_axis.w) / (max_z − min_z)`, which maps the range
/// onto clip `z ∈ [0, w]`.
#[must_use]
pub fn shadow_projection(min_z: f32, max_z: f32, w_axis: Vec4) -> Mat4 {
    let mut range = max_z - min_z;
    if range.abs() < f32::EPSILON {
        range = f32::EPSILON;
    }
    let s = (w_axis.z * max_z + w_axis.w) / range;

    Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, w_axis.x),
        Vec4::new(0.0, 1.0, 0.0, w_axis.y),
        Vec4::new(0.0, 0.0, s, w_axis.z),
        Vec4::new(0.0, 0.0, -min_z * s, w_axis.w),
    )
}

/// Computes the pre-subject, subject and post-subject projections of a
/// shadow.
///
/// Zero-radius subjects are legal; their depth range collapses to a point.
#[must_use]
pub fn calc_transforms(
    world_to_light: &Mat4,
    face_direction: Vec3,
    subject: Sphere,
    w_axis: Vec4,
    min_light_w: f32,
    max_light_w: f32,
    is_directional: bool,
) -> FrustumTransforms {
    let world_to_face = world_to_face(world_to_light, face_direction);

    let max_subject_z = world_to_face.transform_point3(subject.center).z + subject.radius;
    let min_subject_z = (max_subject_z - subject.radius * 2.0).max(min_light_w);

    let pre_subject_matrix = shadow_projection(min_light_w, max_subject_z, w_axis) * world_to_face;
    let subject_matrix = shadow_projection(min_subject_z, max_subject_z, w_axis) * world_to_face;
    let post_subject_matrix = shadow_projection(min_subject_z, max_light_w, w_axis) * world_to_face;

    let light_to_world = world_to_light.inverse();
    let far_point =
        subject.center + light_to_world.transform_vector3(face_direction) * subject.radius;
    let max_subject_depth = (subject_matrix * far_point.extend(1.0)).z;

    FrustumTransforms {
        pre_subject_matrix,
        subject_matrix,
        post_subject_matrix,
        max_subject_depth,
        is_directional,
    }
}

// ============================================================================
// Frustum Geometry
// ============================================================================

/// Vertex slot of the frustum corner selected by the three axis flags.
#[inline]
#[must_use]
pub const fn cube_vertex_index(x: usize, y: usize, z: usize) -> usize {
    x * 4 + y * 2 + z
}

/// World space corners of the clip volume of `inv_matrix`'s inverse.
///
/// Corner `(x, y, z)` is the unprojection of
/// `(x ? -1 : 1, y ? -1 : 1, z ? 0 : 1)`.
#[must_use]
pub fn frustum_vertices(inv_matrix: &Mat4) -> [Vec3; 8] {
    let mut vertices = [Vec3::ZERO; 8];
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..2 {
                let clip = Vec4::new(
                    if x == 1 { -1.0 } else { 1.0 },
                    if y == 1 { -1.0 } else { 1.0 },
                    if z == 1 { 0.0 } else { 1.0 },
                    1.0,
                );
                let v = *inv_matrix * clip;
                vertices[cube_vertex_index(x, y, z)] = v.truncate() / v.w;
            }
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_axes_are_orthonormal() {
        for dir in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.3, -0.4, 0.866).normalize()] {
            let (a, b) = find_best_axis_vectors(dir);
            assert!((a.length() - 1.0).abs() < 1e-5);
            assert!((b.length() - 1.0).abs() < 1e-5);
            assert!(a.dot(dir).abs() < 1e-5);
            assert!(b.dot(dir).abs() < 1e-5);
            assert!(a.dot(b).abs() < 1e-5);
        }
    }

    #[test]
    fn projection_maps_range_to_unit_depth() {
        let perspective = shadow_projection(2.0, 10.0, Vec4::new(0.0, 0.0, 1.0, 0.0));
        let near = perspective * Vec4::new(0.0, 0.0, 2.0, 1.0);
        let far = perspective * Vec4::new(0.0, 0.0, 10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);

        let parallel = shadow_projection(-3.0, 5.0, Vec4::W);
        let near = parallel * Vec4::new(0.0, 0.0, -3.0, 1.0);
        let far = parallel * Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }
}
