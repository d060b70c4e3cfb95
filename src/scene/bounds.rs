use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Combined axis-aligned box and bounding sphere sharing one origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxSphereBounds {
    pub origin: Vec3,
    pub box_extent: Vec3,
    pub sphere_radius: f32,
}

impl BoxSphereBounds {
    #[must_use]
    pub const fn new(origin: Vec3, box_extent: Vec3, sphere_radius: f32) -> Self {
        Self {
            origin,
            box_extent,
            sphere_radius,
        }
    }

    /// Bounds of an axis-aligned box; the sphere encloses the box corners.
    #[must_use]
    pub fn from_box(min: Vec3, max: Vec3) -> Self {
        let origin = (min + max) * 0.5;
        let box_extent = (max - min) * 0.5;
        Self::new(origin, box_extent, box_extent.length())
    }

    /// Bounds of a sphere; the box encloses the sphere.
    #[must_use]
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self::new(center, Vec3::splat(radius), radius)
    }

    #[inline]
    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.origin - self.box_extent
    }

    #[inline]
    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.origin + self.box_extent
    }

    #[inline]
    #[must_use]
    pub fn sphere(&self) -> Sphere {
        Sphere::new(self.origin, self.sphere_radius)
    }

    /// Smallest bounds containing both inputs.
    ///
    /// The box is the union of both boxes. The sphere is centered on the new
    /// box origin and grown until it contains both input spheres.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        let origin = (min + max) * 0.5;
        let box_extent = (max - min) * 0.5;

        let sphere_radius = (self.origin.distance(origin) + self.sphere_radius)
            .max(other.origin.distance(origin) + other.sphere_radius);

        Self::new(origin, box_extent, sphere_radius)
    }
}
