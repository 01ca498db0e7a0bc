//! Spatial math - vectors, circle overlap and line-circle intersection
//!
//! Positions are 3D; the z axis only comes into play once an entity lives
//! on the spherical boundary of the late stages. Combat and steering tests
//! are sphere/circle overlaps in the same space.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar constructor; most of the world lives at z = 0.
    pub fn xy(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit vector; ZERO stays ZERO.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec3::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.sub(other).length()
    }

    /// Clamp the vector's length to `max`, preserving direction.
    pub fn clamp_length(self, max: f32) -> Vec3 {
        let len = self.length();
        if len > max && len > f32::EPSILON {
            self.scale(max / len)
        } else {
            self
        }
    }
}

/// Circle/sphere overlap test used for every contact interaction.
pub fn circles_overlap(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.sub(b).length_sq() <= reach * reach
}

/// Intersect a ray (`origin`, unit `dir`) with a sphere; returns the
/// distance along the ray to the first intersection in front of the origin.
pub fn ray_circle_hit(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center.sub(origin);
    let projection = to_center.dot(dir);
    if projection < 0.0 {
        return None;
    }
    let closest_sq = to_center.length_sq() - projection * projection;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let entry = projection - half_chord;
    Some(entry.max(0.0))
}
