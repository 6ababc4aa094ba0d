//! World transforms for pooled instances and attach points.

use glam::{Quat, Vec3};

/// Position plus rotation. Forward is local +Z, right is local +X.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub position: Vec3,
    /// World-space rotation.
    pub rotation: Quat,
}

impl Transform {
    /// The origin, unrotated.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// A transform rotated around the up axis by `yaw_degrees`.
    pub fn from_yaw_degrees(position: Vec3, yaw_degrees: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw_degrees.to_radians()),
        }
    }

    /// Unit vector along local +Z in world space.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Unit vector along local +X in world space.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Map a point from this transform's local space into world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// World transform of a child expressed in this transform's local space.
    pub fn compose(&self, local: &Transform) -> Transform {
        Transform {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
