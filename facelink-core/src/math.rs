//! Small vector and quaternion types carried by the tracking stream.

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::Serialize;

// ── Vec3 ─────────────────────────────────────────────────────────

/// A 3-component `f32` vector (positions, marker coordinates, mesh
/// vertices).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ── Quat ─────────────────────────────────────────────────────────

/// A rotation quaternion, stored in wire order `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `radians` about `axis`. `axis` is normalised here.
    pub fn from_axis_angle(axis: Vec3, radians: f32) -> Self {
        let len = axis.length();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let (s, c) = (radians * 0.5).sin_cos();
        let k = s / len;
        Self::new(axis.x * k, axis.y * k, axis.z * k, c)
    }

    /// Component-wise comparison within `eps`, treating `q` and `-q`
    /// as the same rotation.
    pub fn approx_eq(&self, other: &Quat, eps: f32) -> bool {
        let same = (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
            && (self.w - other.w).abs() <= eps;
        let negated = (self.x + other.x).abs() <= eps
            && (self.y + other.y).abs() <= eps
            && (self.z + other.z).abs() <= eps
            && (self.w + other.w).abs() <= eps;
        same || negated
    }
}

impl Mul for Quat {
    type Output = Quat;

    /// Hamilton product; `a * b` applies `b` first, then `a`.
    fn mul(self, b: Quat) -> Quat {
        let a = self;
        Quat::new(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}

// ── EyeAngles ────────────────────────────────────────────────────

/// Eye gaze as polar angles in degrees, as sent in the Eyes block.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EyeAngles {
    /// Rotation about the right (x) axis, degrees.
    pub theta: f32,
    /// Rotation about the up (y) axis, degrees.
    pub phi: f32,
}

impl EyeAngles {
    pub const fn new(theta: f32, phi: f32) -> Self {
        Self { theta, phi }
    }

    /// `Ry(phi) * Rx(theta)`.
    pub fn to_quat(self) -> Quat {
        Quat::from_axis_angle(Vec3::Y, self.phi.to_radians())
            * Quat::from_axis_angle(Vec3::X, self.theta.to_radians())
    }
}
