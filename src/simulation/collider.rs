//! Simple (non-mesh) colliders for the closest-point gravity policy, and the
//! trigger volumes that decide when a body overlaps a field.

use crate::simulation::states::{NQuat, NVec3};

/// A convex primitive in world space.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleCollider {
    Sphere { center: NVec3, radius: f64 },
    /// Oriented box.
    Cuboid { center: NVec3, half_extents: NVec3, rotation: NQuat },
    /// Segment `a`-`b` swept by `radius`.
    Capsule { a: NVec3, b: NVec3, radius: f64 },
}

impl SimpleCollider {
    /// Closest point on or in the collider to `p`.
    ///
    /// A point inside the collider is its own closest point, so the gravity
    /// direction derived from it degenerates to zero there.
    pub fn closest_point(&self, p: &NVec3) -> NVec3 {
        match self {
            SimpleCollider::Sphere { center, radius } => {
                let r = p - center;
                let dist = r.norm();
                if dist <= *radius {
                    return *p;
                }
                center + r * (*radius / dist)
            }
            SimpleCollider::Cuboid { center, half_extents, rotation } => {
                let local = rotation.inverse_transform_vector(&(p - center));
                let clamped = local.sup(&(-half_extents)).inf(half_extents);
                center + rotation.transform_vector(&clamped)
            }
            SimpleCollider::Capsule { a, b, radius } => {
                let (on_axis, _t) = closest_point_on_segment(a, b, p);
                let r = p - on_axis;
                let dist = r.norm();
                if dist <= *radius {
                    return *p;
                }
                on_axis + r * (*radius / dist)
            }
        }
    }

    /// Move a collider authored in a field's local frame into world space.
    pub fn to_world(&self, origin: &NVec3, rotation: &NQuat) -> SimpleCollider {
        match self {
            SimpleCollider::Sphere { center, radius } => SimpleCollider::Sphere {
                center: origin + rotation * center,
                radius: *radius,
            },
            SimpleCollider::Cuboid { center, half_extents, rotation: local } => SimpleCollider::Cuboid {
                center: origin + rotation * center,
                half_extents: *half_extents,
                rotation: rotation * local,
            },
            SimpleCollider::Capsule { a, b, radius } => SimpleCollider::Capsule {
                a: origin + rotation * a,
                b: origin + rotation * b,
                radius: *radius,
            },
        }
    }
}

/// Closest point on segment `a`-`b` to `p` and its parameter in `[0, 1]`.
pub fn closest_point_on_segment(a: &NVec3, b: &NVec3, p: &NVec3) -> (NVec3, f64) {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (*a, 0.0);
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Overlap volume of a gravity field, centred on the field origin.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerVolume {
    Sphere { radius: f64 },
    Cuboid { half_extents: NVec3 },
}

impl TriggerVolume {
    /// Half-size of the volume's axis-aligned bounding box.
    pub fn bounds_extents(&self, rotation: &NQuat) -> NVec3 {
        match self {
            TriggerVolume::Sphere { radius } => NVec3::new(*radius, *radius, *radius),
            TriggerVolume::Cuboid { half_extents } => {
                let m = rotation.to_rotation_matrix();
                let abs = m.matrix().abs();
                abs * half_extents
            }
        }
    }

    /// Authoritative field radius: the length of the bounding-box extents.
    pub fn extent_radius(&self, rotation: &NQuat) -> f64 {
        self.bounds_extents(rotation).norm()
    }

    /// Whether world point `p` lies inside the volume placed at `origin`.
    pub fn contains(&self, origin: &NVec3, rotation: &NQuat, p: &NVec3) -> bool {
        match self {
            TriggerVolume::Sphere { radius } => (p - origin).norm() <= *radius,
            TriggerVolume::Cuboid { half_extents } => {
                let local = rotation.inverse_transform_vector(&(p - origin));
                local.x.abs() <= half_extents.x && local.y.abs() <= half_extents.y && local.z.abs() <= half_extents.z
            }
        }
    }
}
