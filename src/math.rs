//!
//! Math helpers over `glam` value types.
//!
//! `Mat4` is column-major. Composing a child under its parent is
//! `parent * child`, the same order as `mat4_mul(parent, child)`.
//!

use glam::{Mat4, Quat, Vec3};

/// Below this `1 - cos(angle)` threshold slerp falls back to linear interpolation.
pub const SLERP_EPSILON: f32 = 1e-6;

/// Distance under which `mat4_look_at` considers eye and center the same point.
pub const LOOK_AT_EPSILON: f32 = 0.001;

#[inline]
pub fn vec3_lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Spherical interpolation along the shortest arc.
///
/// `t = 0` gives `a`, `t = 1` gives `b` (or `-b` when the arc through `-b`
/// is shorter, which is the same rotation).
pub fn quat_slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut cos_omega = a.dot(b);
    let mut end = b;
    if cos_omega < 0.0 {
        cos_omega = -cos_omega;
        end = -b;
    }

    let (s0, s1) = if 1.0 - cos_omega > SLERP_EPSILON {
        let omega = cos_omega.acos();
        let sin_omega = omega.sin();
        (((1.0 - t) * omega).sin() / sin_omega, (t * omega).sin() / sin_omega)
    } else {
        (1.0 - t, t)
    };

    Quat::from_xyzw(
        s0 * a.x + s1 * end.x,
        s0 * a.y + s1 * end.y,
        s0 * a.z + s1 * end.z,
        s0 * a.w + s1 * end.w,
    )
}

/// Rotation of `rad` radians around `axis`. The axis does not need to be normalized.
pub fn quat_from_axis_angle(axis: Vec3, rad: f32) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let (s, c) = (rad * 0.5).sin_cos();
    Quat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c).normalize()
}

/// Rotates `v` by the unit quaternion `q`.
#[inline]
pub fn quat_rotate_vec3(q: Quat, v: Vec3) -> Vec3 {
    q * v
}

/// Parent-relative bone transform: scale first, then rotation, then translation.
#[inline]
pub fn mat4_from_rotation_translation_scale(rotation: Quat, translation: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

#[inline]
pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    *a * *b
}

/// Returns `None` when the matrix is singular.
pub fn mat4_invert(m: &Mat4) -> Option<Mat4> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    Some(m.inverse())
}

/// Right-handed OpenGL style projection, depth mapped to `[-1, 1]`.
#[inline]
pub fn mat4_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y, aspect, near, far)
}

pub fn mat4_look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    if eye.abs_diff_eq(center, LOOK_AT_EPSILON) {
        return Mat4::IDENTITY;
    }
    Mat4::look_at_rh(eye, center, up)
}

/// Element-wise interpolation of two matrices.
pub fn mat4_lerp_elements(a: &Mat4, b: &Mat4, t: f32) -> Mat4 {
    let a = a.to_cols_array();
    let b = b.to_cols_array();
    let mut out = [0.0; 16];
    lerp_slice(&a, &b, t, &mut out);
    Mat4::from_cols_array(&out)
}

/// `out[i] = a[i] + (b[i] - a[i]) * t` over the common length of the three slices.
pub fn lerp_slice(a: &[f32], b: &[f32], t: f32, out: &mut [f32]) {
    for ((o, x), y) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
        *o = x + (y - x) * t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_vec3_lerp() {
        let a = Vec3::new(0.0, 2.0, -4.0);
        let b = Vec3::new(10.0, 4.0, 4.0);
        assert_eq!(vec3_lerp(a, b, 0.0), a);
        assert_eq!(vec3_lerp(a, b, 1.0), b);
        assert_eq!(vec3_lerp(a, b, 0.5), Vec3::new(5.0, 3.0, 0.0));
        assert_eq!(vec3_lerp(a, b, 2.0), Vec3::new(20.0, 6.0, 12.0));
    }

    #[test]
    fn test_quat_slerp() {
        let a = Quat::IDENTITY;
        let b = quat_from_axis_angle(Vec3::Y, FRAC_PI_2);

        assert!(quat_slerp(a, b, 0.0).abs_diff_eq(a, 1e-6));
        assert!(quat_slerp(a, b, 1.0).abs_diff_eq(b, 1e-6));

        let half = quat_slerp(a, b, 0.5);
        assert!(half.abs_diff_eq(quat_from_axis_angle(Vec3::Y, FRAC_PI_2 * 0.5), 1e-5));

        for i in 0..=10 {
            let q = quat_slerp(a, b, i as f32 / 10.0);
            assert!((q.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_quat_slerp_shortest_path() {
        let a = quat_from_axis_angle(Vec3::Z, 0.1);
        let b = -quat_from_axis_angle(Vec3::Z, 0.3);
        let q = quat_slerp(a, b, 0.5);
        assert!(q.abs_diff_eq(quat_from_axis_angle(Vec3::Z, 0.2), 1e-5));

        let same = quat_slerp(a, a, 0.3);
        assert!(same.abs_diff_eq(a, 1e-6));
    }

    #[test]
    fn test_quat_from_axis_angle() {
        let q = quat_from_axis_angle(Vec3::new(0.0, 0.0, 5.0), PI);
        assert!(q.abs_diff_eq(Quat::from_xyzw(0.0, 0.0, 1.0, 0.0), 1e-6));
        assert_eq!(quat_from_axis_angle(Vec3::ZERO, 1.0), Quat::IDENTITY);
    }

    #[test]
    fn test_quat_rotate_vec3() {
        let q = quat_from_axis_angle(Vec3::Z, FRAC_PI_2);
        let v = quat_rotate_vec3(q, Vec3::X);
        assert!(v.abs_diff_eq(Vec3::Y, 1e-6));
        assert!(v.abs_diff_eq(q * Vec3::X, 1e-6));
    }

    #[test]
    fn test_mat4_compose_and_mul() {
        let parent = mat4_from_rotation_translation_scale(Quat::IDENTITY, Vec3::new(5.0, 0.0, 0.0), Vec3::ONE);
        let child = mat4_from_rotation_translation_scale(Quat::IDENTITY, Vec3::new(0.0, 1.0, 0.0), Vec3::ONE);
        let world = mat4_mul(&parent, &child);
        assert_eq!(world.w_axis.truncate(), Vec3::new(5.0, 1.0, 0.0));

        let rotated = mat4_from_rotation_translation_scale(
            quat_from_axis_angle(Vec3::Z, FRAC_PI_2),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::splat(2.0),
        );
        let p = rotated.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_mat4_invert() {
        let m = mat4_from_rotation_translation_scale(
            quat_from_axis_angle(Vec3::X, 0.7),
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(1.0, 2.0, 0.5),
        );
        let inv = mat4_invert(&m).unwrap();
        assert!(mat4_mul(&m, &inv).abs_diff_eq(Mat4::IDENTITY, 1e-5));

        let singular = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(mat4_invert(&singular).is_none());
    }

    #[test]
    fn test_mat4_look_at() {
        let m = mat4_look_at(Vec3::ONE, Vec3::new(1.0005, 1.0, 1.0), Vec3::Y);
        assert_eq!(m, Mat4::IDENTITY);

        let m = mat4_look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }

    #[test]
    fn test_mat4_perspective() {
        let m = mat4_perspective(FRAC_PI_2, 1.0, 1.0, 100.0);
        assert!((m.x_axis.x - 1.0).abs() < 1e-6);
        assert!((m.y_axis.y - 1.0).abs() < 1e-6);
        assert_eq!(m.z_axis.w, -1.0);
    }

    #[test]
    fn test_mat4_lerp_elements() {
        let a = Mat4::IDENTITY;
        let b = Mat4::from_translation(Vec3::new(2.0, 4.0, 6.0));
        let m = mat4_lerp_elements(&a, &b, 0.5);
        assert_eq!(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mat4_lerp_elements(&a, &b, 0.0), a);
    }
}
