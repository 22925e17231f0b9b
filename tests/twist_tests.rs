use glam::Vec3;
use twist_flower::material::{
    prepare_program, twist_angle, twist_chunk, twist_matrix, twist_vertex, Material, NormalMaterial, ProgramCache,
    ShaderSource, TwistAmount, TwistMaterial,
};

fn twist(amount: f32) -> Material {
    Material::Twist(TwistMaterial::new(
        TwistAmount::new(amount).expect("positive amount"),
    ))
}

#[cfg(test)]
mod twist_tests {
    use super::*;

    #[test]
    fn test_twist_is_identity_when_angle_is_zero() {
        // sin(0 + 0) = 0
        let position = Vec3::new(0.3, 0.0, -0.7);
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let (p, n) = twist_vertex(position, normal, 0.0, 100.0);

        assert!(p.distance(position) < 1e-6);
        assert!(n.distance(normal) < 1e-6);
    }

    #[test]
    fn test_twist_rotates_about_y_only() {
        for i in 0..50 {
            let t = i as f32 * 0.37;
            let position = Vec3::new((t * 1.3).sin(), t * 0.1 - 2.0, (t * 0.7).cos());
            let (p, _) = twist_vertex(position, Vec3::Y, t, 100.0);

            assert_eq!(p.y, position.y);
            let before = position.x.hypot(position.z);
            let after = p.x.hypot(p.z);
            assert!((before - after).abs() < 1e-5);
        }
    }

    #[test]
    fn test_twist_angle_is_bounded_by_amount() {
        for i in 0..100 {
            let time = i as f32 * 0.113;
            let angle = twist_angle(time, 0.5, 100.0);
            assert!(angle.abs() <= 0.01 + 1e-7);
        }
    }

    #[test]
    fn test_twist_angle_matches_formula() {
        for i in 0..40 {
            for j in 0..25 {
                let time = i as f32 * 0.25;
                let y = j as f32 * 0.2 - 2.5;
                let expected = (time + y).sin() / 100.0;
                assert!((twist_angle(time, y, 100.0) - expected).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn test_twist_matrix_is_proper_rotation() {
        for i in 0..200 {
            let time = i as f32 * 0.05;
            let theta = twist_angle(time, 0.3, 100.0);
            let m = twist_matrix(theta);

            assert!((m.determinant() - 1.0).abs() < 1e-5);
            let product = m * m.transpose();
            assert!(product.abs_diff_eq(glam::Mat3::IDENTITY, 1e-5));
        }
    }

    #[test]
    fn test_large_angles_stay_proper_rotations() {
        // Small amounts give angles well past a full turn
        for i in 0..50 {
            let m = twist_matrix(twist_angle(i as f32 * 0.7, 1.0, 0.05));
            assert!((m.determinant() - 1.0).abs() < 1e-5);
            assert!((m * m.transpose()).abs_diff_eq(glam::Mat3::IDENTITY, 1e-5));
        }
    }

    #[test]
    fn test_tiny_amount_keeps_nonzero_divisor() {
        let amount = TwistAmount::new(0.04).expect("positive amount");
        let chunk = twist_chunk(amount);
        assert!(chunk.contains("sin(time.value + position.y) / 0.04;"));

        let (p, n) = twist_vertex(Vec3::new(0.5, 0.2, -0.3), Vec3::Z, 1.0, amount.get());
        assert!(p.is_finite() && n.is_finite());
    }

    #[test]
    fn test_matches_shader_row_vector_convention() {
        // theta = sin(pi/2) / 1 = 1
        let (p, _) = twist_vertex(Vec3::X, Vec3::Y, std::f32::consts::FRAC_PI_2, 1.0);
        let expected = Vec3::new(1f32.cos(), 0.0, -(1f32.sin()));
        assert!(p.distance(expected) < 1e-5);
    }

    #[test]
    fn test_patched_source_is_complete() {
        let mut material = twist(100.0);
        let mut cache: ProgramCache<String> = ProgramCache::new();
        let (_, code) = prepare_program(&mut material, &mut cache, |_, code| Ok(code.to_string()))
            .expect("compile succeeds");

        assert!(code.contains("@group(1) @binding(0)"));
        assert!(code.contains("var<uniform> time: TimeUniform;"));
        assert!(code.contains("sin(time.value + position.y) / 100.0"));
        assert!(code.contains("var transformed = position * m;"));
        assert!(!code.contains("#include"));
    }

    #[test]
    fn test_fractional_amount_is_kept_in_source() {
        let mut material = twist(2.5);
        let mut source = ShaderSource::normal_material();
        material.on_before_compile(&mut source);

        assert!(source.code.contains("/ 2.5;"));
    }

    #[test]
    fn test_cache_key_separates_amounts_and_materials() {
        let a = twist(100.0).program_cache_key();
        let b = twist(100.0).program_cache_key();
        let c = twist(50.0).program_cache_key();
        let plain = Material::Normal(NormalMaterial::default()).program_cache_key();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, plain);
    }

    #[test]
    fn test_shared_program_still_patches_each_material() {
        let mut cache: ProgramCache<String> = ProgramCache::new();
        let mut flowers = vec![twist(100.0), twist(100.0), twist(100.0)];

        for material in &mut flowers {
            prepare_program(material, &mut cache, |_, code| Ok(code.to_string()))
                .expect("compile succeeds");
        }

        assert_eq!(cache.compiles(), 1);
        assert!(flowers.iter().all(|material| material.shader().is_some()));
    }
}
