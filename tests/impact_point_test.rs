//! Integration tests: closest approach of straight and helical tracks to vertex
//! hypotheses, refitted parameters at the approach point, and compatibility.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use trkgeom::propagator::helix::Helix;
use trkgeom::units::{GEV, T};
use trkgeom::{
    BoundParameters, ConstantField, Context, Direction, Error, HelixPropagator,
    ImpactPoint3dEstimator, ImpactPointConfig, Matrix5, NullField, StraightLinePropagator,
    Vector3, Vector5,
};

type LineEstimator = ImpactPoint3dEstimator<StraightLinePropagator, NullField>;
type HelixEstimator = ImpactPoint3dEstimator<HelixPropagator<ConstantField>, ConstantField>;

const BZ: f64 = 2.0 * T;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trkgeom=debug")
        .with_test_writer()
        .try_init();
}

fn line_estimator() -> anyhow::Result<LineEstimator> {
    let config = ImpactPointConfig::builder(NullField, Arc::new(StraightLinePropagator)).build()?;
    Ok(ImpactPoint3dEstimator::new(config))
}

fn helix_estimator() -> anyhow::Result<HelixEstimator> {
    let field = ConstantField::along_z(BZ);
    let config = ImpactPointConfig::builder(field, Arc::new(HelixPropagator::new(field))).build()?;
    Ok(ImpactPoint3dEstimator::new(config))
}

/// Random perigee track: |d0|, |z0| below a few mm, pT between 0.5 and 10 GeV.
fn random_track(rng: &mut StdRng, center: Vector3) -> anyhow::Result<BoundParameters> {
    let d0 = rng.gen_range(-2.0..2.0);
    let z0 = rng.gen_range(-5.0..5.0);
    let phi = rng.gen_range(-3.1..3.1);
    let theta: f64 = rng.gen_range(0.5..2.6);
    let pt = rng.gen_range(0.5..10.0) * GEV;
    let charge = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let qop = charge * theta.sin() / pt;
    Ok(BoundParameters::perigee(center, d0, z0, phi, theta, qop, None)?)
}

fn random_vertex(rng: &mut StdRng, spread: f64) -> Vector3 {
    let normal = Normal::new(0.0, spread).unwrap();
    Vector3::new(
        normal.sample(rng),
        normal.sample(rng),
        normal.sample(rng),
    )
}

#[test]
fn test_straight_track_along_x() -> anyhow::Result<()> {
    init_tracing();
    let ctx = Context::default();
    let est = line_estimator()?;
    let track = BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 1.0, None)?;
    let vertex = Vector3::new(0.0, 3.0, 4.0);

    assert_relative_eq!(est.calculate_distance(&ctx, &track, &vertex)?, 5.0, epsilon = 1e-12);
    let approach = est.closest_approach(&ctx, &track, &vertex)?;
    assert_relative_eq!(approach.position, Vector3::zeros(), epsilon = 1e-12);

    let refit = est.params_at_closest_approach(&ctx, &track, &vertex)?;
    assert_relative_eq!(refit.position(&ctx.geometry)?, Vector3::zeros(), epsilon = 1e-9);
    assert_relative_eq!(refit.local_position().x, -5.0, epsilon = 1e-9);
    assert!(refit.local_position().y.abs() < 1e-9);
    Ok(())
}

#[test]
fn test_zero_field_matches_point_to_line_distance() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = line_estimator()?;
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let track = random_track(&mut rng, Vector3::zeros())?;
        let vertex = random_vertex(&mut rng, 20.0);
        let p0 = track.position(&ctx.geometry)?;
        let analytic = (vertex - p0).cross(&track.direction()).norm();

        let distance = est.calculate_distance(&ctx, &track, &vertex)?;
        assert!(distance >= 0.0);
        assert_relative_eq!(distance, analytic, epsilon = 1e-10);
    }
    Ok(())
}

#[test]
fn test_distance_translation_invariant() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = helix_estimator()?;
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..100 {
        let track = random_track(&mut rng, Vector3::zeros())?;
        let vertex = random_vertex(&mut rng, 5.0);
        let offset = random_vertex(&mut rng, 100.0);

        let p = track.parameters();
        let shifted = BoundParameters::perigee(offset, p[0], p[1], p[2], p[3], p[4], None)?;

        let d = est.calculate_distance(&ctx, &track, &vertex)?;
        let d_shifted = est.calculate_distance(&ctx, &shifted, &(vertex + offset))?;
        assert!(d >= 0.0);
        assert_relative_eq!(d, d_shifted, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn test_helix_converges_within_default_cap() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = helix_estimator()?;
    assert_eq!(est.config().max_iterations(), 20);
    let mut rng = StdRng::seed_from_u64(23);

    for _ in 0..200 {
        let track = random_track(&mut rng, Vector3::zeros())?;
        let vertex = random_vertex(&mut rng, 10.0);
        let approach = est.closest_approach(&ctx, &track, &vertex)?;
        assert!(approach.iterations >= 1 && approach.iterations <= 20);
        assert!(approach.radius.is_finite());
        // Stationary point: the offset to the vertex is orthogonal to the track.
        assert!(approach.delta_r.dot(&approach.direction).abs() < 1e-8);
    }
    Ok(())
}

#[test]
fn test_vertex_beyond_helix_axis_of_soft_track() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = helix_estimator()?;
    // 0.1 GeV, positive charge: clockwise circle around (0, -R).
    let radius = 0.1 * GEV / BZ;
    let track = BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 10.0, None)?;
    let vertex = Vector3::new(0.0, -250.0, 0.0);

    let approach = est.closest_approach(&ctx, &track, &vertex)?;
    assert_relative_eq!(approach.distance(), 2.0 * radius - 250.0, epsilon = 1e-8);
    assert_relative_eq!(approach.position, Vector3::new(0.0, -2.0 * radius, 0.0), epsilon = 1e-8);
    Ok(())
}

#[test]
fn test_soft_tracks_converge_far_along_and_beyond_axis() -> anyhow::Result<()> {
    init_tracing();
    let ctx = Context::default();
    let est = helix_estimator()?;
    let mut rng = StdRng::seed_from_u64(29);

    for i in 0..300 {
        let theta: f64 = rng.gen_range(0.7..2.4);
        let pt = rng.gen_range(0.08..0.3) * GEV;
        let charge = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let track = BoundParameters::perigee(
            Vector3::zeros(),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-3.1..3.1),
            theta,
            charge * theta.sin() / pt,
            None,
        )?;
        let helix = Helix::new(
            track.position(&ctx.geometry)?,
            track.phi(),
            theta,
            track.qop(),
            BZ,
        );
        let radius = pt / BZ;
        let turn_length = std::f64::consts::TAU * radius / theta.sin();

        // Even cases: up to almost a full turn along the track, close to it.
        // Odd cases: around half a turn, displaced towards or away from the axis.
        let (fraction, offset) = if i % 2 == 0 {
            (rng.gen_range(0.3..0.95), rng.gen_range(-2.0..2.0))
        } else {
            (rng.gen_range(0.35..0.65), rng.gen_range(-0.6..0.6) * radius)
        };
        let s = fraction * turn_length;
        let inward = {
            let k = helix.direction_derivative(s);
            Vector3::new(k.x, k.y, 0.0).normalize()
        };
        let dz = rng.gen_range(-1.0..1.0);
        let vertex = helix.position(s) + offset * inward + dz * Vector3::z();

        let approach = est.closest_approach(&ctx, &track, &vertex)?;
        assert!(approach.iterations >= 1 && approach.iterations <= 20, "case {i}");
        assert!(approach.delta_r.dot(&approach.direction).abs() < 1e-8, "case {i}");
        assert!(approach.distance() <= offset.hypot(dz) + 1e-9, "case {i}");
    }
    Ok(())
}

#[test]
fn test_iteration_cap_reports_numerical_failure() -> anyhow::Result<()> {
    let field = ConstantField::along_z(BZ);
    let config = ImpactPointConfig::builder(field, Arc::new(HelixPropagator::new(field)))
        .max_iterations(1)
        .build()?;
    let est = ImpactPoint3dEstimator::new(config);
    let track = BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, 1.0, 1.0, None)?;

    let err = est
        .calculate_distance(&Context::default(), &track, &Vector3::new(50.0, 30.0, 10.0))
        .unwrap_err();
    assert!(matches!(err, Error::NumericalFailure { iterations: 1, .. }));
    Ok(())
}

#[test]
fn test_params_at_closest_approach_reproduce_approach_point() -> anyhow::Result<()> {
    init_tracing();
    let ctx = Context::default();
    let est = helix_estimator()?;
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..50 {
        let track = random_track(&mut rng, Vector3::zeros())?;
        let vertex = random_vertex(&mut rng, 10.0);

        let approach = est.closest_approach(&ctx, &track, &vertex)?;
        let refit = est.params_at_closest_approach(&ctx, &track, &vertex)?;

        assert_relative_eq!(refit.position(&ctx.geometry)?, approach.position, epsilon = 1e-6);
        assert_relative_eq!(refit.direction(), approach.direction, epsilon = 1e-9);
        assert_relative_eq!(refit.qop(), track.qop());
    }
    Ok(())
}

#[test]
fn test_config_forces_backward_propagation() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = helix_estimator()?;
    assert_eq!(est.config().propagator_options().direction, Direction::Backward);

    // A vertex downstream of the perigee is reached with positive path length
    // along the momentum, reported negative in the backward convention.
    let track = BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, FRAC_PI_2, 1.0, None)?;
    let vertex = Vector3::new(40.0, 0.0, 0.0);
    let approach = est.closest_approach(&ctx, &track, &vertex)?;
    let plane = trkgeom::PlaneSurface::from_frame(vertex, approach.delta_r, approach.direction)?;
    let result = trkgeom::Propagator::propagate(
        est.config().propagator(),
        &ctx,
        &track,
        &plane.into(),
        est.config().propagator_options(),
    )?;
    assert!(result.path_length < 0.0);
    Ok(())
}

#[test]
fn test_compatibility_of_vertex_on_track_is_zero() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = helix_estimator()?;
    let cov = Matrix5::from_diagonal(&Vector5::new(0.01, 0.04, 1e-6, 1e-6, 1e-8));
    let track = BoundParameters::perigee(
        Vector3::new(0.1, -0.2, 0.0),
        0.05,
        1.0,
        0.8,
        1.1,
        -1.0 / (2.0 * GEV),
        Some(cov),
    )?;

    let helix = Helix::new(
        track.position(&ctx.geometry)?,
        track.phi(),
        track.theta(),
        track.qop(),
        BZ,
    );
    let vertex = helix.position(30.0);

    let refit = est.params_at_closest_approach(&ctx, &track, &vertex)?;
    let chi2 = est.vertex_compatibility(&ctx, Some(&refit), &vertex)?;
    assert!(chi2 >= 0.0 && chi2 < 1e-8, "chi2 = {chi2}");
    Ok(())
}

#[test]
fn test_compatibility_scales_with_inverse_variance() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = line_estimator()?;
    let vertex = Vector3::new(10.0, 0.4, -0.3);

    let chi2_for = |scale: f64| -> anyhow::Result<f64> {
        let cov = Matrix5::from_diagonal(&Vector5::new(0.01, 0.02, 1e-6, 1e-6, 1e-8)) * scale;
        let track =
            BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.1, 1.3, 1.0, Some(cov))?;
        let refit = est.params_at_closest_approach(&ctx, &track, &vertex)?;
        Ok(est.vertex_compatibility(&ctx, Some(&refit), &vertex)?)
    };

    let base = chi2_for(1.0)?;
    assert!(base > 0.0);
    assert_relative_eq!(chi2_for(4.0)?, base / 4.0, max_relative = 1e-9);
    assert_relative_eq!(chi2_for(0.25)?, base * 4.0, max_relative = 1e-9);
    Ok(())
}

#[test]
fn test_compatibility_rejects_missing_inputs() -> anyhow::Result<()> {
    let ctx = Context::default();
    let est = line_estimator()?;
    let track = BoundParameters::perigee(Vector3::zeros(), 0.0, 0.0, 0.0, 1.0, 1.0, None)?;
    let vertex = Vector3::new(1.0, 1.0, 1.0);

    assert!(matches!(
        est.vertex_compatibility(&ctx, None, &vertex),
        Err(Error::InvalidInput(_))
    ));
    let refit = est.params_at_closest_approach(&ctx, &track, &vertex)?;
    assert!(refit.covariance().is_none());
    assert!(matches!(
        est.vertex_compatibility(&ctx, Some(&refit), &vertex),
        Err(Error::InvalidInput(_))
    ));
    Ok(())
}

#[test]
fn test_estimator_shared_across_threads() -> anyhow::Result<()> {
    let est = Arc::new(helix_estimator()?);
    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let est = Arc::clone(&est);
            std::thread::spawn(move || -> trkgeom::Result<f64> {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut total = 0.0;
                for _ in 0..20 {
                    let track = random_track(&mut rng, Vector3::zeros())
                        .map_err(|_| Error::InvalidInput("track".into()))?;
                    let vertex = random_vertex(&mut rng, 5.0);
                    total += est.calculate_distance(&Context::default(), &track, &vertex)?;
                }
                Ok(total)
            })
        })
        .collect();

    for h in handles {
        let total = h.join().expect("worker panicked")?;
        assert!(total.is_finite());
    }
    Ok(())
}
