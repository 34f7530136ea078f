//! Sentinel and flat-vector behaviour shared by every model input type.

use simbridge_core::data::Sentinel;
use simbridge_core::error::InputError;
use simbridge_core::flat::FlatVector;
use simbridge_core::types::Gear;
use simbridge_model::{AmesimDynamicalModelInput, CustomDynamicalModelInput, TrackModelInput};

fn sample_amesim() -> AmesimDynamicalModelInput {
    AmesimDynamicalModelInput::new(0.4, 0.1, -30.0, Gear::Reverse)
}

fn sample_track() -> TrackModelInput {
    TrackModelInput::new(1.5, 0.5, 2.0, -0.2, 1.0, 3.0)
}

fn sample_custom() -> CustomDynamicalModelInput {
    let values: Vec<f64> = (1..=15).map(f64::from).collect();
    CustomDynamicalModelInput::from_flat(&values).unwrap()
}

fn check_sentinel<T>(sample: T, arity: usize)
where
    T: Sentinel + FlatVector + Copy + std::fmt::Debug,
{
    assert_eq!(T::ARITY, arity);

    let zero = T::zeroed();
    assert!(zero.is_fully_set());
    assert!(T::unset().is_unset());
    assert!(!T::unset().is_fully_set());

    // An all-unset patch leaves the value untouched.
    let mut value = sample;
    value.merge(&T::unset());
    assert!(value.flat_eq(&sample), "{value:?} != {sample:?}");

    // An all-set patch behaves like an absolute set.
    let mut value = T::zeroed();
    value.merge(&sample);
    assert!(value.flat_eq(&sample), "{value:?} != {sample:?}");

    let flat = sample.to_flat();
    assert_eq!(flat.len(), arity);
    assert!(T::from_flat(&flat).unwrap().flat_eq(&sample));
}

#[test]
fn amesim_input_follows_sentinel_convention() {
    check_sentinel(sample_amesim(), 4);
}

#[test]
fn track_input_follows_sentinel_convention() {
    check_sentinel(sample_track(), 6);
}

#[test]
fn custom_input_follows_sentinel_convention() {
    check_sentinel(sample_custom(), 15);
}

#[test]
fn partial_patch_only_touches_set_fields() {
    let mut input = sample_track();
    let mut patch = TrackModelInput::unset();
    patch.distance_offset = 10.0;
    input.merge(&patch);
    assert!((input.distance_offset - 10.0).abs() < f64::EPSILON);
    assert!((input.velocity_multiplier - 1.5).abs() < f64::EPSILON);
}

#[test]
fn wrong_arity_is_rejected_for_every_input() {
    let err = AmesimDynamicalModelInput::from_flat(&[1.0; 5]).unwrap_err();
    assert_eq!(
        err,
        InputError::ArityMismatch {
            target: AmesimDynamicalModelInput::NAME,
            expected: 4,
            got: 5,
        }
    );
    assert!(TrackModelInput::from_flat(&[]).is_err());
    assert!(CustomDynamicalModelInput::from_flat(&[0.0; 14]).is_err());
}
