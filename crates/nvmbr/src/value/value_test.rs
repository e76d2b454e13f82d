use super::*;

#[test]
fn nil_true_false_are_distinct() {
    assert!(Value::nil().is_nil());
    assert!(Value::bool(true).is_bool());
    assert!(Value::bool(false).is_bool());
    assert!(!Value::nil().values_equal(Value::bool(false)));
}

#[test]
fn numbers_round_trip() {
    for n in [0.0, -0.0, 1.5, -42.0, f64::MAX, f64::MIN_POSITIVE] {
        let v = Value::number(n);
        assert!(v.is_number());
        assert_eq!(v.as_number(), n);
    }
}

#[test]
fn falsey_is_only_nil_and_false() {
    assert!(Value::nil().is_falsey());
    assert!(Value::bool(false).is_falsey());
    assert!(!Value::bool(true).is_falsey());
    assert!(!Value::number(0.0).is_falsey());
}

#[test]
fn object_handles_round_trip() {
    let handle = Handle::from_u32(7);
    let v = Value::object(handle);
    assert!(v.is_object());
    assert_eq!(v.as_object().to_u32(), 7);
}

proptest::proptest! {
    #[test]
    fn any_finite_f64_round_trips(n: f64) {
        let v = Value::number(n);
        if n.is_nan() {
            assert!(v.as_number().is_nan());
        } else {
            assert_eq!(v.as_number(), n);
        }
    }
}
