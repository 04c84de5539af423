use livechart::core::{
    FixedViewport, ForcedPoint, HighestValues, MinimumViewport, Range, RangePolicy,
    RangePolicyConfig, Unbounded,
};

fn range(min: f64, max: f64) -> Range {
    Range::new(min, max).expect("valid range")
}

#[test]
fn minimum_viewport_keeps_configured_range_visible() {
    let policy = MinimumViewport::new(range(0.0, 100.0)).expect("policy");
    assert_eq!(policy.resolve(range(20.0, 80.0)), range(0.0, 100.0));
    assert_eq!(policy.resolve(range(-10.0, 150.0)), range(-10.0, 150.0));
}

#[test]
fn fixed_viewport_ignores_data() {
    let policy = FixedViewport::new(range(-1.0, 1.0)).expect("policy");
    assert_eq!(policy.resolve(range(-500.0, 500.0)), range(-1.0, 1.0));
    assert_eq!(FixedViewport::unconfigured().resolve(range(3.0, 4.0)), range(3.0, 4.0));
}

#[test]
fn forced_point_extends_violated_bound_only() {
    let policy = ForcedPoint::new(0.0).expect("policy");
    assert_eq!(policy.resolve(range(5.0, 9.0)), range(0.0, 9.0));
    assert_eq!(policy.resolve(range(-9.0, -5.0)), range(-9.0, 0.0));
    assert_eq!(policy.resolve(range(-2.0, 2.0)), range(-2.0, 2.0));
}

#[test]
fn highest_values_trails_data_maximum() {
    let policy = HighestValues::new(10.0).expect("policy");
    assert_eq!(policy.resolve(range(0.0, 100.0)), range(90.0, 100.0));
    assert_eq!(policy.resolve(range(95.0, 100.0)), range(95.0, 100.0));
    assert!(HighestValues::new(0.0).is_err());
}

#[test]
fn unbounded_passes_data_through() {
    assert_eq!(Unbounded.resolve(range(-3.0, 7.0)), range(-3.0, 7.0));
    assert!(!Unbounded.is_configured());
}

#[test]
fn policies_round_trip_through_config() {
    let policies: Vec<Box<dyn RangePolicy>> = vec![
        Box::new(Unbounded),
        Box::new(FixedViewport::new(range(1.0, 2.0)).expect("policy")),
        Box::new(MinimumViewport::new(range(0.0, 100.0)).expect("policy")),
        Box::new(FixedViewport::unconfigured()),
        Box::new(MinimumViewport::unconfigured()),
        Box::new(ForcedPoint::new(4.0).expect("policy")),
        Box::new(HighestValues::new(60.0).expect("policy")),
    ];
    for policy in policies {
        let config = policy.config();
        let json = serde_json::to_string(&config).expect("serialize");
        let restored: RangePolicyConfig = serde_json::from_str(&json).expect("deserialize");
        let rebuilt = restored.build().expect("build");
        assert_eq!(
            rebuilt.resolve(range(10.0, 200.0)),
            policy.resolve(range(10.0, 200.0))
        );
    }
}

#[test]
fn unconfigured_viewport_survives_json() {
    let json = serde_json::to_string(&FixedViewport::unconfigured().config()).expect("serialize");
    assert_eq!(json, r#"{"kind":"fixed_viewport"}"#);
    let restored: RangePolicyConfig = serde_json::from_str(&json).expect("deserialize");
    let rebuilt = restored.build().expect("build");
    assert!(!rebuilt.is_configured());
    assert_eq!(rebuilt.config(), FixedViewport::unconfigured().config());

    let restored: RangePolicyConfig =
        serde_json::from_str(r#"{"kind":"minimum_viewport","min":null,"max":null}"#)
            .expect("deserialize nulls");
    assert!(!restored.build().expect("build").is_configured());
}
