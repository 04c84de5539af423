use livechart::axis::{AxisConfig, TickSpacing};
use livechart::core::{DataPoint, RangePolicyConfig, StorageKind, TransformKind, Viewport};
use livechart::format::{FormatterConfig, LabelLocale, TimeUnit};
use livechart::{ChartConfig, ChartContext, FixedFontMetrics, RenderFrame, SchedulerTuning};

fn sample_config() -> ChartConfig {
    ChartConfig {
        viewport: Viewport::new(1280, 720),
        x_axis: AxisConfig {
            spacing: TickSpacing::new(10.0, 2.0).expect("spacing"),
            start_major_tick: true,
            range_policy: RangePolicyConfig::HighestValues { width: 3_600.0 },
            formatter: FormatterConfig::Date {
                pattern: "%H:%M:%S".to_owned(),
                unit: TimeUnit::Seconds,
            },
            transform: TransformKind::Linear,
        },
        y_axis: AxisConfig {
            spacing: TickSpacing::default(),
            start_major_tick: false,
            range_policy: RangePolicyConfig::MinimumViewport {
                min: Some(0.0),
                max: Some(100.0),
            },
            formatter: FormatterConfig::AutoUnits {
                fraction_digits: 1,
                locale: LabelLocale::EsEs,
            },
            transform: TransformKind::Log10,
        },
        scheduler: SchedulerTuning {
            min_sleep_ms: 20,
            max_sleep_ms: 500,
            step_ms: 5,
        },
    }
}

#[test]
fn chart_config_round_trips_through_json() {
    let config = sample_config();
    let json = config.to_json_pretty().expect("serialize");
    let restored = ChartConfig::from_json_str(&json).expect("deserialize");
    assert_eq!(restored, config);
}

#[test]
fn empty_json_yields_default_config() {
    let config = ChartConfig::from_json_str("{}").expect("config");
    assert_eq!(config, ChartConfig::default());
}

#[test]
fn storage_kind_is_tagged_in_json() {
    let json = serde_json::to_string(&StorageKind::RingBuffer { capacity: 16 }).expect("json");
    assert_eq!(json, r#"{"kind":"ring_buffer","capacity":16}"#);
}

#[test]
fn render_frame_snapshot_round_trips() {
    let context = ChartContext::new();
    let chart = context.create_chart(&sample_config()).expect("chart");
    let series = context
        .create_series("rps", StorageKind::InsertionOrder)
        .expect("series");
    chart.attach(&series).expect("attach");
    for step in 0..10 {
        let x = 1_700_000_000.0 + f64::from(step) * 60.0;
        series
            .add_point(DataPoint::new(x, f64::from(step + 1) * 10.0))
            .expect("add");
    }

    let frame = chart.render_pass(&FixedFontMetrics::default());
    let json = frame.to_json_pretty().expect("json");
    let restored: RenderFrame = serde_json::from_str(&json).expect("frame");
    assert_eq!(restored.pass, frame.pass);
    assert_eq!(restored.point_count(), 10);
    assert_eq!(restored.series[0].name, "rps");
}
