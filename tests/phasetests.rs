use std::time::Duration;
use TrafficLightMini::core::config::{LightConfig, MAX_INTERVAL_SECS};
use TrafficLightMini::core::error::LightError;
use TrafficLightMini::core::event::PhaseChange;
use TrafficLightMini::core::log::TransitionLog;
use TrafficLightMini::core::phase::{AtomicPhase, IntervalSampler, Phase, PhaseCycle};

const SECOND: Duration = Duration::from_secs(1);

#[test]
fn test_transition_fires_only_after_interval() {
    for secs in 4..=6 {
        let interval = Duration::from_secs(secs);
        let mut cycle = PhaseCycle::new(Duration::ZERO, interval);

        assert_eq!(cycle.poll(interval - Duration::from_millis(1), || SECOND), None);
        assert_eq!(cycle.phase(), Phase::Red);
        assert_eq!(cycle.transitions(), 0);

        assert_eq!(cycle.poll(interval, || SECOND), Some(Phase::Green));
        assert_eq!(cycle.deadline(), interval + SECOND);
    }
}

#[test]
fn test_phases_strictly_alternate() {
    let mut sampler = IntervalSampler::from_config(&LightConfig::default().with_seed(42)).unwrap();
    let mut cycle = PhaseCycle::new(Duration::ZERO, sampler.sample());
    let mut published = vec![Phase::Red];

    // walk a fake clock forward in 100ms steps for ten minutes
    let mut now = Duration::ZERO;
    while now < Duration::from_secs(600) {
        now += Duration::from_millis(100);
        if let Some(phase) = cycle.poll(now, || sampler.sample()) {
            published.push(phase);
        }
    }

    assert!(published.len() > 90);
    for pair in published.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    assert_eq!(published[1], Phase::Green);
}

#[test]
fn test_sampled_intervals_stay_in_bounds() {
    let mut sampler = IntervalSampler::from_config(&LightConfig::default()).unwrap();
    let mut seen = [false; 3];
    for _ in 0..1000 {
        let secs = sampler.sample().as_secs();
        assert!((4..=6).contains(&secs), "interval {secs}s out of range");
        seen[(secs - 4) as usize] = true;
    }
    assert_eq!(seen, [true; 3]);
}

#[test]
fn test_seeded_sampler_is_reproducible() {
    let mut a = IntervalSampler::from_config(&LightConfig::default().with_seed(7)).unwrap();
    let mut b = IntervalSampler::from_config(&LightConfig::default().with_seed(7)).unwrap();
    let first: Vec<_> = (0..20).map(|_| a.sample()).collect();
    let second: Vec<_> = (0..20).map(|_| b.sample()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_atomic_phase_round_trip() {
    let cell = AtomicPhase::default();
    assert_eq!(cell.load(), Phase::Red);
    cell.store(Phase::Green);
    assert_eq!(cell.load(), Phase::Green);
    assert_eq!(Phase::Green.toggled(), Phase::Red);
    assert_eq!(Phase::Red.to_string(), "red");
}

#[test]
fn test_config_from_json() {
    let config = LightConfig::from_json(r#"{ "seed": 3 }"#).unwrap();
    assert_eq!(config, LightConfig::default().with_seed(3));
    assert_eq!(config.min_interval_secs, 4);
    assert_eq!(config.max_interval_secs, 6);

    let err = LightConfig::from_json(r#"{ "min_interval_secs": 8 }"#).unwrap_err();
    assert!(matches!(err, LightError::InvalidConfig(_)));

    let err = LightConfig::from_json(r#"{ "min_interval_secs": 0 }"#).unwrap_err();
    assert!(matches!(err, LightError::InvalidConfig(_)));

    let err = LightConfig::from_json("not json").unwrap_err();
    assert!(matches!(err, LightError::Serialize(_)));
}

#[test]
fn test_phase_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Phase::Green).unwrap(), r#""green""#);
    let phase: Phase = serde_json::from_str(r#""red""#).unwrap();
    assert_eq!(phase, Phase::Red);
}

#[test]
fn test_deadline_saturates_near_clock_end() {
    let start = Duration::MAX - SECOND;
    let mut cycle = PhaseCycle::new(start, Duration::from_secs(5));
    assert_eq!(cycle.deadline(), Duration::MAX);
    assert_eq!(cycle.poll(Duration::MAX, || SECOND), None);
    assert_eq!(cycle.phase(), Phase::Red);
}

#[test]
fn test_interval_bounds_are_capped() {
    let config = LightConfig {
        min_interval_secs: u64::MAX / 2 + 1,
        max_interval_secs: u64::MAX / 2 + 1,
        ..LightConfig::default()
    };
    assert!(matches!(config.validate(), Err(LightError::InvalidConfig(_))));

    let config = LightConfig {
        max_interval_secs: MAX_INTERVAL_SECS,
        ..LightConfig::default()
    };
    assert!(config.validate().is_ok());

    let err = LightConfig::from_json(r#"{ "history_limit": 0 }"#).unwrap_err();
    assert!(matches!(err, LightError::InvalidConfig(_)));
}

#[test]
fn test_sampler_rejects_inverted_bounds() {
    let config = LightConfig {
        min_interval_secs: 6,
        max_interval_secs: 4,
        ..LightConfig::default()
    };
    assert!(matches!(
        IntervalSampler::from_config(&config),
        Err(LightError::InvalidConfig(_))
    ));
}

#[test]
fn test_transition_log_keeps_newest_entries() {
    let mut log = TransitionLog::with_limit(Some(2));
    assert!(log.is_empty());
    assert!(log.last().is_none());

    let mut phase = Phase::Red;
    for i in 1..=5u64 {
        phase = phase.toggled();
        log.record(PhaseChange::new(phase, Duration::from_secs(i * 5), Duration::from_secs(5)));
    }

    assert!(!log.is_empty());
    assert_eq!(log.len(), 2);
    assert_eq!(log.recorded(), 5);
    let last = log.last().unwrap();
    assert_eq!(last.phase, Phase::Green);
    assert_eq!(last.at_millis, 25_000);
    let held: Vec<u64> = log.entries().map(|c| c.at_millis).collect();
    assert_eq!(held, vec![20_000, 25_000]);
}

#[test]
fn test_transition_log_unbounded_by_default() {
    let mut log = TransitionLog::new();
    let mut phase = Phase::Red;
    for i in 1..=100u64 {
        phase = phase.toggled();
        log.record(PhaseChange::new(phase, Duration::from_secs(i), SECOND));
    }
    assert_eq!(log.len(), 100);
    assert_eq!(log.recorded(), 100);
}
