//! Property tests for field extraction and filter evaluation on generated records

use mpc_filter::extractor::parse_sexagesimal;
use mpc_filter::{FilterConfig, FilterEngine, ObservationLine, RejectReason, extract};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Record {
    year: u32,
    month: u32,
    day: u32,
    fraction: u32,
    ra: (u32, u32, u32),
    dec_negative: bool,
    dec: (u32, u32, u32),
    magnitude_tenths: Option<u32>,
    obscode: String,
}

impl Record {
    fn line(&self) -> String {
        let magnitude = match self.magnitude_tenths {
            Some(tenths) => format!("{:4.1}", tenths as f64 / 10.0),
            None => "    ".to_string(),
        };
        format!(
            "{:<12}  C{:04} {:02} {:02}.{:05} {:02} {:02} {:02}.{:02} {}{:02} {:02} {:02}.{}          {} R      {}",
            "     Gen1",
            self.year,
            self.month,
            self.day,
            self.fraction,
            self.ra.0,
            self.ra.1,
            self.ra.2 / 100,
            self.ra.2 % 100,
            if self.dec_negative { '-' } else { '+' },
            self.dec.0,
            self.dec.1,
            self.dec.2 / 10,
            self.dec.2 % 10,
            magnitude,
            self.obscode
        )
    }

    fn ra_hours(&self) -> f64 {
        self.ra.0 as f64 + self.ra.1 as f64 / 60.0 + self.ra.2 as f64 / 100.0 / 3600.0
    }

    fn dec_degrees(&self) -> f64 {
        let magnitude = self.dec.0 as f64 + self.dec.1 as f64 / 60.0 + self.dec.2 as f64 / 10.0 / 3600.0;
        if self.dec_negative { -magnitude } else { magnitude }
    }
}

fn record() -> impl Strategy<Value = Record> {
    (
        (1900u32..2100, 1u32..=12, 1u32..=28, 0u32..100_000),
        (0u32..24, 0u32..60, 0u32..6000),
        (any::<bool>(), 0u32..90, 0u32..60, 0u32..600),
        proptest::option::of(0u32..1000),
        "[0-9A-Z]{3}",
    )
        .prop_map(
            |((year, month, day, fraction), ra, (dec_negative, dd, dm, ds), magnitude_tenths, obscode)| Record {
                year,
                month,
                day,
                fraction,
                ra,
                dec_negative,
                dec: (dd, dm, ds),
                magnitude_tenths,
                obscode,
            },
        )
}

fn range(low: f64, high: f64) -> impl Strategy<Value = Option<(f64, f64)>> {
    proptest::option::of((low..high, low..high).prop_map(|(a, b)| (a.min(b), a.max(b))))
}

fn filter_config() -> impl Strategy<Value = FilterConfig> {
    (
        range(15_000.0, 90_000.0),
        proptest::option::of((range(0.0, 24.0), range(-90.0, 90.0))),
        proptest::option::of(prop_oneof![Just("Gen1"), Just("Hall2")]),
        proptest::option::of("[0-9A-Z]{3}"),
        range(0.0, 100.0),
    )
        .prop_map(|(time, sky, name, obscode, magnitude)| {
            let mut config = FilterConfig::new();
            if let Some((start, end)) = time {
                config.set_time_range(start, end).unwrap();
            }
            if let Some((Some((ra_min, ra_max)), Some((dec_min, dec_max)))) = sky {
                config.set_sky_window(ra_min, ra_max, dec_min, dec_max).unwrap();
            }
            if let Some(name) = name {
                config.set_name(name);
            }
            if let Some(obscode) = obscode {
                config.set_obscode(obscode);
            }
            if let Some((min, max)) = magnitude {
                config.set_magnitude_range(min, max).unwrap();
            }
            config
        })
}

proptest! {
    #[test]
    fn prop_evaluation_is_repeatable(record in record(), config in filter_config()) {
        let line = record.line();
        let engine = FilterEngine::new(config);

        let first = engine.evaluate_line(&line).unwrap();
        let second = engine.evaluate_line(&line).unwrap();
        prop_assert_eq!(first, second);

        let lazy = engine.evaluate(&ObservationLine::from_str(&line)).unwrap();
        let eager = engine.evaluate(&extract(&line).unwrap()).unwrap();
        prop_assert_eq!(lazy, first);
        prop_assert_eq!(eager, first);
    }

    #[test]
    fn prop_generated_records_are_full_width(record in record()) {
        let line = record.line();
        prop_assert_eq!(line.len(), 80);
        prop_assert_eq!(&line[77..80], record.obscode.as_str());
    }

    #[test]
    fn prop_unfiltered_engine_accepts_and_decodes(record in record()) {
        let line = record.line();
        let verdict = FilterEngine::default().evaluate_line(&line).unwrap();
        let observation = verdict.observation().unwrap();

        prop_assert!((observation.position.ra_hours - record.ra_hours()).abs() < 1e-9);
        prop_assert!((observation.position.dec_degrees - record.dec_degrees()).abs() < 1e-9);

        let fields = extract(&line).unwrap();
        prop_assert_eq!(fields.obscode.as_deref(), Some(record.obscode.as_str()));
        prop_assert_eq!(fields.magnitude, record.magnitude_tenths.map(|t| t as f64 / 10.0));
        prop_assert!(fields.time.value().fract() >= 0.0);
        prop_assert!((fields.time.value().fract() - record.fraction as f64 / 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn prop_magnitude_bounds_are_inclusive(record in record(), tenths in 0u32..1000) {
        let line = record.line();
        let config = FilterConfig::new()
            .with_magnitude_range(tenths as f64 / 10.0, tenths as f64 / 10.0)
            .unwrap();
        let verdict = FilterEngine::new(config).evaluate_line(&line).unwrap();

        match record.magnitude_tenths {
            None => prop_assert_eq!(verdict.reject_reason(), Some(RejectReason::MagnitudeAbsent)),
            Some(actual) if actual == tenths => prop_assert!(verdict.is_accepted()),
            Some(_) => prop_assert_eq!(
                verdict.reject_reason(),
                Some(RejectReason::OutsideMagnitudeRange)
            ),
        }
    }

    #[test]
    fn prop_covering_time_window_never_changes_verdict(record in record(), tenths in 0u32..1000) {
        let line = record.line();
        let base = FilterConfig::new()
            .with_magnitude_range(0.0, tenths as f64 / 10.0)
            .unwrap();
        let with_time = base.clone().with_time_range(0.0, 100_000.0).unwrap();

        let left = FilterEngine::new(base).evaluate_line(&line).unwrap();
        let right = FilterEngine::new(with_time).evaluate_line(&line).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_inverted_ranges_are_rejected(min in -1e6..1e6f64, delta in 1e-3..1e3f64) {
        let max = min - delta;
        prop_assert!(FilterConfig::new().with_time_range(min, max).is_err());
        prop_assert!(FilterConfig::new().with_magnitude_range(min, max).is_err());
        prop_assert!(FilterConfig::new().with_sky_window(min, max, 0.0, 1.0).is_err());
        prop_assert!(FilterConfig::new().with_sky_window(0.0, 1.0, min, max).is_err());
    }

    #[test]
    fn prop_sexagesimal_sign_applies_to_total(degrees in 0u32..90, minutes in 0u32..60, seconds in 0.0..59.99f64) {
        let text = format!("{degrees:02} {minutes:02} {seconds:05.2}");
        let positive = parse_sexagesimal(&text).unwrap();
        let negative = parse_sexagesimal(&format!("-{text}")).unwrap();
        prop_assert_eq!(negative, -positive);
        prop_assert!(positive >= degrees as f64);
        prop_assert!(positive < degrees as f64 + 1.0);
    }
}
