//! Filter configuration and evaluation for MPC observation records
//!
//! [`FilterConfig`] holds the five independent filter axes. Each range axis
//! is validated when it is set, and setting an axis again replaces its
//! previous value. [`FilterEngine`] owns a frozen configuration and decides
//! accept/reject for one record at a time.
//!
//! Filters run in a fixed order and stop at the first rejection:
//!
//! 1. time window
//! 2. coordinate presence, then sky window
//! 3. designation
//! 4. observatory code
//! 5. magnitude window
//!
//! Fields needed only by later filters are never decoded for a record that
//! an earlier filter already rejected.

use crate::error::{ConfigError, ParseError};
use crate::extractor::{FieldSource, ObservationLine};
use crate::models::{Mjd, RejectReason, SkyPosition, Verdict};
use tracing::trace;

/// Inclusive numeric interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    /// Validated interval; `axis` names the filter in error messages
    pub fn new(axis: &'static str, min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::NonFiniteBound { axis, min, max });
        }
        if min > max {
            return Err(ConfigError::InvertedRange { axis, min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Right ascension (hours) and declination (degrees) ranges, always set together
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyWindow {
    pub ra_hours: Bounds,
    pub dec_degrees: Bounds,
}

impl SkyWindow {
    pub fn new(ra_min: f64, ra_max: f64, dec_min: f64, dec_max: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            ra_hours: Bounds::new("ra", ra_min, ra_max)?,
            dec_degrees: Bounds::new("dec", dec_min, dec_max)?,
        })
    }

    pub fn contains(&self, position: &SkyPosition) -> bool {
        self.ra_hours.contains(position.ra_hours) && self.dec_degrees.contains(position.dec_degrees)
    }
}

/// Optional constraints applied to every record
///
/// All axes default to unset, meaning no constraint on that axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    name: Option<String>,
    obscode: Option<String>,
    time_range: Option<Bounds>,
    sky_window: Option<SkyWindow>,
    mag_range: Option<Bounds>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the trimmed designation to equal `name`
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Require the observatory code (columns 78-80) to equal `obscode`
    pub fn set_obscode(&mut self, obscode: impl Into<String>) {
        self.obscode = Some(obscode.into());
    }

    /// Accept observation times in `[start, end]`, both in MJD
    pub fn set_time_range(&mut self, start: f64, end: f64) -> Result<(), ConfigError> {
        self.time_range = Some(Bounds::new("time", start, end)?);
        Ok(())
    }

    /// Accept positions with RA in `[ra_min, ra_max]` hours and Dec in
    /// `[dec_min, dec_max]` degrees
    ///
    /// Both axes are validated before either is stored.
    pub fn set_sky_window(
        &mut self,
        ra_min: f64,
        ra_max: f64,
        dec_min: f64,
        dec_max: f64,
    ) -> Result<(), ConfigError> {
        self.sky_window = Some(SkyWindow::new(ra_min, ra_max, dec_min, dec_max)?);
        Ok(())
    }

    /// Accept magnitudes in `[min, max]`; records without a magnitude are rejected
    pub fn set_magnitude_range(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        self.mag_range = Some(Bounds::new("magnitude", min, max)?);
        Ok(())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_obscode(mut self, obscode: impl Into<String>) -> Self {
        self.set_obscode(obscode);
        self
    }

    pub fn with_time_range(mut self, start: f64, end: f64) -> Result<Self, ConfigError> {
        self.set_time_range(start, end)?;
        Ok(self)
    }

    pub fn with_sky_window(
        mut self,
        ra_min: f64,
        ra_max: f64,
        dec_min: f64,
        dec_max: f64,
    ) -> Result<Self, ConfigError> {
        self.set_sky_window(ra_min, ra_max, dec_min, dec_max)?;
        Ok(self)
    }

    pub fn with_magnitude_range(mut self, min: f64, max: f64) -> Result<Self, ConfigError> {
        self.set_magnitude_range(min, max)?;
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn obscode(&self) -> Option<&str> {
        self.obscode.as_deref()
    }

    pub fn time_range(&self) -> Option<Bounds> {
        self.time_range
    }

    pub fn sky_window(&self) -> Option<SkyWindow> {
        self.sky_window
    }

    pub fn magnitude_range(&self) -> Option<Bounds> {
        self.mag_range
    }

    /// Number of axes with an active constraint
    pub fn active_filters(&self) -> usize {
        [
            self.name.is_some(),
            self.obscode.is_some(),
            self.time_range.is_some(),
            self.sky_window.is_some(),
            self.mag_range.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

/// Presence and window check for the mandatory coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
enum CoordinateCheck {
    Absent,
    Outside,
    Inside(SkyPosition),
}

/// Evaluates records against a fixed [`FilterConfig`]
///
/// The engine is immutable once built and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    config: FilterConfig,
}

impl FilterEngine {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Decode and evaluate one raw record
    pub fn evaluate_line(&self, line: &str) -> Result<Verdict, ParseError> {
        self.evaluate(&ObservationLine::from_str(line))
    }

    /// Decode and evaluate one raw record given as bytes
    pub fn evaluate_bytes(&self, line: &[u8]) -> Result<Verdict, ParseError> {
        self.evaluate(&ObservationLine::new(line))
    }

    /// Apply every configured filter in precedence order
    ///
    /// # Arguments
    ///
    /// * `fields` - Lazy line view or eagerly extracted fields of one record
    ///
    /// # Returns
    ///
    /// The accepted (position, time) pair or the first rejection reason.
    /// `Err` only for hard parse failures: a malformed timestamp, or
    /// malformed magnitude text when the magnitude filter is reached.
    pub fn evaluate<F: FieldSource + ?Sized>(&self, fields: &F) -> Result<Verdict, ParseError> {
        let time = fields.timestamp()?;
        if let Some(reason) = self.check_time(time) {
            return Ok(self.reject(reason));
        }

        let position = match self.check_coordinate(fields.sky_position()) {
            CoordinateCheck::Absent => return Ok(self.reject(RejectReason::CoordinateAbsent)),
            CoordinateCheck::Outside => return Ok(self.reject(RejectReason::OutsideSkyWindow)),
            CoordinateCheck::Inside(position) => position,
        };

        if let Some(name) = self.config.name.as_deref()
            && fields.designation() != name
        {
            return Ok(self.reject(RejectReason::NameMismatch));
        }

        if let Some(expected) = self.config.obscode.as_deref() {
            match fields.obscode() {
                None => return Ok(self.reject(RejectReason::ObscodeAbsent)),
                Some(code) if code != expected => {
                    return Ok(self.reject(RejectReason::ObscodeMismatch));
                }
                Some(_) => {}
            }
        }

        if let Some(range) = self.config.mag_range {
            match fields.magnitude()? {
                None => return Ok(self.reject(RejectReason::MagnitudeAbsent)),
                Some(magnitude) if !range.contains(magnitude) => {
                    return Ok(self.reject(RejectReason::OutsideMagnitudeRange));
                }
                Some(_) => {}
            }
        }

        Ok(Verdict::Accept { position, time })
    }

    fn check_time(&self, time: Mjd) -> Option<RejectReason> {
        match self.config.time_range {
            Some(range) if !range.contains(time.value()) => Some(RejectReason::OutsideTimeRange),
            _ => None,
        }
    }

    fn check_coordinate(&self, position: Option<SkyPosition>) -> CoordinateCheck {
        match (position, self.config.sky_window) {
            (None, _) => CoordinateCheck::Absent,
            (Some(position), Some(window)) if !window.contains(&position) => {
                CoordinateCheck::Outside
            }
            (Some(position), _) => CoordinateCheck::Inside(position),
        }
    }

    fn reject(&self, reason: RejectReason) -> Verdict {
        trace!("Record rejected: {}", reason);
        Verdict::Reject(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract;

    const CORPUS: [&str; 5] = [
        "     Hall2    C1999 06 05.03484 17 47 47.64 -25 27 24.3          16.6 R      706",
        "     She001  2C1995 09 14.79817 23 29 42.54 -02 59 15.9          15.5 V      121",
        "     0000001  C2002 10 10.28966 01 45 43.18 +08 05 24.4                r     644",
        "     000007k ZC2009 07 12.38821 20 52 22.26 -16 47 54.1                r     I41",
        "     00000m3 ZC2009 07 22.38815 20 45 14.31 -17 34 51.4          21.8 Rr     I41",
    ];

    fn accepted(config: &FilterConfig) -> Vec<bool> {
        let engine = FilterEngine::new(config.clone());
        CORPUS
            .iter()
            .map(|line| engine.evaluate_line(line).unwrap().is_accepted())
            .collect()
    }

    #[test]
    fn test_failed_setter_leaves_axis_unset() {
        let mut config = FilterConfig::new();
        assert!(config.set_magnitude_range(20.0, 10.0).is_err());
        assert!(config.set_time_range(f64::NAN, 1.0).is_err());
        assert_eq!(config.magnitude_range(), None);
        assert_eq!(config.time_range(), None);
        assert_eq!(accepted(&config), vec![true; 5]);
    }

    #[test]
    fn test_no_filters_accepts_everything() {
        assert_eq!(accepted(&FilterConfig::new()), vec![true; 5]);
    }

    #[test]
    fn test_filter_on_coordinates() {
        let mut config = FilterConfig::new();
        config.set_sky_window(17.0, 21.0, -25.5, -15.0).unwrap();
        assert_eq!(accepted(&config), vec![true, false, false, true, true]);
        config.set_sky_window(0.0, 5.0, 0.0, 10.0).unwrap();
        assert_eq!(accepted(&config), vec![false, false, true, false, false]);
        config.set_sky_window(20.0, 21.0, -18.0, -16.0).unwrap();
        assert_eq!(accepted(&config), vec![false, false, false, true, true]);
    }

    #[test]
    fn test_filter_on_magnitude() {
        let mut config = FilterConfig::new();
        config.set_magnitude_range(0.0, 25.0).unwrap();
        assert_eq!(accepted(&config), vec![true, true, false, false, true]);
        config.set_magnitude_range(14.0, 18.0).unwrap();
        assert_eq!(accepted(&config), vec![true, true, false, false, false]);
    }

    #[test]
    fn test_filter_on_name() {
        let mut config = FilterConfig::new();
        config.set_name("Hall2");
        assert_eq!(accepted(&config), vec![true, false, false, false, false]);
        config.set_name("0000001");
        assert_eq!(accepted(&config), vec![false, false, true, false, false]);
    }

    #[test]
    fn test_filter_on_obscode() {
        let mut config = FilterConfig::new();
        config.set_obscode("706");
        assert_eq!(accepted(&config), vec![true, false, false, false, false]);
        config.set_obscode("I41");
        assert_eq!(accepted(&config), vec![false, false, false, true, true]);
    }

    #[test]
    fn test_filter_on_time() {
        let mjd = |y, m, d| Mjd::from_calendar_date(y, m, d).unwrap().value();
        let mut config = FilterConfig::new();
        config
            .set_time_range(mjd(1999, 6, 4), mjd(1999, 6, 6))
            .unwrap();
        assert_eq!(accepted(&config), vec![true, false, false, false, false]);
        config
            .set_time_range(mjd(2009, 7, 10), mjd(2009, 7, 23))
            .unwrap();
        assert_eq!(accepted(&config), vec![false, false, false, true, true]);
        config
            .set_time_range(mjd(2009, 7, 22), mjd(2009, 7, 22) + 0.5)
            .unwrap();
        assert_eq!(accepted(&config), vec![false, false, false, false, true]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let fields = extract(CORPUS[0]).unwrap();
        let position = fields.position.unwrap();
        let time = fields.time.value();

        let config = FilterConfig::new()
            .with_time_range(time, time)
            .unwrap()
            .with_sky_window(
                position.ra_hours,
                position.ra_hours,
                position.dec_degrees,
                position.dec_degrees,
            )
            .unwrap()
            .with_magnitude_range(16.6, 16.6)
            .unwrap();
        let engine = FilterEngine::new(config);
        assert!(engine.evaluate(&fields).unwrap().is_accepted());
    }

    #[test]
    fn test_accept_returns_decoded_values() {
        let engine = FilterEngine::default();
        match engine.evaluate_line(CORPUS[2]).unwrap() {
            Verdict::Accept { position, time } => {
                assert!((position.ra_hours - 1.762).abs() < 1e-3);
                assert!((position.dec_degrees - 8.09).abs() < 1e-2);
                assert!((time.value() - 52557.28966).abs() < 1e-9);
            }
            other => panic!("Expected accept, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_reasons_follow_precedence() {
        // Time rejects before the (also failing) name filter is consulted
        let config = FilterConfig::new()
            .with_time_range(0.0, 1.0)
            .unwrap()
            .with_name("nobody");
        let engine = FilterEngine::new(config);
        assert_eq!(
            engine.evaluate_line(CORPUS[0]).unwrap(),
            Verdict::Reject(RejectReason::OutsideTimeRange)
        );

        let engine = FilterEngine::new(FilterConfig::new().with_obscode("706"));
        assert_eq!(
            engine.evaluate_line(&CORPUS[0][..79]).unwrap(),
            Verdict::Reject(RejectReason::ObscodeAbsent)
        );
        assert_eq!(
            engine.evaluate_line(CORPUS[1]).unwrap(),
            Verdict::Reject(RejectReason::ObscodeMismatch)
        );
    }

    #[test]
    fn test_absent_coordinate_rejects_without_filters() {
        let mut raw = CORPUS[0].to_string();
        raw.replace_range(32..44, "xx xx xx.xx ");
        let engine = FilterEngine::default();
        assert_eq!(
            engine.evaluate_line(&raw).unwrap(),
            Verdict::Reject(RejectReason::CoordinateAbsent)
        );
    }

    #[test]
    fn test_malformed_magnitude_only_matters_when_filtered() {
        let mut raw = CORPUS[0].to_string();
        raw.replace_range(65..70, "1?.6 ");

        assert!(
            FilterEngine::default()
                .evaluate_line(&raw)
                .unwrap()
                .is_accepted()
        );

        let engine = FilterEngine::new(FilterConfig::new().with_magnitude_range(0.0, 30.0).unwrap());
        assert!(matches!(
            engine.evaluate_line(&raw),
            Err(ParseError::MalformedMagnitude { .. })
        ));

        // An earlier rejection short-circuits before the magnitude is decoded
        let engine = FilterEngine::new(
            FilterConfig::new()
                .with_name("She001")
                .with_magnitude_range(0.0, 30.0)
                .unwrap(),
        );
        assert_eq!(
            engine.evaluate_line(&raw).unwrap(),
            Verdict::Reject(RejectReason::NameMismatch)
        );
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        let mut raw = CORPUS[0].to_string();
        raw.replace_range(23..25, "32");
        assert!(matches!(
            FilterEngine::default().evaluate_line(&raw),
            Err(ParseError::MalformedTimestamp { .. })
        ));
    }

    #[test]
    fn test_invalid_ranges_are_rejected_at_set_time() {
        let mut config = FilterConfig::new();
        assert!(matches!(
            config.set_time_range(10.0, 5.0),
            Err(ConfigError::InvertedRange { axis: "time", .. })
        ));
        assert!(matches!(
            config.set_sky_window(0.0, 24.0, 10.0, -10.0),
            Err(ConfigError::InvertedRange { axis: "dec", .. })
        ));
        assert!(matches!(
            config.set_magnitude_range(f64::NAN, 5.0),
            Err(ConfigError::NonFiniteBound { .. })
        ));
        assert_eq!(config, FilterConfig::new());
    }

    #[test]
    fn test_reconfiguring_replaces_only_that_axis() {
        let mut config = FilterConfig::new();
        config.set_time_range(1.0, 2.0).unwrap();
        config.set_magnitude_range(10.0, 12.0).unwrap();
        config.set_magnitude_range(14.0, 18.0).unwrap();

        assert_eq!(config.time_range(), Some(Bounds { min: 1.0, max: 2.0 }));
        assert_eq!(
            config.magnitude_range(),
            Some(Bounds {
                min: 14.0,
                max: 18.0
            })
        );
        assert_eq!(config.active_filters(), 2);
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FilterEngine>();
    }
}
