//! Per-revision command dialect.
//!
//! A session resolves its hardware revision once, at open time, into a
//! [`Dialect`]. The settings facade and the waveform engine only ever ask the
//! dialect how to spell a command, never which revision they are talking to.

use std::fmt;

use crate::capability::{
    require, AcquisitionMode, CapabilityError, Coupling, DataSource, FftUnit, FftWindow,
    HorizontalView, MathFunction, PointsMode, ProbeUnit, PulseClass, Setting, TriggerSlope,
    TriggerSource, TriggerSweep, TriggerType, Vocabulary,
};

/// Every vocabulary a revision may define. `None` means the revision has no
/// such setting at all.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub horizontal_view: Option<Vocabulary<HorizontalView>>,
    pub acquisition_mode: Option<Vocabulary<AcquisitionMode>>,
    pub data_source: Option<Vocabulary<DataSource>>,
    pub trigger_type: Option<Vocabulary<TriggerType>>,
    pub trigger_slope: Option<Vocabulary<TriggerSlope>>,
    pub pulse_polarity: Option<Vocabulary<TriggerSlope>>,
    pub trigger_source: Option<Vocabulary<TriggerSource>>,
    pub trigger_sweep: Option<Vocabulary<TriggerSweep>>,
    pub coupling: Option<Vocabulary<Coupling>>,
    pub pulse_class: Option<Vocabulary<PulseClass>>,
    pub fft_window: Option<Vocabulary<FftWindow>>,
    pub fft_unit: Option<Vocabulary<FftUnit>>,
    pub math_fft_unit: Option<Vocabulary<FftUnit>>,
    pub points_mode: Option<Vocabulary<PointsMode>>,
    pub math_function: Option<Vocabulary<MathFunction>>,
    pub probe_unit: Option<Vocabulary<ProbeUnit>>,
}

/// Build an optional table from a static entry list; an empty list means the
/// revision does not have the setting.
pub fn table<S: Setting>(
    revision: &'static str,
    entries: &[(S, &'static str)],
) -> Result<Option<Vocabulary<S>>, CapabilityError> {
    if entries.is_empty() {
        Ok(None)
    } else {
        Vocabulary::new(revision, entries).map(Some)
    }
}

pub trait Dialect: fmt::Debug + Send + Sync {
    /// Short revision tag, e.g. `TBS1000C`.
    fn revision(&self) -> &'static str;

    /// Horizontal divisions on screen; the sample rate is derived from it.
    fn divisions(&self) -> f64;

    fn capabilities(&self) -> &Capabilities;

    /// Translate a semantic value through one of this revision's tables.
    fn literal<S: Setting>(
        &self,
        table: fn(&Capabilities) -> Option<&Vocabulary<S>>,
        value: S,
    ) -> Result<&'static str, CapabilityError>
    where
        Self: Sized,
    {
        require(table(self.capabilities()), self.revision())?.to_literal(value)
    }

    /// Translate an instrument response back through one of this revision's tables.
    fn semantic<S: Setting>(
        &self,
        table: fn(&Capabilities) -> Option<&Vocabulary<S>>,
        token: &str,
    ) -> Result<S, CapabilityError>
    where
        Self: Sized,
    {
        require(table(self.capabilities()), self.revision())?.to_semantic(token)
    }
}

/// Samples per second for a record spread over the visible divisions.
pub fn derived_sample_rate(divisions: f64, record_length: u32, horizontal_scale: f64) -> f64 {
    f64::from(record_length) / (horizontal_scale * divisions)
}

/// Inverse of [`derived_sample_rate`]: the horizontal scale for a target rate.
pub fn horizontal_scale_for_rate(divisions: f64, record_length: u32, sample_rate: f64) -> f64 {
    f64::from(record_length) / (sample_rate * divisions)
}

/// Walk every table of `capabilities` in both directions, long and short form.
/// Returns how many tables were present.
#[cfg(test)]
pub(crate) fn assert_round_trips(capabilities: &Capabilities) -> usize {
    fn check<S: Setting>(table: Option<&Vocabulary<S>>) -> usize {
        let Some(table) = table else { return 0 };
        for semantic in table.semantics() {
            let literal = table.to_literal(semantic).unwrap();
            assert_eq!(table.to_semantic(literal).unwrap(), semantic, "{literal}");
        }
        for literal in table.literals() {
            let semantic = table.to_semantic(literal).unwrap();
            assert_eq!(table.to_literal(semantic).unwrap(), literal);
            let short = crate::capability::short_form(literal);
            assert_eq!(table.to_semantic(&short).unwrap(), semantic, "{short}");
            assert_eq!(table.to_semantic(&literal.to_lowercase()).unwrap(), semantic);
        }
        1
    }

    let c = capabilities;
    check(c.horizontal_view.as_ref())
        + check(c.acquisition_mode.as_ref())
        + check(c.data_source.as_ref())
        + check(c.trigger_type.as_ref())
        + check(c.trigger_slope.as_ref())
        + check(c.pulse_polarity.as_ref())
        + check(c.trigger_source.as_ref())
        + check(c.trigger_sweep.as_ref())
        + check(c.coupling.as_ref())
        + check(c.pulse_class.as_ref())
        + check(c.fft_window.as_ref())
        + check(c.fft_unit.as_ref())
        + check(c.math_fft_unit.as_ref())
        + check(c.points_mode.as_ref())
        + check(c.math_function.as_ref())
        + check(c.probe_unit.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_round_trip() {
        let rate = derived_sample_rate(16.0, 2000, 1.0e-3);
        assert!((rate - 125_000.0).abs() < 1e-6);
        let scale = horizontal_scale_for_rate(16.0, 2000, rate);
        assert!((scale - 1.0e-3).abs() < 1e-15);
        assert!((derived_sample_rate(10.0, 2500, 1.0e-3) - 250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_table_is_absent() {
        let t = table::<PulseClass>("X", &[]).unwrap();
        assert!(t.is_none());
        let t = table("X", &[(PulseClass::Runt, "RUNt")]).unwrap();
        assert!(t.is_some());
    }

    #[test]
    fn test_round_trip_counts_present_tables() {
        let capabilities = Capabilities {
            pulse_class: table("X", &[(PulseClass::Runt, "RUNt"), (PulseClass::Width, "WIDth")])
                .unwrap(),
            coupling: table("X", &[(Coupling::Ac, "AC"), (Coupling::Dc, "DC")]).unwrap(),
            ..Capabilities::default()
        };
        assert_eq!(assert_round_trips(&capabilities), 2);
        assert_eq!(assert_round_trips(&Capabilities::default()), 0);
    }
}
