//! Tektronix TBS1000 series oscilloscopes.
//!
//! Two hardware revisions share the product line but not the command set:
//!
//! | | TBS1000C | TBS1000B |
//! |---|---|---|
//! | trigger root | `TRIGger:A` | `TRIGger:MAIn` |
//! | divisions | 16 | 10 |
//! | preamble root | `WFMOutpre` | `WFMPre` |
//! | record length | `HORizontal:RESOlution` (settable) | `HORizontal:RECOrdlength` (fixed) |
//! | trigger level | per-channel thresholds | one `LEVel` |
//! | probe | gain | attenuation |
//!
//! Everything revision-specific lives in [`TektronixDialect`].

use std::time::Duration;

use polars::prelude::DataFrame;

use crate::capability::{
    require, AcquisitionMode, CapabilityError, Coupling, DataSource, FftUnit, FftWindow,
    HorizontalView, ProbeUnit, PulseClass, Setting, TriggerSlope, TriggerSource, TriggerSweep,
    TriggerType, Vocabulary,
};
use crate::dialect::{self, table, Capabilities, Dialect};
use crate::error::{check_channel, ScopeError};
use crate::resource::Identity;
use crate::scope_connector::{Connection, ScopeConnector, ScopeFamily};
use crate::scpi_terminal::StatusCheck;
use crate::trigger_config::{LevelEncoding, TriggerLevel};
use crate::waveform::{self, Waveform};

pub const TEKTRONIX_VENDOR_ID: u32 = 1689;
pub const TBS1000C_PRODUCT_ID: u32 = 964;
pub const TBS1000B_PRODUCT_ID: u32 = 872;

/// Marker type for [`ScopeConnector::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct Tektronix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TektronixRevision {
    Tbs1000C,
    Tbs1000B,
}

impl TektronixRevision {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Tbs1000C => "TBS1000C",
            Self::Tbs1000B => "TBS1000B",
        }
    }

    pub const fn product_id(self) -> u32 {
        match self {
            Self::Tbs1000C => TBS1000C_PRODUCT_ID,
            Self::Tbs1000B => TBS1000B_PRODUCT_ID,
        }
    }
}

impl ScopeFamily for Tektronix {
    const NAME: &'static str = "Tektronix";
    const VENDOR_ID: u32 = TEKTRONIX_VENDOR_ID;
    const PRODUCT_IDS: &'static [u32] = &[TBS1000C_PRODUCT_ID, TBS1000B_PRODUCT_ID];

    type Revision = TektronixRevision;

    fn revision_for_product(product_id: u32) -> Option<TektronixRevision> {
        match product_id {
            TBS1000C_PRODUCT_ID => Some(TektronixRevision::Tbs1000C),
            TBS1000B_PRODUCT_ID => Some(TektronixRevision::Tbs1000B),
            _ => None,
        }
    }

    /// `TBS1072C` → TBS1000C, `TBS1052B-EDU` → TBS1000B.
    fn revision_for_model(model: &str) -> Option<TektronixRevision> {
        let model = model.trim().to_ascii_uppercase();
        let suffix = model
            .strip_prefix("TBS1")?
            .trim_start_matches(|c: char| c.is_ascii_digit());
        match suffix.chars().next()? {
            'C' => Some(TektronixRevision::Tbs1000C),
            'B' => Some(TektronixRevision::Tbs1000B),
            _ => None,
        }
    }

    fn status_check() -> StatusCheck {
        StatusCheck::EventStatusRegister
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeControl {
    /// `CH<x>:PRObe:GAIN`, attenuation is its inverse.
    Gain,
    /// `CH<x>:PRObe`, the attenuation factor itself.
    Attenuation,
}

/// Which command branch the current trigger type uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerBranch {
    Edge,
    Runt,
    Width,
    Video,
}

#[derive(Debug)]
pub struct TektronixDialect {
    revision: TektronixRevision,
    capabilities: Capabilities,
}

impl TektronixDialect {
    pub fn new(revision: TektronixRevision) -> Result<Self, CapabilityError> {
        use AcquisitionMode as Acq;

        let tag = revision.tag();
        let capabilities = match revision {
            TektronixRevision::Tbs1000C => Capabilities {
                acquisition_mode: table(
                    tag,
                    &[
                        (Acq::Sample, "SAMple"),
                        (Acq::PeakDetect, "PEAKdetect"),
                        (Acq::HiRes, "HIRes"),
                        (Acq::Average, "AVErage"),
                    ],
                )?,
                data_source: table(
                    tag,
                    &[
                        (DataSource::Ch1, "CH1"),
                        (DataSource::Ch2, "CH2"),
                        (DataSource::Math, "MATH"),
                        (DataSource::Ref1, "REF1"),
                        (DataSource::Ref2, "REF2"),
                    ],
                )?,
                trigger_type: table(
                    tag,
                    &[(TriggerType::Edge, "EDGe"), (TriggerType::Pulse, "PULSe")],
                )?,
                trigger_source: table(
                    tag,
                    &[
                        (TriggerSource::Ch1, "CH1"),
                        (TriggerSource::Ch2, "CH2"),
                        (TriggerSource::Line, "LINE"),
                        (TriggerSource::Aux, "AUX"),
                    ],
                )?,
                pulse_class: table(
                    tag,
                    &[(PulseClass::Runt, "RUNt"), (PulseClass::Width, "WIDth")],
                )?,
                coupling: table(tag, &[(Coupling::Ac, "AC"), (Coupling::Dc, "DC")])?,
                fft_window: table(
                    tag,
                    &[
                        (FftWindow::Hamming, "HAMming"),
                        (FftWindow::Hanning, "HANning"),
                        (FftWindow::Rectangular, "RECTangular"),
                        (FftWindow::BlackmanHarris, "BLAckmanharris"),
                    ],
                )?,
                fft_unit: table(tag, &[(FftUnit::Linear, "LINEAr"), (FftUnit::Decibel, "DB")])?,
                probe_unit: table(tag, &[(ProbeUnit::Volt, "V"), (ProbeUnit::Amp, "A")])?,
                ..Self::common(tag)?
            },
            TektronixRevision::Tbs1000B => Capabilities {
                horizontal_view: table(
                    tag,
                    &[
                        (HorizontalView::Main, "MAIn"),
                        (HorizontalView::Window, "WINDOW"),
                        (HorizontalView::Zone, "ZONE"),
                    ],
                )?,
                acquisition_mode: table(
                    tag,
                    &[
                        (Acq::Sample, "SAMple"),
                        (Acq::PeakDetect, "PEAKdetect"),
                        (Acq::Average, "AVErage"),
                    ],
                )?,
                data_source: table(
                    tag,
                    &[
                        (DataSource::Ch1, "CH1"),
                        (DataSource::Ch2, "CH2"),
                        (DataSource::Math, "MATH"),
                        (DataSource::Ref1, "REFA"),
                        (DataSource::Ref2, "REFB"),
                    ],
                )?,
                trigger_type: table(
                    tag,
                    &[
                        (TriggerType::Edge, "EDGe"),
                        (TriggerType::Pulse, "PULSe"),
                        (TriggerType::Video, "VIDeo"),
                    ],
                )?,
                trigger_source: table(
                    tag,
                    &[
                        (TriggerSource::Ch1, "CH1"),
                        (TriggerSource::Ch2, "CH2"),
                        (TriggerSource::External, "EXT"),
                        (TriggerSource::Line, "LINE"),
                    ],
                )?,
                coupling: table(
                    tag,
                    &[
                        (Coupling::Ac, "AC"),
                        (Coupling::Dc, "DC"),
                        (Coupling::Ground, "GND"),
                    ],
                )?,
                ..Self::common(tag)?
            },
        };
        Ok(Self {
            revision,
            capabilities,
        })
    }

    /// Tables both revisions spell the same way.
    fn common(tag: &'static str) -> Result<Capabilities, CapabilityError> {
        Ok(Capabilities {
            trigger_slope: table(
                tag,
                &[(TriggerSlope::Rising, "RISe"), (TriggerSlope::Falling, "FALL")],
            )?,
            pulse_polarity: table(
                tag,
                &[
                    (TriggerSlope::Rising, "POSitive"),
                    (TriggerSlope::Falling, "NEGative"),
                ],
            )?,
            trigger_sweep: table(
                tag,
                &[(TriggerSweep::Auto, "AUTO"), (TriggerSweep::Normal, "NORMal")],
            )?,
            ..Capabilities::default()
        })
    }

    pub fn hardware_revision(&self) -> TektronixRevision {
        self.revision
    }

    pub fn trigger_root(&self) -> &'static str {
        match self.revision {
            TektronixRevision::Tbs1000C => "TRIGger:A",
            TektronixRevision::Tbs1000B => "TRIGger:MAIn",
        }
    }

    pub fn preamble_root(&self) -> &'static str {
        match self.revision {
            TektronixRevision::Tbs1000C => "WFMOutpre",
            TektronixRevision::Tbs1000B => "WFMPre",
        }
    }

    pub fn record_length_header(&self) -> &'static str {
        match self.revision {
            TektronixRevision::Tbs1000C => "HORizontal:RESOlution",
            TektronixRevision::Tbs1000B => "HORizontal:RECOrdlength",
        }
    }

    pub fn record_length_settable(&self) -> bool {
        self.revision == TektronixRevision::Tbs1000C
    }

    pub fn pre_sample_header(&self) -> &'static str {
        match self.revision {
            TektronixRevision::Tbs1000C => "HORizontal:DELay:TIMe",
            TektronixRevision::Tbs1000B => "HORizontal:MAIn:POSition",
        }
    }

    pub fn probe_control(&self) -> ProbeControl {
        match self.revision {
            TektronixRevision::Tbs1000C => ProbeControl::Gain,
            TektronixRevision::Tbs1000B => ProbeControl::Attenuation,
        }
    }

    /// The single trigger level, or the low threshold of a runt window.
    pub fn level_header(&self, channel: u8) -> String {
        match self.revision {
            TektronixRevision::Tbs1000C => format!("TRIGger:A:LOWerthreshold:CH{channel}"),
            TektronixRevision::Tbs1000B => "TRIGger:MAIn:LEVel".to_string(),
        }
    }

    pub fn upper_threshold_header(&self, channel: u8) -> Option<String> {
        match self.revision {
            TektronixRevision::Tbs1000C => Some(format!("TRIGger:A:UPPerthreshold:CH{channel}")),
            TektronixRevision::Tbs1000B => None,
        }
    }

    fn unsupported(&self, setting: &'static str) -> CapabilityError {
        CapabilityError::Unsupported {
            setting,
            revision: self.revision(),
        }
    }
}

impl Dialect for TektronixDialect {
    fn revision(&self) -> &'static str {
        self.revision.tag()
    }

    fn divisions(&self) -> f64 {
        match self.revision {
            TektronixRevision::Tbs1000C => 16.0,
            TektronixRevision::Tbs1000B => 10.0,
        }
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

type Table<S> = fn(&Capabilities) -> Option<&Vocabulary<S>>;

/// Last whitespace-separated token, so answers with or without an echoed
/// header both work.
fn response_value(answer: &str) -> &str {
    answer.trim().rsplit(' ').next().unwrap_or_default()
}

fn channel_source(index: u8) -> DataSource {
    if index == 2 {
        DataSource::Ch2
    } else {
        DataSource::Ch1
    }
}

/// An open session to a TBS1000 series oscilloscope.
#[derive(Debug)]
pub struct TektronixScope {
    session: Connection<TektronixRevision>,
    dialect: TektronixDialect,
}

impl TektronixScope {
    pub const CHANNELS: [u8; 2] = [1, 2];

    /// Resolve and open an instrument, then prepare it for binary waveform
    /// transfer.
    pub fn open(connector: &ScopeConnector, hint: Option<&str>) -> Result<Self, ScopeError> {
        let session = connector.resolve::<Tektronix>(hint)?;
        Self::from_connection(session)
    }

    pub fn from_connection(session: Connection<TektronixRevision>) -> Result<Self, ScopeError> {
        let dialect = TektronixDialect::new(session.revision)?;
        let mut scope = Self { session, dialect };
        scope.set_header_enabled(false)?;
        scope.configure_transfer()?;
        Ok(scope)
    }

    /// Binary, signed, one byte per sample, the whole record.
    fn configure_transfer(&mut self) -> Result<(), ScopeError> {
        log::debug!("Configuring waveform transfer");
        let pre = self.dialect.preamble_root();
        self.write(&format!("{pre}:ENCdg BINary"))?;
        self.write(&format!("{pre}:BN_Fmt RI"))?;
        self.write("DATa:WIDth 1")?;
        self.write("DATa:STARt 1")?;
        let record_length = self.record_length()?;
        self.write(&format!("DATa:STOP {record_length}"))
    }

    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        Ok(self.session.terminal.write(command)?)
    }

    pub fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        Ok(self.session.terminal.query(command)?)
    }

    fn query_f64(&mut self, command: &str) -> Result<f64, ScopeError> {
        Ok(self.session.terminal.query_f64(command)?)
    }

    fn query_u32(&mut self, command: &str) -> Result<u32, ScopeError> {
        Ok(self.session.terminal.query_u32(command)?)
    }

    fn query_bool(&mut self, command: &str) -> Result<bool, ScopeError> {
        Ok(self.session.terminal.query_bool(command)?)
    }

    fn write_setting<S: Setting>(
        &mut self,
        header: &str,
        table: Table<S>,
        value: S,
    ) -> Result<(), ScopeError> {
        let literal = self.dialect.literal(table, value)?;
        self.write(&format!("{header} {literal}"))
    }

    fn query_setting<S: Setting>(&mut self, header: &str, table: Table<S>) -> Result<S, ScopeError> {
        require(table(self.dialect.capabilities()), self.dialect.revision())?;
        let answer = self.query(&format!("{header}?"))?;
        Ok(self.dialect.semantic(table, response_value(&answer))?)
    }

    pub fn resource(&self) -> &str {
        &self.session.resource
    }

    pub fn revision(&self) -> TektronixRevision {
        self.session.revision
    }

    pub fn dialect(&self) -> &TektronixDialect {
        &self.dialect
    }

    pub fn channel(&mut self, index: u8) -> Result<TektronixChannel<'_>, ScopeError> {
        let index = check_channel(index)?;
        Ok(TektronixChannel { scope: self, index })
    }

    /// Release the session and its registry entry.
    pub fn close(self) {
        log::info!("Closing {}", self.session.resource);
    }

    pub fn identity(&mut self) -> Result<Identity, ScopeError> {
        Ok(self.session.terminal.identify()?)
    }

    pub fn device_model(&mut self) -> Result<String, ScopeError> {
        Ok(self.identity()?.model)
    }

    pub fn visa_query_delay(&self) -> Duration {
        self.session.terminal.query_delay()
    }

    pub fn set_visa_query_delay(&mut self, delay: Duration) {
        self.session.terminal.set_query_delay(delay);
    }

    pub fn visa_timeout(&self) -> Duration {
        self.session.terminal.timeout()
    }

    pub fn set_visa_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        Ok(self.session.terminal.set_timeout(timeout)?)
    }

    pub fn single(&mut self) -> Result<(), ScopeError> {
        self.write("ACQuire:STOPAfter SEQuence")
    }

    pub fn continuous(&mut self) -> Result<(), ScopeError> {
        self.write("ACQuire:STOPAfter RUNSTop")
    }

    pub fn run(&mut self) -> Result<(), ScopeError> {
        self.write("ACQuire:STATE RUN")
    }

    pub fn stop(&mut self) -> Result<(), ScopeError> {
        self.write("ACQuire:STATE STOP")
    }

    pub fn autoset(&mut self) -> Result<(), ScopeError> {
        self.write("AUTOSet EXECute")
    }

    /// Factory defaults, except that both probes are set to 1:1 instead of
    /// the instrument's 10:1.
    pub fn reset(&mut self) -> Result<(), ScopeError> {
        self.write("*RST")?;
        for index in Self::CHANNELS {
            self.channel(index)?.set_attenuation(1.0)?;
        }
        self.set_header_enabled(false)?;
        self.configure_transfer()
    }

    pub fn header_enabled(&mut self) -> Result<bool, ScopeError> {
        self.query_bool("HEADer?")
    }

    pub fn set_header_enabled(&mut self, enabled: bool) -> Result<(), ScopeError> {
        self.write(if enabled { "HEADer ON" } else { "HEADer OFF" })
    }

    /// Fetch the current record of `source` (or of the selected data source)
    /// in physical units.
    ///
    /// Uses the combined `WAVFrm?` query so the preamble and the curve always
    /// belong to the same acquisition. Header echo is switched off again even
    /// when the transfer fails.
    #[tracing::instrument(level = "debug", skip(self), fields(revision = self.dialect.revision()))]
    pub fn fetch_waveform(&mut self, source: Option<DataSource>) -> Result<Waveform, ScopeError> {
        if let Some(source) = source {
            self.set_data_source(source)?;
        }

        self.set_header_enabled(true)?;
        let response = self.session.terminal.query_binary("WAVFrm?");
        let restored = self.set_header_enabled(false);
        let response = response?;
        restored?;

        Ok(waveform::decode_combined(&response)?)
    }

    pub fn fetch_frame(&mut self, source: Option<DataSource>) -> Result<DataFrame, ScopeError> {
        Ok(self.fetch_waveform(source)?.to_dataframe()?)
    }

    pub fn max_sample_rate(&mut self) -> Result<f64, ScopeError> {
        self.query_f64("ACQuire:MAXSamplerate?")
    }

    /// `record_length / (horizontal_scale * divisions)`
    pub fn sample_rate(&mut self) -> Result<f64, ScopeError> {
        let record_length = self.record_length()?;
        let scale = self.horizontal_scale()?;
        Ok(dialect::derived_sample_rate(
            self.dialect.divisions(),
            record_length,
            scale,
        ))
    }

    /// Adjusts the horizontal scale; the record length stays.
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), ScopeError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ScopeError::InvalidArgument(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        let record_length = self.record_length()?;
        let scale =
            dialect::horizontal_scale_for_rate(self.dialect.divisions(), record_length, sample_rate);
        self.set_horizontal_scale(scale)
    }

    pub fn horizontal_scale(&mut self) -> Result<f64, ScopeError> {
        self.query_f64("HORizontal:MAIn:SCAle?")
    }

    pub fn set_horizontal_scale(&mut self, seconds_per_division: f64) -> Result<(), ScopeError> {
        self.write(&format!("HORizontal:MAIn:SCAle {seconds_per_division}"))
    }

    pub fn record_length(&mut self) -> Result<u32, ScopeError> {
        let header = self.dialect.record_length_header();
        self.query_u32(&format!("{header}?"))
    }

    /// Also moves the transfer window so the whole record is still sent.
    pub fn set_record_length(&mut self, record_length: u32) -> Result<(), ScopeError> {
        if !self.dialect.record_length_settable() {
            return Err(self.dialect.unsupported("record length").into());
        }
        self.write(&format!("DATa:STOP {record_length}"))?;
        let header = self.dialect.record_length_header();
        self.write(&format!("{header} {record_length}"))
    }

    pub fn acquisition_mode(&mut self) -> Result<AcquisitionMode, ScopeError> {
        self.query_setting("ACQuire:MODe", |c| c.acquisition_mode.as_ref())
    }

    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), ScopeError> {
        self.write_setting("ACQuire:MODe", |c| c.acquisition_mode.as_ref(), mode)
    }

    pub fn data_source(&mut self) -> Result<DataSource, ScopeError> {
        self.query_setting("DATa:SOUrce", |c| c.data_source.as_ref())
    }

    pub fn set_data_source(&mut self, source: DataSource) -> Result<(), ScopeError> {
        self.write_setting("DATa:SOUrce", |c| c.data_source.as_ref(), source)
    }

    pub fn number_of_waveform_points(&mut self) -> Result<u32, ScopeError> {
        let pre = self.dialect.preamble_root();
        self.query_u32(&format!("{pre}:NR_Pt?"))
    }

    fn preamble_f64(&mut self, key: &str) -> Result<f64, ScopeError> {
        let pre = self.dialect.preamble_root();
        self.query_f64(&format!("{pre}:{key}?"))
    }

    fn preamble_unit(&mut self, key: &str) -> Result<String, ScopeError> {
        let pre = self.dialect.preamble_root();
        let unit = self.query(&format!("{pre}:{key}?"))?;
        Ok(unit.trim().trim_matches('"').to_ascii_uppercase())
    }

    /// Seconds between samples of the last transferred waveform.
    pub fn x_increment(&mut self) -> Result<f64, ScopeError> {
        self.preamble_f64("XINcr")
    }

    pub fn x_unit(&mut self) -> Result<String, ScopeError> {
        self.preamble_unit("XUNit")
    }

    /// Time of the first sample.
    pub fn x_offset(&mut self) -> Result<f64, ScopeError> {
        self.preamble_f64("XZEro")
    }

    pub fn y_increment(&mut self) -> Result<f64, ScopeError> {
        self.preamble_f64("YMUlt")
    }

    pub fn y_unit(&mut self) -> Result<String, ScopeError> {
        self.preamble_unit("YUNit")
    }

    pub fn y_offset(&mut self) -> Result<f64, ScopeError> {
        self.preamble_f64("YZEro")
    }

    pub fn trig_type(&mut self) -> Result<TriggerType, ScopeError> {
        let root = self.dialect.trigger_root();
        self.query_setting(&format!("{root}:TYPe"), |c| c.trigger_type.as_ref())
    }

    pub fn set_trig_type(&mut self, trigger_type: TriggerType) -> Result<(), ScopeError> {
        let root = self.dialect.trigger_root();
        self.write_setting(&format!("{root}:TYPe"), |c| c.trigger_type.as_ref(), trigger_type)
    }

    pub fn trig_pulse_class(&mut self) -> Result<PulseClass, ScopeError> {
        let root = self.dialect.trigger_root();
        self.query_setting(&format!("{root}:PULse:CLAss"), |c| c.pulse_class.as_ref())
    }

    pub fn set_trig_pulse_class(&mut self, class: PulseClass) -> Result<(), ScopeError> {
        let root = self.dialect.trigger_root();
        self.write_setting(&format!("{root}:PULse:CLAss"), |c| c.pulse_class.as_ref(), class)
    }

    fn trigger_branch(&mut self) -> Result<TriggerBranch, ScopeError> {
        Ok(match self.trig_type()? {
            TriggerType::Edge => TriggerBranch::Edge,
            TriggerType::Pulse => {
                let runt = self.dialect.capabilities().pulse_class.is_some()
                    && self.trig_pulse_class()? == PulseClass::Runt;
                if runt {
                    TriggerBranch::Runt
                } else {
                    TriggerBranch::Width
                }
            }
            TriggerType::Video => TriggerBranch::Video,
            other => {
                return Err(CapabilityError::UnsupportedValue {
                    setting: TriggerType::CATEGORY,
                    value: format!("{other:?}"),
                    revision: self.dialect.revision(),
                }
                .into())
            }
        })
    }

    /// Runt triggers take a [low, high] threshold pair, everything else one level.
    fn level_encoding(&mut self) -> Result<LevelEncoding, ScopeError> {
        Ok(match self.trigger_branch()? {
            TriggerBranch::Runt => LevelEncoding::Window,
            _ => LevelEncoding::Single,
        })
    }

    fn trig_source_header(&mut self) -> Result<String, ScopeError> {
        let root = self.dialect.trigger_root();
        Ok(match self.trigger_branch()? {
            TriggerBranch::Edge => format!("{root}:EDGE:SOUrce"),
            TriggerBranch::Runt => format!("{root}:RUNT:SOUrce"),
            TriggerBranch::Width => format!("{root}:PULse:SOUrce"),
            TriggerBranch::Video => format!("{root}:VIDeo:SOUrce"),
        })
    }

    /// Source of the active trigger type.
    pub fn trig_source(&mut self) -> Result<TriggerSource, ScopeError> {
        let header = self.trig_source_header()?;
        self.query_setting(&header, |c| c.trigger_source.as_ref())
    }

    pub fn set_trig_source(&mut self, source: TriggerSource) -> Result<(), ScopeError> {
        let header = self.trig_source_header()?;
        self.write_setting(&header, |c| c.trigger_source.as_ref(), source)
    }

    /// Edge slope, or pulse polarity (positive = rising) for pulse triggers.
    fn trig_slope_target(&mut self) -> Result<(String, Table<TriggerSlope>), ScopeError> {
        let root = self.dialect.trigger_root();
        let edge: Table<TriggerSlope> = |c| c.trigger_slope.as_ref();
        let polarity: Table<TriggerSlope> = |c| c.pulse_polarity.as_ref();
        match self.trigger_branch()? {
            TriggerBranch::Edge => Ok((format!("{root}:EDGE:SLOpe"), edge)),
            TriggerBranch::Runt => Ok((format!("{root}:RUNT:POLarity"), polarity)),
            TriggerBranch::Width => Ok((format!("{root}:PULse:WIDth:POLarity"), polarity)),
            TriggerBranch::Video => Err(self.dialect.unsupported("video trigger slope").into()),
        }
    }

    pub fn trig_slope(&mut self) -> Result<TriggerSlope, ScopeError> {
        let (header, table) = self.trig_slope_target()?;
        self.query_setting(&header, table)
    }

    pub fn set_trig_slope(&mut self, slope: TriggerSlope) -> Result<(), ScopeError> {
        let (header, table) = self.trig_slope_target()?;
        self.write_setting(&header, table, slope)
    }

    pub fn trig_sweep(&mut self) -> Result<TriggerSweep, ScopeError> {
        let root = self.dialect.trigger_root();
        self.query_setting(&format!("{root}:MODe"), |c| c.trigger_sweep.as_ref())
    }

    pub fn set_trig_sweep(&mut self, sweep: TriggerSweep) -> Result<(), ScopeError> {
        let root = self.dialect.trigger_root();
        self.write_setting(&format!("{root}:MODe"), |c| c.trigger_sweep.as_ref(), sweep)
    }

    fn require_runt(&self) -> Result<(), ScopeError> {
        require(
            self.dialect.capabilities().pulse_class.as_ref(),
            self.dialect.revision(),
        )?;
        Ok(())
    }

    /// Runt trigger width in seconds.
    pub fn trigger_time_width(&mut self) -> Result<f64, ScopeError> {
        self.require_runt()?;
        let root = self.dialect.trigger_root();
        self.query_f64(&format!("{root}:RUNT:WIDth?"))
    }

    pub fn set_trigger_time_width(&mut self, seconds: f64) -> Result<(), ScopeError> {
        self.require_runt()?;
        let root = self.dialect.trigger_root();
        self.write(&format!("{root}:RUNT:WIDth {seconds}"))
    }

    /// Horizontal delay: time from the trigger point to the screen center.
    pub fn pre_sample_time(&mut self) -> Result<f64, ScopeError> {
        let header = self.dialect.pre_sample_header();
        self.query_f64(&format!("{header}?"))
    }

    pub fn set_pre_sample_time(&mut self, seconds: f64) -> Result<(), ScopeError> {
        let header = self.dialect.pre_sample_header();
        self.write(&format!("{header} {seconds}"))
    }

    /// Share of the record before the trigger point, 0.5 at zero delay.
    pub fn pre_sample_ratio(&mut self) -> Result<f64, ScopeError> {
        let delay = self.pre_sample_time()?;
        let window = self.horizontal_scale()? * self.dialect.divisions();
        Ok(-delay / window + 0.5)
    }

    pub fn set_pre_sample_ratio(&mut self, ratio: f64) -> Result<(), ScopeError> {
        let window = self.horizontal_scale()? * self.dialect.divisions();
        self.set_pre_sample_time(-(ratio - 0.5) * window)
    }

    pub fn horizontal_view(&mut self) -> Result<HorizontalView, ScopeError> {
        self.query_setting("HORizontal:VIEW", |c| c.horizontal_view.as_ref())
    }

    pub fn set_horizontal_view(&mut self, view: HorizontalView) -> Result<(), ScopeError> {
        self.write_setting("HORizontal:VIEW", |c| c.horizontal_view.as_ref(), view)
    }

    fn require_fft(&self) -> Result<(), ScopeError> {
        require(
            self.dialect.capabilities().fft_window.as_ref(),
            self.dialect.revision(),
        )?;
        Ok(())
    }

    pub fn fft_ordinate_unit(&mut self) -> Result<FftUnit, ScopeError> {
        self.query_setting("FFT:VType", |c| c.fft_unit.as_ref())
    }

    pub fn set_fft_ordinate_unit(&mut self, unit: FftUnit) -> Result<(), ScopeError> {
        self.write_setting("FFT:VType", |c| c.fft_unit.as_ref(), unit)
    }

    pub fn fft_window(&mut self) -> Result<FftWindow, ScopeError> {
        self.query_setting("FFT:WINdow", |c| c.fft_window.as_ref())
    }

    pub fn set_fft_window(&mut self, window: FftWindow) -> Result<(), ScopeError> {
        self.write_setting("FFT:WINdow", |c| c.fft_window.as_ref(), window)
    }

    pub fn fft_horizontal_scale(&mut self) -> Result<f64, ScopeError> {
        self.require_fft()?;
        self.query_f64("FFT:HORizontal:SCAle?")
    }

    pub fn set_fft_horizontal_scale(&mut self, hertz_per_division: f64) -> Result<(), ScopeError> {
        self.require_fft()?;
        self.write(&format!("FFT:HORizontal:SCAle {hertz_per_division}"))
    }

    pub fn fft_vertical_scale(&mut self) -> Result<f64, ScopeError> {
        self.require_fft()?;
        self.query_f64("FFT:VERTical:SCAle?")
    }

    pub fn set_fft_vertical_scale(&mut self, scale: f64) -> Result<(), ScopeError> {
        self.require_fft()?;
        self.write(&format!("FFT:VERTical:SCAle {scale}"))
    }

    pub fn fft_source(&mut self) -> Result<DataSource, ScopeError> {
        self.require_fft()?;
        self.query_setting("FFT:SOURce", |c| c.data_source.as_ref())
    }

    pub fn set_fft_source(&mut self, channel: u8) -> Result<(), ScopeError> {
        self.require_fft()?;
        let channel = check_channel(channel)?;
        self.write_setting(
            "FFT:SOURce",
            |c| c.data_source.as_ref(),
            channel_source(channel),
        )
    }
}

/// One analog input of a [`TektronixScope`].
#[derive(Debug)]
pub struct TektronixChannel<'a> {
    scope: &'a mut TektronixScope,
    index: u8,
}

impl TektronixChannel<'_> {
    pub fn index(&self) -> u8 {
        self.index
    }

    /// An empty waveform if the channel is switched off.
    pub fn fetch_waveform(&mut self) -> Result<Waveform, ScopeError> {
        if !self.enabled()? {
            log::debug!("CH{} is off, nothing to fetch", self.index);
            return Ok(Waveform::default());
        }
        self.scope.fetch_waveform(Some(channel_source(self.index)))
    }

    pub fn fetch_frame(&mut self) -> Result<DataFrame, ScopeError> {
        Ok(self.fetch_waveform()?.to_dataframe()?)
    }

    /// `Single` for edge and width triggers, `Window` for runt triggers.
    pub fn trig_lvl(&mut self) -> Result<TriggerLevel, ScopeError> {
        let encoding = self.scope.level_encoding()?;
        let header = self.scope.dialect.level_header(self.index);
        let low = self.scope.query_f64(&format!("{header}?"))?;
        match encoding {
            LevelEncoding::Single => Ok(TriggerLevel::Single(low)),
            LevelEncoding::Window => Ok(TriggerLevel::Window {
                low,
                high: self.upper_threshold()?,
            }),
        }
    }

    /// For a runt trigger the lowest value becomes the lower and the highest
    /// the upper threshold. Otherwise the first value is the level.
    pub fn set_trig_lvl(&mut self, levels: &[f64]) -> Result<(), ScopeError> {
        let encoding = self.scope.level_encoding()?;
        let header = self.scope.dialect.level_header(self.index);
        match TriggerLevel::encode(levels, encoding)? {
            TriggerLevel::Single(level) => self.scope.write(&format!("{header} {level}")),
            TriggerLevel::Window { low, high } => {
                self.scope.write(&format!("{header} {low}"))?;
                self.set_upper_threshold(high)
            }
        }
    }

    fn upper_threshold_header(&self) -> Result<String, ScopeError> {
        self.scope
            .dialect
            .upper_threshold_header(self.index)
            .ok_or_else(|| self.scope.dialect.unsupported("upper trigger threshold").into())
    }

    pub fn upper_threshold(&mut self) -> Result<f64, ScopeError> {
        let header = self.upper_threshold_header()?;
        self.scope.query_f64(&format!("{header}?"))
    }

    pub fn set_upper_threshold(&mut self, level: f64) -> Result<(), ScopeError> {
        let header = self.upper_threshold_header()?;
        self.scope.write(&format!("{header} {level}"))
    }

    /// Output divided by input, 0.1 for a 10x probe.
    pub fn probe_gain(&mut self) -> Result<f64, ScopeError> {
        Ok(1.0 / self.attenuation()?)
    }

    pub fn set_probe_gain(&mut self, gain: f64) -> Result<(), ScopeError> {
        if !(gain.is_finite() && gain > 0.0) {
            return Err(ScopeError::InvalidArgument(format!(
                "probe gain must be positive, got {gain}"
            )));
        }
        match self.scope.dialect.probe_control() {
            ProbeControl::Gain => self
                .scope
                .write(&format!("CH{}:PRObe:GAIN {gain}", self.index)),
            ProbeControl::Attenuation => self
                .scope
                .write(&format!("CH{}:PRObe {}", self.index, 1.0 / gain)),
        }
    }

    pub fn attenuation(&mut self) -> Result<f64, ScopeError> {
        match self.scope.dialect.probe_control() {
            ProbeControl::Gain => {
                let gain = self
                    .scope
                    .query_f64(&format!("CH{}:PRObe:GAIN?", self.index))?;
                Ok(1.0 / gain)
            }
            ProbeControl::Attenuation => self.scope.query_f64(&format!("CH{}:PRObe?", self.index)),
        }
    }

    pub fn set_attenuation(&mut self, attenuation: f64) -> Result<(), ScopeError> {
        if !(attenuation.is_finite() && attenuation > 0.0) {
            return Err(ScopeError::InvalidArgument(format!(
                "attenuation must be positive, got {attenuation}"
            )));
        }
        match self.scope.dialect.probe_control() {
            ProbeControl::Gain => self.set_probe_gain(1.0 / attenuation),
            ProbeControl::Attenuation => self
                .scope
                .write(&format!("CH{}:PRObe {attenuation}", self.index)),
        }
    }

    pub fn enabled(&mut self) -> Result<bool, ScopeError> {
        self.scope.query_bool(&format!("SELect:CH{}?", self.index))
    }

    /// Switching a channel resets the acquisition.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ScopeError> {
        let state = if enabled { "ON" } else { "OFF" };
        self.scope
            .write(&format!("SELect:CH{} {state}", self.index))
    }

    pub fn measured_unit(&mut self) -> Result<ProbeUnit, ScopeError> {
        let header = format!("CH{}:PRObe:UNIts", self.index);
        self.scope.query_setting(&header, |c| c.probe_unit.as_ref())
    }

    pub fn coupling(&mut self) -> Result<Coupling, ScopeError> {
        let header = format!("CH{}:COUPling", self.index);
        self.scope.query_setting(&header, |c| c.coupling.as_ref())
    }

    pub fn set_coupling(&mut self, coupling: Coupling) -> Result<(), ScopeError> {
        let header = format!("CH{}:COUPling", self.index);
        self.scope
            .write_setting(&header, |c| c.coupling.as_ref(), coupling)
    }

    /// Vertical offset in volts; the instrument displays the input minus it.
    pub fn offset(&mut self) -> Result<f64, ScopeError> {
        self.scope.query_f64(&format!("CH{}:OFFSet?", self.index))
    }

    pub fn set_offset(&mut self, volts: f64) -> Result<(), ScopeError> {
        self.scope
            .write(&format!("CH{}:OFFSet {volts}", self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::assert_round_trips;
    use crate::mock_bus::{MockBus, MockResourceManager};
    use crate::scpi_terminal::{ErrorClass, TerminalError};
    use crate::waveform::WaveformError;

    const TBS1000C: &str = "USB0::0x0699::0x03C4::C010101::INSTR";
    const TBS1000B: &str = "USB0::1689::872::C020202::INSTR";

    fn open(resource: &str) -> (TektronixScope, MockBus) {
        let bus = MockBus::new();
        bus.set("*IDN", "TEKTRONIX,TBS1072C,C010101,CF:91.1CT FV:v1.24.5")
            .set("HORizontal:RESOlution", "2000")
            .set("HORizontal:RECOrdlength", "2500")
            .set("HORizontal:MAIn:SCAle", "1.0E-3");
        let rm = MockResourceManager::new().with_resource(resource, bus.clone());
        let connector = ScopeConnector::new(Box::new(rm));
        let scope = TektronixScope::open(&connector, None).unwrap();
        bus.clear_log();
        (scope, bus)
    }

    fn frame(header: &str, samples: &[i8]) -> Vec<u8> {
        let len = samples.len().to_string();
        let mut data = format!("{header};:CURVE #{}{}", len.len(), len).into_bytes();
        data.extend(samples.iter().map(|&s| s as u8));
        data.push(b'\n');
        data
    }

    #[test]
    fn test_open_configures_transfer() {
        let bus = MockBus::new();
        bus.set("*IDN", "TEKTRONIX,TBS1072C,C010101,v1")
            .set("HORizontal:RESOlution", "2000");
        let rm = MockResourceManager::new().with_resource(TBS1000C, bus.clone());
        let connector = ScopeConnector::new(Box::new(rm));
        let scope = TektronixScope::open(&connector, None).unwrap();

        assert_eq!(scope.revision(), TektronixRevision::Tbs1000C);
        assert_eq!(
            bus.commands(),
            vec![
                "*CLS",
                "*IDN?",
                "HEADer OFF",
                "WFMOutpre:ENCdg BINary",
                "WFMOutpre:BN_Fmt RI",
                "DATa:WIDth 1",
                "DATa:STARt 1",
                "HORizontal:RESOlution?",
                "DATa:STOP 2000",
            ]
        );
    }

    #[test]
    fn test_tbs1000b_uses_its_own_roots() {
        let (mut scope, bus) = open(TBS1000B);
        assert_eq!(scope.revision(), TektronixRevision::Tbs1000B);
        assert_eq!(scope.record_length().unwrap(), 2500);

        bus.set("TRIGger:MAIn:TYPe", "EDGE");
        scope.channel(1).unwrap().set_trig_lvl(&[0.7]).unwrap();
        assert_eq!(
            bus.commands(),
            vec![
                "HORizontal:RECOrdlength?",
                "TRIGger:MAIn:TYPe?",
                "TRIGger:MAIn:LEVel 0.7",
            ]
        );
    }

    #[test]
    fn test_runt_trigger_levels_are_reordered() {
        let (mut scope, bus) = open(TBS1000C);
        bus.set("TRIGger:A:TYPe", "PULSE")
            .set("TRIGger:A:PULse:CLAss", "RUNT");

        scope.channel(1).unwrap().set_trig_lvl(&[1.5, -0.5]).unwrap();
        assert_eq!(
            bus.commands(),
            vec![
                "TRIGger:A:TYPe?",
                "TRIGger:A:PULse:CLAss?",
                "TRIGger:A:LOWerthreshold:CH1 -0.5",
                "TRIGger:A:UPPerthreshold:CH1 1.5",
            ]
        );
        assert_eq!(
            scope.channel(1).unwrap().trig_lvl().unwrap(),
            TriggerLevel::Window {
                low: -0.5,
                high: 1.5
            }
        );
    }

    #[test]
    fn test_edge_trigger_level_is_single() {
        let (mut scope, bus) = open(TBS1000C);
        bus.set("TRIGger:A:TYPe", "EDGE");

        let mut ch2 = scope.channel(2).unwrap();
        ch2.set_trig_lvl(&[0.3, 2.0]).unwrap();
        assert_eq!(ch2.trig_lvl().unwrap(), TriggerLevel::Single(0.3));
        assert!(bus
            .commands()
            .contains(&"TRIGger:A:LOWerthreshold:CH2 0.3".to_string()));
    }

    #[test]
    fn test_unsupported_settings_fail_before_touching_the_bus() {
        let (mut scope, bus) = open(TBS1000B);

        let err = scope.set_acquisition_mode(AcquisitionMode::HiRes).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::Capability(CapabilityError::UnsupportedValue {
                revision: "TBS1000B",
                ..
            })
        ));
        let err = scope.trig_pulse_class().unwrap_err();
        assert!(matches!(
            err,
            ScopeError::Capability(CapabilityError::Unsupported {
                setting: "pulse class",
                ..
            })
        ));
        assert!(matches!(
            scope.set_record_length(5000),
            Err(ScopeError::Capability(_))
        ));
        assert!(matches!(scope.fft_window(), Err(ScopeError::Capability(_))));
        assert!(bus.commands().is_empty());
    }

    #[test]
    fn test_tbs1000c_has_no_horizontal_view() {
        let (mut scope, _bus) = open(TBS1000C);
        assert!(matches!(
            scope.horizontal_view(),
            Err(ScopeError::Capability(CapabilityError::Unsupported { .. }))
        ));
        let (mut scope, _bus) = open(TBS1000B);
        scope.set_horizontal_view(HorizontalView::Zone).unwrap();
        assert_eq!(scope.horizontal_view().unwrap(), HorizontalView::Zone);
    }

    #[test]
    fn test_fetch_waveform_protocol() {
        let (mut scope, bus) = open(TBS1000C);
        bus.respond_raw(
            "WAVFrm?",
            frame(
                ":WFMOUTPRE:BYT_NR 1;BN_FMT RI;NR_PT 4;XINCR 1.0E-6;XZERO -2.0E-6;YMULT 0.5;YZERO 0.0E0;YOFF 2.0E0",
                &[2, 4, -2, 0],
            ),
        );

        let waveform = scope.fetch_waveform(Some(DataSource::Ch1)).unwrap();
        assert_eq!(
            bus.commands(),
            vec!["DATa:SOUrce CH1", "HEADer ON", "WAVFrm?", "HEADer OFF"]
        );
        assert_eq!(waveform.y, vec![0.0, 1.0, -2.0, -1.0]);
        assert!((waveform.x[0] + 2.0e-6).abs() < 1e-18);
        assert!((waveform.x[3] - 1.0e-6).abs() < 1e-18);
        assert!(!scope.header_enabled().unwrap());
    }

    #[test]
    fn test_fetch_restores_header_after_bad_frame() {
        let (mut scope, bus) = open(TBS1000C);
        let mut data = b"XINCR 1;XZERO 0;YMULT 1;YZERO 0;YOFF 0;:CURVE #3500".to_vec();
        data.extend_from_slice(&[5; 10]);
        data.push(b'\n');
        bus.respond_raw("WAVFrm?", data);

        let err = scope.fetch_waveform(None).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::Waveform(WaveformError::PayloadLengthMismatch {
                declared: 500,
                actual: 10
            })
        ));
        assert_eq!(bus.commands().last().unwrap(), "HEADer OFF");
    }

    #[test]
    fn test_channel_fetch_of_full_record() {
        let (mut scope, bus) = open(TBS1000C);
        bus.set("SELect:CH2", "1");
        bus.respond_raw(
            "WAVFrm?",
            frame("XINCR 2.0E-6;XZERO 0.0E0;YMULT 0.1;YZERO 0.0E0;YOFF 0.0E0", &[5; 500]),
        );

        let frame = scope.channel(2).unwrap().fetch_frame().unwrap();
        assert_eq!(frame.height(), 500);
        assert_eq!(bus.commands()[1], "DATa:SOUrce CH2");

        let values = frame.column("value").unwrap().f64().unwrap();
        assert!(values.into_no_null_iter().all(|v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_fetch_restores_header_after_timeout() {
        let (mut scope, bus) = open(TBS1000C);
        assert!(matches!(
            scope.fetch_waveform(None),
            Err(ScopeError::Terminal(TerminalError::Bus(_)))
        ));
        assert_eq!(bus.commands(), vec!["HEADer ON", "WAVFrm?", "HEADer OFF"]);
    }

    #[test]
    fn test_disabled_channel_fetches_nothing() {
        let (mut scope, bus) = open(TBS1000C);
        bus.set("SELect:CH2", "0");
        let waveform = scope.channel(2).unwrap().fetch_waveform().unwrap();
        assert!(waveform.is_empty());
        assert_eq!(bus.commands(), vec!["SELect:CH2?"]);
    }

    #[test]
    fn test_getters_are_idempotent() {
        let (mut scope, _bus) = open(TBS1000C);
        scope.set_acquisition_mode(AcquisitionMode::PeakDetect).unwrap();
        let first = scope.acquisition_mode().unwrap();
        assert_eq!(first, scope.acquisition_mode().unwrap());
        assert_eq!(first, AcquisitionMode::PeakDetect);

        scope.set_horizontal_scale(2.0e-3).unwrap();
        let a = scope.horizontal_scale().unwrap();
        let b = scope.horizontal_scale().unwrap();
        assert!((a - b).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_rate_uses_revision_divisions() {
        let (mut scope, bus) = open(TBS1000C);
        assert!((scope.sample_rate().unwrap() - 125_000.0).abs() < 1e-6);

        scope.set_sample_rate(250_000.0).unwrap();
        assert_eq!(
            bus.commands().last().unwrap(),
            "HORizontal:MAIn:SCAle 0.0005"
        );
        assert!(matches!(
            scope.set_sample_rate(0.0),
            Err(ScopeError::InvalidArgument(_))
        ));

        let (mut scope, _bus) = open(TBS1000B);
        assert!((scope.sample_rate().unwrap() - 250_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_pre_sample_ratio() {
        let (mut scope, bus) = open(TBS1000C);
        scope.set_pre_sample_ratio(0.25).unwrap();
        assert_eq!(
            bus.commands().last().unwrap(),
            "HORizontal:DELay:TIMe 0.004"
        );
        assert!((scope.pre_sample_ratio().unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_trig_slope_follows_trigger_type() {
        let (mut scope, bus) = open(TBS1000C);
        bus.set("TRIGger:A:TYPe", "PULSE")
            .set("TRIGger:A:PULse:CLAss", "WIDTH");
        scope.set_trig_slope(TriggerSlope::Falling).unwrap();
        assert_eq!(
            bus.commands().last().unwrap(),
            "TRIGger:A:PULse:WIDth:POLarity NEGative"
        );
        assert_eq!(scope.trig_slope().unwrap(), TriggerSlope::Falling);

        bus.set("TRIGger:A:TYPe", "EDGE");
        scope.set_trig_source(TriggerSource::Ch2).unwrap();
        assert_eq!(
            bus.commands().last().unwrap(),
            "TRIGger:A:EDGE:SOUrce CH2"
        );
    }

    #[test]
    fn test_instrument_error_is_reported() {
        let (mut scope, bus) = open(TBS1000C);
        bus.respond("*ESR?", "16");
        let err = scope.set_horizontal_scale(1.0e9).unwrap_err();
        let instrument = err.instrument_error().unwrap();
        assert_eq!(instrument.class, ErrorClass::Execution);
        assert_eq!(instrument.command, "HORizontal:MAIn:SCAle 1000000000");
    }

    #[test]
    fn test_reset_restores_unity_attenuation() {
        let (mut scope, bus) = open(TBS1000C);
        scope.reset().unwrap();
        let commands = bus.commands();
        assert_eq!(commands[0], "*RST");
        assert!(commands.contains(&"CH1:PRObe:GAIN 1".to_string()));
        assert!(commands.contains(&"CH2:PRObe:GAIN 1".to_string()));
        assert!((scope.channel(1).unwrap().attenuation().unwrap() - 1.0).abs() < 1e-12);

        let (mut scope, bus) = open(TBS1000B);
        scope.reset().unwrap();
        assert!(bus.commands().contains(&"CH2:PRObe 1".to_string()));
    }

    #[test]
    fn test_probe_gain_and_attenuation_are_inverse() {
        let (mut scope, _bus) = open(TBS1000C);
        let mut ch1 = scope.channel(1).unwrap();
        ch1.set_attenuation(10.0).unwrap();
        assert!((ch1.probe_gain().unwrap() - 0.1).abs() < 1e-12);
        assert!(matches!(
            ch1.set_attenuation(0.0),
            Err(ScopeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_invalid_channel() {
        let (mut scope, _bus) = open(TBS1000C);
        assert!(matches!(scope.channel(3), Err(ScopeError::InvalidChannel(3))));
        assert!(matches!(scope.channel(0), Err(ScopeError::InvalidChannel(0))));
    }

    #[test]
    fn test_revision_from_model() {
        assert_eq!(
            Tektronix::revision_for_model("TBS1072C"),
            Some(TektronixRevision::Tbs1000C)
        );
        assert_eq!(
            Tektronix::revision_for_model("TBS1052B-EDU"),
            Some(TektronixRevision::Tbs1000B)
        );
        assert_eq!(Tektronix::revision_for_model("MSO44"), None);
    }

    #[test]
    fn test_every_table_is_a_bijection() {
        let c = TektronixDialect::new(TektronixRevision::Tbs1000C).unwrap();
        assert_eq!(assert_round_trips(c.capabilities()), 12);
        let b = TektronixDialect::new(TektronixRevision::Tbs1000B).unwrap();
        assert_eq!(assert_round_trips(b.capabilities()), 9);
    }
}
