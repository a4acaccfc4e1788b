//! Keysight InfiniiVision 1000 X-Series oscilloscopes (DSOX1102A).
//!
//! Waveforms are transferred as unsigned bytes with a separate
//! `:WAVeform:PREamble?` query. Errors are reported through the SCPI error
//! queue rather than the event status register.

use std::time::Duration;

use polars::prelude::DataFrame;

use crate::capability::{
    require, AcquisitionMode, CapabilityError, Coupling, DataSource, FftUnit, FftWindow,
    MathFunction, PointsMode, ProbeUnit, Setting, TriggerSlope, TriggerSource, TriggerSweep,
    TriggerType, Vocabulary,
};
use crate::dialect::{table, Capabilities, Dialect};
use crate::error::{check_channel, ScopeError};
use crate::resource::Identity;
use crate::scope_connector::{Connection, ScopeConnector, ScopeFamily};
use crate::scpi_terminal::StatusCheck;
use crate::trigger_config::{LevelEncoding, TriggerLevel};
use crate::waveform::{linspace, BinaryBlock, Preamble, SampleEncoding, Waveform, WaveformError};

pub const KEYSIGHT_VENDOR_ID: u32 = 10893;
pub const DSOX1102A_PRODUCT_ID: u32 = 6023;

/// Largest measurement record `:WAVeform:POINts` accepts in NORMal mode.
pub const MEASUREMENT_RECORD_POINTS: u32 = 62_500;

/// Setup memory slots are numbered 0 to 9.
pub const SETUP_SLOTS: u8 = 10;

const VERTICAL_DIVISIONS: f64 = 8.0;

#[derive(Debug, Clone, Copy)]
pub struct Keysight;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysightRevision {
    Dsox1102A,
}

impl KeysightRevision {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Dsox1102A => "DSOX1102A",
        }
    }
}

impl ScopeFamily for Keysight {
    const NAME: &'static str = "Keysight";
    const VENDOR_ID: u32 = KEYSIGHT_VENDOR_ID;
    const PRODUCT_IDS: &'static [u32] = &[DSOX1102A_PRODUCT_ID];

    type Revision = KeysightRevision;

    fn revision_for_product(product_id: u32) -> Option<KeysightRevision> {
        (product_id == DSOX1102A_PRODUCT_ID).then_some(KeysightRevision::Dsox1102A)
    }

    /// The instrument reports itself as `DSO-X 1102A`.
    fn revision_for_model(model: &str) -> Option<KeysightRevision> {
        let model: String = model
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        model
            .starts_with("DSOX1")
            .then_some(KeysightRevision::Dsox1102A)
    }

    fn status_check() -> StatusCheck {
        StatusCheck::ErrorQueue
    }
}

#[derive(Debug)]
pub struct KeysightDialect {
    revision: KeysightRevision,
    capabilities: Capabilities,
}

impl KeysightDialect {
    pub fn new(revision: KeysightRevision) -> Result<Self, CapabilityError> {
        use AcquisitionMode as Acq;

        let tag = revision.tag();
        let fft_window = [
            (FftWindow::Rectangular, "RECTangular"),
            (FftWindow::Hanning, "HANNing"),
            (FftWindow::FlatTop, "FLATtop"),
            (FftWindow::BlackmanHarris, "BHARris"),
        ];
        let capabilities = Capabilities {
            acquisition_mode: table(
                tag,
                &[
                    (Acq::Sample, "NORMal"),
                    (Acq::PeakDetect, "PEAK"),
                    (Acq::Average, "AVERage"),
                    (Acq::HiRes, "HRESolution"),
                ],
            )?,
            data_source: table(
                tag,
                &[
                    (DataSource::Ch1, "CHANnel1"),
                    (DataSource::Ch2, "CHANnel2"),
                    (DataSource::Function, "FUNCtion"),
                    (DataSource::Math, "MATH"),
                    (DataSource::Fft, "FFT"),
                    (DataSource::Memory1, "WMEMory1"),
                    (DataSource::Memory2, "WMEMory2"),
                ],
            )?,
            trigger_type: table(
                tag,
                &[
                    (TriggerType::Edge, "EDGE"),
                    (TriggerType::Pulse, "GLITch"),
                    (TriggerType::Pattern, "PATTern"),
                    (TriggerType::SetupHold, "SHOLd"),
                    (TriggerType::Transition, "TRANsition"),
                    (TriggerType::Video, "TV"),
                    (TriggerType::SerialBus, "SBUS1"),
                ],
            )?,
            trigger_slope: table(
                tag,
                &[
                    (TriggerSlope::Rising, "POSitive"),
                    (TriggerSlope::Falling, "NEGative"),
                    (TriggerSlope::Either, "EITHer"),
                    (TriggerSlope::Alternate, "ALTernate"),
                ],
            )?,
            trigger_source: table(
                tag,
                &[
                    (TriggerSource::Ch1, "CHANnel1"),
                    (TriggerSource::Ch2, "CHANnel2"),
                    (TriggerSource::External, "EXTernal"),
                    (TriggerSource::Line, "LINE"),
                    (TriggerSource::Generator, "WGEN"),
                ],
            )?,
            trigger_sweep: table(
                tag,
                &[(TriggerSweep::Auto, "AUTO"), (TriggerSweep::Normal, "NORMal")],
            )?,
            coupling: table(tag, &[(Coupling::Ac, "AC"), (Coupling::Dc, "DC")])?,
            fft_window: table(tag, &fft_window)?,
            fft_unit: table(tag, &[(FftUnit::Decibel, "DECibel"), (FftUnit::Vrms, "VRMS")])?,
            math_fft_unit: table(
                tag,
                &[
                    (FftUnit::Decibel, "DECibel"),
                    (FftUnit::Vrms, "VRMS"),
                    (FftUnit::Degree, "DEGRees"),
                    (FftUnit::Radian, "RADians"),
                ],
            )?,
            points_mode: table(
                tag,
                &[
                    (PointsMode::Normal, "NORMal"),
                    (PointsMode::Maximum, "MAXimum"),
                    (PointsMode::Raw, "RAW"),
                ],
            )?,
            math_function: table(
                tag,
                &[
                    (MathFunction::Add, "ADD"),
                    (MathFunction::Subtract, "SUBTract"),
                    (MathFunction::Multiply, "MULTiply"),
                    (MathFunction::Divide, "DIVide"),
                    (MathFunction::Fft, "FFT"),
                    (MathFunction::FftPhase, "FFTPhase"),
                    (MathFunction::LowPass, "LOWPass"),
                ],
            )?,
            probe_unit: table(tag, &[(ProbeUnit::Volt, "VOLT"), (ProbeUnit::Amp, "AMPere")])?,
            ..Capabilities::default()
        };
        Ok(Self {
            revision,
            capabilities,
        })
    }

    pub fn hardware_revision(&self) -> KeysightRevision {
        self.revision
    }
}

impl Dialect for KeysightDialect {
    fn revision(&self) -> &'static str {
        self.revision.tag()
    }

    fn divisions(&self) -> f64 {
        10.0
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

type Table<S> = fn(&Capabilities) -> Option<&Vocabulary<S>>;

fn channel_source(index: u8) -> DataSource {
    if index == 2 {
        DataSource::Ch2
    } else {
        DataSource::Ch1
    }
}

/// An open session to a DSOX1102A.
#[derive(Debug)]
pub struct KeysightScope {
    session: Connection<KeysightRevision>,
    dialect: KeysightDialect,
}

impl KeysightScope {
    pub const CHANNELS: [u8; 2] = [1, 2];

    pub fn open(connector: &ScopeConnector, hint: Option<&str>) -> Result<Self, ScopeError> {
        let session = connector.resolve::<Keysight>(hint)?;
        Self::from_connection(session)
    }

    pub fn from_connection(session: Connection<KeysightRevision>) -> Result<Self, ScopeError> {
        let dialect = KeysightDialect::new(session.revision)?;
        let mut scope = Self { session, dialect };
        scope.configure_transfer()?;
        Ok(scope)
    }

    fn configure_transfer(&mut self) -> Result<(), ScopeError> {
        log::debug!("Configuring waveform transfer");
        self.write(":WAVeform:FORMat BYTE")?;
        self.write(":WAVeform:UNSigned 1")
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
        Ok(self.dialect.semantic(table, &answer)?)
    }

    /// Definite-length block payload of a binary query.
    fn query_block(&mut self, command: &str) -> Result<Vec<u8>, ScopeError> {
        let response = self.session.terminal.query_binary(command)?;
        Ok(BinaryBlock::parse(&response)?.payload.to_vec())
    }

    pub fn resource(&self) -> &str {
        &self.session.resource
    }

    pub fn revision(&self) -> KeysightRevision {
        self.session.revision
    }

    pub fn dialect(&self) -> &KeysightDialect {
        &self.dialect
    }

    pub fn channel(&mut self, index: u8) -> Result<KeysightChannel<'_>, ScopeError> {
        let index = check_channel(index)?;
        Ok(KeysightChannel { scope: self, index })
    }

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

    /// Factory defaults, but with 1:1 probes on both channels.
    pub fn reset(&mut self) -> Result<(), ScopeError> {
        self.write("*RST")?;
        for index in Self::CHANNELS {
            self.channel(index)?.set_attenuation(1.0)?;
        }
        self.configure_transfer()
    }

    pub fn run(&mut self) -> Result<(), ScopeError> {
        self.write(":RUN")
    }

    pub fn single(&mut self) -> Result<(), ScopeError> {
        self.write(":SINGle")
    }

    pub fn stop(&mut self) -> Result<(), ScopeError> {
        self.write(":STOP")
    }

    /// Force a trigger event.
    pub fn trigger(&mut self) -> Result<(), ScopeError> {
        self.write("*TRG")
    }

    /// Raw ADC codes of the selected waveform source.
    pub fn signal_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        self.query_block(":WAVeform:DATA?")
    }

    /// Fetch the record of `source` (or the selected source) in physical
    /// units. The preamble is read first; its point count must match the
    /// sample block that follows.
    #[tracing::instrument(level = "debug", skip(self), fields(revision = self.dialect.revision()))]
    pub fn fetch_waveform(&mut self, source: Option<DataSource>) -> Result<Waveform, ScopeError> {
        if let Some(source) = source {
            self.set_waveform_source(source)?;
        }

        let text = self.query(":WAVeform:PREamble?")?;
        let preamble = Preamble::parse_keysight(&text, SampleEncoding::Unsigned)?;
        let payload = self.signal_raw()?;
        let codes = preamble.decode_codes(&payload)?;

        if let Some(points) = preamble.points {
            if points != codes.len() {
                return Err(WaveformError::PayloadLengthMismatch {
                    declared: points,
                    actual: codes.len(),
                }
                .into());
            }
        }
        log::debug!("Decoded {} samples", codes.len());
        Ok(preamble.scale(&codes))
    }

    pub fn fetch_frame(&mut self, source: Option<DataSource>) -> Result<DataFrame, ScopeError> {
        Ok(self.fetch_waveform(source)?.to_dataframe()?)
    }

    /// Calibrated samples only.
    pub fn signal(&mut self, source: Option<DataSource>) -> Result<Vec<f64>, ScopeError> {
        Ok(self.fetch_waveform(source)?.y)
    }

    /// Time of each sample of `source`, on the same axis `fetch_waveform`
    /// produces.
    pub fn time_vector(&mut self, source: Option<DataSource>) -> Result<Vec<f64>, ScopeError> {
        if let Some(source) = source {
            self.set_waveform_source(source)?;
        }
        let text = self.query(":WAVeform:PREamble?")?;
        let preamble = Preamble::parse_keysight(&text, SampleEncoding::Unsigned)?;
        let points = match preamble.points {
            Some(points) => points,
            None => self.waveform_points()? as usize,
        };
        Ok(preamble.time_axis(points))
    }

    /// Full-scale horizontal time in seconds.
    pub fn x_range(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":TIMebase:RANGe?")
    }

    pub fn set_x_range(&mut self, seconds: f64) -> Result<(), ScopeError> {
        self.write(&format!(":TIMebase:RANGe {seconds}"))
    }

    pub fn x_offset(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":WAVeform:XORigin?")
    }

    pub fn x_increment(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":WAVeform:XINCrement?")
    }

    /// ADC code of the vertical center.
    pub fn y_adc_zero(&mut self) -> Result<u32, ScopeError> {
        self.query_u32(":WAVeform:YREFerence?")
    }

    pub fn y_offset(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":WAVeform:YORigin?")
    }

    pub fn y_increment(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":WAVeform:YINCrement?")
    }

    pub fn waveform_source(&mut self) -> Result<DataSource, ScopeError> {
        self.query_setting(":WAVeform:SOURce", |c| c.data_source.as_ref())
    }

    pub fn set_waveform_source(&mut self, source: DataSource) -> Result<(), ScopeError> {
        self.write_setting(":WAVeform:SOURce", |c| c.data_source.as_ref(), source)
    }

    pub fn waveform_points_mode(&mut self) -> Result<PointsMode, ScopeError> {
        self.query_setting(":WAVeform:POINts:MODE", |c| c.points_mode.as_ref())
    }

    pub fn set_waveform_points_mode(&mut self, mode: PointsMode) -> Result<(), ScopeError> {
        self.write_setting(":WAVeform:POINts:MODE", |c| c.points_mode.as_ref(), mode)
    }

    pub fn waveform_points(&mut self) -> Result<u32, ScopeError> {
        self.query_u32(":WAVeform:POINts?")
    }

    /// Requests above [`waveform_count_max`](Self::waveform_count_max) are
    /// clamped. The raw record is only available while stopped, so the scope
    /// is stopped first in RAW and MAXimum mode.
    pub fn set_waveform_points(&mut self, points: u32) -> Result<(), ScopeError> {
        let mode = self.waveform_points_mode()?;
        if matches!(mode, PointsMode::Raw | PointsMode::Maximum) {
            self.stop()?;
        }
        let max = self.count_max_for(mode)?;
        if points > max {
            log::debug!("Clamping {} waveform points to {}", points, max);
        }
        self.write(&format!(":WAVeform:POINts {}", points.min(max)))
    }

    fn count_max_for(&mut self, mode: PointsMode) -> Result<u32, ScopeError> {
        match mode {
            PointsMode::Normal => Ok(MEASUREMENT_RECORD_POINTS),
            _ => self.query_u32(":ACQuire:POINts?"),
        }
    }

    /// Most points transferable in the current points mode.
    pub fn waveform_count_max(&mut self) -> Result<u32, ScopeError> {
        let mode = self.waveform_points_mode()?;
        self.count_max_for(mode)
    }

    pub fn timebase_scale(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":TIMebase:SCALe?")
    }

    pub fn set_timebase_scale(&mut self, seconds_per_division: f64) -> Result<(), ScopeError> {
        self.write(&format!(":TIMebase:SCALe {seconds_per_division}"))
    }

    pub fn acquire_sample_rate(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":ACQuire:SRATe?")
    }

    pub fn acquisition_mode(&mut self) -> Result<AcquisitionMode, ScopeError> {
        self.query_setting(":ACQuire:TYPE", |c| c.acquisition_mode.as_ref())
    }

    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), ScopeError> {
        self.write_setting(":ACQuire:TYPE", |c| c.acquisition_mode.as_ref(), mode)
    }

    pub fn trig_mode(&mut self) -> Result<TriggerType, ScopeError> {
        self.query_setting(":TRIGger:MODE", |c| c.trigger_type.as_ref())
    }

    pub fn set_trig_mode(&mut self, mode: TriggerType) -> Result<(), ScopeError> {
        self.write_setting(":TRIGger:MODE", |c| c.trigger_type.as_ref(), mode)
    }

    /// Window levels only apply in transition mode. The mode query may also
    /// answer `NONE`, which takes a single level like every other mode.
    fn level_encoding(&mut self) -> Result<LevelEncoding, ScopeError> {
        let answer = self.query(":TRIGger:MODE?")?;
        let mode = self.dialect.semantic(|c| c.trigger_type.as_ref(), &answer);
        Ok(if matches!(mode, Ok(TriggerType::Transition)) {
            LevelEncoding::Window
        } else {
            LevelEncoding::Single
        })
    }

    pub fn trig_sweep(&mut self) -> Result<TriggerSweep, ScopeError> {
        self.query_setting(":TRIGger:SWEep", |c| c.trigger_sweep.as_ref())
    }

    pub fn set_trig_sweep(&mut self, sweep: TriggerSweep) -> Result<(), ScopeError> {
        self.write_setting(":TRIGger:SWEep", |c| c.trigger_sweep.as_ref(), sweep)
    }

    /// Not valid in TV mode.
    pub fn trig_slope(&mut self) -> Result<TriggerSlope, ScopeError> {
        self.query_setting(":TRIGger:SLOPe", |c| c.trigger_slope.as_ref())
    }

    pub fn set_trig_slope(&mut self, slope: TriggerSlope) -> Result<(), ScopeError> {
        self.write_setting(":TRIGger:SLOPe", |c| c.trigger_slope.as_ref(), slope)
    }

    pub fn trig_source(&mut self) -> Result<TriggerSource, ScopeError> {
        self.query_setting(":TRIGger:SOURce", |c| c.trigger_source.as_ref())
    }

    pub fn set_trig_source(&mut self, source: TriggerSource) -> Result<(), ScopeError> {
        self.write_setting(":TRIGger:SOURce", |c| c.trigger_source.as_ref(), source)
    }

    pub fn fft_ordinate_unit(&mut self) -> Result<FftUnit, ScopeError> {
        self.query_setting(":FFT:VTYPe", |c| c.fft_unit.as_ref())
    }

    pub fn set_fft_ordinate_unit(&mut self, unit: FftUnit) -> Result<(), ScopeError> {
        self.write_setting(":FFT:VTYPe", |c| c.fft_unit.as_ref(), unit)
    }

    pub fn fft_window(&mut self) -> Result<FftWindow, ScopeError> {
        self.query_setting(":FFT:WINDow", |c| c.fft_window.as_ref())
    }

    pub fn set_fft_window(&mut self, window: FftWindow) -> Result<(), ScopeError> {
        self.write_setting(":FFT:WINDow", |c| c.fft_window.as_ref(), window)
    }

    pub fn fft_center_freq(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FFT:CENTer?")
    }

    pub fn set_fft_center_freq(&mut self, hertz: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FFT:CENTer {hertz}"))
    }

    pub fn fft_span_freq(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FFT:SPAN?")
    }

    pub fn set_fft_span_freq(&mut self, hertz: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FFT:SPAN {hertz}"))
    }

    /// Reference level of the FFT trace, in its ordinate unit.
    pub fn fft_offset(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FFT:OFFSet?")
    }

    pub fn set_fft_offset(&mut self, offset: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FFT:OFFSet {offset}"))
    }

    pub fn fft_scale(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FFT:SCALe?")
    }

    pub fn set_fft_scale(&mut self, scale: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FFT:SCALe {scale}"))
    }

    pub fn fft_range(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FFT:RANGe?")
    }

    pub fn set_fft_range(&mut self, range: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FFT:RANGe {range}"))
    }

    pub fn fft_source(&mut self) -> Result<DataSource, ScopeError> {
        self.query_setting(":FFT:SOURce1", |c| c.data_source.as_ref())
    }

    pub fn set_fft_source(&mut self, channel: u8) -> Result<(), ScopeError> {
        let channel = check_channel(channel)?;
        self.write_setting(
            ":FFT:SOURce1",
            |c| c.data_source.as_ref(),
            channel_source(channel),
        )
    }

    pub fn math_function(&mut self) -> Result<MathFunction, ScopeError> {
        self.query_setting(":FUNCtion:OPERation", |c| c.math_function.as_ref())
    }

    pub fn set_math_function(&mut self, function: MathFunction) -> Result<(), ScopeError> {
        self.write_setting(":FUNCtion:OPERation", |c| c.math_function.as_ref(), function)
    }

    pub fn math_lowpass_freq(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FUNCtion:FREQuency:LOWPass?")
    }

    pub fn set_math_lowpass_freq(&mut self, hertz: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FUNCtion:FREQuency:LOWPass {hertz}"))
    }

    /// Degrees and radians only apply to the FFT phase function.
    pub fn math_fft_ordinate_unit(&mut self) -> Result<FftUnit, ScopeError> {
        self.query_setting(":FUNCtion:FFT:VTYPe", |c| c.math_fft_unit.as_ref())
    }

    pub fn set_math_fft_ordinate_unit(&mut self, unit: FftUnit) -> Result<(), ScopeError> {
        self.write_setting(":FUNCtion:FFT:VTYPe", |c| c.math_fft_unit.as_ref(), unit)
    }

    pub fn math_fft_window(&mut self) -> Result<FftWindow, ScopeError> {
        self.query_setting(":FUNCtion:FFT:WINDow", |c| c.fft_window.as_ref())
    }

    pub fn set_math_fft_window(&mut self, window: FftWindow) -> Result<(), ScopeError> {
        self.write_setting(":FUNCtion:FFT:WINDow", |c| c.fft_window.as_ref(), window)
    }

    pub fn math_fft_center_freq(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FUNCtion:FFT:CENTer?")
    }

    pub fn set_math_fft_center_freq(&mut self, hertz: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FUNCtion:FFT:CENTer {hertz}"))
    }

    pub fn math_fft_span_freq(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FUNCtion:FFT:SPAN?")
    }

    pub fn set_math_fft_span_freq(&mut self, hertz: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FUNCtion:FFT:SPAN {hertz}"))
    }

    /// Value at the vertical center, in the unit of the current function.
    pub fn math_function_offset(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FUNCtion:OFFSet?")
    }

    pub fn set_math_function_offset(&mut self, offset: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FUNCtion:OFFSet {offset}"))
    }

    pub fn math_function_scale(&mut self) -> Result<f64, ScopeError> {
        self.query_f64(":FUNCtion:SCALe?")
    }

    pub fn set_math_function_scale(&mut self, scale: f64) -> Result<(), ScopeError> {
        self.write(&format!(":FUNCtion:SCALe {scale}"))
    }

    fn check_operand(operand: u8) -> Result<u8, ScopeError> {
        if operand == 1 || operand == 2 {
            Ok(operand)
        } else {
            Err(ScopeError::InvalidArgument(format!(
                "math operand must be 1 or 2, got {operand}"
            )))
        }
    }

    /// Input `operand` (1 or 2) of the math function.
    pub fn math_function_source(&mut self, operand: u8) -> Result<DataSource, ScopeError> {
        let operand = Self::check_operand(operand)?;
        self.query_setting(&format!(":FUNCtion:SOURce{operand}"), |c| {
            c.data_source.as_ref()
        })
    }

    pub fn set_math_function_source(&mut self, operand: u8, channel: u8) -> Result<(), ScopeError> {
        let operand = Self::check_operand(operand)?;
        let channel = check_channel(channel)?;
        self.write_setting(
            &format!(":FUNCtion:SOURce{operand}"),
            |c| c.data_source.as_ref(),
            channel_source(channel),
        )
    }

    /// Inverted screenshot colors.
    pub fn white_image_bg(&mut self) -> Result<bool, ScopeError> {
        self.query_bool(":HARDcopy:INKSaver?")
    }

    pub fn set_white_image_bg(&mut self, enabled: bool) -> Result<(), ScopeError> {
        self.write(&format!(":HARDcopy:INKSaver {}", u8::from(enabled)))
    }

    /// The screen as PNG file contents.
    pub fn screenshot(&mut self) -> Result<Vec<u8>, ScopeError> {
        let image = self.query_block(":DISPlay:DATA? PNG, COLor")?;
        log::debug!("Screenshot of {} bytes", image.len());
        Ok(image)
    }

    fn check_slot(slot: u8) -> Result<u8, ScopeError> {
        if slot < SETUP_SLOTS {
            Ok(slot)
        } else {
            Err(ScopeError::InvalidArgument(format!(
                "setup slot must be 0 to {}, got {slot}",
                SETUP_SLOTS - 1
            )))
        }
    }

    pub fn save_setup(&mut self, slot: u8) -> Result<(), ScopeError> {
        let slot = Self::check_slot(slot)?;
        self.write(&format!(":SAVE:SETup {slot}"))
    }

    pub fn recall_setup(&mut self, slot: u8) -> Result<(), ScopeError> {
        let slot = Self::check_slot(slot)?;
        self.write(&format!(":RECall:SETup {slot}"))
    }

    fn frequency_vector(&mut self, center: f64, span: f64) -> Result<Vec<f64>, ScopeError> {
        let points = self.waveform_points()?;
        Ok(linspace(
            center - span / 2.0,
            center + span / 2.0,
            points as usize,
        ))
    }
}

/// One analog input of a [`KeysightScope`].
#[derive(Debug)]
pub struct KeysightChannel<'a> {
    scope: &'a mut KeysightScope,
    index: u8,
}

impl KeysightChannel<'_> {
    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn fetch_waveform(&mut self) -> Result<Waveform, ScopeError> {
        self.scope.fetch_waveform(Some(channel_source(self.index)))
    }

    pub fn fetch_frame(&mut self) -> Result<DataFrame, ScopeError> {
        Ok(self.fetch_waveform()?.to_dataframe()?)
    }

    pub fn time_vector(&mut self) -> Result<Vec<f64>, ScopeError> {
        self.scope.time_vector(Some(channel_source(self.index)))
    }

    /// The instrument's FFT of this channel. It has no DC bin.
    pub fn fft(&mut self) -> Result<Waveform, ScopeError> {
        self.scope.set_fft_source(self.index)?;
        self.scope.fetch_waveform(Some(DataSource::Fft))
    }

    pub fn frequency_vector(&mut self) -> Result<Vec<f64>, ScopeError> {
        let center = self.scope.fft_center_freq()?;
        let span = self.scope.fft_span_freq()?;
        self.scope.frequency_vector(center, span)
    }

    /// FFT through the math function, which is switched to FFT for this.
    pub fn math_fft(&mut self) -> Result<Waveform, ScopeError> {
        self.scope.set_math_function(MathFunction::Fft)?;
        self.scope.fetch_waveform(Some(DataSource::Function))
    }

    pub fn math_frequency_vector(&mut self) -> Result<Vec<f64>, ScopeError> {
        let center = self.scope.math_fft_center_freq()?;
        let span = self.scope.math_fft_span_freq()?;
        self.scope.frequency_vector(center, span)
    }

    /// `[low, high]` in transition mode, a single level otherwise.
    pub fn trig_lvl(&mut self) -> Result<TriggerLevel, ScopeError> {
        let n = self.index;
        match self.scope.level_encoding()? {
            LevelEncoding::Single => Ok(TriggerLevel::Single(
                self.scope
                    .query_f64(&format!(":TRIGger:LEVel? CHANnel{n}"))?,
            )),
            LevelEncoding::Window => {
                let low = self
                    .scope
                    .query_f64(&format!(":TRIGger:LEVel:LOW? CHANnel{n}"))?;
                let high = self
                    .scope
                    .query_f64(&format!(":TRIGger:LEVel:HIGH? CHANnel{n}"))?;
                Ok(TriggerLevel::Window { low, high })
            }
        }
    }

    pub fn set_trig_lvl(&mut self, levels: &[f64]) -> Result<(), ScopeError> {
        let n = self.index;
        let encoding = self.scope.level_encoding()?;
        match TriggerLevel::encode(levels, encoding)? {
            TriggerLevel::Single(level) => self
                .scope
                .write(&format!(":TRIGger:LEVel {level}, CHANnel{n}")),
            TriggerLevel::Window { low, high } => {
                self.scope
                    .write(&format!(":TRIGger:LEVel:LOW {low}, CHANnel{n}"))?;
                self.scope
                    .write(&format!(":TRIGger:LEVel:HIGH {high}, CHANnel{n}"))
            }
        }
    }

    /// Full-scale vertical range in volts.
    pub fn y_range(&mut self) -> Result<f64, ScopeError> {
        self.scope
            .query_f64(&format!(":CHANnel{}:RANGe?", self.index))
    }

    pub fn set_y_range(&mut self, volts: f64) -> Result<(), ScopeError> {
        self.scope
            .write(&format!(":CHANnel{}:RANGe {volts}V", self.index))
    }

    /// Volts per vertical division.
    pub fn y_range_per_interval(&mut self) -> Result<f64, ScopeError> {
        Ok(self.y_range()? / VERTICAL_DIVISIONS)
    }

    pub fn set_y_range_per_interval(&mut self, volts: f64) -> Result<(), ScopeError> {
        self.set_y_range(volts * VERTICAL_DIVISIONS)
    }

    pub fn attenuation(&mut self) -> Result<f64, ScopeError> {
        self.scope
            .query_f64(&format!(":CHANnel{}:PROBe?", self.index))
    }

    pub fn set_attenuation(&mut self, attenuation: f64) -> Result<(), ScopeError> {
        if !(attenuation.is_finite() && attenuation > 0.0) {
            return Err(ScopeError::InvalidArgument(format!(
                "attenuation must be positive, got {attenuation}"
            )));
        }
        self.scope
            .write(&format!(":CHANnel{}:PROBe {attenuation}", self.index))
    }

    pub fn measured_unit(&mut self) -> Result<ProbeUnit, ScopeError> {
        let header = format!(":CHANnel{}:UNITs", self.index);
        self.scope
            .query_setting(&header, |c| c.probe_unit.as_ref())
    }

    pub fn set_measured_unit(&mut self, unit: ProbeUnit) -> Result<(), ScopeError> {
        let header = format!(":CHANnel{}:UNITs", self.index);
        self.scope
            .write_setting(&header, |c| c.probe_unit.as_ref(), unit)
    }

    pub fn coupling(&mut self) -> Result<Coupling, ScopeError> {
        let header = format!(":CHANnel{}:COUPling", self.index);
        self.scope.query_setting(&header, |c| c.coupling.as_ref())
    }

    pub fn set_coupling(&mut self, coupling: Coupling) -> Result<(), ScopeError> {
        let header = format!(":CHANnel{}:COUPling", self.index);
        self.scope
            .write_setting(&header, |c| c.coupling.as_ref(), coupling)
    }

    pub fn offset(&mut self) -> Result<f64, ScopeError> {
        self.scope
            .query_f64(&format!(":CHANnel{}:OFFSet?", self.index))
    }

    pub fn set_offset(&mut self, volts: f64) -> Result<(), ScopeError> {
        self.scope
            .write(&format!(":CHANnel{}:OFFSet {volts}", self.index))
    }

    pub fn display(&mut self) -> Result<bool, ScopeError> {
        self.scope
            .query_bool(&format!(":CHANnel{}:DISPlay?", self.index))
    }

    pub fn set_display(&mut self, on: bool) -> Result<(), ScopeError> {
        self.scope
            .write(&format!(":CHANnel{}:DISPlay {}", self.index, u8::from(on)))
    }
}
