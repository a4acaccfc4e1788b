//! Binary waveform transfer: block framing, preamble parsing and scaling.
//!
//! A curve arrives as an IEEE 488.2 definite-length block,
//! `#<n><n-digit length><payload><terminator>`, optionally preceded by the
//! preamble text that describes how to turn its codes into physical units.

use polars::prelude::*;

pub const TIME_COLUMN_NAME: &str = "time";
pub const VALUE_COLUMN_NAME: &str = "value";

const FRAME_MARKER: u8 = b'#';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveformError {
    #[error("Response has no '#' block marker")]
    MissingFrameMarker,

    #[error("Malformed binary block: {0}")]
    MalformedFrame(String),

    #[error("Preamble is missing {key}")]
    MalformedPreamble { key: &'static str },

    #[error("Preamble field {key} has unparsable value '{value}'")]
    InvalidPreambleValue { key: &'static str, value: String },

    #[error("Block declares {declared} samples but carries {actual}")]
    PayloadLengthMismatch { declared: usize, actual: usize },

    #[error("Unsupported sample width of {0} bytes")]
    UnsupportedSampleWidth(u8),
}

/// A definite-length block located inside a raw response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryBlock<'a> {
    /// Everything before the `#` marker.
    pub header: &'a [u8],
    pub payload: &'a [u8],
    pub declared_len: usize,
}

impl<'a> BinaryBlock<'a> {
    /// The single byte after the payload is the message terminator and is
    /// discarded. A payload whose size differs from the declared length is
    /// rejected.
    pub fn parse(data: &'a [u8]) -> Result<Self, WaveformError> {
        let marker = data
            .iter()
            .position(|&b| b == FRAME_MARKER)
            .ok_or(WaveformError::MissingFrameMarker)?;

        let digits = data
            .get(marker + 1)
            .filter(|b| (b'1'..=b'9').contains(*b))
            .map(|b| usize::from(b - b'0'))
            .ok_or_else(|| {
                WaveformError::MalformedFrame("missing or invalid length digit count".to_string())
            })?;

        let length_start = marker + 2;
        let payload_start = length_start + digits;
        let length_field = data.get(length_start..payload_start).ok_or_else(|| {
            WaveformError::MalformedFrame("truncated length field".to_string())
        })?;
        let declared_len: usize = std::str::from_utf8(length_field)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                WaveformError::MalformedFrame(format!(
                    "length field '{}' is not a decimal number",
                    String::from_utf8_lossy(length_field)
                ))
            })?;

        let payload_end = data.len().saturating_sub(1).max(payload_start);
        let payload = &data[payload_start..payload_end];
        if payload.len() != declared_len {
            return Err(WaveformError::PayloadLengthMismatch {
                declared: declared_len,
                actual: payload.len(),
            });
        }

        Ok(Self {
            header: &data[..marker],
            payload,
            declared_len,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Signed,
    Unsigned,
}

/// Scale and offset constants of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preamble {
    pub x_increment: f64,
    /// Time of the first sample.
    pub x_zero: f64,
    pub y_multiplier: f64,
    pub y_zero: f64,
    /// ADC code corresponding to `y_zero`.
    pub y_offset: f64,
    pub points: Option<usize>,
    pub byte_width: u8,
    pub encoding: SampleEncoding,
}

fn tektronix_field<'a>(tokens: &[&'a str], key: &'static str) -> Option<&'a str> {
    tokens.iter().find_map(|token| {
        let (name, value) = token.trim().split_once(char::is_whitespace)?;
        name.to_ascii_uppercase()
            .contains(key)
            .then(|| value.trim())
    })
}

fn number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, WaveformError> {
    value
        .trim()
        .parse()
        .map_err(|_| WaveformError::InvalidPreambleValue {
            key,
            value: value.to_string(),
        })
}

impl Preamble {
    /// Parse a semicolon-separated `KEY value` preamble. Keys are matched by
    /// substring so both `XINCR 4.0E-6` and `:WFMOUTPRE:XINCR 4.0E-6` work.
    pub fn parse_tektronix(text: &str) -> Result<Self, WaveformError> {
        let tokens: Vec<&str> = text.split(';').collect();
        let required = |key: &'static str| -> Result<f64, WaveformError> {
            let value =
                tektronix_field(&tokens, key).ok_or(WaveformError::MalformedPreamble { key })?;
            number(key, value)
        };

        let x_increment = required("XINCR")?;
        let x_zero = required("XZERO")?;
        let y_multiplier = required("YMULT")?;
        let y_zero = required("YZERO")?;
        let y_offset = required("YOFF")?;

        let points = tektronix_field(&tokens, "NR_PT")
            .map(|v| number("NR_PT", v))
            .transpose()?;
        let byte_width = tektronix_field(&tokens, "BYT_NR")
            .map(|v| number("BYT_NR", v))
            .transpose()?
            .unwrap_or(1);
        let encoding = match tektronix_field(&tokens, "BN_FMT") {
            Some(fmt) if fmt.eq_ignore_ascii_case("RP") => SampleEncoding::Unsigned,
            _ => SampleEncoding::Signed,
        };

        Ok(Self {
            x_increment,
            x_zero,
            y_multiplier,
            y_zero,
            y_offset,
            points,
            byte_width,
            encoding,
        })
    }

    /// Parse the ten comma-separated fields of a `:WAVeform:PREamble?`
    /// answer: format, type, points, count, x increment, x origin,
    /// x reference, y increment, y origin, y reference.
    pub fn parse_keysight(text: &str, encoding: SampleEncoding) -> Result<Self, WaveformError> {
        const KEYS: [&str; 10] = [
            "FORMAT",
            "TYPE",
            "POINTS",
            "COUNT",
            "XINCREMENT",
            "XORIGIN",
            "XREFERENCE",
            "YINCREMENT",
            "YORIGIN",
            "YREFERENCE",
        ];
        let fields: Vec<&str> = text.trim().split(',').map(str::trim).collect();
        let field = |i: usize| -> Result<&str, WaveformError> {
            fields
                .get(i)
                .copied()
                .filter(|f| !f.is_empty())
                .ok_or(WaveformError::MalformedPreamble { key: KEYS[i] })
        };

        let format: u8 = number(KEYS[0], field(0)?)?;
        let byte_width = match format {
            0 => 1,
            1 => 2,
            other => {
                return Err(WaveformError::MalformedFrame(format!(
                    "waveform format {other} is not a binary format"
                )))
            }
        };
        let points: f64 = number(KEYS[2], field(2)?)?;
        let x_increment: f64 = number(KEYS[4], field(4)?)?;
        let x_origin: f64 = number(KEYS[5], field(5)?)?;
        let x_reference: f64 = number(KEYS[6], field(6)?)?;
        let y_increment: f64 = number(KEYS[7], field(7)?)?;
        let y_origin: f64 = number(KEYS[8], field(8)?)?;
        let y_reference: f64 = number(KEYS[9], field(9)?)?;

        Ok(Self {
            x_increment,
            x_zero: x_reference.mul_add(-x_increment, x_origin),
            y_multiplier: y_increment,
            y_zero: y_origin,
            y_offset: y_reference,
            points: Some(points.round() as usize),
            byte_width,
            encoding,
        })
    }

    /// Reinterpret the payload as quantised sample codes. Multi-byte samples
    /// are big-endian.
    pub fn decode_codes(&self, payload: &[u8]) -> Result<Vec<i32>, WaveformError> {
        match (self.byte_width, self.encoding) {
            (1, SampleEncoding::Signed) => {
                Ok(payload.iter().map(|&b| i32::from(b as i8)).collect())
            }
            (1, SampleEncoding::Unsigned) => Ok(payload.iter().map(|&b| i32::from(b)).collect()),
            (2, encoding) => {
                if payload.len() % 2 != 0 {
                    return Err(WaveformError::MalformedFrame(format!(
                        "{} payload bytes do not form 16-bit samples",
                        payload.len()
                    )));
                }
                Ok(payload
                    .chunks_exact(2)
                    .map(|pair| {
                        let bytes = [pair[0], pair[1]];
                        match encoding {
                            SampleEncoding::Signed => i32::from(i16::from_be_bytes(bytes)),
                            SampleEncoding::Unsigned => i32::from(u16::from_be_bytes(bytes)),
                        }
                    })
                    .collect())
            }
            (width, _) => Err(WaveformError::UnsupportedSampleWidth(width)),
        }
    }

    /// `(code - y_offset) * y_multiplier + y_zero`
    pub fn code_to_value(&self, code: f64) -> f64 {
        (code - self.y_offset).mul_add(self.y_multiplier, self.y_zero)
    }

    /// `x_zero + i * x_increment` for each of `count` samples.
    pub fn time_axis(&self, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| (i as f64).mul_add(self.x_increment, self.x_zero))
            .collect()
    }

    pub fn scale(&self, codes: &[i32]) -> Waveform {
        Waveform {
            x: self.time_axis(codes.len()),
            y: codes
                .iter()
                .map(|&c| self.code_to_value(f64::from(c)))
                .collect(),
        }
    }
}

/// Decode a combined preamble + curve response into physical units.
pub fn decode_combined(response: &[u8]) -> Result<Waveform, WaveformError> {
    let block = BinaryBlock::parse(response)?;
    let preamble = Preamble::parse_tektronix(&String::from_utf8_lossy(block.header))?;
    let codes = preamble.decode_codes(block.payload)?;
    log::debug!(
        "Decoded {} samples (x_incr={}, y_mult={})",
        codes.len(),
        preamble.x_increment,
        preamble.y_multiplier
    );
    Ok(preamble.scale(&codes))
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| (i as f64).mul_add(step, start)).collect()
        }
    }
}

/// Calibrated samples with their time (or frequency) axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.x, self.y)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new(TIME_COLUMN_NAME.into(), self.x.as_slice()),
            Column::new(VALUE_COLUMN_NAME.into(), self.y.as_slice()),
        ])
    }

    pub fn lazy(&self) -> PolarsResult<LazyFrame> {
        Ok(self.to_dataframe()?.lazy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(len_field: &str, payload: &[u8]) -> Vec<u8> {
        let mut data = len_field.as_bytes().to_vec();
        data.extend_from_slice(payload);
        data.push(b'\n');
        data
    }

    #[test]
    fn test_block_of_500_fives() {
        let data = frame("#3500", &[5; 500]);
        let block = BinaryBlock::parse(&data).unwrap();
        assert_eq!(block.declared_len, 500);
        assert!(block.header.is_empty());

        let preamble = Preamble {
            x_increment: 1.0,
            x_zero: 0.0,
            y_multiplier: 1.0,
            y_zero: 0.0,
            y_offset: 0.0,
            points: None,
            byte_width: 1,
            encoding: SampleEncoding::Signed,
        };
        let codes = preamble.decode_codes(block.payload).unwrap();
        assert_eq!(codes.len(), 500);
        assert!(codes.iter().all(|&c| c == 5));
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let data = frame("#3500", &[5; 499]);
        assert_eq!(
            BinaryBlock::parse(&data).unwrap_err(),
            WaveformError::PayloadLengthMismatch {
                declared: 500,
                actual: 499
            }
        );
    }

    #[test]
    fn test_long_payload_is_rejected() {
        let data = frame("#210", &[1; 12]);
        assert!(matches!(
            BinaryBlock::parse(&data),
            Err(WaveformError::PayloadLengthMismatch {
                declared: 10,
                actual: 12
            })
        ));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(
            BinaryBlock::parse(b"no marker here").unwrap_err(),
            WaveformError::MissingFrameMarker
        );
        assert!(matches!(
            BinaryBlock::parse(b"#0abc\n"),
            Err(WaveformError::MalformedFrame(_))
        ));
        assert!(matches!(
            BinaryBlock::parse(b"#4"),
            Err(WaveformError::MalformedFrame(_))
        ));
        assert!(matches!(
            BinaryBlock::parse(b"#2x1ab\n"),
            Err(WaveformError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_signed_reinterpretation() {
        let preamble = Preamble::parse_tektronix("XINCR 1;XZERO 0;YMULT 1;YZERO 0;YOFF 0").unwrap();
        let codes = preamble.decode_codes(&[0x00, 0x7f, 0x80, 0xff]).unwrap();
        assert_eq!(codes, vec![0, 127, -128, -1]);
    }

    #[test]
    fn test_scaling_is_affine() {
        let preamble = Preamble::parse_tektronix(
            ":WFMOUTPRE:BYT_NR 1;BN_FMT RI;NR_PT 4;XINCR 2.0E-3;XZERO -1.0E-2;YMULT 4.0E-2;YZERO 5.0E-1;YOFF 1.0E1",
        )
        .unwrap();
        assert_eq!(preamble.points, Some(4));
        for raw in [-128_i32, -10, 0, 10, 127] {
            let expected = (f64::from(raw) - 10.0) * 0.04 + 0.5;
            assert!((preamble.code_to_value(f64::from(raw)) - expected).abs() < 1e-12);
        }
        let waveform = preamble.scale(&[10, 11, 12]);
        assert_eq!(waveform.len(), 3);
        assert!((waveform.x[0] + 1.0e-2).abs() < 1e-15);
        assert!((waveform.x[2] - (-1.0e-2 + 2.0 * 2.0e-3)).abs() < 1e-15);
        assert!((waveform.y[0] - 0.5).abs() < 1e-12);
        assert!(waveform.y[2] > waveform.y[1]);
    }

    #[test]
    fn test_missing_preamble_key() {
        let err = Preamble::parse_tektronix("XINCR 1;XZERO 0;YMULT 1;YOFF 0").unwrap_err();
        assert_eq!(err, WaveformError::MalformedPreamble { key: "YZERO" });
    }

    #[test]
    fn test_bad_preamble_value() {
        let err = Preamble::parse_tektronix("XINCR fast;XZERO 0;YMULT 1;YZERO 0;YOFF 0").unwrap_err();
        assert!(matches!(err, WaveformError::InvalidPreambleValue { key: "XINCR", .. }));
    }

    #[test]
    fn test_decode_combined_response() {
        let mut data =
            b":WFMOUTPRE:BYT_NR 1;BIT_NR 8;ENCDG BIN;BN_FMT RI;BYT_OR MSB;WFID \"Ch1, DC coupling\";NR_PT 3;PT_FMT Y;XUNIT \"s\";XINCR 1.0E-6;XZERO 0.0E0;PT_OFF 0;YUNIT \"V\";YMULT 2.0E-2;YOFF 0.0E0;YZERO 0.0E0;:CURVE #13"
                .to_vec();
        data.extend_from_slice(&[0x01, 0xff, 0x32]);
        data.push(b'\n');

        let waveform = decode_combined(&data).unwrap();
        assert_eq!(waveform.len(), 3);
        assert!((waveform.y[0] - 0.02).abs() < 1e-12);
        assert!((waveform.y[1] + 0.02).abs() < 1e-12);
        assert!((waveform.y[2] - 1.0).abs() < 1e-12);
        assert!((waveform.x[1] - 1.0e-6).abs() < 1e-18);
    }

    #[test]
    fn test_keysight_preamble() {
        let preamble = Preamble::parse_keysight(
            "+0,+0,+1000,+1,+1.00000000E-06,-5.00000000E-04,+0,+4.00000000E-02,+0.0E+00,+128",
            SampleEncoding::Unsigned,
        )
        .unwrap();
        assert_eq!(preamble.points, Some(1000));
        assert_eq!(preamble.byte_width, 1);
        assert!((preamble.x_zero + 5.0e-4).abs() < 1e-15);
        let codes = preamble.decode_codes(&[128, 228]).unwrap();
        assert_eq!(codes, vec![128, 228]);
        let waveform = preamble.scale(&codes);
        assert!(waveform.y[0].abs() < 1e-12);
        assert!((waveform.y[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_keysight_preamble_missing_fields() {
        let err = Preamble::parse_keysight("+0,+0,+1000", SampleEncoding::Unsigned).unwrap_err();
        assert_eq!(err, WaveformError::MalformedPreamble { key: "XINCREMENT" });
    }

    #[test]
    fn test_word_samples() {
        let preamble = Preamble {
            x_increment: 1.0,
            x_zero: 0.0,
            y_multiplier: 1.0,
            y_zero: 0.0,
            y_offset: 0.0,
            points: None,
            byte_width: 2,
            encoding: SampleEncoding::Signed,
        };
        assert_eq!(
            preamble.decode_codes(&[0x01, 0x00, 0xff, 0xfe]).unwrap(),
            vec![256, -2]
        );
        assert!(preamble.decode_codes(&[0x01]).is_err());
    }

    #[test]
    fn test_linspace() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert!((v[2]).abs() < 1e-15);
        assert!((v[4] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_waveform_dataframe() {
        let waveform = Waveform {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.5, 0.25, 0.125],
        };
        let df = waveform.to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 2);
        let values: Vec<f64> = df
            .column(VALUE_COLUMN_NAME)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(values, waveform.y);
    }
}
