//! Semantic setting vocabularies and their per-revision protocol spellings.
//!
//! A [`Vocabulary`] is a bijection between the variants of one setting enum
//! and the literal tokens a particular hardware revision expects. Writes go
//! through [`Vocabulary::to_literal`]; responses are mapped back with
//! [`Vocabulary::to_semantic`], which accepts both the long form the literal
//! is written in (`RISe` → `RISE`) and its SCPI short form (`RIS`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("{setting} is not supported by {revision}")]
    Unsupported {
        setting: &'static str,
        revision: &'static str,
    },

    #[error("{setting} '{value}' is not supported by {revision}")]
    UnsupportedValue {
        setting: &'static str,
        value: String,
        revision: &'static str,
    },

    #[error("Unknown {setting} token '{token}' from {revision}")]
    UnknownToken {
        setting: &'static str,
        token: String,
        revision: &'static str,
    },

    #[error("Token '{token}' appears twice in the {setting} table of {revision}")]
    DuplicateToken {
        setting: &'static str,
        token: String,
        revision: &'static str,
    },
}

/// A setting category with a closed set of semantic values.
pub trait Setting: Copy + Eq + fmt::Debug + 'static {
    const CATEGORY: &'static str;
}

macro_rules! setting {
    ($(#[$meta:meta])* $name:ident, $category:literal { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Setting for $name {
            const CATEGORY: &'static str = $category;
        }
    };
}

setting!(HorizontalView, "horizontal view" { Main, Window, Zone });

setting!(AcquisitionMode, "acquisition mode" { Sample, PeakDetect, HiRes, Average });

setting!(
    /// Waveform transfer source.
    DataSource, "data source" {
        Ch1, Ch2, Math, Function, Fft, Ref1, Ref2, Memory1, Memory2,
    }
);

setting!(
    /// `Transition` is the Keysight rise/fall-time trigger, which uses a
    /// [low, high] threshold pair like the Tektronix runt class.
    TriggerType, "trigger type" {
        Edge, Pulse, Video, Pattern, SetupHold, Transition, SerialBus,
    }
);

setting!(TriggerSlope, "trigger slope" { Rising, Falling, Either, Alternate });

setting!(TriggerSource, "trigger source" { Ch1, Ch2, Line, Aux, External, Generator });

setting!(TriggerSweep, "trigger sweep" { Auto, Normal });

setting!(Coupling, "coupling" { Ac, Dc, Ground });

setting!(PulseClass, "pulse class" { Runt, Width });

setting!(FftWindow, "FFT window" { Rectangular, Hanning, Hamming, FlatTop, BlackmanHarris });

setting!(FftUnit, "FFT unit" { Decibel, Linear, Vrms, Radian, Degree });

setting!(PointsMode, "points mode" { Normal, Maximum, Raw });

setting!(MathFunction, "math function" {
    Add, Subtract, Multiply, Divide, Fft, FftPhase, LowPass,
});

setting!(ProbeUnit, "probe unit" { Volt, Amp });

/// The SCPI short form of a mnemonic: its uppercase letters plus any
/// characters that are not lowercase letters (`CHANnel1` → `CHAN1`).
pub(crate) fn short_form(literal: &str) -> String {
    literal
        .chars()
        .filter(|c| !c.is_ascii_lowercase())
        .collect()
}

fn same_token(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Bijective table for one setting category on one hardware revision.
#[derive(Debug, Clone)]
pub struct Vocabulary<S: Setting> {
    revision: &'static str,
    entries: Vec<(S, &'static str)>,
}

impl<S: Setting> Vocabulary<S> {
    /// Fails if a semantic value or a literal (long or short form) appears twice.
    pub fn new(
        revision: &'static str,
        entries: &[(S, &'static str)],
    ) -> Result<Self, CapabilityError> {
        for (i, (semantic, literal)) in entries.iter().enumerate() {
            for (other_semantic, other_literal) in &entries[..i] {
                let (short, other_short) = (short_form(literal), short_form(other_literal));
                let clash = same_token(literal, other_literal)
                    || same_token(&short, &other_short)
                    || same_token(literal, &other_short)
                    || same_token(&short, other_literal);
                if clash || semantic == other_semantic {
                    return Err(CapabilityError::DuplicateToken {
                        setting: S::CATEGORY,
                        token: if clash {
                            (*literal).to_string()
                        } else {
                            format!("{semantic:?}")
                        },
                        revision,
                    });
                }
            }
        }
        Ok(Self {
            revision,
            entries: entries.to_vec(),
        })
    }

    pub fn revision(&self) -> &'static str {
        self.revision
    }

    pub fn to_literal(&self, semantic: S) -> Result<&'static str, CapabilityError> {
        self.entries
            .iter()
            .find(|(s, _)| *s == semantic)
            .map(|(_, literal)| *literal)
            .ok_or_else(|| CapabilityError::UnsupportedValue {
                setting: S::CATEGORY,
                value: format!("{semantic:?}"),
                revision: self.revision,
            })
    }

    pub fn to_semantic(&self, token: &str) -> Result<S, CapabilityError> {
        let token = token.trim().trim_matches('"');
        self.entries
            .iter()
            .find(|(_, literal)| {
                same_token(literal, token) || same_token(&short_form(literal), token)
            })
            .map(|(semantic, _)| *semantic)
            .ok_or_else(|| CapabilityError::UnknownToken {
                setting: S::CATEGORY,
                token: token.to_string(),
                revision: self.revision,
            })
    }

    pub fn semantics(&self) -> impl Iterator<Item = S> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    pub fn literals(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, l)| *l)
    }

    pub fn supports(&self, semantic: S) -> bool {
        self.entries.iter().any(|(s, _)| *s == semantic)
    }
}

/// Look up a table a revision may not define.
pub fn require<'a, S: Setting>(
    table: Option<&'a Vocabulary<S>>,
    revision: &'static str,
) -> Result<&'a Vocabulary<S>, CapabilityError> {
    table.ok_or(CapabilityError::Unsupported {
        setting: S::CATEGORY,
        revision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slopes() -> Vocabulary<TriggerSlope> {
        Vocabulary::new(
            "TEST",
            &[(TriggerSlope::Rising, "RISe"), (TriggerSlope::Falling, "FALL")],
        )
        .unwrap()
    }

    #[test]
    fn test_literal_round_trip() {
        let table = slopes();
        for literal in table.literals() {
            let semantic = table.to_semantic(literal).unwrap();
            assert_eq!(table.to_literal(semantic).unwrap(), literal);
        }
        for semantic in table.semantics() {
            let literal = table.to_literal(semantic).unwrap();
            assert_eq!(table.to_semantic(literal).unwrap(), semantic);
        }
    }

    #[test]
    fn test_read_path_accepts_long_and_short_forms() {
        let table = slopes();
        assert_eq!(table.to_semantic("RISE").unwrap(), TriggerSlope::Rising);
        assert_eq!(table.to_semantic("RIS").unwrap(), TriggerSlope::Rising);
        assert_eq!(table.to_semantic("fall").unwrap(), TriggerSlope::Falling);
        assert!(matches!(
            table.to_semantic("EITHER"),
            Err(CapabilityError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_unsupported_value() {
        let table = slopes();
        assert!(matches!(
            table.to_literal(TriggerSlope::Alternate),
            Err(CapabilityError::UnsupportedValue { .. })
        ));
        assert!(!table.supports(TriggerSlope::Either));
    }

    #[test]
    fn test_duplicate_literal_is_rejected() {
        let result = Vocabulary::new(
            "TEST",
            &[(Coupling::Ac, "AC"), (Coupling::Dc, "ac")],
        );
        assert!(matches!(result, Err(CapabilityError::DuplicateToken { .. })));

        let result = Vocabulary::new(
            "TEST",
            &[(Coupling::Ac, "AC"), (Coupling::Ac, "DC")],
        );
        assert!(matches!(result, Err(CapabilityError::DuplicateToken { .. })));
    }

    #[test]
    fn test_short_form_clash_is_rejected() {
        let result = Vocabulary::new(
            "TEST",
            &[(FftWindow::Hanning, "HANning"), (FftWindow::Hamming, "HANnah")],
        );
        assert!(matches!(result, Err(CapabilityError::DuplicateToken { .. })));
    }

    #[test]
    fn test_long_form_clashing_with_short_form_is_rejected() {
        let result = Vocabulary::new(
            "TEST",
            &[(FftWindow::Hanning, "HANNing"), (FftWindow::Hamming, "HANNINGx")],
        );
        assert!(matches!(result, Err(CapabilityError::DuplicateToken { .. })));
    }

    #[test]
    fn test_missing_table() {
        let result = require::<AcquisitionMode>(None, "TBS1000B");
        assert_eq!(
            result.unwrap_err(),
            CapabilityError::Unsupported {
                setting: "acquisition mode",
                revision: "TBS1000B"
            }
        );
    }

    #[test]
    fn test_short_form() {
        assert_eq!(short_form("CHANnel1"), "CHAN1");
        assert_eq!(short_form("BLAckmanharris"), "BLA");
        assert_eq!(short_form("CH1"), "CH1");
    }
}
