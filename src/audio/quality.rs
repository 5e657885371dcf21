// Quality badges and the small number -> string helpers the now-playing views use.
// All pure functions, no state.

use std::fmt;

use super::{is_dsd_format, is_lossless_format};

const DSD64_MAX_RATE: u32 = 2_822_400;
const DSD128_MAX_RATE: u32 = 5_644_800;
const DSD256_MAX_RATE: u32 = 11_289_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityLabel {
    Dsd64,
    Dsd128,
    Dsd256,
    Dsd,
    HiRes192,
    HiRes96,
    HiRes24,
    HiRes,
    Lossless,
    /// Lossy or unknown - no badge
    None,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Dsd64 => "DSD64",
            QualityLabel::Dsd128 => "DSD128",
            QualityLabel::Dsd256 => "DSD256",
            QualityLabel::Dsd => "DSD",
            QualityLabel::HiRes192 => "Hi-Res 192",
            QualityLabel::HiRes96 => "Hi-Res 96",
            QualityLabel::HiRes24 => "Hi-Res 24",
            QualityLabel::HiRes => "Hi-Res",
            QualityLabel::Lossless => "Lossless",
            QualityLabel::None => "",
        }
    }

    pub fn is_dsd(&self) -> bool {
        matches!(
            self,
            QualityLabel::Dsd64 | QualityLabel::Dsd128 | QualityLabel::Dsd256 | QualityLabel::Dsd
        )
    }

    pub fn is_hi_res(&self) -> bool {
        matches!(
            self,
            QualityLabel::HiRes192 | QualityLabel::HiRes96 | QualityLabel::HiRes24 | QualityLabel::HiRes
        )
    }

    pub fn has_badge(&self) -> bool {
        *self != QualityLabel::None
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the badge for a file.
///
/// DSD is checked first so a DSD file can never come out as Hi-Res or Lossless.
/// PCM is Hi-Res when it is 24 bit or sampled above 48kHz, whatever the container.
pub fn get_quality_label(format: &str, sample_rate: u32, bit_depth: u16) -> QualityLabel {
    if is_dsd_format(format) {
        return if sample_rate <= DSD64_MAX_RATE {
            QualityLabel::Dsd64
        } else if sample_rate <= DSD128_MAX_RATE {
            QualityLabel::Dsd128
        } else if sample_rate <= DSD256_MAX_RATE {
            QualityLabel::Dsd256
        } else {
            QualityLabel::Dsd
        };
    }

    if bit_depth >= 24 || sample_rate > 48_000 {
        return if sample_rate >= 192_000 {
            QualityLabel::HiRes192
        } else if sample_rate >= 96_000 {
            QualityLabel::HiRes96
        } else if bit_depth >= 24 {
            QualityLabel::HiRes24
        } else {
            QualityLabel::HiRes
        };
    }

    if is_lossless_format(format) {
        QualityLabel::Lossless
    } else {
        QualityLabel::None
    }
}

/// Seconds -> "m:ss", or "h:mm:ss" once past the hour. Garbage in gives "0:00".
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// 44100 -> "44.1 kHz", 96000 -> "96 kHz", 2822400 -> "2.82 MHz" (MHz only shows up for DSD)
pub fn format_sample_rate(hz: u32) -> String {
    if hz >= 1_000_000 {
        format!("{:.2} MHz", hz as f64 / 1_000_000.0)
    } else if hz % 1000 == 0 {
        format!("{} kHz", hz / 1000)
    } else {
        format!("{:.1} kHz", hz as f64 / 1000.0)
    }
}

pub fn format_bit_depth(bits: u16) -> String {
    format!("{}-bit", bits)
}

/// Bitrate is carried in kbps. Lossless rates cross 1000 so those switch to Mbps.
pub fn format_bit_rate(kbps: u32) -> String {
    if kbps >= 1000 {
        format!("{:.1} Mbps", kbps as f64 / 1000.0)
    } else {
        format!("{} kbps", kbps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_labels() {
        assert_eq!(get_quality_label("flac", 44_100, 16).to_string(), "Lossless");
        assert_eq!(get_quality_label("flac", 96_000, 24).to_string(), "Hi-Res 96");
        assert_eq!(get_quality_label("dsf", 2_822_400, 1).to_string(), "DSD64");
    }

    #[test]
    fn test_dsd_tiers() {
        assert_eq!(get_quality_label("dff", 5_644_800, 1), QualityLabel::Dsd128);
        assert_eq!(get_quality_label("DSF", 11_289_600, 1), QualityLabel::Dsd256);
        assert_eq!(get_quality_label("dsd", 22_579_200, 1), QualityLabel::Dsd);
        // unknown rate still lands in the lowest tier
        assert_eq!(get_quality_label("dsf", 0, 0), QualityLabel::Dsd64);
    }

    #[test]
    fn test_dsd_never_hi_res_or_lossless() {
        for rate in [0, 44_100, 96_000, 192_000, 2_822_400, 5_644_800, 50_000_000] {
            for depth in [1, 16, 24, 32] {
                for format in ["dsf", "dff", ".DSD"] {
                    let label = get_quality_label(format, rate, depth);
                    assert!(label.is_dsd(), "{} {} {} -> {}", format, rate, depth, label);
                    assert!(!label.is_hi_res());
                    assert_ne!(label, QualityLabel::Lossless);
                }
            }
        }
    }

    #[test]
    fn test_hi_res_tiers() {
        assert_eq!(get_quality_label("flac", 192_000, 24), QualityLabel::HiRes192);
        assert_eq!(get_quality_label("wav", 384_000, 32), QualityLabel::HiRes192);
        assert_eq!(get_quality_label("flac", 48_000, 24), QualityLabel::HiRes24);
        assert_eq!(get_quality_label("flac", 88_200, 16), QualityLabel::HiRes);
        // the rule does not look at the container
        assert_eq!(get_quality_label("mp3", 96_000, 16), QualityLabel::HiRes96);
    }

    #[test]
    fn test_plain_lossy_has_no_badge() {
        let label = get_quality_label("mp3", 44_100, 16);
        assert_eq!(label, QualityLabel::None);
        assert!(!label.has_badge());
        assert_eq!(label.to_string(), "");
    }

    #[test]
    fn test_label_is_deterministic() {
        let first = get_quality_label("aiff", 48_000, 16);
        for _ in 0..10 {
            assert_eq!(get_quality_label("aiff", 48_000, 16), first);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(59.9), "0:59");
        assert_eq!(format_duration(245.0), "4:05");
        assert_eq!(format_duration(3_725.0), "1:02:05");
        assert_eq!(format_duration(-3.0), "0:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn test_format_sample_rate() {
        assert_eq!(format_sample_rate(44_100), "44.1 kHz");
        assert_eq!(format_sample_rate(48_000), "48 kHz");
        assert_eq!(format_sample_rate(88_200), "88.2 kHz");
        assert_eq!(format_sample_rate(192_000), "192 kHz");
        assert_eq!(format_sample_rate(2_822_400), "2.82 MHz");
        assert_eq!(format_sample_rate(5_644_800), "5.64 MHz");
    }

    #[test]
    fn test_format_bit_depth_and_rate() {
        assert_eq!(format_bit_depth(24), "24-bit");
        assert_eq!(format_bit_depth(1), "1-bit");
        assert_eq!(format_bit_rate(320), "320 kbps");
        assert_eq!(format_bit_rate(1_411), "1.4 Mbps");
    }
}
