// src/config/validate.rs

use crate::config::model::{RawSettings, Settings};
use crate::errors::{CmdRelayError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = CmdRelayError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    if raw.default_timeout_secs == 0 {
        return Err(CmdRelayError::ConfigError(
            "default_timeout_secs must be >= 1 (got 0); use Timeout::Disabled per call to opt out"
                .to_string(),
        ));
    }

    if raw.max_output_mb == 0 {
        return Err(CmdRelayError::ConfigError(
            "max_output_mb must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::try_from(RawSettings::default()).unwrap();
        assert_eq!(settings.default_timeout_secs, 30);
        assert_eq!(settings.max_output_bytes(), 50 * 1024 * 1024);
        assert!(!settings.debug);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let raw = RawSettings {
            default_timeout_secs: 0,
            ..RawSettings::default()
        };
        assert!(Settings::try_from(raw).is_err());
    }

    #[test]
    fn zero_output_ceiling_is_rejected() {
        let raw = RawSettings {
            max_output_mb: 0,
            ..RawSettings::default()
        };
        assert!(Settings::try_from(raw).is_err());
    }
}
