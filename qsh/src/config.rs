use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

/// Name of the environment variable consulted by [`Config::from_env`].
pub const TZ_ENV_VAR: &str = "QSH_TZ";

/// Decoder-wide configuration.
///
/// The only knob the format itself asks for is the local wall-clock zone
/// used to present [`crate::Header::record_start_time`] and every
/// [`crate::Frame::timestamp`] (Appendix §6, Environment). Everything else
/// about decoding is fixed by the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Zone the decoded instants are presented in. Decoding itself always
    /// happens in UTC; this only affects the zone attached to values
    /// handed back to the caller.
    pub tz: Tz,
}

impl Default for Config {
    /// Defaults to `Europe/Moscow`, the exchange timezone QSH files are
    /// overwhelmingly recorded against.
    fn default() -> Self {
        Config { tz: Tz::Europe__Moscow }
    }
}

impl Config {
    /// Builds a [`Config`] from the [`TZ_ENV_VAR`] environment variable,
    /// falling back to [`Config::default`] if it is unset or does not name
    /// a known zone.
    pub fn from_env() -> Self {
        match env::var(TZ_ENV_VAR) {
            Ok(name) => Tz::from_str(&name).map(|tz| Config { tz }).unwrap_or_default(),
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_moscow() {
        assert_eq!(Config::default().tz, Tz::Europe__Moscow);
    }

    #[test]
    fn from_env_falls_back_on_missing_var() {
        env::remove_var(TZ_ENV_VAR);
        assert_eq!(Config::from_env().tz, Tz::Europe__Moscow);
    }

    #[test]
    fn from_env_honors_valid_zone() {
        env::set_var(TZ_ENV_VAR, "Europe/London");
        assert_eq!(Config::from_env().tz, Tz::Europe__London);
        env::remove_var(TZ_ENV_VAR);
    }

    #[test]
    fn from_env_falls_back_on_unknown_zone() {
        env::set_var(TZ_ENV_VAR, "Not/AZone");
        assert_eq!(Config::from_env(), Config::default());
        env::remove_var(TZ_ENV_VAR);
    }
}
