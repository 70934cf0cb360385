//! Deployment environment shared by all services.
//!
//! Both services take the same `--env` flag. Only `stg` and `qa` are
//! recognised; anything else is rejected before a service starts.

use std::fmt;
use std::str::FromStr;

use error::AppError;

/// Deployment environment a service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Staging: talks to real services over the network.
    #[default]
    Staging,
    /// QA: backed by in-process mocks.
    Qa,
}

impl Environment {
    /// The flag value for this environment, as sent in `X-Environment`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "stg",
            Environment::Qa => "qa",
        }
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stg" => Ok(Environment::Staging),
            "qa" => Ok(Environment::Qa),
            other => Err(AppError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the `--env` flag from command line arguments.
///
/// Accepts `--env <value>`, `--env=<value>` and the single-dash forms.
/// Returns `Ok(None)` when the flag is absent; a missing or unrecognised
/// value is an error.
pub fn from_args(args: &[String]) -> Result<Option<Environment>, AppError> {
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--env" | "-env" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| AppError::Config("--env requires a value".to_string()))?;
                return value.parse().map(Some);
            }
            arg if arg.starts_with("--env=") || arg.starts_with("-env=") => {
                let value = arg.split_once('=').map(|(_, v)| v).unwrap_or_default();
                return value.parse().map(Some);
            }
            _ => i += 1,
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_environments() {
        assert_eq!("stg".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("qa".parse::<Environment>().unwrap(), Environment::Qa);
    }

    #[test]
    fn test_parse_is_exact() {
        for bad in ["", "STG", "Qa", "prod", " qa", "staging"] {
            let result = bad.parse::<Environment>();
            assert!(
                matches!(result, Err(AppError::InvalidEnvironment(ref v)) if v == bad),
                "{:?} should be rejected",
                bad
            );
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("bin")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_from_args() {
        assert_eq!(from_args(&args(&[])).unwrap(), None);
        assert_eq!(from_args(&args(&["--env", "qa"])).unwrap(), Some(Environment::Qa));
        assert_eq!(from_args(&args(&["-env=stg"])).unwrap(), Some(Environment::Staging));
        assert_eq!(
            from_args(&args(&["run", "--env=qa"])).unwrap(),
            Some(Environment::Qa)
        );
    }

    #[test]
    fn test_from_args_rejects_bad_values() {
        assert!(matches!(
            from_args(&args(&["--env", "prod"])),
            Err(AppError::InvalidEnvironment(_))
        ));
        assert!(matches!(from_args(&args(&["--env"])), Err(AppError::Config(_))));
    }

    #[test]
    fn test_display_round_trips() {
        for env in [Environment::Staging, Environment::Qa] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
        assert_eq!(Environment::default(), Environment::Staging);
    }
}
