use crate::domain::refund::CurrencyCode;
use clap::ValueEnum;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com/";
pub const PRODUCTION_BASE_URL: &str = "https://connect.squareup.com/";
pub const DEFAULT_REASON: &str = "Refund processed via batch script";

/// Which Square deployment the refunds are issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => f.write_str("sandbox"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl FromStr for AccessToken {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Settings that shape a single run, independent of the Refund Service used.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub environment: Environment,
    pub currency: CurrencyCode,
    pub delimiter: u8,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            currency: CurrencyCode::default(),
            delimiter: b',',
        }
    }
}
