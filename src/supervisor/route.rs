//! Routing labels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label the classifier uses to end a turn
pub const FINISH_LABEL: &str = "FINISH";

/// The fixed set of responders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponderName {
    Diet,
    Exercise,
    ProviderLookup,
    Medication,
    SymptomChecker,
    AirQuality,
}

impl ResponderName {
    pub const ALL: [ResponderName; 6] = [
        ResponderName::Diet,
        ResponderName::Exercise,
        ResponderName::ProviderLookup,
        ResponderName::Medication,
        ResponderName::SymptomChecker,
        ResponderName::AirQuality,
    ];

    /// Wire label, as the classifier must return it
    pub fn label(self) -> &'static str {
        match self {
            ResponderName::Diet => "diet",
            ResponderName::Exercise => "exercise",
            ResponderName::ProviderLookup => "provider-lookup",
            ResponderName::Medication => "medication",
            ResponderName::SymptomChecker => "symptom-checker",
            ResponderName::AirQuality => "air-quality",
        }
    }

    /// One-line description used in the classifier instruction
    pub fn description(self) -> &'static str {
        match self {
            ResponderName::Diet => "Creates personalized daily diet plans",
            ResponderName::Exercise => "Creates personalized exercise plans",
            ResponderName::ProviderLookup => {
                "Finds nearby hospitals, clinics, or test centers by zip code"
            }
            ResponderName::Medication => "Provides drug label info for a given active ingredient",
            ResponderName::SymptomChecker => {
                "Checks symptoms and suggests possible conditions and actions"
            }
            ResponderName::AirQuality => "Gives air quality details for a ZIP code",
        }
    }
}

impl fmt::Display for ResponderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the supervisor sends control next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Responder(ResponderName),
    Finish,
}

impl Target {
    pub fn label(self) -> &'static str {
        match self {
            Target::Responder(name) => name.label(),
            Target::Finish => FINISH_LABEL,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Target {
    type Err = RoutingError;

    /// Exact match only. Anything outside the seven labels is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FINISH_LABEL {
            return Ok(Target::Finish);
        }
        ResponderName::ALL
            .into_iter()
            .find(|name| name.label() == s)
            .map(Target::Responder)
            .ok_or_else(|| RoutingError::UnknownLabel(s.to_string()))
    }
}

/// The classifier could not produce a usable routing decision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("classifier returned unrecognized label: {0:?}")]
    UnknownLabel(String),
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}
