//! Persisted rule configuration and built-in presets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RuleError;

/// Rule configuration as exchanged with the presentation layer.
///
/// JSON shape: `{ "modulus": 2, "rules": [..], "angles": [..], "initAngle": 0 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Modulus `M`.
    pub modulus: u32,
    /// One expression per residue class.
    pub rules: Vec<String>,
    /// Branch angle (degrees) per residue class.
    #[serde(default)]
    pub angles: Vec<f64>,
    /// Initial heading of the root branch (degrees, 0 = up).
    #[serde(default)]
    pub init_angle: f64,
}

/// Named rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePreset {
    /// `n/2`, `3n+1`
    Classic,
    /// `n/2 + 1`, `3n+1`
    Alternative,
    /// `n/3`, `2n+1`, `4n+2`
    Triple,
}

impl RulePreset {
    /// All presets, in display order.
    pub const ALL: [RulePreset; 3] = [
        RulePreset::Classic,
        RulePreset::Alternative,
        RulePreset::Triple,
    ];

    /// Short name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            RulePreset::Classic => "classic",
            RulePreset::Alternative => "alternative",
            RulePreset::Triple => "triple",
        }
    }

    /// Expand into a full configuration with default angles.
    pub fn config(self) -> RuleConfig {
        let (modulus, rules): (u32, &[&str]) = match self {
            RulePreset::Classic => (2, &["n/2", "3*n+1"]),
            RulePreset::Alternative => (2, &["(n/2) + 1", "3*n+1"]),
            RulePreset::Triple => (3, &["n/3", "2*n+1", "4*n+2"]),
        };
        RuleConfig {
            modulus,
            rules: rules.iter().map(|s| s.to_string()).collect(),
            angles: default_angles(modulus),
            init_angle: 0.0,
        }
    }
}

impl fmt::Display for RulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RulePreset {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RulePreset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RuleError::UnknownPreset(s.to_string()))
    }
}

/// Default branch angles (degrees) for a modulus.
pub fn default_angles(modulus: u32) -> Vec<f64> {
    match modulus {
        2 => vec![7.5, -15.0],
        3 => vec![30.0, -45.0, 0.0],
        4 => vec![10.0, -20.0, -10.0, 20.0],
        m => (0..m)
            .map(|i| if i % 2 == 0 { 15.0 } else { -15.0 })
            .collect(),
    }
}

fn default_rules(modulus: u32) -> Vec<String> {
    let rules: &[&str] = match modulus {
        2 => &["n/2", "3*n+1"],
        3 => &["n/3", "2*n+1", "(4*n+2)/3"],
        4 => &["(n/2) + 1", "(3*n) + 1", "(n/2) - 1", "(3*n) + 1"],
        _ => &[],
    };
    (0..modulus as usize)
        .map(|i| rules.get(i).copied().unwrap_or("n").to_string())
        .collect()
}

impl RuleConfig {
    /// Configuration with explicit rules and default angles.
    pub fn new(modulus: u32, rules: Vec<String>) -> Self {
        Self {
            modulus,
            rules,
            angles: default_angles(modulus),
            init_angle: 0.0,
        }
    }

    /// Starting configuration offered for a freshly chosen modulus.
    pub fn default_for_modulus(modulus: u32) -> Self {
        Self::new(modulus, default_rules(modulus))
    }

    /// Classic Collatz rules.
    pub fn classic() -> Self {
        RulePreset::Classic.config()
    }

    /// Replace the angle table.
    pub fn with_angles(mut self, angles: Vec<f64>) -> Self {
        self.angles = angles;
        self
    }

    /// Replace the initial heading.
    pub fn with_init_angle(mut self, init_angle: f64) -> Self {
        self.init_angle = init_angle;
        self
    }
}
