use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Any,
    Chill,
    Energetic,
    Sad,
    Happy,
}

impl Mood {
    /// Community tags that signal the mood. Empty for [`Mood::Any`].
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Mood::Any => &[],
            Mood::Chill => &[
                "chill", "relaxed", "calm", "mellow", "ambient", "peaceful", "soft",
            ],
            Mood::Energetic => &[
                "energetic", "upbeat", "party", "dance", "hype", "intense", "fast",
            ],
            Mood::Sad => &[
                "melancholic",
                "sad",
                "depressing",
                "emotional",
                "dark",
                "somber",
            ],
            Mood::Happy => &[
                "happy",
                "cheerful",
                "positive",
                "uplifting",
                "feel-good",
                "joyful",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Any => "any",
            Mood::Chill => "chill",
            Mood::Energetic => "energetic",
            Mood::Sad => "sad",
            Mood::Happy => "happy",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(Mood::Any),
            "chill" => Ok(Mood::Chill),
            "energetic" => Ok(Mood::Energetic),
            "sad" => Ok(Mood::Sad),
            "happy" => Ok(Mood::Happy),
            other => Err(format!(
                "unknown mood '{}', expected any, chill, energetic, sad or happy",
                other
            )),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Era {
    #[default]
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "2020s")]
    Twenties,
    #[serde(rename = "2010s")]
    Tens,
    #[serde(rename = "2000s")]
    Noughties,
    #[serde(rename = "90s")]
    Nineties,
    /// The 80s and everything before.
    #[serde(rename = "80s")]
    Eighties,
}

impl Era {
    /// Whether `year` falls into the era. [`Era::Any`] matches nothing.
    pub fn matches(&self, year: i32) -> bool {
        match self {
            Era::Any => false,
            Era::Twenties => year >= 2020,
            Era::Tens => (2010..2020).contains(&year),
            Era::Noughties => (2000..2010).contains(&year),
            Era::Nineties => (1990..2000).contains(&year),
            Era::Eighties => year < 1990,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Any => "any",
            Era::Twenties => "2020s",
            Era::Tens => "2010s",
            Era::Noughties => "2000s",
            Era::Nineties => "90s",
            Era::Eighties => "80s",
        }
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(Era::Any),
            "2020s" => Ok(Era::Twenties),
            "2010s" => Ok(Era::Tens),
            "2000s" => Ok(Era::Noughties),
            "90s" | "1990s" => Ok(Era::Nineties),
            "80s" | "1980s" => Ok(Era::Eighties),
            other => Err(format!(
                "unknown era '{}', expected any, 2020s, 2010s, 2000s, 90s or 80s",
                other
            )),
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_DISCOVERY: u8 = 50;

/// Caller-supplied tuning of one recommendation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub mood: Mood,
    pub era: Era,
    discovery: u8,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            mood: Mood::Any,
            era: Era::Any,
            discovery: DEFAULT_DISCOVERY,
        }
    }
}

impl UserPreferences {
    /// `discovery` is clamped into `0..=100`.
    pub fn new(mood: Mood, era: Era, discovery: i64) -> Self {
        Self {
            mood,
            era,
            discovery: discovery.clamp(0, 100) as u8,
        }
    }

    /// 0 is all familiar artists, 100 all newly discovered ones.
    pub fn discovery(&self) -> u8 {
        self.discovery
    }
}

/// Tracks per artist taken from the familiar and the discovery pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackQuota {
    pub familiar: usize,
    pub discovery: usize,
}

impl TrackQuota {
    pub fn for_discovery(discovery: u8) -> Self {
        match discovery {
            d if d < 30 => TrackQuota {
                familiar: 8,
                discovery: 2,
            },
            d if d > 70 => TrackQuota {
                familiar: 3,
                discovery: 7,
            },
            _ => TrackQuota {
                familiar: 5,
                discovery: 5,
            },
        }
    }
}
