//! The six emotion categories scored for every analyzed batch.
//!
//! `Emotions<T>` is a fixed-shape map keyed by [`EmotionKind`]. Integer scores
//! coming from the language model use `Emotions<u32>` ([`EmotionScoreSet`]);
//! running daily figures use `Emotions<f64>` ([`EmotionAverages`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionKind {
    Depression,
    Brightness,
    Excitement,
    Anger,
    Sadness,
    Thrill,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 6] = [
        EmotionKind::Depression,
        EmotionKind::Brightness,
        EmotionKind::Excitement,
        EmotionKind::Anger,
        EmotionKind::Sadness,
        EmotionKind::Thrill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionKind::Depression => "depression",
            EmotionKind::Brightness => "brightness",
            EmotionKind::Excitement => "excitement",
            EmotionKind::Anger => "anger",
            EmotionKind::Sadness => "sadness",
            EmotionKind::Thrill => "thrill",
        }
    }
}

impl fmt::Display for EmotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion category: {0}")]
pub struct ParseEmotionError(pub String);

impl FromStr for EmotionKind {
    type Err = ParseEmotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        EmotionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lowered)
            .ok_or_else(|| ParseEmotionError(s.to_string()))
    }
}

/// A value per emotion category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Emotions<T> {
    pub depression: T,
    pub brightness: T,
    pub excitement: T,
    pub anger: T,
    pub sadness: T,
    pub thrill: T,
}

/// Integer scores in `[1,100]` per category (or their chunk sum).
pub type EmotionScoreSet = Emotions<u32>;

/// Running per-category averages for one calendar day.
pub type EmotionAverages = Emotions<f64>;

impl<T: Copy> Emotions<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value)
    }

    pub fn from_fn(mut f: impl FnMut(EmotionKind) -> T) -> Self {
        Self {
            depression: f(EmotionKind::Depression),
            brightness: f(EmotionKind::Brightness),
            excitement: f(EmotionKind::Excitement),
            anger: f(EmotionKind::Anger),
            sadness: f(EmotionKind::Sadness),
            thrill: f(EmotionKind::Thrill),
        }
    }

    pub fn get(&self, kind: EmotionKind) -> T {
        match kind {
            EmotionKind::Depression => self.depression,
            EmotionKind::Brightness => self.brightness,
            EmotionKind::Excitement => self.excitement,
            EmotionKind::Anger => self.anger,
            EmotionKind::Sadness => self.sadness,
            EmotionKind::Thrill => self.thrill,
        }
    }

    pub fn get_mut(&mut self, kind: EmotionKind) -> &mut T {
        match kind {
            EmotionKind::Depression => &mut self.depression,
            EmotionKind::Brightness => &mut self.brightness,
            EmotionKind::Excitement => &mut self.excitement,
            EmotionKind::Anger => &mut self.anger,
            EmotionKind::Sadness => &mut self.sadness,
            EmotionKind::Thrill => &mut self.thrill,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionKind, T)> + '_ {
        EmotionKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

impl EmotionScoreSet {
    /// Result of scoring an empty post list.
    pub fn zero() -> Self {
        Self::splat(0)
    }

    /// Fixed substitute used whenever the model's reply mentions crisis or
    /// safety language.
    pub fn distress() -> Self {
        Self {
            depression: 80,
            brightness: 20,
            excitement: 15,
            anger: 40,
            sadness: 75,
            thrill: 10,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0)
    }
}

impl Add for EmotionScoreSet {
    type Output = EmotionScoreSet;

    fn add(self, rhs: Self) -> Self::Output {
        Emotions::from_fn(|k| self.get(k).saturating_add(rhs.get(k)))
    }
}

impl AddAssign for EmotionScoreSet {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl EmotionAverages {
    /// Value used for a category that has never been sampled today.
    pub const NEUTRAL: f64 = 50.0;

    pub fn neutral() -> Self {
        Self::splat(Self::NEUTRAL)
    }

    /// brightness + excitement + thrill
    pub fn positive(&self) -> f64 {
        self.brightness + self.excitement + self.thrill
    }

    /// depression + anger + sadness
    pub fn negative(&self) -> f64 {
        self.depression + self.anger + self.sadness
    }

    /// (excitement + thrill) - (depression + sadness)
    pub fn vitality(&self) -> f64 {
        (self.excitement + self.thrill) - (self.depression + self.sadness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in EmotionKind::ALL {
            assert_eq!(kind.as_str().parse::<EmotionKind>().unwrap(), kind);
        }
        assert_eq!("  Thrill ".parse::<EmotionKind>().unwrap(), EmotionKind::Thrill);
        assert!("joy".parse::<EmotionKind>().is_err());
    }

    #[test]
    fn test_score_sets_add_elementwise() {
        let a = EmotionScoreSet { depression: 10, brightness: 20, excitement: 30, anger: 40, sadness: 50, thrill: 60 };
        let b = EmotionScoreSet::splat(5);
        let sum = a + b;
        assert_eq!(sum.depression, 15);
        assert_eq!(sum.thrill, 65);

        let mut acc = EmotionScoreSet::zero();
        acc += a;
        acc += a;
        assert_eq!(acc.anger, 80);
    }

    #[test]
    fn test_serializes_lowercase_keys() {
        let json = serde_json::to_value(EmotionScoreSet::distress()).unwrap();
        assert_eq!(json["depression"], 80);
        assert_eq!(json["sadness"], 75);
        assert_eq!(json["thrill"], 10);
    }

    #[test]
    fn test_average_aggregates() {
        let avg = EmotionAverages {
            depression: 10.0,
            brightness: 80.0,
            excitement: 70.0,
            anger: 5.0,
            sadness: 15.0,
            thrill: 60.0,
        };
        assert_eq!(avg.positive(), 210.0);
        assert_eq!(avg.negative(), 30.0);
        assert_eq!(avg.vitality(), 105.0);
    }
}
