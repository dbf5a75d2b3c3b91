//! Initial arrays for a race.

use crate::snapshot::Value;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Distribution {
    Random,
    Reversed,
    AlmostSorted,
}

impl Distribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Reversed => "reversed",
            Self::AlmostSorted => "almostSorted",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Reversed => "Reversed",
            Self::AlmostSorted => "Almost Sorted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    Low,
    Medium,
    High,
}

impl SizePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn cardinality(self) -> usize {
        match self {
            Self::Low => 10,
            Self::Medium => 50,
            Self::High => 100,
        }
    }
}

/// Build `1..=n` for the size policy, then order it per `distribution`.
pub fn generate_array<R: Rng + ?Sized>(
    distribution: Distribution,
    size: SizePolicy,
    rng: &mut R,
) -> Vec<Value> {
    let len = size.cardinality();
    let mut values = (1..=len as Value).collect::<Vec<_>>();
    match distribution {
        Distribution::Reversed => values.reverse(),
        Distribution::Random => values.shuffle(rng),
        Distribution::AlmostSorted => {
            // ceil(10% of len); the two indices are drawn independently and may coincide.
            let swaps = len.div_ceil(10);
            for _ in 0..swaps {
                let a = rng.gen_range(0..len);
                let b = rng.gen_range(0..len);
                values.swap(a, b);
            }
        }
    }
    values
}
