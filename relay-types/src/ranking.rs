use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RankingEntry {
    #[serde(deserialize_with = "deserialize_rank")]
    pub rank: u32,
    pub name: String,
    #[serde(deserialize_with = "deserialize_score")]
    #[ts(type = "number")]
    pub score: u64,
}

/// Ordered ranking list. Each push replaces the previous snapshot wholesale.
pub type RankingSnapshot = Vec<RankingEntry>;

fn deserialize_rank<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let rank = u32::deserialize(deserializer)?;
    if rank == 0 {
        return Err(de::Error::custom("rank must be positive"));
    }
    Ok(rank)
}

/// Scores are integral but the upstream ranking store keeps them as doubles,
/// so `12` and `12.0` are both accepted. Negative or fractional values are not.
pub fn deserialize_score<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawScore {
        Integer(u64),
        Float(f64),
    }

    match RawScore::deserialize(deserializer)? {
        RawScore::Integer(score) => Ok(score),
        RawScore::Float(score) if score >= 0.0 && score.fract() == 0.0 && score < u64::MAX as f64 => {
            Ok(score as u64)
        }
        RawScore::Float(score) => Err(de::Error::custom(format!(
            "score must be a non-negative integer, got {}",
            score
        ))),
    }
}
