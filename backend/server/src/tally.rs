//! # Tally
//!
//! Read-side view of the ledger: per-option counts and percents plus the caller's own vote.
//!
//! - Options keep ledger order so the bars render in a stable order
//! - Votes for unknown options are skipped
//! - Each percent is rounded on its own (half up), so the column may sum to 99 or 101
//! - No votes means every percent is 0
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Ledger, timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub id: String,
    pub label: String,
    pub count: u64,
    pub percent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub total: u64,
    pub options: Vec<OptionTally>,
    pub user_vote: Option<String>,
    #[serde(with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn aggregate(ledger: &Ledger, voter: &str) -> TallySnapshot {
    let mut counts: HashMap<&str, u64> = ledger
        .options
        .iter()
        .map(|option| (option.id.as_str(), 0))
        .collect();

    for vote in ledger.votes.values() {
        if let Some(count) = counts.get_mut(vote.option.as_str()) {
            *count += 1;
        }
    }

    let total = counts.values().sum();

    let options = ledger
        .options
        .iter()
        .map(|option| {
            let count = counts.get(option.id.as_str()).copied().unwrap_or(0);

            OptionTally {
                id: option.id.clone(),
                label: option.label.clone(),
                count,
                percent: percent(count, total),
            }
        })
        .collect();

    TallySnapshot {
        total,
        options,
        user_vote: ledger.votes.get(voter).map(|vote| vote.option.clone()),
        updated_at: ledger.updated_at,
    }
}

/// round(count / total * 100) with halves going up, in integers.
fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }

    (200 * count + total) / (2 * total)
}
