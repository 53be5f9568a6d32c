//! # Vote Ledger
//!
//! In-memory authority over who voted for what, backed by [`Store`].
//!
//! ## Submit
//! - Option must be non-empty and one of the ledger's options, otherwise nothing changes
//! - Same option as the voter's current vote: no-op, no write, timestamps untouched
//! - Otherwise overwrite the voter's vote, stamp both timestamps, persist, then answer
//!
//! ## Commit order
//! The ledger lock is held across the durable write. A failed write restores the previous
//! vote and timestamp before the lock is released, so nothing ever reads a vote that is not
//! on disk.
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    error::AppError,
    models::{Ledger, Vote},
    store::Store,
    tally::{TallySnapshot, aggregate},
};

pub struct VoteLedger {
    ledger: Mutex<Ledger>,
    store: Store,
}

impl VoteLedger {
    pub async fn open(store: Store) -> Result<Self, AppError> {
        let ledger = store.load().await?;

        Ok(Self::new(ledger, store))
    }

    pub fn new(ledger: Ledger, store: Store) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            store,
        }
    }

    pub async fn view(&self, voter: &str) -> TallySnapshot {
        aggregate(&*self.ledger.lock().await, voter)
    }

    pub async fn submit(&self, voter: &str, option: &str) -> Result<TallySnapshot, AppError> {
        self.submit_at(voter, option, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        voter: &str,
        option: &str,
        now: DateTime<Utc>,
    ) -> Result<TallySnapshot, AppError> {
        let mut ledger = self.ledger.lock().await;
        validate(&ledger, option)?;

        let Some(previous) = apply_vote(&mut ledger, voter, option, now) else {
            debug!("Repeat vote for {option}, nothing to write");
            return Ok(aggregate(&ledger, voter));
        };

        if let Err(e) = self.store.save(&ledger).await {
            error!("Failed to persist vote, rolling back: {e}");
            previous.restore(&mut ledger, voter);

            return Err(e.into());
        }

        Ok(aggregate(&ledger, voter))
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }
}

fn validate(ledger: &Ledger, option: &str) -> Result<(), AppError> {
    if option.is_empty() {
        return Err(AppError::MissingOption);
    }

    if !ledger.has_option(option) {
        return Err(AppError::UnknownOption);
    }

    Ok(())
}

/// What a vote overwrote, for undoing it.
#[derive(Debug)]
struct Previous {
    vote: Option<Vote>,
    updated_at: Option<DateTime<Utc>>,
}

impl Previous {
    fn restore(self, ledger: &mut Ledger, voter: &str) {
        match self.vote {
            Some(vote) => {
                ledger.votes.insert(voter.to_string(), vote);
            }
            None => {
                ledger.votes.remove(voter);
            }
        }

        ledger.updated_at = self.updated_at;
    }
}

/// Records the vote unless it repeats the voter's current choice. `None` means nothing changed.
fn apply_vote(ledger: &mut Ledger, voter: &str, option: &str, now: DateTime<Utc>) -> Option<Previous> {
    if ledger
        .votes
        .get(voter)
        .is_some_and(|vote| vote.option == option)
    {
        return None;
    }

    // Never step backwards, even if the wall clock does.
    let now = ledger.updated_at.map_or(now, |last| last.max(now));

    let previous_vote = ledger.votes.insert(
        voter.to_string(),
        Vote {
            option: option.to_string(),
            updated_at: now,
        },
    );

    Some(Previous {
        vote: previous_vote,
        updated_at: ledger.updated_at.replace(now),
    })
}
