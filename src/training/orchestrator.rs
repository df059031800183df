//! Per-domain training submission and convergence tracking.
//!
//! Epistemic foundation:
//! - K_i: Each domain is Synced (flag 0) or Pending (any other flag)
//! - K_i: Submitting a Synced domain is a no-op; nothing is re-submitted
//! - B_i: Status reads can fail or be malformed → fatal to the calling operation
//! - B_i: A submit for one domain can fail → reported, never aborts siblings
//! - I^B: Convergence time is unbounded server-side → deadline + cancellation here

use crate::client::{CommandDispatcher, Method};
use crate::models::{ChatbotError, Domain, Result, Status};
use crate::training::poll::{poll_until, PollPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Endpoint returning the status snapshot.
pub const STATUS_PATH: &str = "/clause/devver/build";

/// Intent codes meaning there is nothing to train (no intents, or intents without utterances).
const INTENTS_NOTHING_TO_TRAIN: [i64; 3] = [21, 22, 24];

/// Intent code for dictionary data that blocks training.
const INTENTS_INVALID_DICT: i64 = 25;

/// Result of a single-domain submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Domain was already synchronized; nothing was sent
    AlreadySynced,
    /// Server accepted the job; it runs asynchronously
    Submitted,
    /// Intents domain has nothing to train
    NothingToTrain { rc: i64 },
    /// Server refused to start the job
    Rejected { rc: i64, message: String },
}

impl SubmitOutcome {
    /// True unless the server refused the job.
    pub fn accepted(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected { .. })
    }
}

/// Per-domain results of `train_all`, in submission order.
#[derive(Debug)]
pub struct TrainReport {
    results: Vec<(Domain, Result<SubmitOutcome>)>,
}

impl TrainReport {
    pub fn results(&self) -> &[(Domain, Result<SubmitOutcome>)] {
        &self.results
    }

    pub fn get(&self, domain: Domain) -> Option<&Result<SubmitOutcome>> {
        self.results
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, r)| r)
    }

    /// True when every domain was accepted without error.
    pub fn all_accepted(&self) -> bool {
        self.results
            .iter()
            .all(|(_, r)| matches!(r, Ok(outcome) if outcome.accepted()))
    }

    /// Domains that errored or were rejected.
    pub fn failures(&self) -> Vec<Domain> {
        self.results
            .iter()
            .filter(|(_, r)| !matches!(r, Ok(outcome) if outcome.accepted()))
            .map(|(d, _)| *d)
            .collect()
    }
}

/// A converged status together with the number of reads it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    pub status: Status,
    pub reads: u32,
}

/// Drives training for one chatbot.
#[derive(Clone)]
pub struct TrainingOrchestrator {
    dispatcher: Arc<CommandDispatcher>,
}

impl TrainingOrchestrator {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Read the current status snapshot.
    pub async fn status(&self) -> Result<Status> {
        let envelope = self
            .dispatcher
            .execute(Method::Get, STATUS_PATH, None)
            .await?
            .into_result("GET", STATUS_PATH)?;
        Status::from_payload(envelope.data())
    }

    /// Submit a sync job for `domain` if it is pending.
    pub async fn submit(&self, domain: Domain) -> Result<SubmitOutcome> {
        let status = self.status().await?;
        if status.flag(domain) == 0 {
            debug!(domain = %domain, "Domain already synced, skipping submit");
            return Ok(SubmitOutcome::AlreadySynced);
        }

        let path = domain.sync_path();
        let envelope = self.dispatcher.execute(Method::Post, path, None).await?;
        let rc = envelope.rc();

        let outcome = match (domain, rc) {
            (_, 0) => SubmitOutcome::Submitted,
            (Domain::Intents, rc) if INTENTS_NOTHING_TO_TRAIN.contains(&rc) => {
                warn!(rc, "No intents or no utterances, nothing to train");
                SubmitOutcome::NothingToTrain { rc }
            }
            (Domain::Intents, INTENTS_INVALID_DICT) => {
                warn!(rc, "Invalid dictionary data, intents training cannot start");
                SubmitOutcome::Rejected {
                    rc,
                    message: envelope.message(),
                }
            }
            (Domain::Intents, _) => {
                return Err(ChatbotError::DomainStatus {
                    method: "POST".to_string(),
                    path: path.to_string(),
                    rc,
                    message: envelope.message(),
                })
            }
            (_, rc) => SubmitOutcome::Rejected {
                rc,
                message: envelope.message(),
            },
        };

        info!(domain = %domain, outcome = ?outcome, "Training submitted");
        Ok(outcome)
    }

    /// Submit every domain independently: conversation, FAQ, then intents.
    pub async fn train_all(&self) -> TrainReport {
        let mut results = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let result = self.submit(domain).await;
            match &result {
                Ok(outcome) if !outcome.accepted() => {
                    warn!(domain = %domain, outcome = ?outcome, "Training rejected");
                }
                Err(e) => warn!(domain = %domain, error = %e, "Training submit failed"),
                Ok(_) => {}
            }
            results.push((domain, result));
        }
        TrainReport { results }
    }

    /// Poll until all three domains are synchronized.
    ///
    /// Status read failures end the wait immediately.
    pub async fn wait_for_convergence(
        &self,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Converged> {
        let polled = poll_until(policy, cancel, || self.converged_status()).await?;

        info!(reads = polled.attempts, "Training converged");
        Ok(Converged {
            status: polled.value,
            reads: polled.attempts,
        })
    }

    /// One convergence probe: `Some` once every domain is synced.
    async fn converged_status(&self) -> Result<Option<Status>> {
        let status = self.status().await?;
        if status.all_synced() {
            Ok(Some(status))
        } else {
            warn!(pending = ?status.pending(), "Training still in progress");
            Ok(None)
        }
    }
}
