//! Admission of discovered links into the frontier
//!
//! Every candidate link goes through [`Admission::try_admit`]. The budget
//! check, the ledger claim and the budget increment happen under one lock,
//! so two workers can never both take the last unit of link budget.

use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::ledger::DedupLedger;
use crate::url::{normalize_url, CrawlScope};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Outcome of presenting one candidate link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionDecision {
    /// Claimed, counted against the budget and queued
    Admitted,
    /// Not a usable http(s) URL
    Malformed,
    /// Outside the crawl scope
    OutOfScope,
    /// Deeper than `max_depth`
    TooDeep,
    /// `links_followed` already reached `max_links`
    BudgetExhausted,
    /// Claimed before, in this run or a previous one
    AlreadySeen,
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Link budget plus the admission rule that enforces it
pub struct Admission {
    max_links: u64,
    max_depth: u32,
    scope: CrawlScope,
    links_followed: Mutex<u64>,
    ledger: Arc<DedupLedger>,
    frontier: Arc<Frontier>,
}

impl Admission {
    pub fn new(
        max_links: u64,
        max_depth: u32,
        scope: CrawlScope,
        ledger: Arc<DedupLedger>,
        frontier: Arc<Frontier>,
    ) -> Self {
        Self {
            max_links,
            max_depth,
            scope,
            links_followed: Mutex::new(0),
            ledger,
            frontier,
        }
    }

    fn budget(&self) -> MutexGuard<'_, u64> {
        self.links_followed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the admission rule to a link found at `depth - 1`
    pub fn try_admit(&self, candidate: &str, depth: u32) -> AdmissionDecision {
        let url = match normalize_url(candidate) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", candidate, e);
                return AdmissionDecision::Malformed;
            }
        };

        if !self.scope.contains(&url) {
            return AdmissionDecision::OutOfScope;
        }

        if depth > self.max_depth {
            return AdmissionDecision::TooDeep;
        }

        {
            let mut links_followed = self.budget();
            if *links_followed >= self.max_links {
                return AdmissionDecision::BudgetExhausted;
            }
            if !self.ledger.try_claim_url(url.as_str()) {
                return AdmissionDecision::AlreadySeen;
            }
            *links_followed += 1;
            if *links_followed == self.max_links {
                tracing::info!("Link budget of {} spent, admitting no more links", self.max_links);
            }
        }

        tracing::debug!("Admitted {} at depth {}", url, depth);
        self.frontier.push(FrontierEntry::new(url.as_str(), depth));
        AdmissionDecision::Admitted
    }

    /// Number of links admitted so far
    pub fn links_followed(&self) -> u64 {
        *self.budget()
    }
}
