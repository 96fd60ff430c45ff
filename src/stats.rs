//! Run counters and the end-of-crawl summary
//!
//! Workers bump [`CrawlStats`] counters as they go; once the crawl is over the
//! coordinator freezes them into a [`CrawlSummary`].

use crate::crawler::AdmissionDecision;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    results_emitted: AtomicU64,
    duplicates: AtomicU64,
    fetch_failures: AtomicU64,
    parse_failures: AtomicU64,
    pages_stored: AtomicU64,
    store_failures: AtomicU64,
    links_discovered: AtomicU64,
    rejected_malformed: AtomicU64,
    rejected_out_of_scope: AtomicU64,
    rejected_too_deep: AtomicU64,
    rejected_budget: AtomicU64,
    rejected_seen: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one fetch attempt and returns the running total
    pub fn record_fetched(&self) -> u64 {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_result(&self) {
        bump(&self.results_emitted);
    }

    pub fn record_duplicate(&self) {
        bump(&self.duplicates);
    }

    pub fn record_fetch_failure(&self) {
        bump(&self.fetch_failures);
    }

    pub fn record_parse_failure(&self) {
        bump(&self.parse_failures);
    }

    pub fn record_stored(&self) {
        bump(&self.pages_stored);
    }

    pub fn record_store_failure(&self) {
        bump(&self.store_failures);
    }

    /// Counts one candidate link and the decision taken on it
    pub fn record_admission(&self, decision: AdmissionDecision) {
        bump(&self.links_discovered);
        match decision {
            AdmissionDecision::Admitted => {}
            AdmissionDecision::Malformed => bump(&self.rejected_malformed),
            AdmissionDecision::OutOfScope => bump(&self.rejected_out_of_scope),
            AdmissionDecision::TooDeep => bump(&self.rejected_too_deep),
            AdmissionDecision::BudgetExhausted => bump(&self.rejected_budget),
            AdmissionDecision::AlreadySeen => bump(&self.rejected_seen),
        }
    }

    pub fn results_emitted(&self) -> u64 {
        self.results_emitted.load(Ordering::Relaxed)
    }

    /// Freezes the counters into a summary
    pub fn snapshot(&self, run: RunFacts) -> CrawlSummary {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CrawlSummary {
            start_url: run.start_url,
            resumed: run.resumed,
            pages_fetched: load(&self.pages_fetched),
            results: load(&self.results_emitted),
            duplicates: load(&self.duplicates),
            fetch_failures: load(&self.fetch_failures),
            parse_failures: load(&self.parse_failures),
            pages_stored: load(&self.pages_stored),
            store_failures: load(&self.store_failures),
            links_discovered: load(&self.links_discovered),
            links_followed: run.links_followed,
            rejected: RejectionCounts {
                malformed: load(&self.rejected_malformed),
                out_of_scope: load(&self.rejected_out_of_scope),
                too_deep: load(&self.rejected_too_deep),
                budget_exhausted: load(&self.rejected_budget),
                already_seen: load(&self.rejected_seen),
            },
            pending: run.pending,
            stopped_early: run.stopped_early,
            ledger_degraded: run.ledger_degraded,
            duration_ms: run.duration.as_millis() as u64,
        }
    }
}

/// Facts about a run that live outside the counters
#[derive(Debug, Clone)]
pub struct RunFacts {
    pub start_url: String,
    pub resumed: bool,
    pub links_followed: u64,
    pub pending: usize,
    pub stopped_early: bool,
    pub ledger_degraded: bool,
    pub duration: Duration,
}

/// Candidate links turned away, by reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub malformed: u64,
    pub out_of_scope: u64,
    pub too_deep: u64,
    pub budget_exhausted: u64,
    pub already_seen: u64,
}

/// Summary of one crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub start_url: String,
    pub resumed: bool,
    pub pages_fetched: u64,
    pub results: u64,
    pub duplicates: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub pages_stored: u64,
    pub store_failures: u64,
    pub links_discovered: u64,
    /// Links admitted against the budget (the seed is not counted)
    pub links_followed: u64,
    pub rejected: RejectionCounts,
    /// Frontier entries left unprocessed (checkpointed when stopped early)
    pub pending: usize,
    pub stopped_early: bool,
    pub ledger_degraded: bool,
    pub duration_ms: u64,
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Start URL: {}", summary.start_url);
    if summary.resumed {
        println!("  Resumed from checkpoint");
    }
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!("  Results: {}", summary.results);
    println!("  Duplicate content: {}", summary.duplicates);
    println!(
        "  Duration: {:.1}s",
        Duration::from_millis(summary.duration_ms).as_secs_f64()
    );
    println!();

    println!("Links:");
    println!("  Discovered: {}", summary.links_discovered);
    println!("  Followed: {}", summary.links_followed);
    let rejected = &summary.rejected;
    for (label, count) in [
        ("Already seen", rejected.already_seen),
        ("Budget exhausted", rejected.budget_exhausted),
        ("Too deep", rejected.too_deep),
        ("Out of scope", rejected.out_of_scope),
        ("Malformed", rejected.malformed),
    ] {
        if count > 0 {
            println!("  {}: {}", label, count);
        }
    }
    println!();

    let failures = summary.fetch_failures + summary.parse_failures + summary.store_failures;
    if failures > 0 {
        println!("Errors:");
        println!("  Fetch failures: {}", summary.fetch_failures);
        println!("  Parse failures: {}", summary.parse_failures);
        println!("  Store failures: {}", summary.store_failures);
        println!();
    }

    println!("Storage:");
    println!("  Pages stored: {}", summary.pages_stored);
    if summary.ledger_degraded {
        println!("  Ledger: degraded (dedup was in-memory only)");
    }

    if summary.stopped_early {
        println!();
        println!(
            "Stopped early: {} pending entries checkpointed for the next run",
            summary.pending
        );
    }
}
