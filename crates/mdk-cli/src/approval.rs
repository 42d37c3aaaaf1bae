use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use mdk_promotion::{ApprovalDecision, ApprovalGate, EntryCard, PromotionComparison};

/// Interactive approval over stdin with a fail-closed timeout.
///
/// The prompt thread is detached; if the operator never answers, the main
/// thread times out and the promotion is rejected. Closed or unreadable
/// stdin rejects as well. Approval requires an explicit `y`/`yes`.
pub struct StdinApprovalGate {
    timeout: Duration,
}

impl StdinApprovalGate {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl ApprovalGate for StdinApprovalGate {
    fn decide(&self, comparison: &PromotionComparison) -> Result<ApprovalDecision> {
        print_comparison(comparison);
        print!(
            "Approve promotion of v{} to champion? [y/N] ({}s timeout): ",
            comparison.challenger.version,
            self.timeout.as_secs()
        );
        io::stdout().flush()?;

        let (tx, rx) = mpsc::channel::<Option<String>>();
        thread::spawn(move || {
            let mut line = String::new();
            let answer = match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            };
            // Receiver may be gone after a timeout.
            let _ = tx.send(answer);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Some(line)) if is_yes(&line) => Ok(ApprovalDecision::Approved),
            Ok(_) => Ok(ApprovalDecision::Rejected),
            Err(_) => {
                eprintln!("approval timed out after {}s, rejecting", self.timeout.as_secs());
                Ok(ApprovalDecision::Rejected)
            }
        }
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_comparison(comparison: &PromotionComparison) {
    println!("model_name={}", comparison.model_name);
    print_card("challenger", &comparison.challenger);
    match &comparison.champion {
        Some(card) => print_card("champion", card),
        None => println!("champion=none"),
    }
}

fn print_card(role: &str, card: &EntryCard) {
    println!(
        "{}_version={} {}_provider={} {}_model={} {}_accuracy={:.4} {}_f1={:.4}",
        role, card.version, role, card.provider, role, card.model, role, card.accuracy, role,
        card.f1_score
    );
}
