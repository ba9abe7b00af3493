use crossbeam_utils::thread;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use tracing::info;

use crate::utility::ProgressBar;

use super::{AttackConfig, AttackReport, ClockControlAttack, HypothesisOutcome, NUM_HYPOTHESES};

/**
Tries every R4 hypothesis of `config` on `attack`. Hypotheses are split between worker threads
by index modulo the number of threads; each worker sends its tally back over a channel. The
returned candidates are sorted by hypothesis index, so the report does not depend on the
scheduling of the workers.

attack      The attack to run.
config      Hypothesis range, thread count and stopping rule.
*/
pub fn search(attack: &ClockControlAttack, config: &AttackConfig) -> AttackReport {
    let start = time::precise_time_s();
    let hypotheses = config.hypotheses.start.min(NUM_HYPOTHESES)
                     ..config.hypotheses.end.min(NUM_HYPOTHESES);
    let num_threads = match config.threads {
        0 => num_cpus::get(),
        n => n,
    }.min(hypotheses.len()).max(1);
    let stop = AtomicBool::new(false);
    let (result_tx, result_rx) = mpsc::channel();

    info!(samples = attack.samples().len(),
          frame = attack.reference_frame(),
          hypotheses = hypotheses.len(),
          threads = num_threads,
          "searching R4 hypotheses");

    // Start scoped worker threads
    thread::scope(|scope| {
        for t in 0..num_threads {
            let result_tx = result_tx.clone();
            let hypotheses = hypotheses.clone();
            let stop = &stop;

            scope.spawn(move |_| {
                let mut progress_bar = if config.progress && t == 0 {
                    Some(ProgressBar::new(hypotheses.clone().skip(t).step_by(num_threads).len()))
                } else {
                    None
                };
                let mut report = AttackReport::default();

                for hypothesis in hypotheses.skip(t).step_by(num_threads) {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }

                    report.searched += 1;

                    match attack.evaluate(hypothesis) {
                        HypothesisOutcome::Inconsistent => report.inconsistent += 1,
                        HypothesisOutcome::Underdetermined { .. } => report.underdetermined += 1,
                        HypothesisOutcome::Rejected => report.rejected += 1,
                        HypothesisOutcome::Validated(state) => {
                            report.candidates.push(attack.candidate(hypothesis, state));

                            if config.stop_at_first {
                                stop.store(true, Ordering::Relaxed);
                            }
                        }
                    }

                    if let Some(ref mut progress_bar) = progress_bar {
                        progress_bar.increment();
                    }
                }

                result_tx.send(report).expect("Thread could not send result");
            });
        }
    }).expect("Search thread panicked");

    // Collect results from all threads
    let mut report = AttackReport::default();

    for _ in 0..num_threads {
        let mut thread_report = result_rx.recv().expect("Main could not receive result");

        report.candidates.append(&mut thread_report.candidates);
        report.searched += thread_report.searched;
        report.inconsistent += thread_report.inconsistent;
        report.underdetermined += thread_report.underdetermined;
        report.rejected += thread_report.rejected;
    }

    report.candidates.sort_by_key(|c| c.hypothesis);
    report.elapsed = time::precise_time_s() - start;

    info!(searched = report.searched,
          validated = report.candidates.len(),
          inconsistent = report.inconsistent,
          underdetermined = report.underdetermined,
          rejected = report.rejected,
          elapsed = report.elapsed,
          "search finished");

    report
}
