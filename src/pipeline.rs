use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::balance::{BalanceOracle, BalanceStatus};
use crate::config::PipelineConfig;
use crate::sampler::PhraseSampler;
use crate::sink::{Match, ResultSink};
use crate::stats::Statistics;
use crate::wallet::AddressDeriver;

/// What one pipeline pass over one phrase amounted to.
///
/// Every non-fatal failure path is a variant here instead of a log line,
/// so tests can assert on the outcome distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseOutcome {
    /// Funded sum above the threshold, recorded
    Match { funded_sats: u64 },
    /// The oracle answered with a sum at or below the threshold
    BelowThreshold,
    /// The oracle had nothing to say (timeout, error, malformed body)
    NoInformation,
    /// Key derivation failed; phrase abandoned
    DeriveFailed,
}

/// Run the sweep: one sampling producer feeding a fixed pool of workers
/// over a capacity-1 handoff channel.
///
/// The bounded channel is the backpressure: the sampler stays at most one
/// phrase ahead of the pool and pauses while every worker is blocked on
/// oracle I/O. Flipping `shutdown` stops the sampler; closing the channel
/// then lets each worker finish its in-flight lookup and drain. Returns
/// only after the producer and all workers have been joined.
pub async fn run<O>(
    sampler: PhraseSampler,
    deriver: Arc<AddressDeriver>,
    oracle: Arc<O>,
    sink: Arc<ResultSink>,
    stats: Arc<Statistics>,
    options: PipelineConfig,
    shutdown: watch::Receiver<bool>,
) where
    O: BalanceOracle + 'static,
{
    info!("Starting pipeline with {} workers", options.workers);

    let (tx, rx) = mpsc::channel::<String>(1);
    let queue = Arc::new(Mutex::new(rx));

    // Sampling is CPU work; keep it off the async runtime
    let producer = task::spawn_blocking(move || producer_loop(sampler, tx, shutdown));

    let mut handles = Vec::with_capacity(options.workers);
    for id in 0..options.workers {
        handles.push(tokio::spawn(worker_loop(
            id,
            queue.clone(),
            deriver.clone(),
            oracle.clone(),
            sink.clone(),
            stats.clone(),
            options.min_balance_sats,
        )));
    }

    if let Err(e) = producer.await {
        error!("Sampler task failed: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker task failed: {}", e);
        }
    }

    info!("Pipeline drained");
}

/// Feed valid phrases into the handoff channel until told to stop.
///
/// The cancellation flag is checked before every draw attempt, so shutdown
/// is honored even when the vocabulary never produces a valid phrase.
fn producer_loop(
    mut sampler: PhraseSampler,
    tx: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
) {
    let mut produced: u64 = 0;
    while !*shutdown.borrow() {
        let Some(phrase) = sampler.try_draw() else {
            continue;
        };
        if tx.blocking_send(phrase).is_err() {
            // All workers are gone
            break;
        }
        produced += 1;
    }
    debug!("Sampler stopped after {} phrases", produced);
}

async fn worker_loop<O: BalanceOracle>(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    deriver: Arc<AddressDeriver>,
    oracle: Arc<O>,
    sink: Arc<ResultSink>,
    stats: Arc<Statistics>,
    min_balance_sats: u64,
) {
    loop {
        // Hold the queue lock only for the dequeue itself
        let phrase = { queue.lock().await.recv().await };
        let Some(phrase) = phrase else {
            break;
        };

        let outcome = check_phrase(&phrase, &deriver, oracle.as_ref(), &sink, min_balance_sats).await;
        stats.increment_checked();
        match outcome {
            PhraseOutcome::Match { .. } => stats.increment_matched(),
            PhraseOutcome::DeriveFailed => stats.increment_derive_failed(),
            PhraseOutcome::NoInformation => stats.increment_oracle_miss(),
            PhraseOutcome::BelowThreshold => {}
        }
    }
    debug!("Worker {} drained", id);
}

/// One full pass: derive, encode, query, and conditionally persist.
///
/// No failure in here is allowed to take the worker down.
async fn check_phrase<O: BalanceOracle>(
    phrase: &str,
    deriver: &AddressDeriver,
    oracle: &O,
    sink: &ResultSink,
    min_balance_sats: u64,
) -> PhraseOutcome {
    let master = match deriver.master_key(phrase) {
        Ok(master) => master,
        Err(e) => {
            warn!("Skipping underivable phrase: {}", e);
            return PhraseOutcome::DeriveFailed;
        }
    };
    let address = deriver.p2pkh_address(&master).to_string();

    match oracle.funded_sum(&address).await {
        BalanceStatus::Known(funded_sats) if funded_sats > min_balance_sats => {
            info!("Match: {} holds {} sats", address, funded_sats);
            let hit = Match {
                address,
                master_key: master.to_string(),
                funded_sats,
                phrase: phrase.to_string(),
            };
            if let Err(e) = sink.record(&hit) {
                error!("Failed to record match for {}: {}", hit.address, e);
            }
            PhraseOutcome::Match { funded_sats }
        }
        BalanceStatus::Known(_) => PhraseOutcome::BelowThreshold,
        BalanceStatus::Unavailable => PhraseOutcome::NoInformation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordlist::Wordlist;
    use std::time::Duration;
    use tempfile::TempDir;

    const VALID_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const INVALID_PHRASE: &str = "about abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";

    struct FixedOracle {
        sum: u64,
    }

    impl BalanceOracle for FixedOracle {
        async fn funded_sum(&self, _address: &str) -> BalanceStatus {
            BalanceStatus::Known(self.sum)
        }
    }

    struct DownOracle;

    impl BalanceOracle for DownOracle {
        async fn funded_sum(&self, _address: &str) -> BalanceStatus {
            BalanceStatus::Unavailable
        }
    }

    struct SlowOracle;

    impl BalanceOracle for SlowOracle {
        async fn funded_sum(&self, _address: &str) -> BalanceStatus {
            tokio::time::sleep(Duration::from_millis(20)).await;
            BalanceStatus::Known(0)
        }
    }

    fn vocabulary() -> Arc<Wordlist> {
        let words = [
            "abandon", "ability", "able", "about", "above", "absent", "absorb",
            "abstract", "absurd", "abuse", "access", "accident",
        ];
        Arc::new(Wordlist::from_words(words.iter().map(|w| w.to_string()).collect()).unwrap())
    }

    struct Fixture {
        dir: TempDir,
        sink: Arc<ResultSink>,
        stats: Arc<Statistics>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let sink = Arc::new(ResultSink::new(dir.path().join("matches.txt")));
            Self {
                dir,
                sink,
                stats: Arc::new(Statistics::new()),
            }
        }

        fn results_path(&self) -> std::path::PathBuf {
            self.dir.path().join("matches.txt")
        }

        fn spawn<O: BalanceOracle + 'static>(
            &self,
            oracle: O,
            workers: usize,
            shutdown: watch::Receiver<bool>,
        ) -> tokio::task::JoinHandle<()> {
            tokio::spawn(run(
                PhraseSampler::with_seed(vocabulary(), 3),
                Arc::new(AddressDeriver::new()),
                Arc::new(oracle),
                self.sink.clone(),
                self.stats.clone(),
                PipelineConfig {
                    workers,
                    min_balance_sats: 10,
                },
                shutdown,
            ))
        }
    }

    async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(deadline, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_funded_balances_produce_one_record_per_observation() {
        let fixture = Fixture::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = fixture.spawn(FixedOracle { sum: 42_000 }, 4, shutdown_rx);

        let stats = fixture.stats.clone();
        wait_until(Duration::from_secs(30), move || stats.matched() >= 3).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("pipeline did not drain")
            .unwrap();

        let content = std::fs::read_to_string(fixture.results_path()).unwrap();
        assert_eq!(
            fixture.stats.matched() as usize,
            content.matches("master key: xprv").count()
        );
        assert!(content.contains("phrase: "));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_zero_balances_are_never_recorded() {
        let fixture = Fixture::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = fixture.spawn(FixedOracle { sum: 0 }, 4, shutdown_rx);

        let stats = fixture.stats.clone();
        wait_until(Duration::from_secs(30), move || stats.checked() >= 10).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("pipeline did not drain")
            .unwrap();

        assert_eq!(fixture.stats.matched(), 0);
        assert!(!fixture.results_path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_threshold_comparison_is_strict() {
        let fixture = Fixture::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Exactly the threshold: not a match
        let handle = fixture.spawn(FixedOracle { sum: 10 }, 2, shutdown_rx);

        let stats = fixture.stats.clone();
        wait_until(Duration::from_secs(30), move || stats.checked() >= 5).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("pipeline did not drain")
            .unwrap();

        assert_eq!(fixture.stats.matched(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_oracle_outage_does_not_stop_the_pool() {
        let fixture = Fixture::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = fixture.spawn(DownOracle, 4, shutdown_rx);

        // The pool keeps processing phrases well past the first misses
        let stats = fixture.stats.clone();
        wait_until(Duration::from_secs(30), move || stats.checked() >= 10).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("pipeline did not drain")
            .unwrap();

        assert_eq!(fixture.stats.matched(), 0);
        assert!(fixture.stats.oracle_misses() >= 10);
        assert!(!fixture.results_path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_drains_in_flight_lookups() {
        let fixture = Fixture::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = fixture.spawn(SlowOracle, 8, shutdown_rx);

        let stats = fixture.stats.clone();
        wait_until(Duration::from_secs(30), move || stats.checked() >= 1).await;
        shutdown_tx.send(true).unwrap();

        // Graceful join: every worker finishes its current lookup and exits
        tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("pipeline did not drain")
            .unwrap();
    }

    #[tokio::test]
    async fn test_check_phrase_outcome_distribution() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::new(dir.path().join("matches.txt"));
        let deriver = AddressDeriver::new();

        let funded = check_phrase(VALID_PHRASE, &deriver, &FixedOracle { sum: 42_000 }, &sink, 10).await;
        assert_eq!(funded, PhraseOutcome::Match { funded_sats: 42_000 });

        let empty = check_phrase(VALID_PHRASE, &deriver, &FixedOracle { sum: 0 }, &sink, 10).await;
        assert_eq!(empty, PhraseOutcome::BelowThreshold);

        let down = check_phrase(VALID_PHRASE, &deriver, &DownOracle, &sink, 10).await;
        assert_eq!(down, PhraseOutcome::NoInformation);

        let invalid = check_phrase(INVALID_PHRASE, &deriver, &FixedOracle { sum: 42_000 }, &sink, 10).await;
        assert_eq!(invalid, PhraseOutcome::DeriveFailed);
    }
}
