//! Batch scheduler: fans fit scoring out in bounded concurrent groups with a
//! fixed pause between groups to stay under upstream rate limits.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info};

use crate::models::profile::RawProfile;
use crate::scoring::fit_scorer::FitScorer;
use crate::scoring::models::{ScoredCandidate, SearchContext};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct BatchScheduler {
    scorer: Arc<dyn FitScorer>,
    batch_size: usize,
    pacing: Duration,
}

impl BatchScheduler {
    /// A `batch_size` of zero is treated as one.
    pub fn new(scorer: Arc<dyn FitScorer>, batch_size: usize, pacing: Duration) -> Self {
        Self {
            scorer,
            batch_size: batch_size.max(1),
            pacing,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Scores every profile. Output order and length match the input.
    pub async fn score_all(
        &self,
        context: &SearchContext,
        profiles: &[RawProfile],
    ) -> Vec<ScoredCandidate> {
        let total_batches = profiles.len().div_ceil(self.batch_size);
        let mut scored = Vec::with_capacity(profiles.len());

        for (index, batch) in profiles.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            debug!(
                "Scoring batch {}/{} ({} candidates)",
                index + 1,
                total_batches,
                batch.len()
            );
            let results = join_all(batch.iter().map(|p| self.scorer.score(context, p))).await;
            scored.extend(results);
        }

        let degraded = scored.iter().filter(|c| c.is_degraded()).count();
        info!(
            "Scored {} candidates in {} batches ({} degraded)",
            scored.len(),
            total_batches,
            degraded
        );
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, profile, RecordingScorer};
    use tokio::time::Instant;

    fn profiles(n: usize) -> Vec<RawProfile> {
        (0..n).map(|i| profile(&i.to_string(), &format!("user{i}"))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_seven_profiles_run_as_five_then_two_with_one_pause() {
        let scorer = Arc::new(RecordingScorer::with_latency(Duration::from_millis(100)));
        let scheduler = BatchScheduler::new(scorer.clone(), 5, Duration::from_millis(500));

        let started = Instant::now();
        let scored = scheduler.score_all(&context(), &profiles(7)).await;
        let elapsed = started.elapsed();

        assert_eq!(scored.len(), 7);
        assert_eq!(scorer.max_in_flight(), 5);
        // two batches of 100ms each, one 500ms pause between them
        assert!(elapsed >= Duration::from_millis(700), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(800), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_preserves_input_order() {
        let scorer = Arc::new(RecordingScorer::with_latency(Duration::from_millis(10)));
        let scheduler = BatchScheduler::new(scorer, 3, Duration::from_millis(500));

        let input = profiles(8);
        let scored = scheduler.score_all(&context(), &input).await;

        let handles: Vec<_> = scored.iter().map(|c| c.profile.handle.clone()).collect();
        let expected: Vec<_> = input.iter().map(|p| p.handle.clone()).collect();
        assert_eq!(handles, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_batch_has_no_pause() {
        let scorer = Arc::new(RecordingScorer::with_latency(Duration::ZERO));
        let scheduler = BatchScheduler::new(scorer, 5, Duration::from_millis(500));

        let started = Instant::now();
        scheduler.score_all(&context(), &profiles(5)).await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_results_are_kept() {
        let scorer = Arc::new(RecordingScorer::degrading_every(2));
        let scheduler = BatchScheduler::new(scorer, 5, Duration::from_millis(500));

        let scored = scheduler.score_all(&context(), &profiles(6)).await;
        assert_eq!(scored.len(), 6);
        assert_eq!(scored.iter().filter(|c| c.is_degraded()).count(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_scores_nothing() {
        let scorer = Arc::new(RecordingScorer::with_latency(Duration::ZERO));
        let scheduler = BatchScheduler::new(scorer.clone(), 5, Duration::from_millis(500));
        assert!(scheduler.score_all(&context(), &[]).await.is_empty());
        assert_eq!(scorer.calls(), 0);
    }

    #[test]
    fn test_zero_batch_size_is_treated_as_one() {
        let scorer = Arc::new(RecordingScorer::with_latency(Duration::ZERO));
        assert_eq!(BatchScheduler::new(scorer, 0, Duration::ZERO).batch_size(), 1);
    }
}
