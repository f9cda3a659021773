//! Job processor trait and the simulated processor.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pipeline_core::{Direction, Job, JobType, ProcessError};

/// Result type for job processors: the result reference on success.
pub type ProcessResult = Result<String, ProcessError>;

/// Future type for async job processors.
pub type ProcessFuture = BoxFuture<'static, ProcessResult>;

/// Trait for job processors.
///
/// Implement this trait to define how a dequeued job is turned into a result.
pub trait JobProcessor: Send + Sync + 'static {
    /// Process a job and return its result reference.
    fn process(&self, job: &Job) -> ProcessFuture;
}

/// Simulated processing durations per `(direction, type)`.
#[derive(Debug, Clone, Default)]
pub struct ProcessingProfile {
    exact: HashMap<(Direction, JobType), Duration>,
    fallback: HashMap<Direction, Duration>,
}

impl ProcessingProfile {
    /// The standard durations: import 60s; export epub 10s, pdf 25s, others 60s.
    pub fn standard() -> Self {
        Self::default()
            .with_fallback(Direction::Import, Duration::from_secs(60))
            .with_duration(Direction::Export, JobType::Epub, Duration::from_secs(10))
            .with_duration(Direction::Export, JobType::Pdf, Duration::from_secs(25))
            .with_fallback(Direction::Export, Duration::from_secs(60))
    }

    /// Set the duration for one `(direction, type)` pair.
    pub fn with_duration(mut self, direction: Direction, job_type: JobType, d: Duration) -> Self {
        self.exact.insert((direction, job_type), d);
        self
    }

    /// Set the duration for every type of a direction without an exact entry.
    pub fn with_fallback(mut self, direction: Direction, d: Duration) -> Self {
        self.fallback.insert(direction, d);
        self
    }

    /// Multiply every duration by `factor`, saturating at `Duration::MAX`.
    pub fn scaled(mut self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        for d in self.exact.values_mut().chain(self.fallback.values_mut()) {
            *d = Duration::try_from_secs_f64(d.as_secs_f64() * factor).unwrap_or(Duration::MAX);
        }
        self
    }

    fn knows(&self, direction: Direction) -> bool {
        self.fallback.contains_key(&direction) || self.exact.keys().any(|(d, _)| *d == direction)
    }

    /// Look up the simulated duration for a job.
    pub fn duration_for(
        &self,
        direction: Direction,
        job_type: JobType,
    ) -> Result<Duration, ProcessError> {
        if !self.knows(direction) {
            return Err(ProcessError::UnsupportedDirection(direction));
        }
        self.exact
            .get(&(direction, job_type))
            .or_else(|| self.fallback.get(&direction))
            .copied()
            .ok_or(ProcessError::UnsupportedType {
                direction,
                job_type,
            })
    }
}

/// Processor that waits out the profile's duration and fabricates a result reference.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    profile: ProcessingProfile,
    result_base_url: String,
}

impl SimulatedProcessor {
    pub fn new(profile: ProcessingProfile, result_base_url: impl Into<String>) -> Self {
        Self {
            profile,
            result_base_url: result_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<base>/<direction>s/<requestId>-<token>`
    pub fn result_url(&self, job: &Job) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}s/{}-{}",
            self.result_base_url,
            job.direction,
            job.request_id,
            &token[..8]
        )
    }
}

impl JobProcessor for SimulatedProcessor {
    fn process(&self, job: &Job) -> ProcessFuture {
        let duration = self.profile.duration_for(job.direction, job.job_type);
        let result_url = self.result_url(job);

        async move {
            tokio::time::sleep(duration?).await;
            Ok(result_url)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_profile_matches_duration_table() {
        let profile = ProcessingProfile::standard();
        let secs = |d, t| profile.duration_for(d, t).unwrap().as_secs();

        assert_eq!(secs(Direction::Export, JobType::Epub), 10);
        assert_eq!(secs(Direction::Export, JobType::Pdf), 25);
        assert_eq!(secs(Direction::Export, JobType::Word), 60);
        for job_type in JobType::ALL {
            assert_eq!(secs(Direction::Import, job_type), 60);
        }
    }

    #[test]
    fn missing_entries_are_classified() {
        let profile = ProcessingProfile::default().with_duration(
            Direction::Export,
            JobType::Epub,
            Duration::from_millis(5),
        );

        assert_eq!(
            profile.duration_for(Direction::Export, JobType::Pdf),
            Err(ProcessError::UnsupportedType {
                direction: Direction::Export,
                job_type: JobType::Pdf,
            })
        );
        assert_eq!(
            profile.duration_for(Direction::Import, JobType::Word),
            Err(ProcessError::UnsupportedDirection(Direction::Import))
        );
    }

    #[test]
    fn scaling_shrinks_every_entry() {
        let profile = ProcessingProfile::standard().scaled(0.5);
        assert_eq!(
            profile.duration_for(Direction::Export, JobType::Pdf).unwrap(),
            Duration::from_millis(12_500)
        );
        assert_eq!(
            profile.duration_for(Direction::Import, JobType::Pdf).unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn huge_scale_saturates_instead_of_overflowing() {
        let profile = ProcessingProfile::standard().scaled(1e300);
        assert_eq!(
            profile.duration_for(Direction::Export, JobType::Epub).unwrap(),
            Duration::MAX
        );
    }

    #[test]
    fn result_url_names_direction_and_job() {
        let processor = SimulatedProcessor::new(ProcessingProfile::standard(), "https://r.test/");
        let job = Job::new("b1", Direction::Export, JobType::Pdf);

        let url = processor.result_url(&job);
        let prefix = format!("https://r.test/exports/{}-", job.request_id);
        assert!(url.starts_with(&prefix), "{url}");
        assert_eq!(url.len(), prefix.len() + 8);
        assert_ne!(url, processor.result_url(&job));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_processor_waits_for_the_profile_duration() {
        let processor = SimulatedProcessor::new(ProcessingProfile::standard(), "https://r.test");
        let job = Job::new("b1", Direction::Export, JobType::Epub);

        let started = tokio::time::Instant::now();
        let url = processor.process(&job).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(url.starts_with("https://r.test/exports/"));
    }

    #[tokio::test]
    async fn unsupported_jobs_fail_without_waiting() {
        let processor = SimulatedProcessor::new(ProcessingProfile::default(), "https://r.test");
        let job = Job::new("b1", Direction::Import, JobType::Word);

        let err = processor.process(&job).await.unwrap_err();
        assert_eq!(err, ProcessError::UnsupportedDirection(Direction::Import));
    }
}
