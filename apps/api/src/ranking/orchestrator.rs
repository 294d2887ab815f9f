//! Ranking orchestrator: validates a batch, prepares the job description once,
//! evaluates every resume on a bounded pool of blocking workers and assembles
//! the ranked report.
//!
//! Candidates are independent; the only state they share is the embedding
//! cache, which lives for one run and is dropped with it.
//! Cancellation stops dispatching new candidates and lets in-flight ones finish,
//! so a cancelled run is either a consistent report over the candidates that
//! finished (marked partial) or `RankingError::Cancelled`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::inference::EmbeddingModel;
use crate::ranking::embedder::Embedder;
use crate::ranking::error::{RankingError, ValidationError};
use crate::ranking::explainer::Explainer;
use crate::ranking::gaps::{heatmap, most_missing_skills, GapAnalyzer};
use crate::ranking::jd_cleaner::clean_job_description;
use crate::ranking::models::{
    CandidateFlag, CandidateInput, CandidateResult, Document, ExtractionStatus, JdSummary,
    RankingReport, RankingResult, RunCompleteness, ScoreBreakdown, SkillSet,
};
use crate::ranking::scoring::{skill_match_rate, ScoringEngine};
use crate::ranking::segmenter::TextSegmenter;
use crate::ranking::skills::{SkillExtraction, SkillExtractor};
use crate::ranking::stats::DistributionStats;

pub const DEFAULT_MAX_RESUMES: usize = 30;
pub const DEFAULT_MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

pub const JD_DOCUMENT_ID: &str = "job_description";

const MOST_MISSING_LIMIT: usize = 10;
const HEATMAP_CANDIDATES: usize = 5;
const HEATMAP_SKILLS: usize = 10;
/// Upper bound on summary requests in flight for one report.
pub const MAX_CONCURRENT_SUMMARIES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_resumes: usize,
    /// Applies to the job description as well as every resume.
    pub max_resume_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_resumes: DEFAULT_MAX_RESUMES,
            max_resume_bytes: DEFAULT_MAX_RESUME_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub limits: BatchLimits,
    pub workers: usize,
    pub clean_jd: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            limits: BatchLimits::default(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            clean_jd: false,
        }
    }
}

/// The job description, segmented and extracted once per run.
struct PreparedJd {
    document: Document,
    extraction: SkillExtraction,
}

/// Per-run state shared by the workers. The scoring engine owns this run's
/// embedding cache.
struct RunContext {
    jd: PreparedJd,
    scoring: ScoringEngine,
}

/// Output of one candidate's blocking pipeline.
struct Evaluation {
    breakdown: ScoreBreakdown,
    skills: SkillSet,
    extraction: ExtractionStatus,
    flags: Vec<CandidateFlag>,
}

#[derive(Clone)]
pub struct RankingOrchestrator {
    segmenter: Arc<TextSegmenter>,
    extractor: Arc<SkillExtractor>,
    embedding_model: Arc<dyn EmbeddingModel>,
    gaps: GapAnalyzer,
    limits: BatchLimits,
    workers: usize,
    clean_jd: bool,
}

impl RankingOrchestrator {
    pub fn new(
        segmenter: TextSegmenter,
        extractor: SkillExtractor,
        embedding_model: Arc<dyn EmbeddingModel>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            segmenter: Arc::new(segmenter),
            extractor: Arc::new(extractor),
            embedding_model,
            gaps: GapAnalyzer,
            limits: options.limits,
            workers: options.workers.max(1),
            clean_jd: options.clean_jd,
        }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Rejects the batch if any limit is exceeded or an id is unusable.
    pub fn validate(
        &self,
        jd_text: &str,
        resumes: &[CandidateInput],
    ) -> Result<(), ValidationError> {
        if resumes.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if resumes.len() > self.limits.max_resumes {
            return Err(ValidationError::BatchTooLarge {
                count: resumes.len(),
                max: self.limits.max_resumes,
            });
        }
        if jd_text.len() > self.limits.max_resume_bytes {
            return Err(ValidationError::DocumentTooLarge {
                id: JD_DOCUMENT_ID.to_string(),
                bytes: jd_text.len(),
                max: self.limits.max_resume_bytes,
            });
        }

        let mut seen = HashSet::with_capacity(resumes.len());
        for (index, resume) in resumes.iter().enumerate() {
            if resume.id.trim().is_empty() {
                return Err(ValidationError::EmptyCandidateId { index });
            }
            if resume.text.len() > self.limits.max_resume_bytes {
                return Err(ValidationError::DocumentTooLarge {
                    id: resume.id.clone(),
                    bytes: resume.text.len(),
                    max: self.limits.max_resume_bytes,
                });
            }
            if !seen.insert(resume.id.as_str()) {
                return Err(ValidationError::DuplicateCandidateId(resume.id.clone()));
            }
        }
        Ok(())
    }

    /// Scores every resume against `jd_text` and ranks them.
    ///
    /// `top_n` marks the shortlist; `0` shortlists the whole batch. Ties keep
    /// submission order.
    pub async fn rank(
        &self,
        jd_text: &str,
        resumes: &[CandidateInput],
        top_n: usize,
        cancel: &CancellationToken,
    ) -> Result<RankingReport, RankingError> {
        self.validate(jd_text, resumes)?;

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, resumes = resumes.len(), top_n, "ranking batch started");

        let scoring = ScoringEngine::new(Arc::new(Embedder::new(Arc::clone(
            &self.embedding_model,
        ))));
        let run = Arc::new(self.prepare_run(jd_text, scoring).await?);
        let slots = self.evaluate_all(&run, resumes, cancel).await?;
        debug!(
            %run_id,
            model = run.scoring.embedder().model_id(),
            cached_embeddings = run.scoring.embedder().cache_len(),
            "run embeddings cached"
        );

        let processed = slots.iter().filter(|s| s.is_some()).count();
        if processed == 0 {
            warn!(%run_id, "ranking cancelled before any candidate finished");
            return Err(RankingError::Cancelled);
        }
        let completeness = if processed < resumes.len() {
            warn!(%run_id, processed, requested = resumes.len(), "ranking cancelled, returning partial result");
            RunCompleteness::Partial {
                processed,
                requested: resumes.len(),
            }
        } else {
            RunCompleteness::Complete
        };

        let mut evaluations: Vec<Evaluation> = slots.into_iter().flatten().collect();
        evaluations.sort_by(|a, b| b.breakdown.final_score.total_cmp(&a.breakdown.final_score));

        let report = self.assemble(run_id, &run.jd, evaluations, top_n, completeness);
        info!(
            %run_id,
            ranked = report.ranking.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ranking batch finished"
        );
        Ok(report)
    }

    /// Fills `explanation` for shortlisted candidates. Summaries that cannot
    /// be produced leave `None` plus an `ExplanationUnavailable` flag.
    pub async fn attach_explanations(
        &self,
        report: &mut RankingReport,
        explainer: &Explainer,
        jd_text: &str,
        resumes: &[CandidateInput],
        cancel: &CancellationToken,
    ) {
        let limit = Arc::new(Semaphore::new(MAX_CONCURRENT_SUMMARIES));
        let mut tasks = JoinSet::new();
        if explainer.is_available() {
            for entry in report.ranking.entries.iter().filter(|e| e.shortlisted) {
                let Some(resume) = resumes.iter().find(|r| r.id == entry.id()) else {
                    continue;
                };
                let explainer = explainer.clone();
                let jd = jd_text.to_string();
                let text = resume.text.clone();
                let breakdown = entry.breakdown.clone();
                let limit = Arc::clone(&limit);
                tasks.spawn(async move {
                    let summary = match limit.acquire_owned().await {
                        Ok(_permit) => explainer.explain(&jd, &text, &breakdown).await,
                        Err(_) => None,
                    };
                    (breakdown.document_id, summary)
                });
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("explanations cancelled");
                    tasks.abort_all();
                    break;
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((id, summary))) => {
                        if let Some(entry) = report.ranking.entries.iter_mut().find(|e| e.id() == id) {
                            entry.explanation = summary;
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "explanation task failed"),
                },
            }
        }

        for entry in report.ranking.entries.iter_mut().filter(|e| e.shortlisted) {
            if entry.explanation.is_none() {
                entry.flags.push(CandidateFlag::ExplanationUnavailable);
            }
        }
    }

    async fn prepare_run(
        &self,
        jd_text: &str,
        scoring: ScoringEngine,
    ) -> Result<RunContext, RankingError> {
        let this = self.clone();
        let text = jd_text.to_string();
        tokio::task::spawn_blocking(move || -> Result<RunContext, RankingError> {
            let jd = this.prepare_jd_blocking(&text, &scoring)?;
            Ok(RunContext { jd, scoring })
        })
        .await
        .map_err(|e| RankingError::Worker(e.to_string()))?
    }

    fn prepare_jd_blocking(
        &self,
        jd_text: &str,
        scoring: &ScoringEngine,
    ) -> Result<PreparedJd, RankingError> {
        let document = if self.clean_jd {
            self.segmenter
                .segment(JD_DOCUMENT_ID, &clean_job_description(jd_text))
        } else {
            self.segmenter.segment(JD_DOCUMENT_ID, jd_text)
        };
        let extraction = self.extractor.extract_skills(&document.full_view);

        // Both JD views are needed by every candidate; a failure here is batch-wide.
        let embedder = scoring.embedder();
        embedder.embed(&document.full_view)?;
        embedder.embed(&document.skill_view)?;

        debug!(
            skills = extraction.skills.len(),
            source = ?document.skill_view_source,
            labeler = self.extractor.model_id(),
            "job description prepared"
        );
        Ok(PreparedJd {
            document,
            extraction,
        })
    }

    /// One slot per submitted resume; `None` for candidates never dispatched.
    async fn evaluate_all(
        &self,
        run: &Arc<RunContext>,
        resumes: &[CandidateInput],
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Evaluation>>, RankingError> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, candidate) in resumes.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(dispatched = index, "cancellation requested, no further dispatch");
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|e| RankingError::Worker(e.to_string()))?
                }
            };
            let this = self.clone();
            let run = Arc::clone(run);
            let candidate = candidate.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                // A panic in one candidate's models must not take the batch down.
                let evaluation =
                    catch_unwind(AssertUnwindSafe(|| this.evaluate_candidate(&run, &candidate)))
                        .unwrap_or_else(|panic| {
                            warn!(
                                candidate = %candidate.id,
                                reason = panic_message(panic.as_ref()),
                                "candidate evaluation panicked, scoring zero"
                            );
                            failed_evaluation(&run.scoring, &candidate.id)
                        });
                (index, evaluation)
            });
        }

        let mut slots: Vec<Option<Evaluation>> = resumes.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, evaluation) = joined.map_err(|e| RankingError::Worker(e.to_string()))?;
            slots[index] = Some(evaluation);
        }
        Ok(slots)
    }

    fn evaluate_candidate(&self, run: &RunContext, candidate: &CandidateInput) -> Evaluation {
        let jd = &run.jd;
        let document = self.segmenter.segment(&candidate.id, &candidate.text);
        let extraction = self.extractor.extract_skills(&document.full_view);

        let mut flags = Vec::new();
        if document.is_empty() {
            flags.push(CandidateFlag::EmptyInput);
        }
        match extraction.status {
            ExtractionStatus::Degraded { .. } => flags.push(CandidateFlag::ExtractionDegraded),
            ExtractionStatus::Failed { .. } => flags.push(CandidateFlag::ExtractionFailed),
            ExtractionStatus::Complete { .. } => {}
        }

        let breakdown = match run.scoring.score(
            &jd.document,
            &jd.extraction.skills,
            &document,
            &extraction.skills,
        ) {
            Ok(breakdown) => breakdown,
            Err(e) => {
                warn!(candidate = %candidate.id, error = %e, "embedding failed, scoring on skills only");
                flags.push(CandidateFlag::EmbeddingFailed);
                let rate = skill_match_rate(&jd.extraction.skills, &extraction.skills);
                run.scoring.combine(&candidate.id, 0.0, 0.0, rate)
            }
        };

        Evaluation {
            breakdown,
            skills: extraction.skills,
            extraction: extraction.status,
            flags,
        }
    }

    /// `evaluations` must already be in rank order.
    fn assemble(
        &self,
        run_id: Uuid,
        jd: &PreparedJd,
        evaluations: Vec<Evaluation>,
        top_n: usize,
        completeness: RunCompleteness,
    ) -> RankingReport {
        let total = evaluations.len();
        let top_n = if top_n == 0 { total } else { top_n.min(total) };

        let pairs: Vec<(&str, &SkillSet)> = evaluations
            .iter()
            .map(|e| (e.breakdown.document_id.as_str(), &e.skills))
            .collect();
        let analysis = self.gaps.analyze(&jd.extraction.skills, &pairs);

        let scores: Vec<f32> = evaluations.iter().map(|e| e.breakdown.final_score).collect();
        let stats = DistributionStats::from_scores(&scores);
        let most_missing = most_missing_skills(&analysis.gaps, top_n, MOST_MISSING_LIMIT);
        let cells = heatmap(&analysis.coverage, HEATMAP_CANDIDATES, HEATMAP_SKILLS);

        let entries = evaluations
            .into_iter()
            .zip(analysis.gaps)
            .enumerate()
            .map(|(position, (evaluation, gap))| CandidateResult {
                rank: position + 1,
                shortlisted: position < top_n,
                breakdown: evaluation.breakdown,
                skills: evaluation.skills,
                matched_skills: gap.matched,
                missing_skills: gap.missing,
                coverage_percentage: gap.coverage_percentage,
                extraction: evaluation.extraction,
                flags: evaluation.flags,
                explanation: None,
            })
            .collect();

        RankingReport {
            run_id,
            generated_at: Utc::now(),
            completeness,
            jd: JdSummary {
                skills: jd.extraction.skills.clone(),
                extraction: jd.extraction.status,
                skill_view_source: jd.document.skill_view_source,
            },
            ranking: RankingResult { top_n, entries },
            coverage: analysis.coverage,
            stats,
            most_missing_skills: most_missing,
            heatmap: cells,
        }
    }
}

fn failed_evaluation(scoring: &ScoringEngine, candidate_id: &str) -> Evaluation {
    Evaluation {
        breakdown: scoring.combine(candidate_id, 0.0, 0.0, 0.0),
        skills: SkillSet::default(),
        extraction: ExtractionStatus::Failed { chunks: 0 },
        flags: vec![CandidateFlag::EvaluationFailed],
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::LexiconTagger;
    use crate::ranking::test_support::{
        candidate, orchestrator, orchestrator_with, orchestrator_with_labeler,
        orchestrator_with_models, CountingEmbeddingModel, FlakyLabeler, PanickingLabeler,
        StubSummaryGenerator, TrackingSummaryGenerator, TEST_EMBEDDING_DIM, TEST_TOKEN_LIMIT,
    };

    const JD: &str = "Backend Engineer\n\nRequirements:\n- Python\n- SQL\n- Docker\n\nBenefits:\nDental";

    fn batch() -> Vec<CandidateInput> {
        vec![
            candidate("partial", "Skills:\nPython, Excel\n\nExperience\nAnalyst at a bank."),
            candidate("strong", "Skills:\nPython, SQL, Docker\n\nExperience\nBackend engineer."),
            candidate("none", "Skills:\nPainting, Pottery\n\nExperience\nArtist."),
        ]
    }

    #[tokio::test]
    async fn test_ranks_by_final_score() {
        let report = orchestrator()
            .rank(JD, &batch(), 2, &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<&str> = report.ranking.entries.iter().map(|e| e.id()).collect();
        assert_eq!(ids[0], "strong");
        assert_eq!(report.ranking.len(), 3);
        assert_eq!(report.completeness, RunCompleteness::Complete);
        for window in report.ranking.entries.windows(2) {
            assert!(window[0].breakdown.final_score >= window[1].breakdown.final_score);
        }
        let ranks: Vec<usize> = report.ranking.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_shortlist_and_gaps() {
        let report = orchestrator()
            .rank(JD, &batch(), 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.ranking.top_n, 2);
        assert_eq!(report.ranking.top().len(), 2);
        assert!(!report.ranking.entries[2].shortlisted);

        let strong = report.ranking.get("strong").unwrap();
        assert!(strong.missing_skills.is_empty());
        assert_eq!(strong.coverage_percentage, 100.0);
        assert!((strong.breakdown.skill_match_rate - 1.0).abs() < 1e-6);

        let none = report.ranking.get("none").unwrap();
        assert_eq!(none.missing_skills, vec!["docker", "python", "sql"]);
        assert_eq!(none.breakdown.skill_bonus, 0.0);

        assert_eq!(report.coverage.get("strong", "sql"), Some(true));
        assert_eq!(report.coverage.get("partial", "sql"), Some(false));
        assert_eq!(report.jd.skills.len(), 3);
    }

    #[tokio::test]
    async fn test_ties_keep_submission_order() {
        let resumes = vec![
            candidate("first", "Python developer."),
            candidate("second", "Python developer."),
            candidate("third", "Python developer."),
        ];
        let report = orchestrator()
            .rank(JD, &resumes, 3, &CancellationToken::new())
            .await
            .unwrap();
        let ids: Vec<&str> = report.ranking.entries.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_result_independent_of_worker_count() {
        let serial = orchestrator_with(|o| o.workers = 1)
            .rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        let parallel = orchestrator_with(|o| o.workers = 8)
            .rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        let a: Vec<_> = serial.ranking.breakdowns().cloned().collect();
        let b: Vec<_> = parallel.ranking.breakdowns().cloned().collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_submission_order_does_not_change_scores() {
        let orch = orchestrator();
        let forward = batch();
        let mut rotated = batch();
        rotated.rotate_right(1);

        let a = orch
            .rank(JD, &forward, 3, &CancellationToken::new())
            .await
            .unwrap();
        let b = orch
            .rank(JD, &rotated, 3, &CancellationToken::new())
            .await
            .unwrap();

        for entry in &a.ranking.entries {
            let other = b.ranking.get(entry.id()).unwrap();
            assert_eq!(entry.breakdown, other.breakdown);
            assert_eq!(entry.skills, other.skills);
        }
        assert_eq!(a.ranking.get("strong").unwrap().rank, 1);
        assert_eq!(b.ranking.get("strong").unwrap().rank, 1);
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let orch = orchestrator();
        let first = orch
            .rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        let second = orch
            .rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();

        let a: Vec<_> = first.ranking.breakdowns().cloned().collect();
        let b: Vec<_> = second.ranking.breakdowns().cloned().collect();
        assert_eq!(a, b);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_embedding_cache_is_scoped_to_one_run() {
        let model = Arc::new(CountingEmbeddingModel::new(TEST_EMBEDDING_DIM));
        let labeler = Arc::new(LexiconTagger::new(&[], TEST_TOKEN_LIMIT).unwrap());
        let orch = orchestrator_with_models(model.clone(), labeler, |o| o.workers = 1);

        orch.rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        let per_run = model.calls();
        assert!(per_run > 0);

        // A second run over the same texts recomputes everything: nothing was
        // retained from the first.
        orch.rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(model.calls(), 2 * per_run);
    }

    #[tokio::test]
    async fn test_duplicate_texts_share_cache_within_a_run() {
        let model = Arc::new(CountingEmbeddingModel::new(TEST_EMBEDDING_DIM));
        let labeler = Arc::new(LexiconTagger::new(&[], TEST_TOKEN_LIMIT).unwrap());
        let orch = orchestrator_with_models(model.clone(), labeler, |o| o.workers = 1);
        let resumes = vec![
            candidate("a", "Skills:\nPython\n\nExperience\nDeveloper."),
            candidate("b", "Skills:\nPython\n\nExperience\nDeveloper."),
        ];

        orch.rank(JD, &resumes, 2, &CancellationToken::new())
            .await
            .unwrap();
        // Two JD views plus two views of the shared resume text.
        assert_eq!(model.calls(), 4);
    }

    #[tokio::test]
    async fn test_panicking_candidate_does_not_abort_batch() {
        let orch = orchestrator_with_labeler(Arc::new(PanickingLabeler::on("CRASH")), |o| {
            o.workers = 2
        });
        let mut resumes = batch();
        resumes.push(candidate("crash", "Python, SQL and Docker. CRASH"));

        let report = orch
            .rank(JD, &resumes, 4, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.completeness, RunCompleteness::Complete);
        assert!(!report.ranking.is_empty());
        assert_eq!(report.ranking.len(), 4);
        assert_eq!(report.ranking.entries[0].id(), "strong");

        let crashed = report.ranking.get("crash").unwrap();
        assert_eq!(crashed.breakdown.final_score, 0.0);
        assert!(crashed.skills.is_empty());
        assert_eq!(crashed.flags, vec![CandidateFlag::EvaluationFailed]);
        assert!(matches!(crashed.extraction, ExtractionStatus::Failed { .. }));
        assert_eq!(crashed.rank, 4);
    }

    #[tokio::test]
    async fn test_top_n_zero_shortlists_everything() {
        let report = orchestrator()
            .rank(JD, &batch(), 0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.ranking.top_n, 3);
        assert!(report.ranking.entries.iter().all(|e| e.shortlisted));
    }

    #[tokio::test]
    async fn test_empty_resume_scores_zero_and_is_flagged() {
        let resumes = vec![candidate("blank", "   "), candidate("real", "Python and SQL.")];
        let report = orchestrator()
            .rank(JD, &resumes, 2, &CancellationToken::new())
            .await
            .unwrap();
        let blank = report.ranking.get("blank").unwrap();
        assert_eq!(blank.breakdown.final_score, 0.0);
        assert!(blank.flags.contains(&CandidateFlag::EmptyInput));
        assert_eq!(blank.rank, 2);
    }

    #[tokio::test]
    async fn test_empty_jd_is_not_an_error() {
        let report = orchestrator()
            .rank("", &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.jd.skills.is_empty());
        assert!(report
            .ranking
            .entries
            .iter()
            .all(|e| e.breakdown.final_score == 0.0));
    }

    #[tokio::test]
    async fn test_rejects_oversized_batch() {
        let resumes: Vec<CandidateInput> = (0..31)
            .map(|i| candidate(&format!("r{i}"), "Python"))
            .collect();
        let err = orchestrator()
            .rank(JD, &resumes, 5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RankingError::Validation(ValidationError::BatchTooLarge { count: 31, max: 30 })
        ));
    }

    #[tokio::test]
    async fn test_rejects_oversized_document() {
        let orch = orchestrator_with(|o| o.limits.max_resume_bytes = 16);
        let resumes = vec![candidate("ok", "Python"), candidate("big", &"x".repeat(17))];
        let err = orch
            .rank("short jd", &resumes, 5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RankingError::Validation(ValidationError::DocumentTooLarge { ref id, bytes: 17, max: 16 }) if id == "big"
        ));

        let err = orch
            .rank(&"j".repeat(17), &resumes[..1], 5, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RankingError::Validation(ValidationError::DocumentTooLarge { ref id, .. }) if id == JD_DOCUMENT_ID
        ));
    }

    #[test]
    fn test_validation_of_ids() {
        let orch = orchestrator();
        assert_eq!(orch.validate(JD, &[]), Err(ValidationError::EmptyBatch));
        assert_eq!(
            orch.validate(JD, &[candidate("a", "x"), candidate(" ", "y")]),
            Err(ValidationError::EmptyCandidateId { index: 1 })
        );
        assert_eq!(
            orch.validate(JD, &[candidate("a", "x"), candidate("a", "y")]),
            Err(ValidationError::DuplicateCandidateId("a".to_string()))
        );
        assert_eq!(orch.validate(JD, &batch()), Ok(()));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator().rank(JD, &batch(), 3, &cancel).await.unwrap_err();
        assert!(matches!(err, RankingError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_returns_partial() {
        let orch = orchestrator_with(|o| o.workers = 1);
        let resumes: Vec<CandidateInput> = (0..20)
            .map(|i| candidate(&format!("r{i}"), &"Python SQL Docker. ".repeat(200)))
            .collect();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let handle = {
            let orch = orch.clone();
            let resumes = resumes.clone();
            tokio::spawn(async move { orch.rank(JD, &resumes, 5, &cancel).await })
        };
        // Let the first candidate through, then cancel.
        tokio::task::yield_now().await;
        trigger.cancel();

        match handle.await.unwrap() {
            Ok(report) => {
                if let RunCompleteness::Partial { processed, requested } = report.completeness {
                    assert_eq!(requested, 20);
                    assert_eq!(report.ranking.len(), processed);
                    assert!(processed < requested);
                } else {
                    assert_eq!(report.ranking.len(), 20);
                }
                for window in report.ranking.entries.windows(2) {
                    assert!(window[0].breakdown.final_score >= window[1].breakdown.final_score);
                }
            }
            Err(e) => assert!(matches!(e, RankingError::Cancelled)),
        }
    }

    #[tokio::test]
    async fn test_degraded_extraction_is_flagged() {
        let orch = orchestrator_with_labeler(Arc::new(FlakyLabeler::failing_on("BROKEN", 8)), |o| {
            o.workers = 2
        });
        let resumes = vec![candidate(
            "flaky",
            "Python and SQL every day. BROKEN chunk of text here. Docker builds at work daily.",
        )];
        let report = orch
            .rank("Python SQL Docker", &resumes, 1, &CancellationToken::new())
            .await
            .unwrap();
        let entry = report.ranking.get("flaky").unwrap();
        assert!(entry.flags.contains(&CandidateFlag::ExtractionDegraded));
        assert!(matches!(entry.extraction, ExtractionStatus::Degraded { .. }));
    }

    #[tokio::test]
    async fn test_explanations_only_for_shortlist() {
        let orch = orchestrator();
        let resumes = batch();
        let cancel = CancellationToken::new();
        let mut report = orch.rank(JD, &resumes, 1, &cancel).await.unwrap();
        let explainer = Explainer::Available(Arc::new(StubSummaryGenerator::succeeding()));
        orch.attach_explanations(&mut report, &explainer, JD, &resumes, &cancel)
            .await;

        let first = &report.ranking.entries[0];
        assert_eq!(
            first.explanation.as_deref(),
            Some(format!("summary for {}", first.id()).as_str())
        );
        assert!(report.ranking.entries[1..]
            .iter()
            .all(|e| e.explanation.is_none() && e.flags.is_empty()));
    }

    #[tokio::test]
    async fn test_summary_requests_are_bounded() {
        let orch = orchestrator();
        let resumes: Vec<CandidateInput> = (0..12)
            .map(|i| candidate(&format!("r{i}"), "Python developer."))
            .collect();
        let cancel = CancellationToken::new();
        let mut report = orch.rank(JD, &resumes, 0, &cancel).await.unwrap();

        let generator = Arc::new(TrackingSummaryGenerator::default());
        let explainer = Explainer::Available(generator.clone());
        orch.attach_explanations(&mut report, &explainer, JD, &resumes, &cancel)
            .await;

        assert!(report.ranking.entries.iter().all(|e| e.explanation.is_some()));
        assert!(generator.peak() >= 1);
        assert!(generator.peak() <= MAX_CONCURRENT_SUMMARIES);
    }

    #[tokio::test]
    async fn test_unavailable_explainer_flags_shortlist() {
        let orch = orchestrator();
        let resumes = batch();
        let cancel = CancellationToken::new();
        let mut report = orch.rank(JD, &resumes, 2, &cancel).await.unwrap();
        let before: Vec<_> = report.ranking.breakdowns().cloned().collect();
        orch.attach_explanations(&mut report, &Explainer::Unavailable, JD, &resumes, &cancel)
            .await;

        let after: Vec<_> = report.ranking.breakdowns().cloned().collect();
        assert_eq!(before, after);
        for entry in report.ranking.top() {
            assert!(entry.explanation.is_none());
            assert!(entry.flags.contains(&CandidateFlag::ExplanationUnavailable));
        }
    }

    #[tokio::test]
    async fn test_report_analytics() {
        let report = orchestrator()
            .rank(JD, &batch(), 3, &CancellationToken::new())
            .await
            .unwrap();
        let stats = report.stats.unwrap();
        assert_eq!(stats.count, 3);
        assert!(stats.min <= stats.median && stats.median <= stats.max);
        assert_eq!(report.most_missing_skills[0].skill, "docker");
        assert_eq!(report.most_missing_skills[0].candidates_missing, 2);
        assert_eq!(report.heatmap.len(), 3 * 3);
    }
}
