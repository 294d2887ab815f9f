use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::documents::DocumentFormat;
use crate::errors::AppError;
use crate::ranking::export::to_csv;
use crate::ranking::models::{CandidateInput, RankingReport};
use crate::ranking::ValidationError;
use crate::state::AppState;

pub const CSV_FILE_NAME: &str = "candidate_ranking.csv";

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub jd_text: String,
    pub resumes: Vec<CandidateInput>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub include_summaries: bool,
}

/// POST /api/v1/rankings
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankingReport>, AppError> {
    let report = run_ranking(
        &state,
        &req.jd_text,
        &req.resumes,
        req.top_n,
        req.include_summaries,
    )
    .await?;
    Ok(Json(report))
}

/// POST /api/v1/rankings/upload
/// Multipart: `jd_text`, optional `top_n` and `include_summaries`, then one
/// file field per resume. The file name becomes the candidate id.
pub async fn handle_rank_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RankingReport>, AppError> {
    let max_resumes = state.orchestrator.limits().max_resumes;
    let mut jd_text: Option<String> = None;
    let mut top_n: Option<usize> = None;
    let mut include_summaries = false;
    let mut resumes: Vec<CandidateInput> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "jd_text" => jd_text = Some(field.text().await?),
            "top_n" => {
                let raw = field.text().await?;
                let value = raw.trim().parse::<usize>().map_err(|_| {
                    AppError::Validation(format!("top_n must be a non-negative integer, got '{raw}'"))
                })?;
                top_n = Some(value);
            }
            "include_summaries" => {
                let raw = field.text().await?;
                include_summaries = matches!(raw.trim(), "true" | "1" | "yes" | "on");
            }
            _ => {
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    return Err(AppError::Validation(format!(
                        "unexpected form field '{name}'"
                    )));
                };
                if resumes.len() == max_resumes {
                    return Err(ValidationError::BatchTooLarge {
                        count: resumes.len() + 1,
                        max: max_resumes,
                    }
                    .into());
                }
                let format =
                    DocumentFormat::detect(Some(&file_name), field.content_type())?;
                let bytes = field.bytes().await?;
                let loader = state.loader;
                let text = tokio::task::spawn_blocking(move || loader.load(&bytes, format))
                    .await
                    .map_err(|e| AppError::Internal(e.into()))??;
                resumes.push(CandidateInput {
                    id: file_name,
                    text,
                });
            }
        }
    }

    let jd_text =
        jd_text.ok_or_else(|| AppError::Validation("missing 'jd_text' field".to_string()))?;
    info!(files = resumes.len(), "upload received");

    let report = run_ranking(&state, &jd_text, &resumes, top_n, include_summaries).await?;
    Ok(Json(report))
}

/// POST /api/v1/rankings/export
/// Same body as `/api/v1/rankings`; responds with the full ranking as CSV.
pub async fn handle_rank_export(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = run_ranking(&state, &req.jd_text, &req.resumes, req.top_n, false).await?;
    let csv = to_csv(&report.ranking)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}

/// Ranks under a child of the shutdown token. The guard cancels it if the
/// handler future is dropped mid-run.
async fn run_ranking(
    state: &AppState,
    jd_text: &str,
    resumes: &[CandidateInput],
    top_n: Option<usize>,
    include_summaries: bool,
) -> Result<RankingReport, AppError> {
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let top_n = resolve_top_n(top_n, state.config.default_top_n);

    let mut report = state
        .orchestrator
        .rank(jd_text, resumes, top_n, &cancel)
        .await?;
    if include_summaries {
        state
            .orchestrator
            .attach_explanations(&mut report, &state.explainer, jd_text, resumes, &cancel)
            .await;
    }
    Ok(report)
}

fn resolve_top_n(requested: Option<usize>, default_top_n: usize) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => default_top_n,
    }
}
