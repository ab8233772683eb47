//! Activation: the guided steps over a converted dataset and the final
//! commit into the variant catalog.
//!
//! The brand, mapping and preview steps are pure reads; only the final
//! [`activate`] call mutates the catalog, under an `activating` claim so
//! two operators cannot commit the same session twice.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use eanflow_core::ean::normalize_gtin13;
use eanflow_core::error::CoreError;
use eanflow_core::matching::{detect_brand_column, match_brand, name_has_drifted, BrandColumnMatch};
use eanflow_core::naming::{
    check_name_uniqueness, generate_names, validate_template, NameTemplate, NameUniqueness,
};
use eanflow_core::status::SessionStatus;
use eanflow_core::types::DbId;
use eanflow_db::models::catalog::CreateEanVariant;
use eanflow_db::models::session::ImportSession;
use eanflow_db::repositories::{
    BrandRepo, ConflictRepo, SessionRepo, VariantRepo, INSERT_BATCH_SIZE,
};

use crate::error::AppError;
use crate::pipeline::record_failure;
use crate::state::AppState;
use crate::storage::{dataset_read_paths, StorageError};

/// Cap on row errors echoed back to the client.
const MAX_REPORTED_ROW_ERRORS: usize = 10;

/// How the brand for every activated variant is determined.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BrandChoice {
    /// Per-row brand values read from a dataset column.
    Column { column: String },
    /// One brand name applied to every row.
    Manual { name: String },
}

/// Request for the brand step: either probe the auto-detection or
/// validate a concrete choice.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BrandStepRequest {
    Detect,
    Column { column: String },
    Manual { name: String },
}

#[derive(Debug, Serialize)]
pub struct BrandStepResult {
    /// Auto-detected brand column, when probing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<BrandColumnMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_name: Option<String>,
    /// For column mode: distinct non-empty values in the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_values: Option<usize>,
    /// For column mode: how many of those resolve to an existing brand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_existing: Option<usize>,
    /// Values that would create new brands, capped for display.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_brands: Vec<String>,
    /// For manual mode: the existing brand this name resolves to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_brand_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct MappingStepRequest {
    pub color_column: String,
    pub size_column: String,
}

#[derive(Debug, Serialize)]
pub struct ColumnCoverage {
    pub column: String,
    pub non_empty: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MappingStepResult {
    pub color: ColumnCoverage,
    pub size: ColumnCoverage,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub template: NameTemplate,
}

#[derive(Debug, Serialize)]
pub struct NamePreview {
    pub row: usize,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResult {
    pub sample: Vec<NamePreview>,
    pub uniqueness: NameUniqueness,
    /// Template validation problems; non-empty means the template cannot
    /// be used for activation as-is.
    pub problems: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub brand: BrandChoice,
    pub color_column: String,
    pub size_column: String,
    pub template: NameTemplate,
}

#[derive(Debug, Serialize)]
pub struct ActivationOutcome {
    pub session_id: DbId,
    /// Variants actually inserted into the catalog.
    pub inserted: u64,
    /// Rows whose EAN superseded an existing active variant.
    pub duplicates: usize,
    /// Rows skipped by the per-row validation.
    pub row_error_count: usize,
    /// First few row errors, for display.
    pub row_errors: Vec<String>,
    /// Rows lost to skipped insert batches.
    pub batch_skipped_rows: usize,
    /// Advisory warnings, e.g. product-name drift on superseded EANs.
    pub warnings: Vec<String>,
}

/// Load the converted dataset for a session, accepting older storage
/// layouts for sessions converted before the current one.
pub async fn load_dataset(
    state: &AppState,
    session_id: DbId,
) -> Result<Vec<IndexMap<String, String>>, AppError> {
    for path in dataset_read_paths(session_id) {
        match state.storage.download(&path).await {
            Ok(bytes) => return Ok(eanflow_core::convert::rows_from_json_blob(&bytes)?),
            Err(StorageError::NotFound(_)) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(AppError::Core(CoreError::NotFound {
        entity: "activation dataset",
        id: session_id,
    }))
}

fn headers_of(rows: &[IndexMap<String, String>]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

fn require_column(headers: &[String], column: &str) -> Result<(), AppError> {
    if !headers.iter().any(|h| h == column) {
        return Err(AppError::BadRequest(format!(
            "Column '{column}' does not exist in the dataset"
        )));
    }
    Ok(())
}

/// Brand step: probe auto-detection or validate a concrete brand choice
/// against the dataset and the existing brand catalog.
pub async fn brand_step(
    state: &AppState,
    session: &ImportSession,
    request: BrandStepRequest,
) -> Result<BrandStepResult, AppError> {
    let rows = load_dataset(state, session.id).await?;
    let headers = headers_of(&rows);

    match request {
        BrandStepRequest::Detect => Ok(BrandStepResult {
            detected: detect_brand_column(&headers),
            column: None,
            manual_name: None,
            distinct_values: None,
            matched_existing: None,
            new_brands: Vec::new(),
            existing_brand_id: None,
        }),
        BrandStepRequest::Column { column } => {
            require_column(&headers, &column)?;
            let existing: Vec<(DbId, String)> = BrandRepo::list(&state.pool)
                .await?
                .into_iter()
                .map(|b| (b.id, b.name))
                .collect();

            let mut seen: HashSet<String> = HashSet::new();
            let mut matched = 0usize;
            let mut new_brands = Vec::new();
            for row in &rows {
                let Some(value) = row.get(&column) else { continue };
                if value.is_empty() || !seen.insert(value.to_lowercase()) {
                    continue;
                }
                if match_brand(value, &existing).is_some() {
                    matched += 1;
                } else if new_brands.len() < 20 {
                    new_brands.push(value.clone());
                }
            }

            Ok(BrandStepResult {
                detected: None,
                column: Some(column),
                manual_name: None,
                distinct_values: Some(seen.len()),
                matched_existing: Some(matched),
                new_brands,
                existing_brand_id: None,
            })
        }
        BrandStepRequest::Manual { name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::BadRequest("Brand name must not be empty".into()));
            }
            let existing = BrandRepo::find_by_name(&state.pool, &name).await?;
            Ok(BrandStepResult {
                detected: None,
                column: None,
                manual_name: Some(name),
                distinct_values: None,
                matched_existing: None,
                new_brands: Vec::new(),
                existing_brand_id: existing.map(|b| b.id),
            })
        }
    }
}

/// Mapping step: validate the color/size column choice and report how
/// well populated each column is.
pub async fn mapping_step(
    state: &AppState,
    session: &ImportSession,
    request: MappingStepRequest,
) -> Result<MappingStepResult, AppError> {
    let rows = load_dataset(state, session.id).await?;
    let headers = headers_of(&rows);
    require_column(&headers, &request.color_column)?;
    require_column(&headers, &request.size_column)?;

    let coverage = |column: &str| ColumnCoverage {
        column: column.to_string(),
        non_empty: rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|v| !v.is_empty()))
            .count(),
        total: rows.len(),
    };

    Ok(MappingStepResult {
        color: coverage(&request.color_column),
        size: coverage(&request.size_column),
    })
}

/// Preview step: generate names for the whole dataset, return a small
/// sample plus uniqueness statistics.
pub async fn preview_step(
    state: &AppState,
    session: &ImportSession,
    request: PreviewRequest,
) -> Result<PreviewResult, AppError> {
    let rows = load_dataset(state, session.id).await?;
    let problems = validate_template(&request.template);
    let names = generate_names(&request.template, &rows);

    let sample = names
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, name)| NamePreview {
            row: i + 1,
            name: name.clone(),
        })
        .collect();

    Ok(PreviewResult {
        sample,
        uniqueness: check_name_uniqueness(&names),
        problems,
    })
}

/// Commit a session into the variant catalog.
///
/// The `ready_for_activation` to `activating` claim makes the commit
/// exclusive; any error after the claim marks the session failed. The
/// per-row checks (valid EAN, non-empty color, size and generated name,
/// resolvable brand) skip bad rows instead of aborting, and rows whose
/// EAN already has an active variant supersede it.
pub async fn activate(
    state: &AppState,
    session_id: DbId,
    request: ActivateRequest,
) -> Result<ActivationOutcome, AppError> {
    let problems = validate_template(&request.template);
    if !problems.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Invalid name template: {}",
            problems.join("; ")
        )));
    }

    let session = SessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "import session",
            id: session_id,
        }))?;

    let claimed = SessionRepo::transition(
        &state.pool,
        session_id,
        SessionStatus::ReadyForActivation,
        SessionStatus::Activating,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Session {session_id} is in status '{}', expected 'ready_for_activation'",
            session.status
        )))
    })?;
    tracing::info!(session_id, "activation started");

    match run_activation(state, &claimed, &request).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            record_failure(state, session_id, &err).await;
            Err(err)
        }
    }
}

async fn run_activation(
    state: &AppState,
    session: &ImportSession,
    request: &ActivateRequest,
) -> Result<ActivationOutcome, AppError> {
    let rows = load_dataset(state, session.id).await?;
    let ean_column = session.ean_column.clone().ok_or_else(|| {
        AppError::Internal(format!("Session {} has no EAN column recorded", session.id))
    })?;

    let names = generate_names(&request.template, &rows);

    // Resolve brands up front. Column mode maps each distinct value to a
    // brand id, matching fuzzily against the existing catalog before
    // creating anything new.
    let manual_brand_id = match &request.brand {
        BrandChoice::Manual { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::BadRequest("Brand name must not be empty".into()));
            }
            Some(BrandRepo::find_or_create(&state.pool, name).await?.id)
        }
        BrandChoice::Column { .. } => None,
    };
    let brand_by_value = match &request.brand {
        BrandChoice::Column { column } => {
            Some(resolve_brand_column(state, &rows, column).await?)
        }
        BrandChoice::Manual { .. } => None,
    };

    let mut candidates: Vec<CreateEanVariant> = Vec::new();
    let mut row_errors: Vec<String> = Vec::new();
    let mut seen_eans: HashSet<String> = HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        let line = i + 1;
        let raw_ean = row.get(&ean_column).map(String::as_str).unwrap_or("");
        let Some(ean) = normalize_gtin13(raw_ean) else {
            row_errors.push(format!("Row {line}: missing or invalid EAN"));
            continue;
        };
        if seen_eans.contains(ean) {
            row_errors.push(format!("Row {line}: duplicate EAN {ean} within file"));
            continue;
        }

        let color = row
            .get(&request.color_column)
            .cloned()
            .unwrap_or_default();
        if color.is_empty() {
            row_errors.push(format!("Row {line}: missing color"));
            continue;
        }
        let size = row.get(&request.size_column).cloned().unwrap_or_default();
        if size.is_empty() {
            row_errors.push(format!("Row {line}: missing size"));
            continue;
        }
        let product_name = names[i].clone();
        if product_name.is_empty() {
            row_errors.push(format!("Row {line}: generated name is empty"));
            continue;
        }

        let brand_id = match (&manual_brand_id, &brand_by_value) {
            (Some(id), _) => *id,
            (None, Some(map)) => {
                let value = match &request.brand {
                    BrandChoice::Column { column } => {
                        row.get(column).map(String::as_str).unwrap_or("")
                    }
                    BrandChoice::Manual { .. } => "",
                };
                match map.get(&value.to_lowercase()) {
                    Some(id) => *id,
                    None => {
                        row_errors.push(format!("Row {line}: missing brand"));
                        continue;
                    }
                }
            }
            (None, None) => {
                return Err(AppError::Internal("brand resolution missing".into()));
            }
        };

        // Only a row that survives every check reserves its EAN; a failed
        // row must not block a later valid row carrying the same EAN.
        seen_eans.insert(ean.to_string());
        candidates.push(CreateEanVariant {
            ean: ean.to_string(),
            brand_id,
            color,
            size,
            product_name,
            session_id: session.id,
        });
    }

    // Duplicate handling: an incoming EAN that already has an active
    // variant supersedes it. Substantial product-name drift on those rows
    // is recorded as a conflict for operator review.
    let eans: Vec<String> = candidates.iter().map(|c| c.ean.clone()).collect();
    let existing_variants = VariantRepo::find_active_by_eans(&state.pool, &eans).await?;
    let existing_by_ean: HashMap<&str, &eanflow_db::models::catalog::EanVariant> =
        existing_variants.iter().map(|v| (v.ean.as_str(), v)).collect();

    let mut duplicates = 0usize;
    let mut supersede_ids: Vec<DbId> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    for candidate in &candidates {
        let Some(existing) = existing_by_ean.get(candidate.ean.as_str()) else {
            continue;
        };
        duplicates += 1;
        supersede_ids.push(existing.id);
        if name_has_drifted(&candidate.product_name, &existing.product_name) {
            warnings.push(format!(
                "EAN {}: incoming name '{}' differs from existing '{}'",
                candidate.ean, candidate.product_name, existing.product_name
            ));
            ConflictRepo::create(
                &state.pool,
                session.id,
                &candidate.ean,
                Some(existing.id),
                &candidate.product_name,
            )
            .await?;
        }
    }

    VariantRepo::deactivate_by_ids(&state.pool, &supersede_ids).await?;

    let mut inserted = 0u64;
    let mut batch_skipped_rows = 0usize;
    for batch in candidates.chunks(INSERT_BATCH_SIZE) {
        match VariantRepo::insert_batch(&state.pool, batch).await {
            Ok(count) => inserted += count,
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                tracing::warn!(
                    session_id = session.id,
                    batch_rows = batch.len(),
                    "insert batch skipped on unique violation"
                );
                batch_skipped_rows += batch.len();
            }
            Err(err) => return Err(err.into()),
        }
    }

    SessionRepo::set_activation_counts(&state.pool, session.id, inserted as i32, duplicates as i32)
        .await?;
    if SessionRepo::transition(
        &state.pool,
        session.id,
        SessionStatus::Activating,
        SessionStatus::Activated,
    )
    .await?
    .is_none()
    {
        tracing::warn!(session_id = session.id, "session left activating state elsewhere");
    }
    tracing::info!(
        session_id = session.id,
        inserted,
        duplicates,
        row_errors = row_errors.len(),
        "activation finished"
    );

    let row_error_count = row_errors.len();
    row_errors.truncate(MAX_REPORTED_ROW_ERRORS);
    Ok(ActivationOutcome {
        session_id: session.id,
        inserted,
        duplicates,
        row_error_count,
        row_errors,
        batch_skipped_rows,
        warnings,
    })
}

/// Map every distinct non-empty value of the brand column to a brand id,
/// lowercased for case-insensitive lookup during the row pass.
async fn resolve_brand_column(
    state: &AppState,
    rows: &[IndexMap<String, String>],
    column: &str,
) -> Result<HashMap<String, DbId>, AppError> {
    require_column(&headers_of(rows), column)?;
    let existing: Vec<(DbId, String)> = BrandRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();

    let mut resolved: HashMap<String, DbId> = HashMap::new();
    for row in rows {
        let Some(value) = row.get(column) else { continue };
        if value.is_empty() {
            continue;
        }
        let key = value.to_lowercase();
        if resolved.contains_key(&key) {
            continue;
        }
        let brand_id = match match_brand(value, &existing) {
            Some(id) => id,
            None => BrandRepo::find_or_create(&state.pool, value).await?.id,
        };
        resolved.insert(key, brand_id);
    }
    Ok(resolved)
}
