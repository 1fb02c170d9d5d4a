//! Provider search handler

use axum::{
    extract::{Query, State},
    Json,
};

use healthscore_core::logic::dataset::nppes::{normalize_npi, NPI_COLUMN, ORGANIZATION_NAME_COLUMN};
use healthscore_core::logic::dataset::Table;

use crate::models::{ProviderMatch, SearchParams, SearchResults, DEFAULT_SEARCH_LIMIT};
use crate::{AppError, AppResult, AppState};

/// Digits search NPIs, anything else searches organization names
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResults>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::ValidationError("Missing \"q\" query parameter".to_string()))?;
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let table: &Table = match (&state.directory, &state.features) {
        (Some(directory), _) => directory,
        (None, Some(features)) => features.table(),
        (None, None) => {
            return Err(AppError::Unavailable("Provider data not loaded".to_string()))
        }
    };

    let providers = search_table(table, query, limit);
    Ok(Json(SearchResults {
        count: providers.len(),
        providers,
    }))
}

/// Registry name column: the legal business name when present, else the
/// first column that looks like a name
fn name_column(table: &Table) -> Option<&str> {
    if table.has_column(ORGANIZATION_NAME_COLUMN) {
        return Some(ORGANIZATION_NAME_COLUMN);
    }
    table
        .headers()
        .iter()
        .map(String::as_str)
        .find(|h| {
            let lower = h.to_lowercase();
            lower.contains("name") || lower.contains("organization")
        })
}

pub fn search_table(table: &Table, query: &str, limit: usize) -> Vec<ProviderMatch> {
    let name_col = name_column(table);
    let by_npi = query.chars().all(|c| c.is_ascii_digit());
    let needle = query.to_lowercase();

    table
        .rows()
        .filter(|row| {
            if by_npi {
                row.get(NPI_COLUMN)
                    .is_some_and(|npi| normalize_npi(npi).contains(query))
            } else {
                name_col
                    .and_then(|c| row.get(c))
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            }
        })
        .take(limit)
        .map(|row| ProviderMatch {
            npi: row.get(NPI_COLUMN).map(normalize_npi).unwrap_or_default(),
            name: name_col
                .and_then(|c| row.get(c))
                .unwrap_or("N/A")
                .to_string(),
        })
        .collect()
}
