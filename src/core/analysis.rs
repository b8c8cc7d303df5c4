use crate::domain::model::{AnalysisSummary, STATUS_CREATION_SUCCESSFUL};
use crate::domain::ports::QuickSightApi;
use crate::utils::error::{ExportError, Result};

pub const MAX_LISTED_ANALYSES: usize = 100;

/// Successfully created analyses, most recently updated first.
/// `None` when the caller may not list analyses.
pub async fn discover_analyses<Q: QuickSightApi>(quicksight: &Q) -> Result<Option<Vec<AnalysisSummary>>> {
    tracing::info!("Discovering analyses");
    let analyses = match quicksight.list_analyses(MAX_LISTED_ANALYSES).await {
        Ok(analyses) => analyses,
        Err(e) if e.is_access_denied() => {
            tracing::info!("AccessDeniedException while discovering analyses");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if analyses.len() >= MAX_LISTED_ANALYSES {
        tracing::info!("Too many analyses. Will consider first {}", MAX_LISTED_ANALYSES);
    }

    let mut analyses: Vec<AnalysisSummary> = analyses
        .into_iter()
        .filter(|a| a.status.as_deref() == Some(STATUS_CREATION_SUCCESSFUL))
        .collect();
    if analyses.is_empty() {
        return Err(ExportError::critical(
            "No analyses was found, please save your dashboard as an analysis first",
        ));
    }
    // stable sort keeps listing order between equal timestamps
    analyses.sort_by(|a, b| b.last_updated_time.cmp(&a.last_updated_time));
    Ok(Some(analyses))
}

/// Picks the analysis to export from an explicit id, or by name among the
/// listed analyses.
pub async fn choose_analysis<Q: QuickSightApi>(
    quicksight: &Q,
    analysis_id: Option<&str>,
    analysis_name: Option<&str>,
) -> Result<String> {
    if let Some(id) = analysis_id {
        return Ok(id.to_string());
    }

    let Some(name) = analysis_name else {
        return Err(ExportError::MissingConfigError {
            field: "Need a parameter --analysis-id or --analysis-name".to_string(),
        });
    };

    let Some(analyses) = discover_analyses(quicksight).await? else {
        return Err(ExportError::MissingConfigError {
            field: "analyses cannot be listed, need a parameter --analysis-id".to_string(),
        });
    };

    if let Some(found) = analyses.iter().find(|a| a.name == name) {
        tracing::info!("Selected analysis {} ({})", found.name, found.analysis_id);
        return Ok(found.analysis_id.clone());
    }

    let available: Vec<&str> = analyses.iter().map(|a| a.name.as_str()).collect();
    Err(ExportError::InvalidConfigValueError {
        field: "analysis_name".to_string(),
        value: name.to_string(),
        reason: format!("no such analysis, available: {}", available.join(", ")),
    })
}
