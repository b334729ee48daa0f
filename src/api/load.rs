use super::{form::FormFields, resolve_connector, AppError, HubAppState};
use crate::credentials::Credentials;
use crate::integrations;
use axum::{
    extract::{Path, State},
    response::Json,
};
use crmhub_model::NormalizedRecord;
use std::sync::Arc;
use tracing::debug;

/// POST /integrations/:provider/load
///
/// Form field `credentials` carries the token blob as a JSON string. Returns
/// the normalized records in provider order.
///
/// # Errors
/// - 404: unknown provider
/// - 400: missing field, or credentials that are not a token blob
/// - 401: expired or rejected token
/// - 502: provider failure or rate limit
pub(super) async fn load_items(
    State(state): State<Arc<HubAppState>>,
    Path(provider_name): Path<String>,
    form: Result<FormFields, AppError>,
) -> Result<Json<Vec<NormalizedRecord>>, AppError> {
    let (provider, connector) = resolve_connector(&state, &provider_name)?;

    let form = form?;
    let raw = form.require("credentials")?;
    let credentials = Credentials::parse(raw).map_err(|e| {
        debug!(provider = %provider, error = %e, "Rejecting credentials");
        AppError::BadRequest(e.to_string())
    })?;

    let records = integrations::load_records(connector.as_ref(), &credentials).await?;
    Ok(Json(records))
}
