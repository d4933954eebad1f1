//! API route handlers

pub mod filters;
pub mod health;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

use crate::api::types::ApiError;
use crate::data::TaskRepository;

/// Reject callers that do not belong to the workspace
pub(crate) async fn require_workspace_member(
    repository: &dyn TaskRepository,
    workspace_id: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let is_member = repository
        .is_workspace_member(workspace_id, user_id)
        .await
        .map_err(ApiError::from_data)?;

    if !is_member {
        tracing::debug!(workspace_id, user_id, "Workspace access denied");
        return Err(ApiError::forbidden(
            "ACCESS_DENIED",
            "Not a member of this workspace",
        ));
    }
    Ok(())
}
