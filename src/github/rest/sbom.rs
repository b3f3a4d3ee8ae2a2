//! SBOM dependency listing via the dependency-graph endpoint.

use anyhow::Result;
use serde_json::Value;

use super::wrapper::RestWrapper;
use crate::github::graphql::json_path;

/// All SPDX packages of the repository's SBOM, or an empty list when the
/// dependency graph is unavailable.
pub async fn sbom_packages(wrapper: &mut RestWrapper) -> Result<Vec<Value>> {
    let sbom = wrapper.send_custom("/dependency-graph/sbom").await?;
    Ok(json_path(&sbom, &["sbom", "packages"])
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}
