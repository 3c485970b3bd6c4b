//! Typed wrappers for the three query shapes the dashboard consumes.
//!
//! Each wrapper issues the query through [`transport::execute`] and lifts
//! the nested response into domain models, mapping a null project/run to
//! [`TransportError::NotFound`].

use serde_json::{Value, json};

use super::models::{RunDetail, RunSummary};
use super::transport::{self, TransportError};
use crate::settings::ConnectionSettings;

/// Fixed page size for the run list; pagination beyond this window is out of
/// scope.
pub const RUN_PAGE_SIZE: i64 = 50;

const PROJECT_QUERY: &str = "\
query Validate($entity:String!, $project:String!){
  project(name:$project, entityName:$entity){ id name entityName }
}";

const RUN_LIST_QUERY: &str = "\
query Runs($entity:String!,$project:String!,$limit:Int!){
  project(name:$project, entityName:$entity){
    id
    name
    runs(first:$limit, order: { direction: DESC, orderKey: CREATED_AT }){
      edges{
        node{
          id
          name
          displayName
          state
          createdAt
          finishedAt
          user{ name }
          tags
          sweepName
          jobSummaryMetrics
        }
      }
    }
  }
}";

const RUN_DETAIL_QUERY: &str = "\
query Run($entity:String!,$project:String!,$name:String!){
  project(name:$project, entityName:$entity){
    run(name:$name){
      id
      name
      displayName
      state
      createdAt
      finishedAt
      tags
      notes
      jobSummaryMetrics
      historyKeys
    }
  }
}";

/// Identity of a validated project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub entity_name: String,
}

/// Check that the configured project exists and the key grants access.
pub fn validate_project(settings: &ConnectionSettings) -> Result<ProjectInfo, TransportError> {
    let variables = json!({
        "entity": settings.entity.trim(),
        "project": settings.project.trim(),
    });
    let data = transport::execute(PROJECT_QUERY, variables, &settings.api_key)?;
    project_from_response(&data)
}

/// Fetch the most recently created runs for the configured project.
pub fn fetch_runs(settings: &ConnectionSettings) -> Result<Vec<RunSummary>, TransportError> {
    let variables = json!({
        "entity": settings.entity.trim(),
        "project": settings.project.trim(),
        "limit": RUN_PAGE_SIZE,
    });
    let data = transport::execute(RUN_LIST_QUERY, variables, &settings.api_key)?;
    runs_from_response(&data)
}

/// Fetch the full record for one run, keyed by name.
pub fn fetch_run_detail(
    settings: &ConnectionSettings,
    run_name: &str,
) -> Result<RunDetail, TransportError> {
    let variables = json!({
        "entity": settings.entity.trim(),
        "project": settings.project.trim(),
        "name": run_name,
    });
    let data = transport::execute(RUN_DETAIL_QUERY, variables, &settings.api_key)?;
    detail_from_response(&data)
}

fn project_from_response(data: &Value) -> Result<ProjectInfo, TransportError> {
    let project = data.get("project").filter(|p| !p.is_null()).ok_or(
        TransportError::NotFound,
    )?;
    let name = project
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let entity_name = project
        .get("entityName")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(ProjectInfo { name, entity_name })
}

fn runs_from_response(data: &Value) -> Result<Vec<RunSummary>, TransportError> {
    let project = data.get("project").filter(|p| !p.is_null()).ok_or(
        TransportError::NotFound,
    )?;
    let edges = project
        .pointer("/runs/edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut runs = Vec::with_capacity(edges.len());
    for edge in edges {
        let Some(node) = edge.get("node").filter(|n| !n.is_null()) else {
            continue;
        };
        match serde_json::from_value::<RunSummary>(node.clone()) {
            Ok(run) => runs.push(run),
            Err(err) => {
                // One malformed node must not take down the whole list.
                tracing::warn!("Skipping undecodable run node: {err}");
            }
        }
    }
    Ok(runs)
}

fn detail_from_response(data: &Value) -> Result<RunDetail, TransportError> {
    let run = data
        .pointer("/project/run")
        .filter(|r| !r.is_null())
        .ok_or(TransportError::NotFound)?;
    serde_json::from_value::<RunDetail>(run.clone())
        .map_err(|err| TransportError::InvalidBody(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runs_are_lifted_from_edges() {
        let data = json!({
            "project": {
                "id": "p1",
                "name": "demo",
                "runs": {
                    "edges": [
                        {"node": {
                            "id": "r1",
                            "name": "warm-dawn-1",
                            "state": "finished",
                            "tags": [],
                            "jobSummaryMetrics": {"loss": 0.2}
                        }},
                        {"node": null}
                    ]
                }
            }
        });
        let runs = runs_from_response(&data).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "warm-dawn-1");
    }

    #[test]
    fn null_project_is_not_found() {
        let data = json!({ "project": null });
        assert!(matches!(
            runs_from_response(&data).unwrap_err(),
            TransportError::NotFound
        ));
        assert!(matches!(
            project_from_response(&data).unwrap_err(),
            TransportError::NotFound
        ));
    }

    #[test]
    fn null_run_is_not_found() {
        let data = json!({ "project": { "run": null } });
        assert!(matches!(
            detail_from_response(&data).unwrap_err(),
            TransportError::NotFound
        ));
    }

    #[test]
    fn detail_is_lifted_from_nested_run() {
        let data = json!({
            "project": {
                "run": {
                    "id": "r2",
                    "name": "brisk-sun-2",
                    "state": "running",
                    "notes": "lr sweep",
                    "jobSummaryMetrics": "{\"train_loss\": 0.9}",
                    "historyKeys": {"keys": {"train_loss": {}}}
                }
            }
        });
        let detail = detail_from_response(&data).unwrap();
        assert_eq!(detail.name, "brisk-sun-2");
        assert_eq!(detail.notes.as_deref(), Some("lr sweep"));
        assert_eq!(detail.history_keys, vec!["train_loss"]);
        assert_eq!(
            detail.summary_metrics.get("train_loss"),
            Some(&json!(0.9))
        );
    }

    #[test]
    fn project_info_is_lifted() {
        let data = json!({
            "project": {"id": "p1", "name": "demo", "entityName": "acme"}
        });
        let info = project_from_response(&data).unwrap();
        assert_eq!(info.name, "demo");
        assert_eq!(info.entity_name, "acme");
    }
}
