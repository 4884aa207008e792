//! Azure DevOps / TFS REST client.
//!
//! Endpoints used, relative to the collection URL:
//! - `{project}/_apis/build/definitions`
//! - `{project}/_apis/build/builds?definitions=1,2`
//! - `{project}/_apis/build/builds/{id}/artifacts`
//!
//! List responses are paged; the next page is requested with the token
//! returned in the `x-ms-continuationtoken` header.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::BuildSystemConfig;
use crate::error::{PlanError, PlanResult};

use super::client::{Build, BuildArtifact, BuildDefinition, BuildSystemClient};

const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";
const CONTINUATION_PARAM: &str = "continuationToken";

/// HTTP client for an Azure DevOps collection.
#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    client: Client,
    api_version: String,
    token: Option<String>,
}

impl AzureDevOpsClient {
    /// Create a client from configuration.
    pub fn new(config: &BuildSystemConfig) -> PlanResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(PlanError::Http)?;

        Ok(Self {
            client,
            api_version: config.api_version.clone(),
            token: config.token.clone(),
        })
    }

    /// Build `{base}/{project}/_apis/build/{segments..}?api-version=…`.
    pub(crate) fn endpoint(&self, base: &Url, project: &str, segments: &[&str]) -> PlanResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| PlanError::validation(format!("cannot use '{}' as a base URL", base)))?
            .pop_if_empty()
            .push(project)
            .extend(["_apis", "build"])
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Fetch every page of a list endpoint.
    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> PlanResult<Vec<T>> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = page_url(&url, continuation.as_deref());
            debug!(url = %page, "querying build system");
            let mut request = self.client.get(page.clone());
            if let Some(token) = &self.token {
                request = request.basic_auth("", Some(token));
            }

            let response = request.send().await.map_err(PlanError::Http)?;
            if !response.status().is_success() {
                return Err(PlanError::build_system(format!(
                    "GET {} returned {}",
                    page,
                    response.status()
                )));
            }

            let next = continuation_token(response.headers());
            let list: ListResponse<T> = response.json().await.map_err(PlanError::Http)?;
            items.extend(list.value);

            match next {
                None => return Ok(items),
                Some(token) if continuation.as_deref() == Some(token.as_str()) => {
                    return Err(PlanError::build_system(format!(
                        "GET {} repeated continuation token '{}'",
                        url, token
                    )));
                }
                Some(token) => continuation = Some(token),
            }
        }
    }
}

#[async_trait]
impl BuildSystemClient for AzureDevOpsClient {
    async fn list_build_definitions(
        &self,
        url: &Url,
        sub_paths: &[String],
        name_filter: Option<&Regex>,
    ) -> PlanResult<Vec<BuildDefinition>> {
        let mut definitions = Vec::new();
        for project in sub_paths {
            let endpoint = self.endpoint(url, project, &["definitions"])?;
            let raw: Vec<RawDefinition> = self.get_list(endpoint).await?;
            definitions.extend(
                raw.into_iter()
                    .map(|d| d.into_definition(project))
                    .filter(|d| name_filter.is_none_or(|re| re.is_match(&d.name))),
            );
        }
        Ok(definitions)
    }

    async fn list_builds(
        &self,
        url: &Url,
        definitions: &[BuildDefinition],
    ) -> PlanResult<Vec<Build>> {
        let mut by_project: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for definition in definitions {
            by_project
                .entry(definition.project.as_str())
                .or_default()
                .push(definition.id.to_string());
        }

        let mut builds = Vec::new();
        for (project, ids) in by_project {
            let mut endpoint = self.endpoint(url, project, &["builds"])?;
            endpoint
                .query_pairs_mut()
                .append_pair("definitions", &ids.join(","));
            let raw: Vec<RawBuild> = self.get_list(endpoint).await?;
            builds.extend(raw.into_iter().map(Build::from));
        }
        Ok(builds)
    }

    async fn list_artifacts(
        &self,
        url: &Url,
        project: &str,
        build: &Build,
    ) -> PlanResult<Vec<BuildArtifact>> {
        let id = build.id.ok_or_else(|| {
            PlanError::build_system(format!("build {} has no numeric id", build.number))
        })?;
        let id = id.to_string();
        let endpoint = self.endpoint(url, project, &["builds", id.as_str(), "artifacts"])?;
        let raw: Vec<RawArtifact> = self.get_list(endpoint).await?;
        Ok(raw.into_iter().map(BuildArtifact::from).collect())
    }
}

/// `url` with the continuation token of the page to fetch, if any.
fn page_url(url: &Url, continuation: Option<&str>) -> Url {
    let mut url = url.clone();
    if let Some(token) = continuation {
        url.query_pairs_mut().append_pair(CONTINUATION_PARAM, token);
    }
    url
}

fn continuation_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTINUATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Envelope of every list endpoint.
#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Deserialize, Default)]
struct RawProjectRef {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct RawDefinition {
    id: u64,
    name: String,
    #[serde(default)]
    project: Option<RawProjectRef>,
}

impl RawDefinition {
    fn into_definition(self, fallback_project: &str) -> BuildDefinition {
        let project = self
            .project
            .map(|p| p.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_project.to_string());
        BuildDefinition {
            id: self.id,
            name: self.name,
            project,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawDefinitionRef {
    #[serde(default)]
    id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuild {
    #[serde(default)]
    id: Option<u64>,
    build_number: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    keep_forever: bool,
    #[serde(default)]
    url: String,
    #[serde(default)]
    project: RawProjectRef,
    #[serde(default)]
    definition: RawDefinitionRef,
}

impl From<RawBuild> for Build {
    fn from(raw: RawBuild) -> Self {
        Self {
            id: raw.id,
            number: raw.build_number,
            uri: raw.uri,
            status: raw.status.unwrap_or_default(),
            result: raw.result.unwrap_or_default(),
            keep_forever: raw.keep_forever,
            url: raw.url,
            project: raw.project.name,
            definition_id: raw.definition.id,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawResource {
    #[serde(default)]
    download_url: String,
}

#[derive(Deserialize)]
struct RawArtifact {
    name: String,
    #[serde(default)]
    resource: RawResource,
}

impl From<RawArtifact> for BuildArtifact {
    fn from(raw: RawArtifact) -> Self {
        Self {
            name: raw.name,
            download_url: raw.resource.download_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AzureDevOpsClient {
        AzureDevOpsClient::new(&BuildSystemConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_project_and_version() {
        let base = Url::parse("https://tfs.example.com/DefaultCollection/").unwrap();
        let url = client()
            .endpoint(&base, "Payments Platform", &["builds", "42", "artifacts"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            concat!(
                "https://tfs.example.com/DefaultCollection/Payments%20Platform",
                "/_apis/build/builds/42/artifacts?api-version=6.0"
            )
        );
    }

    #[test]
    fn test_next_page_carries_continuation_token() {
        let base = Url::parse("https://tfs.example.com/Main/").unwrap();
        let first = client().endpoint(&base, "Payments", &["builds"]).unwrap();

        assert_eq!(page_url(&first, None), first);
        let next = page_url(&first, Some("2024-01-31T10:00:00.000Z"));
        let pairs: Vec<(String, String)> = next.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("api-version".to_string(), "6.0".to_string()),
                ("continuationToken".to_string(), "2024-01-31T10:00:00.000Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_continuation_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(continuation_token(&headers), None);

        headers.insert(CONTINUATION_HEADER, "  ".parse().unwrap());
        assert_eq!(continuation_token(&headers), None);

        headers.insert(CONTINUATION_HEADER, "abc123".parse().unwrap());
        assert_eq!(continuation_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_endpoint_rejects_non_base_url() {
        let base = Url::parse("mailto:ops@example.com").unwrap();
        assert!(client().endpoint(&base, "P", &["definitions"]).is_err());
    }

    #[test]
    fn test_parse_builds_payload() {
        let json = r#"{
            "count": 1,
            "value": [{
                "id": 981,
                "buildNumber": "1.2.3",
                "uri": "vstfs:///Build/Build/981",
                "status": "completed",
                "result": "succeeded",
                "keepForever": true,
                "url": "https://tfs/org/Payments/_apis/build/Builds/981",
                "project": {"name": "Payments"},
                "definition": {"id": 12, "name": "Payments-CI"}
            }]
        }"#;

        let list: ListResponse<RawBuild> = serde_json::from_str(json).unwrap();
        let build = Build::from(list.value.into_iter().next().unwrap());

        assert_eq!(build.id, Some(981));
        assert_eq!(build.number, "1.2.3");
        assert!(build.keep_forever);
        assert_eq!(build.project, "Payments");
        assert_eq!(build.definition_id, 12);
    }

    #[test]
    fn test_parse_artifacts_payload() {
        let json = r#"{"value": [
            {"name": "logs", "resource": {"downloadUrl": "https://tfs/a/logs.zip"}},
            {"name": "drop", "resource": {"downloadUrl": "https://tfs/a/drop.zip"}}
        ]}"#;

        let list: ListResponse<RawArtifact> = serde_json::from_str(json).unwrap();
        let artifacts: Vec<BuildArtifact> = list.value.into_iter().map(Into::into).collect();

        assert_eq!(artifacts[1].name, "drop");
        assert_eq!(artifacts[1].download_url, "https://tfs/a/drop.zip");
    }

    #[test]
    fn test_definition_falls_back_to_queried_project() {
        let raw: RawDefinition = serde_json::from_str(r#"{"id": 3, "name": "CI"}"#).unwrap();
        assert_eq!(raw.into_definition("Payments").project, "Payments");
    }
}
