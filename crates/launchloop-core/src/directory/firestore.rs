//! FirestoreDirectory: campaign documents over the Firestore REST API.
//!
//! Documents live at
//! `{base_url}/projects/{project}/databases/(default)/documents/{collection}/{id}`
//! and carry typed field values (`stringValue`, `integerValue`, `arrayValue`).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use super::CampaignDirectory;
use crate::campaign::CampaignMetadata;
use crate::error::{ConfigError, RemoteError};
use crate::storage::DirectoryConfig;

/// Client for the remote campaign collection.
pub struct FirestoreDirectory {
    http_client: Client,
    base_url: Url,
    project_id: String,
    collection: String,
    api_key: Option<String>,
}

impl FirestoreDirectory {
    /// Create a client from the `[directory]` config section.
    ///
    /// # Errors
    /// Returns an error if the project id is blank or the base URL is invalid.
    pub fn new(config: &DirectoryConfig) -> Result<Self, ConfigError> {
        if config.project_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "directory.project_id".into(),
                message: "must be set to reach the campaign directory".into(),
            });
        }
        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "directory.base_url".into(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "directory.base_url".into(),
                message: "not a base URL".into(),
            });
        }
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "directory.timeout_secs".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url,
            project_id: config.project_id.trim().to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn document_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                self.collection.as_str(),
                id,
            ]);
        }
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    async fn error_from(resp: Response) -> RemoteError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        RemoteError::Http { status, message }
    }
}

#[async_trait]
impl CampaignDirectory for FirestoreDirectory {
    async fn get(&self, id: &str) -> Result<Option<CampaignMetadata>, RemoteError> {
        let url = self.document_url(id);
        debug!(%id, "fetching campaign");
        let resp = self.http_client.get(url).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        let doc: Value = resp.json().await?;
        decode_document(id, &doc).map(Some)
    }

    async fn put(&self, metadata: &CampaignMetadata) -> Result<(), RemoteError> {
        let url = self.document_url(&metadata.campaign_id);
        let resp = self
            .http_client
            .patch(url)
            .json(&encode_document(metadata))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        info!(id = %metadata.campaign_id, "campaign written");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let resp = self.http_client.delete(self.document_url(id)).send().await?;

        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(Self::error_from(resp).await);
        }
        info!(%id, "campaign deleted");
        Ok(())
    }
}

/// Encode metadata as a Firestore document body.
pub fn encode_document(meta: &CampaignMetadata) -> Value {
    let names: Vec<Value> = meta
        .package_names
        .iter()
        .map(|n| json!({ "stringValue": n }))
        .collect();

    json!({
        "fields": {
            "campaignId": { "stringValue": meta.campaign_id },
            "googleGroupEmail": { "stringValue": meta.google_group_email },
            "packageName": { "stringValue": meta.package_name },
            "package_names": { "arrayValue": { "values": names } },
            "created_at": { "integerValue": meta.created_at.to_string() },
            "creator_device_id": { "stringValue": meta.creator_device_id },
        }
    })
}

/// Decode a Firestore document. Missing string fields read as empty.
pub fn decode_document(id: &str, doc: &Value) -> Result<CampaignMetadata, RemoteError> {
    let empty = Map::new();
    let fields = match doc.get("fields") {
        Some(Value::Object(map)) => map,
        Some(_) => return Err(RemoteError::Decode("`fields` is not an object".into())),
        None => &empty,
    };

    let string = |name: &str| {
        fields
            .get(name)
            .and_then(|v| v["stringValue"].as_str())
            .unwrap_or_default()
            .to_string()
    };

    let created_at = match fields.get("created_at").map(|v| &v["integerValue"]) {
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map_err(|e| RemoteError::Decode(format!("created_at: {e}")))?,
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        _ => 0,
    };

    let package_names = fields
        .get("package_names")
        .and_then(|v| v["arrayValue"]["values"].as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v["stringValue"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let campaign_id = match string("campaignId") {
        s if s.is_empty() => id.to_string(),
        s => s,
    };

    Ok(CampaignMetadata {
        campaign_id,
        google_group_email: string("googleGroupEmail"),
        package_name: string("packageName"),
        package_names,
        created_at,
        creator_device_id: string("creator_device_id"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockito::{Matcher, Server};

    const DOC_PATH: &str = "/v1/projects/demo/databases/(default)/documents/campaigns/ABCD1234";

    fn config(base_url: &str) -> DirectoryConfig {
        DirectoryConfig {
            base_url: format!("{base_url}/v1"),
            project_id: "demo".into(),
            ..Default::default()
        }
    }

    fn sample() -> CampaignMetadata {
        CampaignMetadata::new(
            "ABCD1234",
            "testers@googlegroups.com",
            "com.example.app",
            1_700_000_000_000,
            "launchloop-dev",
        )
    }

    #[test]
    fn blank_project_is_rejected() {
        let cfg = DirectoryConfig::default();
        assert!(matches!(
            FirestoreDirectory::new(&cfg),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn document_url_layout() {
        let mut cfg = config("https://firestore.example");
        cfg.api_key = Some("k".into());
        let dir = FirestoreDirectory::new(&cfg).unwrap();
        assert_eq!(
            dir.document_url("ABCD1234").as_str(),
            "https://firestore.example/v1/projects/demo/databases/(default)/documents/campaigns/ABCD1234?key=k"
        );
    }

    #[test]
    fn decode_tolerates_missing_fields() {
        let doc = json!({ "fields": { "packageName": { "stringValue": "com.app" } } });
        let meta = decode_document("ID", &doc).unwrap();
        assert_eq!(meta.campaign_id, "ID");
        assert_eq!(meta.package_name, "com.app");
        assert_eq!(meta.google_group_email, "");
        assert!(meta.package_names.is_empty());
        assert_eq!(meta.created_at, 0);
    }

    #[test]
    fn encode_then_decode_preserves_metadata() {
        let meta = sample();
        assert_eq!(decode_document("ABCD1234", &encode_document(&meta)).unwrap(), meta);
    }

    #[tokio::test]
    async fn get_existing_document() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", DOC_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(encode_document(&sample()).to_string())
            .create_async()
            .await;

        let dir = FirestoreDirectory::new(&config(&server.url())).unwrap();
        let meta = dir.get("ABCD1234").await.unwrap();

        mock.assert_async().await;
        assert_eq!(meta, Some(sample()));
    }

    #[tokio::test]
    async fn get_missing_document_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", DOC_PATH)
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"Document not found","status":"NOT_FOUND"}}"#)
            .create_async()
            .await;

        let dir = FirestoreDirectory::new(&config(&server.url())).unwrap();
        assert_eq!(dir.get("ABCD1234").await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_carries_message() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", DOC_PATH)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let dir = FirestoreDirectory::new(&config(&server.url())).unwrap();
        let err = dir.get("ABCD1234").await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Http {
                status: 403,
                message: "Missing or insufficient permissions.".into()
            }
        );
    }

    #[tokio::test]
    async fn put_patches_document_with_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", DOC_PATH)
            .match_query(Matcher::UrlEncoded("key".into(), "k".into()))
            .match_body(Matcher::PartialJson(json!({
                "fields": { "packageName": { "stringValue": "com.example.app" } }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let mut cfg = config(&server.url());
        cfg.api_key = Some("k".into());
        let dir = FirestoreDirectory::new(&cfg).unwrap();
        dir.put(&sample()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_missing_document_is_ok() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", DOC_PATH)
            .with_status(404)
            .create_async()
            .await;

        let dir = FirestoreDirectory::new(&config(&server.url())).unwrap();
        dir.delete("ABCD1234").await.unwrap();
        mock.assert_async().await;
    }
}
