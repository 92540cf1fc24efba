use super::message::extract_remote_message;
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::{FileUpload, OptionsStrategy, PatchOutcome, PropertyStore, PropertyValues, UploadedFile};
use crate::error::{ConfigError, GatewayError};
use crate::normalize::PatchPayload;
use crate::settings::GatewayConfig;
use crate::value::{OptionSet, SelectOption};
use ahash::AHashSet;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, error, warn};

const PIPELINE_KEY: &str = "pipeline";
const STAGE_KEY: &str = "dealstage";

// --- Wire formats ---

#[derive(Deserialize)]
struct WireOption {
    label: String,
    value: String,
}

#[derive(Deserialize)]
struct PropertyDefinition {
    name: String,
    #[serde(default)]
    options: Vec<WireOption>,
}

impl PropertyDefinition {
    fn into_options(self) -> Vec<SelectOption> {
        self.options
            .into_iter()
            .map(|o| SelectOption::new(o.label, o.value))
            .collect()
    }
}

#[derive(Deserialize)]
struct PropertyList {
    results: Vec<PropertyDefinition>,
}

#[derive(Deserialize)]
struct PipelineStage {
    id: String,
    label: String,
}

#[derive(Deserialize)]
struct Pipeline {
    id: String,
    label: String,
    #[serde(default)]
    stages: Vec<PipelineStage>,
}

#[derive(Deserialize)]
struct PipelineList {
    results: Vec<Pipeline>,
}

#[derive(Deserialize)]
struct ObjectRecord {
    #[serde(default)]
    properties: PropertyValues,
}

#[derive(Deserialize)]
struct FileRecord {
    url: Option<String>,
}

/// A [`PropertyStore`] backed by the CRM's v3 REST API.
pub struct CrmGateway<T: Transport> {
    transport: T,
    object_type: String,
    options_strategy: OptionsStrategy,
    file_access: String,
}

impl CrmGateway<ReqwestTransport> {
    /// Builds a gateway over HTTPS from settings. Fails without a token.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let token = config.token()?;
        let transport = ReqwestTransport::new(&config.base_url, token, config.timeout())?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> CrmGateway<T> {
    pub fn new(transport: T, config: &GatewayConfig) -> Self {
        Self {
            transport,
            object_type: config.object_type.clone(),
            options_strategy: config.options_strategy,
            file_access: config.file_access.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn properties_path(&self) -> String {
        format!("/crm/v3/properties/{}", self.object_type)
    }

    fn object_path(&self, object_id: &str) -> String {
        format!(
            "/crm/v3/objects/{}/{}",
            self.object_type,
            urlencoding::encode(object_id)
        )
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let path = request.path.clone();
        self.transport.send(request).await.inspect_err(|e| {
            error!(%path, error = %e, "request failed before reaching the remote");
        })
    }

    /// One request per key. Remote refusals and unparseable bodies skip the key.
    async fn fetch_options_per_property(&self, keys: &[String]) -> Result<OptionSet, GatewayError> {
        let mut result = OptionSet::default();
        for key in keys {
            let path = format!("{}/{}", self.properties_path(), urlencoding::encode(key));
            let response = self.send(ApiRequest::get(path)).await?;

            if !response.is_success() {
                warn!(
                    property = %key,
                    status = response.status,
                    message = %extract_remote_message(&response.body, response.status),
                    "skipping property options"
                );
                continue;
            }

            let definition: PropertyDefinition = match response.parse("property definition") {
                Ok(definition) => definition,
                Err(e) => {
                    warn!(property = %key, error = %e, "skipping property options");
                    continue;
                }
            };

            let options = definition.into_options();
            if options.is_empty() {
                debug!(property = %key, "no options returned");
                continue;
            }
            result.insert(key.clone(), options);
        }
        Ok(result)
    }

    /// One request for every property definition plus one for pipelines when a pipeline or
    /// stage key is wanted. Any failure fails the whole batch.
    async fn fetch_options_batch(&self, keys: &[String]) -> Result<OptionSet, GatewayError> {
        let wanted: AHashSet<&str> = keys.iter().map(String::as_str).collect();

        let response = self.send(ApiRequest::get(self.properties_path())).await?;
        let list: PropertyList = self.expect_success(response, "property list")?;

        let mut result: OptionSet = list
            .results
            .into_iter()
            .filter(|p| wanted.contains(p.name.as_str()))
            .map(|p| (p.name.clone(), p.into_options()))
            .filter(|(_, options)| !options.is_empty())
            .collect();

        if wanted.contains(PIPELINE_KEY) || wanted.contains(STAGE_KEY) {
            let path = format!("/crm/v3/pipelines/{}", self.object_type);
            let response = self.send(ApiRequest::get(path)).await?;
            let pipelines: PipelineList = self.expect_success(response, "pipeline list")?;

            if wanted.contains(PIPELINE_KEY) {
                let options: Vec<SelectOption> = pipelines
                    .results
                    .iter()
                    .map(|p| SelectOption::new(p.label.clone(), p.id.clone()))
                    .collect();
                insert_non_empty(&mut result, PIPELINE_KEY, options);
            }
            if wanted.contains(STAGE_KEY) {
                let options: Vec<SelectOption> = pipelines
                    .results
                    .iter()
                    .flat_map(|p| p.stages.iter())
                    .map(|s| SelectOption::new(s.label.clone(), s.id.clone()))
                    .collect();
                insert_non_empty(&mut result, STAGE_KEY, options);
            }
        }

        Ok(result)
    }

    fn expect_success<R: serde::de::DeserializeOwned>(
        &self,
        response: ApiResponse,
        context: &str,
    ) -> Result<R, GatewayError> {
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        response.parse(context)
    }
}

fn insert_non_empty(result: &mut OptionSet, key: &str, options: Vec<SelectOption>) {
    if options.is_empty() {
        result.remove(key);
    } else {
        result.insert(key.to_string(), options);
    }
}

fn remote_error(response: &ApiResponse) -> GatewayError {
    GatewayError::Remote {
        status: response.status,
        message: extract_remote_message(&response.body, response.status),
    }
}

fn require(value: &str, name: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        warn!(parameter = name, "rejecting call with missing parameter");
        return Err(GatewayError::MissingParameters(format!("'{}' is required", name)));
    }
    Ok(())
}

#[async_trait]
impl<T: Transport> PropertyStore for CrmGateway<T> {
    async fn fetch_options(&self, keys: &[String]) -> Result<OptionSet, GatewayError> {
        if keys.is_empty() {
            return Err(GatewayError::MissingParameters(
                "'propertyKeys' must be a non-empty list".to_string(),
            ));
        }
        match self.options_strategy {
            OptionsStrategy::PerProperty => self.fetch_options_per_property(keys).await,
            OptionsStrategy::Batch => self.fetch_options_batch(keys).await,
        }
    }

    async fn fetch_values(
        &self,
        object_id: &str,
        keys: &[String],
    ) -> Result<PropertyValues, GatewayError> {
        require(object_id, "objectId")?;
        if keys.is_empty() {
            return Err(GatewayError::MissingParameters(
                "'propertyKeys' must be a non-empty list".to_string(),
            ));
        }

        let request =
            ApiRequest::get(self.object_path(object_id)).with_query("properties", keys.join(","));
        let response = self.send(request).await?;
        let record: ObjectRecord = self.expect_success(response, "object")?;
        Ok(record.properties)
    }

    async fn patch_values(
        &self,
        object_id: &str,
        updates: &PatchPayload,
    ) -> Result<PatchOutcome, GatewayError> {
        require(object_id, "objectId")?;
        if updates.is_empty() {
            return Err(GatewayError::MissingParameters(
                "'updates' must not be empty".to_string(),
            ));
        }

        let body = json!({ "properties": updates });
        let response = self
            .send(ApiRequest::patch(self.object_path(object_id), body))
            .await?;

        if !response.is_success() {
            let message = extract_remote_message(&response.body, response.status);
            warn!(status = response.status, %message, "patch rejected by remote");
            return Ok(PatchOutcome::Rejected {
                status: response.status,
                message,
            });
        }

        let result = if response.body.trim().is_empty() {
            JsonValue::Null
        } else {
            response.parse("patch")?
        };
        Ok(PatchOutcome::Applied { result })
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, GatewayError> {
        require(&upload.file_name, "fileName")?;
        require(&upload.base64, "base64")?;
        require(&upload.mime_type, "mimeType")?;
        STANDARD
            .decode(upload.base64.trim())
            .map_err(|e| GatewayError::InvalidInput(format!("file content is not base64: {}", e)))?;

        let body = json!({
            "name": upload.file_name,
            "fileName": upload.file_name,
            "access": self.file_access,
            "base64Encoding": upload.base64,
            "encoding": "base64",
            "mimeType": upload.mime_type,
        });
        let response = self.send(ApiRequest::post("/files/v3/files", body)).await?;
        let record: FileRecord = self.expect_success(response, "file upload")?;

        record.url.map(|url| UploadedFile { url }).ok_or_else(|| GatewayError::Parse {
            context: "file upload".to_string(),
            message: "response has no url".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::transport::{Method, MockTransport};
    use mockall::predicate::*;

    fn build_gateway(transport: MockTransport, strategy: OptionsStrategy) -> CrmGateway<MockTransport> {
        let config = GatewayConfig {
            options_strategy: strategy,
            ..GatewayConfig::default()
        };
        CrmGateway::new(transport, &config)
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_values_without_object_id_makes_no_call() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let result = gateway.fetch_values("", &keys(&["amount"])).await;

        assert!(matches!(result, Err(GatewayError::MissingParameters(_))));
    }

    #[tokio::test]
    async fn fetch_values_without_keys_makes_no_call() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let result = gateway.fetch_values("123", &[]).await;

        assert!(matches!(result, Err(GatewayError::MissingParameters(_))));
    }

    #[tokio::test]
    async fn fetch_values_requests_the_listed_properties() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.method == Method::Get
                    && req.path == "/crm/v3/objects/deals/42"
                    && req.query == vec![("properties".to_string(), "amount,pipeline".to_string())]
            })
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    200,
                    r#"{"id":"42","properties":{"amount":"1500","pipeline":"21960027"}}"#,
                ))
            });

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let values = gateway
            .fetch_values("42", &keys(&["amount", "pipeline"]))
            .await
            .unwrap();

        assert_eq!(values.get("amount"), Some(&json!("1500")));
        assert_eq!(values.get("pipeline"), Some(&json!("21960027")));
    }

    #[tokio::test]
    async fn fetch_values_surfaces_remote_message() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(ApiResponse::new(
                404,
                r#"{"status":"error","message":"Object not found. objectId are usually numeric."}"#,
            ))
        });

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let err = gateway.fetch_values("nope", &keys(&["amount"])).await.unwrap_err();

        assert_eq!(
            err,
            GatewayError::Remote {
                status: 404,
                message: "Object not found. objectId are usually numeric.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn fetch_values_distinguishes_parse_from_transport_errors() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, "<html>gateway</html>")));
        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let err = gateway.fetch_values("1", &keys(&["amount"])).await.unwrap_err();
        assert!(matches!(err, GatewayError::Parse { .. }));

        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(GatewayError::Transport("connection refused".to_string())));
        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let err = gateway.fetch_values("1", &keys(&["amount"])).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn per_property_options_skip_failed_keys() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/properties/deals/deal_type")
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    200,
                    r#"{"name":"deal_type","options":[{"label":"New","value":"new"},{"label":"Renewal","value":"renewal"}]}"#,
                ))
            });
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/properties/deals/missing")
            .times(1)
            .returning(|_| Ok(ApiResponse::new(404, r#"{"message":"not found"}"#)));
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/properties/deals/notes")
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, r#"{"name":"notes","options":[]}"#)));

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let options = gateway
            .fetch_options(&keys(&["deal_type", "missing", "notes"]))
            .await
            .unwrap();

        assert_eq!(options.len(), 1);
        assert_eq!(
            options.get("deal_type").unwrap(),
            &vec![
                SelectOption::new("New", "new"),
                SelectOption::new("Renewal", "renewal")
            ]
        );
    }

    #[tokio::test]
    async fn batch_options_merge_pipelines_and_stages() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/properties/deals")
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    200,
                    r#"{"results":[
                        {"name":"deal_type","options":[{"label":"New","value":"new"}]},
                        {"name":"pipeline","options":[]},
                        {"name":"unrelated","options":[{"label":"X","value":"x"}]}
                    ]}"#,
                ))
            });
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/pipelines/deals")
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    200,
                    r#"{"results":[
                        {"id":"21960027","label":"Sales","stages":[{"id":"s1","label":"Qualified"},{"id":"s2","label":"Won"}]},
                        {"id":"default","label":"Renewals","stages":[{"id":"s3","label":"Open"}]}
                    ]}"#,
                ))
            });

        let gateway = build_gateway(transport, OptionsStrategy::Batch);
        let options = gateway
            .fetch_options(&keys(&["deal_type", "pipeline", "dealstage"]))
            .await
            .unwrap();

        assert_eq!(options.len(), 3);
        assert!(!options.contains_key("unrelated"));
        assert_eq!(
            options.get("pipeline").unwrap(),
            &vec![
                SelectOption::new("Sales", "21960027"),
                SelectOption::new("Renewals", "default")
            ]
        );
        assert_eq!(options.get("dealstage").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn batch_options_fail_on_unparseable_pipelines() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/properties/deals")
            .returning(|_| Ok(ApiResponse::new(200, r#"{"results":[]}"#)));
        transport
            .expect_send()
            .withf(|req| req.path == "/crm/v3/pipelines/deals")
            .returning(|_| Ok(ApiResponse::new(200, "not json")));

        let gateway = build_gateway(transport, OptionsStrategy::Batch);
        let err = gateway.fetch_options(&keys(&["pipeline"])).await.unwrap_err();

        assert!(matches!(err, GatewayError::Parse { .. }));
    }

    #[tokio::test]
    async fn patch_rejection_resolves_with_the_remote_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.method == Method::Patch
                    && req.path == "/crm/v3/objects/deals/42"
                    && req.body == Some(json!({ "properties": { "amount": 10 } }))
            })
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    400,
                    r#"{"status":"error","message":"Property values were not valid"}"#,
                ))
            });

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let mut updates = PatchPayload::new();
        updates.insert("amount".to_string(), json!(10));
        let outcome = gateway.patch_values("42", &updates).await.unwrap();

        assert_eq!(
            outcome,
            PatchOutcome::Rejected {
                status: 400,
                message: "Property values were not valid".to_string()
            }
        );
    }

    #[tokio::test]
    async fn patch_success_echoes_the_remote_result() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, r#"{"id":"42","properties":{"amount":"10"}}"#)));

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let mut updates = PatchPayload::new();
        updates.insert("amount".to_string(), json!(10));
        let outcome = gateway.patch_values("42", &updates).await.unwrap();

        assert!(matches!(outcome, PatchOutcome::Applied { result } if result["id"] == "42"));
    }

    #[tokio::test]
    async fn upload_rejects_invalid_base64_before_sending() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let upload = FileUpload {
            file_name: "contract.pdf".to_string(),
            base64: "not base64!!".to_string(),
            mime_type: "application/pdf".to_string(),
        };
        let err = gateway.upload_file(&upload).await.unwrap_err();

        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn upload_returns_the_file_url() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|req: &ApiRequest| {
                req.method == Method::Post
                    && req.path == "/files/v3/files"
                    && req.body.as_ref().is_some_and(|b| {
                        b["fileName"] == "contract.pdf" && b["access"] == "PUBLIC_NOT_INDEXABLE"
                    })
            }))
            .times(1)
            .returning(|_| {
                Ok(ApiResponse::new(
                    201,
                    r#"{"id":"9","url":"https://files.example.com/contract.pdf"}"#,
                ))
            });

        let gateway = build_gateway(transport, OptionsStrategy::PerProperty);
        let upload = FileUpload {
            file_name: "contract.pdf".to_string(),
            base64: STANDARD.encode(b"%PDF-1.4"),
            mime_type: "application/pdf".to_string(),
        };
        let uploaded = gateway.upload_file(&upload).await.unwrap();

        assert_eq!(uploaded.url, "https://files.example.com/contract.pdf");
    }
}
