/// Content-storage SDK adapter
///
/// Lists uploaded content, then fetches every body over plain HTTP to
/// derive its digest and envelope metadata. This is the slow path: body
/// fetches go through a bounded worker pool.
use crate::{
    content::{content_digest, Envelope},
    error::{RegistryError, RegistryResult},
    lookup::{query::is_unknown_address, Query, Record, SourceId},
    sources::{DataSource, RawSourceRecord, HTTP_TIMEOUT},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Timestamps above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// SDK adapter configuration
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Base URL of the content API
    pub api_url: String,
    /// Bearer token for the listing endpoint
    pub api_key: Option<String>,
    /// Maximum body fetches in flight at once
    pub max_concurrent_fetches: usize,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
}

/// One entry of the upload listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub url: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<i64>,
}

impl Upload {
    /// Wallet address this upload belongs to, if the listing says
    pub fn owner_address(&self) -> Option<&str> {
        self.owner
            .as_deref()
            .or(self.creator.as_deref())
            .filter(|a| !is_unknown_address(a))
    }
}

/// An upload together with its fetched body
#[derive(Debug, Clone)]
pub struct SdkItem {
    pub upload: Upload,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadListing {
    Bare(Vec<Upload>),
    Wrapped { data: Vec<Upload> },
}

/// Client for the content-storage API
pub struct SdkClient {
    http_client: Client,
    config: SdkConfig,
}

impl SdkClient {
    /// Create a new SDK client
    pub fn new(config: SdkConfig) -> RegistryResult<Self> {
        if config.max_concurrent_fetches == 0 {
            return Err(RegistryError::Config(
                "SDK fetch concurrency must be at least 1".to_string(),
            ));
        }

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// List uploads, optionally restricted to one owner
    pub async fn list_uploads(&self, owner: Option<&str>) -> RegistryResult<Vec<Upload>> {
        let mut url = format!("{}/uploads", self.config.api_url.trim_end_matches('/'));
        if let Some(owner) = owner {
            url.push_str(&format!("?owner={}", urlencoding::encode(owner)));
        }

        debug!("Listing SDK uploads: {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::SourceTransport(format!("Failed to list uploads: {}", e)))?;

        if !response.status().is_success() {
            return Err(RegistryError::SourceTransport(format!(
                "Upload listing returned error: {}",
                response.status()
            )));
        }

        let listing: UploadListing = response.json().await.map_err(|e| {
            RegistryError::MalformedResponse(format!("Invalid upload listing: {}", e))
        })?;

        Ok(match listing {
            UploadListing::Bare(uploads) => uploads,
            UploadListing::Wrapped { data } => data,
        })
    }

    /// Fetch the raw body of one upload
    pub async fn fetch_body(client: &Client, url: &str) -> RegistryResult<String> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| RegistryError::SourceTransport(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RegistryError::SourceTransport(format!(
                "Content host returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RegistryError::MalformedResponse(format!("Unreadable body at {}: {}", url, e)))
    }

    /// Fetch bodies for `uploads`, at most `max_concurrent_fetches` at once
    ///
    /// Uploads whose body cannot be fetched are skipped. Output keeps the
    /// listing order.
    pub async fn fetch_all(&self, uploads: Vec<Upload>) -> Vec<SdkItem> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let mut tasks = JoinSet::new();

        for (idx, upload) in uploads.into_iter().enumerate() {
            let client = self.http_client.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let body = Self::fetch_body(&client, &upload.url).await;
                (idx, upload, body)
            });
        }

        let mut fetched = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((idx, upload, Ok(body))) => fetched.push((idx, SdkItem { upload, body })),
                Ok((_, upload, Err(e))) => warn!("Skipping upload {}: {}", upload.url, e),
                Err(e) => warn!("Task join error: {}", e),
            }
        }

        fetched.sort_by_key(|(idx, _)| *idx);
        fetched.into_iter().map(|(_, item)| item).collect()
    }
}

#[async_trait]
impl DataSource for SdkClient {
    fn id(&self) -> SourceId {
        SourceId::Sdk
    }

    async fn query_by_source(&self, query: &Query) -> RegistryResult<Vec<RawSourceRecord>> {
        let uploads = match query {
            Query::ByAddress(address) => self
                .list_uploads(Some(address))
                .await?
                .into_iter()
                .filter_map(|mut u| match u.owner_address().map(|o| o.eq_ignore_ascii_case(address)) {
                    Some(true) => Some(u),
                    Some(false) => None,
                    // The listing was already filtered by owner
                    None => {
                        u.owner = Some(address.clone());
                        Some(u)
                    }
                })
                .collect(),
            Query::ByHash(_) | Query::ByHandle(_) => self.list_uploads(None).await?,
        };

        debug!("Fetching {} SDK bodies for {}", uploads.len(), query);

        Ok(self
            .fetch_all(uploads)
            .await
            .into_iter()
            .map(RawSourceRecord::Sdk)
            .collect())
    }

    /// Listing only; fetching every body would make each ping a full scan
    async fn ping(&self) -> RegistryResult<()> {
        self.list_uploads(None).await.map(|_| ())
    }
}

/// Map an upload and its body onto a record
///
/// The digest covers the whole body exactly as fetched.
pub fn normalize(item: SdkItem) -> Record {
    let envelope = Envelope::parse(&item.body)
        .map(|(envelope, _)| envelope)
        .unwrap_or_default();
    let hash = content_digest(&item.body);

    Record::new(SourceId::Sdk)
        .with_hash(Some(&hash))
        .with_title(envelope.title.as_deref())
        .with_license(envelope.license.as_deref())
        .with_handle(envelope.handle.as_deref())
        .with_creator(item.upload.owner_address())
        .with_timestamp(item.upload.timestamp)
        .with_content(Some(item.body))
}

/// Accept seconds, milliseconds, numeric strings, or RFC 3339 dates
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", n)))?,
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) => chrono::DateTime::parse_from_rfc3339(s.trim())
                .map_err(de::Error::custom)?
                .timestamp(),
        },
        Some(other) => {
            return Err(de::Error::custom(format!("expected timestamp, got {}", other)))
        }
    };

    Ok(Some(if seconds > MILLIS_THRESHOLD {
        seconds / 1000
    } else {
        seconds
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const OWNER: &str = "0xabcdef0000000000000000000000000000000001";

    fn config(url: String, max: usize) -> SdkConfig {
        SdkConfig {
            api_url: url,
            api_key: None,
            max_concurrent_fetches: max,
            user_agent: "test".to_string(),
        }
    }

    #[test]
    fn test_upload_timestamps() {
        let upload: Upload = serde_json::from_value(json!({
            "url": "https://x/1", "timestamp": 1_700_000_000_000i64
        }))
        .unwrap();
        assert_eq!(upload.timestamp, Some(1_700_000_000));

        let upload: Upload = serde_json::from_value(json!({
            "url": "https://x/1", "timestamp": "2023-11-14T22:13:20Z"
        }))
        .unwrap();
        assert_eq!(upload.timestamp, Some(1_700_000_000));

        let upload: Upload = serde_json::from_value(json!({ "url": "https://x/1" })).unwrap();
        assert_eq!(upload.timestamp, None);
    }

    #[test]
    fn test_normalize_with_envelope() {
        let body = "---\ntitle: Essay\nhandle: @Writer\n---\nwords".to_string();
        let record = normalize(SdkItem {
            upload: Upload {
                url: "https://x/1".to_string(),
                creator: Some(OWNER.to_string()),
                ..Default::default()
            },
            body: body.clone(),
        });

        assert_eq!(record.hash, Some(content_digest(&body)));
        assert_eq!(record.title, "Essay");
        assert_eq!(record.handle, "@Writer");
        assert_eq!(record.creator_address, OWNER);
        assert_eq!(record.content, Some(body));
        assert!(record.timestamp_estimated);
    }

    #[test]
    fn test_normalize_plain_body_has_no_metadata() {
        let record = normalize(SdkItem {
            upload: Upload {
                url: "https://x/2".to_string(),
                ..Default::default()
            },
            body: "My Title\n\nping @someone".to_string(),
        });
        assert_eq!(record.title, "Untitled");
        assert_eq!(record.handle, "");
    }

    #[tokio::test]
    async fn test_list_and_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .and(query_param("owner", OWNER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "url": format!("{}/content/1", server.uri()), "owner": OWNER },
                    { "url": format!("{}/content/2", server.uri()), "owner": "0x0000000000000000000000000000000000000009" },
                    { "url": format!("{}/content/missing", server.uri()) }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/content/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("first body"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/content/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = SdkClient::new(config(server.uri(), 2)).unwrap();
        let rows = client
            .query_by_source(&Query::ByAddress(OWNER.to_string()))
            .await
            .unwrap();

        // Foreign owner filtered before fetching, missing body skipped
        assert_eq!(rows.len(), 1);
        match &rows[0] {
            RawSourceRecord::Sdk(item) => assert_eq!(item.body, "first body"),
            other => panic!("unexpected row {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut cfg = config(server.uri(), 1);
        cfg.api_key = Some("secret".to_string());
        let client = SdkClient::new(cfg).unwrap();
        assert!(client.list_uploads(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_listing_order() {
        let server = MockServer::start().await;
        for i in 0..6u64 {
            Mock::given(method("GET"))
                .and(path(format!("/content/{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!("body {}", i))
                        .set_delay(Duration::from_millis(60 - i * 10)),
                )
                .mount(&server)
                .await;
        }

        let uploads = (0..6)
            .map(|i| Upload {
                url: format!("{}/content/{}", server.uri(), i),
                ..Default::default()
            })
            .collect();

        let client = SdkClient::new(config(server.uri(), 3)).unwrap();
        let items = client.fetch_all(uploads).await;
        let bodies: Vec<_> = items.iter().map(|i| i.body.as_str()).collect();
        assert_eq!(bodies, vec!["body 0", "body 1", "body 2", "body 3", "body 4", "body 5"]);
    }

    /// Serves every body after `delay` and remembers when each request arrived
    struct ArrivalLog {
        arrivals: Arc<Mutex<Vec<Instant>>>,
        delay: Duration,
    }

    impl Respond for ArrivalLog {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            if let Ok(mut arrivals) = self.arrivals.lock() {
                arrivals.push(Instant::now());
            }
            ResponseTemplate::new(200)
                .set_body_string("body")
                .set_delay(self.delay)
        }
    }

    #[tokio::test]
    async fn test_fetch_all_respects_concurrency_cap() {
        let server = MockServer::start().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let delay = Duration::from_millis(150);
        Mock::given(method("GET"))
            .respond_with(ArrivalLog {
                arrivals: Arc::clone(&arrivals),
                delay,
            })
            .mount(&server)
            .await;

        let uploads = (0..12)
            .map(|i| Upload {
                url: format!("{}/content/{}", server.uri(), i),
                ..Default::default()
            })
            .collect();

        let client = SdkClient::new(config(server.uri(), 3)).unwrap();
        assert_eq!(client.fetch_all(uploads).await.len(), 12);

        // A permit is only released once a delayed response completes, so
        // requests arriving less than `delay` apart were in flight together
        let arrivals = arrivals.lock().unwrap().clone();
        let window = delay.mul_f64(0.9);
        let peak = arrivals
            .iter()
            .map(|a| {
                arrivals
                    .iter()
                    .filter(|b| *b <= a && a.duration_since(**b) < window)
                    .count()
            })
            .max()
            .unwrap_or(0);

        assert_eq!(arrivals.len(), 12);
        assert!(peak <= 3, "{} fetches in flight", peak);
        assert!(peak > 1, "fetches never overlapped");
    }

    #[tokio::test]
    async fn test_ping_lists_without_fetching_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "url": format!("{}/content/1", server.uri()) }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/content/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("body"))
            .expect(0)
            .mount(&server)
            .await;

        let client = SdkClient::new(config(server.uri(), 1)).unwrap();
        assert!(client.ping().await.is_ok());
        server.verify().await;
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(matches!(
            SdkClient::new(config("http://localhost".to_string(), 0)),
            Err(RegistryError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = SdkClient::new(config(server.uri(), 1)).unwrap();
        assert!(client.query_by_source(&Query::ByHandle("a".to_string())).await.is_err());
    }
}
