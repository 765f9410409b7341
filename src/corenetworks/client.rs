use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{Credentials, SessionManager};
use crate::config::ClientConfig;
use crate::corenetworks::types::*;
use crate::error::{ClientError, Result};
use crate::validation::normalize_zone;

/// Record-level access to one core-networks account. Clones share the HTTP
/// pool and the session.
#[derive(Clone, Debug)]
pub struct CoreNetworksClient {
    http: Client,
    base_url: String, // e.g. "https://beta.api.core-networks.de"
    sessions: Arc<SessionManager>,
}

impl CoreNetworksClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_http(http, config))
    }

    /// Build on top of an existing `reqwest::Client`.
    pub fn with_http(http: Client, config: &ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url_root().to_string(),
            sessions: Arc::new(SessionManager::new(config.credentials.clone())),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.sessions.credentials()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn records_url(&self, zone: &str, suffix: &str) -> Result<String> {
        let zone = normalize_zone(zone)?;
        Ok(self.url(&format!("dnszones/{}/records/{}", zone, suffix)))
    }

    /// Send an authenticated request and return the raw body of a 2xx reply.
    async fn execute(&self, req: RequestBuilder, cancel: &CancellationToken) -> Result<String> {
        let token = self
            .sessions
            .ensure_valid(&self.http, &self.base_url, cancel)
            .await?;
        let req = req
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");

        let res = send(req, cancel).await?;
        let status = res.status();
        if !status.is_success() {
            let body = read_body(res, cancel).await.unwrap_or_default();
            debug!(%status, %body, "core-networks request rejected");
            return Err(ClientError::Remote { status });
        }
        read_body(res, cancel).await
    }

    pub async fn list_zones(&self, cancel: &CancellationToken) -> Result<Vec<Zone>> {
        let body = self.execute(self.http.get(self.url("dnszones/")), cancel).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let zones: Option<Vec<Zone>> = serde_json::from_str(&body)?;
        Ok(zones.unwrap_or_default())
    }

    pub async fn zone_details(&self, zone: &str, cancel: &CancellationToken) -> Result<ZoneDetails> {
        let zone = normalize_zone(zone)?;
        let url = self.url(&format!("dnszones/{}", zone));
        let body = self.execute(self.http.get(url), cancel).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// All records of a zone. An empty zone yields an empty vec.
    pub async fn list_records(&self, zone: &str, cancel: &CancellationToken) -> Result<Vec<Record>> {
        let url = self.records_url(zone, "")?;
        debug!(zone, "listing records");
        let body = self.execute(self.http.get(url), cancel).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let wire: Option<Vec<WireRecordRead>> = serde_json::from_str(&body)?;
        let zone = normalize_zone(zone)?;
        wire.unwrap_or_default()
            .into_iter()
            .map(|r| Record::from_wire_read(r, zone))
            .collect()
    }

    /// Create a record, or update the one with the same name and type. Takes
    /// effect after `commit`. The API echoes nothing useful, so the input is
    /// returned on success.
    pub async fn create_record(
        &self,
        zone: &str,
        record: &Record,
        cancel: &CancellationToken,
    ) -> Result<Record> {
        let url = self.records_url(zone, "")?;
        debug!(zone, name = %record.name, rtype = %record.rtype, "creating record");
        let body = serde_json::to_vec(&record.to_wire_write())?;
        self.execute(self.http.post(url).body(body), cancel).await?;
        Ok(record.clone())
    }

    /// Delete the records matching every non-empty field of `record`. Takes
    /// effect after `commit`.
    pub async fn delete_record(
        &self,
        zone: &str,
        record: &Record,
        cancel: &CancellationToken,
    ) -> Result<Record> {
        let url = self.records_url(zone, "delete")?;
        debug!(zone, name = %record.name, rtype = %record.rtype, "deleting record");
        let body = serde_json::to_vec(&record.to_wire_write())?;
        self.execute(self.http.post(url).body(body), cancel).await?;
        Ok(record.clone())
    }

    /// Publish the pending creates and deletes of a zone.
    pub async fn commit(&self, zone: &str, cancel: &CancellationToken) -> Result<()> {
        let url = self.records_url(zone, "commit")?;
        self.execute(self.http.post(url), cancel).await?;
        info!(zone, "committed zone changes");
        Ok(())
    }
}

/// Send a request unless `cancel` fires first.
pub(crate) async fn send(req: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        res = req.send() => Ok(res?),
    }
}

pub(crate) async fn read_body(res: Response, cancel: &CancellationToken) -> Result<String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        body = res.text() => Ok(body?),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_client(server: &MockServer) -> CoreNetworksClient {
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "test_token_12345",
                "expires": 3600
            })))
            .mount(server)
            .await;

        let config = ClientConfig::new("user", "secret").with_base_url(server.uri());
        CoreNetworksClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_list_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/example.com/records/"))
            .and(header("Authorization", "Bearer test_token_12345"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "www", "ttl": "300", "type": "A", "data": "192.0.2.1"},
                {"name": "@", "ttl": "3600", "type": "TXT", "data": "v=spf1 -all"}
            ])))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let records = client
            .list_records("example.com", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("www", "A", "192.0.2.1", Duration::from_secs(300)));
        assert_eq!(records[1].ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_list_records_empty_zone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/empty.example/records/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let records = client
            .list_records("empty.example", &CancellationToken::new())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_list_records_bad_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/example.com/records/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "www", "ttl": "abc", "type": "A", "data": "192.0.2.1"}
            ])))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let err = client
            .list_records("example.com", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidTtl { .. }));
    }

    #[tokio::test]
    async fn test_list_records_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/example.com/records/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let err = client
            .list_records("example.com", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_format());
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/missing.example/records/"))
            .respond_with(ResponseTemplate::new(404).set_body_string("zone not found"))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let err = client
            .list_records("missing.example", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert!(matches!(err, ClientError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_create_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dnszones/example.com/records/"))
            .and(header("Authorization", "Bearer test_token_12345"))
            .and(body_json(serde_json::json!({
                "name": "_acme-challenge",
                "ttl": 300,
                "type": "TXT",
                "data": "validation"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let record = Record::new("_acme-challenge", "TXT", "validation", Duration::from_secs(300));
        let created = client
            .create_record("example.com.", &record, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(created, record);
    }

    #[tokio::test]
    async fn test_delete_record_does_not_commit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dnszones/example.com/records/delete"))
            .and(body_json(serde_json::json!({"name": "test", "data": "test"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dnszones/example.com/records/commit"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let record = Record {
            name: "test".into(),
            data: "test".into(),
            ..Default::default()
        };
        client
            .delete_record("example.com", &record, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dnszones/example.com/records/commit"))
            .and(header("Authorization", "Bearer test_token_12345"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        client
            .commit("example.com", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_zones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "example.com", "type": "master"},
                {"name": "example.net", "type": "slave"}
            ])))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let zones = client.list_zones(&CancellationToken::new()).await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].zone_type, "slave");
    }

    #[tokio::test]
    async fn test_zone_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dnszones/example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "example.com",
                "type": "master",
                "active": true,
                "dnssec": true,
                "master": null,
                "tsig": {"algo": "hmac-sha512", "secret": "c2VjcmV0"}
            })))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let details = client
            .zone_details("example.com.", &CancellationToken::new())
            .await
            .unwrap();
        assert!(details.active);
        assert!(details.dnssec_enabled);
        assert_eq!(details.tsig.unwrap().secret, "c2VjcmV0");
    }

    #[tokio::test]
    async fn test_invalid_zone_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let client = create_mock_client(&server).await;
        let err = client
            .commit("bad zone", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidZone(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on port 9 of the loopback interface.
        let config = ClientConfig::new("user", "secret")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(5));
        let client = CoreNetworksClient::new(&config).unwrap();
        let err = client
            .list_records("example.com", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
