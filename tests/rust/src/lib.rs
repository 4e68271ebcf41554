//! Shared test utilities and fixtures for MCP Hub integration tests.

pub use mcphub_core::{
    ClientRegistration, ConnectionState, ConnectionStatus, EndpointMetadata, ServerDefinition,
    TenantId, TokenRecord, ToolDescriptor,
};

/// Mock OAuth provider and MCP server built on wiremock
pub mod provider {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Client id issued by the mock registration endpoint
    pub const CLIENT_ID: &str = "client_test_1";
    /// Client secret issued by the mock registration endpoint
    pub const CLIENT_SECRET: &str = "secret_test_1";
    /// Access token issued by the mock token endpoint
    pub const ACCESS_TOKEN: &str = "access_token_xyz";
    /// Refresh token issued by the mock token endpoint
    pub const REFRESH_TOKEN: &str = "refresh_token_abc";

    /// A fake MCP resource server acting as its own authorization server.
    ///
    /// Everything lives on one wiremock instance: protected-resource
    /// metadata, authorization server metadata, registration, token and
    /// MCP endpoints. Tests mount only what their scenario needs; an
    /// unmounted endpoint answers 404, which surfaces as a failure in the
    /// code path that touched it.
    pub struct MockProvider {
        server: MockServer,
    }

    impl MockProvider {
        pub async fn start() -> Self {
            Self {
                server: MockServer::start().await,
            }
        }

        /// Base URL, doubling as the resource origin and the issuer.
        pub fn origin(&self) -> String {
            self.server.uri()
        }

        /// MCP endpoint URL, used as the server URL in catalogs.
        pub fn mcp_url(&self) -> String {
            format!("{}/mcp", self.server.uri())
        }

        /// Underlying mock server, for scenario-specific mounts.
        pub fn wiremock(&self) -> &MockServer {
            &self.server
        }

        /// Mount RFC 9728 and RFC 8414 metadata plus an RFC 7591
        /// registration endpoint, all pointing back at this provider.
        pub async fn mount_discovery(&self) {
            Mock::given(method("GET"))
                .and(path("/.well-known/oauth-protected-resource"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "resource": self.origin(),
                    "authorization_servers": [self.origin()],
                    "scopes_supported": ["mcp.read", "mcp.write"],
                })))
                .mount(&self.server)
                .await;

            Mock::given(method("GET"))
                .and(path("/.well-known/oauth-authorization-server"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "issuer": self.origin(),
                    "authorization_endpoint": format!("{}/authorize", self.origin()),
                    "token_endpoint": format!("{}/token", self.origin()),
                    "registration_endpoint": format!("{}/register", self.origin()),
                    "code_challenge_methods_supported": ["S256"],
                })))
                .mount(&self.server)
                .await;

            Mock::given(method("POST"))
                .and(path("/register"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                    "client_id": CLIENT_ID,
                    "client_secret": CLIENT_SECRET,
                })))
                .mount(&self.server)
                .await;
        }

        /// Token endpoint answering the authorization-code grant.
        pub async fn mount_token_endpoint(&self) {
            self.token_grant_mock().mount(&self.server).await;
        }

        /// Like [`Self::mount_token_endpoint`], verifying the grant runs
        /// exactly `hits` times by the end of the test.
        pub async fn mount_token_endpoint_expecting(&self, hits: u64) {
            self.token_grant_mock()
                .expect(hits)
                .mount(&self.server)
                .await;
        }

        fn token_grant_mock(&self) -> Mock {
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=authorization_code"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": ACCESS_TOKEN,
                    "token_type": "Bearer",
                    "refresh_token": REFRESH_TOKEN,
                    "expires_in": 3600,
                    "scope": "mcp.read mcp.write",
                })))
        }

        /// Token endpoint rejecting every grant.
        pub async fn mount_token_endpoint_failure(&self) {
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                    "error": "invalid_client",
                })))
                .mount(&self.server)
                .await;
        }

        /// Token endpoint answering the refresh grant. Pass `None` for
        /// `rotated_refresh` to model a provider that keeps the old
        /// refresh token valid instead of rotating it.
        pub async fn mount_refresh_endpoint(
            &self,
            access_token: &str,
            rotated_refresh: Option<&str>,
        ) {
            let mut body = json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600,
            });
            if let Some(refresh) = rotated_refresh {
                body["refresh_token"] = json!(refresh);
            }

            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=refresh_token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&self.server)
                .await;
        }

        /// Streamable HTTP MCP endpoint with two tools, no authorization.
        pub async fn mount_mcp(&self) {
            self.mount_handshake(None, None).await;
            self.tool_list_mock(None).mount(&self.server).await;
        }

        /// MCP endpoint that only answers with the given bearer token.
        pub async fn mount_mcp_with_bearer(&self, token: &str) {
            self.mount_handshake(Some(token), None).await;
            self.tool_list_mock(Some(token)).mount(&self.server).await;
        }

        /// MCP endpoint verifying `initialize` runs exactly `hits` times.
        pub async fn mount_mcp_expecting_initialize(&self, hits: u64) {
            self.mount_handshake(None, Some(hits)).await;
            self.tool_list_mock(None).mount(&self.server).await;
        }

        /// MCP endpoint rejecting every request.
        pub async fn mount_mcp_rejecting(&self) {
            Mock::given(method("POST"))
                .and(path("/mcp"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&self.server)
                .await;
        }

        /// MCP endpoint whose tool list spans two pages.
        pub async fn mount_mcp_paged(&self) {
            self.mount_handshake(None, None).await;

            // Must outrank the cursorless tools/list mock below
            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"cursor\":\"page_2\""))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 3,
                    "result": { "tools": [ { "name": "third_tool" } ] }
                })))
                .with_priority(1)
                .mount(&self.server)
                .await;

            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"method\":\"tools/list\""))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 2,
                    "result": {
                        "tools": [ { "name": "first_tool" }, { "name": "second_tool" } ],
                        "nextCursor": "page_2"
                    }
                })))
                .mount(&self.server)
                .await;
        }

        /// MCP endpoint that answers over SSE instead of plain JSON.
        pub async fn mount_mcp_sse(&self) {
            let initialize = concat!(
                "event: message\n",
                "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{",
                "\"protocolVersion\":\"2025-03-26\",\"capabilities\":{},",
                "\"serverInfo\":{\"name\":\"mock-mcp\",\"version\":\"1.0.0\"}}}\n\n"
            );
            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"method\":\"initialize\""))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(initialize, "text/event-stream"),
                )
                .mount(&self.server)
                .await;

            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("notifications/initialized"))
                .respond_with(ResponseTemplate::new(202))
                .mount(&self.server)
                .await;

            let tools = concat!(
                "event: message\n",
                "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{",
                "\"tools\":[{\"name\":\"streamed_tool\"}]}}\n\n"
            );
            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"method\":\"tools/list\""))
                .respond_with(ResponseTemplate::new(200).set_body_raw(tools, "text/event-stream"))
                .mount(&self.server)
                .await;
        }

        async fn mount_handshake(&self, bearer: Option<&str>, initialize_hits: Option<u64>) {
            let mut builder = Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"method\":\"initialize\""));
            if let Some(token) = bearer {
                let value = format!("Bearer {}", token);
                builder = builder.and(header("authorization", value.as_str()));
            }
            let mut initialize =
                builder.respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "protocolVersion": "2025-03-26",
                        "capabilities": { "tools": {} },
                        "serverInfo": { "name": "mock-mcp", "version": "1.0.0" }
                    }
                })));
            if let Some(hits) = initialize_hits {
                initialize = initialize.expect(hits);
            }
            initialize.mount(&self.server).await;

            Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("notifications/initialized"))
                .respond_with(ResponseTemplate::new(202))
                .mount(&self.server)
                .await;
        }

        fn tool_list_mock(&self, bearer: Option<&str>) -> Mock {
            let mut builder = Mock::given(method("POST"))
                .and(path("/mcp"))
                .and(body_string_contains("\"method\":\"tools/list\""));
            if let Some(token) = bearer {
                let value = format!("Bearer {}", token);
                builder = builder.and(header("authorization", value.as_str()));
            }
            builder.respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {
                    "tools": [
                        {
                            "name": "search_issues",
                            "description": "Search issues by keyword",
                            "inputSchema": {
                                "type": "object",
                                "properties": { "query": { "type": "string" } },
                                "required": ["query"]
                            }
                        },
                        { "name": "ping" }
                    ]
                }
            })))
        }
    }
}

/// Fully wired service stack over an in-memory database
pub mod harness {
    use std::sync::Arc;
    use std::time::Duration;

    use mcphub_core::{
        ConnectionState, ConnectionStatus, RegistrationRepository, ServerCatalog,
        ServerDefinition, StaticServerCatalog, TenantId, TokenRepository,
    };
    use mcphub_gateway::{
        ConnectionService, CorrelationStore, DiscoveryEngine, ExchangeWorker, OAuthFlowService,
        StatusStore,
    };
    use mcphub_mcp::McpClient;
    use mcphub_storage::{
        Database, FieldEncryptor, MasterKey, SqliteRegistrationRepository, SqliteTokenRepository,
    };
    use tokio::sync::Mutex;

    /// Redirect URI the harness registers with providers
    pub const REDIRECT_URI: &str = "http://localhost:8085/oauth/callback";
    /// UI location callbacks redirect back to
    pub const UI_URL: &str = "http://localhost:3000/integrations";

    /// The orchestrator wired the way `apps/server` wires it.
    pub struct Harness {
        pub flow: Arc<OAuthFlowService>,
        pub connections: ConnectionService,
        pub registrations: Arc<dyn RegistrationRepository>,
        pub tokens: Arc<dyn TokenRepository>,
        pub status: Arc<StatusStore>,
        pub correlation: Arc<CorrelationStore>,
    }

    pub struct HarnessBuilder {
        servers: Vec<ServerDefinition>,
        correlation_ttl: Duration,
        status_ttl: Duration,
    }

    impl HarnessBuilder {
        /// Add a server to the catalog.
        pub fn server(mut self, definition: ServerDefinition) -> Self {
            self.servers.push(definition);
            self
        }

        pub fn correlation_ttl(mut self, ttl: Duration) -> Self {
            self.correlation_ttl = ttl;
            self
        }

        pub fn status_ttl(mut self, ttl: Duration) -> Self {
            self.status_ttl = ttl;
            self
        }

        /// Wire the full stack over an in-memory database with a
        /// throwaway master key.
        ///
        /// Must run inside a Tokio runtime; the exchange worker is
        /// spawned onto it.
        pub fn build(self) -> Harness {
            let database = Arc::new(Mutex::new(
                Database::open_in_memory().expect("Failed to open in-memory database"),
            ));
            let master_key = MasterKey::generate().expect("Failed to generate master key");
            let encryptor =
                Arc::new(FieldEncryptor::new(&master_key).expect("Failed to build encryptor"));

            let registrations: Arc<dyn RegistrationRepository> = Arc::new(
                SqliteRegistrationRepository::new(Arc::clone(&database), Arc::clone(&encryptor)),
            );
            let tokens: Arc<dyn TokenRepository> =
                Arc::new(SqliteTokenRepository::new(database, encryptor));

            let catalog: Arc<dyn ServerCatalog> =
                Arc::new(StaticServerCatalog::with_servers(self.servers));
            let status = Arc::new(StatusStore::with_ttl(self.status_ttl));
            let correlation = Arc::new(CorrelationStore::with_ttl(self.correlation_ttl));
            let http_client = reqwest::Client::new();
            let mcp_client = Arc::new(McpClient::new().expect("Failed to build MCP client"));

            let queue = ExchangeWorker::new(
                http_client.clone(),
                Arc::clone(&registrations),
                Arc::clone(&tokens),
                Arc::clone(&status),
                Arc::clone(&catalog),
                Arc::clone(&mcp_client),
            )
            .spawn();

            let engine = DiscoveryEngine::new(
                http_client.clone(),
                Arc::clone(&registrations),
                REDIRECT_URI,
            );
            let flow = Arc::new(OAuthFlowService::new(
                engine,
                Arc::clone(&catalog),
                Arc::clone(&correlation),
                queue,
                UI_URL,
            ));

            let connections = ConnectionService::new(
                http_client,
                Arc::clone(&tokens),
                Arc::clone(&registrations),
                Arc::clone(&status),
                catalog,
                mcp_client,
            );

            Harness {
                flow,
                connections,
                registrations,
                tokens,
                status,
                correlation,
            }
        }
    }

    impl Harness {
        pub fn builder() -> HarnessBuilder {
            HarnessBuilder {
                servers: Vec::new(),
                correlation_ttl: Duration::from_secs(600),
                status_ttl: Duration::from_secs(86_400),
            }
        }

        /// Harness with a single auth-requiring server in the catalog.
        pub fn single_server(name: &str, url: &str) -> Self {
            Self::builder()
                .server(ServerDefinition::new(name, url).with_auth())
                .build()
        }

        /// Poll the status store until (tenant, server) reaches `wanted`.
        ///
        /// The exchange runs on a background task, so tests observe its
        /// completion only through the status store. Panics after two
        /// seconds without the transition.
        pub async fn await_state(
            &self,
            tenant: &TenantId,
            server: &str,
            wanted: ConnectionState,
        ) -> ConnectionStatus {
            tokio::time::timeout(Duration::from_secs(2), async {
                loop {
                    let current = self.status.get(tenant, server);
                    if current.state == wanted {
                        return current;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap_or_else(|_| panic!("Status never became {:?}", wanted))
        }
    }
}

/// Test fixture utilities
pub mod fixtures {
    use chrono::{Duration, Utc};
    use mcphub_core::{ClientRegistration, EndpointMetadata, TenantId, TokenRecord};

    use crate::harness::REDIRECT_URI;
    use crate::provider::{CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN};

    /// Endpoint metadata pointing at the conventional paths under `origin`.
    pub fn endpoint_metadata(origin: &str) -> EndpointMetadata {
        EndpointMetadata {
            issuer: Some(origin.to_string()),
            authorization_endpoint: format!("{}/authorize", origin),
            token_endpoint: format!("{}/token", origin),
            registration_endpoint: Some(format!("{}/register", origin)),
        }
    }

    /// A registration as discovery would have produced it.
    pub fn registration(tenant: &TenantId, origin: &str) -> ClientRegistration {
        ClientRegistration::new(tenant.clone(), origin, CLIENT_ID, REDIRECT_URI)
            .with_secret(CLIENT_SECRET)
            .with_scope("mcp.read mcp.write")
            .with_metadata(endpoint_metadata(origin))
    }

    /// A registration that never captured endpoint metadata.
    pub fn bare_registration(tenant: &TenantId, origin: &str) -> ClientRegistration {
        ClientRegistration::new(tenant.clone(), origin, CLIENT_ID, REDIRECT_URI)
    }

    /// A live token, one hour from expiry.
    pub fn fresh_token(tenant: &TenantId, origin: &str, access_token: &str) -> TokenRecord {
        TokenRecord::new(tenant.clone(), origin, access_token)
            .with_refresh_token(REFRESH_TOKEN)
            .with_expiry(Utc::now() + Duration::hours(1))
    }

    /// A token that expired an hour ago but can still refresh.
    pub fn expired_token(tenant: &TenantId, origin: &str, refresh_token: &str) -> TokenRecord {
        TokenRecord::new(tenant.clone(), origin, "stale_access_token")
            .with_refresh_token(refresh_token)
            .with_expiry(Utc::now() - Duration::hours(1))
    }
}

/// Database test helpers
pub mod db {
    use std::path::{Path, PathBuf};

    use mcphub_storage::{Database, DATABASE_FILE};
    use tempfile::TempDir;

    /// Create a temporary database for testing
    pub struct TestDatabase {
        pub db: Database,
        db_path: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestDatabase {
        /// Create a new test database in a temporary directory
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join(DATABASE_FILE);
            let db = Database::open(&db_path).expect("Failed to open test database");
            Self {
                db,
                db_path,
                _temp_dir: temp_dir,
            }
        }

        /// Create an in-memory database for fast tests
        pub fn in_memory() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db = Database::open_in_memory().expect("Failed to open in-memory database");
            Self {
                db,
                db_path: PathBuf::new(),
                _temp_dir: temp_dir,
            }
        }

        /// Get the full database file path
        pub fn db_path(&self) -> &Path {
            &self.db_path
        }
    }

    impl Default for TestDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}
