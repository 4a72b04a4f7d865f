//! High-level Client API for the Cinchy platform.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::cursor::QueryResult;
use crate::error::{Error, Result};
use crate::gateway::{HttpGateway, RequestGateway};
use crate::protocol::is_blank;
use crate::protocol::message::Message;
use crate::protocol::messages::{
    BeginTransactionMessage, Binding, CloseConnectionMessage, EndTransactionMessage,
    ExecuteCqlMessage, GroupsMessage, OpenConnectionMessage, Outcome, Params, QueryType,
    SavedQueryMessage, Statement, TableEntitlementsMessage, TableRef, UserInfoMessage,
};
use crate::transaction::{TransactionApi, TransactionSequencer};

const USER_PREFERENCES_QUERY: &str = "SELECT u.[Username] as 'username', \
    u.[Name] as 'name', u.[Display Name] as 'displayName', \
    u.[Email Address] as 'emailAddress', \
    u.[Profile Photo] as 'profilePhoto', \
    l.[Language].[Subtag] as 'language', \
    l.[Region].[Subtag] as 'region', \
    l.[Time Zone] as 'timeZone' \
    FROM [Cinchy].[Users] u \
    LEFT JOIN [Cinchy].[User Preferences] l \
    ON l.[User].[Cinchy Id] = u.[Cinchy Id] \
    WHERE u.[Cinchy Id] = CurrentUserID();";

/// A saved query to run as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedQuery {
    /// Domain the saved query lives in.
    pub domain: String,
    /// Saved query name.
    pub query: String,
    /// Parameters, sent as raw form fields.
    pub params: Params,
    /// Caller token returned with the result, or attached to its error.
    pub correlation: Option<String>,
}

impl SavedQuery {
    /// Saved query without parameters.
    pub fn new(domain: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            query: query.into(),
            params: Params::new(),
            correlation: None,
        }
    }

    /// Replace the parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the correlation token.
    pub fn with_correlation(mut self, token: impl Into<String>) -> Self {
        self.correlation = Some(token.into());
        self
    }
}

/// Result of one query in a batch.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Result of the query.
    pub result: QueryResult,
    /// Token of the [`SavedQuery`] this answers.
    pub correlation: Option<String>,
}

/// Profile and locale preferences of the current user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub username: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    pub profile_photo: Option<String>,
    pub language: Option<String>,
    pub region: Option<String>,
    pub time_zone: Option<String>,
}

/// Identity of the current user.
///
/// Access token claims merged with the identity server's userinfo answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserIdentity {
    /// Claims of the access token, empty if it is not a JWT.
    pub claims: serde_json::Map<String, serde_json::Value>,
    /// `profile` from userinfo.
    pub profile: Option<serde_json::Value>,
    /// `email` from userinfo.
    pub email: Option<serde_json::Value>,
    /// `id` from userinfo.
    pub id: Option<serde_json::Value>,
    /// `role` from userinfo; a string or an array of strings.
    pub role: Option<serde_json::Value>,
}

/// A Cinchy client.
///
/// Cheap to share behind an `Arc`; every call is independent. Transactions
/// are driven through [`Client::transaction`].
pub struct Client {
    gateway: Arc<dyn RequestGateway>,
    identity: Arc<dyn IdentityProvider>,
    config: ClientConfig,
}

impl Client {
    /// Create a client talking HTTP to the configured root URL.
    pub fn new(config: ClientConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let gateway = HttpGateway::new(&config, identity.clone())?;
        Ok(Self::with_gateway(config, identity, Arc::new(gateway)))
    }

    /// Create a client over a custom gateway.
    pub fn with_gateway(
        config: ClientConfig,
        identity: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn RequestGateway>,
    ) -> Self {
        Self {
            gateway,
            identity,
            config,
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Establish a session through the identity provider.
    pub async fn login(&self) -> Result<bool> {
        self.identity.login().await
    }

    /// Current bearer token.
    pub fn bearer_token(&self) -> Option<String> {
        self.identity.bearer_token()
    }

    /// Whether the identity provider holds a valid access token.
    pub fn has_valid_access_token(&self) -> bool {
        self.identity.has_valid_access_token()
    }

    /// Whether the access token has passed the configured refresh point.
    ///
    /// `false` without a token or for tokens with no known expiry.
    pub fn token_refresh_due(&self) -> bool {
        self.identity
            .access_token()
            .is_some_and(|t| t.needs_refresh_at(Utc::now(), self.config.token_refresh_factor))
    }

    /// Identity of the current user from the identity server.
    ///
    /// Fields the server leaves out, or sends as null or empty, are `None`.
    pub async fn user_identity(&self) -> Result<UserIdentity> {
        let info = match self.send_json(&UserInfoMessage).await? {
            serde_json::Value::Object(info) => info,
            other => {
                return Err(Error::remote(format!(
                    "unexpected userinfo response: {}",
                    other
                ))
                .context(UserInfoMessage.failure_message()))
            }
        };
        let field = |key: &str| {
            info.get(key)
                .filter(|v| !v.is_null() && v.as_str() != Some(""))
                .cloned()
        };
        Ok(UserIdentity {
            claims: self
                .identity
                .access_token()
                .and_then(|t| t.claims())
                .unwrap_or_default(),
            profile: field("profile"),
            email: field("email"),
            id: field("id"),
            role: field("role"),
        })
    }

    /// Check the session against the server. Any failure counts as invalid.
    pub async fn check_session_valid(&self) -> bool {
        match self.send(&GroupsMessage).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "session check failed");
                false
            }
        }
    }

    async fn send<M: Message + Sync>(&self, message: &M) -> Result<Bytes> {
        let request = message.to_request();
        self.gateway
            .send(&request)
            .await
            .map_err(|e| e.context(message.failure_message()))
    }

    async fn send_json<M: Message + Sync>(&self, message: &M) -> Result<serde_json::Value> {
        let body = self.send(message).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_text<M: Message + Sync>(&self, message: &M) -> Result<String> {
        let body = self.send(message).await?;
        let text = std::str::from_utf8(&body).map_err(|e| {
            Error::remote(format!("response is not valid UTF-8: {}", e))
                .context(message.failure_message())
        })?;
        Ok(text.trim().to_string())
    }

    async fn send_query<M: Message + Sync>(&self, message: &M) -> Result<QueryResult> {
        let body = self.send(message).await?;
        // Non-queries may answer with an empty body.
        if body.iter().all(u8::is_ascii_whitespace) {
            return QueryResult::from_value(serde_json::Value::Null);
        }
        QueryResult::from_slice(&body)
    }

    /// Execute CSQL text.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use cinchy_rs::{Client, Params, QueryType};
    /// # async fn demo(client: &Client) -> cinchy_rs::Result<()> {
    /// let params = Params::new().with("@status", "Open");
    /// let mut result = client
    ///     .execute_csql(
    ///         "SELECT [Title] FROM [Ops].[Tickets] WHERE [Status] = @status",
    ///         &params,
    ///         Some(QueryType::DraftQuery),
    ///     )
    ///     .await?;
    /// while result.advance() {
    ///     println!("{}", result.cell_value("Title")?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute_csql(
        &self,
        query: &str,
        params: &Params,
        query_type: Option<QueryType>,
    ) -> Result<QueryResult> {
        if is_blank(query) {
            return Err(Error::invalid_argument("query must not be empty"));
        }
        self.send_query(&ExecuteCqlMessage::new(query, params, query_type))
            .await
    }

    /// Execute a saved query.
    pub async fn execute_query(
        &self,
        domain: &str,
        query: &str,
        params: &Params,
    ) -> Result<QueryResult> {
        check_saved(domain, query)?;
        self.send_query(&SavedQueryMessage::new(domain, query, params))
            .await
    }

    /// Execute saved queries concurrently.
    ///
    /// Results come back in input order. The first failure fails the batch,
    /// with the failing query's correlation token attached.
    pub async fn execute_queries(&self, queries: &[SavedQuery]) -> Result<Vec<QueryResponse>> {
        if queries.is_empty() {
            return Err(Error::invalid_argument("no queries to execute"));
        }
        debug!(count = queries.len(), "executing query batch");
        try_join_all(queries.iter().map(|q| async move {
            match self.execute_query(&q.domain, &q.query, &q.params).await {
                Ok(result) => Ok(QueryResponse {
                    result,
                    correlation: q.correlation.clone(),
                }),
                Err(e) => Err(e.with_correlation(q.correlation.clone())),
            }
        }))
        .await
    }

    /// Start a transaction sequence.
    pub fn transaction(&self) -> TransactionSequencer<'_, Self> {
        TransactionSequencer::new(self)
    }

    /// Groups the current user belongs to.
    pub async fn groups_current_user_belongs_to(&self) -> Result<serde_json::Value> {
        self.send_json(&GroupsMessage).await
    }

    /// Table entitlements of the current user, by table id.
    pub async fn table_entitlements_by_id(&self, table_id: i64) -> Result<serde_json::Value> {
        self.table_entitlements(TableRef::Id(table_id)).await
    }

    /// Table entitlements of the current user, by table GUID.
    pub async fn table_entitlements_by_guid(&self, table_guid: &str) -> Result<serde_json::Value> {
        if is_blank(table_guid) {
            return Err(Error::invalid_argument("table guid must not be empty"));
        }
        self.table_entitlements(TableRef::Guid(table_guid)).await
    }

    /// Table entitlements of the current user, by domain and table name.
    pub async fn table_entitlements_by_name(
        &self,
        domain: &str,
        table: &str,
    ) -> Result<serde_json::Value> {
        if is_blank(domain) || is_blank(table) {
            return Err(Error::invalid_argument(
                "domain and table name must not be empty",
            ));
        }
        self.table_entitlements(TableRef::Name { domain, table })
            .await
    }

    async fn table_entitlements(&self, table: TableRef<'_>) -> Result<serde_json::Value> {
        self.send_json(&TableEntitlementsMessage { table }).await
    }

    /// Preferences of the current user, `None` if no user row came back.
    pub async fn user_preferences(&self) -> Result<Option<UserPreference>> {
        let result = self
            .execute_csql(USER_PREFERENCES_QUERY, &Params::new(), None)
            .await?;
        Ok(result.to_records::<UserPreference>()?.into_iter().next())
    }
}

fn check_saved(domain: &str, query: &str) -> Result<()> {
    if is_blank(domain) || is_blank(query) {
        return Err(Error::invalid_argument(
            "domain and query name must not be empty",
        ));
    }
    Ok(())
}

#[async_trait]
impl TransactionApi for Client {
    async fn open_connection(&self) -> Result<String> {
        let connection_id = self.send_text(&OpenConnectionMessage).await?;
        debug!(%connection_id, "connection opened");
        Ok(connection_id)
    }

    async fn begin_transaction(&self, connection_id: &str) -> Result<Option<String>> {
        if connection_id.is_empty() {
            return Ok(None);
        }
        let transaction_id = self
            .send_text(&BeginTransactionMessage { connection_id })
            .await?;
        debug!(%connection_id, %transaction_id, "transaction started");
        Ok(Some(transaction_id).filter(|id| !id.is_empty()))
    }

    async fn execute(
        &self,
        connection_id: &str,
        transaction_id: &str,
        statement: &Statement,
    ) -> Result<QueryResult> {
        let binding = Binding::new(connection_id, transaction_id);
        match statement {
            Statement::Csql {
                query,
                params,
                query_type,
            } => {
                if is_blank(query) {
                    return Err(Error::invalid_argument("query must not be empty"));
                }
                self.send_query(&ExecuteCqlMessage::new(query, params, *query_type).bind(binding))
                    .await
            }
            Statement::Saved {
                domain,
                query,
                params,
            } => {
                check_saved(domain, query)?;
                self.send_query(&SavedQueryMessage::new(domain, query, params).bind(binding))
                    .await
            }
        }
    }

    async fn commit_transaction(&self, connection_id: &str, transaction_id: &str) -> Result<bool> {
        self.end_transaction(connection_id, transaction_id, Outcome::Commit)
            .await
    }

    async fn rollback_transaction(
        &self,
        connection_id: &str,
        transaction_id: &str,
    ) -> Result<bool> {
        self.end_transaction(connection_id, transaction_id, Outcome::Rollback)
            .await
    }

    async fn close_connection(&self, connection_id: &str) -> Result<bool> {
        if connection_id.is_empty() {
            return Ok(false);
        }
        self.send(&CloseConnectionMessage { connection_id }).await?;
        debug!(%connection_id, "connection closed");
        Ok(true)
    }
}

impl Client {
    async fn end_transaction(
        &self,
        connection_id: &str,
        transaction_id: &str,
        outcome: Outcome,
    ) -> Result<bool> {
        if connection_id.is_empty() || transaction_id.is_empty() {
            return Ok(false);
        }
        self.send(&EndTransactionMessage {
            connection_id,
            transaction_id,
            outcome,
        })
        .await?;
        debug!(%connection_id, %transaction_id, ?outcome, "transaction ended");
        Ok(true)
    }
}
