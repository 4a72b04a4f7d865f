//! Query execution messages.
//!
//! Two kinds of query are supported:
//! - CSQL text executed through `/API/ExecuteCQL`, with typed parameters
//! - Saved queries addressed as `/API/{domain}/{query}`, with raw parameters

use crate::protocol::message::{Body, Message};

/// Query type sent with CSQL execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Approved data only.
    Query,
    /// Includes pending draft changes.
    DraftQuery,
    /// Single value result.
    Scalar,
    /// Statement without a result set (INSERT, UPDATE, DELETE).
    NonQuery,
    /// Includes historical versions of records.
    VersionHistoryQuery,
}

impl QueryType {
    /// Wire name of the query type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Query => "QUERY",
            QueryType::DraftQuery => "DRAFT_QUERY",
            QueryType::Scalar => "SCALAR",
            QueryType::NonQuery => "NONQUERY",
            QueryType::VersionHistoryQuery => "VERSION_HISTORY_QUERY",
        }
    }
}

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Sent as an empty string.
    Null,
    /// Sent as `true` / `false`.
    Bool(bool),
    /// Integer, sent with its exact digits.
    Integer(i64),
    /// Floating point number.
    Number(f64),
    /// Sent as is.
    String(String),
}

impl ParamValue {
    /// .NET value type name the server deserializes the parameter as.
    pub fn value_type(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "System.Boolean",
            ParamValue::Integer(_) | ParamValue::Number(_) => "System.Double",
            ParamValue::Null | ParamValue::String(_) => "System.String",
        }
    }

    /// Serialized text of the value; NULL serializes as empty text.
    pub fn serialized(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Integer(n) => n.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::String(s) => s.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

/// Ordered query parameters.
///
/// # Example
///
/// ```
/// use cinchy_rs::Params;
///
/// let params = Params::new()
///     .with("@questionid", 42)
///     .with("@answer", "Yes");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Add a parameter in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Connection and transaction a query is bound to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    pub connection_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl Binding {
    /// Binding to an open connection and transaction.
    pub fn new(connection_id: &str, transaction_id: &str) -> Self {
        Self {
            connection_id: Some(connection_id.to_string()).filter(|s| !s.is_empty()),
            transaction_id: Some(transaction_id.to_string()).filter(|s| !s.is_empty()),
        }
    }

    fn write_to(&self, fields: &mut Vec<(String, String)>) {
        if let Some(id) = &self.connection_id {
            fields.push(("ConnectionId".to_string(), id.clone()));
        }
        if let Some(id) = &self.transaction_id {
            fields.push(("TransactionId".to_string(), id.clone()));
        }
    }
}

/// CSQL execution message.
#[derive(Debug, Clone)]
pub struct ExecuteCqlMessage<'a> {
    pub query: &'a str,
    pub params: &'a Params,
    pub query_type: Option<QueryType>,
    pub binding: Binding,
}

impl<'a> ExecuteCqlMessage<'a> {
    pub fn new(query: &'a str, params: &'a Params, query_type: Option<QueryType>) -> Self {
        Self {
            query,
            params,
            query_type,
            binding: Binding::default(),
        }
    }

    /// Bind the query to a connection and transaction.
    pub fn bind(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }
}

impl Message for ExecuteCqlMessage<'_> {
    fn path(&self) -> String {
        "/API/ExecuteCQL".to_string()
    }

    fn body(&self) -> Body {
        let mut fields = Vec::with_capacity(3 + self.params.len() * 3);
        if let Some(query_type) = self.query_type {
            fields.push(("Type".to_string(), query_type.as_str().to_string()));
        }
        fields.push(("Query".to_string(), self.query.to_string()));
        fields.push(("resultformat".to_string(), "JSON".to_string()));

        // Index counts every entry, including the id pseudo-parameters.
        for (idx, (name, value)) in self.params.iter().enumerate() {
            match name.to_lowercase().as_str() {
                "connectionid" => fields.push(("ConnectionId".to_string(), value.serialized())),
                "transactionid" => fields.push(("TransactionId".to_string(), value.serialized())),
                _ => {
                    let prefix = format!("Parameters[{}]", idx);
                    fields.push((format!("{}.ParameterName", prefix), name.to_string()));
                    fields.push((format!("{}.ValueType", prefix), value.value_type().to_string()));
                    fields.push((format!("{}.XmlSerializedValue", prefix), value.serialized()));
                }
            }
        }
        self.binding.write_to(&mut fields);
        Body::Form(fields)
    }

    fn failure_message(&self) -> String {
        format!("Failed to execute query {}", self.query)
    }
}

/// Saved query execution message.
#[derive(Debug, Clone)]
pub struct SavedQueryMessage<'a> {
    pub domain: &'a str,
    pub query: &'a str,
    pub params: &'a Params,
    pub binding: Binding,
}

impl<'a> SavedQueryMessage<'a> {
    pub fn new(domain: &'a str, query: &'a str, params: &'a Params) -> Self {
        Self {
            domain,
            query,
            params,
            binding: Binding::default(),
        }
    }

    /// Bind the query to a connection and transaction.
    pub fn bind(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }
}

impl Message for SavedQueryMessage<'_> {
    fn path(&self) -> String {
        format!("/API/{}/{}", self.domain, self.query)
    }

    fn body(&self) -> Body {
        let mut fields: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(name, value)| (name.to_string(), value.serialized()))
            .collect();
        fields.push(("resultformat".to_string(), "JSON".to_string()));
        self.binding.write_to(&mut fields);
        Body::Form(fields)
    }

    fn failure_message(&self) -> String {
        format!(
            "Failed to execute query {} within domain {}",
            self.query, self.domain
        )
    }
}

/// A query to run inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CSQL text.
    Csql {
        query: String,
        params: Params,
        query_type: Option<QueryType>,
    },
    /// Saved query.
    Saved {
        domain: String,
        query: String,
        params: Params,
    },
}

impl Statement {
    /// CSQL statement without parameters.
    pub fn csql(query: impl Into<String>) -> Self {
        Statement::Csql {
            query: query.into(),
            params: Params::new(),
            query_type: None,
        }
    }

    /// Saved query statement without parameters.
    pub fn saved(domain: impl Into<String>, query: impl Into<String>) -> Self {
        Statement::Saved {
            domain: domain.into(),
            query: query.into(),
            params: Params::new(),
        }
    }

    /// Replace the parameters.
    pub fn with_params(mut self, new_params: Params) -> Self {
        match &mut self {
            Statement::Csql { params, .. } | Statement::Saved { params, .. } => *params = new_params,
        }
        self
    }

    /// Set the query type (CSQL only).
    pub fn with_query_type(mut self, new_type: QueryType) -> Self {
        if let Statement::Csql { query_type, .. } = &mut self {
            *query_type = Some(new_type);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Method;

    #[test]
    fn test_cql_form_fields() {
        let params = Params::new()
            .with("@name", "bob")
            .with("@score", 3)
            .with("@active", true)
            .with("@missing", None::<String>);
        let req = ExecuteCqlMessage::new("SELECT 1", &params, Some(QueryType::DraftQuery)).to_request();

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/API/ExecuteCQL");
        assert_eq!(req.form_value("Type"), Some("DRAFT_QUERY"));
        assert_eq!(req.form_value("Query"), Some("SELECT 1"));
        assert_eq!(req.form_value("resultformat"), Some("JSON"));
        assert_eq!(req.form_value("Parameters[0].ParameterName"), Some("@name"));
        assert_eq!(req.form_value("Parameters[0].ValueType"), Some("System.String"));
        assert_eq!(req.form_value("Parameters[1].ValueType"), Some("System.Double"));
        assert_eq!(req.form_value("Parameters[1].XmlSerializedValue"), Some("3"));
        assert_eq!(req.form_value("Parameters[2].ValueType"), Some("System.Boolean"));
        assert_eq!(req.form_value("Parameters[2].XmlSerializedValue"), Some("true"));
        assert_eq!(req.form_value("Parameters[3].ValueType"), Some("System.String"));
        assert_eq!(req.form_value("Parameters[3].XmlSerializedValue"), Some(""));
    }

    #[test]
    fn test_cql_id_params_become_fields() {
        let params = Params::new()
            .with("ConnectionID", "c1")
            .with("@x", 1.5)
            .with("transactionid", "t1");
        let req = ExecuteCqlMessage::new("q", &params, None).to_request();

        assert_eq!(req.form_value("Type"), None);
        assert_eq!(req.form_value("ConnectionId"), Some("c1"));
        assert_eq!(req.form_value("TransactionId"), Some("t1"));
        // index keeps counting past the id entries
        assert_eq!(req.form_value("Parameters[1].ParameterName"), Some("@x"));
        assert_eq!(req.form_value("Parameters[1].XmlSerializedValue"), Some("1.5"));
        assert_eq!(req.form_value("Parameters[0].ParameterName"), None);
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        let id = 9_007_199_254_740_993_i64;
        let params = Params::new().with("@id", id);

        let saved = SavedQueryMessage::new("SDK", "Get", &params).to_request();
        assert_eq!(saved.form_value("@id"), Some("9007199254740993"));

        let cql = ExecuteCqlMessage::new("SELECT @id", &params, None).to_request();
        assert_eq!(cql.form_value("Parameters[0].ValueType"), Some("System.Double"));
        assert_eq!(
            cql.form_value("Parameters[0].XmlSerializedValue"),
            Some("9007199254740993")
        );
        assert_eq!(ParamValue::from(i64::MIN).serialized(), i64::MIN.to_string());
    }

    #[test]
    fn test_saved_query_binding() {
        let params = Params::new().with("@questionid", 7);
        let req = SavedQueryMessage::new("SDK Demo", "Insert Answer", &params)
            .bind(Binding::new("c1", "t1"))
            .to_request();

        assert_eq!(req.path, "/API/SDK Demo/Insert Answer");
        assert_eq!(req.form_value("@questionid"), Some("7"));
        assert_eq!(req.form_value("resultformat"), Some("JSON"));
        assert_eq!(req.form_value("ConnectionId"), Some("c1"));
        assert_eq!(req.form_value("TransactionId"), Some("t1"));
    }
}
