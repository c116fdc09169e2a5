use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::client::{TradeStore, STRATEGIES_TABLE, TRADES_TABLE};
use super::error::StoreError;
use crate::models::{NewTrade, StrategyDocument, StrategyPayload, Trade, TradeUpdate};

const REST_PREFIX: &str = "/rest/v1";

/// Hosted table store reached over its PostgREST-style HTTP interface.
pub struct RestStore {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, table)
    }

    /// Request on `table`; the query pairs are form-encoded by reqwest.
    fn request(&self, method: Method, table: &str, query: &[(&str, &str)]) -> RequestBuilder {
        self.http_client
            .request(method, self.table_url(table))
            .query(query)
    }

    fn build_headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| StoreError::AuthenticationError(format!("Invalid API key: {}", e)))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| StoreError::AuthenticationError(format!("Invalid API key: {}", e)))?,
        );
        // Mutations echo the affected rows back.
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), StoreError> {
        let response = request.headers(self.build_headers()?).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, StoreError> {
        let (status, body) = self.send(self.request(Method::GET, table, query)).await?;
        parse_rows(status, &body)
    }

    async fn post_rows<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        rows: &B,
    ) -> Result<Vec<T>, StoreError> {
        let request = self.request(Method::POST, table, &[("select", "*")]).json(rows);
        let (status, body) = self.send(request).await?;
        parse_rows(status, &body)
    }

    async fn patch_rows<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        fields: &B,
    ) -> Result<Vec<T>, StoreError> {
        let filter = eq(id);
        let request = self
            .request(Method::PATCH, table, &[("id", filter.as_str()), ("select", "*")])
            .json(fields);
        let (status, body) = self.send(request).await?;
        parse_rows(status, &body)
    }
}

/// PostgREST equality filter value.
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Decodes a row-array response, turning non-2xx statuses into typed errors.
fn parse_rows<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Vec<T>, StoreError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::AuthenticationError(
            "Store rejected the API key".to_string(),
        ));
    }

    if !status.is_success() {
        let parsed: Option<BackendErrorBody> = serde_json::from_str(body).ok();
        let (code, message) = match parsed {
            Some(err) => (
                err.code.unwrap_or_else(|| status.as_u16().to_string()),
                err.message.unwrap_or_else(|| body.to_string()),
            ),
            None => (status.as_u16().to_string(), body.to_string()),
        };
        return Err(StoreError::BackendError { code, message });
    }

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(body)
        .map_err(|e| StoreError::ParseError(format!("Failed to parse response: {} - Body: {}", e, body)))
}

fn first_row<T>(rows: Vec<T>, table: &'static str, id: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
        table,
        id: id.to_string(),
    })
}

#[async_trait]
impl TradeStore for RestStore {
    fn backend_name(&self) -> &str {
        "rest"
    }

    async fn select_trades(&self) -> Result<Vec<Trade>, StoreError> {
        self.get_rows(TRADES_TABLE, &[("select", "*"), ("order", "date.desc")])
            .await
    }

    async fn insert_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        let rows = self.post_rows(TRADES_TABLE, &[trade]).await?;
        first_row(rows, TRADES_TABLE, "<new>")
    }

    async fn update_trade(&self, id: &str, fields: TradeUpdate) -> Result<Trade, StoreError> {
        let rows = self.patch_rows(TRADES_TABLE, id, &fields).await?;
        first_row(rows, TRADES_TABLE, id)
    }

    async fn delete_trade(&self, id: &str) -> Result<(), StoreError> {
        let filter = eq(id);
        let request = self.request(Method::DELETE, TRADES_TABLE, &[("id", filter.as_str())]);
        let (status, body) = self.send(request).await?;
        parse_rows::<serde_json::Value>(status, &body)?;
        Ok(())
    }

    async fn fetch_strategy(&self) -> Result<Option<StrategyDocument>, StoreError> {
        let rows: Vec<StrategyDocument> = self
            .get_rows(STRATEGIES_TABLE, &[("select", "*"), ("limit", "1")])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_strategy(
        &self,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        let rows = self.post_rows(STRATEGIES_TABLE, &[payload]).await?;
        first_row(rows, STRATEGIES_TABLE, "<new>")
    }

    async fn update_strategy(
        &self,
        id: &str,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        let rows = self.patch_rows(STRATEGIES_TABLE, id, &payload).await?;
        first_row(rows, STRATEGIES_TABLE, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeResult;

    #[test]
    fn test_request_url_and_encoded_filter() {
        let store = RestStore::new("https://example.supabase.co/", "anon");
        let request = store
            .request(Method::GET, TRADES_TABLE, &[("select", "*"), ("order", "date.desc")])
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://example.supabase.co/rest/v1/trades?select=*&order=date.desc"
        );

        let filter = eq("a b&c");
        let request = store
            .request(Method::DELETE, TRADES_TABLE, &[("id", filter.as_str())])
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("id=eq.a+b%26c"));
    }

    #[test]
    fn test_headers_carry_key() {
        let store = RestStore::new("https://example.supabase.co", "anon-key");
        let headers = store.build_headers().unwrap();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer anon-key");
        assert_eq!(headers.get("Prefer").unwrap(), "return=representation");
    }

    #[test]
    fn test_parse_rows_success() {
        let body = r#"[{"id":"t1","date":"2024-01-02","pair":"EUR/USD","result":"Win","pnl":12.5}]"#;
        let rows: Vec<Trade> = parse_rows(StatusCode::OK, body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result, TradeResult::Win);
        assert_eq!(rows[0].pnl, Some(12.5));
    }

    #[test]
    fn test_parse_rows_keeps_rows_with_odd_values() {
        let body = r#"[
            {"id":1,"result":"Win","direction":"Long","date":"2024-01-03"},
            {"id":2,"result":null,"direction":"","date":""},
            {"id":3,"result":"Win","direction":"long","date":"2024-01-01"}
        ]"#;
        let rows: Vec<Trade> = parse_rows(StatusCode::OK, body).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].result, TradeResult::Win);
        assert_eq!(rows[1].result, TradeResult::Unknown);
        assert_eq!(rows[1].direction, None);
        assert_eq!(rows[1].date, None);
        assert_eq!(rows[2].direction, Some(crate::models::Direction::Long));
    }

    #[test]
    fn test_parse_rows_backend_error() {
        let body = r#"{"code":"22P02","message":"invalid input syntax for type numeric"}"#;
        let err = parse_rows::<Trade>(StatusCode::BAD_REQUEST, body).unwrap_err();
        match err {
            StoreError::BackendError { code, message } => {
                assert_eq!(code, "22P02");
                assert!(message.contains("numeric"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rows_auth_and_empty_body() {
        let err = parse_rows::<Trade>(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationError(_)));

        let rows: Vec<serde_json::Value> = parse_rows(StatusCode::NO_CONTENT, "").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_first_row_empty_is_not_found() {
        let err = first_row(Vec::<Trade>::new(), TRADES_TABLE, "t9").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
