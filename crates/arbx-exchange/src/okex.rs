//! OKX (formerly OKEx) v5 REST client.
//!
//! Private endpoints are signed with
//! `base64(HMAC-SHA256(secret, timestamp + METHOD + requestPath + body))`
//! and the `OK-ACCESS-*` headers. Every response is wrapped in
//! `{"code": "0", "msg": "", "data": [...]}`; a non-zero code is an
//! `ExchangeError::Api`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use crate::client::{
    BalanceEntry, Balances, BoxFuture, ExchangeClient, OrderBookResponse, OrderRequest,
    OrderRequestResponse, OrderResponse, RemoteOrderStatus, TradeRecord, TradesQuery,
};
use crate::error::{ExchangeError, ExchangeResult};

/// Production REST endpoint.
pub const OKEX_REST_URL: &str = "https://www.okx.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Order book depth requested from the exchange.
const DEFAULT_BOOK_DEPTH: u32 = 400;

type HmacSha256 = Hmac<Sha256>;

/// API credentials.
#[derive(Clone)]
pub struct OkexCredentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl fmt::Debug for OkexCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkexCredentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Per-order acknowledgement for place/cancel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    ord_id: String,
    #[serde(default)]
    s_code: String,
    #[serde(default)]
    s_msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    ord_id: String,
    inst_id: String,
    #[serde(default)]
    px: String,
    #[serde(default)]
    sz: String,
    #[serde(default)]
    acc_fill_sz: String,
    #[serde(default)]
    avg_px: String,
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFill {
    #[serde(default)]
    ord_id: String,
    fill_sz: String,
    fill_px: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    details: Vec<RawBalanceDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBalanceDetail {
    ccy: String,
    #[serde(default)]
    avail_bal: String,
    #[serde(default)]
    frozen_bal: String,
    #[serde(default)]
    cash_bal: String,
}

#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(default)]
    asks: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    bids: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    ts: String,
}

/// Client for the OKX v5 REST API.
pub struct OkexRestClient {
    client: Client,
    base_url: String,
    credentials: Option<OkexCredentials>,
}

impl OkexRestClient {
    /// Create a new client.
    ///
    /// Without credentials only public endpoints (order book) work; private
    /// calls fail with `ExchangeError::Auth`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<OkexCredentials>,
    ) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, signed: bool) -> ExchangeResult<Vec<T>> {
        self.request(Method::GET, path, None, signed).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> ExchangeResult<Vec<T>> {
        self.request(Method::POST, path, Some(body), true).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        signed: bool,
    ) -> ExchangeResult<Vec<T>> {
        let body_text = match &body {
            Some(value) => serde_json::to_string(value)?,
            None => String::new(),
        };
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %path, "OKX request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("Content-Type", "application/json");

        if signed {
            let credentials = self.credentials.as_ref().ok_or_else(|| {
                ExchangeError::Auth("OKX credentials required for private endpoint".to_string())
            })?;
            let timestamp = iso_timestamp();
            let signature = sign(
                &credentials.secret,
                &timestamp,
                method.as_str(),
                path,
                &body_text,
            )?;
            builder = builder
                .header("OK-ACCESS-KEY", &credentials.api_key)
                .header("OK-ACCESS-SIGN", signature)
                .header("OK-ACCESS-TIMESTAMP", timestamp)
                .header("OK-ACCESS-PASSPHRASE", &credentials.passphrase);
        }

        if body.is_some() {
            builder = builder.body(body_text);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExchangeError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Http(format!("Failed to read response: {e}")))?;

        if !status.is_success() && !text.trim_start().starts_with('{') {
            return Err(ExchangeError::Http(format!("HTTP {status}: {text}")));
        }

        parse_envelope(&text)
    }
}

/// Current time in the format OKX expects for `OK-ACCESS-TIMESTAMP`.
fn iso_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Compute the `OK-ACCESS-SIGN` header value.
fn sign(
    secret: &str,
    timestamp: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> ExchangeResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Auth(format!("Invalid secret: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// "BTC/USDT" -> "BTC-USDT".
fn inst_id(symbol: &str) -> String {
    symbol.replace('/', "-")
}

/// "BTC-USDT" -> "BTC/USDT".
fn unified_symbol(inst_id: &str) -> String {
    inst_id.replace('-', "/")
}

fn query_string(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_envelope<T: DeserializeOwned>(text: &str) -> ExchangeResult<Vec<T>> {
    let envelope: Envelope<T> = serde_json::from_str(text)?;
    if envelope.code != "0" {
        return Err(ExchangeError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    Ok(envelope.data)
}

fn first<T>(data: Vec<T>, what: &str) -> ExchangeResult<T> {
    data.into_iter()
        .next()
        .ok_or_else(|| ExchangeError::Parse(format!("empty data in {what} response")))
}

fn parse_decimal(field: &str, value: &str) -> ExchangeResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| ExchangeError::Parse(format!("invalid {field} '{value}': {e}")))
}

/// Empty strings are absent values.
fn parse_decimal_opt(field: &str, value: &str) -> ExchangeResult<Option<Decimal>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_decimal(field, value).map(Some)
}

fn ack_to_response(ack: RawOrderAck) -> ExchangeResult<OrderRequestResponse> {
    if !ack.s_code.is_empty() && ack.s_code != "0" {
        return Err(ExchangeError::Api {
            code: ack.s_code,
            msg: ack.s_msg,
        });
    }
    Ok(OrderRequestResponse { id: ack.ord_id })
}

fn order_to_response(raw: RawOrder) -> ExchangeResult<OrderResponse> {
    Ok(OrderResponse {
        status: RemoteOrderStatus::from_exchange(&raw.state),
        filled: parse_decimal_opt("accFillSz", &raw.acc_fill_sz)?.unwrap_or(Decimal::ZERO),
        amount: parse_decimal_opt("sz", &raw.sz)?,
        price: parse_decimal_opt("px", &raw.px)?,
        average: parse_decimal_opt("avgPx", &raw.avg_px)?,
        symbol: unified_symbol(&raw.inst_id),
        id: raw.ord_id,
    })
}

fn fill_to_trade(raw: RawFill) -> ExchangeResult<TradeRecord> {
    let timestamp = raw
        .ts
        .parse::<i64>()
        .map_err(|e| ExchangeError::Parse(format!("invalid fill ts '{}': {e}", raw.ts)))?;
    Ok(TradeRecord {
        order_id: (!raw.ord_id.is_empty()).then_some(raw.ord_id),
        amount: parse_decimal("fillSz", &raw.fill_sz)?,
        price: parse_decimal("fillPx", &raw.fill_px)?,
        timestamp,
    })
}

fn accounts_to_balances(accounts: Vec<RawAccount>) -> ExchangeResult<Balances> {
    let mut balances = Balances::new();
    for detail in accounts.into_iter().flat_map(|a| a.details) {
        let entry = BalanceEntry {
            free: parse_decimal_opt("availBal", &detail.avail_bal)?.unwrap_or(Decimal::ZERO),
            used: parse_decimal_opt("frozenBal", &detail.frozen_bal)?.unwrap_or(Decimal::ZERO),
            total: parse_decimal_opt("cashBal", &detail.cash_bal)?.unwrap_or(Decimal::ZERO),
        };
        balances.insert(detail.ccy, entry);
    }
    Ok(balances)
}

fn book_to_response(raw: RawBook) -> OrderBookResponse {
    OrderBookResponse {
        asks: raw.asks,
        bids: raw.bids,
        timestamp: raw.ts.parse().ok(),
    }
}

impl ExchangeClient for OkexRestClient {
    fn create_order(
        &self,
        request: OrderRequest,
    ) -> BoxFuture<'_, ExchangeResult<OrderRequestResponse>> {
        Box::pin(async move {
            let mut body = serde_json::json!({
                "instId": inst_id(&request.symbol),
                "tdMode": "cash",
                "side": request.side,
                "ordType": request.order_type,
                "sz": request.amount.to_string(),
            });
            if request.order_type == "limit" {
                body["px"] = serde_json::Value::String(request.price.to_string());
            } else {
                // Market order size in base currency, as for limit orders
                body["tgtCcy"] = serde_json::Value::String("base_ccy".to_string());
            }

            let data: Vec<RawOrderAck> = self.post("/api/v5/trade/order", body).await?;
            let response = ack_to_response(first(data, "place order")?)?;
            info!(
                symbol = %request.symbol,
                side = %request.side,
                order_type = %request.order_type,
                amount = %request.amount,
                ord_id = %response.id,
                "OKX order placed"
            );
            Ok(response)
        })
    }

    fn fetch_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderResponse>> {
        Box::pin(async move {
            let query = query_string(&[("instId", inst_id(symbol)), ("ordId", id.to_string())]);
            let data: Vec<RawOrder> = self
                .get(&format!("/api/v5/trade/order?{query}"), true)
                .await?;
            order_to_response(first(data, "order details")?)
        })
    }

    fn cancel_order<'a>(
        &'a self,
        id: &'a str,
        symbol: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderRequestResponse>> {
        Box::pin(async move {
            let body = serde_json::json!({ "instId": inst_id(symbol), "ordId": id });
            let data: Vec<RawOrderAck> = self.post("/api/v5/trade/cancel-order", body).await?;
            ack_to_response(first(data, "cancel order")?)
        })
    }

    fn fetch_trades(&self, query: TradesQuery) -> BoxFuture<'_, ExchangeResult<Vec<TradeRecord>>> {
        Box::pin(async move {
            let mut params = vec![
                ("instType", "SPOT".to_string()),
                ("instId", inst_id(&query.symbol)),
            ];
            if let Some(order_id) = &query.order_id {
                params.push(("ordId", order_id.clone()));
            }
            if let Some(since) = query.since {
                params.push(("begin", since.to_string()));
            }
            if let Some(limit) = query.limit {
                params.push(("limit", limit.to_string()));
            }
            let path = format!("/api/v5/trade/fills?{}", query_string(&params));
            let data: Vec<RawFill> = self.get(&path, true).await?;
            data.into_iter().map(fill_to_trade).collect()
        })
    }

    fn fetch_balance(&self) -> BoxFuture<'_, ExchangeResult<Balances>> {
        Box::pin(async move {
            let data: Vec<RawAccount> = self.get("/api/v5/account/balance", true).await?;
            accounts_to_balances(data)
        })
    }

    fn fetch_order_book<'a>(
        &'a self,
        pair: &'a str,
    ) -> BoxFuture<'a, ExchangeResult<OrderBookResponse>> {
        Box::pin(async move {
            let query = query_string(&[
                ("instId", inst_id(pair)),
                ("sz", DEFAULT_BOOK_DEPTH.to_string()),
            ]);
            let data: Vec<RawBook> = self
                .get(&format!("/api/v5/market/books?{query}"), false)
                .await?;
            Ok(book_to_response(first(data, "order book")?))
        })
    }
}
