//! Binance USDⓈ-M futures REST client.

use crate::config::ExchangeConfig;
use crate::exchange::error::ExchangeError;
use crate::exchange::traits::{ExchangeClient, Venue};
use crate::exchange::types::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
const FUTURES_TESTNET_URL: &str = "https://testnet.binancefuture.com";
const RECV_WINDOW_MS: u64 = 5000;

/// Binance futures client bound to one symbol.
pub struct BinanceClient {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    symbol: String,
}

impl BinanceClient {
    /// Create a new Binance client from configuration.
    pub fn new(config: &ExchangeConfig, symbol: &str) -> Result<Self> {
        let base_url = if config.testnet {
            FUTURES_TESTNET_URL
        } else {
            FUTURES_BASE_URL
        };
        Self::with_base_url(config, symbol, base_url)
    }

    /// Create a client against an explicit base URL.
    pub fn with_base_url(config: &ExchangeConfig, symbol: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            symbol: normalize_symbol(symbol),
        })
    }

    /// Whether signed endpoints can be used.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Get current timestamp in milliseconds.
    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    async fn public_get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let mut query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            RECV_WINDOW_MS,
            Self::timestamp()
        ));

        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ExchangeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => ExchangeError::from_binance(err.code, err.msg),
                Err(_) => ExchangeError::Api {
                    code: i64::from(status.as_u16()),
                    message: body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    /// Set leverage for the client's symbol.
    #[instrument(skip(self))]
    pub async fn set_leverage(&self, leverage: u8) -> Result<(), ExchangeError> {
        let _: serde_json::Value = self
            .signed(
                Method::POST,
                "/fapi/v1/leverage",
                &[
                    ("symbol", self.symbol.clone()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn place_limit_order(&self, order: &OrderRequest) -> Result<Order, ExchangeError> {
        let resp: OrderResponse = self
            .signed(
                Method::POST,
                "/fapi/v1/order",
                &[
                    ("symbol", self.symbol.clone()),
                    ("side", order.side.as_binance().to_string()),
                    ("type", "LIMIT".to_string()),
                    ("timeInForce", "GTC".to_string()),
                    ("quantity", order.quantity.normalize().to_string()),
                    ("price", order.price.normalize().to_string()),
                ],
            )
            .await?;
        Ok(resp.into())
    }
}

/// Convert unified symbols like `ETH/USDT:USDT` into `ETHUSDT`.
pub fn normalize_symbol(symbol: &str) -> String {
    let base = symbol.split(':').next().unwrap_or(symbol);
    base.replace('/', "").to_uppercase()
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn symbol(&self) -> String {
        self.symbol.clone()
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    async fn fetch_market_data(&self) -> Result<MarketData, ExchangeError> {
        let ticker: BookTicker = self
            .public_get("/fapi/v1/ticker/bookTicker", &format!("symbol={}", self.symbol))
            .await?;

        if ticker.bid_price <= Decimal::ZERO || ticker.ask_price <= Decimal::ZERO {
            return Err(ExchangeError::NoMarketData(self.symbol.clone()));
        }

        Ok(MarketData::from_top_of_book(ticker.bid_price, ticker.ask_price))
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    async fn fetch_funding_rate(&self) -> Result<Decimal, ExchangeError> {
        let index: PremiumIndex = self
            .public_get("/fapi/v1/premiumIndex", &format!("symbol={}", self.symbol))
            .await?;
        Ok(index.last_funding_rate)
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    async fn fetch_account_data(&self) -> Result<AccountData, ExchangeError> {
        let positions: Vec<PositionRisk> = self
            .signed(
                Method::GET,
                "/fapi/v2/positionRisk",
                &[("symbol", self.symbol.clone())],
            )
            .await?;
        let balances: Vec<AccountBalance> =
            self.signed(Method::GET, "/fapi/v2/balance", &[]).await?;

        let balance = balances
            .iter()
            .find(|b| b.asset == "USDT")
            .map(|b| b.balance)
            .unwrap_or(Decimal::ZERO);

        let account = match positions.into_iter().find(|p| p.symbol == self.symbol) {
            Some(pos) => AccountData {
                position_amt: pos.position_amt,
                entry_price: pos.entry_price,
                balance,
                liquidation_price: pos.liquidation_price,
                unrealized_pnl: pos.unrealized_profit,
            },
            None => AccountData {
                balance,
                ..Default::default()
            },
        };

        debug!(
            position = %account.position_amt,
            liquidation_price = %account.liquidation_price,
            balance = %account.balance,
            "Fetched account data"
        );

        Ok(account)
    }

    #[instrument(skip(self), fields(symbol = %self.symbol))]
    async fn fetch_open_orders(&self) -> Result<Vec<Order>, ExchangeError> {
        let orders: Vec<OrderResponse> = self
            .signed(
                Method::GET,
                "/fapi/v1/openOrders",
                &[("symbol", self.symbol.clone())],
            )
            .await?;
        Ok(orders.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self, orders), fields(symbol = %self.symbol, count = orders.len()))]
    async fn place_orders(&self, orders: &[OrderRequest]) -> Result<PlaceOutcome, ExchangeError> {
        let mut outcome = PlaceOutcome::default();

        for request in orders {
            match self.place_limit_order(request).await {
                Ok(order) => {
                    debug!(order_id = %order.id, side = %order.side, price = %order.price, "Order placed");
                    outcome.placed.push(order);
                }
                Err(ExchangeError::Http(e)) => return Err(ExchangeError::Http(e)),
                Err(e) => {
                    warn!(side = %request.side, price = %request.price, error = %e, "Order rejected");
                    outcome.rejected.push((request.clone(), e));
                }
            }
        }

        Ok(outcome)
    }

    #[instrument(skip(self, order_ids), fields(symbol = %self.symbol, count = order_ids.len()))]
    async fn cancel_orders(&self, order_ids: &[String]) -> Result<(), ExchangeError> {
        let mut first_error = None;

        for order_id in order_ids {
            let result: Result<OrderResponse, ExchangeError> = self
                .signed(
                    Method::DELETE,
                    "/fapi/v1/order",
                    &[
                        ("symbol", self.symbol.clone()),
                        ("orderId", order_id.clone()),
                    ],
                )
                .await;

            if let Err(e) = result {
                warn!(%order_id, error = %e, "Failed to cancel order");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
