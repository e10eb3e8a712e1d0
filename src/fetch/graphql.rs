//! GraphQL Admin API client.
//!
//! Sends the orders query over HTTP and decodes the response into
//! [`OrderPage`]s. Every failure is mapped onto [`FetchError`] here so the
//! paginator never has to look at HTTP details.

use crate::fetch::error::{classify_graphql_errors, FetchError, GraphQlError};
use crate::fetch::source::{OrderPage, OrderSource, PageRequest};
use crate::models::{
    FinancialStatus, FulfillmentStatus, LineItem, Money, OrderRecord, ShippingLocation,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Line items requested per order.
const LINE_ITEMS_PER_ORDER: usize = 50;

/// Orders query. Newest first, line items capped at [`LINE_ITEMS_PER_ORDER`].
const ORDERS_QUERY: &str = r#"query Orders($first: Int!, $after: String, $query: String) {
  orders(first: $first, after: $after, query: $query, sortKey: PROCESSED_AT, reverse: true) {
    edges {
      node {
        id
        createdAt
        processedAt
        totalPriceSet { shopMoney { amount currencyCode } }
        displayFulfillmentStatus
        displayFinancialStatus
        customer { id }
        lineItems(first: 50) {
          edges {
            node {
              title
              quantity
              product { id }
              originalUnitPriceSet { shopMoney { amount currencyCode } }
            }
          }
          pageInfo { hasNextPage }
        }
        shippingAddress { city province country }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

/// Connection settings for the Admin API.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Full GraphQL endpoint URL.
    pub endpoint: String,
    /// Admin API access token.
    pub access_token: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Admin API client implementing [`OrderSource`].
pub struct AdminApiClient {
    config: ApiClientConfig,
    http_client: reqwest::Client,
}

impl AdminApiClient {
    /// Create a new client.
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("storepulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        debug!("Admin API client for {}", config.endpoint);

        Ok(Self {
            config,
            http_client,
        })
    }
}

/// GraphQL endpoint for a shop and API version.
///
/// Bare shop names get the `.myshopify.com` suffix.
pub fn endpoint_for(shop: &str, api_version: &str) -> String {
    let shop = shop
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    let domain = if shop.contains('.') {
        shop.to_string()
    } else {
        format!("{}.myshopify.com", shop)
    };

    format!("https://{}/admin/api/{}/graphql.json", domain, api_version)
}

#[async_trait]
impl OrderSource for AdminApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, FetchError> {
        let body = GraphQlRequest {
            query: ORDERS_QUERY,
            variables: OrdersVariables {
                first: request.first,
                after: request.after.as_deref(),
                query: &request.query,
            },
        };

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Network(format!(
                        "request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    FetchError::Network(format!("cannot connect to {}", self.config.endpoint))
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read response: {}", e)))?;

        if let Some(err) = classify_status(status, &text) {
            return Err(err);
        }

        decode_page(&text)
    }
}

/// Map a non-success HTTP status onto the fetch taxonomy.
fn classify_status(status: StatusCode, body: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let message = body.chars().take(200).collect::<String>();
    Some(if status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::Throttled(format!("HTTP {}", status.as_u16()))
    } else if status.is_server_error() {
        FetchError::Network(format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        FetchError::Api {
            status: status.as_u16(),
            message,
        }
    })
}

/// Decode a GraphQL response body into a page of orders.
pub fn decode_page(body: &str) -> Result<OrderPage, FetchError> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Schema(format!("invalid response body: {}", e)))?;

    if !response.errors.is_empty() {
        return Err(classify_graphql_errors(&response.errors));
    }

    let connection = response
        .data
        .and_then(|d| d.orders)
        .ok_or_else(|| FetchError::Schema("response has no orders connection".to_string()))?;

    Ok(OrderPage {
        orders: connection
            .edges
            .into_iter()
            .map(|edge| edge.node.into_order())
            .collect(),
        has_next_page: connection.page_info.has_next_page,
        end_cursor: connection.page_info.end_cursor,
    })
}

/// Parse a money string, treating garbage as zero.
fn parse_amount(raw: &str, context: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or_else(|_| {
        warn!("Unparseable amount {:?} on {}, counting as 0", raw, context);
        Decimal::ZERO
    })
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: OrdersVariables<'a>,
}

#[derive(Debug, Serialize)]
struct OrdersVariables<'a> {
    first: u32,
    after: Option<&'a str>,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<OrdersData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct OrdersData {
    orders: Option<Connection<OrderNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    edges: Vec<Edge<T>>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemConnection {
    edges: Vec<Edge<LineItemNode>>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyBag {
    shop_money: MoneyV2,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyV2 {
    amount: String,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    created_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    total_price_set: Option<MoneyBag>,
    display_fulfillment_status: Option<String>,
    display_financial_status: Option<String>,
    customer: Option<IdRef>,
    line_items: Option<LineItemConnection>,
    shipping_address: Option<AddressNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemNode {
    title: String,
    quantity: i64,
    product: Option<IdRef>,
    original_unit_price_set: Option<MoneyBag>,
}

#[derive(Debug, Deserialize)]
struct AddressNode {
    city: Option<String>,
    province: Option<String>,
    country: Option<String>,
}

impl OrderNode {
    fn into_order(self) -> OrderRecord {
        let total = match self.total_price_set {
            Some(bag) => Money::new(
                parse_amount(&bag.shop_money.amount, &self.id),
                bag.shop_money.currency_code,
            ),
            None => Money::new(Decimal::ZERO, ""),
        };

        let edges = match self.line_items {
            Some(connection) => {
                if connection.page_info.is_some_and(|p| p.has_next_page) {
                    warn!(
                        order = %self.id,
                        kept = LINE_ITEMS_PER_ORDER,
                        "Order has more line items than fetched, product rollups undercount it"
                    );
                }
                connection.edges
            }
            None => Vec::new(),
        };

        let line_items = edges
            .into_iter()
            .map(|edge| {
                let node = edge.node;
                LineItem {
                    product_id: node.product.map(|p| p.id),
                    unit_price: node
                        .original_unit_price_set
                        .map(|bag| parse_amount(&bag.shop_money.amount, &node.title))
                        .unwrap_or(Decimal::ZERO),
                    quantity: u64::try_from(node.quantity).unwrap_or(0),
                    title: node.title,
                }
            })
            .collect();

        OrderRecord {
            id: self.id,
            created_at: self.created_at,
            processed_at: self.processed_at,
            total,
            fulfillment_status: FulfillmentStatus::from(
                self.display_fulfillment_status.as_deref().unwrap_or(""),
            ),
            financial_status: FinancialStatus::from(
                self.display_financial_status.as_deref().unwrap_or(""),
            ),
            customer_id: self.customer.map(|c| c.id),
            line_items,
            shipping: self.shipping_address.map(|a| ShippingLocation {
                city: a.city,
                region: a.province,
                country: a.country,
            }),
        }
    }
}
