//! GraphQL API Routes
//!
//! The aggregation schema over the legacy record service.
//!
//! Endpoints:
//! - POST /graphql - Execute GraphQL queries
//! - GET /graphql - GraphiQL playground

use async_graphql::{
    ComplexObject, Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object,
    Result as GqlResult, Schema, SimpleObject, ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{Html, IntoResponse},
    routing::get,
    Extension, Router,
};
use tessera_core::{Customer, Order};

use crate::{context::RequestContext, error::ApiResult, middleware::RequestId, state::AppState};

/// Settle a nullable field. A failure is reported against this field's path
/// and the field resolves to null, leaving its siblings untouched.
fn settle<T>(ctx: &Context<'_>, result: ApiResult<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            let error = err.extend().into_server_error(ctx.item.pos);
            ctx.add_error(ctx.set_error_path(error));
            None
        }
    }
}

// ============================================================================
// GRAPHQL TYPES
// ============================================================================

/// GraphQL representation of a customer.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex, name = "Customer")]
pub struct GqlCustomer {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub tier: String,
}

impl From<Customer> for GqlCustomer {
    fn from(customer: Customer) -> Self {
        Self {
            id: ID(customer.id),
            name: customer.name,
            email: customer.email,
            tier: customer.tier,
        }
    }
}

#[ComplexObject]
impl GqlCustomer {
    /// Orders placed by this customer. Orders that are missing or fail to
    /// load are left out; null only when the order references themselves
    /// cannot be fetched.
    async fn orders(&self, ctx: &Context<'_>) -> GqlResult<Option<Vec<GqlOrder>>> {
        let request = ctx.data::<RequestContext>()?;
        let orders = request.resolve_customer_orders(&self.id).await.map(Some);
        Ok(settle(ctx, orders).map(|orders| orders.into_iter().map(GqlOrder::from).collect()))
    }
}

/// GraphQL representation of an order.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex, name = "Order")]
pub struct GqlOrder {
    pub id: ID,
    pub status: String,
    pub total: f64,
    pub created_at: String,
    #[graphql(skip)]
    pub customer_id: String,
}

impl From<Order> for GqlOrder {
    fn from(order: Order) -> Self {
        Self {
            id: ID(order.id),
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            customer_id: order.customer_id,
        }
    }
}

impl From<&GqlOrder> for Order {
    fn from(order: &GqlOrder) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.clone(),
            total: order.total,
            created_at: order.created_at.clone(),
            customer_id: order.customer_id.clone(),
        }
    }
}

#[ComplexObject]
impl GqlOrder {
    /// The customer who placed this order, or null if it cannot be found
    /// or fails to load.
    async fn customer(&self, ctx: &Context<'_>) -> GqlResult<Option<GqlCustomer>> {
        let request = ctx.data::<RequestContext>()?;
        let customer = request.resolve_order_customer(&Order::from(self)).await;
        Ok(settle(ctx, customer).map(GqlCustomer::from))
    }
}

// ============================================================================
// QUERY ROOT
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get a customer by ID.
    async fn customer(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<GqlCustomer>> {
        let request = ctx.data::<RequestContext>()?;
        let customer = request.resolve_customer(&id).await;
        Ok(settle(ctx, customer).map(GqlCustomer::from))
    }

    /// Get several customers in one upstream call, in the order requested.
    async fn customers(
        &self,
        ctx: &Context<'_>,
        ids: Vec<ID>,
    ) -> GqlResult<Option<Vec<GqlCustomer>>> {
        let request = ctx.data::<RequestContext>()?;
        let ids: Vec<String> = ids.into_iter().map(|id| id.0).collect();
        let customers = request.resolve_customers(&ids).await.map(Some);
        Ok(settle(ctx, customers)
            .map(|customers| customers.into_iter().map(GqlCustomer::from).collect()))
    }

    /// Get an order by ID.
    async fn order(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<GqlOrder>> {
        let request = ctx.data::<RequestContext>()?;
        let order = request.resolve_order(&id).await;
        Ok(settle(ctx, order).map(GqlOrder::from))
    }
}

// ============================================================================
// SCHEMA & HANDLERS
// ============================================================================

/// The GraphQL schema type.
pub type GatewaySchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Create the GraphQL schema. Per-request data is attached by the handler.
pub fn create_schema() -> GatewaySchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish()
}

/// Handler for GraphQL requests.
///
/// Builds a fresh [`RequestContext`] bound to the caller's `authorization`
/// header and the request id, then executes the query against it.
pub async fn graphql_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    // A non-UTF-8 header cannot be forwarded verbatim, so treat it as absent.
    let credential = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let context = state.contexts.build(request_id.as_str(), credential);

    tracing::debug!(
        request_id = %request_id,
        has_credential = credential.is_some(),
        "Executing GraphQL request"
    );

    let request = req.into_inner().data(context);
    state.schema.execute(request).await.into()
}

/// Handler for GraphiQL playground.
pub async fn graphiql_handler() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the GraphQL routes router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql_handler).post(graphql_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdl_exposes_graph_shape() {
        let sdl = create_schema().sdl();

        assert!(sdl.contains("customer(id: ID!): Customer"));
        assert!(sdl.contains("customers(ids: [ID!]!): [Customer!]"));
        assert!(sdl.contains("order(id: ID!): Order"));
        assert!(sdl.contains("createdAt: String!"));
        assert!(sdl.contains("orders: [Order!]"));
        assert!(sdl.contains("customer: Customer"));
        assert!(!sdl.contains("customerId"));
    }

    #[test]
    fn test_gql_order_round_trips_foreign_key() {
        let order = Order {
            id: "o-100".to_string(),
            status: "PAID".to_string(),
            total: 199.0,
            created_at: "2026-03-01T09:00:00.000Z".to_string(),
            customer_id: "c-001".to_string(),
        };

        let gql = GqlOrder::from(order.clone());
        assert_eq!(gql.id.as_str(), "o-100");
        assert_eq!(Order::from(&gql), order);
    }

    #[tokio::test]
    async fn test_query_without_context_is_an_error() {
        let response = create_schema()
            .execute(r#"{ customer(id: "c-001") { id } }"#)
            .await;
        assert_eq!(response.errors.len(), 1);
    }
}
