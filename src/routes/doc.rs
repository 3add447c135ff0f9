use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderItemList, OrderList, OrderWithItems,
        UpdateOrderItemStatusRequest, UpdateOrderStatusRequest,
    },
    entity::sea_orm_active_enums::{OrderItemStatus, OrderStatus, PaymentType, ProductType},
    models::{Order, OrderItem},
    payment::PaymentMethod,
    response::{ApiResponse, Meta},
    routes::{health, order_items, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::delete_order,
        order_items::list_prepared_items,
        order_items::update_item_status
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            OrderItemStatus,
            PaymentType,
            ProductType,
            PaymentMethod,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            UpdateOrderItemStatusRequest,
            OrderList,
            OrderItemList,
            OrderWithItems,
            params::Pagination,
            params::OrderListQuery,
            health::HealthData,
            Meta,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<OrderItemList>,
            ApiResponse<OrderItem>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order placement, delivery and cancellation"),
        (name = "Kitchen", description = "Item preparation endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
