#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use restaurant_pos_api::{
    db::{create_orm_conn, run_migrations},
    entity::{
        customers::ActiveModel as CustomerActive,
        products::ActiveModel as ProductActive,
        sea_orm_active_enums::{PaymentType, ProductType, UserType},
        users::ActiveModel as UserActive,
    },
    middleware::auth::Actor,
    payment::{GatewayResponse, PaymentError, PaymentGateway, PaymentMethod},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Authorize(i64),
    Refund(i64),
}

/// In-process stand-in for the processor. Answers with fixed statuses and
/// remembers every call it received.
pub struct RecordingGateway {
    authorize_status: Mutex<u16>,
    refund_status: Mutex<u16>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingGateway {
    pub fn approving() -> Arc<Self> {
        Self::with_statuses(201, 201)
    }

    pub fn with_statuses(authorize: u16, refund: u16) -> Arc<Self> {
        Arc::new(Self {
            authorize_status: Mutex::new(authorize),
            refund_status: Mutex::new(refund),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_refund_status(&self, status: u16) {
        *self.refund_status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refunds(&self) -> Vec<i64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Refund(amount) => Some(amount),
                Call::Authorize(_) => None,
            })
            .collect()
    }

    fn answer(status: u16) -> GatewayResponse {
        let body = if status == 201 {
            json!({ "status": "accepted" })
        } else {
            json!({ "status": "declined", "reason": "insufficient funds" })
        };
        GatewayResponse { status, body }
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn authorize(
        &self,
        _method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError> {
        self.calls.lock().unwrap().push(Call::Authorize(amount));
        Ok(Self::answer(*self.authorize_status.lock().unwrap()))
    }

    async fn refund(
        &self,
        _method: &PaymentMethod,
        amount: i64,
    ) -> Result<GatewayResponse, PaymentError> {
        self.calls.lock().unwrap().push(Call::Refund(amount));
        Ok(Self::answer(*self.refund_status.lock().unwrap()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(RecordingGateway::approving()).await
}

pub async fn setup_with(gateway: Arc<RecordingGateway>) -> anyhow::Result<TestApp> {
    let orm = create_orm_conn("sqlite::memory:", 1).await?;
    run_migrations(&orm).await?;
    let state = AppState::new(orm, gateway.clone());
    Ok(TestApp { state, gateway })
}

pub async fn product(
    app: &TestApp,
    name: &str,
    product_type: ProductType,
    price: i64,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        product_type: Set(product_type),
        description: Set(None),
        price: Set(price),
        created_at: Set(Utc::now().into()),
    }
    .insert(&app.state.orm)
    .await?;
    Ok(product.id)
}

pub async fn staff(app: &TestApp, user_type: UserType) -> anyhow::Result<Actor> {
    let user_id = user(app, user_type).await?;
    let actor = match user_type {
        UserType::Manager => Actor::Manager { user_id },
        UserType::Chef => Actor::Chef { user_id },
        UserType::Delivery => Actor::Delivery { user_id },
        UserType::Customer => anyhow::bail!("use customer() for customer accounts"),
    };
    Ok(actor)
}

pub async fn customer(app: &TestApp, points: i64) -> anyhow::Result<Actor> {
    let user_id = user(app, UserType::Customer).await?;
    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(points),
        default_payment_type: Set(PaymentType::Visa),
        default_payment_reference: Set("4111111111111111".into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&app.state.orm)
    .await?;
    Ok(Actor::Customer {
        user_id,
        customer_id: customer.id,
    })
}

async fn user(app: &TestApp, user_type: UserType) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        name: Set(format!("{user_type:?}")),
        email: Set(format!("{id}@example.com")),
        user_type: Set(user_type),
        created_at: Set(Utc::now().into()),
    }
    .insert(&app.state.orm)
    .await?;
    Ok(id)
}

pub fn walk_in_payment() -> PaymentMethod {
    PaymentMethod {
        payment_type: PaymentType::Mbway,
        reference: "912345678".into(),
    }
}

pub fn declined_body() -> Value {
    json!({ "status": "declined", "reason": "insufficient funds" })
}
