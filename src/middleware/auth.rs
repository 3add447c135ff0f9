use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::UserType, error::AppError};

/// Token claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserType,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub exp: usize,
}

/// The authenticated party behind a request, resolved once at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Customer { user_id: Uuid, customer_id: Uuid },
    Manager { user_id: Uuid },
    Chef { user_id: Uuid },
    Delivery { user_id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PlaceOrder,
    CancelOrder,
    AdvanceDelivery,
    PrepareItems,
    ViewAllOrders,
    ViewAssignedOrders,
    ViewOwnOrders,
    DeleteOrder,
}

impl Actor {
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Actor::Anonymous => matches!(capability, PlaceOrder),
            Actor::Customer { .. } => matches!(capability, PlaceOrder | ViewOwnOrders),
            Actor::Manager { .. } => matches!(
                capability,
                PlaceOrder | CancelOrder | ViewAllOrders | DeleteOrder
            ),
            Actor::Chef { .. } => matches!(capability, PlaceOrder | PrepareItems),
            Actor::Delivery { .. } => {
                matches!(capability, PlaceOrder | AdvanceDelivery | ViewAssignedOrders)
            }
        }
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::Anonymous => None,
            Actor::Customer { user_id, .. }
            | Actor::Manager { user_id }
            | Actor::Chef { user_id }
            | Actor::Delivery { user_id } => Some(*user_id),
        }
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            Actor::Customer { customer_id, .. } => Some(*customer_id),
            _ => None,
        }
    }

    pub fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
        let actor = match claims.role {
            UserType::Manager => Actor::Manager { user_id },
            UserType::Chef => Actor::Chef { user_id },
            UserType::Delivery => Actor::Delivery { user_id },
            UserType::Customer => {
                let customer_id = claims.customer_id.ok_or_else(|| {
                    AppError::Unauthorized("Customer token without customer id".into())
                })?;
                Actor::Customer {
                    user_id,
                    customer_id,
                }
            }
        };
        Ok(actor)
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Walk-in orders carry no credentials at all.
        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Actor::Anonymous);
        };

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
        };

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        Actor::from_claims(&decoded.claims)
    }
}
