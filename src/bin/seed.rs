use chrono::Utc;
use restaurant_pos_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
        products::{ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
        sea_orm_active_enums::{PaymentType, ProductType, UserType},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, config.db_max_connections).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let manager_id = ensure_user(&orm, "Manager", "manager@example.com", UserType::Manager).await?;
    let chef_id = ensure_user(&orm, "Chef", "chef@example.com", UserType::Chef).await?;
    let courier_id = ensure_user(&orm, "Courier", "delivery@example.com", UserType::Delivery).await?;
    let customer_user = ensure_user(&orm, "Regular", "customer@example.com", UserType::Customer).await?;
    let customer_id = ensure_customer(&orm, customer_user, 100).await?;
    seed_menu(&orm).await?;

    println!(
        "Seed completed. Manager: {manager_id}, Chef: {chef_id}, Delivery: {courier_id}, Customer: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    name: &str,
    email: &str,
    user_type: UserType,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        email: Set(email.to_owned()),
        user_type: Set(user_type),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} ({user_type:?})");
    Ok(user.id)
}

async fn ensure_customer(orm: &OrmConn, user_id: Uuid, points: i64) -> anyhow::Result<Uuid> {
    if let Some(existing) = Customers::find()
        .filter(CustomerCol::UserId.eq(user_id))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(points),
        default_payment_type: Set(PaymentType::Visa),
        default_payment_reference: Set("4111111111111111".to_owned()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    Ok(customer.id)
}

async fn seed_menu(orm: &OrmConn) -> anyhow::Result<()> {
    let menu = vec![
        ("Bitoque", ProductType::HotDish, "Steak with fried egg and chips", 1250),
        ("Caldo Verde", ProductType::HotDish, "Kale and potato soup", 450),
        ("Salada Mista", ProductType::ColdDish, "Mixed salad", 500),
        ("Agua 50cl", ProductType::Drink, "Still water", 120),
        ("Cafe", ProductType::Drink, "Espresso", 90),
        ("Pastel de Nata", ProductType::Dessert, "Custard tart", 150),
    ];

    for (name, product_type, description, price) in menu {
        let exists = Products::find()
            .filter(ProductCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_owned()),
            product_type: Set(product_type),
            description: Set(Some(description.to_owned())),
            price: Set(price),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
