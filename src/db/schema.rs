//! Idempotent schema bootstrap, run once at startup.
//!
//! Tables are created with `IF NOT EXISTS` so repeated boots against the
//! same database are safe. Columns added after the first release
//! (users.full_name, orders.shipping_address_json, the pickup photo fields)
//! are folded into the base definitions here.

use sqlx::PgPool;

use super::DbError;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS brands (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'customer'
            CHECK (role IN ('customer', 'admin', 'evaluator')),
        full_name TEXT,
        phone_number TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        sku TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        model TEXT,
        brand_id BIGINT REFERENCES brands(id),
        category_id BIGINT REFERENCES categories(id),
        condition TEXT CHECK (condition IN ('A', 'B', 'C')),
        verified INT NOT NULL DEFAULT 0,
        description TEXT,
        images_json JSONB,
        highlights_json JSONB,
        city_availability_json JSONB,
        cost_components_json JSONB,
        base_price DOUBLE PRECISION,
        list_price DOUBLE PRECISION,
        resale_price DOUBLE PRECISION,
        qty INT NOT NULL DEFAULT 0,
        rating DOUBLE PRECISION,
        reviews INT,
        location TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS carts (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL UNIQUE REFERENCES users(id),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        cart_id BIGINT NOT NULL REFERENCES carts(id),
        product_id BIGINT NOT NULL REFERENCES products(id),
        qty INT NOT NULL,
        PRIMARY KEY (cart_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'paid', 'shipped', 'completed', 'refunded')),
        subtotal DOUBLE PRECISION NOT NULL,
        tax DOUBLE PRECISION NOT NULL,
        shipping_fee DOUBLE PRECISION NOT NULL DEFAULT 0,
        total DOUBLE PRECISION NOT NULL,
        notes TEXT,
        shipping_address_json JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        order_id BIGINT NOT NULL REFERENCES orders(id),
        product_id BIGINT NOT NULL REFERENCES products(id),
        title_snapshot TEXT NOT NULL,
        unit_price DOUBLE PRECISION NOT NULL,
        qty INT NOT NULL,
        line_total DOUBLE PRECISION NOT NULL,
        PRIMARY KEY (order_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id),
        stripe_pi TEXT NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        currency TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS addresses (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        full_name TEXT NOT NULL,
        phone_number TEXT NOT NULL,
        address_line1 TEXT NOT NULL,
        address_line2 TEXT,
        city TEXT NOT NULL,
        state TEXT NOT NULL,
        postal_code TEXT NOT NULL,
        country TEXT NOT NULL DEFAULT 'Canada',
        is_default BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pickup_requests (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id),
        brand_id BIGINT REFERENCES brands(id),
        model_text TEXT,
        storage TEXT,
        condition TEXT,
        additional_info TEXT,
        photos_json JSONB,
        address_json JSONB,
        scheduled_at TEXT,
        deposit_amount DOUBLE PRECISION,
        estimated_price DOUBLE PRECISION,
        status TEXT
            CHECK (status IN ('requested', 'collected', 'evaluating', 'offered', 'accepted', 'rejected')),
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS evaluations (
        id BIGSERIAL PRIMARY KEY,
        pickup_id BIGINT NOT NULL REFERENCES pickup_requests(id),
        tester_id BIGINT REFERENCES users(id),
        diagnostics_json JSONB,
        parts_replaced_json JSONB,
        evaluation_cost DOUBLE PRECISION,
        final_offer DOUBLE PRECISION,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT REFERENCES users(id),
        action TEXT NOT NULL,
        entity TEXT NOT NULL,
        entity_id BIGINT,
        payload_json JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Create all tables if they do not exist yet.
pub async fn bootstrap(pool: &PgPool) -> Result<(), DbError> {
    for ddl in TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;
    }
    tracing::info!("Database schema is up to date ({} tables)", TABLES.len());
    Ok(())
}
