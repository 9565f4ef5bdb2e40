//! Seed the database with sample catalog data for local development.

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Seed the Revo database with sample brands, categories, products and a test user")]
struct Cli {
    /// Overrides DATABASE_URL from the environment
    #[arg(long)]
    database_url: Option<String>,

    /// Skip creating the test customer account
    #[arg(long)]
    no_test_user: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Some(url) = &cli.database_url {
        std::env::set_var("DATABASE_URL", url);
    }

    let pool = revo_api::db::pool().await?;
    revo_api::db::schema::bootstrap(&pool).await?;

    seed_brands(&pool).await?;
    seed_categories(&pool).await?;
    seed_products(&pool).await?;
    if !cli.no_test_user {
        seed_test_user(&pool).await?;
    }

    println!("Database seeding completed.");
    Ok(())
}

async fn seed_brands(pool: &PgPool) -> Result<()> {
    for name in ["Apple", "Samsung", "Google", "Microsoft"] {
        sqlx::query("INSERT INTO brands (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }
    println!("Seeded brands.");
    Ok(())
}

async fn seed_categories(pool: &PgPool) -> Result<()> {
    for name in ["Phone", "Laptop", "Tablet", "Accessory"] {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }
    println!("Seeded categories.");
    Ok(())
}

struct SeedProduct {
    sku: &'static str,
    title: &'static str,
    model: &'static str,
    brand: &'static str,
    category: &'static str,
    condition: &'static str,
    description: &'static str,
    image: &'static str,
    base_price: f64,
    list_price: f64,
    resale_price: f64,
    qty: i32,
    rating: f64,
    reviews: i32,
    location: &'static str,
    highlights: &'static [&'static str],
    cities: &'static [&'static str],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        sku: "IPH14-128-MID",
        title: "iPhone 14 128GB Midnight",
        model: "iPhone 14",
        brand: "Apple",
        category: "Phone",
        condition: "A",
        description: "Certified inspection, Unlocked, Includes charger",
        image: "https://via.placeholder.com/480x360.png?text=iPhone+14",
        base_price: 1049.00,
        list_price: 1049.00,
        resale_price: 899.00,
        qty: 5,
        rating: 4.8,
        reviews: 128,
        location: "Ottawa Lab",
        highlights: &["Certified inspection", "Unlocked", "Includes charger"],
        cities: &["Vancouver", "Ottawa"],
    },
    SeedProduct {
        sku: "MBA-M2-13-512",
        title: "MacBook Air 13\" M2 (2022)",
        model: "MacBook Air M2",
        brand: "Apple",
        category: "Laptop",
        condition: "B",
        description: "Battery health 92%, 512GB SSD, 2-year store warranty",
        image: "https://via.placeholder.com/480x360.png?text=MacBook+Air",
        base_price: 1599.00,
        list_price: 1599.00,
        resale_price: 1349.00,
        qty: 3,
        rating: 4.7,
        reviews: 86,
        location: "Vancouver Hub",
        highlights: &["Battery health 92%", "512GB SSD", "2-year store warranty"],
        cities: &["Vancouver", "Edmonton"],
    },
    SeedProduct {
        sku: "IPAD-PRO-11-256",
        title: "iPad Pro 11\" Wi-Fi 256GB",
        model: "iPad Pro",
        brand: "Apple",
        category: "Tablet",
        condition: "A",
        description: "Apple Pencil 2 support, Liquid Retina, Store warranty",
        image: "https://via.placeholder.com/480x360.png?text=iPad+Pro",
        base_price: 1199.00,
        list_price: 1199.00,
        resale_price: 1049.00,
        qty: 4,
        rating: 4.9,
        reviews: 64,
        location: "Edmonton Studio",
        highlights: &["Apple Pencil 2 support", "Liquid Retina", "Store warranty"],
        cities: &["Edmonton", "Ottawa"],
    },
    SeedProduct {
        sku: "GS23-256-PB",
        title: "Galaxy S23 256GB Phantom Black",
        model: "Galaxy S23",
        brand: "Samsung",
        category: "Phone",
        condition: "C",
        description: "Dynamic AMOLED, Unlocked, Includes fast charger",
        image: "https://via.placeholder.com/480x360.png?text=Galaxy+S23",
        base_price: 999.00,
        list_price: 999.00,
        resale_price: 879.00,
        qty: 6,
        rating: 4.6,
        reviews: 142,
        location: "Vancouver Hub",
        highlights: &["Dynamic AMOLED", "Unlocked", "Includes fast charger"],
        cities: &["Vancouver"],
    },
    SeedProduct {
        sku: "GTAB-S9-256",
        title: "Galaxy Tab S9 Wi-Fi 256GB",
        model: "Galaxy Tab S9",
        brand: "Samsung",
        category: "Tablet",
        condition: "A",
        description: "S Pen included, 120Hz display, IP68",
        image: "https://via.placeholder.com/480x360.png?text=Galaxy+Tab",
        base_price: 1099.00,
        list_price: 1099.00,
        resale_price: 899.00,
        qty: 4,
        rating: 4.7,
        reviews: 74,
        location: "Edmonton Studio",
        highlights: &["S Pen included", "120Hz display", "IP68"],
        cities: &["Edmonton", "Vancouver"],
    },
    SeedProduct {
        sku: "IPH15-256-BLUE",
        title: "iPhone 15 256GB Blue",
        model: "iPhone 15",
        brand: "Apple",
        category: "Phone",
        condition: "A",
        description: "Certified inspection, Unlocked, Includes USB-C cable",
        image: "https://via.placeholder.com/480x360.png?text=iPhone+15",
        base_price: 1199.00,
        list_price: 1199.00,
        resale_price: 1099.00,
        qty: 8,
        rating: 4.9,
        reviews: 203,
        location: "Vancouver Hub",
        highlights: &["Certified inspection", "Unlocked", "Includes USB-C cable"],
        cities: &["Vancouver", "Ottawa", "Edmonton"],
    },
    SeedProduct {
        sku: "MBP-14-M3-512",
        title: "MacBook Pro 14\" M3 512GB",
        model: "MacBook Pro M3",
        brand: "Apple",
        category: "Laptop",
        condition: "A",
        description: "M3 chip, Liquid Retina XDR, 18-hour battery",
        image: "https://via.placeholder.com/480x360.png?text=MacBook+Pro",
        base_price: 1999.00,
        list_price: 1999.00,
        resale_price: 1799.00,
        qty: 2,
        rating: 4.8,
        reviews: 95,
        location: "Ottawa Lab",
        highlights: &["M3 chip", "Liquid Retina XDR", "18-hour battery"],
        cities: &["Ottawa", "Vancouver"],
    },
];

async fn seed_products(pool: &PgPool) -> Result<()> {
    for p in PRODUCTS {
        sqlx::query(
            "INSERT INTO products \
             (sku, title, model, brand_id, category_id, condition, description, \
              images_json, highlights_json, city_availability_json, \
              base_price, list_price, resale_price, qty, rating, reviews, location) \
             VALUES ($1, $2, $3, \
                     (SELECT id FROM brands WHERE name = $4), \
                     (SELECT id FROM categories WHERE name = $5), \
                     $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (sku) DO NOTHING",
        )
        .bind(p.sku)
        .bind(p.title)
        .bind(p.model)
        .bind(p.brand)
        .bind(p.category)
        .bind(p.condition)
        .bind(p.description)
        .bind(json!([p.image]))
        .bind(json!(p.highlights))
        .bind(json!(p.cities))
        .bind(p.base_price)
        .bind(p.list_price)
        .bind(p.resale_price)
        .bind(p.qty)
        .bind(p.rating)
        .bind(p.reviews)
        .bind(p.location)
        .execute(pool)
        .await?;
    }
    println!("Seeded {} products.", PRODUCTS.len());
    Ok(())
}

async fn seed_test_user(pool: &PgPool) -> Result<()> {
    let password_hash = revo_api::auth::hash_password("test123")?;
    sqlx::query(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, 'customer') \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind("test@example.com")
    .bind(&password_hash)
    .execute(pool)
    .await?;
    println!("Seeded test user test@example.com (password: test123).");
    Ok(())
}
