//! Schema creation and first-run seeding.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::auth::password;
use crate::error::Result;

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        name TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('admin', 'staff')),
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT NOT NULL CHECK (category IN ('internet', 'gas')),
        phone TEXT NOT NULL,
        pppoe_username TEXT,
        pppoe_password TEXT,
        address TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    // customer_id goes NULL on customer delete; the denormalized
    // customer_name/customer_category snapshot keeps the record readable
    "CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER REFERENCES customers(id) ON DELETE SET NULL,
        customer_name TEXT NOT NULL,
        customer_category TEXT NOT NULL,
        label TEXT NOT NULL,
        amount INTEGER NOT NULL,
        direction TEXT NOT NULL CHECK (direction IN ('income', 'expense')),
        status TEXT NOT NULL CHECK (status IN ('pending', 'settled')),
        description TEXT,
        created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS message_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER REFERENCES customers(id) ON DELETE SET NULL,
        phone TEXT NOT NULL,
        category TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('success', 'failed', 'pending')),
        preview TEXT NOT NULL,
        error TEXT,
        sent_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS activity_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
        action TEXT NOT NULL,
        detail TEXT NOT NULL,
        ip TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_transactions_customer ON transactions(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status)",
    "CREATE INDEX IF NOT EXISTS idx_message_logs_customer ON message_logs(customer_id)",
];

/// Create all tables and indexes if they do not exist yet.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Database schema ready");
    Ok(())
}

/// First-run bootstrap: two accounts (admin + staff) and default settings.
///
/// Runs only when the users table is empty, so restarts never clobber
/// operator changes.
pub async fn seed(pool: &SqlitePool) -> Result<()> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count == 0 {
        let now = Utc::now();
        for (username, plain, name, role) in [
            ("admin", "admin123", "Administrator", "admin"),
            ("staff", "staff123", "Staff", "staff"),
        ] {
            let hashed = password::hash(plain)?;
            sqlx::query(
                "INSERT INTO users (username, password, name, role, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, 1, ?, ?)",
            )
            .bind(username)
            .bind(hashed)
            .bind(name)
            .bind(role)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
        }
        tracing::info!("Seeded default admin and staff accounts");
    }

    for (key, value) in [
        ("business_name", "NetBill"),
        ("business_address", ""),
        ("price_internet", "150000"),
        ("price_gas", "25000"),
    ] {
        sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}
