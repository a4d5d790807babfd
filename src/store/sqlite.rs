//! SQLite-based storage implementation

use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use super::{Balance, Order, OrderStatus, StoreResult, Storage, User, UserId, Withdrawal};
use crate::error::ServiceError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed [`Storage`] implementation
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create the database at the given path and bring the
    /// schema up to date. Migrations are idempotent.
    pub fn open(path: &str) -> Result<Self, ServiceError> {
        let conn = Connection::open(path).map_err(ServiceError::internal)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(ServiceError::internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), ServiceError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(ServiceError::internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ServiceError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(ServiceError::internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(ServiceError::internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ServiceError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );

            -- Submitted orders; the number is unique across all users
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                number TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                accrual TEXT,
                uploaded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id);
            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);

            -- Withdrawals; amounts stored as decimal text
            CREATE TABLE IF NOT EXISTS withdrawals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                order_number TEXT NOT NULL UNIQUE,
                amount TEXT NOT NULL,
                processed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_withdrawals_user_id ON withdrawals(user_id);
            "#,
        )
        .map_err(ServiceError::internal)?;

        Ok(())
    }

    /// Compute the balance from one consistent view of both tables.
    /// Decimals are stored as text, so the sums happen here rather than
    /// in SQL.
    fn balance_in_tx(tx: &Transaction, user_id: UserId) -> Result<Balance, ServiceError> {
        let mut stmt = tx
            .prepare("SELECT accrual FROM orders WHERE user_id = ?1 AND status = 'PROCESSED'")
            .map_err(ServiceError::internal)?;
        let accrued = stmt
            .query_map(params![user_id.0 as i64], |row| {
                row.get::<_, Option<String>>(0)
            })
            .map_err(ServiceError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::internal)?
            .into_iter()
            .flatten()
            .filter_map(|s| Decimal::from_str(&s).ok())
            .sum::<Decimal>();

        let mut stmt = tx
            .prepare("SELECT amount FROM withdrawals WHERE user_id = ?1")
            .map_err(ServiceError::internal)?;
        let withdrawn = stmt
            .query_map(params![user_id.0 as i64], |row| row.get::<_, String>(0))
            .map_err(ServiceError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::internal)?
            .into_iter()
            .filter_map(|s| Decimal::from_str(&s).ok())
            .sum::<Decimal>();

        Ok(Balance {
            current: accrued - withdrawn,
            withdrawn,
        })
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: i64 = row.get(0)?;
    Ok(User {
        id: UserId(id as u64),
        login: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let id: i64 = row.get(0)?;
    let user_id: i64 = row.get(1)?;
    let status: String = row.get(3)?;
    let accrual: Option<String> = row.get(4)?;
    let uploaded_at: String = row.get(5)?;
    Ok(Order {
        id: id as u64,
        user_id: UserId(user_id as u64),
        number: row.get(2)?,
        status: OrderStatus::from_str(&status).unwrap_or(OrderStatus::New),
        accrual: accrual.and_then(|s| Decimal::from_str(&s).ok()),
        uploaded_at: parse_timestamp(&uploaded_at),
    })
}

fn row_to_withdrawal(row: &Row) -> rusqlite::Result<Withdrawal> {
    let id: i64 = row.get(0)?;
    let user_id: i64 = row.get(1)?;
    let amount: String = row.get(3)?;
    let processed_at: String = row.get(4)?;
    Ok(Withdrawal {
        id: id as u64,
        user_id: UserId(user_id as u64),
        order_number: row.get(2)?,
        sum: Decimal::from_str(&amount).unwrap_or(Decimal::ZERO),
        processed_at: parse_timestamp(&processed_at),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Map a uniqueness violation to `Conflict`, anything else to `Internal`.
fn map_insert_err(e: rusqlite::Error) -> ServiceError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return ServiceError::Conflict;
        }
    }
    ServiceError::internal(e)
}

impl Storage for SqliteStorage {
    fn create_user(&self, login: &str, password_hash: &str) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO users (login, password_hash) VALUES (?1, ?2)",
            params![login, password_hash],
        )
        .map_err(map_insert_err)?;

        Ok(User {
            id: UserId(conn.last_insert_rowid() as u64),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    fn get_user_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, login, password_hash FROM users WHERE login = ?1",
            params![login],
            row_to_user,
        )
        .optional()
        .map_err(ServiceError::internal)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, login, password_hash FROM users WHERE id = ?1",
            params![user_id.0 as i64],
            row_to_user,
        )
        .optional()
        .map_err(ServiceError::internal)
    }

    fn create_order(&self, user_id: UserId, number: &str) -> StoreResult<Order> {
        let conn = self.conn.lock().unwrap();
        let uploaded_at = Utc::now();

        conn.execute(
            "INSERT INTO orders (user_id, number, status, accrual, uploaded_at)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![
                user_id.0 as i64,
                number,
                OrderStatus::New.as_str(),
                uploaded_at.to_rfc3339(),
            ],
        )
        .map_err(map_insert_err)?;

        Ok(Order {
            id: conn.last_insert_rowid() as u64,
            user_id,
            number: number.to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at,
        })
    }

    fn get_order_by_number(&self, number: &str) -> StoreResult<Option<Order>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, user_id, number, status, accrual, uploaded_at
             FROM orders WHERE number = ?1",
            params![number],
            row_to_order,
        )
        .optional()
        .map_err(ServiceError::internal)
    }

    fn list_orders_by_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, number, status, accrual, uploaded_at
                 FROM orders WHERE user_id = ?1
                 ORDER BY uploaded_at DESC, id DESC",
            )
            .map_err(ServiceError::internal)?;

        let orders = stmt
            .query_map(params![user_id.0 as i64], row_to_order)
            .map_err(ServiceError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::internal)?;

        Ok(orders)
    }

    fn list_non_terminal_orders(&self) -> StoreResult<Vec<Order>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, number, status, accrual, uploaded_at
                 FROM orders WHERE status IN ('NEW', 'PROCESSING')
                 ORDER BY uploaded_at ASC, id ASC",
            )
            .map_err(ServiceError::internal)?;

        let orders = stmt
            .query_map([], row_to_order)
            .map_err(ServiceError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::internal)?;

        Ok(orders)
    }

    fn update_order_status_and_accrual(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE orders SET status = ?1, accrual = ?2 WHERE number = ?3",
                params![
                    status.as_str(),
                    accrual.map(|a| a.to_string()),
                    number
                ],
            )
            .map_err(ServiceError::internal)?;

        if rows_affected == 0 {
            return Err(ServiceError::NoData);
        }

        Ok(())
    }

    fn create_withdrawal(
        &self,
        user_id: UserId,
        order_number: &str,
        sum: Decimal,
    ) -> StoreResult<Withdrawal> {
        let mut conn = self.conn.lock().unwrap();

        // The balance predicate and the insert must commit atomically;
        // an immediate transaction takes the write lock up front.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(ServiceError::internal)?;

        let balance = Self::balance_in_tx(&tx, user_id)?;
        if sum > balance.current {
            return Err(ServiceError::InsufficientBalance);
        }

        let processed_at = Utc::now();
        tx.execute(
            "INSERT INTO withdrawals (user_id, order_number, amount, processed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.0 as i64,
                order_number,
                sum.to_string(),
                processed_at.to_rfc3339(),
            ],
        )
        .map_err(map_insert_err)?;

        let id = tx.last_insert_rowid() as u64;
        tx.commit().map_err(ServiceError::internal)?;

        Ok(Withdrawal {
            id,
            user_id,
            order_number: order_number.to_string(),
            sum,
            processed_at,
        })
    }

    fn list_withdrawals_by_user(&self, user_id: UserId) -> StoreResult<Vec<Withdrawal>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, order_number, amount, processed_at
                 FROM withdrawals WHERE user_id = ?1
                 ORDER BY processed_at DESC, id DESC",
            )
            .map_err(ServiceError::internal)?;

        let withdrawals = stmt
            .query_map(params![user_id.0 as i64], row_to_withdrawal)
            .map_err(ServiceError::internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ServiceError::internal)?;

        Ok(withdrawals)
    }

    fn balance_of_user(&self, user_id: UserId) -> StoreResult<Balance> {
        let mut conn = self.conn.lock().unwrap();

        // Single transaction so current and withdrawn come from the
        // same snapshot.
        let tx = conn.transaction().map_err(ServiceError::internal)?;
        let balance = Self::balance_in_tx(&tx, user_id)?;
        tx.commit().map_err(ServiceError::internal)?;

        Ok(balance)
    }
}
