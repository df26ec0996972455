use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId, SkuId, UserId};
use domain::{
    Address, Money, Order, OrderError, OrderHeader, OrderLine, OrderStatus, PayMethod, Sku,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{
        AddressBook, Catalog, CheckoutStore, OrderRepository, PaymentRecord, StoreTransaction,
        validate_savepoint_name,
    },
};

const SKU_COLUMNS: &str = "id, product_id, name, price_cents, stock, sales";

const ORDER_COLUMNS: &str = "order_id, user_id, address_id, status, pay_method, total_count, \
     total_amount_cents, freight_cents, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a product row.
    pub async fn upsert_product(&self, product_id: ProductId, name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(product_id.as_i64())
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces a SKU row. The parent product is created on demand.
    pub async fn upsert_sku(&self, sku: &Sku) -> Result<()> {
        sqlx::query("INSERT INTO products (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(sku.product_id.as_i64())
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO skus (id, product_id, name, price_cents, stock, sales)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                sales = EXCLUDED.sales
            "#,
        )
        .bind(sku.id.as_i64())
        .bind(sku.product_id.as_i64())
        .bind(&sku.name)
        .bind(sku.price.cents())
        .bind(i64::from(sku.stock))
        .bind(i64::from(sku.sales))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces an address.
    pub async fn upsert_address(&self, address: &Address) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, user_id, receiver, place, mobile, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                receiver = EXCLUDED.receiver,
                place = EXCLUDED.place,
                mobile = EXCLUDED.mobile,
                is_deleted = EXCLUDED.is_deleted
            "#,
        )
        .bind(address.id.as_i64())
        .bind(address.owner.as_i64())
        .bind(&address.receiver)
        .bind(&address.place)
        .bind(&address.mobile)
        .bind(address.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the parent product's sales counter.
    pub async fn product_sales(&self, product_id: ProductId) -> Result<u64> {
        let sales: Option<i64> = sqlx::query_scalar("SELECT sales FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        let sales = sales.ok_or_else(|| StoreError::not_found("product", product_id))?;
        u64::try_from(sales).map_err(|_| StoreError::InvalidRow(format!("sales: {sales}")))
    }

    /// Returns the number of orders owned by `owner`.
    pub async fn order_count(&self, owner: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(owner.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn count_column(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("{column}: {value}")))
}

fn row_to_sku(row: &PgRow) -> Result<Sku> {
    Ok(Sku {
        id: SkuId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: count_column(row, "stock")?,
        sales: count_column(row, "sales")?,
    })
}

fn row_to_header(row: &PgRow) -> Result<OrderHeader> {
    let status: i16 = row.try_get("status")?;
    let pay_method: i16 = row.try_get("pay_method")?;

    Ok(OrderHeader {
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        owner: UserId::new(row.try_get("user_id")?),
        address_id: AddressId::new(row.try_get("address_id")?),
        status: OrderStatus::from_code(status).ok_or(OrderError::UnknownStatus(status))?,
        pay_method: PayMethod::from_code(pay_method)
            .ok_or(OrderError::UnknownPayMethod(pay_method))?,
        total_count: count_column(row, "total_count")?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        freight: Money::from_cents(row.try_get("freight_cents")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        sku_id: SkuId::new(row.try_get("sku_id")?),
        quantity: count_column(row, "quantity")?,
        price: Money::from_cents(row.try_get("price_cents")?),
    })
}

/// A checkout transaction on a pooled PostgreSQL connection.
///
/// Dropping it without `commit` rolls the transaction back.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn get_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {SKU_COLUMNS} FROM skus WHERE id = $1"))
                .bind(sku_id.as_i64())
                .fetch_optional(&mut *self.tx)
                .await?;
        row.as_ref().map(row_to_sku).transpose()
    }

    async fn compare_and_set_stock(
        &mut self,
        sku_id: SkuId,
        expected_stock: u32,
        new_stock: u32,
        new_sales: u32,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE skus SET stock = $3, sales = $4
            WHERE id = $1 AND stock = $2
            "#,
        )
        .bind(sku_id.as_i64())
        .bind(i64::from(expected_stock))
        .bind(i64::from(new_stock))
        .bind(i64::from(new_sales))
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn add_product_sales(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET sales = sales + $2 WHERE id = $1")
            .bind(product_id.as_i64())
            .bind(i64::from(quantity))
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product_id));
        }
        Ok(())
    }

    async fn insert_order(&mut self, header: &OrderHeader) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(header.order_id.as_str())
        .bind(header.owner.as_i64())
        .bind(header.address_id.as_i64())
        .bind(header.status.code())
        .bind(header.pay_method.code())
        .bind(i64::from(header.total_count))
        .bind(header.total_amount.cents())
        .bind(header.freight.cents())
        .bind(header.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Duplicate {
                    entity: "order",
                    id: header.order_id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn insert_line(&mut self, line: &OrderLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, sku_id, quantity, price_cents)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line.order_id.as_str())
        .bind(line.sku_id.as_i64())
        .bind(i64::from(line.quantity))
        .bind(line.price.cents())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_order_totals(&mut self, header: &OrderHeader) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET total_count = $2, total_amount_cents = $3
            WHERE order_id = $1
            "#,
        )
        .bind(header.order_id.as_str())
        .bind(i64::from(header.total_count))
        .bind(header.total_amount.cents())
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", &header.order_id));
        }
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        sqlx::query(&format!("SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        validate_savepoint_name(name)?;
        sqlx::query(&format!("RELEASE SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn get_sku(&self, sku_id: SkuId) -> Result<Option<Sku>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {SKU_COLUMNS} FROM skus WHERE id = $1"))
                .bind(sku_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_sku).transpose()
    }
}

#[async_trait]
impl AddressBook for PostgresStore {
    async fn get_address(&self, address_id: AddressId, owner: UserId) -> Result<Option<Address>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, user_id, receiver, place, mobile, is_deleted
            FROM addresses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(address_id.as_i64())
        .bind(owner.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Address {
                id: AddressId::new(row.try_get("id")?),
                owner: UserId::new(row.try_get("user_id")?),
                receiver: row.try_get("receiver")?,
                place: row.try_get("place")?,
                mobile: row.try_get("mobile")?,
                is_deleted: row.try_get("is_deleted")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn get_order(&self, order_id: &OrderId, owner: UserId) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND user_id = $2"
        ))
        .bind(order_id.as_str())
        .bind(owner.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = row_to_header(&row)?;

        let lines = sqlx::query(
            r#"
            SELECT order_id, sku_id, quantity, price_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_line)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(Order::from_parts(header, lines)))
    }

    async fn order_status(&self, order_id: &OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<i16> = sqlx::query_scalar("SELECT status FROM orders WHERE order_id = $1")
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match status {
            Some(code) => Ok(Some(
                OrderStatus::from_code(code).ok_or(OrderError::UnknownStatus(code))?,
            )),
            None => Ok(None),
        }
    }

    async fn record_payment(&self, order_id: &OrderId, trade_id: &str) -> Result<PaymentRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (trade_id, order_id) VALUES ($1, $2)
            ON CONFLICT (trade_id) DO NOTHING
            "#,
        )
        .bind(trade_id)
        .bind(order_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::not_found("order", order_id);
            }
            StoreError::Database(e)
        })?;
        if result.rows_affected() == 1 {
            return Ok(PaymentRecord::Recorded);
        }

        let existing: String = sqlx::query_scalar("SELECT order_id FROM payments WHERE trade_id = $1")
            .bind(trade_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(PaymentRecord::existing(&OrderId::new(existing), order_id))
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<u64> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE order_id = $1 AND status = $2")
            .bind(order_id.as_str())
            .bind(from.code())
            .bind(to.code())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
