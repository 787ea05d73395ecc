use async_trait::async_trait;
use common::{MovementId, OrderId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    LedgerError, MovementType, Result, StockMovement,
    ledger::{MovementStream, StockLedger, StockLevel},
};

/// PostgreSQL-backed stock ledger implementation.
///
/// `apply_movement` runs check, decrement, and log append inside a single
/// transaction with the stock row locked via `SELECT ... FOR UPDATE`, so
/// concurrent reservations for the same product are serialized by the
/// database and can never jointly drive the quantity negative.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and creates a ledger over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_movement(row: PgRow) -> Result<StockMovement> {
        let movement_type_str: String = row.try_get("movement_type")?;

        Ok(StockMovement {
            movement_id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            delta: row.try_get("delta")?,
            movement_type: MovementType::parse(&movement_type_str)?,
            reference_id: row
                .try_get::<Option<Uuid>, _>("reference_id")?
                .map(OrderId::from_uuid),
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn register(
        &self,
        product_id: ProductId,
        initial_quantity: i64,
        low_stock_threshold: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_levels (product_id, quantity, low_stock_threshold)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id) DO UPDATE
            SET quantity = EXCLUDED.quantity,
                low_stock_threshold = EXCLUDED.low_stock_threshold
            "#,
        )
        .bind(product_id.as_str())
        .bind(initial_quantity)
        .bind(low_stock_threshold)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel> {
        let row = sqlx::query(
            "SELECT quantity, low_stock_threshold FROM stock_levels WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;

        Ok(StockLevel::new(
            row.try_get("quantity")?,
            row.try_get("low_stock_threshold")?,
        ))
    }

    #[tracing::instrument(skip(self, note), fields(product = %product_id))]
    async fn apply_movement(
        &self,
        product_id: &ProductId,
        delta: i64,
        movement_type: MovementType,
        reference_id: Option<OrderId>,
        note: Option<String>,
    ) -> Result<MovementId> {
        if delta == 0 {
            return Err(LedgerError::InvalidDelta(delta));
        }

        // The row lock is held for check + decrement + log append only;
        // dropping the transaction on any error path releases it.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT quantity FROM stock_levels WHERE product_id = $1 FOR UPDATE")
            .bind(product_id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;

        let quantity: i64 = row.try_get("quantity")?;
        if quantity + delta < 0 {
            metrics::counter!("ledger_movements_rejected_total").increment(1);
            return Err(LedgerError::InsufficientStock {
                product_id: product_id.clone(),
                requested: -delta,
                available: quantity,
            });
        }

        sqlx::query("UPDATE stock_levels SET quantity = quantity + $1 WHERE product_id = $2")
            .bind(delta)
            .bind(product_id.as_str())
            .execute(&mut *tx)
            .await?;

        let movement =
            StockMovement::new(product_id.clone(), delta, movement_type, reference_id, note);

        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, delta, movement_type, reference_id, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(movement.movement_id.as_uuid())
        .bind(movement.product_id.as_str())
        .bind(movement.delta)
        .bind(movement.movement_type.as_str())
        .bind(movement.reference_id.map(|id| id.as_uuid()))
        .bind(&movement.note)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("ledger_movements_total").increment(1);
        tracing::debug!(movement_id = %movement.movement_id, delta, "movement applied");
        Ok(movement.movement_id)
    }

    async fn movements_for_product(&self, product_id: &ProductId) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, delta, movement_type, reference_id, note, created_at
            FROM stock_movements
            WHERE product_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(product_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_movement).collect()
    }

    async fn movements_for_reference(&self, reference_id: OrderId) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, delta, movement_type, reference_id, note, created_at
            FROM stock_movements
            WHERE reference_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(reference_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_movement).collect()
    }

    async fn stream_movements(&self) -> Result<MovementStream> {
        use futures_util::stream;

        let rows = sqlx::query(
            r#"
            SELECT id, product_id, delta, movement_type, reference_id, note, created_at
            FROM stock_movements
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let movements: Vec<Result<StockMovement>> =
            rows.into_iter().map(Self::row_to_movement).collect();

        Ok(Box::pin(stream::iter(movements)))
    }
}
