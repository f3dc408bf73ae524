//! Postgres implementations of the storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::error::{CoreError, CoreResult};
use gatepass_core::store::{
    CheckInAttempt, EventStore, MembershipStore, OrderStore, PayoutAccountStore, Storage,
    TicketTypeStore,
};
use gatepass_core::types::{
    Attendee, Buyer, Currency, EventId, EventSummary, Money, Order, OrderId, OrderItem,
    OrderItemId, OrderStatus, OrgRole, OrganizationId, PayoutAccount, PayoutAccountId,
    ProviderKind, TicketStatus, TicketType, TicketTypeId, UserId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Connection-pooled Postgres backend.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connects to the database and builds the pool.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] when the connection fails.
    pub async fn connect(database_url: &str) -> CoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] when a migration fails.
    pub async fn run_migrations(&self) -> CoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| CoreError::Storage(err.to_string()))
    }

    /// The underlying pool, for health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bundles this backend into a [`Storage`] handle set.
    #[must_use]
    pub fn storage(&self) -> Storage {
        Storage {
            ticket_types: Arc::new(self.clone()),
            orders: Arc::new(self.clone()),
            events: Arc::new(self.clone()),
            payout_accounts: Arc::new(self.clone()),
            memberships: Arc::new(self.clone()),
        }
    }
}

fn db_err(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

#[allow(clippy::cast_possible_wrap)]
const fn money_to_db(money: Money) -> i64 {
    money.minor() as i64
}

#[allow(clippy::cast_sign_loss)]
const fn money_from_db(value: i64) -> Money {
    Money::from_minor(value as u64)
}

#[allow(clippy::cast_possible_wrap)]
const fn quantity_to_db(quantity: u32) -> i32 {
    quantity as i32
}

#[allow(clippy::cast_sign_loss)]
const fn quantity_from_db(value: i32) -> u32 {
    value as u32
}

fn parse_order_status(value: &str) -> CoreResult<OrderStatus> {
    match value {
        "pending" => Ok(OrderStatus::Pending),
        "requires_action" => Ok(OrderStatus::RequiresAction),
        "paid" => Ok(OrderStatus::Paid),
        "failed" => Ok(OrderStatus::Failed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        "refunded" => Ok(OrderStatus::Refunded),
        other => Err(CoreError::Storage(format!("unknown order status: {other}"))),
    }
}

fn parse_ticket_status(value: &str) -> CoreResult<TicketStatus> {
    match value {
        "available" => Ok(TicketStatus::Available),
        "sold" => Ok(TicketStatus::Sold),
        "checked_in" => Ok(TicketStatus::CheckedIn),
        "expired" => Ok(TicketStatus::Expired),
        "refunded" => Ok(TicketStatus::Refunded),
        other => Err(CoreError::Storage(format!("unknown ticket status: {other}"))),
    }
}

fn parse_provider(value: &str) -> CoreResult<ProviderKind> {
    match value {
        "free" => Ok(ProviderKind::Free),
        "stripe" => Ok(ProviderKind::Stripe),
        "paystack" => Ok(ProviderKind::Paystack),
        other => Err(CoreError::Storage(format!("unknown provider: {other}"))),
    }
}

fn parse_role(value: &str) -> CoreResult<OrgRole> {
    match value {
        "owner" => Ok(OrgRole::Owner),
        "admin" => Ok(OrgRole::Admin),
        "member" => Ok(OrgRole::Member),
        other => Err(CoreError::Storage(format!("unknown role: {other}"))),
    }
}

fn row_to_ticket_type(row: &PgRow) -> CoreResult<TicketType> {
    Ok(TicketType {
        id: TicketTypeId::from_uuid(row.try_get("id").map_err(db_err)?),
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(db_err)?),
        name: row.try_get("name").map_err(db_err)?,
        price: money_from_db(row.try_get("price").map_err(db_err)?),
        currency: Currency::new(row.try_get::<String, _>("currency").map_err(db_err)?.as_str()),
        is_paid: row.try_get("is_paid").map_err(db_err)?,
        quantity_total: quantity_from_db(row.try_get("quantity_total").map_err(db_err)?),
        quantity_sold: quantity_from_db(row.try_get("quantity_sold").map_err(db_err)?),
        sales_start: row.try_get("sales_start").map_err(db_err)?,
        sales_end: row.try_get("sales_end").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

fn row_to_order(row: &PgRow) -> CoreResult<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id").map_err(db_err)?),
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(db_err)?),
        buyer: Buyer {
            name: row.try_get("buyer_name").map_err(db_err)?,
            email: row.try_get("buyer_email").map_err(db_err)?,
            phone: row.try_get("buyer_phone").map_err(db_err)?,
        },
        status: parse_order_status(row.try_get::<String, _>("status").map_err(db_err)?.as_str())?,
        provider: parse_provider(row.try_get::<String, _>("provider").map_err(db_err)?.as_str())?,
        provider_reference: row.try_get("provider_reference").map_err(db_err)?,
        checkout_url: row.try_get("checkout_url").map_err(db_err)?,
        currency: Currency::new(row.try_get::<String, _>("currency").map_err(db_err)?.as_str()),
        amount: money_from_db(row.try_get("amount").map_err(db_err)?),
        platform_fee: money_from_db(row.try_get("platform_fee").map_err(db_err)?),
        organizer_take_home: money_from_db(row.try_get("organizer_take_home").map_err(db_err)?),
        payout_account_id: row
            .try_get::<Option<Uuid>, _>("payout_account_id")
            .map_err(db_err)?
            .map(PayoutAccountId::from_uuid),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(db_err)?,
    })
}

fn row_to_item(row: &PgRow) -> CoreResult<OrderItem> {
    let attendees: Vec<Attendee> =
        serde_json::from_value(row.try_get::<serde_json::Value, _>("attendees").map_err(db_err)?)
            .map_err(|err| CoreError::Storage(format!("attendees column: {err}")))?;
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get("id").map_err(db_err)?),
        order_id: OrderId::from_uuid(row.try_get("order_id").map_err(db_err)?),
        ticket_type_id: TicketTypeId::from_uuid(row.try_get("ticket_type_id").map_err(db_err)?),
        ticket_name: row.try_get("ticket_name").map_err(db_err)?,
        quantity: quantity_from_db(row.try_get("quantity").map_err(db_err)?),
        unit_price: money_from_db(row.try_get("unit_price").map_err(db_err)?),
        total: money_from_db(row.try_get("total").map_err(db_err)?),
        status: parse_ticket_status(row.try_get::<String, _>("status").map_err(db_err)?.as_str())?,
        ticket_token: row.try_get("ticket_token").map_err(db_err)?,
        attendees,
    })
}

#[async_trait]
impl TicketTypeStore for PgStorage {
    async fn get(&self, id: TicketTypeId) -> CoreResult<Option<TicketType>> {
        let row = sqlx::query(
            r"
            SELECT id, event_id, name, price, currency, is_paid,
                   quantity_total, quantity_sold, sales_start, sales_end, is_active
            FROM ticket_types
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_ticket_type).transpose()
    }

    async fn list_for_event(&self, event_id: EventId) -> CoreResult<Vec<TicketType>> {
        let rows = sqlx::query(
            r"
            SELECT id, event_id, name, price, currency, is_paid,
                   quantity_total, quantity_sold, sales_start, sales_end, is_active
            FROM ticket_types
            WHERE event_id = $1
            ORDER BY name
            ",
        )
        .bind(*event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_ticket_type).collect()
    }

    async fn reserve(&self, id: TicketTypeId, quantity: u32) -> CoreResult<bool> {
        // The availability check and the increment are one statement; the
        // row count is the claim verdict.
        let result = sqlx::query(
            r"
            UPDATE ticket_types
            SET quantity_sold = quantity_sold + $2
            WHERE id = $1
              AND is_active
              AND quantity_sold + $2 <= quantity_total
            ",
        )
        .bind(*id.as_uuid())
        .bind(quantity_to_db(quantity))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: TicketTypeId, quantity: u32) -> CoreResult<()> {
        sqlx::query(
            r"
            UPDATE ticket_types
            SET quantity_sold = GREATEST(quantity_sold - $2, 0)
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .bind(quantity_to_db(quantity))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStorage {
    async fn create(&self, order: &Order, items: &[OrderItem]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO orders (
                id, event_id, buyer_name, buyer_email, buyer_phone,
                status, provider, provider_reference, checkout_url,
                currency, amount, platform_fee, organizer_take_home,
                payout_account_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(*order.id.as_uuid())
        .bind(*order.event_id.as_uuid())
        .bind(&order.buyer.name)
        .bind(&order.buyer.email)
        .bind(&order.buyer.phone)
        .bind(order.status.as_str())
        .bind(order.provider.as_str())
        .bind(&order.provider_reference)
        .bind(&order.checkout_url)
        .bind(order.currency.as_str())
        .bind(money_to_db(order.amount))
        .bind(money_to_db(order.platform_fee))
        .bind(money_to_db(order.organizer_take_home))
        .bind(order.payout_account_id.map(|id| *id.as_uuid()))
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for item in items {
            let attendees = serde_json::to_value(&item.attendees)
                .map_err(|err| CoreError::Storage(format!("attendees column: {err}")))?;
            sqlx::query(
                r"
                INSERT INTO order_items (
                    id, order_id, ticket_type_id, ticket_name, quantity,
                    unit_price, total, status, ticket_token, attendees
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(*item.id.as_uuid())
            .bind(*item.order_id.as_uuid())
            .bind(*item.ticket_type_id.as_uuid())
            .bind(&item.ticket_name)
            .bind(quantity_to_db(item.quantity))
            .bind(money_to_db(item.unit_price))
            .bind(money_to_db(item.total))
            .bind(item.status.as_str())
            .bind(&item.ticket_token)
            .bind(attendees)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(order_id = %order.id, items = items.len(), "order persisted");
        Ok(())
    }

    async fn get(&self, id: OrderId) -> CoreResult<Option<Order>> {
        let row = sqlx::query(
            r"
            SELECT id, event_id, buyer_name, buyer_email, buyer_phone,
                   status, provider, provider_reference, checkout_url,
                   currency, amount, platform_fee, organizer_take_home,
                   payout_account_id, created_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> CoreResult<Option<Order>> {
        let row = sqlx::query(
            r"
            SELECT id, event_id, buyer_name, buyer_email, buyer_phone,
                   status, provider, provider_reference, checkout_url,
                   currency, amount, platform_fee, organizer_take_home,
                   payout_account_id, created_at
            FROM orders
            WHERE provider_reference = $1
            ",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn set_provider_fields(
        &self,
        id: OrderId,
        reference: &str,
        checkout_url: Option<&str>,
    ) -> CoreResult<()> {
        sqlx::query(
            r"
            UPDATE orders
            SET provider_reference = $2, checkout_url = $3
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .bind(reference)
        .bind(checkout_url)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn begin_finalize(&self, id: OrderId, to: OrderStatus) -> CoreResult<bool> {
        // Conditional on a non-terminal status; concurrent deliveries race
        // on the row count, not on a read. The item transition for a paid
        // order commits in the same transaction as the status CAS.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2
            WHERE id = $1 AND status IN ('pending', 'requires_action')
            ",
        )
        .bind(*id.as_uuid())
        .bind(to.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() != 1 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        if to == OrderStatus::Paid {
            sqlx::query(
                r"
                UPDATE order_items
                SET status = 'sold'
                WHERE order_id = $1 AND status = 'available'
                ",
            )
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn items_for_order(&self, id: OrderId) -> CoreResult<Vec<OrderItem>> {
        let rows = sqlx::query(
            r"
            SELECT id, order_id, ticket_type_id, ticket_name, quantity,
                   unit_price, total, status, ticket_token, attendees
            FROM order_items
            WHERE order_id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_item).collect()
    }

    async fn find_item_by_token(&self, token: &str) -> CoreResult<Option<OrderItem>> {
        let row = sqlx::query(
            r"
            SELECT id, order_id, ticket_type_id, ticket_name, quantity,
                   unit_price, total, status, ticket_token, attendees
            FROM order_items
            WHERE ticket_token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn check_in_item(&self, id: OrderItemId) -> CoreResult<CheckInAttempt> {
        let updated = sqlx::query(
            r"
            UPDATE order_items
            SET status = 'checked_in'
            WHERE id = $1 AND status = 'sold'
            RETURNING id, order_id, ticket_type_id, ticket_name, quantity,
                      unit_price, total, status, ticket_token, attendees
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        if let Some(row) = updated {
            return Ok(CheckInAttempt::CheckedIn(row_to_item(&row)?));
        }

        // Lost the CAS; report why.
        let row = sqlx::query("SELECT status FROM order_items WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Err(CoreError::Storage(format!("order item {id} not found")));
        };
        let status = parse_ticket_status(row.try_get::<String, _>("status").map_err(db_err)?.as_str())?;
        Ok(match status {
            TicketStatus::CheckedIn => CheckInAttempt::AlreadyCheckedIn,
            _ => CheckInAttempt::NotEligible,
        })
    }
}

#[async_trait]
impl EventStore for PgStorage {
    async fn get(&self, id: EventId) -> CoreResult<Option<EventSummary>> {
        let row = sqlx::query(
            r"
            SELECT id, organization_id, name, country, is_published, is_approved
            FROM events
            WHERE id = $1
            ",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|row| {
            Ok(EventSummary {
                id: EventId::from_uuid(row.try_get("id").map_err(db_err)?),
                organization_id: OrganizationId::from_uuid(
                    row.try_get("organization_id").map_err(db_err)?,
                ),
                name: row.try_get("name").map_err(db_err)?,
                country: row.try_get("country").map_err(db_err)?,
                is_published: row.try_get("is_published").map_err(db_err)?,
                is_approved: row.try_get("is_approved").map_err(db_err)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl PayoutAccountStore for PgStorage {
    async fn default_active_for(
        &self,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<PayoutAccount>> {
        let row = sqlx::query(
            r"
            SELECT id, organization_id, provider, provider_account_code, is_default, is_active
            FROM payout_accounts
            WHERE organization_id = $1 AND is_default AND is_active
            LIMIT 1
            ",
        )
        .bind(*organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|row| {
            Ok(PayoutAccount {
                id: PayoutAccountId::from_uuid(row.try_get("id").map_err(db_err)?),
                organization_id: OrganizationId::from_uuid(
                    row.try_get("organization_id").map_err(db_err)?,
                ),
                provider: parse_provider(
                    row.try_get::<String, _>("provider").map_err(db_err)?.as_str(),
                )?,
                provider_account_code: row.try_get("provider_account_code").map_err(db_err)?,
                is_default: row.try_get("is_default").map_err(db_err)?,
                is_active: row.try_get("is_active").map_err(db_err)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl MembershipStore for PgStorage {
    async fn role_in(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> CoreResult<Option<OrgRole>> {
        let row = sqlx::query(
            r"
            SELECT role FROM organization_members
            WHERE user_id = $1 AND organization_id = $2
            ",
        )
        .bind(*user_id.as_uuid())
        .bind(*organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|row| parse_role(row.try_get::<String, _>("role").map_err(db_err)?.as_str()))
            .transpose()
    }
}
