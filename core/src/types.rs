//! Domain types for the Gatepass ticketing marketplace.
//!
//! Value objects (id newtypes, money), entities (ticket types, orders,
//! order items, payout accounts), and the status enums that drive the
//! order lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket type (a purchasable admission category).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketTypeId(Uuid);

impl TicketTypeId {
    /// Creates a new random `TicketTypeId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketTypeId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketTypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order item (one ticket-type line in an order).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderItemId(Uuid);

impl OrderItemId {
    /// Creates a new random `OrderItemId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderItemId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an organization (event organizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(Uuid);

impl OrganizationId {
    /// Creates a new random `OrganizationId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrganizationId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payout account (organizer settlement destination).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutAccountId(Uuid);

impl PayoutAccountId {
    /// Creates a new random `PayoutAccountId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PayoutAccountId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PayoutAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PayoutAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (check-in staff, organizers).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in minor units (kobo, cents).
///
/// All arithmetic is unsigned and checked at the call sites that build
/// order totals; amounts are never negative.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Saturating multiplication by a quantity.
    #[must_use]
    pub const fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-style currency code (`NGN`, `USD`). Stored uppercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency code, normalizing to uppercase.
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Lifecycle status of an order.
///
/// `Pending` may move to `Paid` or `Failed` (webhook reconciliation);
/// every other state is terminal for reconciliation purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting payment confirmation from the provider.
    Pending,
    /// Provider requested an additional buyer step (3DS etc.).
    RequiresAction,
    /// Payment confirmed; tickets issued.
    Paid,
    /// Payment definitively failed; reserved inventory released.
    Failed,
    /// Cancelled before settlement.
    Cancelled,
    /// Refunded after settlement.
    Refunded,
}

impl OrderStatus {
    /// Whether reconciliation treats this status as final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Failed | Self::Cancelled | Self::Refunded
        )
    }

    /// Wire representation (matches the stored enum values).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::RequiresAction => "requires_action",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single order item (ticket).
///
/// Advances `Available → Sold → CheckedIn`; `Sold` is set exactly once by
/// the reconciler or the free-order fast path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Created with the order, not yet paid for.
    Available,
    /// Payment confirmed; ticket is valid for entry.
    Sold,
    /// Redeemed at the gate.
    CheckedIn,
    /// Sales window passed without payment.
    Expired,
    /// Refunded after sale.
    Refunded,
}

impl TicketStatus {
    /// Wire representation (matches the stored enum values).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::CheckedIn => "checked_in",
            Self::Expired => "expired",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment rail an order settles through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Zero-amount orders; no external provider involved.
    Free,
    /// Card rail (Stripe).
    Stripe,
    /// Local rail (Paystack).
    Paystack,
}

impl ProviderKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Stripe => "stripe",
            Self::Paystack => "paystack",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user inside an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Organization owner.
    Owner,
    /// Administrator.
    Admin,
    /// Staff member (may run check-in).
    Member,
}

impl OrgRole {
    /// Whether this role may check attendees in.
    #[must_use]
    pub const fn can_check_in(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Member)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Read model of an event as seen by the order engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier.
    pub id: EventId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Display name.
    pub name: String,
    /// Host country; drives provider routing.
    pub country: Option<String>,
    /// Organizer has published the event.
    pub is_published: bool,
    /// Platform has approved the event for sale.
    pub is_approved: bool,
}

impl EventSummary {
    /// Whether tickets may be sold for this event.
    #[must_use]
    pub const fn is_on_sale(&self) -> bool {
        self.is_published && self.is_approved
    }
}

/// A purchasable admission category with finite capacity.
///
/// Invariant: `0 <= quantity_sold <= quantity_total`, including under
/// concurrent writers. `quantity_sold` counts claimed capacity: it is
/// incremented atomically at reservation time and decremented only by the
/// compensating release paths.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicketType {
    /// Ticket type identifier.
    pub id: TicketTypeId,
    /// Event this category belongs to.
    pub event_id: EventId,
    /// Display name (`VIP`, `Early Bird`).
    pub name: String,
    /// Unit price in minor units. Zero for free admission.
    pub price: Money,
    /// Currency of `price`.
    pub currency: Currency,
    /// Whether this category requires payment.
    pub is_paid: bool,
    /// Total capacity.
    pub quantity_total: u32,
    /// Claimed capacity (reserved or sold).
    pub quantity_sold: u32,
    /// Sales open (None = immediately).
    pub sales_start: Option<DateTime<Utc>>,
    /// Sales close (None = never).
    pub sales_end: Option<DateTime<Utc>>,
    /// Category is open for sale at all.
    pub is_active: bool,
}

impl TicketType {
    /// Remaining unclaimed capacity.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.quantity_total.saturating_sub(self.quantity_sold)
    }

    /// Whether the sales window is open at `now`.
    #[must_use]
    pub fn sales_window_open(&self, now: DateTime<Utc>) -> bool {
        let started = self.sales_start.is_none_or(|start| now >= start);
        let not_ended = self.sales_end.is_none_or(|end| now <= end);
        started && not_ended
    }
}

/// Buyer contact captured at order submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Buyer {
    /// Full name.
    pub name: String,
    /// Email address (ticket delivery, notifications).
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
}

/// Attendee roster entry for a ticket-type line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Attendee name, if collected.
    pub name: Option<String>,
    /// Attendee email, if collected.
    pub email: Option<String>,
}

/// A confirmed or in-flight purchase.
///
/// Invariant: `amount == Σ(item.unit_price × item.quantity)`, and for paid
/// orders `platform_fee + organizer_take_home == amount`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub id: OrderId,
    /// Event the tickets admit to.
    pub event_id: EventId,
    /// Buyer contact.
    pub buyer: Buyer,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Payment rail.
    pub provider: ProviderKind,
    /// External payment reference, unique once set.
    pub provider_reference: Option<String>,
    /// Hosted checkout URL, when the provider supplies one.
    pub checkout_url: Option<String>,
    /// Order currency (single-currency invariant).
    pub currency: Currency,
    /// Order total in minor units.
    pub amount: Money,
    /// Platform's cut of `amount`.
    pub platform_fee: Money,
    /// Organizer's cut of `amount`.
    pub organizer_take_home: Money,
    /// Settlement destination for the organizer cut.
    pub payout_account_id: Option<PayoutAccountId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One ticket-type line of an order; `quantity` tickets share the line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item identifier.
    pub id: OrderItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Ticket type purchased.
    pub ticket_type_id: TicketTypeId,
    /// Ticket type name at purchase time.
    pub ticket_name: String,
    /// Number of tickets on this line.
    pub quantity: u32,
    /// Unit price at purchase time.
    pub unit_price: Money,
    /// Line total (`unit_price × quantity`).
    pub total: Money,
    /// Ticket lifecycle status.
    pub status: TicketStatus,
    /// Opaque check-in token encoded into the ticket QR code.
    pub ticket_token: String,
    /// Attendee roster, truncated to `quantity` entries.
    pub attendees: Vec<Attendee>,
}

impl OrderItem {
    /// Primary attendee email for notification fan-out, if collected.
    #[must_use]
    pub fn attendee_email(&self) -> Option<&str> {
        self.attendees
            .iter()
            .find_map(|attendee| attendee.email.as_deref())
    }
}

/// Organizer settlement destination. One per organization may be flagged
/// default; a default active account is required before paid sales.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayoutAccount {
    /// Account identifier.
    pub id: PayoutAccountId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Provider this account settles through.
    pub provider: ProviderKind,
    /// Provider-side account reference (Stripe account id, Paystack
    /// subaccount code).
    pub provider_account_code: String,
    /// Flagged as the organization's default destination.
    pub is_default: bool,
    /// Account is usable.
    pub is_active: bool,
}
