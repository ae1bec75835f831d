use ars_core::repository::{
    FlightRepository, PaymentRepository, RescheduleCommit, ReservationRepository, UserRepository,
};
use ars_core::{
    CoreError, CoreResult, Flight, PassengerCounts, Payment, PaymentStatus, Refund, Reservation,
    ReservationStatus, Schedule, Seat, User,
};
use ars_shared::Masked;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

/// sqlx errors into the domain taxonomy. Unique violations are conflicts,
/// pool exhaustion and I/O are worth a retry, everything else is internal.
pub fn map_db_error(e: sqlx::Error) -> CoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            CoreError::ConflictError(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            CoreError::TransientError(e.to_string())
        }
        _ => CoreError::InternalError(e.to_string()),
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    origin_code: String,
    destination_code: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    duration_minutes: i32,
    aircraft_type: String,
    total_seats: i32,
    base_fare_cents: i64,
    seat_layout_id: Option<Uuid>,
}

impl From<FlightRow> for Flight {
    fn from(r: FlightRow) -> Self {
        Flight {
            id: r.id,
            flight_number: r.flight_number,
            origin_code: r.origin_code,
            destination_code: r.destination_code,
            departure_time: r.departure_time,
            arrival_time: r.arrival_time,
            duration_minutes: r.duration_minutes,
            aircraft_type: r.aircraft_type,
            total_seats: r.total_seats,
            base_fare_cents: r.base_fare_cents,
            seat_layout_id: r.seat_layout_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    flight_id: Uuid,
    date: NaiveDate,
    status: String,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = CoreError;

    fn try_from(r: ScheduleRow) -> CoreResult<Self> {
        Ok(Schedule {
            id: r.id,
            flight_id: r.flight_id,
            date: r.date,
            status: r.status.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    seat_layout_id: Uuid,
    row_number: i32,
    seat_column: String,
    label: String,
    cabin_class: String,
    is_exit_row: bool,
    is_premium: bool,
    price_modifier_cents: Option<i64>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = CoreError;

    fn try_from(r: SeatRow) -> CoreResult<Self> {
        Ok(Seat {
            id: r.id,
            seat_layout_id: r.seat_layout_id,
            row_number: r.row_number,
            column: r.seat_column,
            label: r.label,
            cabin_class: r
                .cabin_class
                .parse()
                .map_err(|_| CoreError::InternalError(format!("Unknown cabin class: {}", r.cabin_class)))?,
            is_exit_row: r.is_exit_row,
            is_premium: r.is_premium,
            price_modifier_cents: r.price_modifier_cents,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    user_id: Uuid,
    flight_id: Uuid,
    schedule_id: Uuid,
    booking_date: NaiveDate,
    travel_date: NaiveDate,
    seat_id: Option<Uuid>,
    seat_label: Option<String>,
    num_adults: i32,
    num_children: i32,
    num_seniors: i32,
    fare_class: String,
    status: String,
    confirmation_number: Option<String>,
    blocking_number: Option<String>,
    hold_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(r: ReservationRow) -> CoreResult<Self> {
        Ok(Reservation {
            id: r.id,
            user_id: r.user_id,
            flight_id: r.flight_id,
            schedule_id: r.schedule_id,
            booking_date: r.booking_date,
            travel_date: r.travel_date,
            seat_id: r.seat_id,
            seat_label: r.seat_label,
            passengers: PassengerCounts::new(r.num_adults, r.num_children, r.num_seniors),
            fare_class: r
                .fare_class
                .parse()
                .map_err(|_| CoreError::InternalError(format!("Unknown fare class: {}", r.fare_class)))?,
            status: r.status.parse()?,
            confirmation_number: r.confirmation_number,
            blocking_number: r.blocking_number,
            hold_expires_at: r.hold_expires_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    reservation_id: Uuid,
    amount_cents: i64,
    payment_method: String,
    status: String,
    transaction_ref: Option<String>,
    paid_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = CoreError;

    fn try_from(r: PaymentRow) -> CoreResult<Self> {
        Ok(Payment {
            id: r.id,
            reservation_id: r.reservation_id,
            amount_cents: r.amount_cents,
            payment_method: r.payment_method,
            status: r.status.parse()?,
            transaction_ref: r.transaction_ref,
            paid_at: r.paid_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    reservation_id: Uuid,
    amount_cents: i64,
    percentage: f64,
    refunded_at: DateTime<Utc>,
}

const FLIGHT_COLUMNS: &str = "id, flight_number, origin_code, destination_code, departure_time, arrival_time, \
     duration_minutes, aircraft_type, total_seats, base_fare_cents, seat_layout_id";

const RESERVATION_COLUMNS: &str = "id, user_id, flight_id, schedule_id, booking_date, travel_date, seat_id, seat_label, \
     num_adults, num_children, num_seniors, fare_class, status, confirmation_number, blocking_number, \
     hold_expires_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, reservation_id, amount_cents, payment_method, status, transaction_ref, paid_at";

/// Conditional on the status the caller read. Returns the affected row count.
async fn write_reservation<'e, E>(executor: E, res: &Reservation, expected: ReservationStatus) -> CoreResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE reservations
        SET flight_id = $2, schedule_id = $3, travel_date = $4, seat_id = $5, seat_label = $6,
            status = $7, confirmation_number = $8, blocking_number = $9, hold_expires_at = $10,
            updated_at = $11
        WHERE id = $1 AND status = $12
        "#,
    )
    .bind(res.id)
    .bind(res.flight_id)
    .bind(res.schedule_id)
    .bind(res.travel_date)
    .bind(res.seat_id)
    .bind(&res.seat_label)
    .bind(res.status.as_str())
    .bind(&res.confirmation_number)
    .bind(&res.blocking_number)
    .bind(res.hold_expires_at)
    .bind(res.updated_at)
    .bind(expected.as_str())
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(result.rows_affected())
}

/// Insert, or update while the stored payment is still pending.
/// Returns the affected row count.
async fn write_payment<'e, E>(executor: E, p: &Payment) -> CoreResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO payments (id, reservation_id, amount_cents, payment_method, status, transaction_ref, paid_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status, transaction_ref = EXCLUDED.transaction_ref, paid_at = EXCLUDED.paid_at
        WHERE payments.status = 'PENDING'
        "#,
    )
    .bind(p.id)
    .bind(p.reservation_id)
    .bind(p.amount_cents)
    .bind(&p.payment_method)
    .bind(p.status.as_str())
    .bind(&p.transaction_ref)
    .bind(p.paid_at)
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(result.rows_affected())
}

/// Why a guarded write touched no row: the record is gone, or it moved on.
async fn stale_write<'e, E>(executor: E, table: &str, what: &str, id: Uuid, expected: &str) -> CoreError
where
    E: Executor<'e, Database = Postgres>,
{
    let current: Result<Option<String>, sqlx::Error> =
        sqlx::query_scalar(&format!("SELECT status FROM {} WHERE id = $1", table))
            .bind(id)
            .fetch_optional(executor)
            .await;
    match current {
        Ok(Some(status)) => CoreError::ConflictError(format!(
            "{} {} is {}, expected {}",
            what.to_ascii_lowercase(),
            id,
            status,
            expected
        )),
        Ok(None) => CoreError::not_found(what, id),
        Err(e) => map_db_error(e),
    }
}

/// Lock the flight row, then sum live passengers on the flight/date.
async fn lock_and_count(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    flight_id: Uuid,
    travel_date: NaiveDate,
    exclude: Uuid,
) -> CoreResult<i32> {
    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM flights WHERE id = $1 FOR UPDATE")
        .bind(flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;
    if locked.is_none() {
        return Err(CoreError::not_found("Flight", flight_id));
    }

    let taken: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(num_adults + num_children + num_seniors), 0)::BIGINT
        FROM reservations
        WHERE flight_id = $1 AND travel_date = $2 AND status <> 'CANCELLED' AND id <> $3
        "#,
    )
    .bind(flight_id)
    .bind(travel_date)
    .bind(exclude)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_db_error)?;

    Ok(taken as i32)
}

fn check_room(capacity: i32, taken: i32, requested: i32) -> CoreResult<()> {
    if taken + requested > capacity {
        return Err(CoreError::CapacityExceeded {
            capacity,
            taken,
            requested,
        });
    }
    Ok(())
}

#[async_trait]
impl FlightRepository for PgStore {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        let row: Option<FlightRow> = sqlx::query_as(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Flight::from))
    }

    async fn list_airports(&self) -> CoreResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT UPPER(origin_code) AS code FROM flights UNION SELECT UPPER(destination_code) FROM flights ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn list_route_flights(&self, origin: &str, destination: &str) -> CoreResult<Vec<Flight>> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights WHERE UPPER(origin_code) = UPPER($1) AND UPPER(destination_code) = UPPER($2) \
             ORDER BY departure_time",
            FLIGHT_COLUMNS
        ))
        .bind(origin)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>> {
        let row: Option<ScheduleRow> = sqlx::query_as("SELECT id, flight_id, date, status FROM schedules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(Schedule::try_from).transpose()
    }

    async fn find_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Option<Schedule>> {
        let row: Option<ScheduleRow> =
            sqlx::query_as("SELECT id, flight_id, date, status FROM schedules WHERE flight_id = $1 AND date = $2")
                .bind(flight_id)
                .bind(date)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        row.map(Schedule::try_from).transpose()
    }

    async fn ensure_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Schedule> {
        let fresh = Schedule::new(flight_id, date);
        // No-op update so RETURNING yields the existing row on conflict
        let row: ScheduleRow = sqlx::query_as(
            r#"
            INSERT INTO schedules (id, flight_id, date, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (flight_id, date) DO UPDATE SET flight_id = EXCLUDED.flight_id
            RETURNING id, flight_id, date, status
            "#,
        )
        .bind(fresh.id)
        .bind(flight_id)
        .bind(date)
        .bind(fresh.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Schedule::try_from(row)
    }

    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>> {
        let row: Option<SeatRow> = sqlx::query_as(
            "SELECT id, seat_layout_id, row_number, seat_column, label, cabin_class, is_exit_row, is_premium, \
             price_modifier_cents FROM seats WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        row.map(Seat::try_from).transpose()
    }

    async fn list_layout_seats(&self, layout_id: Uuid) -> CoreResult<Vec<Seat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT id, seat_layout_id, row_number, seat_column, label, cabin_class, is_exit_row, is_premium, \
             price_modifier_cents FROM seats WHERE seat_layout_id = $1 ORDER BY row_number, seat_column",
        )
        .bind(layout_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(Seat::try_from).collect()
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, first_name, last_name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(|r| User {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: Masked::new(r.email),
        }))
    }
}

#[async_trait]
impl ReservationRepository for PgStore {
    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> =
            sqlx::query_as(&format!("SELECT {} FROM reservations WHERE id = $1", RESERVATION_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_error)?;
        row.map(Reservation::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reservations WHERE user_id = $1 ORDER BY created_at DESC",
            RESERVATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn booked_passengers(&self, flight_id: Uuid, travel_date: NaiveDate) -> CoreResult<i32> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(num_adults + num_children + num_seniors), 0)::BIGINT
            FROM reservations
            WHERE flight_id = $1 AND travel_date = $2 AND status <> 'CANCELLED'
            "#,
        )
        .bind(flight_id)
        .bind(travel_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken as i32)
    }

    async fn taken_seat_ids(&self, schedule_id: Uuid) -> CoreResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT seat_id FROM reservations WHERE schedule_id = $1 AND seat_id IS NOT NULL AND status <> 'CANCELLED'",
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn insert_reservation(&self, res: &Reservation, capacity: i32) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let taken = lock_and_count(&mut tx, res.flight_id, res.travel_date, res.id).await?;
        check_room(capacity, taken, res.passenger_total())?;

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, user_id, flight_id, schedule_id, booking_date, travel_date, seat_id, seat_label,
                num_adults, num_children, num_seniors, fare_class, status, confirmation_number,
                blocking_number, hold_expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(res.id)
        .bind(res.user_id)
        .bind(res.flight_id)
        .bind(res.schedule_id)
        .bind(res.booking_date)
        .bind(res.travel_date)
        .bind(res.seat_id)
        .bind(&res.seat_label)
        .bind(res.passengers.adults)
        .bind(res.passengers.children)
        .bind(res.passengers.seniors)
        .bind(res.fare_class.as_str())
        .bind(res.status.as_str())
        .bind(&res.confirmation_number)
        .bind(&res.blocking_number)
        .bind(res.hold_expires_at)
        .bind(res.created_at)
        .bind(res.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_reservation(&self, res: &Reservation, expected: ReservationStatus) -> CoreResult<()> {
        if write_reservation(&self.pool, res, expected).await? == 0 {
            return Err(stale_write(&self.pool, "reservations", "Reservation", res.id, expected.as_str()).await);
        }
        Ok(())
    }

    async fn list_expired_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reservations WHERE status = 'BLOCKED' AND hold_expires_at <= $1",
            RESERVATION_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn apply_reschedule(&self, commit: &RescheduleCommit) -> CoreResult<()> {
        let res = &commit.reservation;
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let taken = lock_and_count(&mut tx, res.flight_id, res.travel_date, res.id).await?;
        check_room(commit.capacity, taken, res.passenger_total())?;

        if write_reservation(&mut *tx, res, commit.expected_status).await? == 0 {
            let expected = commit.expected_status.as_str();
            return Err(stale_write(&mut *tx, "reservations", "Reservation", res.id, expected).await);
        }

        if let Some(payment) = &commit.new_payment {
            if write_payment(&mut *tx, payment).await? == 0 {
                return Err(CoreError::ConflictError(format!("payment {} already settled", payment.id)));
            }
        }

        if let Some(refund) = &commit.refund {
            sqlx::query(
                "INSERT INTO refunds (id, reservation_id, amount_cents, percentage, refunded_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(refund.id)
            .bind(refund.reservation_id)
            .bind(refund.amount_cents)
            .bind(refund.percentage)
            .bind(refund.refunded_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        if !commit.refunded_payment_ids.is_empty() {
            let flipped = sqlx::query("UPDATE payments SET status = 'REFUNDED' WHERE id = ANY($1) AND status = 'COMPLETED'")
                .bind(&commit.refunded_payment_ids)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            if flipped.rows_affected() != commit.refunded_payment_ids.len() as u64 {
                return Err(CoreError::ConflictError(
                    "refunded payments changed concurrently".to_string(),
                ));
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn insert_payment(&self, payment: &Payment) -> CoreResult<()> {
        if write_payment(&self.pool, payment).await? == 0 {
            return Err(CoreError::ConflictError(format!("payment {} already settled", payment.id)));
        }
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> CoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.map(Payment::try_from).transpose()
    }

    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2, transaction_ref = $3, paid_at = $4 WHERE id = $1 AND status = $5",
        )
        .bind(payment.id)
        .bind(payment.status.as_str())
        .bind(&payment.transaction_ref)
        .bind(payment.paid_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(stale_write(&self.pool, "payments", "Payment", payment.id, expected.as_str()).await);
        }
        Ok(())
    }

    async fn list_payments(&self, reservation_id: Uuid) -> CoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE reservation_id = $1 ORDER BY paid_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn list_refunds(&self, reservation_id: Uuid) -> CoreResult<Vec<Refund>> {
        let rows: Vec<RefundRow> = sqlx::query_as(
            "SELECT id, reservation_id, amount_cents, percentage, refunded_at FROM refunds \
             WHERE reservation_id = $1 ORDER BY refunded_at DESC",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(rows
            .into_iter()
            .map(|r| Refund {
                id: r.id,
                reservation_id: r.reservation_id,
                amount_cents: r.amount_cents,
                percentage: r.percentage,
                refunded_at: r.refunded_at,
            })
            .collect())
    }

    async fn settle_payment(
        &self,
        payment: &Payment,
        reservation: Option<(&Reservation, ReservationStatus)>,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        if write_payment(&mut *tx, payment).await? == 0 {
            let pending = PaymentStatus::Pending.as_str();
            return Err(stale_write(&mut *tx, "payments", "Payment", payment.id, pending).await);
        }
        if let Some((res, expected)) = reservation {
            if write_reservation(&mut *tx, res, expected).await? == 0 {
                return Err(stale_write(&mut *tx, "reservations", "Reservation", res.id, expected.as_str()).await);
            }
        }
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(matches!(map_db_error(sqlx::Error::PoolTimedOut), CoreError::TransientError(_)));
        assert!(matches!(map_db_error(sqlx::Error::RowNotFound), CoreError::InternalError(_)));
    }
}
