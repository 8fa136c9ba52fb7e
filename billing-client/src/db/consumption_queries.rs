use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::PageRequest;
use crate::domain::{HourlyConsumption, HourlyMarketPrice};

/// Fetch one page of a facility's hourly consumption in `[start, end)`.
///
/// Rows come back ordered by `ts`; the caller keeps asking for the next page
/// until one comes back shorter than `page.limit`.
pub async fn consumption_page(
    pool: &PgPool,
    facility_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
    page: PageRequest,
) -> Result<Vec<HourlyConsumption>> {
    let rows = sqlx::query_as::<_, HourlyConsumption>(
        r#"
        SELECT
            ts,
            facility_id,
            active_kwh,
            inductive_kvarh,
            capacitive_kvarh
        FROM hourly_consumption
        WHERE facility_id = $1
          AND ts >= $2
          AND ts <  $3
        ORDER BY ts
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(facility_id)
    .bind(start)
    .bind(end)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch one page of hourly market clearing prices in `[start, end)`.
pub async fn market_price_page(
    pool: &PgPool,
    start: OffsetDateTime,
    end: OffsetDateTime,
    page: PageRequest,
) -> Result<Vec<HourlyMarketPrice>> {
    let rows = sqlx::query_as::<_, HourlyMarketPrice>(
        r#"
        SELECT
            ts,
            price_per_mwh
        FROM hourly_market_price
        WHERE ts >= $1
          AND ts <  $2
        ORDER BY ts
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
