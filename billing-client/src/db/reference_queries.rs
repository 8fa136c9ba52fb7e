use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{ContractClass, FacilitySettings, MonthlyDemand, TariffRate, YekdemRecord};

const FACILITY_COLUMNS: &str = r#"
    account_id,
    facility_id,
    tier,
    voltage,
    sector,
    contracted_demand_kw,
    energy_pricing
"#;

pub async fn facility_settings(
    pool: &PgPool,
    account_id: &str,
    facility_id: &str,
) -> Result<Option<FacilitySettings>> {
    let sql = format!(
        "SELECT {FACILITY_COLUMNS} FROM facility_settings WHERE account_id = $1 AND facility_id = $2"
    );
    let row = sqlx::query_as::<_, FacilitySettings>(&sql)
        .bind(account_id)
        .bind(facility_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Every billable facility, ordered for stable run logs.
pub async fn billable_facilities(pool: &PgPool) -> Result<Vec<FacilitySettings>> {
    let sql = format!(
        "SELECT {FACILITY_COLUMNS} FROM facility_settings WHERE billable ORDER BY account_id, facility_id"
    );
    let rows = sqlx::query_as::<_, FacilitySettings>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn monthly_demand(
    pool: &PgPool,
    facility_id: &str,
    period_year: i32,
    period_month: i32,
) -> Result<Option<MonthlyDemand>> {
    let row = sqlx::query_as::<_, MonthlyDemand>(
        r#"
        SELECT
            facility_id,
            period_year,
            period_month,
            peak_kw,
            is_final,
            multiplier
        FROM monthly_demand
        WHERE facility_id = $1
          AND period_year = $2
          AND period_month = $3
        "#,
    )
    .bind(facility_id)
    .bind(period_year)
    .bind(period_month)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All rate sets of a contract class, whatever their validity window.
///
/// Window selection and the ambiguity check stay in the engine so they are
/// applied identically to every source.
pub async fn tariff_candidates(pool: &PgPool, class: &ContractClass) -> Result<Vec<TariffRate>> {
    let rows = sqlx::query_as::<_, TariffRate>(
        r#"
        SELECT
            tariff_id,
            tier,
            voltage,
            sector,
            valid_from,
            valid_until,
            energy_unit_price,
            distribution_unit_price,
            demand_base_unit_price,
            demand_excess_unit_price,
            reactive_unit_price,
            btv_rate,
            vat_rate
        FROM tariff_rate
        WHERE tier = $1
          AND voltage = $2
          AND sector = $3
        ORDER BY valid_from, tariff_id
        "#,
    )
    .bind(class.tier.as_str())
    .bind(class.voltage.as_str())
    .bind(class.sector.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn yekdem_record(
    pool: &PgPool,
    facility_id: &str,
    period_year: i32,
    period_month: i32,
) -> Result<Option<YekdemRecord>> {
    let row = sqlx::query_as::<_, YekdemRecord>(
        r#"
        SELECT
            facility_id,
            period_year,
            period_month,
            official_rate_per_mwh,
            custom_rate_per_mwh,
            adjustment
        FROM yekdem_record
        WHERE facility_id = $1
          AND period_year = $2
          AND period_month = $3
        "#,
    )
    .bind(facility_id)
    .bind(period_year)
    .bind(period_month)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
