use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{InvoiceKey, InvoiceSnapshot};

/// Insert or replace the snapshot for its key.
///
/// The update branch only fires when the stored `content_hash` differs, and
/// only touches a settled row when `overwrite_settled` is set. Returns the
/// number of rows written: 0 means the stored row was left as it was.
pub async fn upsert_snapshot(
    pool: &PgPool,
    snapshot: &InvoiceSnapshot,
    overwrite_settled: bool,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO invoice_snapshot (
            account_id,
            facility_id,
            period_year,
            period_month,
            invoice_variant,
            status,
            demand_final,
            total_consumption_kwh,
            unit_price_energy,
            unit_price_distribution,
            btv_rate,
            vat_rate,
            energy_charge,
            distribution_charge,
            btv_charge,
            demand_base_charge,
            demand_excess_charge,
            reactive_penalty_charge,
            subtotal_before_vat,
            vat_charge,
            total_invoice,
            subsidy_offset,
            total_payable,
            unused_subsidy_credit,
            content_hash,
            updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
            $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
        )
        ON CONFLICT (account_id, facility_id, period_year, period_month, invoice_variant)
        DO UPDATE SET
            status                  = EXCLUDED.status,
            demand_final            = EXCLUDED.demand_final,
            total_consumption_kwh   = EXCLUDED.total_consumption_kwh,
            unit_price_energy       = EXCLUDED.unit_price_energy,
            unit_price_distribution = EXCLUDED.unit_price_distribution,
            btv_rate                = EXCLUDED.btv_rate,
            vat_rate                = EXCLUDED.vat_rate,
            energy_charge           = EXCLUDED.energy_charge,
            distribution_charge     = EXCLUDED.distribution_charge,
            btv_charge              = EXCLUDED.btv_charge,
            demand_base_charge      = EXCLUDED.demand_base_charge,
            demand_excess_charge    = EXCLUDED.demand_excess_charge,
            reactive_penalty_charge = EXCLUDED.reactive_penalty_charge,
            subtotal_before_vat     = EXCLUDED.subtotal_before_vat,
            vat_charge              = EXCLUDED.vat_charge,
            total_invoice           = EXCLUDED.total_invoice,
            subsidy_offset          = EXCLUDED.subsidy_offset,
            total_payable           = EXCLUDED.total_payable,
            unused_subsidy_credit   = EXCLUDED.unused_subsidy_credit,
            content_hash            = EXCLUDED.content_hash,
            updated_at              = EXCLUDED.updated_at
        WHERE invoice_snapshot.content_hash IS DISTINCT FROM EXCLUDED.content_hash
          AND (invoice_snapshot.status <> 'settled' OR $27)
        "#,
    )
    .bind(&snapshot.account_id)
    .bind(&snapshot.facility_id)
    .bind(snapshot.period_year)
    .bind(snapshot.period_month)
    .bind(snapshot.invoice_variant.as_str())
    .bind(snapshot.status.as_str())
    .bind(snapshot.demand_final)
    .bind(snapshot.total_consumption_kwh)
    .bind(snapshot.unit_price_energy)
    .bind(snapshot.unit_price_distribution)
    .bind(snapshot.btv_rate)
    .bind(snapshot.vat_rate)
    .bind(snapshot.energy_charge)
    .bind(snapshot.distribution_charge)
    .bind(snapshot.btv_charge)
    .bind(snapshot.demand_base_charge)
    .bind(snapshot.demand_excess_charge)
    .bind(snapshot.reactive_penalty_charge)
    .bind(snapshot.subtotal_before_vat)
    .bind(snapshot.vat_charge)
    .bind(snapshot.total_invoice)
    .bind(snapshot.subsidy_offset)
    .bind(snapshot.total_payable)
    .bind(snapshot.unused_subsidy_credit)
    .bind(&snapshot.content_hash)
    .bind(snapshot.updated_at)
    .bind(overwrite_settled)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_snapshot(pool: &PgPool, key: &InvoiceKey) -> Result<Option<InvoiceSnapshot>> {
    let row = sqlx::query_as::<_, InvoiceSnapshot>(
        r#"
        SELECT
            account_id,
            facility_id,
            period_year,
            period_month,
            invoice_variant,
            status,
            demand_final,
            total_consumption_kwh,
            unit_price_energy,
            unit_price_distribution,
            btv_rate,
            vat_rate,
            energy_charge,
            distribution_charge,
            btv_charge,
            demand_base_charge,
            demand_excess_charge,
            reactive_penalty_charge,
            subtotal_before_vat,
            vat_charge,
            total_invoice,
            subsidy_offset,
            total_payable,
            unused_subsidy_credit,
            content_hash,
            updated_at
        FROM invoice_snapshot
        WHERE account_id = $1
          AND facility_id = $2
          AND period_year = $3
          AND period_month = $4
          AND invoice_variant = $5
        "#,
    )
    .bind(&key.account_id)
    .bind(&key.facility_id)
    .bind(key.period_year)
    .bind(key.period_month)
    .bind(key.variant.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
