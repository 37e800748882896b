//! # Energy Audit Engine
//!
//! A library for reconciling a client's energy invoices against daily wholesale
//! market prices, producing the comparative dataset behind an energy audit report.
//!
//! ## Core Concepts
//!
//! - **Invoice lines**: billed consumption and energy-term price per supply point
//! - **Market series**: daily electricity pool and gas hub prices, summarized per month
//! - **Comparative**: client price versus market price, with the delta and its economic impact
//! - **Favorable floor**: the reported market price is never below the client price by more than
//!   a configured margin, unless an operator supplies the figure
//! - **Rollup**: month → tariff → energy → global, with consumption-weighted prices at every level
//!
//! ## Example
//!
//! ```rust,ignore
//! use energy_audit_engine::*;
//!
//! let request = AuditRequest::from_json(&std::fs::read_to_string("request.json")?)?;
//! let report = process_audit(&request)?;
//!
//! println!(
//!     "Client paid {:?} EUR/kWh, market reference {:?} EUR/kWh",
//!     report.global_kpis.avg_price_eur_kwh,
//!     report.global_comparative.market_price_eur_kwh
//! );
//! ```

pub mod engine;
pub mod error;
pub mod extremes;
pub mod ingestion;
pub mod market;
pub mod overrides;
pub mod power;
pub mod reconciler;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod stats;
pub mod tariff;
pub mod utils;
pub mod verify;

pub use engine::ReconciliationEngine;
pub use error::{AuditError, Result};
pub use extremes::{Extremes, ExtremesExtractor, PointSummary};
pub use ingestion::*;
pub use market::{DailyPrice, MarketMonthSummary, MarketSeriesBuilder};
pub use overrides::{ReportMode, ReportOverrides};
pub use power::{PowerAggregator, PowerBandTotals, PowerProfile};
pub use reconciler::{Comparative, PriceReconciler, PriceSource};
pub use report::*;
pub use rollup::GlobalRollup;
pub use schema::*;
pub use tariff::{MonthKey, MonthlyTariffBucket, TariffAggregation, TariffAggregator, TariffKey};
pub use verify::{ReportVerifier, VerificationResult};

use log::{debug, info, warn};

pub struct AuditProcessor;

impl AuditProcessor {
    pub fn process(request: &AuditRequest) -> Result<AuditReport> {
        let settings = request.settings();

        info!(
            "Reconciling {} invoice lines for period {}..{}",
            request.invoice_lines.len(),
            request.period.start,
            request.period.end
        );
        debug!(
            "Market data: {} electricity days, {} gas days; margin {}, trim {}",
            request.market_observations.electricity.len(),
            request.market_observations.gas.len(),
            settings.margin_fraction,
            settings.trim_fraction
        );

        let report = ReconciliationEngine::new(settings).reconcile(request)?;

        info!(
            "Reconciled {} tariffs across {} energy types ({} supply points)",
            report.global_kpis.tariff_count,
            report.energies.len(),
            report.global_kpis.point_count
        );

        Ok(report)
    }

    pub fn process_with_verification(
        request: &AuditRequest,
        tolerance: f64,
    ) -> Result<AuditReport> {
        let report = Self::process(request)?;

        let verification = ReportVerifier::new(&report).verify(tolerance)?;
        for warning in verification.warnings {
            debug!("Verification note: {}", warning);
        }

        Ok(report)
    }

    pub fn process_with_mode(request: &AuditRequest, mode: &ReportMode) -> Result<AuditReport> {
        let report = Self::process(request)?;
        Ok(mode.finalize(report))
    }
}

pub fn process_audit(request: &AuditRequest) -> Result<AuditReport> {
    AuditProcessor::process(request)
}

pub fn process_with_verification(request: &AuditRequest, tolerance: f64) -> Result<AuditReport> {
    AuditProcessor::process_with_verification(request, tolerance)
}

pub fn process_with_mode(request: &AuditRequest, mode: &ReportMode) -> Result<AuditReport> {
    AuditProcessor::process_with_mode(request, mode)
}

/// Rejects malformed input before any aggregation starts.
pub fn validate_request(request: &AuditRequest) -> Result<()> {
    let period = &request.period;
    if period.end < period.start {
        return Err(AuditError::InvalidPeriod {
            start: period.start.to_string(),
            end: period.end.to_string(),
        });
    }

    request.settings().validate()?;

    for (idx, line) in request.invoice_lines.iter().enumerate() {
        let record = format!("invoice line #{} ({})", idx, line.supply_point_id);

        if line.tariff_code.trim().is_empty() {
            return Err(invalid(&record, "tariffCode", "must not be empty"));
        }
        if line.supply_point_id.trim().is_empty() {
            return Err(invalid(&record, "supplyPointId", "must not be empty"));
        }

        let amounts = [
            ("consumptionKwh", Some(line.consumption_kwh)),
            ("unitPriceEurKwh", Some(line.unit_price_eur_kwh)),
            ("totalEur", Some(line.total_eur)),
            ("minContractedKw", line.min_contracted_kw),
            ("maxContractedKw", line.max_contracted_kw),
        ];
        for (field, value) in amounts {
            ensure_finite(&record, field, value)?;
        }
        if let Some(bands) = &line.contracted_power {
            for value in bands.values() {
                ensure_finite(&record, "contractedPower", value)?;
            }
        }
    }

    for (idx, obs) in request.market_observations.electricity.iter().enumerate() {
        let record = format!("electricity observation #{} ({})", idx, obs.date);
        ensure_finite(&record, "meanPriceEurMwh", Some(obs.mean_price_eur_mwh))?;
        ensure_finite(&record, "minPriceEurMwh", obs.min_price_eur_mwh)?;
        ensure_finite(&record, "maxPriceEurMwh", obs.max_price_eur_mwh)?;
        ensure_finite(&record, "stdDev", obs.std_dev)?;
        if let Some(means) = &obs.period_means {
            for value in [means.p1, means.p2, means.p3] {
                ensure_finite(&record, "periodMeans", Some(value))?;
            }
        }
    }
    for (idx, obs) in request.market_observations.gas.iter().enumerate() {
        let record = format!("gas observation #{} ({})", idx, obs.date);
        ensure_finite(&record, "meanPriceEurMwh", Some(obs.mean_price_eur_mwh))?;
    }

    let months = utils::months_in_period(period.start, period.end);
    for energy in EnergyType::ALL {
        for (month, price) in request.overrides.market_price_by_month.for_energy(energy) {
            let record = format!("{} market override {}", energy, month);
            if !price.is_finite() || *price < 0.0 {
                return Err(invalid(
                    &record,
                    "marketPriceByMonth",
                    &format!("{} is not a valid EUR/kWh price", price),
                ));
            }

            if !months.contains(month) {
                warn!("Ignoring {}: month is outside the audit period", record);
            }
        }
    }

    Ok(())
}

fn invalid(record: &str, field: &str, details: &str) -> AuditError {
    AuditError::InvalidValue {
        record: record.to_string(),
        field: field.to_string(),
        details: details.to_string(),
    }
}

fn ensure_finite(record: &str, field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() => Err(invalid(record, field, "must be a finite number")),
        _ => Ok(()),
    }
}
