use crate::error::{AuditError, Result};
use crate::extremes::EXTREMES_SIZE;
use crate::reconciler::Comparative;
use crate::report::{AuditReport, TariffComparative};
use crate::stats::safe_ratio;

/// Outcome of a consistency check that did not fail outright.
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub tariffs_checked: usize,
    pub months_checked: usize,
    pub warnings: Vec<String>,
}

/// Checks that every aggregation level of a report agrees with the level below it.
pub struct ReportVerifier<'a> {
    report: &'a AuditReport,
}

impl<'a> ReportVerifier<'a> {
    pub fn new(report: &'a AuditReport) -> Self {
        Self { report }
    }

    pub fn verify(&self, tolerance: f64) -> Result<VerificationResult> {
        let mut result = VerificationResult::default();

        for energy in &self.report.energies {
            if let Some(first) = energy.tariffs.first() {
                if energy.market_series.len() != first.months.len() {
                    result.warnings.push(format!(
                        "{} market series has {} months, tariffs have {}",
                        energy.energy_type,
                        energy.market_series.len(),
                        first.months.len()
                    ));
                }
            }

            for tariff in &energy.tariffs {
                let level = format!("{}/{}", energy.energy_type, tariff.tariff_code);
                self.verify_tariff(&level, tariff, tolerance)?;
                result.tariffs_checked += 1;
                result.months_checked += tariff.months.len();
            }
        }

        self.verify_global(tolerance)?;
        Ok(result)
    }

    fn verify_tariff(&self, level: &str, tariff: &TariffComparative, tolerance: f64) -> Result<()> {
        let month_consumption: f64 = tariff.months.iter().map(|m| m.consumption_kwh).sum();
        let month_cost: f64 = tariff.months.iter().map(|m| m.cost_eur).sum();

        check(level, "consumption", tariff.consumption_kwh, month_consumption, tolerance)?;
        check(level, "cost", tariff.cost_eur, month_cost, tolerance)?;
        check_price(
            level,
            tariff.avg_price_eur_kwh,
            safe_ratio(tariff.cost_eur, tariff.consumption_kwh),
            tolerance,
        )?;

        let extremes = &tariff.extremes;
        let lists = [
            &extremes.top_by_consumption,
            &extremes.bottom_by_consumption,
            &extremes.top_by_cost,
            &extremes.bottom_by_cost,
        ];
        if lists
            .iter()
            .any(|l| l.len() > EXTREMES_SIZE || l.len() > tariff.point_count)
        {
            return Err(AuditError::RollupInconsistency {
                level: level.to_string(),
                details: "extremes list exceeds available points".to_string(),
            });
        }

        let month_covered: f64 = tariff
            .months
            .iter()
            .map(|m| m.comparative.covered_consumption_kwh)
            .sum();
        check(
            level,
            "covered consumption",
            tariff.comparative.covered_consumption_kwh,
            month_covered,
            tolerance,
        )?;
        check_comparative(
            level,
            &tariff.comparative,
            tariff.avg_price_eur_kwh,
            tariff.consumption_kwh,
            tolerance,
        )
    }

    fn verify_global(&self, tolerance: f64) -> Result<()> {
        let kpis = &self.report.global_kpis;
        let consumption: f64 = self.report.tariffs().map(|t| t.consumption_kwh).sum();
        let cost: f64 = self.report.tariffs().map(|t| t.cost_eur).sum();

        check("global", "consumption", kpis.consumption_kwh, consumption, tolerance)?;
        check("global", "cost", kpis.cost_eur, cost, tolerance)?;
        check_price(
            "global",
            kpis.avg_price_eur_kwh,
            safe_ratio(kpis.cost_eur, kpis.consumption_kwh),
            tolerance,
        )?;

        let covered: f64 = self
            .report
            .tariffs()
            .map(|t| t.comparative.covered_consumption_kwh)
            .sum();
        let comparative = &self.report.global_comparative;
        check(
            "global",
            "covered consumption",
            comparative.covered_consumption_kwh,
            covered,
            tolerance,
        )?;
        check_comparative(
            "global",
            comparative,
            kpis.avg_price_eur_kwh,
            kpis.consumption_kwh,
            tolerance,
        )
    }
}

fn check(level: &str, field: &str, reported: f64, expected: f64, tolerance: f64) -> Result<()> {
    if (reported - expected).abs() > tolerance {
        return Err(AuditError::RollupInconsistency {
            level: level.to_string(),
            details: format!(
                "{} is {} but the parts add up to {}",
                field, reported, expected
            ),
        });
    }
    Ok(())
}

/// The comparative must price the same client figure the KPIs report, and its
/// impact must spread the delta over the whole consumption.
fn check_comparative(
    level: &str,
    comparative: &Comparative,
    avg_price: Option<f64>,
    consumption_kwh: f64,
    tolerance: f64,
) -> Result<()> {
    check_price(level, comparative.client_price_eur_kwh, avg_price, tolerance)?;

    if let (Some(delta), Some(impact)) =
        (comparative.delta_abs_eur_kwh, comparative.economic_impact_eur)
    {
        check(level, "economic impact", impact, delta * consumption_kwh, tolerance)?;
    }
    Ok(())
}

fn check_price(
    level: &str,
    reported: Option<f64>,
    expected: Option<f64>,
    tolerance: f64,
) -> Result<()> {
    match (reported, expected) {
        (None, None) => Ok(()),
        (Some(r), Some(e)) => check(level, "average price", r, e, tolerance),
        _ => Err(AuditError::RollupInconsistency {
            level: level.to_string(),
            details: format!(
                "average price is {:?} but cost over consumption gives {:?}",
                reported, expected
            ),
        }),
    }
}
