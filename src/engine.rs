use crate::error::Result;
use crate::extremes::ExtremesExtractor;
use crate::market::{summary_for, MarketMonthSummary, MarketSeriesBuilder};
use crate::power::PowerAggregator;
use crate::reconciler::PriceReconciler;
use crate::report::{AuditReport, EnergyReport, TariffComparative, TariffMonth};
use crate::rollup::GlobalRollup;
use crate::schema::{
    AuditPeriod, AuditRequest, EnergyType, MarketObservations, ReconciliationSettings,
};
use crate::tariff::{
    MonthKey, TariffAccumulator, TariffAggregation, TariffAggregator, TariffKey,
};
use crate::utils::months_in_period;
use crate::validate_request;
use log::debug;

/// Runs the reconciliation pipeline with a fixed set of settings.
///
/// Holds no state between calls, so one engine can serve concurrent requests.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationEngine {
    settings: ReconciliationSettings,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(ReconciliationSettings::default())
    }
}

impl ReconciliationEngine {
    pub fn new(settings: ReconciliationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReconciliationSettings {
        &self.settings
    }

    /// Builds the market series of one energy type over the request period.
    pub fn market_series(
        &self,
        energy: EnergyType,
        observations: &MarketObservations,
        period: &AuditPeriod,
    ) -> Vec<MarketMonthSummary> {
        let builder = MarketSeriesBuilder::new(self.settings.trim_fraction);
        match energy {
            EnergyType::Electricity => builder.build(&observations.electricity, period),
            EnergyType::Gas => builder.build(&observations.gas, period),
        }
    }

    /// Runs the full pipeline, rejecting malformed requests before aggregating.
    pub fn reconcile(&self, request: &AuditRequest) -> Result<AuditReport> {
        self.settings.validate()?;
        validate_request(request)?;

        let period = &request.period;
        let aggregation = TariffAggregator::aggregate(&request.invoice_lines, period);
        let reconciler = PriceReconciler::new(self.settings.margin_fraction);

        let mut energies = Vec::new();
        for energy in aggregation.energies() {
            let market_series =
                self.market_series(energy, &request.market_observations, period);

            let tariffs: Vec<TariffComparative> = aggregation
                .tariffs_for(energy)
                .map(|(key, acc)| {
                    self.reconcile_tariff(
                        &reconciler,
                        &aggregation,
                        key,
                        acc,
                        &market_series,
                        request,
                    )
                })
                .collect();

            debug!(
                "Reconciled {} {} tariffs against {} market months",
                tariffs.len(),
                energy,
                market_series.len()
            );

            energies.push(EnergyReport {
                energy_type: energy,
                market_series,
                tariffs,
            });
        }

        Ok(GlobalRollup::rollup(
            &reconciler,
            energies,
            aggregation.global.point_count(),
        ))
    }

    fn reconcile_tariff(
        &self,
        reconciler: &PriceReconciler,
        aggregation: &TariffAggregation,
        key: &TariffKey,
        acc: &TariffAccumulator,
        market_series: &[MarketMonthSummary],
        request: &AuditRequest,
    ) -> TariffComparative {
        let period = &request.period;
        let manual_prices = request
            .overrides
            .market_price_by_month
            .for_energy(key.energy_type);

        let months: Vec<TariffMonth> = months_in_period(period.start, period.end)
            .into_iter()
            .map(|ym| {
                let bucket = aggregation.month_bucket(&MonthKey {
                    tariff: key.clone(),
                    year_month: ym,
                });
                let market = summary_for(market_series, ym);
                let manual = manual_prices.get(&ym).copied();

                TariffMonth {
                    year_month: ym,
                    consumption_kwh: bucket.map_or(0.0, |b| b.consumption_kwh),
                    cost_eur: bucket.map_or(0.0, |b| b.energy_cost_eur),
                    point_count: bucket.map_or(0, |b| b.point_count()),
                    invoice_count: bucket.map_or(0, |b| b.invoice_count),
                    market_reference_eur_kwh: market.and_then(|m| m.mean_price_eur_kwh),
                    comparative: reconciler.reconcile_month(bucket, market, manual),
                }
            })
            .collect();

        let client_price = acc.total.client_price();
        let comparative = reconciler.reconcile_aggregate(
            client_price,
            acc.total.consumption_kwh,
            months.iter().map(|m| &m.comparative),
        );

        TariffComparative {
            tariff_code: key.tariff_code.clone(),
            consumption_kwh: acc.total.consumption_kwh,
            cost_eur: acc.total.energy_cost_eur,
            avg_price_eur_kwh: client_price,
            point_count: acc.total.point_count(),
            invoice_count: acc.total.invoice_count,
            comparative,
            months,
            extremes: ExtremesExtractor::extract(acc.points.values()),
            power: PowerAggregator::aggregate(acc.points.values()),
        }
    }
}
