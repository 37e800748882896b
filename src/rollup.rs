use crate::reconciler::{Comparative, PriceReconciler};
use crate::report::{AuditReport, EnergyReport, GlobalKpis, TariffComparative};
use crate::stats::weighted_mean;

pub struct GlobalRollup;

impl GlobalRollup {
    /// Folds every tariff of every energy into client-wide KPIs and one comparative.
    ///
    /// `distinct_points` is counted upstream because the same supply point may
    /// appear under more than one tariff.
    pub fn rollup(
        reconciler: &PriceReconciler,
        energies: Vec<EnergyReport>,
        distinct_points: usize,
    ) -> AuditReport {
        let global_kpis = Self::kpis(&energies, distinct_points);
        let global_comparative = Self::comparative(reconciler, &energies, &global_kpis);

        AuditReport {
            global_kpis,
            global_comparative,
            energies,
        }
    }

    pub fn kpis(energies: &[EnergyReport], distinct_points: usize) -> GlobalKpis {
        let tariffs: Vec<&TariffComparative> =
            energies.iter().flat_map(|e| e.tariffs.iter()).collect();

        GlobalKpis {
            consumption_kwh: tariffs.iter().fold(0.0, |acc, t| acc + t.consumption_kwh),
            cost_eur: tariffs.iter().fold(0.0, |acc, t| acc + t.cost_eur),
            avg_price_eur_kwh: weighted_mean(
                tariffs
                    .iter()
                    .filter_map(|t| t.avg_price_eur_kwh.map(|p| (p, t.consumption_kwh))),
            ),
            tariff_count: tariffs.len(),
            point_count: distinct_points,
            invoice_count: tariffs.iter().map(|t| t.invoice_count).sum(),
        }
    }

    /// Prices the client's total against every tariff-month that has a market price.
    pub fn comparative(
        reconciler: &PriceReconciler,
        energies: &[EnergyReport],
        kpis: &GlobalKpis,
    ) -> Comparative {
        reconciler.reconcile_aggregate(
            kpis.avg_price_eur_kwh,
            kpis.consumption_kwh,
            energies
                .iter()
                .flat_map(|e| e.tariffs.iter())
                .flat_map(|t| t.months.iter())
                .map(|m| &m.comparative),
        )
    }
}
