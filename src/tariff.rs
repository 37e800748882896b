use crate::schema::{AuditPeriod, EnergyType, InvoiceLine, PowerBands, YearMonth};
use crate::stats::safe_ratio;
use crate::utils::year_month_of;
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Composite key for one tariff of one energy type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TariffKey {
    pub energy_type: EnergyType,
    pub tariff_code: String,
}

impl TariffKey {
    pub fn of(line: &InvoiceLine) -> Self {
        Self {
            energy_type: line.energy_type,
            tariff_code: line.tariff_code.clone(),
        }
    }
}

/// Composite key for one tariff-month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub tariff: TariffKey,
    pub year_month: YearMonth,
}

/// Running totals for a slice of invoice lines. Used per month, per tariff and globally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyTariffBucket {
    pub consumption_kwh: f64,
    pub energy_cost_eur: f64,
    pub supply_point_ids: BTreeSet<String>,
    pub invoice_count: usize,
}

impl MonthlyTariffBucket {
    pub fn add(&mut self, line: &InvoiceLine) {
        self.consumption_kwh += line.consumption_kwh;
        self.energy_cost_eur += line.energy_cost_eur();
        self.supply_point_ids.insert(line.supply_point_id.clone());
        self.invoice_count += 1;
    }

    /// Consumption-weighted price, `None` when nothing was consumed.
    pub fn client_price(&self) -> Option<f64> {
        safe_ratio(self.energy_cost_eur, self.consumption_kwh)
    }

    pub fn point_count(&self) -> usize {
        self.supply_point_ids.len()
    }
}

/// A value taken from the most recently issued invoice that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct Latest<T> {
    pub issue_date: NaiveDate,
    pub value: T,
}

impl<T> Latest<T> {
    fn offer(slot: &mut Option<Self>, issue_date: NaiveDate, value: T) {
        if slot.as_ref().map_or(true, |l| issue_date >= l.issue_date) {
            *slot = Some(Self { issue_date, value });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointTotals {
    pub supply_point_id: String,
    pub meter_code: String,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    /// Tracked apart from the contracted range, so an invoice carrying only
    /// min/max power never hides bands recorded earlier.
    pub power_bands: Option<Latest<PowerBands>>,
    pub min_contracted_kw: Option<Latest<f64>>,
    pub max_contracted_kw: Option<Latest<f64>>,
}

impl PointTotals {
    fn new(line: &InvoiceLine) -> Self {
        Self {
            supply_point_id: line.supply_point_id.clone(),
            meter_code: line.meter_code.clone(),
            consumption_kwh: 0.0,
            cost_eur: 0.0,
            power_bands: None,
            min_contracted_kw: None,
            max_contracted_kw: None,
        }
    }

    fn add(&mut self, line: &InvoiceLine) {
        self.consumption_kwh += line.consumption_kwh;
        self.cost_eur += line.energy_cost_eur();

        let issued = line.issue_date;
        if let Some(bands) = line.contracted_power.as_ref().filter(|b| b.has_data()) {
            Latest::offer(&mut self.power_bands, issued, bands.clone());
        }
        if let Some(kw) = line.min_contracted_kw {
            Latest::offer(&mut self.min_contracted_kw, issued, kw);
        }
        if let Some(kw) = line.max_contracted_kw {
            Latest::offer(&mut self.max_contracted_kw, issued, kw);
        }
    }

    pub fn weighted_avg_price(&self) -> Option<f64> {
        safe_ratio(self.cost_eur, self.consumption_kwh)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TariffAccumulator {
    pub months: BTreeMap<YearMonth, MonthlyTariffBucket>,
    pub total: MonthlyTariffBucket,
    pub points: BTreeMap<String, PointTotals>,
}

impl TariffAccumulator {
    fn add(&mut self, line: &InvoiceLine) {
        self.months
            .entry(year_month_of(line.issue_date))
            .or_default()
            .add(line);
        self.total.add(line);
        self.points
            .entry(line.supply_point_id.clone())
            .or_insert_with(|| PointTotals::new(line))
            .add(line);
    }

    pub fn month(&self, year_month: YearMonth) -> Option<&MonthlyTariffBucket> {
        self.months.get(&year_month)
    }
}

/// Result of one aggregation pass over the invoice lines of a request.
#[derive(Debug, Clone, Default)]
pub struct TariffAggregation {
    pub tariffs: BTreeMap<TariffKey, TariffAccumulator>,
    pub global: MonthlyTariffBucket,
}

impl TariffAggregation {
    pub fn energies(&self) -> BTreeSet<EnergyType> {
        self.tariffs.keys().map(|k| k.energy_type).collect()
    }

    pub fn tariffs_for(
        &self,
        energy: EnergyType,
    ) -> impl Iterator<Item = (&TariffKey, &TariffAccumulator)> {
        self.tariffs
            .iter()
            .filter(move |(key, _)| key.energy_type == energy)
    }

    pub fn month_bucket(&self, key: &MonthKey) -> Option<&MonthlyTariffBucket> {
        self.tariffs
            .get(&key.tariff)
            .and_then(|acc| acc.month(key.year_month))
    }
}

pub struct TariffAggregator;

impl TariffAggregator {
    /// Folds every invoice line issued inside `period` into tariff, month, point and global buckets.
    pub fn aggregate(lines: &[InvoiceLine], period: &AuditPeriod) -> TariffAggregation {
        let mut aggregation = TariffAggregation::default();
        let mut skipped = 0usize;

        for line in lines {
            if !period.contains(line.issue_date) {
                skipped += 1;
                continue;
            }

            aggregation
                .tariffs
                .entry(TariffKey::of(line))
                .or_default()
                .add(line);
            aggregation.global.add(line);
        }

        if skipped > 0 {
            debug!(
                "Skipped {} invoice lines issued outside {}..{}",
                skipped, period.start, period.end
            );
        }

        aggregation
    }
}
