use crate::schema::{AuditPeriod, ElectricityObservation, GasObservation, PeriodMeans, YearMonth};
use crate::stats::{max_value, mean, min_value, sample_std_dev, trimmed_mean};
use crate::utils::{eur_mwh_to_eur_kwh, months_in_period, year_month_of};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single day of a wholesale price series, prices in EUR/MWh.
///
/// Gas only publishes a daily mean, so min and max default to it.
pub trait DailyPrice {
    fn date(&self) -> NaiveDate;
    fn mean_eur_mwh(&self) -> f64;
    fn is_complete(&self) -> bool;

    fn min_eur_mwh(&self) -> f64 {
        self.mean_eur_mwh()
    }

    fn max_eur_mwh(&self) -> f64 {
        self.mean_eur_mwh()
    }

    fn period_means(&self) -> Option<&PeriodMeans> {
        None
    }
}

impl DailyPrice for ElectricityObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn mean_eur_mwh(&self) -> f64 {
        self.mean_price_eur_mwh
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn min_eur_mwh(&self) -> f64 {
        self.min_price_eur_mwh.unwrap_or(self.mean_price_eur_mwh)
    }

    fn max_eur_mwh(&self) -> f64 {
        self.max_price_eur_mwh.unwrap_or(self.mean_price_eur_mwh)
    }

    fn period_means(&self) -> Option<&PeriodMeans> {
        self.period_means.as_ref()
    }
}

impl DailyPrice for GasObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn mean_eur_mwh(&self) -> f64 {
        self.mean_price_eur_mwh
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketMonthSummary {
    pub year_month: YearMonth,
    pub mean_price_eur_kwh: Option<f64>,
    pub min_price_eur_kwh: Option<f64>,
    pub max_price_eur_kwh: Option<f64>,
    pub volatility_eur_kwh: Option<f64>,
    pub days_with_data: usize,
    #[serde(default)]
    pub period_means_eur_kwh: Option<PeriodMeans>,
}

impl MarketMonthSummary {
    pub fn empty(year_month: YearMonth) -> Self {
        Self {
            year_month,
            mean_price_eur_kwh: None,
            min_price_eur_kwh: None,
            max_price_eur_kwh: None,
            volatility_eur_kwh: None,
            days_with_data: 0,
            period_means_eur_kwh: None,
        }
    }
}

#[derive(Default)]
struct MonthSamples {
    means: Vec<f64>,
    mins: Vec<f64>,
    maxs: Vec<f64>,
    periods: Vec<[f64; 3]>,
}

pub struct MarketSeriesBuilder {
    trim_fraction: f64,
}

impl MarketSeriesBuilder {
    pub fn new(trim_fraction: f64) -> Self {
        Self { trim_fraction }
    }

    /// One summary per calendar month of `period`, in order.
    ///
    /// Days outside the period or flagged incomplete are ignored. Months
    /// without any usable day are still emitted, with null prices.
    pub fn build<T: DailyPrice>(
        &self,
        observations: &[T],
        period: &AuditPeriod,
    ) -> Vec<MarketMonthSummary> {
        let mut buckets: BTreeMap<YearMonth, MonthSamples> = BTreeMap::new();

        for obs in observations {
            if !obs.is_complete() || !period.contains(obs.date()) {
                continue;
            }

            let bucket = buckets.entry(year_month_of(obs.date())).or_default();
            bucket.means.push(eur_mwh_to_eur_kwh(obs.mean_eur_mwh()));
            bucket.mins.push(eur_mwh_to_eur_kwh(obs.min_eur_mwh()));
            bucket.maxs.push(eur_mwh_to_eur_kwh(obs.max_eur_mwh()));
            if let Some(pm) = obs.period_means() {
                bucket.periods.push([
                    eur_mwh_to_eur_kwh(pm.p1),
                    eur_mwh_to_eur_kwh(pm.p2),
                    eur_mwh_to_eur_kwh(pm.p3),
                ]);
            }
        }

        months_in_period(period.start, period.end)
            .into_iter()
            .map(|ym| match buckets.get(&ym) {
                Some(samples) => self.summarize(ym, samples),
                None => MarketMonthSummary::empty(ym),
            })
            .collect()
    }

    fn summarize(&self, year_month: YearMonth, samples: &MonthSamples) -> MarketMonthSummary {
        // Volatility is measured around the untrimmed mean so it reflects the real spread.
        let volatility =
            mean(&samples.means).map(|raw_mean| sample_std_dev(&samples.means, raw_mean));

        let period_means_eur_kwh = if samples.periods.is_empty() {
            None
        } else {
            let column = |i: usize| -> Vec<f64> { samples.periods.iter().map(|p| p[i]).collect() };
            match (mean(&column(0)), mean(&column(1)), mean(&column(2))) {
                (Some(p1), Some(p2), Some(p3)) => Some(PeriodMeans { p1, p2, p3 }),
                _ => None,
            }
        };

        MarketMonthSummary {
            year_month,
            mean_price_eur_kwh: trimmed_mean(&samples.means, self.trim_fraction),
            min_price_eur_kwh: min_value(&samples.mins),
            max_price_eur_kwh: max_value(&samples.maxs),
            volatility_eur_kwh: volatility,
            days_with_data: samples.means.len(),
            period_means_eur_kwh,
        }
    }
}

pub fn summary_for(series: &[MarketMonthSummary], year_month: YearMonth) -> Option<&MarketMonthSummary> {
    series.iter().find(|s| s.year_month == year_month)
}
