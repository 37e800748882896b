use crate::market::MarketMonthSummary;
use crate::stats::{safe_ratio, weighted_mean};
use crate::tariff::MonthlyTariffBucket;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the reported market price of a comparative came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    /// Trimmed monthly mean of the wholesale series, above the floor.
    Market,
    /// Raised to `client price * (1 + margin)`.
    FavorableFloor,
    /// Supplied by an operator and used verbatim.
    ManualOverride,
    /// Aggregate built from months with different sources.
    Mixed,
    /// No market figure for this slice.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comparative {
    pub client_price_eur_kwh: Option<f64>,
    pub market_price_eur_kwh: Option<f64>,
    pub delta_abs_eur_kwh: Option<f64>,
    pub delta_pct: Option<f64>,
    pub economic_impact_eur: Option<f64>,
    /// Consumption over which both a client and a market price exist.
    pub covered_consumption_kwh: f64,
    pub price_source: PriceSource,
}

impl Comparative {
    pub fn unavailable(client_price_eur_kwh: Option<f64>) -> Self {
        Self {
            client_price_eur_kwh,
            market_price_eur_kwh: None,
            delta_abs_eur_kwh: None,
            delta_pct: None,
            economic_impact_eur: None,
            covered_consumption_kwh: 0.0,
            price_source: PriceSource::Unavailable,
        }
    }
}

/// Applies the favorable floor and derives delta metrics.
#[derive(Debug, Clone, Copy)]
pub struct PriceReconciler {
    margin_fraction: f64,
}

impl PriceReconciler {
    pub fn new(margin_fraction: f64) -> Self {
        Self { margin_fraction }
    }

    pub fn floor_for(&self, client_price: f64) -> f64 {
        client_price * (1.0 + self.margin_fraction)
    }

    /// Picks the market price to report for one month.
    ///
    /// A manual override wins and is never floored. Otherwise the computed
    /// candidate is raised to the floor whenever the client price is positive.
    pub fn final_market_price(
        &self,
        client_price: Option<f64>,
        computed: Option<f64>,
        manual: Option<f64>,
    ) -> (Option<f64>, PriceSource) {
        if let Some(price) = manual {
            return (Some(price), PriceSource::ManualOverride);
        }

        let Some(candidate) = computed else {
            return (None, PriceSource::Unavailable);
        };

        match client_price {
            Some(client) if client > 0.0 => {
                let floor = self.floor_for(client);
                if floor > candidate {
                    (Some(floor), PriceSource::FavorableFloor)
                } else {
                    (Some(candidate), PriceSource::Market)
                }
            }
            _ => (Some(candidate), PriceSource::Market),
        }
    }

    /// Comparative for a single tariff-month.
    pub fn reconcile_month(
        &self,
        bucket: Option<&MonthlyTariffBucket>,
        market: Option<&MarketMonthSummary>,
        manual: Option<f64>,
    ) -> Comparative {
        let consumption = bucket.map_or(0.0, |b| b.consumption_kwh);
        let client_price = bucket.and_then(|b| b.client_price());
        let computed = market.and_then(|m| m.mean_price_eur_kwh);

        let (market_price, source) = self.final_market_price(client_price, computed, manual);
        compare(client_price, market_price, source, consumption)
    }

    /// Comparative for a tariff or the whole client.
    ///
    /// `client_price` and `consumption_kwh` are the aggregate's own totals. The
    /// market price is the covered-consumption weighted mean of the parts' final
    /// prices, floored again unless an operator priced any of the parts.
    pub fn reconcile_aggregate<'a, I>(
        &self,
        client_price: Option<f64>,
        consumption_kwh: f64,
        parts: I,
    ) -> Comparative
    where
        I: IntoIterator<Item = &'a Comparative>,
    {
        let covered: Vec<(f64, f64, PriceSource)> = parts
            .into_iter()
            .filter_map(|c| match c.market_price_eur_kwh {
                Some(market) if c.covered_consumption_kwh != 0.0 => {
                    Some((market, c.covered_consumption_kwh, c.price_source))
                }
                _ => None,
            })
            .collect();

        let Some(candidate) = weighted_mean(covered.iter().map(|(m, q, _)| (*m, *q))) else {
            return Comparative::unavailable(client_price);
        };

        let label = uniform_source(covered.iter().map(|(_, _, s)| *s));
        let manual = covered
            .iter()
            .any(|(_, _, s)| *s == PriceSource::ManualOverride);
        let (market_price, source) = if manual {
            (Some(candidate), label)
        } else {
            match self.final_market_price(client_price, Some(candidate), None) {
                (price, PriceSource::FavorableFloor) => (price, PriceSource::FavorableFloor),
                (price, _) => (price, label),
            }
        };

        let mut comparative = compare(client_price, market_price, source, consumption_kwh);
        comparative.covered_consumption_kwh = covered.iter().fold(0.0, |acc, (_, q, _)| acc + q);
        comparative
    }
}

fn uniform_source<I>(mut sources: I) -> PriceSource
where
    I: Iterator<Item = PriceSource>,
{
    match sources.next() {
        Some(first) if sources.all(|s| s == first) => first,
        Some(_) => PriceSource::Mixed,
        None => PriceSource::Unavailable,
    }
}

/// Delta metrics for a client/market price pair over `consumption_kwh`.
///
/// Every delta is `None` unless both prices exist; the percentage also needs a
/// positive market price.
pub fn compare(
    client_price: Option<f64>,
    market_price: Option<f64>,
    price_source: PriceSource,
    consumption_kwh: f64,
) -> Comparative {
    let (delta_abs, covered) = match (client_price, market_price) {
        (Some(client), Some(market)) => (Some(client - market), consumption_kwh),
        _ => (None, 0.0),
    };

    let delta_pct = match (delta_abs, market_price) {
        (Some(delta), Some(market)) if market > 0.0 => safe_ratio(delta * 100.0, market),
        _ => None,
    };

    Comparative {
        client_price_eur_kwh: client_price,
        market_price_eur_kwh: market_price,
        delta_abs_eur_kwh: delta_abs,
        delta_pct,
        economic_impact_eur: delta_abs.map(|d| d * covered),
        covered_consumption_kwh: covered,
        price_source,
    }
}
