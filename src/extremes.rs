use crate::tariff::PointTotals;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const EXTREMES_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointSummary {
    pub meter_code: String,
    pub supply_point_id: String,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub weighted_avg_price_eur_kwh: Option<f64>,
}

impl From<&PointTotals> for PointSummary {
    fn from(point: &PointTotals) -> Self {
        Self {
            meter_code: point.meter_code.clone(),
            supply_point_id: point.supply_point_id.clone(),
            consumption_kwh: point.consumption_kwh,
            cost_eur: point.cost_eur,
            weighted_avg_price_eur_kwh: point.weighted_avg_price(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Extremes {
    pub top_by_consumption: Vec<PointSummary>,
    pub bottom_by_consumption: Vec<PointSummary>,
    pub top_by_cost: Vec<PointSummary>,
    pub bottom_by_cost: Vec<PointSummary>,
}

pub struct ExtremesExtractor;

impl ExtremesExtractor {
    /// Ranks the points of one tariff by period consumption and by period cost.
    ///
    /// Bottom lists are the tail of the same descending ranking, lowest first.
    /// Lists are never padded when a tariff has fewer than three points.
    pub fn extract<'a, I>(points: I) -> Extremes
    where
        I: IntoIterator<Item = &'a PointTotals>,
    {
        let summaries: Vec<PointSummary> = points.into_iter().map(PointSummary::from).collect();

        let by_consumption = ranked(&summaries, |p| p.consumption_kwh);
        let by_cost = ranked(&summaries, |p| p.cost_eur);

        Extremes {
            top_by_consumption: head(&by_consumption),
            bottom_by_consumption: tail_reversed(&by_consumption),
            top_by_cost: head(&by_cost),
            bottom_by_cost: tail_reversed(&by_cost),
        }
    }
}

fn ranked<F>(points: &[PointSummary], metric: F) -> Vec<PointSummary>
where
    F: Fn(&PointSummary) -> f64,
{
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        metric(b)
            .partial_cmp(&metric(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.meter_code.cmp(&b.meter_code))
    });
    sorted
}

fn head(sorted: &[PointSummary]) -> Vec<PointSummary> {
    sorted.iter().take(EXTREMES_SIZE).cloned().collect()
}

fn tail_reversed(sorted: &[PointSummary]) -> Vec<PointSummary> {
    sorted.iter().rev().take(EXTREMES_SIZE).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(code: &str, kwh: f64, cost: f64) -> PointTotals {
        PointTotals {
            supply_point_id: format!("sp-{}", code),
            meter_code: code.to_string(),
            consumption_kwh: kwh,
            cost_eur: cost,
            power_bands: None,
            min_contracted_kw: None,
            max_contracted_kw: None,
        }
    }

    fn codes(list: &[PointSummary]) -> Vec<&str> {
        list.iter().map(|p| p.meter_code.as_str()).collect()
    }

    #[test]
    fn test_top_and_bottom_from_same_ranking() {
        let points = vec![
            point("A", 100.0, 50.0),
            point("B", 500.0, 40.0),
            point("C", 300.0, 90.0),
            point("D", 50.0, 10.0),
            point("E", 700.0, 30.0),
        ];

        let ex = ExtremesExtractor::extract(&points);
        assert_eq!(codes(&ex.top_by_consumption), vec!["E", "B", "C"]);
        assert_eq!(codes(&ex.bottom_by_consumption), vec!["D", "A", "C"]);
        assert_eq!(codes(&ex.top_by_cost), vec!["C", "A", "B"]);
        assert_eq!(codes(&ex.bottom_by_cost), vec!["D", "E", "B"]);

        // E is both the largest consumer and among the cheapest
        assert!(codes(&ex.bottom_by_cost).contains(&"E"));
    }

    #[test]
    fn test_never_padded() {
        let points = vec![point("A", 10.0, 1.0), point("B", 20.0, 2.0)];
        let ex = ExtremesExtractor::extract(&points);
        assert_eq!(ex.top_by_consumption.len(), 2);
        assert_eq!(ex.bottom_by_cost.len(), 2);

        let ex = ExtremesExtractor::extract(&Vec::<PointTotals>::new());
        assert!(ex.top_by_consumption.is_empty());
        assert!(ex.bottom_by_consumption.is_empty());
    }

    #[test]
    fn test_zero_consumption_point_has_null_price() {
        let points = vec![point("FIXED", 0.0, 0.0)];
        let ex = ExtremesExtractor::extract(&points);
        assert_eq!(ex.top_by_consumption[0].weighted_avg_price_eur_kwh, None);
    }

    #[test]
    fn test_ties_break_by_meter_code() {
        let points = vec![point("Z", 10.0, 1.0), point("M", 10.0, 1.0), point("A", 10.0, 1.0)];
        let ex = ExtremesExtractor::extract(&points);
        assert_eq!(codes(&ex.top_by_consumption), vec!["A", "M", "Z"]);
        assert_eq!(codes(&ex.bottom_by_consumption), vec!["Z", "M", "A"]);
    }
}
