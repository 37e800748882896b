use crate::stats::safe_ratio;
use crate::tariff::PointTotals;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerBandTotals {
    pub p1_kw: f64,
    pub p2_kw: f64,
    pub p3_kw: f64,
    pub p4_kw: f64,
    pub p5_kw: f64,
    pub p6_kw: f64,
}

impl PowerBandTotals {
    fn add(&mut self, bands: [Option<f64>; 6]) {
        let slots = [
            &mut self.p1_kw,
            &mut self.p2_kw,
            &mut self.p3_kw,
            &mut self.p4_kw,
            &mut self.p5_kw,
            &mut self.p6_kw,
        ];
        for (slot, value) in slots.into_iter().zip(bands) {
            *slot += value.unwrap_or(0.0);
        }
    }
}

/// Contracted power of a tariff.
///
/// `available == false` means no point reported power at all, which is not the
/// same as every band being zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerProfile {
    pub available: bool,
    pub bands: PowerBandTotals,
    pub points_with_data: usize,
    pub points_total: usize,
    pub coverage_ratio: Option<f64>,
    pub min_contracted_kw: Option<f64>,
    pub max_contracted_kw: Option<f64>,
}

pub struct PowerAggregator;

impl PowerAggregator {
    pub fn aggregate<'a, I>(points: I) -> PowerProfile
    where
        I: IntoIterator<Item = &'a PointTotals>,
    {
        let mut profile = PowerProfile::default();

        for point in points {
            profile.points_total += 1;

            if let Some(bands) = point.power_bands.as_ref().filter(|b| b.value.has_data()) {
                profile.points_with_data += 1;
                profile.bands.add(bands.value.values());
            }

            if let Some(min_kw) = point.min_contracted_kw.as_ref().map(|l| l.value) {
                profile.min_contracted_kw =
                    Some(profile.min_contracted_kw.map_or(min_kw, |m| m.min(min_kw)));
            }
            if let Some(max_kw) = point.max_contracted_kw.as_ref().map(|l| l.value) {
                profile.max_contracted_kw =
                    Some(profile.max_contracted_kw.map_or(max_kw, |m| m.max(max_kw)));
            }
        }

        profile.available = profile.points_with_data > 0;
        profile.coverage_ratio =
            safe_ratio(profile.points_with_data as f64, profile.points_total as f64);
        profile
    }
}
