use crate::error::Result;
use crate::extremes::Extremes;
use crate::market::{summary_for, MarketMonthSummary};
use crate::power::PowerProfile;
use crate::reconciler::Comparative;
use crate::schema::{EnergyType, YearMonth};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One tariff in one calendar month. Emitted for every month of the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TariffMonth {
    pub year_month: YearMonth,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub point_count: usize,
    pub invoice_count: usize,
    /// Trimmed wholesale mean before the floor or any override.
    pub market_reference_eur_kwh: Option<f64>,
    pub comparative: Comparative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TariffComparative {
    pub tariff_code: String,
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub avg_price_eur_kwh: Option<f64>,
    pub point_count: usize,
    pub invoice_count: usize,
    pub comparative: Comparative,
    pub months: Vec<TariffMonth>,
    pub extremes: Extremes,
    pub power: PowerProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnergyReport {
    pub energy_type: EnergyType,
    pub market_series: Vec<MarketMonthSummary>,
    pub tariffs: Vec<TariffComparative>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalKpis {
    pub consumption_kwh: f64,
    pub cost_eur: f64,
    pub avg_price_eur_kwh: Option<f64>,
    pub tariff_count: usize,
    pub point_count: usize,
    pub invoice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub global_kpis: GlobalKpis,
    pub global_comparative: Comparative,
    pub energies: Vec<EnergyReport>,
}

impl AuditReport {
    pub fn energy(&self, energy: EnergyType) -> Option<&EnergyReport> {
        self.energies.iter().find(|e| e.energy_type == energy)
    }

    pub fn tariff(&self, energy: EnergyType, tariff_code: &str) -> Option<&TariffComparative> {
        self.energy(energy)
            .and_then(|e| e.tariffs.iter().find(|t| t.tariff_code == tariff_code))
    }

    pub fn tariffs(&self) -> impl Iterator<Item = &TariffComparative> {
        self.energies.iter().flat_map(|e| e.tariffs.iter())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AuditReport)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

impl TariffComparative {
    pub fn month(&self, year_month: YearMonth) -> Option<&TariffMonth> {
        self.months.iter().find(|m| m.year_month == year_month)
    }
}

impl EnergyReport {
    pub fn market_month(&self, year_month: YearMonth) -> Option<&MarketMonthSummary> {
        summary_for(&self.market_series, year_month)
    }
}
