use crate::error::{AuditError, Result};
use crate::utils::parse_year_month;
use chrono::NaiveDate;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MARGIN_FRACTION: f64 = 0.03;
pub const DEFAULT_TRIM_FRACTION: f64 = 0.1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum EnergyType {
    #[schemars(description = "Electricity supply, priced against the daily wholesale pool")]
    Electricity,

    #[schemars(description = "Natural gas supply, priced against the daily gas hub index")]
    Gas,
}

impl EnergyType {
    pub const ALL: [EnergyType; 2] = [EnergyType::Electricity, EnergyType::Gas];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::Electricity => "electricity",
            EnergyType::Gas => "gas",
        }
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar month, serialized as `"YYYY-MM"`. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AuditError::InvalidYearMonth(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        parse_year_month(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self> {
        parse_year_month(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl JsonSchema for YearMonth {
    fn schema_name() -> String {
        "YearMonth".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Contracted power per tariff period, in kW.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerBands {
    #[serde(default)]
    pub p1_kw: Option<f64>,
    #[serde(default)]
    pub p2_kw: Option<f64>,
    #[serde(default)]
    pub p3_kw: Option<f64>,
    #[serde(default)]
    pub p4_kw: Option<f64>,
    #[serde(default)]
    pub p5_kw: Option<f64>,
    #[serde(default)]
    pub p6_kw: Option<f64>,
}

impl PowerBands {
    pub fn values(&self) -> [Option<f64>; 6] {
        [
            self.p1_kw, self.p2_kw, self.p3_kw, self.p4_kw, self.p5_kw, self.p6_kw,
        ]
    }

    /// True when at least one band is recorded with a non-zero value.
    pub fn has_data(&self) -> bool {
        self.values().iter().any(|v| matches!(v, Some(kw) if *kw != 0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[schemars(description = "Identifier of the supply point the line was billed to")]
    pub supply_point_id: String,

    pub client_id: String,

    #[schemars(description = "Invoice issue date in YYYY-MM-DD format; its month is the billing month")]
    pub issue_date: NaiveDate,

    pub energy_type: EnergyType,

    #[schemars(description = "Billing-rate category, e.g. '2.0TD' or 'RL.1'")]
    pub tariff_code: String,

    pub consumption_kwh: f64,

    #[schemars(description = "Energy term price in EUR/kWh. Line energy cost is consumption * unit price.")]
    pub unit_price_eur_kwh: f64,

    #[schemars(description = "Invoice total including non-energy charges. Never used for price comparison.")]
    pub total_eur: f64,

    #[serde(default)]
    pub min_contracted_kw: Option<f64>,

    #[serde(default)]
    pub max_contracted_kw: Option<f64>,

    #[serde(default)]
    pub contracted_power: Option<PowerBands>,

    #[schemars(description = "Meter code (CUPS) shown in the report")]
    pub meter_code: String,
}

impl InvoiceLine {
    /// Energy cost of the line. `total_eur` carries other charges and is ignored.
    pub fn energy_cost_eur(&self) -> f64 {
        self.consumption_kwh * self.unit_price_eur_kwh
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodMeans {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
}

fn default_complete() -> bool {
    true
}

/// One day of the electricity wholesale pool, prices in EUR/MWh.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElectricityObservation {
    pub date: NaiveDate,
    pub mean_price_eur_mwh: f64,
    #[serde(default)]
    pub min_price_eur_mwh: Option<f64>,
    #[serde(default)]
    pub max_price_eur_mwh: Option<f64>,
    #[serde(default)]
    pub period_means: Option<PeriodMeans>,
    #[serde(default)]
    pub std_dev: Option<f64>,
    #[serde(default = "default_complete")]
    #[schemars(description = "False when the day lacks enough intraday samples; such days are skipped")]
    pub complete: bool,
}

/// One day of the gas hub index. Gas days only publish a mean, in EUR/MWh.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GasObservation {
    pub date: NaiveDate,
    pub mean_price_eur_mwh: f64,
    #[serde(default = "default_complete")]
    pub complete: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MarketObservations {
    #[serde(default)]
    pub electricity: Vec<ElectricityObservation>,
    #[serde(default)]
    pub gas: Vec<GasObservation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AuditPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Operator-supplied market prices in EUR/kWh, keyed by month.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MarketPriceOverrides {
    #[serde(default)]
    pub electricity: BTreeMap<YearMonth, f64>,
    #[serde(default)]
    pub gas: BTreeMap<YearMonth, f64>,
}

impl MarketPriceOverrides {
    pub fn for_energy(&self, energy: EnergyType) -> &BTreeMap<YearMonth, f64> {
        match energy {
            EnergyType::Electricity => &self.electricity,
            EnergyType::Gas => &self.gas,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditOverrides {
    #[serde(default)]
    #[schemars(description = "Manual market prices per month. When present they replace the computed market price and bypass the favorable floor.")]
    pub market_price_by_month: MarketPriceOverrides,

    #[serde(default)]
    #[schemars(description = "Favorable floor margin as a fraction of the client price. Defaults to 0.03.")]
    pub margin_fraction: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Fraction trimmed from each end before averaging daily market means. Defaults to 0.1.")]
    pub trim_fraction: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    pub period: AuditPeriod,

    #[serde(default)]
    pub invoice_lines: Vec<InvoiceLine>,

    #[serde(default)]
    pub market_observations: MarketObservations,

    #[serde(default)]
    pub overrides: AuditOverrides,
}

impl AuditRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn settings(&self) -> ReconciliationSettings {
        ReconciliationSettings::from_overrides(&self.overrides)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AuditRequest)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Tunable business and statistical parameters of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSettings {
    pub margin_fraction: f64,
    pub trim_fraction: f64,
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            margin_fraction: DEFAULT_MARGIN_FRACTION,
            trim_fraction: DEFAULT_TRIM_FRACTION,
        }
    }
}

impl ReconciliationSettings {
    pub fn from_overrides(overrides: &AuditOverrides) -> Self {
        let defaults = Self::default();
        Self {
            margin_fraction: overrides
                .margin_fraction
                .unwrap_or(defaults.margin_fraction),
            trim_fraction: overrides.trim_fraction.unwrap_or(defaults.trim_fraction),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.margin_fraction.is_finite() || self.margin_fraction < 0.0 {
            return Err(AuditError::InvalidMarginFraction(self.margin_fraction));
        }
        if !self.trim_fraction.is_finite() || !(0.0..=0.5).contains(&self.trim_fraction) {
            return Err(AuditError::InvalidTrimFraction(self.trim_fraction));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_serde_as_string() {
        let ym = YearMonth::new(2024, 2).unwrap();
        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2024-02\"");

        let parsed: YearMonth = serde_json::from_str("\"2023-11\"").unwrap();
        assert_eq!(parsed, YearMonth::new(2023, 11).unwrap());

        assert!(serde_json::from_str::<YearMonth>("\"2023-1\"").is_err());
    }

    #[test]
    fn test_year_month_ordering_and_next() {
        let dec = YearMonth::new(2023, 12).unwrap();
        let jan = dec.next();
        assert_eq!(jan, YearMonth::new(2024, 1).unwrap());
        assert!(dec < jan);
        assert!(YearMonth::new(2024, 13).is_err());
    }

    #[test]
    fn test_override_map_keys_are_validated() {
        let ok: MarketPriceOverrides =
            serde_json::from_str(r#"{"electricity": {"2024-01": 0.12}}"#).unwrap();
        assert_eq!(
            ok.for_energy(EnergyType::Electricity)
                .get(&YearMonth::new(2024, 1).unwrap()),
            Some(&0.12)
        );
        assert!(ok.for_energy(EnergyType::Gas).is_empty());

        let bad = serde_json::from_str::<MarketPriceOverrides>(r#"{"gas": {"January": 0.05}}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_energy_type_wire_names() {
        let parsed: EnergyType = serde_json::from_str("\"gas\"").unwrap();
        assert_eq!(parsed, EnergyType::Gas);
        assert_eq!(
            serde_json::to_string(&EnergyType::Electricity).unwrap(),
            "\"electricity\""
        );
    }

    #[test]
    fn test_line_cost_ignores_total() {
        let line = InvoiceLine {
            supply_point_id: "sp-1".to_string(),
            client_id: "c-1".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            energy_type: EnergyType::Electricity,
            tariff_code: "2.0TD".to_string(),
            consumption_kwh: 1000.0,
            unit_price_eur_kwh: 0.15,
            total_eur: 310.0,
            min_contracted_kw: None,
            max_contracted_kw: None,
            contracted_power: None,
            meter_code: "ES0021000000000001AA".to_string(),
        };
        assert!((line.energy_cost_eur() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_bands_has_data() {
        assert!(!PowerBands::default().has_data());
        let zeros = PowerBands {
            p1_kw: Some(0.0),
            p2_kw: Some(0.0),
            ..Default::default()
        };
        assert!(!zeros.has_data());
        let some = PowerBands {
            p3_kw: Some(4.6),
            ..Default::default()
        };
        assert!(some.has_data());
    }

    #[test]
    fn test_settings_defaults_and_validation() {
        let settings = ReconciliationSettings::from_overrides(&AuditOverrides::default());
        assert_eq!(settings, ReconciliationSettings::default());
        assert!(settings.validate().is_ok());

        let bad_margin = ReconciliationSettings {
            margin_fraction: -0.1,
            ..Default::default()
        };
        assert!(bad_margin.validate().is_err());

        let bad_trim = ReconciliationSettings {
            trim_fraction: 0.6,
            ..Default::default()
        };
        assert!(bad_trim.validate().is_err());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = AuditRequest::schema_as_json().unwrap();
        assert!(schema_json.contains("invoiceLines"));
        assert!(schema_json.contains("marketObservations"));
        assert!(schema_json.contains("marginFraction"));
    }
}
