use crate::error::{AuditError, Result};
use crate::schema::{
    ElectricityObservation, EnergyType, GasObservation, InvoiceLine, MarketObservations,
    PeriodMeans, PowerBands,
};
use crate::utils::parse_iso_date;
use serde::{Deserialize, Serialize};

/// An invoice row as stored upstream: dates and energy types are free text and
/// amounts may be null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawInvoiceRow {
    pub supply_point_id: String,
    pub client_id: String,
    pub issue_date: String,
    pub energy_type: String,
    pub tariff: String,
    #[serde(default)]
    pub consumption_kwh: Option<f64>,
    #[serde(default)]
    pub unit_price_eur_kwh: Option<f64>,
    #[serde(default)]
    pub total_eur: Option<f64>,
    #[serde(default)]
    pub min_kw: Option<f64>,
    #[serde(default)]
    pub max_kw: Option<f64>,
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
    pub meter_code: String,
}

/// A daily market row as stored upstream, prices in EUR/MWh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMarketRow {
    pub date: String,
    pub energy_type: String,
    pub mean_eur_mwh: f64,
    #[serde(default)]
    pub min_eur_mwh: Option<f64>,
    #[serde(default)]
    pub max_eur_mwh: Option<f64>,
    #[serde(default)]
    pub p1_eur_mwh: Option<f64>,
    #[serde(default)]
    pub p2_eur_mwh: Option<f64>,
    #[serde(default)]
    pub p3_eur_mwh: Option<f64>,
    #[serde(default)]
    pub std_dev: Option<f64>,
    #[serde(default)]
    pub complete: Option<bool>,
}

pub fn parse_energy_type(value: &str, record: &str) -> Result<EnergyType> {
    match value.trim().to_lowercase().as_str() {
        "electricity" | "electricidad" | "luz" | "electric" => Ok(EnergyType::Electricity),
        "gas" | "gas natural" | "natural gas" => Ok(EnergyType::Gas),
        _ => Err(AuditError::UnknownEnergyType {
            record: record.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Converts upstream invoice rows, stopping at the first malformed record.
///
/// Null consumption, price or total read as zero, which keeps rows billed only
/// for fixed charges in the output.
pub fn convert_rows_to_lines(rows: &[RawInvoiceRow]) -> Result<Vec<InvoiceLine>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            let record = format!("invoice row #{} ({})", idx, row.supply_point_id);

            let bands = PowerBands {
                p1_kw: row.p1_kw,
                p2_kw: row.p2_kw,
                p3_kw: row.p3_kw,
                p4_kw: row.p4_kw,
                p5_kw: row.p5_kw,
                p6_kw: row.p6_kw,
            };

            Ok(InvoiceLine {
                supply_point_id: row.supply_point_id.clone(),
                client_id: row.client_id.clone(),
                issue_date: parse_iso_date(&row.issue_date, &record)?,
                energy_type: parse_energy_type(&row.energy_type, &record)?,
                tariff_code: row.tariff.trim().to_string(),
                consumption_kwh: row.consumption_kwh.unwrap_or(0.0),
                unit_price_eur_kwh: row.unit_price_eur_kwh.unwrap_or(0.0),
                total_eur: row.total_eur.unwrap_or(0.0),
                min_contracted_kw: row.min_kw,
                max_contracted_kw: row.max_kw,
                contracted_power: bands.values().iter().any(Option::is_some).then_some(bands),
                meter_code: row.meter_code.clone(),
            })
        })
        .collect()
}

/// Splits upstream market rows by energy type, stopping at the first malformed record.
pub fn convert_market_rows(rows: &[RawMarketRow]) -> Result<MarketObservations> {
    let mut observations = MarketObservations::default();

    for (idx, row) in rows.iter().enumerate() {
        let record = format!("market row #{}", idx);
        let date = parse_iso_date(&row.date, &record)?;
        let complete = row.complete.unwrap_or(true);

        match parse_energy_type(&row.energy_type, &record)? {
            EnergyType::Electricity => {
                let period_means = match (row.p1_eur_mwh, row.p2_eur_mwh, row.p3_eur_mwh) {
                    (Some(p1), Some(p2), Some(p3)) => Some(PeriodMeans { p1, p2, p3 }),
                    _ => None,
                };
                observations.electricity.push(ElectricityObservation {
                    date,
                    mean_price_eur_mwh: row.mean_eur_mwh,
                    min_price_eur_mwh: row.min_eur_mwh,
                    max_price_eur_mwh: row.max_eur_mwh,
                    period_means,
                    std_dev: row.std_dev,
                    complete,
                });
            }
            EnergyType::Gas => observations.gas.push(GasObservation {
                date,
                mean_price_eur_mwh: row.mean_eur_mwh,
                complete,
            }),
        }
    }

    Ok(observations)
}
