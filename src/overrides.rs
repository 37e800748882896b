use crate::reconciler::Comparative;
use crate::report::{AuditReport, EnergyReport, GlobalKpis};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Operator-edited blocks that replace the computed ones in generate mode.
///
/// Merging is last-writer-wins per field: a block that is present replaces the
/// computed block wholesale, an absent block leaves it untouched. Content is
/// trusted as-is; only its shape is checked, by deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportOverrides {
    #[serde(default)]
    #[schemars(description = "Replacement for the computed client-wide KPIs.")]
    pub global_kpis: Option<GlobalKpis>,

    #[serde(default)]
    #[schemars(description = "Replacement for the computed global comparative block.")]
    pub global_comparative: Option<Comparative>,

    #[serde(default)]
    #[schemars(description = "Replacement for the computed per-energy breakdown.")]
    pub energies: Option<Vec<EnergyReport>>,
}

impl ReportOverrides {
    /// Applies the overrides to a computed report, returning a new report.
    /// The computed report is left untouched.
    pub fn apply(&self, base: &AuditReport) -> AuditReport {
        let mut report = base.clone();
        self.apply_in_place(&mut report);
        report
    }

    pub fn apply_in_place(&self, report: &mut AuditReport) {
        if let Some(kpis) = &self.global_kpis {
            report.global_kpis = kpis.clone();
        }
        if let Some(comparative) = &self.global_comparative {
            report.global_comparative = comparative.clone();
        }
        if let Some(energies) = &self.energies {
            report.energies = energies.clone();
        }
    }
}

/// How the caller wants the computed report delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReportMode {
    /// Computed figures, unmodified, for client-side review.
    #[default]
    Preview,
    /// Final figures, with operator edits merged over the computed ones.
    Generate {
        #[serde(default)]
        overrides: ReportOverrides,
    },
}

impl ReportMode {
    pub fn finalize(&self, report: AuditReport) -> AuditReport {
        match self {
            ReportMode::Preview => report,
            ReportMode::Generate { overrides } => {
                let mut report = report;
                overrides.apply_in_place(&mut report);
                report
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::PriceSource;

    fn computed() -> AuditReport {
        AuditReport {
            global_kpis: GlobalKpis {
                consumption_kwh: 1500.0,
                cost_eur: 200.0,
                avg_price_eur_kwh: Some(200.0 / 1500.0),
                tariff_count: 1,
                point_count: 2,
                invoice_count: 2,
            },
            global_comparative: Comparative::unavailable(Some(200.0 / 1500.0)),
            energies: vec![],
        }
    }

    #[test]
    fn test_preview_is_passthrough() {
        let base = computed();
        assert_eq!(ReportMode::Preview.finalize(base.clone()), base);
    }

    #[test]
    fn test_generate_replaces_only_present_blocks() {
        let base = computed();
        let edited = Comparative {
            client_price_eur_kwh: Some(0.13),
            market_price_eur_kwh: Some(0.11),
            delta_abs_eur_kwh: Some(0.02),
            delta_pct: Some(18.18),
            economic_impact_eur: Some(30.0),
            covered_consumption_kwh: 1500.0,
            price_source: PriceSource::ManualOverride,
        };
        let mode = ReportMode::Generate {
            overrides: ReportOverrides {
                global_comparative: Some(edited.clone()),
                ..Default::default()
            },
        };

        let result = mode.finalize(base.clone());
        assert_eq!(result.global_comparative, edited);
        assert_eq!(result.global_kpis, base.global_kpis);
        assert!(result.energies.is_empty());
    }

    #[test]
    fn test_apply_keeps_base_intact() {
        let base = computed();
        let overrides = ReportOverrides {
            global_kpis: Some(GlobalKpis::default()),
            ..Default::default()
        };
        let result = overrides.apply(&base);
        assert_eq!(result.global_kpis, GlobalKpis::default());
        assert_eq!(base.global_kpis.tariff_count, 1);
    }

    #[test]
    fn test_mode_deserialization() {
        let mode: ReportMode = serde_json::from_str(r#"{"mode": "preview"}"#).unwrap();
        assert!(matches!(mode, ReportMode::Preview));

        let mode: ReportMode = serde_json::from_str(
            r#"{"mode": "generate", "overrides": {"globalKpis": {
                "consumptionKwh": 10.0, "costEur": 1.0, "avgPriceEurKwh": 0.1,
                "tariffCount": 1, "pointCount": 1, "invoiceCount": 1}}}"#,
        )
        .unwrap();
        match mode {
            ReportMode::Generate { overrides } => {
                assert!(overrides.energies.is_none());
                assert_eq!(overrides.global_kpis.unwrap().invoice_count, 1);
            }
            ReportMode::Preview => panic!("expected generate mode"),
        }

        // shape is still enforced
        let bad = serde_json::from_str::<ReportMode>(
            r#"{"mode": "generate", "overrides": {"globalKpis": {"consumptionKwh": "lots"}}}"#,
        );
        assert!(bad.is_err());
    }
}
