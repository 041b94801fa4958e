use crate::infra::build_analysis_service;
use clap::Args;
use parcel_ai::config::AppConfig;
use parcel_ai::error::AppError;
use parcel_ai::telemetry::{self, LogTarget};
use parcel_ai::workflows::development::{AnalysisRequest, ComprehensiveReport, Coordinates};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct AnalyzeArgs {
    /// Civic address of the parcel
    #[arg(long)]
    pub(crate) address: String,
    /// Municipality the parcel sits in
    #[arg(long)]
    pub(crate) municipality: String,
    /// Lot size in square feet (looked up or defaulted when omitted)
    #[arg(long)]
    pub(crate) lot_size: Option<f64>,
    /// Current zoning code, e.g. RS-1
    #[arg(long)]
    pub(crate) zoning: Option<String>,
    /// Assessed value in dollars
    #[arg(long)]
    pub(crate) assessed_value: Option<f64>,
    /// Parcel latitude, enables measured transit distances
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub(crate) lat: Option<f64>,
    /// Parcel longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub(crate) lon: Option<f64>,
    /// Assessment roll CSV export used as the property data source
    #[arg(long)]
    pub(crate) assessment_csv: Option<PathBuf>,
    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

impl AnalyzeArgs {
    fn request(&self) -> AnalysisRequest {
        let coordinates = match (self.lat, self.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };

        AnalysisRequest {
            address: self.address.clone(),
            municipality: self.municipality.clone(),
            lot_size_sqft: self.lot_size,
            zoning: self.zoning.clone(),
            assessed_value: self.assessed_value,
            coordinates,
        }
    }
}

pub(crate) async fn run_analysis(args: AnalyzeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    telemetry::init_for(&config.telemetry, LogTarget::Cli)?;

    if let Some(path) = args.assessment_csv.clone() {
        config.engine.assessment_csv = Some(path);
    }

    let service = build_analysis_service(&config.engine)?;
    let report = service.analyze(args.request()).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        println!("{rendered}");
    } else {
        print!("{}", render_summary(&report));
    }

    Ok(())
}

pub(crate) fn render_summary(report: &ComprehensiveReport) -> String {
    let plan = &report.plan;
    let mut out = String::new();

    out.push_str(&format!(
        "Parcel: {}, {}\n",
        plan.parcel.address, plan.parcel.municipality
    ));
    out.push_str(&format!(
        "Lot: {:.0} sq ft ({:.1} m2), zoning {}, assessed ${:.0}\n",
        plan.parcel.lot_area_sqft,
        plan.parcel.lot_area_m2(),
        plan.parcel.zoning,
        plan.parcel.assessed_value
    ));
    out.push_str(&format!(
        "Transit: {} (score {})\n",
        plan.transit.service_level.label(),
        plan.metrics.transit_score
    ));

    out.push_str("\nAllowances\n");
    for allowance in [
        &plan.allowances.current,
        &plan.allowances.ssmuh,
        &plan.allowances.tod,
    ] {
        out.push_str(&format!(
            "- {}: {} units, {} storeys, FSR {:.2}{}\n",
            allowance.pathway.label(),
            allowance.units,
            allowance.storeys,
            allowance.fsr,
            if allowance.eligible { "" } else { " (not eligible)" }
        ));
    }
    out.push_str(&format!(
        "Maximum potential: {}\n",
        plan.allowances.maximum_potential.pathway.label()
    ));

    out.push_str("\nScenarios\n");
    for (scenario, score) in plan.scenarios.iter().zip(&plan.scores) {
        out.push_str(&format!(
            "- {}: {} units, ROI {:.1}%, score {:.3}\n",
            scenario.name, scenario.total_units, scenario.financials.roi_pct, score.total
        ));
    }

    let recommended = report.recommended();
    out.push_str(&format!(
        "\nRecommended: {} ({} units, {} storeys, {})\n",
        recommended.name,
        recommended.total_units,
        recommended.storeys,
        recommended.construction_type.label()
    ));
    out.push_str(&format!(
        "Project cost ${:.0}, revenue ${:.0}, net profit ${:.0}\n",
        recommended.financials.total_project_cost,
        recommended.financials.revenue,
        recommended.financials.net_profit
    ));

    if !plan.municipal_requirements.is_empty() {
        out.push_str("\nMunicipal requirements\n");
        for requirement in &plan.municipal_requirements {
            out.push_str(&format!("- {requirement}\n"));
        }
    }

    if !report.applied_defaults.is_empty() {
        out.push_str("\nDefaults applied\n");
        for applied in &report.applied_defaults {
            out.push_str(&format!(
                "- {} = {} ({})\n",
                applied.field, applied.value, applied.reason
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_ai::config::EngineConfig;

    #[test]
    fn coordinates_require_both_axes() {
        let args = AnalyzeArgs {
            address: "1021 Oliver St".to_string(),
            municipality: "Victoria".to_string(),
            lat: Some(48.42),
            ..AnalyzeArgs::default()
        };
        assert!(args.request().coordinates.is_none());

        let args = AnalyzeArgs {
            lon: Some(-123.35),
            ..args
        };
        assert_eq!(
            args.request().coordinates,
            Some(Coordinates {
                latitude: 48.42,
                longitude: -123.35
            })
        );
    }

    #[tokio::test]
    async fn summary_lists_recommendation_and_defaults() {
        let service = build_analysis_service(&EngineConfig::default()).expect("service builds");
        let args = AnalyzeArgs {
            address: "1021 Oliver St".to_string(),
            municipality: "Victoria".to_string(),
            lot_size: Some(6_820.0),
            ..AnalyzeArgs::default()
        };

        let report = service.analyze(args.request()).await.expect("analysis succeeds");
        let summary = render_summary(&report);

        assert!(summary.contains("Parcel: 1021 Oliver St, Victoria"));
        assert!(summary.contains("- SSMUH: 6 units"));
        assert!(summary.contains("Recommended: "));
        assert!(summary.contains("Defaults applied"));
        assert!(summary.contains("zoning = RS-1"));
    }
}
