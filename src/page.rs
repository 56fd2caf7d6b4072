use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use plotters::style::RGBColor;
use thiserror::Error;

use crate::charts::{self, ChartError};
use crate::dataset::{histogram, Dataset, DatasetError, GROUP_COLUMN, TARGET_COLUMN};
use crate::models::{FeatureVector, PredictionResult, FEATURE_LABELS, MAX_SCORE, MIN_SCORE};
use crate::predictor::Regressor;
use crate::reference;

pub const PAGE_TITLE: &str = "AI Student Stress Analyzer";
pub const DATASET_WARNING: &str = "Upload Combined_Student_Stress.csv to enable dashboard features.";

/// Query parameter names, in feature order.
pub const FIELD_NAMES: [&str; 4] = ["sleep", "academic", "study", "extracurricular"];

const STYLE: &str = r#"
body {margin: 0; font-family: sans-serif; background-color: #f8f9fa; color: #2c3e50;}
.layout {display: flex;}
.sidebar {width: 260px; padding: 20px; background: #eef1f4; min-height: 100vh;}
.sidebar label {display: block; margin-top: 14px;}
.sidebar input[type=range] {width: 100%;}
.main {flex: 1; padding: 20px 32px;}
.title {text-align: center; font-size: 40px; color: #2c3e50; font-weight: bold;}
.sub {text-align: center; font-size: 20px; color: #34495e;}
.columns {display: flex; gap: 24px; flex-wrap: wrap;}
.columns > div {flex: 1; min-width: 320px;}
.score {color: #e74c3c;}
.category {color: #2980b9;}
.warning {padding: 12px 16px; background: #fff3cd; border: 1px solid #ffe69c; border-radius: 6px;}
.error {padding: 12px 16px; background: #f8d7da; border: 1px solid #f1aeb5; border-radius: 6px;}
footer {margin-top: 32px; color: #7f8c8d; font-size: 12px; text-align: center;}
"#;

const TEAL: RGBColor = RGBColor(0, 128, 128);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const SERIES_COLORS: [RGBColor; 3] = [RGBColor(26, 188, 156), RGBColor(230, 126, 34), RGBColor(52, 152, 219)];

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

impl DashboardError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dataset(err) => err.kind(),
            Self::Chart(_) => "chart",
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The five dashboard figures, rendered as inline SVG.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub feature_importance: String,
    pub stress_distribution: String,
    pub correlation_heatmap: String,
    pub model_comparison: String,
    pub academic_box_plot: String,
}

pub fn build_dashboard(dataset: &Dataset, regressor: &dyn Regressor) -> Result<Dashboard, DashboardError> {
    dataset.validate()?;

    let features = dataset.feature_columns();
    let feature_importance = charts::bar_chart(
        &features,
        regressor.feature_importances(),
        TEAL,
        "Importance Score",
    )?;

    let stress = dataset.column(TARGET_COLUMN)?;
    let stress_distribution = charts::histogram_chart(&histogram(stress, 5), ORANGE, "Stress Level", "Frequency")?;

    let labels: Vec<&str> = dataset.columns.iter().map(String::as_str).collect();
    let correlation_heatmap = charts::heatmap(&labels, &dataset.correlation_matrix())?;

    let groups = dataset.grouped_box_stats(TARGET_COLUMN, GROUP_COLUMN)?;
    let academic_box_plot = charts::box_plot(
        "Stress Distribution Across Academic Performance",
        &groups,
        "Academic Performance",
        "Stress Level",
    )?;

    Ok(Dashboard {
        feature_importance,
        stress_distribution,
        correlation_heatmap,
        model_comparison: model_comparison_chart()?,
        academic_box_plot,
    })
}

pub fn load_dashboard(path: &Path, regressor: &dyn Regressor) -> Result<Dashboard, DashboardError> {
    let dataset = Dataset::load(path)?;
    tracing::debug!(rows = dataset.len(), path = %path.display(), "dataset loaded");
    build_dashboard(&dataset, regressor)
}

pub fn model_comparison_chart() -> Result<String, ChartError> {
    let (names, [r2, rmse_inv, accuracy]) = reference::comparison_series();
    charts::grouped_bar_chart(
        "Comparison of All ML Models",
        &names,
        &[
            (reference::SERIES[0], &r2[..], SERIES_COLORS[0]),
            (reference::SERIES[1], &rmse_inv[..], SERIES_COLORS[1]),
            (reference::SERIES[2], &accuracy[..], SERIES_COLORS[2]),
        ],
        "Performance Score",
    )
}

pub fn render_page(
    inputs: &FeatureVector,
    prediction: Option<&Result<PredictionResult, String>>,
    dashboard: &Result<Dashboard, DashboardError>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"UTF-8\">");
    let _ = writeln!(output, "<title>🧠 {PAGE_TITLE}</title>");
    let _ = writeln!(output, "<style>{STYLE}</style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body><div class=\"layout\">");

    render_sidebar(&mut output, inputs);

    let _ = writeln!(output, "<div class=\"main\">");
    let _ = writeln!(
        output,
        "<div class=\"title\">AI-Based Student Stress Prediction System</div>"
    );
    let _ = writeln!(
        output,
        "<div class=\"sub\">Predict stress level using behavioral and academic indicators</div><br>"
    );

    match prediction {
        Some(Ok(result)) => render_prediction(&mut output, result),
        Some(Err(message)) => {
            let _ = writeln!(
                output,
                "<div class=\"error\">Prediction failed: {}</div>",
                escape(message)
            );
        }
        None => {}
    }

    render_dashboard(&mut output, dashboard);

    let _ = writeln!(
        output,
        "<footer>Generated {}</footer>",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(output, "</div></div></body></html>");
    output
}

fn render_sidebar(output: &mut String, inputs: &FeatureVector) {
    let _ = writeln!(output, "<form class=\"sidebar\" method=\"get\" action=\"/\">");
    let _ = writeln!(output, "<h3>Input Student Details</h3>");
    for ((name, label), value) in FIELD_NAMES.iter().zip(FEATURE_LABELS).zip(inputs.values()) {
        let _ = writeln!(
            output,
            "<label for=\"{name}\">{label} (1–5): <output id=\"{name}-value\">{value}</output></label>\
             <input type=\"range\" id=\"{name}\" name=\"{name}\" min=\"{MIN_SCORE}\" max=\"{MAX_SCORE}\" step=\"1\" value=\"{value}\" \
             oninput=\"document.getElementById('{name}-value').value = this.value\">"
        );
    }
    let _ = writeln!(
        output,
        "<br><button type=\"submit\" name=\"predict\" value=\"1\">Predict Stress</button>"
    );
    let _ = writeln!(output, "</form>");
}

fn render_prediction(output: &mut String, result: &PredictionResult) {
    let _ = writeln!(output, "<div class=\"columns\">");
    let _ = writeln!(
        output,
        "<div><h3>Predicted Stress Score</h3><h2 class=\"score\">{:.2} / 5</h2></div>",
        result.regression_score
    );
    let _ = writeln!(
        output,
        "<div><h3>Stress Category (XGBoost)</h3><h2 class=\"category\">{}</h2></div>",
        result.category
    );
    let _ = writeln!(output, "</div><br>");
    let _ = writeln!(
        output,
        "<h3>Stress Interpretation: {} {}</h3>",
        result.label(),
        result.band.indicator()
    );
    let _ = writeln!(
        output,
        "<p><strong>Recommendation:</strong> {}</p>",
        escape(result.advice())
    );
}

fn render_dashboard(output: &mut String, dashboard: &Result<Dashboard, DashboardError>) {
    let _ = writeln!(
        output,
        "<br><hr><h2 style=\"text-align:center;\">📊 Stress Data Dashboard</h2><br>"
    );

    let dashboard = match dashboard {
        Ok(dashboard) => dashboard,
        Err(_) => {
            let _ = writeln!(output, "<div class=\"warning\">{DATASET_WARNING}</div>");
            return;
        }
    };

    let _ = writeln!(output, "<div class=\"columns\">");
    let _ = writeln!(
        output,
        "<div><h3>🔍 Feature Importance (Random Forest)</h3>{}</div>",
        dashboard.feature_importance
    );
    let _ = writeln!(
        output,
        "<div><h3>📈 Stress Level Distribution</h3>{}</div>",
        dashboard.stress_distribution
    );
    let _ = writeln!(output, "</div>");
    let _ = writeln!(
        output,
        "<h3>🔥 Correlation Heatmap</h3>{}",
        dashboard.correlation_heatmap
    );

    let _ = writeln!(
        output,
        "<hr><h2 style=\"text-align:center;\">📊 Advanced Model &amp; Data Insights</h2><br>"
    );
    let _ = writeln!(
        output,
        "<h3>🏆 Model Comparison (Regression &amp; Classification)</h3>{}",
        dashboard.model_comparison
    );
    let _ = writeln!(
        output,
        "<h3>🎓 Academic Performance vs Stress Level</h3>{}",
        dashboard.academic_box_plot
    );
}
