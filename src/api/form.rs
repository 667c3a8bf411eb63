//! HTML input form and result page
//!
//! The form state lives entirely in the request: every submission must carry
//! all seven values, and the page is re-rendered from them.

use actix_web::{HttpResponse, get, http::StatusCode, post, web};
use serde::Deserialize;

use crate::model::record::{parse_flag, parse_number};
use crate::model::explanation::format_percentage;
use crate::model::{
    BinaryFlag, ClinicalRecord, FEATURE_LABELS, FEATURE_NAMES, PredictionOutcome, RecordError,
};
use crate::service::{PredictionError, PredictionService};

const TITLE: &str = "PB Predictor";
const HEADING: &str = "Pediatric Mycoplasma pneumonia: plastic bronchitis prediction model";
const INSTRUCTIONS: &str = "Enter the 7 clinical variables. The model predicts the risk of plastic bronchitis (PB) and explains its decision.";

/// Raw form values as submitted; an absent field is a malformed submission
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionForm {
    pub age: Option<String>,
    pub wbc_nlr: Option<String>,
    pub il6: Option<String>,
    pub ddi: Option<String>,
    pub crp_ldh: Option<String>,
    pub tracheal_stenosis: Option<String>,
    pub cavity: Option<String>,
}

impl Default for PredictionForm {
    fn default() -> Self {
        Self::from(&ClinicalRecord::default())
    }
}

impl From<&ClinicalRecord> for PredictionForm {
    fn from(record: &ClinicalRecord) -> Self {
        let flag = |f: BinaryFlag| Some(u8::from(f).to_string());
        Self {
            age: Some(format!("{:.1}", record.age)),
            wbc_nlr: flag(record.wbc_nlr),
            il6: Some(format!("{:.1}", record.il6)),
            ddi: Some(format!("{:.2}", record.ddi)),
            crp_ldh: flag(record.crp_ldh),
            tracheal_stenosis: flag(record.tracheal_stenosis),
            cavity: flag(record.cavity),
        }
    }
}

impl TryFrom<&PredictionForm> for ClinicalRecord {
    type Error = RecordError;

    fn try_from(form: &PredictionForm) -> Result<Self, Self::Error> {
        Ok(ClinicalRecord {
            age: parse_number(FEATURE_NAMES[0], form.age.as_deref())?,
            wbc_nlr: parse_flag(FEATURE_NAMES[1], form.wbc_nlr.as_deref())?,
            il6: parse_number(FEATURE_NAMES[2], form.il6.as_deref())?,
            ddi: parse_number(FEATURE_NAMES[3], form.ddi.as_deref())?,
            crp_ldh: parse_flag(FEATURE_NAMES[4], form.crp_ldh.as_deref())?,
            tracheal_stenosis: parse_flag(
                FEATURE_NAMES[5],
                form.tracheal_stenosis.as_deref(),
            )?,
            cavity: parse_flag(FEATURE_NAMES[6], form.cavity.as_deref())?,
        })
    }
}

/// What to show under the form
enum Panel<'a> {
    Empty,
    Result(&'a PredictionOutcome),
    Failure(String),
}

/// Render the input form with default values
#[get("/")]
pub async fn index() -> HttpResponse {
    html(StatusCode::OK, render_page(&PredictionForm::default(), Panel::Empty))
}

/// Run one prediction from the submitted form
#[post("/")]
pub async fn submit(
    service: web::Data<PredictionService>,
    form: web::Form<PredictionForm>,
) -> HttpResponse {
    let form = form.into_inner();

    let record = match ClinicalRecord::try_from(&form) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected form submission");
            return html(
                StatusCode::UNPROCESSABLE_ENTITY,
                render_page(&form, Panel::Failure(e.to_string())),
            );
        }
    };

    match service.predict(&record) {
        Ok(outcome) => html(StatusCode::OK, render_page(&form, Panel::Result(&outcome))),
        Err(e) => {
            let status = match e {
                PredictionError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PredictionError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::error!(error = %e, "Prediction failed");
            html(status, render_page(&form, Panel::Failure(e.to_string())))
        }
    }
}

/// Configure form routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(submit);
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn render_page(form: &PredictionForm, panel: Panel<'_>) -> String {
    let fields = [
        number_input("age", FEATURE_LABELS[0], field(&form.age), "0.1"),
        flag_select("wbc_nlr", FEATURE_LABELS[1], field(&form.wbc_nlr)),
        number_input("il6", FEATURE_LABELS[2], field(&form.il6), "0.1"),
        number_input("ddi", FEATURE_LABELS[3], field(&form.ddi), "0.01"),
        flag_select("crp_ldh", FEATURE_LABELS[4], field(&form.crp_ldh)),
        flag_select("tracheal_stenosis", FEATURE_LABELS[5], field(&form.tracheal_stenosis)),
        flag_select("cavity", FEATURE_LABELS[6], field(&form.cavity)),
    ]
    .join("\n");

    let panel = match panel {
        Panel::Empty => String::new(),
        Panel::Result(outcome) => format!(
            r#"<div class="result">Predicted PB risk: <strong>{}</strong>
<span class="baseline">(baseline {})</span></div>
<figure class="force-plot">{}</figure>"#,
            outcome.percentage(),
            format_percentage(outcome.explanation.base_value),
            outcome.force_plot_svg
        ),
        Panel::Failure(message) => format!(
            r#"<div class="error" role="alert">{}</div>"#,
            escape_html(&message)
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{TITLE}</title>
<style>
body {{ font-family: sans-serif; max-width: 1000px; margin: 2rem auto; padding: 0 1rem; }}
label {{ display: block; margin-top: 0.8rem; }}
input, select {{ width: 100%; padding: 0.3rem; }}
button {{ margin-top: 1.2rem; padding: 0.5rem 1.5rem; }}
.result {{ margin-top: 1.5rem; padding: 0.8rem; background: #e8f5e9; }}
.error {{ margin-top: 1.5rem; padding: 0.8rem; background: #ffebee; }}
.force-plot svg {{ max-width: 100%; height: auto; }}
</style>
</head>
<body>
<h1>{HEADING}</h1>
<p>{INSTRUCTIONS}</p>
<form method="post" action="/">
{fields}
<button type="submit">Predict risk</button>
</form>
{panel}
</body>
</html>
"#
    )
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn number_input(name: &str, label: &str, value: &str, step: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label>
<input type="number" id="{name}" name="{name}" value="{value}" step="{step}">"#,
        label = escape_html(label),
        value = escape_html(value),
    )
}

fn flag_select(name: &str, label: &str, value: &str) -> String {
    let option = |v: &str| {
        let selected = if value.trim() == v { " selected" } else { "" };
        format!(r#"<option value="{v}"{selected}>{v}</option>"#)
    };
    format!(
        r#"<label for="{name}">{label}</label>
<select id="{name}" name="{name}">{zero}{one}</select>"#,
        label = escape_html(label),
        zero = option("0"),
        one = option("1"),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
