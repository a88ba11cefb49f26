use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pvlive_client::GenerationSample;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use tokio::sync::watch;

use super::{
    chart::{self, CHART_SIZE},
    SinkError,
};
use crate::{
    config::validate_refresh_secs,
    pipeline::{Panel, Sink},
    transform::DisplayZone,
};

const PAGE_TEMPLATE: &str = include_str!("dashboard.html");

#[derive(Debug, Clone)]
struct Published {
    version: u64,
    panel: Panel,
}

#[derive(Clone)]
struct AppState {
    panel: watch::Receiver<Published>,
    interval: Arc<watch::Sender<Duration>>,
    page: Arc<str>,
    zone: DisplayZone,
}

/// Browser dashboard: serves the page, the chart and the refresh slider.
pub struct DashboardSink {
    panel_tx: watch::Sender<Published>,
    state: AppState,
}

#[derive(Serialize)]
struct PanelView {
    version: u64,
    refresh_secs: u64,
    time_zone: &'static str,
    last_updated_label: Option<String>,
    #[serde(flatten)]
    panel: Panel,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshRate {
    seconds: u64,
}

impl DashboardSink {
    /// Dashboard without a listener; see [`DashboardSink::router`].
    pub fn detached(title: &str, zone: DisplayZone, interval: watch::Sender<Duration>) -> Self {
        let (panel_tx, panel_rx) = watch::channel(Published {
            version: 0,
            panel: Panel::Pending,
        });

        let state = AppState {
            panel: panel_rx,
            interval: Arc::new(interval),
            page: render_page(title).into(),
            zone,
        };

        Self { panel_tx, state }
    }

    /// Bind `bind_addr` and serve the dashboard in the background.
    pub async fn new(
        bind_addr: &str,
        title: &str,
        zone: DisplayZone,
        interval: watch::Sender<Duration>,
    ) -> Result<Self, SinkError> {
        let sink = Self::detached(title, zone, interval);

        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| SinkError::InvalidAddr(format!("{bind_addr}: {e}")))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = sink.router();

        tracing::info!(%addr, "dashboard listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                tracing::error!(error = %e, "dashboard server error");
            }
        });

        Ok(sink)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/chart.svg", get(chart_svg))
            .route("/api/panel", get(panel))
            .route("/api/refresh-rate", post(set_refresh_rate))
            .route("/healthz", get(|| async { "ok" }))
            .with_state(self.state.clone())
    }
}

#[async_trait::async_trait]
impl Sink for DashboardSink {
    async fn publish(&self, panel: Panel) {
        self.panel_tx.send_modify(|p| {
            p.version += 1;
            p.panel = panel;
        });
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
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

fn render_page(title: &str) -> String {
    PAGE_TEMPLATE.replace("{{title}}", &html_escape(title))
}

fn last_updated_label(panel: &Panel) -> Option<String> {
    let ts = match panel {
        Panel::Chart { last_updated, .. } => Some(*last_updated),
        Panel::NoData { last_updated, .. } => *last_updated,
        Panel::Pending => None,
    }?;
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .ok()
}

fn current_series(state: &AppState) -> Option<Vec<GenerationSample>> {
    match &state.panel.borrow().panel {
        Panel::Chart { series, .. } => Some(series.clone()),
        _ => None,
    }
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.page.to_string())
}

async fn panel(State(state): State<AppState>) -> Json<PanelView> {
    let published = state.panel.borrow().clone();
    Json(PanelView {
        version: published.version,
        refresh_secs: state.interval.borrow().as_secs(),
        time_zone: state.zone.name(),
        last_updated_label: last_updated_label(&published.panel),
        panel: published.panel,
    })
}

async fn chart_svg(State(state): State<AppState>) -> Response {
    let Some(series) = current_series(&state) else {
        return (StatusCode::NOT_FOUND, "no chart to show").into_response();
    };

    let zone = state.zone;
    match tokio::task::spawn_blocking(move || chart::render_svg(&series, &zone, CHART_SIZE)).await {
        Ok(Ok(svg)) => (
            [
                (header::CONTENT_TYPE, "image/svg+xml"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            svg,
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "chart rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "chart rendering task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn set_refresh_rate(
    State(state): State<AppState>,
    Json(req): Json<RefreshRate>,
) -> Result<Json<RefreshRate>, (StatusCode, String)> {
    validate_refresh_secs(req.seconds).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    state.interval.send_replace(Duration::from_secs(req.seconds));
    tracing::info!(seconds = req.seconds, "refresh interval set from dashboard");

    Ok(Json(req))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use time::macros::datetime;
    use tower::ServiceExt;

    fn sink() -> (DashboardSink, watch::Receiver<Duration>) {
        let (tx, rx) = watch::channel(Duration::from_secs(60));
        let zone = DisplayZone::by_name("Europe/Paris").unwrap();
        (DashboardSink::detached("PV <Live>", zone, tx), rx)
    }

    fn chart_panel() -> Panel {
        Panel::Chart {
            series: vec![
                GenerationSample {
                    ts: datetime!(2024-06-01 12:00:00 +02:00),
                    generation_mw: Some(100.0),
                },
                GenerationSample {
                    ts: datetime!(2024-06-01 12:05:00 +02:00),
                    generation_mw: Some(120.0),
                },
            ],
            last_updated: datetime!(2024-06-01 12:07:03 +02:00),
        }
    }

    async fn body_string(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        serde_json::from_str(&body_string(resp).await).unwrap()
    }

    fn post_rate(seconds: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/refresh-rate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "seconds": seconds }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn page_carries_escaped_title_and_slider() {
        let (sink, _rx) = sink();

        let resp = sink
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let html = body_string(resp).await;
        assert!(html.contains("PV &lt;Live&gt;"));
        assert!(html.contains(r#"min="10""#));
        assert!(html.contains(r#"max="600""#));
        assert!(html.contains(r#"step="10""#));
    }

    #[tokio::test]
    async fn panel_starts_pending() {
        let (sink, _rx) = sink();

        let view = get_json(sink.router(), "/api/panel").await;

        assert_eq!(view["kind"], "pending");
        assert_eq!(view["version"], 0);
        assert_eq!(view["refresh_secs"], 60);
        assert_eq!(view["time_zone"], "Europe/Paris");
    }

    #[tokio::test]
    async fn published_chart_is_served() {
        let (sink, _rx) = sink();
        sink.publish(chart_panel()).await;

        let view = get_json(sink.router(), "/api/panel").await;
        assert_eq!(view["kind"], "chart");
        assert_eq!(view["version"], 1);
        assert_eq!(view["last_updated_label"], "2024-06-01 12:07:03");
        assert_eq!(view["series"][0]["ts"], "2024-06-01T12:00:00+02:00");
        assert_eq!(view["series"][1]["generation_mw"], 120.0);

        let resp = sink
            .router()
            .oneshot(Request::builder().uri("/chart.svg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert!(body_string(resp).await.contains("<svg"));
    }

    #[tokio::test]
    async fn no_data_panel_has_message_and_no_chart() {
        let (sink, _rx) = sink();
        sink.publish(chart_panel()).await;
        sink.publish(Panel::NoData {
            message: "nothing".to_string(),
            last_updated: Some(datetime!(2024-06-01 12:07:03 +02:00)),
        })
        .await;

        let view = get_json(sink.router(), "/api/panel").await;
        assert_eq!(view["kind"], "no_data");
        assert_eq!(view["message"], "nothing");
        assert_eq!(view["version"], 2);
        assert_eq!(view["last_updated_label"], "2024-06-01 12:07:03");

        let resp = sink
            .router()
            .oneshot(Request::builder().uri("/chart.svg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn slider_updates_refresh_interval() {
        let (sink, rx) = sink();

        let resp = sink.router().oneshot(post_rate(serde_json::json!(120))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*rx.borrow(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn out_of_range_refresh_rate_is_rejected() {
        let (sink, rx) = sink();

        for seconds in [5, 15, 610] {
            let resp = sink.router().oneshot(post_rate(serde_json::json!(seconds))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert_eq!(*rx.borrow(), Duration::from_secs(60));
    }
}
