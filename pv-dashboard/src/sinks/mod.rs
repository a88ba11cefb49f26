pub mod chart;
pub mod csv_out;
pub mod dashboard;

pub use dashboard::DashboardSink;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("invalid bind addr: {0}")]
    InvalidAddr(String),
    #[error("failed to bind dashboard listener: {0}")]
    Bind(#[from] std::io::Error),
}
