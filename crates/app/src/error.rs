use client::{ClientError, SessionError, TransportError};
use dashboard::DashboardError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("request failed: {0}")]
    Client(#[from] ClientError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("dashboard error: {0}")]
    Dashboard(#[from] DashboardError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    Input(String),
}
