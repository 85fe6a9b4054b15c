//! Time series forecasting over a dataset column.

use crate::backend::{AnalyticsService, ServiceError};
use crate::catalog::{find_column, Column, ColumnType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FORECAST_PERIODS: u32 = 6;
pub const MAX_FORECAST_PERIODS: u32 = 60;

fn default_periods() -> u32 {
    DEFAULT_FORECAST_PERIODS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub dataset_id: String,
    pub date_column: String,
    pub value_column: String,
    #[serde(default = "default_periods")]
    pub periods: u32,
}

impl ForecastRequest {
    pub fn new(
        dataset_id: impl Into<String>,
        date_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            date_column: date_column.into(),
            value_column: value_column.into(),
            periods: DEFAULT_FORECAST_PERIODS,
        }
    }

    pub fn with_periods(mut self, periods: u32) -> Self {
        self.periods = periods;
        self
    }

    /// Check the request against the dataset's columns before sending it.
    pub fn validate(&self, catalog: &[Column]) -> Result<(), ForecastError> {
        if !(1..=MAX_FORECAST_PERIODS).contains(&self.periods) {
            return Err(ForecastError::InvalidPeriods(self.periods));
        }
        let date = find_column(catalog, &self.date_column)
            .ok_or_else(|| ForecastError::UnknownColumn(self.date_column.clone()))?;
        if date.dtype != ColumnType::Date {
            return Err(ForecastError::NotADate(self.date_column.clone()));
        }
        let value = find_column(catalog, &self.value_column)
            .ok_or_else(|| ForecastError::UnknownColumn(self.value_column.clone()))?;
        if !value.dtype.is_numeric() {
            return Err(ForecastError::NotNumeric(self.value_column.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    /// Build from the service's `period -> value` object.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, String> {
        let points = map
            .iter()
            .map(|(period, value)| {
                value
                    .as_f64()
                    .map(|value| ForecastPoint {
                        period: period.clone(),
                        value,
                    })
                    .ok_or_else(|| format!("forecast value for '{period}' is not a number"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { points })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    InvalidPeriods(u32),
    UnknownColumn(String),
    NotADate(String),
    NotNumeric(String),
    Service(ServiceError),
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastError::InvalidPeriods(p) => write!(
                f,
                "forecast periods must be between 1 and {MAX_FORECAST_PERIODS}, got {p}"
            ),
            ForecastError::UnknownColumn(c) => write!(f, "column '{c}' does not exist"),
            ForecastError::NotADate(c) => write!(f, "column '{c}' is not a date column"),
            ForecastError::NotNumeric(c) => write!(f, "column '{c}' is not numeric"),
            ForecastError::Service(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ForecastError {}

impl From<ServiceError> for ForecastError {
    fn from(err: ServiceError) -> Self {
        ForecastError::Service(err)
    }
}

pub fn run_forecast(
    service: &dyn AnalyticsService,
    catalog: &[Column],
    request: &ForecastRequest,
) -> Result<Forecast, ForecastError> {
    request.validate(catalog)?;
    tracing::debug!(
        dataset = %request.dataset_id,
        date = %request.date_column,
        value = %request.value_column,
        periods = request.periods,
        "requesting forecast"
    );
    Ok(service.forecast(request)?)
}
