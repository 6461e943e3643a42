//! Outbound report records.
//!
//! Every task that talks to the server builds a [`Report`].  The DATA/ALERT
//! classification lives in the constructors so that the scheduler and the
//! tests agree on one rule per report type.
//!
//! Wire format (JSON, key names fixed by the server-side tooling):
//!
//! ```text
//! health    {"message_type","room_name","sensor_1_status","sensor_2_status"}
//! telemetry {"message_type","room_name","temperature","humidity"}
//! mold      {"message_type","room_name","temperature","humidity",
//!            "mold_index","mold_risk_status","growth_status"}
//! ```

use serde::Serialize;

use crate::error::TransportError;
use crate::health::{HealthStatus, Severity};
use crate::mold::{MoldModel, RiskLevel};
use crate::sensors::SensorSample;

/// Report tag seen by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    #[serde(rename = "DATA")]
    Data,
    #[serde(rename = "ALERT")]
    Alert,
}

/// Kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportBody {
    Health {
        sensor_1: HealthStatus,
        sensor_2: HealthStatus,
    },
    Telemetry(SensorSample),
    Mold {
        sample: SensorSample,
        mold_index: f32,
        risk: RiskLevel,
        growing: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: MessageKind,
    pub room_name: heapless::String<32>,
    pub body: ReportBody,
}

impl Report {
    /// Health verdict.  ALERT only for hardware faults; drift alone is DATA.
    pub fn health(room_name: &heapless::String<32>, status: [HealthStatus; 2]) -> Self {
        let critical = status.iter().any(|s| s.severity() == Severity::Fault);
        Self {
            kind: if critical {
                MessageKind::Alert
            } else {
                MessageKind::Data
            },
            room_name: room_name.clone(),
            body: ReportBody::Health {
                sensor_1: status[0],
                sensor_2: status[1],
            },
        }
    }

    /// Plain temperature/humidity reading.  Always DATA.
    pub fn telemetry(room_name: &heapless::String<32>, sample: SensorSample) -> Self {
        Self {
            kind: MessageKind::Data,
            room_name: room_name.clone(),
            body: ReportBody::Telemetry(sample),
        }
    }

    /// Mold model status.  DATA only while the surface is clean and not growing.
    pub fn mold(room_name: &heapless::String<32>, sample: SensorSample, model: &MoldModel) -> Self {
        let risk = model.risk_level();
        let growing = model.is_growing();
        Self {
            kind: if risk == RiskLevel::Clean && !growing {
                MessageKind::Data
            } else {
                MessageKind::Alert
            },
            room_name: room_name.clone(),
            body: ReportBody::Mold {
                sample,
                mold_index: model.mold_index(),
                risk,
                growing,
            },
        }
    }

    /// Encode as a JSON object.
    pub fn to_json(&self) -> Result<String, TransportError> {
        let mut wire = Wire {
            message_type: self.kind,
            room_name: self.room_name.as_str(),
            sensor_1_status: None,
            sensor_2_status: None,
            temperature: None,
            humidity: None,
            mold_index: None,
            mold_risk_status: None,
            growth_status: None,
        };
        match self.body {
            ReportBody::Health { sensor_1, sensor_2 } => {
                wire.sensor_1_status = Some(sensor_1.code());
                wire.sensor_2_status = Some(sensor_2.code());
            }
            ReportBody::Telemetry(sample) => {
                wire.temperature = Some(round2(sample.temperature));
                wire.humidity = Some(round2(sample.humidity));
            }
            ReportBody::Mold {
                sample,
                mold_index,
                risk,
                growing,
            } => {
                wire.temperature = Some(round2(sample.temperature));
                wire.humidity = Some(round2(sample.humidity));
                wire.mold_index = Some(round2(mold_index));
                wire.mold_risk_status = Some(risk.code());
                wire.growth_status = Some(u8::from(growing));
            }
        }
        serde_json::to_string(&wire).map_err(|_| TransportError::Encode)
    }
}

#[derive(Serialize)]
struct Wire<'a> {
    message_type: MessageKind,
    room_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_1_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_2_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mold_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mold_risk_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    growth_status: Option<u8>,
}

fn round2(v: f32) -> f64 {
    (f64::from(v) * 100.0).round() / 100.0
}
