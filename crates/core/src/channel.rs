//! Device access channel: address space layout and wire types.
//!
//! Each simulator exposes one object per machine under the machine's own
//! namespace. The object holds one typed variable per observable field.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::machine::{AxisPosition, MachineStatus, UnknownStatus};
use crate::snapshot::MachineReading;

/// Namespace registered first by every server (index 0).
pub const SERVER_NAMESPACE: &str = "urn:shopfloor:server";

/// Namespace URI a machine registers its object under.
pub fn machine_namespace(machine_id: &str) -> String {
    format!("urn:shopfloor:machine:{machine_id}")
}

/// Variable names under a machine object.
pub mod vars {
    pub const STATUS: &str = "Status";
    pub const PRODUCTION_TOTAL: &str = "ProducaoTotal";
    pub const POSITION_X: &str = "PosicaoX";
    pub const POSITION_Y: &str = "PosicaoY";
    pub const POSITION_Z: &str = "PosicaoZ";
    pub const SPINDLE_SPEED: &str = "VelocidadeFuso";
    pub const ACTIVE_ALARMS: &str = "AlarmesAtivos";

    /// Every variable a machine object must declare.
    pub const ALL: [&str; 7] = [
        STATUS,
        PRODUCTION_TOTAL,
        POSITION_X,
        POSITION_Y,
        POSITION_Z,
        SPINDLE_SPEED,
        ACTIVE_ALARMS,
    ];
}

/// Typed variable value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    String(String),
    Int(i64),
    Double(f64),
}

impl Variant {
    /// Type name as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
        }
    }
}

/// `GET /v1/namespaces`. A namespace's index is its position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespacesResponse {
    pub namespaces: Vec<String>,
}

impl NamespacesResponse {
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.namespaces
            .iter()
            .position(|ns| ns == uri)
            .and_then(|idx| u16::try_from(idx).ok())
    }
}

/// `GET /v1/objects/{ns}/{object}`.
///
/// `values` is taken in one read of the object, so every value belongs to
/// the same publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub object: String,
    pub variables: Vec<String>,
    pub values: HashMap<String, Variant>,
}

/// `GET /v1/objects/{ns}/{object}/{variable}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    pub variable: String,
    pub value: Variant,
}

/// Body of any non-2xx channel response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Why a set of variables could not be turned into a reading.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("variable {0} missing")]
    Missing(&'static str),
    #[error("variable {variable} has type {found}, expected {expected}")]
    TypeMismatch {
        variable: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("variable {variable} out of range: {value}")]
    OutOfRange { variable: &'static str, value: i64 },
    #[error(transparent)]
    Status(#[from] UnknownStatus),
    #[error("alarm list is not a JSON string array: {0}")]
    Alarms(#[from] serde_json::Error),
}

/// Encode a reading as `(variable, value)` pairs, in [`vars::ALL`] order.
pub fn encode_reading(reading: &MachineReading) -> Vec<(&'static str, Variant)> {
    vec![
        (vars::STATUS, Variant::String(reading.status.as_str().to_string())),
        (
            vars::PRODUCTION_TOTAL,
            Variant::Int(i64::try_from(reading.production_total).unwrap_or(i64::MAX)),
        ),
        (vars::POSITION_X, Variant::Double(reading.axis.x)),
        (vars::POSITION_Y, Variant::Double(reading.axis.y)),
        (vars::POSITION_Z, Variant::Double(reading.axis.z)),
        (vars::SPINDLE_SPEED, Variant::Double(reading.spindle_speed)),
        (vars::ACTIVE_ALARMS, Variant::String(reading.alarms_json())),
    ]
}

/// Rebuild a reading from variables read off a machine object.
pub fn decode_reading(
    machine_id: &str,
    values: &HashMap<String, Variant>,
) -> Result<MachineReading, DecodeError> {
    let status: MachineStatus = string_var(values, vars::STATUS)?.parse()?;

    let production = int_var(values, vars::PRODUCTION_TOTAL)?;
    let production_total = u64::try_from(production).map_err(|_| DecodeError::OutOfRange {
        variable: vars::PRODUCTION_TOTAL,
        value: production,
    })?;

    let active_alarms: BTreeSet<String> =
        serde_json::from_str(string_var(values, vars::ACTIVE_ALARMS)?)?;

    Ok(MachineReading {
        machine_id: machine_id.to_string(),
        status,
        production_total,
        axis: AxisPosition {
            x: double_var(values, vars::POSITION_X)?,
            y: double_var(values, vars::POSITION_Y)?,
            z: double_var(values, vars::POSITION_Z)?,
        },
        spindle_speed: double_var(values, vars::SPINDLE_SPEED)?,
        active_alarms,
    })
}

fn lookup<'a>(
    values: &'a HashMap<String, Variant>,
    variable: &'static str,
) -> Result<&'a Variant, DecodeError> {
    values.get(variable).ok_or(DecodeError::Missing(variable))
}

fn string_var<'a>(
    values: &'a HashMap<String, Variant>,
    variable: &'static str,
) -> Result<&'a str, DecodeError> {
    match lookup(values, variable)? {
        Variant::String(s) => Ok(s),
        other => Err(mismatch(variable, "string", other)),
    }
}

fn int_var(values: &HashMap<String, Variant>, variable: &'static str) -> Result<i64, DecodeError> {
    match lookup(values, variable)? {
        Variant::Int(v) => Ok(*v),
        other => Err(mismatch(variable, "int", other)),
    }
}

fn double_var(
    values: &HashMap<String, Variant>,
    variable: &'static str,
) -> Result<f64, DecodeError> {
    match lookup(values, variable)? {
        Variant::Double(v) => Ok(*v),
        // integral doubles may arrive as ints
        Variant::Int(v) => Ok(*v as f64),
        other => Err(mismatch(variable, "double", other)),
    }
}

fn mismatch(variable: &'static str, expected: &'static str, found: &Variant) -> DecodeError {
    DecodeError::TypeMismatch {
        variable,
        expected,
        found: found.type_name(),
    }
}
