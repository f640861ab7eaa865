use thiserror::Error;

use crate::region::RegionCoord;

/// Why a region tile could not be produced. Cloned to every waiter of a failed
/// generation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenError {
    #[error("noise returned a non-finite value at block ({wx}, {wz}) in region ({rx}, {rz})")]
    NonFinite { rx: i32, rz: i32, wx: i32, wz: i32 },
    #[error("generation of region ({rx}, {rz}) panicked: {message}")]
    Panicked { rx: i32, rz: i32, message: String },
    #[error("generation of region ({rx}, {rz}) failed: {reason}")]
    Failed { rx: i32, rz: i32, reason: String },
}

impl GenError {
    pub fn failed(region: RegionCoord, reason: impl Into<String>) -> Self {
        GenError::Failed {
            rx: region.rx,
            rz: region.rz,
            reason: reason.into(),
        }
    }

    pub fn panicked(region: RegionCoord, message: impl Into<String>) -> Self {
        GenError::Panicked {
            rx: region.rx,
            rz: region.rz,
            message: message.into(),
        }
    }

    pub fn region(&self) -> RegionCoord {
        match *self {
            GenError::NonFinite { rx, rz, .. }
            | GenError::Panicked { rx, rz, .. }
            | GenError::Failed { rx, rz, .. } => RegionCoord::new(rx, rz),
        }
    }
}
