use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Desired or reported state of the node LED.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedState {
    #[default]
    Off,
    On,
}

impl LedState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LedState::Off),
            1 => Some(LedState::On),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            LedState::Off => 0,
            LedState::On => 1,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            LedState::Off => LedState::On,
            LedState::On => LedState::Off,
        }
    }

    /// Payload published on the control topic.
    pub fn command(&self) -> &'static str {
        match self {
            LedState::Off => "0",
            LedState::On => "1",
        }
    }
}

impl Display for LedState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            LedState::Off => write!(f, "OFF"),
            LedState::On => write!(f, "ON"),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedControlRequest {
    /// 0 (OFF) or 1 (ON)
    pub state: Option<i64>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedControlResponse {
    pub success: bool,
    pub message: String,
    pub state: u8,
    /// Whether the command was handed to the broker. It says nothing about
    /// whether the device applied it.
    pub published: bool,
}
