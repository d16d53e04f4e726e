use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PlannerError, PlannerResult};

/// Reference index carried by dither steps.
pub const DITHER_REFERENCE_INDEX: i32 = -1;

const DITHER_TOKEN: &str = "Dither";

/// What a cadence step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CadenceAction {
    Exposure,
    Dither,
}

impl fmt::Display for CadenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CadenceAction::Exposure => write!(f, "Exposure"),
            CadenceAction::Dither => write!(f, "Dither"),
        }
    }
}

impl FromStr for CadenceAction {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Exposure" => Ok(CadenceAction::Exposure),
            "Dither" => Ok(CadenceAction::Dither),
            other => Err(PlannerError::configuration_with_context(
                format!("unknown cadence action '{}'", other),
                ErrorContext::new("parse_cadence_action"),
            )),
        }
    }
}

/// One persisted step of a target's filter cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceItem {
    pub order: i32,
    pub action: CadenceAction,
    /// Index into the target's exposure plans; [`DITHER_REFERENCE_INDEX`] for dithers.
    pub reference_index: i32,
    #[serde(default)]
    pub next: bool,
}

impl CadenceItem {
    pub fn exposure(order: i32, reference_index: i32) -> Self {
        Self {
            order,
            action: CadenceAction::Exposure,
            reference_index,
            next: false,
        }
    }

    pub fn dither(order: i32) -> Self {
        Self {
            order,
            action: CadenceAction::Dither,
            reference_index: DITHER_REFERENCE_INDEX,
            next: false,
        }
    }

    pub fn is_dither(&self) -> bool {
        self.action == CadenceAction::Dither
    }
}

/// One entry of a user supplied exposure order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideExposureOrderItem {
    pub order: i32,
    pub action: CadenceAction,
    pub reference_index: i32,
}

/// Explicit exposure/dither sequence pinned by the user in place of the
/// computed round-robin cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideExposureOrder {
    pub items: Vec<OverrideExposureOrderItem>,
}

impl OverrideExposureOrder {
    /// Build from items, validating that exposure references are non-negative
    /// and dither entries carry the dither reference index.
    pub fn new(items: Vec<OverrideExposureOrderItem>) -> PlannerResult<Self> {
        for item in &items {
            let valid = match item.action {
                CadenceAction::Exposure => item.reference_index >= 0,
                CadenceAction::Dither => item.reference_index == DITHER_REFERENCE_INDEX,
            };
            if !valid {
                return Err(PlannerError::configuration_with_context(
                    format!(
                        "{} entry at order {} has invalid reference index {}",
                        item.action, item.order, item.reference_index
                    ),
                    ErrorContext::new("build_override_exposure_order"),
                ));
            }
        }
        let mut items = items;
        items.sort_by_key(|item| item.order);
        Ok(Self { items })
    }

    /// Parse the persisted text form, e.g. `"0|1|Dither|2"`.
    pub fn parse(text: &str) -> PlannerResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let mut items = Vec::new();
        for (order, token) in trimmed.split('|').enumerate() {
            let token = token.trim();
            let order = order as i32;
            if token == DITHER_TOKEN {
                items.push(OverrideExposureOrderItem {
                    order,
                    action: CadenceAction::Dither,
                    reference_index: DITHER_REFERENCE_INDEX,
                });
                continue;
            }
            let reference_index: i32 = token.parse().map_err(|_| {
                PlannerError::configuration_with_context(
                    format!("unknown cadence action '{}'", token),
                    ErrorContext::new("parse_override_exposure_order").with_details(trimmed),
                )
            })?;
            items.push(OverrideExposureOrderItem {
                order,
                action: CadenceAction::Exposure,
                reference_index,
            });
        }
        Self::new(items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for OverrideExposureOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .items
            .iter()
            .map(|item| match item.action {
                CadenceAction::Exposure => item.reference_index.to_string(),
                CadenceAction::Dither => DITHER_TOKEN.to_string(),
            })
            .collect();
        write!(f, "{}", tokens.join("|"))
    }
}
