//! Filter cadence: the cyclic exposure/dither sequence of a target.
//!
//! The cadence is either the user's override order or a round-robin over the
//! target's incomplete exposure plans with a dither inserted after every N
//! exposures. Exactly one step carries the `next` cursor while the cadence is
//! non-empty.

use serde::{Deserialize, Serialize};

use super::completion::ExposureCompletion;
use crate::models::{CadenceAction, CadenceItem, OverrideExposureOrder, Target};

/// The next exposure to execute, and whether a dither precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceStep {
    pub dither_first: bool,
    /// Index into the target's exposure plans.
    pub reference_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCadence {
    items: Vec<CadenceItem>,
}

impl FilterCadence {
    /// Wrap existing items, sorting by order and repairing the cursor so that
    /// exactly one item is `next`.
    pub fn from_items(mut items: Vec<CadenceItem>) -> Self {
        items.sort_by_key(|item| item.order);
        let cursor = items.iter().position(|item| item.next).unwrap_or(0);
        let mut cadence = Self { items };
        cadence.renumber();
        cadence.set_cursor(cursor);
        cadence
    }

    /// Map an override order 1:1 into cadence steps.
    pub fn from_override(order: &OverrideExposureOrder) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| match item.action {
                CadenceAction::Exposure => CadenceItem::exposure(item.order, item.reference_index),
                CadenceAction::Dither => CadenceItem::dither(item.order),
            })
            .collect();
        Self::from_items(items)
    }

    /// Default round-robin cadence over `reference_indices` (in stored
    /// order). Each exposure repeats `filter_switch_frequency` times (at
    /// least once) before moving on; a dither follows every `dither_every`
    /// exposures, and `dither_every <= 0` disables dithering.
    pub fn round_robin(
        reference_indices: &[usize],
        dither_every: i32,
        filter_switch_frequency: u32,
    ) -> Self {
        let repeat = filter_switch_frequency.max(1);
        let mut items = Vec::new();
        let mut exposures = 0;
        for &reference_index in reference_indices {
            for _ in 0..repeat {
                items.push(CadenceItem::exposure(items.len() as i32, reference_index as i32));
                exposures += 1;
                if dither_every > 0 && exposures % dither_every == 0 {
                    items.push(CadenceItem::dither(items.len() as i32));
                }
            }
        }
        Self::from_items(items)
    }

    /// Cadence for `target` this cycle.
    ///
    /// Exposure steps for complete or disabled plans are dropped. When the
    /// resulting sequence matches the target's persisted cadence the persisted
    /// cursor is kept; otherwise the cursor lands on the first step for the
    /// exposure the persisted cursor pointed at, or the first step.
    pub fn for_target(
        target: &Target,
        completion: &ExposureCompletion,
        dither_every: i32,
        filter_switch_frequency: u32,
    ) -> Self {
        let incomplete: Vec<usize> = target
            .exposure_plans
            .iter()
            .enumerate()
            .filter(|(_, plan)| plan.enabled && !completion.is_complete(plan))
            .map(|(idx, _)| idx)
            .collect();

        let mut cadence = match &target.override_exposure_order {
            Some(order) if !order.is_empty() => {
                let mut cadence = Self::from_override(order);
                cadence.retain_exposures(|idx| incomplete.contains(&idx));
                cadence
            }
            _ => Self::round_robin(&incomplete, dither_every, filter_switch_frequency),
        };

        let persisted = Self::from_items(target.filter_cadence.clone());
        if persisted.same_sequence(&cadence) {
            return persisted;
        }
        if let Some(reference) = persisted.current().map(|item| item.reference_index) {
            if let Some(idx) = cadence
                .items
                .iter()
                .position(|item| !item.is_dither() && item.reference_index == reference)
            {
                cadence.set_cursor(idx);
            }
        }
        cadence
    }

    pub fn items(&self) -> &[CadenceItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CadenceItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.items.iter().position(|item| item.next)
    }

    pub fn current(&self) -> Option<&CadenceItem> {
        self.cursor().map(|idx| &self.items[idx])
    }

    /// Move the cursor to the following step, wrapping after the last one.
    pub fn advance(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let current = self.cursor().unwrap_or(self.items.len() - 1);
        self.set_cursor((current + 1) % self.items.len());
    }

    /// The exposure the cursor will reach next, without moving it.
    pub fn peek(&self) -> Option<CadenceStep> {
        self.peek_where(|_| true)
    }

    /// Execute steps up to and including the next exposure, leaving the
    /// cursor on the step after it.
    pub fn take(&mut self) -> Option<CadenceStep> {
        self.take_where(|_| true)
    }

    /// Like [`FilterCadence::peek`], passing over exposures whose reference
    /// fails `accept` (e.g. an exposure rejected for this cycle only).
    pub fn peek_where<F>(&self, accept: F) -> Option<CadenceStep>
    where
        F: Fn(usize) -> bool,
    {
        self.find_next(accept).map(|(_, step)| step)
    }

    /// Like [`FilterCadence::take`], passing over exposures whose reference
    /// fails `accept`.
    pub fn take_where<F>(&mut self, accept: F) -> Option<CadenceStep>
    where
        F: Fn(usize) -> bool,
    {
        let (idx, step) = self.find_next(accept)?;
        self.set_cursor((idx + 1) % self.items.len());
        Some(step)
    }

    fn find_next<F>(&self, accept: F) -> Option<(usize, CadenceStep)>
    where
        F: Fn(usize) -> bool,
    {
        let start = self.cursor()?;
        let len = self.items.len();
        let mut dither_first = false;
        for offset in 0..len {
            let idx = (start + offset) % len;
            let item = &self.items[idx];
            match item.action {
                CadenceAction::Dither => dither_first = true,
                CadenceAction::Exposure if accept(item.reference_index as usize) => {
                    return Some((
                        idx,
                        CadenceStep {
                            dither_first,
                            reference_index: item.reference_index as usize,
                        },
                    ))
                }
                CadenceAction::Exposure => {}
            }
        }
        None
    }

    /// Drop exposure steps whose reference fails `keep`. The cursor stays on
    /// its step, or moves to the step that followed a removed one. Dithers are
    /// dropped too once no exposure remains.
    pub fn retain_exposures<F>(&mut self, keep: F)
    where
        F: Fn(usize) -> bool,
    {
        let cursor = self.cursor();
        let mut new_cursor = None;
        let mut retained = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            let kept = item.is_dither() || keep(item.reference_index as usize);
            if kept {
                if new_cursor.is_none() && cursor.is_some_and(|c| idx >= c) {
                    new_cursor = Some(retained.len());
                }
                retained.push(*item);
            }
        }

        if !retained.iter().any(|item| !item.is_dither()) {
            retained.clear();
        }
        self.items = retained;
        self.renumber();
        self.set_cursor(new_cursor.unwrap_or(0));
    }

    fn same_sequence(&self, other: &FilterCadence) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.action == b.action && a.reference_index == b.reference_index)
    }

    fn set_cursor(&mut self, idx: usize) {
        let len = self.items.len();
        for (i, item) in self.items.iter_mut().enumerate() {
            item.next = len > 0 && i == idx % len;
        }
    }

    fn renumber(&mut self) {
        for (order, item) in self.items.iter_mut().enumerate() {
            item.order = order as i32;
        }
    }
}

#[cfg(test)]
#[path = "cadence_tests.rs"]
mod cadence_tests;
