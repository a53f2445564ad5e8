//! Expansion of compact target patterns into explicit target tuples.
//!
//! A pattern is a list of slots, each holding either a fixed value or a list of
//! alternatives. Two expansion modes are supported:
//!
//! - **Cartesian**: every combination of one alternative per slot. The first
//!   slot varies fastest.
//! - **Triplet**: for three-body interactions whose middle slot is the centre
//!   atom. The two outer slots are unordered, so `[c, a, k]` and `[c, k, a]`
//!   are both emitted, but the mirrored pair is emitted once when `a == k`.

use super::error::DefinitionError;
use serde::Deserialize;
use std::slice;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Slot<T> {
    AnyOf(Vec<T>),
    One(T),
}

impl<T> Slot<T> {
    pub fn choices(&self) -> &[T] {
        match self {
            Slot::AnyOf(values) => values,
            Slot::One(value) => slice::from_ref(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionMode {
    #[default]
    Cartesian,
    Triplet,
}

/// A compact pattern together with the way it should be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetPattern<T> {
    pub slots: Vec<Slot<T>>,
    #[serde(default)]
    pub mode: ExpansionMode,
}

impl<T: Clone + PartialEq> TargetPattern<T> {
    pub fn expand(&self) -> Result<Vec<Vec<T>>, DefinitionError> {
        match self.mode {
            ExpansionMode::Cartesian => expand_cartesian(&self.slots),
            ExpansionMode::Triplet => expand_triplets(&self.slots),
        }
    }
}

fn check_slots<T>(slots: &[Slot<T>]) -> Result<(), DefinitionError> {
    if slots.is_empty() {
        return Err(DefinitionError::MalformedPattern(
            "a pattern needs at least one slot".to_string(),
        ));
    }
    if let Some(position) = slots.iter().position(|slot| slot.choices().is_empty()) {
        return Err(DefinitionError::MalformedPattern(format!(
            "slot {position} has no alternatives"
        )));
    }
    Ok(())
}

pub fn expand_cartesian<T: Clone>(slots: &[Slot<T>]) -> Result<Vec<Vec<T>>, DefinitionError> {
    check_slots(slots)?;

    let total: usize = slots.iter().map(|slot| slot.choices().len()).product();
    let mut rows = Vec::with_capacity(total);
    let mut counters = vec![0usize; slots.len()];

    loop {
        rows.push(
            slots
                .iter()
                .zip(&counters)
                .map(|(slot, &i)| slot.choices()[i].clone())
                .collect(),
        );

        // Odometer increment, lowest slot first.
        let mut position = 0;
        while position < slots.len() {
            counters[position] += 1;
            if counters[position] < slots[position].choices().len() {
                break;
            }
            counters[position] = 0;
            position += 1;
        }
        if position == slots.len() {
            break;
        }
    }

    Ok(rows)
}

pub fn expand_triplets<T: Clone + PartialEq>(
    slots: &[Slot<T>],
) -> Result<Vec<Vec<T>>, DefinitionError> {
    if slots.len() != 3 {
        return Err(DefinitionError::MalformedPattern(format!(
            "triplet expansion needs exactly 3 slots, got {}",
            slots.len()
        )));
    }
    check_slots(slots)?;

    let (outer_a, centres, outer_c) = (slots[0].choices(), slots[1].choices(), slots[2].choices());
    let mut rows = Vec::new();
    for centre in centres {
        for a in outer_a {
            for c in outer_c {
                rows.push(vec![centre.clone(), a.clone(), c.clone()]);
                if a != c {
                    rows.push(vec![centre.clone(), c.clone(), a.clone()]);
                }
            }
        }
    }
    Ok(rows)
}
