//! Canonical traffic control of one intersection: what faces the ego car and
//! how the opposite approaches mirror it. Sampled once when the intersection
//! is committed; obstacle placement is derived from it on every assembly.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::individual::IdCounters;
use crate::road::Lanes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Red,
    Green,
}

impl LightColor {
    pub fn toggled(self) -> Self {
        match self {
            LightColor::Red => LightColor::Green,
            LightColor::Green => LightColor::Red,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightMode {
    Off,
    Flashing,
    /// Switched by a trigger; `object_id` names the light for the trigger.
    Manual {
        object_id: String,
        initial: LightColor,
    },
}

impl LightMode {
    pub fn sample(rng: &mut impl Rng, counters: &mut IdCounters) -> Self {
        match rng.random_range(0..3) {
            0 => LightMode::Off,
            1 => LightMode::Flashing,
            _ => LightMode::Manual {
                object_id: counters.next_manual_light(),
                initial: if rng.random_bool(0.5) {
                    LightColor::Green
                } else {
                    LightColor::Red
                },
            },
        }
    }

    /// Mode shown on approaches that do not face the ego car.
    pub fn for_opposite(&self) -> Self {
        match self {
            LightMode::Manual { .. } => LightMode::Off,
            other => other.clone(),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, LightMode::Manual { .. })
    }
}

/// Sign mounted on a traffic light pole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoleSign {
    Yield,
    Priority,
}

impl PoleSign {
    fn sample(rng: &mut impl Rng) -> Self {
        if rng.random_bool(0.5) {
            PoleSign::Yield
        } else {
            PoleSign::Priority
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            PoleSign::Yield => PoleSign::Priority,
            PoleSign::Priority => PoleSign::Yield,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Go,
    Stop,
}

/// What the ego approach of an intersection is controlled by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    StopSign,
    PrioritySign,
    /// Head count (single or double) follows the lanes at derivation time.
    Light { mode: LightMode, pole: PoleSign },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficControl {
    /// Shared by every obstacle placed at this intersection.
    pub intersection_id: u32,
    pub signal: Signal,
}

fn signs_allowed(incoming: Lanes, opposite: Lanes) -> bool {
    incoming.left == 1 && incoming.right == 1 && opposite.left == 1 && opposite.right == 1
}

impl TrafficControl {
    /// Signs are only possible where every involved road has a single lane
    /// per direction; otherwise the junction gets a light.
    pub fn sample(
        rng: &mut impl Rng,
        incoming: Lanes,
        opposite: Lanes,
        counters: &mut IdCounters,
    ) -> Self {
        let mode = LightMode::sample(rng, counters);
        let pole = PoleSign::sample(rng);
        let signal = if signs_allowed(incoming, opposite) && rng.random_bool(0.5) {
            if rng.random_bool(0.5) {
                Signal::StopSign
            } else {
                Signal::PrioritySign
            }
        } else {
            Signal::Light { mode, pole }
        };
        Self {
            intersection_id: counters.next_intersection(),
            signal,
        }
    }

    /// Replace a sign with a freshly sampled light once the junction's roads
    /// no longer all have a single lane per direction. Returns whether the
    /// signal changed.
    pub fn fit_lanes(
        &mut self,
        rng: &mut impl Rng,
        incoming: Lanes,
        opposite: Lanes,
        counters: &mut IdCounters,
    ) -> bool {
        if matches!(self.signal, Signal::Light { .. }) || signs_allowed(incoming, opposite) {
            return false;
        }
        self.signal = Signal::Light {
            mode: LightMode::sample(rng, counters),
            pole: PoleSign::sample(rng),
        };
        true
    }

    /// Whether the ego car may pass without stopping.
    pub fn action(&self) -> Action {
        match &self.signal {
            Signal::PrioritySign => Action::Go,
            Signal::StopSign => Action::Stop,
            Signal::Light {
                pole: PoleSign::Priority,
                ..
            } => Action::Go,
            Signal::Light {
                mode:
                    LightMode::Manual {
                        initial: LightColor::Red,
                        ..
                    },
                ..
            } => Action::Go,
            Signal::Light { .. } => Action::Stop,
        }
    }

    pub fn light_mode(&self) -> Option<&LightMode> {
        match &self.signal {
            Signal::Light { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// Resample the light mode; signs are left alone.
    pub fn mutate_mode(&mut self, rng: &mut impl Rng, counters: &mut IdCounters) -> bool {
        match &mut self.signal {
            Signal::Light { mode, .. } => {
                *mode = LightMode::sample(rng, counters);
                true
            }
            _ => false,
        }
    }
}
