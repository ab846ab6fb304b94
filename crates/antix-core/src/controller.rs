use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use antix_index::Torus;
use rand::RngCore;

use crate::config::AntixConfig;
use crate::entity::{Home, Pose, PuckId, Speed};
use crate::sensor::{SeePuck, SeeRobot};

/// What a controller may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct ControlInput<'a> {
    pub pose: Pose,
    pub speed: Speed,
    pub holding: bool,
    pub home: &'a Home,
    pub see_robots: &'a [SeeRobot],
    pub see_pucks: &'a [SeePuck],
    pub torus: &'a Torus,
    pub config: &'a AntixConfig,
}

/// Puck handling requested alongside a speed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Grip {
    #[default]
    Keep,
    /// Nearest free puck within reach in the robot's cell.
    Pickup,
    /// This puck only, under the same cell and reach rules as `Pickup`.
    PickupPuck(PuckId),
    Drop,
}

/// Decision produced once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Command {
    pub speed: Speed,
    pub grip: Grip,
}

impl Command {
    #[must_use]
    pub const fn drive(v: f64, w: f64) -> Self {
        Self {
            speed: Speed::new(v, w),
            grip: Grip::Keep,
        }
    }

    #[must_use]
    pub const fn with_grip(mut self, grip: Grip) -> Self {
        self.grip = grip;
        self
    }
}

/// Per-robot decision strategy, invoked once per tick between sensing and moving.
pub trait Controller: Send + Sync {
    /// Static identifier of the controller implementation.
    fn kind(&self) -> &'static str;

    /// Choose speeds and puck handling from the latest percepts.
    fn control(&mut self, input: &ControlInput<'_>) -> Command;
}

impl fmt::Debug for dyn Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("kind", &self.kind())
            .finish()
    }
}

type ControllerSpawner =
    Box<dyn Fn(&mut dyn RngCore) -> Box<dyn Controller> + Send + Sync + 'static>;

struct ControllerEntry {
    kind: Cow<'static, str>,
    spawner: ControllerSpawner,
}

/// Factories for controllers keyed by opaque handles.
#[derive(Default)]
pub struct ControllerRegistry {
    next_key: u64,
    entries: HashMap<u64, ControllerEntry>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("next_key", &self.next_key)
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new controller factory, returning its registry key.
    pub fn register<F>(&mut self, kind: impl Into<Cow<'static, str>>, factory: F) -> u64
    where
        F: Fn(&mut dyn RngCore) -> Box<dyn Controller> + Send + Sync + 'static,
    {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.insert(
            key,
            ControllerEntry {
                kind: kind.into(),
                spawner: Box::new(factory),
            },
        );
        key
    }

    /// Instantiate a controller from the factory referenced by `key`.
    pub fn spawn(&self, rng: &mut dyn RngCore, key: u64) -> Option<Box<dyn Controller>> {
        self.entries.get(&key).map(|entry| (entry.spawner)(rng))
    }

    #[must_use]
    pub fn kind(&self, key: u64) -> Option<&str> {
        self.entries.get(&key).map(|entry| entry.kind.as_ref())
    }

    /// Key of the first factory registered under `kind`.
    #[must_use]
    pub fn find(&self, kind: &str) -> Option<u64> {
        let mut keys: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys.first().copied()
    }

    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut entries: Vec<(&u64, &ControllerEntry)> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|(key, _)| **key);
        entries
            .into_iter()
            .map(|(_, entry)| entry.kind.as_ref())
            .collect()
    }
}
