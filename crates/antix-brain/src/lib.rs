//! Controllers (decision strategies) for Antix robots.

mod forager;
mod wanderer;

use antix_core::{Command, ControlInput, Controller, ControllerRegistry};
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use forager::{Forager, ForagerSettings};
pub use wanderer::Wanderer;

/// Built-in controller families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    #[default]
    Forager,
    Wanderer,
    Idle,
}

impl ControllerKind {
    pub const ALL: [Self; 3] = [Self::Forager, Self::Wanderer, Self::Idle];

    /// Registry identifier for this family.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Forager => Forager::KIND,
            Self::Wanderer => Wanderer::KIND,
            Self::Idle => Idle::KIND,
        }
    }
}

/// Register every built-in controller, returning keys in [`ControllerKind::ALL`] order.
pub fn install(registry: &mut ControllerRegistry) -> [u64; 3] {
    ControllerKind::ALL.map(|kind| register(registry, kind))
}

/// Register one built-in controller family.
pub fn register(registry: &mut ControllerRegistry, kind: ControllerKind) -> u64 {
    match kind {
        ControllerKind::Forager => registry.register(Forager::KIND, Forager::controller),
        ControllerKind::Wanderer => registry.register(Wanderer::KIND, Wanderer::controller),
        ControllerKind::Idle => registry.register(Idle::KIND, Idle::controller),
    }
}

/// Stands still and never touches a puck.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Idle {
    pub const KIND: &'static str = "antix.idle";

    #[must_use]
    pub fn controller(_rng: &mut dyn RngCore) -> Box<dyn Controller> {
        Box::new(Self)
    }
}

impl Controller for Idle {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn control(&mut self, _input: &ControlInput<'_>) -> Command {
        Command::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_registers_every_family_once() {
        let mut registry = ControllerRegistry::new();
        let keys = install(&mut registry);
        for (kind, key) in ControllerKind::ALL.iter().zip(keys) {
            assert_eq!(registry.kind(key), Some(kind.id()));
            assert_eq!(registry.find(kind.id()), Some(key));
        }
    }

    #[test]
    fn controller_kind_parses_from_snake_case() {
        let kind: ControllerKind = serde_json::from_str("\"wanderer\"").expect("kind");
        assert_eq!(kind, ControllerKind::Wanderer);
    }
}
