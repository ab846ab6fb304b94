use antix_core::{Command, ControlInput, Controller};
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};

/// Cruises forward, turning by a small random amount every tick.
#[derive(Debug, Clone)]
pub struct Wanderer {
    rng: SmallRng,
    speed: f64,
    max_turn: f64,
}

impl Wanderer {
    pub const KIND: &'static str = "antix.wanderer";

    #[must_use]
    pub fn new(rng: &mut dyn RngCore, speed: f64, max_turn: f64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(rng.next_u64()),
            speed,
            max_turn: max_turn.abs(),
        }
    }

    #[must_use]
    pub fn controller(rng: &mut dyn RngCore) -> Box<dyn Controller> {
        Box::new(Self::new(rng, 0.005, 0.1))
    }
}

impl Controller for Wanderer {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn control(&mut self, _input: &ControlInput<'_>) -> Command {
        let turn = if self.max_turn > 0.0 {
            self.rng.random_range(-self.max_turn..=self.max_turn)
        } else {
            0.0
        };
        Command::drive(self.speed, turn)
    }
}
