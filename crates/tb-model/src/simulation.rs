//! The model and its view, kept together.

use crate::fields::GridConfig;
use crate::model::Model;
use crate::view::ViewState;

/// Everything a saved state captures. The stepping worker, the dispatcher and
/// the state codec all operate on one `Simulation` behind a single lock.
#[derive(Debug, Default)]
pub struct Simulation {
    pub model: Model,
    pub view: ViewState,
}

impl Simulation {
    pub fn new(grid: GridConfig) -> Self {
        Self {
            model: Model::new(grid),
            view: ViewState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.model.reset();
    }

    pub fn clear(&mut self) {
        self.model.clear();
        self.view.clear();
    }

    /// Restore every persisted field to its default, ready for a load.
    pub fn clear_to_defaults(&mut self) {
        self.model.clear_to_defaults();
        self.view = ViewState::default();
    }
}
