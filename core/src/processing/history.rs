use ndarray::Array2;

/// Fixed-size circular history of filter inputs and outputs.
///
/// Rows are time slots, columns are channels. `cursor` names the newest slot;
/// the slot `t` steps in the past is `(cursor - t) mod slots`.
#[derive(Debug, Clone)]
pub struct FilterHistory {
    x: Array2<f64>,
    y: Array2<f64>,
    cursor: usize,
}

impl FilterHistory {
    pub fn new(slots: usize, channels: usize) -> Self {
        let slots = slots.max(1);
        Self {
            x: Array2::zeros((slots, channels)),
            y: Array2::zeros((slots, channels)),
            cursor: 0,
        }
    }

    /// Resizes and zero-fills both buffers, rewinding the cursor.
    pub fn reset(&mut self, slots: usize, channels: usize) {
        *self = Self::new(slots, channels);
    }

    pub fn slots(&self) -> usize {
        self.x.nrows()
    }

    pub fn channels(&self) -> usize {
        self.x.ncols()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor onto the oldest slot, which becomes the newest.
    pub fn advance(&mut self) -> usize {
        self.cursor = (self.cursor + 1) % self.slots();
        self.cursor
    }

    /// Slot index `age` steps before the cursor.
    pub fn past(&self, age: usize) -> usize {
        let slots = self.slots();
        (self.cursor + slots - age % slots) % slots
    }

    pub fn x(&self, slot: usize, channel: usize) -> f64 {
        self.x[[slot, channel]]
    }

    pub fn y(&self, slot: usize, channel: usize) -> f64 {
        self.y[[slot, channel]]
    }

    pub fn set_x(&mut self, slot: usize, channel: usize, value: f64) {
        self.x[[slot, channel]] = value;
    }

    pub fn set_y(&mut self, slot: usize, channel: usize, value: f64) {
        self.y[[slot, channel]] = value;
    }

    /// Output values stored in the newest slot.
    pub fn latest_outputs(&self) -> impl Iterator<Item = f64> + '_ {
        self.y.row(self.cursor).into_iter().copied()
    }
}
