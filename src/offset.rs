//! Ground clearance of a model, picked from prioritized sources
//!
//! Four sources may supply the distance between a model's origin and its
//! lowest point: a user override, the package's xsb file, the model's
//! material file and a value calculated from geometry. The highest priority
//! available source wins.

/// Where the actual offset came from, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OffsetSource {
    User,
    Xsb,
    Mtl,
    Calculated,
    /// No source available; the offset is 0
    #[default]
    None,
}

impl OffsetSource {
    const PRIORITY: [OffsetSource; 4] = [
        OffsetSource::User,
        OffsetSource::Xsb,
        OffsetSource::Mtl,
        OffsetSource::Calculated,
    ];

    fn index(self) -> Option<usize> {
        Self::PRIORITY.iter().position(|source| *source == self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Candidate {
    value: f64,
    available: bool,
    up_to_date: bool,
}

/// Offset candidates of one model plus the selected one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerticalOffset {
    candidates: [Candidate; 4],
    actual: OffsetSource,
    previous: OffsetSource,
    offset: f64,
}

impl VerticalOffset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a value for `source`; takes effect on the next [`Self::resolve`]
    ///
    /// Setting [`OffsetSource::None`] is ignored.
    pub fn set(&mut self, source: OffsetSource, value: f64) {
        if let Some(index) = source.index() {
            self.candidates[index] = Candidate {
                value,
                available: true,
                up_to_date: false,
            };
        }
    }

    /// Withdraw the value of `source`; takes effect on the next [`Self::resolve`]
    pub fn clear(&mut self, source: OffsetSource) {
        if let Some(index) = source.index() {
            let candidate = &mut self.candidates[index];
            candidate.available = false;
            candidate.up_to_date = false;
        }
    }

    /// The value `source` currently holds, if available
    pub fn candidate(&self, source: OffsetSource) -> Option<f64> {
        let candidate = source.index().map(|index| self.candidates[index])?;
        candidate.available.then_some(candidate.value)
    }

    /// Re-select the actual offset after candidates changed
    ///
    /// Only stale candidates trigger a re-selection: if the actual source
    /// outranks every stale one, it is kept. Returns the actual offset.
    pub fn resolve(&mut self) -> f64 {
        self.previous = self.actual;

        let stale = self.candidates.iter().position(|c| !c.up_to_date);
        if let Some(stale) = stale {
            let keep = self.actual.index().is_some_and(|actual| actual < stale);
            if !keep {
                // Sources above the stale one were already passed over
                let chosen = (stale..self.candidates.len())
                    .find(|&index| self.candidates[index].available);
                match chosen {
                    Some(index) => {
                        self.actual = OffsetSource::PRIORITY[index];
                        self.offset = self.candidates[index].value;
                    }
                    None => {
                        self.actual = OffsetSource::None;
                        self.offset = 0.0;
                    }
                }
            }
            for candidate in &mut self.candidates {
                candidate.up_to_date = true;
            }
        }

        self.offset
    }

    /// The selected offset in meters
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn actual_source(&self) -> OffsetSource {
        self.actual
    }

    /// The source selected before the last [`Self::resolve`]
    pub fn previous_source(&self) -> OffsetSource {
        self.previous
    }

    /// Whether the last [`Self::resolve`] switched sources
    pub fn changed(&self) -> bool {
        self.actual != self.previous
    }
}
