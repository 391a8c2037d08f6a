//! Process-wide operating cycle state.
//!
//! The cycle id is fixed when the state is created (`cycle_YYYY-MM-DD`, from
//! the UTC date); the phase changes through [`CycleState::transition`].
//! Both live behind one mutex so stamping a record reads them as a single
//! [`CycleSnapshot`].

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::schema::CyclePhase;

/// Consistent view of the cycle at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSnapshot {
    /// Current cycle id.
    pub cycle_id: String,
    /// Current phase.
    pub phase: CyclePhase,
}

/// Shared cycle state, injected as `Arc<CycleState>`.
#[derive(Debug)]
pub struct CycleState {
    inner: Mutex<CycleSnapshot>,
}

impl CycleState {
    /// State with an explicit cycle id and phase.
    pub fn new(cycle_id: impl Into<String>, phase: CyclePhase) -> Self {
        Self {
            inner: Mutex::new(CycleSnapshot {
                cycle_id: cycle_id.into(),
                phase,
            }),
        }
    }

    /// State for the cycle of `date`, in the default phase.
    pub fn for_date(date: NaiveDate) -> Self {
        Self::new(Self::cycle_id_for(date), CyclePhase::default())
    }

    /// State for today's UTC cycle, in the default phase.
    pub fn start_now() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    /// Cycle id derived from a calendar date.
    pub fn cycle_id_for(date: NaiveDate) -> String {
        format!("cycle_{}", date.format("%Y-%m-%d"))
    }

    /// Read id and phase together.
    pub fn snapshot(&self) -> CycleSnapshot {
        self.inner.lock().clone()
    }

    /// Current cycle id.
    pub fn cycle_id(&self) -> String {
        self.inner.lock().cycle_id.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> CyclePhase {
        self.inner.lock().phase
    }

    /// Move to `phase`, returning the phase it replaced.
    pub fn transition(&self, phase: CyclePhase) -> CyclePhase {
        let mut inner = self.inner.lock();
        let previous = std::mem::replace(&mut inner.phase, phase);
        info!(cycle_id = %inner.cycle_id, from = %previous, to = %phase, "cycle phase transition");
        previous
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::start_now()
    }
}
