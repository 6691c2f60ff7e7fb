use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::GatewayError;

/// Where an execution is in its suspend/resume cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayState {
  /// Not dispatched by this gateway, or no longer remembered.
  Idle,
  /// Request sent, waiting for the reply.
  Suspended,
  /// Reply received, variables being applied.
  Resuming,
  /// Control returned to the engine.
  Resumed,
}

/// Cycle state per execution id.
///
/// In-flight entries live until their cycle ends. Only the most recent
/// `history` resumed entries are kept, so a late reply for a recent cycle
/// is rejected without asking the engine; older ones fall back to `Idle`
/// and the engine reports them as not found.
#[derive(Debug)]
pub(crate) struct CycleTable {
  inner: Mutex<Cycles>,
  history: usize,
}

#[derive(Debug, Default)]
struct Cycles {
  states: HashMap<String, GatewayState>,
  resumed: VecDeque<String>,
}

impl CycleTable {
  pub(crate) fn new(history: usize) -> Self {
    Self {
      inner: Mutex::new(Cycles::default()),
      history,
    }
  }

  pub(crate) fn get(&self, execution_id: &str) -> GatewayState {
    self
      .lock()
      .states
      .get(execution_id)
      .copied()
      .unwrap_or(GatewayState::Idle)
  }

  /// Record an in-flight state. Use [`CycleTable::finish`] for `Resumed`.
  pub(crate) fn set(&self, execution_id: &str, state: GatewayState) {
    self.lock().states.insert(execution_id.to_string(), state);
  }

  pub(crate) fn forget(&self, execution_id: &str) {
    self.lock().states.remove(execution_id);
  }

  /// Mark a cycle as resumed, evicting the oldest resumed entry once the
  /// history is full.
  pub(crate) fn finish(&self, execution_id: &str) {
    let mut cycles = self.lock();
    Self::finish_locked(&mut cycles, execution_id, self.history);
  }

  /// Mark `execution_id` as resuming and return the state it had.
  ///
  /// Only one reply per execution can hold the claim. A second one fails
  /// with `DuplicateReply` while the first is applied, and with `NotFound`
  /// once the execution has resumed.
  pub(crate) fn claim(&self, execution_id: &str) -> Result<GatewayState, GatewayError> {
    let mut cycles = self.lock();
    let previous = cycles
      .states
      .get(execution_id)
      .copied()
      .unwrap_or(GatewayState::Idle);
    match previous {
      GatewayState::Resuming => Err(GatewayError::DuplicateReply {
        execution_id: execution_id.to_string(),
      }),
      GatewayState::Resumed => Err(GatewayError::NotFound {
        execution_id: execution_id.to_string(),
      }),
      GatewayState::Idle | GatewayState::Suspended => {
        cycles
          .states
          .insert(execution_id.to_string(), GatewayState::Resuming);
        Ok(previous)
      }
    }
  }

  /// Undo a claim after a failed resume.
  pub(crate) fn release(&self, execution_id: &str, previous: GatewayState) {
    let mut cycles = self.lock();
    match previous {
      GatewayState::Idle => {
        cycles.states.remove(execution_id);
      }
      state => {
        cycles.states.insert(execution_id.to_string(), state);
      }
    }
  }

  /// Record a resume that did not go through a reply.
  pub(crate) fn resume_if_suspended(&self, execution_id: &str) {
    let mut cycles = self.lock();
    if cycles.states.get(execution_id) == Some(&GatewayState::Suspended) {
      Self::finish_locked(&mut cycles, execution_id, self.history);
    }
  }

  /// Number of executions the table holds an entry for.
  pub(crate) fn len(&self) -> usize {
    self.lock().states.len()
  }

  fn finish_locked(cycles: &mut Cycles, execution_id: &str, history: usize) {
    if history == 0 {
      cycles.states.remove(execution_id);
      return;
    }
    cycles
      .states
      .insert(execution_id.to_string(), GatewayState::Resumed);
    cycles.resumed.push_back(execution_id.to_string());

    while cycles.resumed.len() > history {
      let Some(oldest) = cycles.resumed.pop_front() else {
        break;
      };
      // Skip entries that were forgotten or reused since.
      if cycles.states.get(&oldest) == Some(&GatewayState::Resumed)
        && !cycles.resumed.contains(&oldest)
      {
        cycles.states.remove(&oldest);
      }
    }
  }

  fn lock(&self) -> MutexGuard<'_, Cycles> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  #[test]
  fn test_claim_is_exclusive() {
    let table = CycleTable::new(8);
    table.set("exe-1", GatewayState::Suspended);

    assert_eq!(table.claim("exe-1").unwrap(), GatewayState::Suspended);
    assert_eq!(table.get("exe-1"), GatewayState::Resuming);

    let err = table.claim("exe-1").unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateReply { .. }));
  }

  #[test]
  fn test_claim_after_resume_is_not_found() {
    let table = CycleTable::new(8);
    table.finish("exe-1");

    let err = table.claim("exe-1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn test_release_restores_previous_state() {
    let table = CycleTable::new(8);
    table.set("exe-1", GatewayState::Suspended);
    let previous = table.claim("exe-1").unwrap();
    table.release("exe-1", previous);
    assert_eq!(table.get("exe-1"), GatewayState::Suspended);

    let previous = table.claim("unknown").unwrap();
    table.release("unknown", previous);
    assert_eq!(table.get("unknown"), GatewayState::Idle);
  }

  #[test]
  fn test_resume_if_suspended_skips_claimed() {
    let table = CycleTable::new(8);
    table.set("exe-1", GatewayState::Suspended);
    table.set("exe-2", GatewayState::Resuming);

    table.resume_if_suspended("exe-1");
    table.resume_if_suspended("exe-2");
    table.resume_if_suspended("exe-3");

    assert_eq!(table.get("exe-1"), GatewayState::Resumed);
    assert_eq!(table.get("exe-2"), GatewayState::Resuming);
    assert_eq!(table.get("exe-3"), GatewayState::Idle);
  }

  #[test]
  fn test_resumed_history_is_bounded() {
    let table = CycleTable::new(4);
    for i in 0..100 {
      let id = format!("exe-{i}");
      table.set(&id, GatewayState::Suspended);
      table.claim(&id).unwrap();
      table.finish(&id);
    }

    assert_eq!(table.len(), 4);
    assert_eq!(table.get("exe-99"), GatewayState::Resumed);
    assert_eq!(table.get("exe-96"), GatewayState::Resumed);
    assert_eq!(table.get("exe-95"), GatewayState::Idle);
  }

  #[test]
  fn test_eviction_keeps_in_flight_cycles() {
    let table = CycleTable::new(1);
    table.set("parked", GatewayState::Suspended);
    table.finish("exe-1");
    table.finish("exe-2");

    assert_eq!(table.get("parked"), GatewayState::Suspended);
    assert_eq!(table.get("exe-1"), GatewayState::Idle);
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn test_zero_history_keeps_nothing() {
    let table = CycleTable::new(0);
    table.set("exe-1", GatewayState::Suspended);
    table.finish("exe-1");
    assert_eq!(table.get("exe-1"), GatewayState::Idle);
    assert_eq!(table.len(), 0);
  }
}
