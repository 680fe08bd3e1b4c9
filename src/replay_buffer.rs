use std::collections::VecDeque;

use rand::Rng;
use thiserror::Error;

/// One labelled step: (state, action, reward, next state, terminal) plus the
/// legality masks on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
    pub action_mask: Vec<bool>,
    pub next_action_mask: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot sample {requested} transitions from a buffer holding {available}")]
pub struct SampleError {
    pub requested: usize,
    pub available: usize,
}

/// Bounded FIFO of transitions; pushing onto a full buffer evicts the oldest.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            transitions: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// Uniform sample of distinct transitions.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Vec<&Transition>, SampleError> {
        if batch_size > self.transitions.len() {
            return Err(SampleError {
                requested: batch_size,
                available: self.transitions.len(),
            });
        }
        Ok(
            rand::seq::index::sample(rng, self.transitions.len(), batch_size)
                .into_iter()
                .map(|index| &self.transitions[index])
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn transition(action: usize) -> Transition {
        Transition {
            state: vec![action as f32],
            action,
            reward: 0.0,
            next_state: vec![],
            done: false,
            action_mask: vec![true],
            next_action_mask: vec![true],
        }
    }

    #[test]
    fn grows_on_demand() {
        let mut buffer = ReplayBuffer::new(100_000);
        assert_eq!(buffer.transitions.capacity(), 0);
        buffer.push(transition(0));
        assert!(buffer.transitions.capacity() < buffer.capacity());
    }

    #[test]
    fn keeps_most_recent_when_full() {
        let mut buffer = ReplayBuffer::new(4);
        for action in 0..7 {
            buffer.push(transition(action));
        }
        assert_eq!(buffer.len(), 4);
        let kept: Vec<usize> = buffer.iter().map(|t| t.action).collect();
        assert_eq!(kept, vec![3, 4, 5, 6]);
    }

    #[test]
    fn samples_distinct_transitions() {
        let mut buffer = ReplayBuffer::new(16);
        for action in 0..10 {
            buffer.push(transition(action));
        }
        let mut rng = StdRng::seed_from_u64(1);
        let batch = buffer.sample(10, &mut rng).unwrap();
        let actions: HashSet<usize> = batch.iter().map(|t| t.action).collect();
        assert_eq!(actions.len(), 10);
    }

    #[test]
    fn oversized_sample_is_an_error() {
        let mut buffer = ReplayBuffer::new(8);
        buffer.push(transition(0));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            buffer.sample(2, &mut rng).unwrap_err(),
            SampleError {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn concurrent_writers_behind_a_lock() {
        let buffer = Mutex::new(ReplayBuffer::new(100));
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let buffer = &buffer;
                scope.spawn(move || {
                    for step in 0..10 {
                        buffer.lock().unwrap().push(transition(worker * 10 + step));
                    }
                });
            }
        });
        assert_eq!(buffer.into_inner().unwrap().len(), 40);
    }
}
