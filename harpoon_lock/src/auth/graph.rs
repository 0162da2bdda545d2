//! The authentication state graph.
//!
//! States `0..L` form the key chain, state `L` is the unlock state and the
//! states above `L` form a decoy mesh. Key-chain edges carry one key digit
//! each; every other edge is a default edge taken on any symbol not matched
//! by a keyed edge of the same state. A wrong symbol on the chain leads into
//! the mesh, which only ever returns to state 0.

use std::collections::BTreeMap;
use std::fmt;

use contracts::requires;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State identifier.
pub type StateId = u32;

/// What part of the graph a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateRole {
    /// One of the states `0..L` the correct key walks through.
    KeyChain,
    /// State `L`, entered after the last key digit and never left.
    Unlock,
    /// A mesh state reached on a wrong digit, leading back to state 0.
    Decoy,
}

/// Condition under which a transition is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Exactly this input symbol.
    Key(u32),
    /// Any symbol no keyed edge of the state matches.
    Default,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(digit) => write!(f, "{digit}"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// One directed edge of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Source state.
    pub from: StateId,
    /// Destination state.
    pub to: StateId,
    /// Symbol that selects this edge.
    pub label: Label,
}

/// A generated key chain with its decoy mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGraph {
    alphabet: u32,
    key: Vec<u32>,
    roles: BTreeMap<StateId, StateRole>,
    edges: BTreeMap<StateId, Vec<Transition>>,
    decoys: Vec<StateId>,
}

impl AuthGraph {
    /// Builds a graph for a key of `key_length` digits drawn from `1..=alphabet`.
    ///
    /// The mesh holds one decoy reached from the last chain state plus
    /// between `ceil(L/2)` and `L` chained extras, the last of which returns
    /// to state 0. Every chain state before the last gets a default edge to a
    /// randomly chosen decoy.
    #[requires(key_length >= 1, "key must have at least one digit")]
    #[requires(alphabet >= 1, "alphabet must have at least one symbol")]
    #[requires(u32::try_from(key_length).is_ok_and(|l| l < u32::MAX / 3))]
    pub fn build<R>(key_length: usize, alphabet: u32, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut graph = Self {
            alphabet,
            key: Vec::with_capacity(key_length),
            roles: BTreeMap::new(),
            edges: BTreeMap::new(),
            decoys: Vec::new(),
        };
        let unlock = StateId::try_from(key_length).unwrap_or(StateId::MAX);

        for state in 0..unlock {
            let digit = rng.gen_range(1..=alphabet);
            graph.key.push(digit);
            graph.insert(state, StateRole::KeyChain);
            graph.link(state, state + 1, Label::Key(digit));
        }

        graph.insert(unlock, StateRole::Unlock);
        graph.link(unlock, unlock, Label::Default);

        let mut tail = unlock + 1;
        graph.insert(tail, StateRole::Decoy);
        graph.link(unlock - 1, tail, Label::Default);

        let extra = rng.gen_range(unlock.div_ceil(2)..=unlock);
        for _ in 0..extra {
            graph.link(tail, tail + 1, Label::Default);
            tail += 1;
            graph.insert(tail, StateRole::Decoy);
        }
        graph.link(tail, 0, Label::Default);

        for state in 0..unlock - 1 {
            if let Some(&target) = graph.decoys.choose(rng) {
                graph.link(state, target, Label::Default);
            }
        }

        debug!(
            "auth graph: {} key states, {} decoys, alphabet {}",
            unlock,
            graph.decoys.len(),
            alphabet
        );
        graph
    }

    fn insert(&mut self, state: StateId, role: StateRole) {
        self.roles.insert(state, role);
        if role == StateRole::Decoy {
            self.decoys.push(state);
        }
    }

    fn link(&mut self, from: StateId, to: StateId, label: Label) {
        self.edges
            .entry(from)
            .or_default()
            .push(Transition { from, to, label });
    }

    /// Key digits in the order they must be presented.
    #[must_use]
    pub fn key(&self) -> &[u32] {
        &self.key
    }

    #[must_use]
    pub fn key_length(&self) -> usize {
        self.key.len()
    }

    /// Largest symbol a key digit may take.
    #[must_use]
    pub const fn alphabet(&self) -> u32 {
        self.alphabet
    }

    #[must_use]
    pub const fn initial_state(&self) -> StateId {
        0
    }

    #[must_use]
    pub fn unlock_state(&self) -> StateId {
        StateId::try_from(self.key.len()).unwrap_or(StateId::MAX)
    }

    #[must_use]
    pub fn role(&self, state: StateId) -> Option<StateRole> {
        self.roles.get(&state).copied()
    }

    /// All states in ascending order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, StateRole)> + '_ {
        self.roles.iter().map(|(s, r)| (*s, *r))
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.roles.len()
    }

    /// Highest state identifier, which sizes the state register.
    #[must_use]
    pub fn max_state(&self) -> StateId {
        self.roles.keys().next_back().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn decoy_states(&self) -> &[StateId] {
        &self.decoys
    }

    /// Outgoing edges of `state`, keyed edges first.
    #[must_use]
    pub fn outgoing(&self, state: StateId) -> &[Transition] {
        self.edges.get(&state).map_or(&[], Vec::as_slice)
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.edges.values().flatten()
    }

    /// State reached from `state` on `symbol`, or `None` if `state` is unknown.
    #[must_use]
    pub fn next_state(&self, state: StateId, symbol: u32) -> Option<StateId> {
        let edges = self.outgoing(state);
        edges
            .iter()
            .find(|t| t.label == Label::Key(symbol))
            .or_else(|| edges.iter().find(|t| t.label == Label::Default))
            .map(|t| t.to)
    }

    /// Runs `symbols` from state 0 and returns the final state.
    #[must_use]
    pub fn walk(&self, symbols: &[u32]) -> StateId {
        symbols
            .iter()
            .try_fold(self.initial_state(), |state, symbol| self.next_state(state, *symbol))
            .unwrap_or(self.initial_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    fn graph(key_length: usize, alphabet: u32, seed: u64) -> AuthGraph {
        AuthGraph::build(key_length, alphabet, &mut StdRng::seed_from_u64(seed))
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 3)]
    #[case(3, 4)]
    #[case(5, 5)]
    #[case(8, 2)]
    fn structure(#[case] key_length: usize, #[case] alphabet: u32) {
        for seed in 0..16 {
            let g = graph(key_length, alphabet, seed);
            let l = g.unlock_state();

            assert_eq!(g.key_length(), key_length);
            assert!(g.key().iter().all(|d| (1..=alphabet).contains(d)));

            let extra = g.decoy_states().len() - 1;
            assert!(extra >= l.div_ceil(2) as usize && extra <= l as usize);
            assert_eq!(g.max_state(), l + g.decoy_states().len() as u32);
            assert_eq!(g.state_count(), 1 + l as usize + g.decoy_states().len());

            for (i, digit) in g.key().iter().enumerate() {
                let i = i as StateId;
                let out = g.outgoing(i);
                assert_eq!(out.len(), 2);
                assert_eq!(out[0], Transition { from: i, to: i + 1, label: Label::Key(*digit) });
                assert_eq!(out[1].label, Label::Default);
                assert_eq!(g.role(out[1].to), Some(StateRole::Decoy));
            }

            assert_eq!(
                g.outgoing(l),
                &[Transition { from: l, to: l, label: Label::Default }]
            );
            for decoy in g.decoy_states() {
                let out = g.outgoing(*decoy);
                assert_eq!(out.len(), 1);
                assert_eq!(out[0].label, Label::Default);
                assert!(out[0].to == 0 || g.role(out[0].to) == Some(StateRole::Decoy));
            }
        }
    }

    #[test]
    fn last_chain_state_feeds_the_first_decoy() {
        let g = graph(4, 3, 11);
        let out = g.outgoing(3);
        assert_eq!(out[1].to, 5);
        assert_eq!(g.decoy_states()[0], 5);
    }

    #[test]
    fn escape_edges_spread_over_the_whole_mesh() {
        let mut hit = std::collections::BTreeSet::new();
        let mut mesh = Vec::new();
        for seed in 0..64 {
            let g = graph(6, 3, seed);
            if mesh.is_empty() {
                mesh = g.decoy_states().to_vec();
            }
            if g.decoy_states() != mesh.as_slice() {
                continue;
            }
            for state in 0..g.unlock_state() - 1 {
                let escape = g.outgoing(state)[1].to;
                assert!(mesh.contains(&escape));
                hit.insert(escape);
            }
        }
        assert_eq!(hit.len(), mesh.len());
    }

    #[test]
    fn correct_key_reaches_unlock_and_stays() {
        let g = graph(5, 4, 1);
        let key = g.key().to_vec();
        assert_eq!(g.walk(&key), 5);

        let mut longer = key;
        longer.extend([1, 2, 3, 4, 4]);
        assert_eq!(g.walk(&longer), 5);
    }

    #[test]
    fn wrong_digit_leaves_the_chain() {
        let g = graph(3, 4, 2);
        for position in 0..3 {
            let mut symbols = g.key().to_vec();
            symbols[position] = if symbols[position] == 4 { 1 } else { symbols[position] + 1 };
            let end = g.walk(&symbols[..=position]);
            assert_eq!(g.role(end), Some(StateRole::Decoy));
        }
    }

    #[test]
    fn unknown_state_has_no_successor() {
        let g = graph(2, 2, 0);
        assert_eq!(g.next_state(100, 1), None);
        assert!(g.outgoing(100).is_empty());
    }

    #[test]
    fn label_display() {
        assert_eq!(Label::Key(3).to_string(), "3");
        assert_eq!(Label::Default.to_string(), "default");
    }
}
