use alloc::vec::Vec;

use crate::{clock::Timestamp, name::Name, packet::Interest};

/// Deadline increment applied when an interest leaves its lifetime
/// unspecified.
pub const DEFAULT_INTEREST_LIFETIME_MS: u64 = 4000;

/// One outstanding interest awaiting a reply or its deadline.
///
/// The callback type parameters are opaque to the table; the owner
/// decides what a callback is and when to run it. Entries are handed
/// back whole so the caller can move the callbacks out before invoking
/// them.
pub struct PendingInterest<D, O> {
    pub(crate) id: u64,
    pub(crate) interest: Interest,
    pub(crate) on_data: Option<D>,
    pub(crate) on_timeout: Option<O>,
    pub(crate) deadline: Timestamp,
}

impl<D, O> PendingInterest<D, O> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn interest(&self) -> &Interest {
        &self.interest
    }

    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }
}

/// Insertion-ordered table of outstanding interests.
pub struct PendingInterestTable<D, O> {
    entries: Vec<PendingInterest<D, O>>,
    last_id: u64,
}

impl<D, O> PendingInterestTable<D, O> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_id: 0,
        }
    }

    /// Appends a new entry and returns its id. The deadline is `now`
    /// plus the interest lifetime, or plus the default when the
    /// lifetime is unspecified.
    pub fn insert(
        &mut self,
        interest: Interest,
        on_data: Option<D>,
        on_timeout: Option<O>,
        now: Timestamp,
    ) -> u64 {
        self.last_id += 1;
        let id = self.last_id;
        let deadline = now.adding(
            interest
                .lifetime_ms
                .unwrap_or(DEFAULT_INTEREST_LIFETIME_MS),
        );
        self.entries.push(PendingInterest {
            id,
            interest,
            on_data,
            on_timeout,
            deadline,
        });
        id
    }

    /// Removes every entry with this id (normally one). Silent when
    /// nothing matches, so cancellation is idempotent.
    pub fn remove_by_id(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// Removes and returns the first entry, in insertion order, whose
    /// interest matches `data_name`.
    pub fn take_match(&mut self, data_name: &Name) -> Option<PendingInterest<D, O>> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.interest.matches_name(data_name))?;
        Some(self.entries.remove(index))
    }

    /// Removes and returns every entry whose deadline has passed,
    /// preserving insertion order.
    pub fn sweep_expired(&mut self, now: Timestamp) -> Vec<PendingInterest<D, O>> {
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.entries.len() {
            if self.entries[index].deadline <= now {
                expired.push(self.entries.remove(index));
            } else {
                index += 1;
            }
        }
        expired
    }

    /// Like [`sweep_expired`](Self::sweep_expired) but removes one entry
    /// at a time and skips entries with an id above `id_bound`, so
    /// entries inserted from timeout callbacks are left for a later
    /// tick.
    pub fn take_first_expired(
        &mut self,
        now: Timestamp,
        id_bound: u64,
    ) -> Option<PendingInterest<D, O>> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id <= id_bound && entry.deadline <= now)?;
        Some(self.entries.remove(index))
    }

    /// Drops every entry without firing anything. The id counter keeps
    /// its value so ids are never reused.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn last_issued_id(&self) -> u64 {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<D, O> Default for PendingInterestTable<D, O> {
    fn default() -> Self {
        Self::new()
    }
}

/// One prefix the application answers interests for.
pub struct RegisteredPrefix<F> {
    pub(crate) id: u64,
    pub(crate) prefix: Name,
    // Taken out for the duration of a handler invocation.
    pub(crate) on_interest: Option<F>,
}

impl<F> RegisteredPrefix<F> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }
}

/// Insertion-ordered table of registered prefixes.
///
/// Ids are allocated from a counter separate from the pending-interest
/// table, and may be handed out before the entry itself is inserted
/// (registration reserves the id while the forwarder handshake is still
/// in flight).
pub struct RegisteredPrefixTable<F> {
    entries: Vec<RegisteredPrefix<F>>,
    last_id: u64,
}

impl<F> RegisteredPrefixTable<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_id: 0,
        }
    }

    pub fn allocate_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn insert_with_id(&mut self, id: u64, prefix: Name, on_interest: F) {
        self.entries.push(RegisteredPrefix {
            id,
            prefix,
            on_interest: Some(on_interest),
        });
    }

    pub fn insert(&mut self, prefix: Name, on_interest: F) -> u64 {
        let id = self.allocate_id();
        self.insert_with_id(id, prefix, on_interest);
        id
    }

    pub fn remove_by_id(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// The entry whose prefix matches `name` with the most components.
    /// Ties go to the earliest-inserted entry.
    pub fn longest_match(&self, name: &Name) -> Option<&RegisteredPrefix<F>> {
        let mut best: Option<&RegisteredPrefix<F>> = None;
        for entry in &self.entries {
            if !entry.prefix.is_prefix_of(name) {
                continue;
            }
            match best {
                Some(current) if entry.prefix.len() <= current.prefix.len() => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    /// Moves the handler out of the entry for invocation, together with
    /// a copy of the prefix for the callback arguments. Returns `None`
    /// if the entry is gone or its handler is already out.
    pub fn take_handler(&mut self, id: u64) -> Option<(Name, F)> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        let handler = entry.on_interest.take()?;
        Some((entry.prefix.clone(), handler))
    }

    /// Puts a handler back after invocation. A no-op if the entry was
    /// removed while the handler ran.
    pub fn restore_handler(&mut self, id: u64, handler: F) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            if entry.on_interest.is_none() {
                entry.on_interest = Some(handler);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Default for RegisteredPrefixTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Interest;
    use alloc::vec;
    use proptest::prelude::*;

    type Pit = PendingInterestTable<(), ()>;
    type Rpt = RegisteredPrefixTable<u32>;

    fn at(ms: u64) -> Timestamp {
        Timestamp { ms_since_1970: ms }
    }

    fn interest(uri: &str, lifetime_ms: Option<u64>) -> Interest {
        let mut interest = Interest::new(Name::from_uri(uri).unwrap());
        interest.lifetime_ms = lifetime_ms;
        interest
    }

    #[test]
    fn test_pit_deadlines() {
        let mut pit = Pit::new();
        let id = pit.insert(interest("/a", Some(150)), None, None, at(1000));
        assert_eq!(id, 1);
        assert!(pit.sweep_expired(at(1149)).is_empty());
        let expired = pit.sweep_expired(at(1150));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), 1);
        assert!(pit.is_empty());

        // Unspecified lifetime falls back to the default.
        pit.insert(interest("/a", None), None, None, at(1000));
        assert!(pit.sweep_expired(at(1000 + DEFAULT_INTEREST_LIFETIME_MS - 1)).is_empty());
        assert_eq!(pit.sweep_expired(at(1000 + DEFAULT_INTEREST_LIFETIME_MS)).len(), 1);
    }

    #[test]
    fn test_pit_ids_monotonic() {
        let mut pit = Pit::new();
        let a = pit.insert(interest("/a", None), None, None, at(0));
        let b = pit.insert(interest("/b", None), None, None, at(0));
        pit.remove_by_id(a);
        let c = pit.insert(interest("/c", None), None, None, at(0));
        assert!(a < b && b < c);
        // Removal is silent when the id is unknown or already gone.
        pit.remove_by_id(a);
        pit.remove_by_id(999);
        assert_eq!(pit.len(), 2);
    }

    #[test]
    fn test_pit_take_match_order() {
        let mut pit = Pit::new();
        let first = pit.insert(interest("/a", None), None, None, at(0));
        let second = pit.insert(interest("/a", None), None, None, at(0));

        let name = Name::from_uri("/a/b").unwrap();
        let taken = pit.take_match(&name).unwrap();
        assert_eq!(taken.id(), first);
        let taken = pit.take_match(&name).unwrap();
        assert_eq!(taken.id(), second);
        assert!(pit.take_match(&name).is_none());
    }

    #[test]
    fn test_pit_match_is_prefix_match() {
        let mut pit = Pit::new();
        pit.insert(interest("/a/b", None), None, None, at(0));
        assert!(pit.take_match(&Name::from_uri("/a").unwrap()).is_none());
        assert!(pit.take_match(&Name::from_uri("/a/x").unwrap()).is_none());
        assert!(pit.take_match(&Name::from_uri("/a/b/c").unwrap()).is_some());
    }

    #[test]
    fn test_pit_sweep_preserves_order() {
        let mut pit = Pit::new();
        pit.insert(interest("/a", Some(100)), None, None, at(0));
        pit.insert(interest("/b", Some(500)), None, None, at(0));
        pit.insert(interest("/c", Some(50)), None, None, at(0));

        let expired = pit.sweep_expired(at(200));
        let ids: Vec<u64> = expired.iter().map(|entry| entry.id()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_pit_take_first_expired_honors_bound() {
        let mut pit = Pit::new();
        pit.insert(interest("/a", Some(10)), None, None, at(0));
        let bound = pit.last_issued_id();
        pit.insert(interest("/b", Some(10)), None, None, at(0));

        let taken = pit.take_first_expired(at(100), bound).unwrap();
        assert_eq!(taken.id(), 1);
        assert!(pit.take_first_expired(at(100), bound).is_none());
        assert_eq!(pit.len(), 1);
    }

    #[test]
    fn test_rpt_longest_match() {
        let mut rpt = Rpt::new();
        let a = rpt.insert(Name::from_uri("/a").unwrap(), 1);
        let ab = rpt.insert(Name::from_uri("/a/b").unwrap(), 2);

        let hit = rpt.longest_match(&Name::from_uri("/a/b/c").unwrap()).unwrap();
        assert_eq!(hit.id(), ab);
        let hit = rpt.longest_match(&Name::from_uri("/a/x").unwrap()).unwrap();
        assert_eq!(hit.id(), a);
        assert!(rpt.longest_match(&Name::from_uri("/q").unwrap()).is_none());
    }

    #[test]
    fn test_rpt_tie_break_is_earliest() {
        let mut rpt = Rpt::new();
        let first = rpt.insert(Name::from_uri("/a").unwrap(), 1);
        let _second = rpt.insert(Name::from_uri("/a").unwrap(), 2);
        let hit = rpt.longest_match(&Name::from_uri("/a/b").unwrap()).unwrap();
        assert_eq!(hit.id(), first);
    }

    #[test]
    fn test_rpt_take_restore_handler() {
        let mut rpt = Rpt::new();
        let id = rpt.insert(Name::from_uri("/a").unwrap(), 42);

        let (prefix, handler) = rpt.take_handler(id).unwrap();
        assert_eq!(prefix, Name::from_uri("/a").unwrap());
        assert_eq!(handler, 42);
        // While the handler is out, it cannot be taken again.
        assert!(rpt.take_handler(id).is_none());
        rpt.restore_handler(id, handler);
        assert!(rpt.take_handler(id).is_some());

        // Restoring after removal is a no-op.
        rpt.restore_handler(id, 42);
        rpt.remove_by_id(id);
        rpt.restore_handler(id, 42);
        assert!(rpt.is_empty());
    }

    fn arb_small_name() -> impl Strategy<Value = Name> {
        proptest::collection::vec(0u8..3, 0..4).prop_map(|comps| {
            let mut name = Name::new();
            for c in comps {
                name.append(&[c]);
            }
            name
        })
    }

    proptest! {
        #[test]
        fn prop_pit_ids_unique(ops in proptest::collection::vec((0u8..3, 0u64..2000), 1..40)) {
            let mut pit = Pit::new();
            let mut seen = vec![];
            for (op, arg) in ops {
                match op {
                    0 => {
                        let id = pit.insert(interest("/p", Some(arg)), None, None, at(arg));
                        prop_assert!(!seen.contains(&id));
                        seen.push(id);
                    }
                    1 => pit.remove_by_id(arg % 50),
                    _ => { let _ = pit.sweep_expired(at(arg)); }
                }
            }
        }

        #[test]
        fn prop_timer_monotonicity(lifetimes in proptest::collection::vec(0u64..500, 1..20), sweep_at in 0u64..1000) {
            let mut pit = Pit::new();
            let base = at(100);
            for lifetime in &lifetimes {
                pit.insert(interest("/p", Some(*lifetime)), None, None, base);
            }
            let now = at(100 + sweep_at);
            let expired = pit.sweep_expired(now);
            // Nothing fires before its deadline...
            for entry in &expired {
                prop_assert!(entry.deadline() <= now);
            }
            // ...and nothing due survives the sweep.
            prop_assert!(pit.take_first_expired(now, u64::MAX).is_none());
            prop_assert_eq!(expired.len() + pit.len(), lifetimes.len());
        }

        #[test]
        fn prop_longest_match_deterministic(prefixes in proptest::collection::vec(arb_small_name(), 0..12), name in arb_small_name()) {
            let mut rpt = Rpt::new();
            for (index, prefix) in prefixes.iter().enumerate() {
                rpt.insert(prefix.clone(), index as u32);
            }

            // Reference answer: maximum matching prefix length, first wins.
            let mut expected: Option<(usize, usize)> = None; // (index, len)
            for (index, prefix) in prefixes.iter().enumerate() {
                if prefix.is_prefix_of(&name) {
                    let longer = match expected {
                        Some((_, len)) => prefix.len() > len,
                        None => true,
                    };
                    if longer {
                        expected = Some((index, prefix.len()));
                    }
                }
            }

            let actual = rpt.longest_match(&name).map(|entry| entry.id());
            prop_assert_eq!(actual, expected.map(|(index, _)| index as u64 + 1));
        }
    }
}
