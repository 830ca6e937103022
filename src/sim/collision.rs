//! Host-reported contacts
//!
//! Overlap detection belongs to the host. It reports each touching pair;
//! the engine queues them and resolves the queue once per tick in a stable
//! order so the outcome never depends on the order the host reported them.

use super::state::EntityId;

/// An unordered pair of touching entities (stored as `a < b`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
}

impl Contact {
    /// Normalized pair; `None` for an entity touching itself
    pub fn new(x: EntityId, y: EntityId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// The other side of the pair, if `id` is in it
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Sort by creation order and drop duplicate reports of the same pair
pub fn order_contacts(contacts: &mut Vec<Contact>) {
    contacts.sort_unstable();
    contacts.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_is_unordered() {
        assert_eq!(Contact::new(5, 2), Contact::new(2, 5));
        assert!(Contact::new(3, 3).is_none());
        let c = Contact::new(9, 4).unwrap();
        assert_eq!(c.other(4), Some(9));
        assert_eq!(c.other(9), Some(4));
        assert_eq!(c.other(1), None);
        assert!(c.involves(9));
    }

    #[test]
    fn test_order_contacts_is_stable_and_deduped() {
        let mut first: Vec<Contact> = [(1, 7), (1, 3), (3, 1), (2, 5)]
            .into_iter()
            .filter_map(|(x, y)| Contact::new(x, y))
            .collect();
        let mut second: Vec<Contact> = [(5, 2), (3, 1), (7, 1)]
            .into_iter()
            .filter_map(|(x, y)| Contact::new(x, y))
            .collect();
        order_contacts(&mut first);
        order_contacts(&mut second);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], Contact { a: 1, b: 3 });
    }
}
