//! The jukebox queue.
//!
//! Players wish for maps; the wishes are played in order once the current
//! match ends. Consumption lives in [`JukeboxPlugin`](crate::builtin::JukeboxPlugin).

use std::collections::VecDeque;

use podium_core::{MapInfo, PlayerInfo};

/// A map wished for by a player.
#[derive(Debug, Clone, PartialEq)]
pub struct JukeboxEntry {
    pub map: MapInfo,
    /// The player who asked for the map.
    pub player: PlayerInfo,
}

/// Ordered wish-list of upcoming maps, consumed from the front.
#[derive(Debug, Clone, Default)]
pub struct Jukebox {
    entries: VecDeque<JukeboxEntry>,
}

impl Jukebox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wish to the back of the queue.
    pub fn queue_map(&mut self, map: MapInfo, player: PlayerInfo) {
        self.entries.push_back(JukeboxEntry { map, player });
    }

    /// Inserts a wish at the front of the queue.
    pub fn priority_add(&mut self, map: MapInfo, player: PlayerInfo) {
        self.entries.push_front(JukeboxEntry { map, player });
    }

    /// Removes and returns the front entry.
    pub fn unqueue_map(&mut self) -> Option<JukeboxEntry> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Entries in play order.
    pub fn entries(&self) -> impl Iterator<Item = &JukeboxEntry> {
        self.entries.iter()
    }

    pub fn contains_map(&self, uid: &str) -> bool {
        self.entries.iter().any(|e| e.map.uid == uid)
    }

    /// Moves the queued entry for `uid` to the front. Returns `false` when the
    /// map is not queued.
    pub fn promote(&mut self, uid: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.map.uid == uid) else {
            return false;
        };
        if let Some(entry) = self.entries.remove(index) {
            self.entries.push_front(entry);
        }
        true
    }

    /// Puts a popped entry back at the front, keeping its requester.
    pub fn requeue_front(&mut self, entry: JukeboxEntry) {
        self.entries.push_front(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(uid: &str) -> MapInfo {
        MapInfo::new(uid, uid, format!("{uid}.Map.Gbx"))
    }

    #[test]
    fn test_empty_unqueue() {
        let mut jukebox = Jukebox::new();
        assert!(jukebox.is_empty());
        assert_eq!(jukebox.unqueue_map(), None);
    }

    #[test]
    fn test_fifo_order() {
        let mut jukebox = Jukebox::new();
        jukebox.queue_map(map("a"), PlayerInfo::from_login("p1"));
        jukebox.queue_map(map("b"), PlayerInfo::from_login("p2"));
        assert_eq!(jukebox.len(), 2);
        assert_eq!(jukebox.unqueue_map().unwrap().map.uid, "a");
        assert_eq!(jukebox.unqueue_map().unwrap().map.uid, "b");
        assert!(jukebox.is_empty());
    }

    #[test]
    fn test_priority_add_goes_first() {
        let mut jukebox = Jukebox::new();
        jukebox.queue_map(map("a"), PlayerInfo::from_login("p1"));
        jukebox.queue_map(map("b"), PlayerInfo::from_login("p2"));
        jukebox.priority_add(map("vip"), PlayerInfo::from_login("admin"));

        let first = jukebox.unqueue_map().unwrap();
        assert_eq!(first.map.uid, "vip");
        assert_eq!(first.player.login, "admin");
        assert_eq!(
            jukebox.entries().map(|e| e.map.uid.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_promote_moves_existing_entry() {
        let mut jukebox = Jukebox::new();
        jukebox.queue_map(map("a"), PlayerInfo::from_login("p1"));
        jukebox.queue_map(map("b"), PlayerInfo::from_login("p2"));
        jukebox.queue_map(map("c"), PlayerInfo::from_login("p3"));

        assert!(jukebox.promote("c"));
        assert!(!jukebox.promote("zz"));
        assert_eq!(
            jukebox.entries().map(|e| e.map.uid.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
        assert_eq!(jukebox.unqueue_map().unwrap().player.login, "p3");
    }

    #[test]
    fn test_reset() {
        let mut jukebox = Jukebox::new();
        jukebox.queue_map(map("a"), PlayerInfo::from_login("p1"));
        assert!(jukebox.contains_map("a"));
        jukebox.reset();
        assert!(jukebox.is_empty());
        assert!(!jukebox.contains_map("a"));
    }
}
