/// Maximum number of lines the recall ring retains.
const MAX_ENTRIES: usize = 10;

/// Where the next "previous" recall will read from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BrowsePos {
    /// Recall starts (or continues) at this slot.
    At(usize),
    /// Browsing walked past the oldest retained entry; further "previous"
    /// recalls return nothing until the state is reset by an `add`.
    Exhausted,
}

/// Fixed-capacity ring of recent command lines with a browsing cursor.
///
/// `tail` is the slot of the newest entry. The browsing cursor and
/// `last_returned` together drive up/down recall: `prev` walks backward from
/// the cursor, `next` walks forward from the entry most recently handed out.
/// The two sentinels are deliberately distinct — an exhausted cursor makes
/// further `prev` calls a no-op, while a cleared `last_returned` makes `next`
/// report "already at the newest line" so the caller can clear its buffer.
pub struct History {
    entries: [Option<String>; MAX_ENTRIES],
    tail: Option<usize>,
    cursor: BrowsePos,
    last_returned: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        History {
            entries: Default::default(),
            tail: None,
            cursor: BrowsePos::Exhausted,
            last_returned: None,
        }
    }

    /// Record a submitted line as the newest entry.
    ///
    /// Lines that are empty after trimming are ignored. A line equal to the
    /// newest stored entry is not stored again, but still resets the
    /// browsing state so the next "previous" recall starts from the newest
    /// entry. The oldest entry is overwritten once the ring is full.
    pub fn add(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(tail) = self.tail {
            if self.entries[tail].as_deref() == Some(line) {
                self.cursor = BrowsePos::At(tail);
                self.last_returned = None;
                return;
            }
        }

        let slot = match self.tail {
            Some(tail) => (tail + 1) % MAX_ENTRIES,
            None => 0,
        };
        // Reuse the slot's allocation when overwriting an evicted entry.
        match &mut self.entries[slot] {
            Some(existing) => {
                existing.clear();
                existing.push_str(line);
            }
            vacant => *vacant = Some(line.to_string()),
        }

        self.tail = Some(slot);
        self.cursor = BrowsePos::At(slot);
        self.last_returned = None;
    }

    /// Recall the next-older entry, or `None` when the history is empty or
    /// browsing already reached the oldest retained line. On `None` the
    /// caller leaves its buffer untouched.
    pub fn prev(&mut self) -> Option<&str> {
        let tail = self.tail?;
        let BrowsePos::At(cur) = self.cursor else {
            return None;
        };

        self.last_returned = Some(cur);

        let back = (cur + MAX_ENTRIES - 1) % MAX_ENTRIES;
        if back == tail || self.entries[back].is_none() {
            self.cursor = BrowsePos::Exhausted;
        } else {
            self.cursor = BrowsePos::At(back);
        }

        self.entries[cur].as_deref()
    }

    /// Recall the next-newer entry relative to the last recall.
    ///
    /// Returns `None` when no recall is in progress or the walk stepped past
    /// the newest entry; in that case browsing resets to the newest state and
    /// the caller should clear its buffer.
    pub fn next(&mut self) -> Option<&str> {
        let tail = self.tail?;
        let last = self.last_returned?;

        let ahead = (last + 1) % MAX_ENTRIES;
        if ahead == (tail + 1) % MAX_ENTRIES || self.entries[ahead].is_none() {
            self.cursor = BrowsePos::At(tail);
            self.last_returned = None;
            return None;
        }

        self.cursor = BrowsePos::At(last);
        self.last_returned = Some(ahead);
        self.entries[ahead].as_deref()
    }

    /// The newest entry, without touching the browsing state.
    pub fn peek_last(&self) -> Option<&str> {
        self.entries[self.tail?].as_deref()
    }

    /// Number of retained entries.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(entries: &[&str]) -> History {
        let mut h = History::new();
        for e in entries {
            h.add(e);
        }
        h
    }

    #[test]
    fn empty_history_recalls_nothing() {
        let mut h = History::new();
        assert_eq!(h.prev(), None);
        assert_eq!(h.next(), None);
        assert_eq!(h.peek_last(), None);
    }

    #[test]
    fn blank_lines_are_not_stored() {
        let mut h = History::new();
        h.add("");
        h.add("   ");
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut h = History::new();
        h.add("ls");
        h.add("ls");
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn non_consecutive_duplicates_are_kept() {
        let h = history_with(&["ls", "pwd", "ls"]);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn duplicate_add_resets_browsing() {
        let mut h = history_with(&["one", "two"]);
        assert_eq!(h.prev(), Some("two"));
        assert_eq!(h.prev(), Some("one"));
        // Re-submitting the newest line stores nothing but restarts recall
        // from the newest entry.
        h.add("two");
        assert_eq!(h.len(), 2);
        assert_eq!(h.prev(), Some("two"));
    }

    #[test]
    fn prev_walks_newest_to_oldest_then_stops() {
        let mut h = history_with(&["one", "two", "three"]);
        assert_eq!(h.prev(), Some("three"));
        assert_eq!(h.prev(), Some("two"));
        assert_eq!(h.prev(), Some("one"));
        assert_eq!(h.prev(), None);
        assert_eq!(h.prev(), None);
    }

    #[test]
    fn up_then_down_round_trips() {
        let mut h = history_with(&["one", "two", "three"]);
        assert_eq!(h.prev(), Some("three"));
        assert_eq!(h.prev(), Some("two"));
        assert_eq!(h.next(), Some("three"));
        // Stepping past the newest entry reports "clear the line"...
        assert_eq!(h.next(), None);
        // ...and recall restarts from the newest entry.
        assert_eq!(h.prev(), Some("three"));
    }

    #[test]
    fn next_without_prior_prev_reports_newest() {
        let mut h = history_with(&["one", "two"]);
        assert_eq!(h.next(), None);
    }

    #[test]
    fn peek_last_does_not_disturb_browsing() {
        let mut h = history_with(&["one", "two"]);
        assert_eq!(h.prev(), Some("two"));
        assert_eq!(h.peek_last(), Some("two"));
        assert_eq!(h.prev(), Some("one"));
    }

    #[test]
    fn ring_evicts_oldest_entry() {
        let mut h = History::new();
        for i in 1..=MAX_ENTRIES + 1 {
            h.add(&format!("cmd-{i}"));
        }
        assert_eq!(h.len(), MAX_ENTRIES);
        assert_eq!(h.peek_last(), Some(format!("cmd-{}", MAX_ENTRIES + 1).as_str()));

        // Walking all the way back never reaches the evicted first entry.
        let mut seen = Vec::new();
        while let Some(entry) = h.prev() {
            seen.push(entry.to_string());
        }
        assert_eq!(seen.len(), MAX_ENTRIES);
        assert!(!seen.contains(&"cmd-1".to_string()));
    }
}
