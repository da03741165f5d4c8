use std::collections::BTreeMap;

use crate::status::derive_status;
use crate::{KeywordSpec, KeywordStatus, NetworkEvent};

/// Events matched by one keyword, as positions into the log they were computed from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordMatch {
    positions: Vec<usize>,
    status: KeywordStatus,
}

impl KeywordMatch {
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn status(&self) -> KeywordStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Resolves the matched events against the log the index was built from.
    pub fn events<'a>(&'a self, log: &'a [NetworkEvent]) -> impl Iterator<Item = &'a NetworkEvent> + 'a {
        self.positions.iter().filter_map(move |&pos| log.get(pos))
    }
}

/// Keyword text -> matched events and status. Rebuilt wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordMatchIndex {
    matches: BTreeMap<String, KeywordMatch>,
}

impl KeywordMatchIndex {
    pub fn get(&self, keyword_text: &str) -> Option<&KeywordMatch> {
        self.matches.get(keyword_text)
    }

    /// Status for `keyword_text`; unknown keywords are `Standby`.
    pub fn status_of(&self, keyword_text: &str) -> KeywordStatus {
        self.matches
            .get(keyword_text)
            .map(KeywordMatch::status)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordMatch)> {
        self.matches.iter().map(|(text, m)| (text.as_str(), m))
    }
}

/// Matches every keyword against every event.
///
/// An event matches when the keyword text is a non-empty, case-sensitive
/// substring of its resource name. Language and sequence play no part here.
/// Keywords sharing a text share one entry.
pub fn recompute(events: &[NetworkEvent], keywords: &[KeywordSpec]) -> KeywordMatchIndex {
    let mut matches = BTreeMap::new();
    for keyword in keywords {
        if matches.contains_key(&keyword.text) {
            continue;
        }
        let positions: Vec<usize> = if keyword.text.is_empty() {
            Vec::new()
        } else {
            events
                .iter()
                .enumerate()
                .filter(|(_, event)| event.resource_name.contains(keyword.text.as_str()))
                .map(|(pos, _)| pos)
                .collect()
        };
        let status = derive_status(positions.iter().filter_map(|&pos| events.get(pos)));
        matches.insert(keyword.text.clone(), KeywordMatch { positions, status });
    }
    KeywordMatchIndex { matches }
}
