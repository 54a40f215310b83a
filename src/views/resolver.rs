//! Many-to-many resolution.
//!
//! Indexes are built once per fetch cycle and shared by every entity resolved
//! in that cycle, so resolving all events is linear in the table sizes.

use std::collections::{HashMap, HashSet};

/// Domain id → display name, built from a referenced table.
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    names: HashMap<i64, String>,
}

impl NameIndex {
    /// Blank names are skipped; the first name seen for an id wins.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: AsRef<str>,
    {
        let mut names = HashMap::new();
        for (id, name) in entries {
            let name = name.as_ref().trim();
            if !name.is_empty() {
                names.entry(id).or_insert_with(|| name.to_string());
            }
        }
        Self { names }
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Owner id → ordered, duplicate-free target ids, built from a join table.
#[derive(Debug, Default, Clone)]
pub struct LinkIndex {
    links: HashMap<i64, Vec<i64>>,
}

impl LinkIndex {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut seen = HashSet::new();
        for (owner, target) in pairs {
            if seen.insert((owner, target)) {
                links.entry(owner).or_default().push(target);
            }
        }
        Self { links }
    }

    pub fn targets(&self, owner: i64) -> &[i64] {
        self.links.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Same links, target → owners. Owners come out in ascending id order.
    pub fn inverted(&self) -> LinkIndex {
        let mut owners: Vec<&i64> = self.links.keys().collect();
        owners.sort();
        LinkIndex::from_pairs(owners.into_iter().flat_map(|owner| {
            self.links[owner].iter().map(move |target| (*target, *owner))
        }))
    }
}

/// Names linked to `owner`, in link order. Ids with no entry in `names`
/// (rows deleted behind the join table's back) are dropped.
pub fn resolve_names(links: &LinkIndex, owner: i64, names: &NameIndex) -> Vec<String> {
    sanitize_names(links.targets(owner).iter().map(|id| names.get(*id)))
}

/// Ids linked to `owner` that exist in `names`.
pub fn resolve_ids(links: &LinkIndex, owner: i64, names: &NameIndex) -> Vec<i64> {
    links
        .targets(owner)
        .iter()
        .copied()
        .filter(|id| names.get(*id).is_some())
        .collect()
}

/// Trim, drop null and blank entries, and drop repeats (case-insensitive),
/// keeping the first spelling.
pub fn sanitize_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names.into_iter().flatten() {
        let name = name.as_ref().trim();
        if !name.is_empty() && seen.insert(name_key(name)) {
            out.push(name.to_string());
        }
    }
    out
}

/// Key used to match speaker names typed on event rows against the
/// `speakers` table.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
