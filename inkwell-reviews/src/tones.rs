use std::collections::{BTreeMap, HashMap, HashSet};

use inkwell_common::{bail, models::Tone, Report};

/// Tones arranged by parent.
///
/// Construction fails unless the tones form a forest: ids and names are
/// unique, every parent exists and no tone is its own ancestor.
#[derive(Debug)]
pub struct ToneTree {
    tones: BTreeMap<i64, Tone>,
    children: HashMap<i64, Vec<i64>>,
}

impl ToneTree {
    pub fn new(tones: Vec<Tone>) -> Result<Self, Report> {
        let mut by_id = BTreeMap::new();
        let mut names = HashSet::new();

        for tone in tones {
            if !names.insert(tone.name.clone()) {
                bail!("duplicate tone name `{}`", tone.name);
            }

            if let Some(existing) = by_id.insert(tone.id, tone) {
                bail!("duplicate tone id {}", existing.id);
            }
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

        for tone in by_id.values() {
            if let Some(parent_id) = tone.parent_id {
                if !by_id.contains_key(&parent_id) {
                    bail!("tone `{}` has unknown parent {}", tone.name, parent_id);
                }

                children.entry(parent_id).or_default().push(tone.id);
            }
        }

        for tone in by_id.values() {
            let mut seen = HashSet::from([tone.id]);
            let mut current = tone.parent_id;

            while let Some(parent_id) = current {
                if !seen.insert(parent_id) {
                    bail!("tone `{}` is part of a parent cycle", tone.name);
                }

                current = by_id.get(&parent_id).and_then(|parent| parent.parent_id);
            }
        }

        for ids in children.values_mut() {
            ids.sort_by(|a, b| by_id[a].name.cmp(&by_id[b].name));
        }

        Ok(Self {
            tones: by_id,
            children,
        })
    }

    pub fn get(&self, id: i64) -> Option<&Tone> {
        self.tones.get(&id)
    }

    pub fn roots(&self) -> Vec<&Tone> {
        let mut roots = self
            .tones
            .values()
            .filter(|tone| tone.parent_id.is_none())
            .collect::<Vec<_>>();

        roots.sort_by(|a, b| a.name.cmp(&b.name));

        roots
    }

    pub fn subtones(&self, id: i64) -> Vec<&Tone> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|id| self.tones.get(id)).collect())
            .unwrap_or_default()
    }

    /// Parent first, root last.
    pub fn ancestors(&self, id: i64) -> Vec<&Tone> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id).and_then(|tone| tone.parent_id);

        while let Some(parent) = current.and_then(|parent_id| self.get(parent_id)) {
            ancestors.push(parent);
            current = parent.parent_id;
        }

        ancestors
    }

    /// Refuses to remove a tone that still has subtones.
    pub fn ensure_removable(&self, id: i64) -> Result<(), Report> {
        let tone = match self.get(id) {
            Some(tone) => tone,
            None => bail!("unknown tone {}", id),
        };

        let subtones = self.subtones(id);
        if !subtones.is_empty() {
            bail!(
                "tone `{}` still has {} subtone(s) and cannot be removed",
                tone.name,
                subtones.len()
            );
        }

        Ok(())
    }

    /// Looks up the tones to assign to a review, dropping repeats.
    pub fn resolve(&self, ids: &[i64]) -> Result<Vec<Tone>, Report> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(ids.len());

        for id in ids {
            if !seen.insert(*id) {
                continue;
            }

            match self.get(*id) {
                Some(tone) => resolved.push(tone.clone()),
                None => bail!("unknown tone {}", id),
            }
        }

        Ok(resolved)
    }
}
