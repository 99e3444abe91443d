//! Typed, bidirectional associations between arbitrary entities.
//!
//! The registry keeps one list of [`Link`]s per [`LinkType`]. Links are often
//! built one side at a time, so the registry tolerates half links and heals
//! them when the missing side arrives (see [`LinkRegistry::add_link`]).
//!
//! There is no transaction log. Each mutation that posts an event puts enough
//! into the [`LinkEvent`] to invert it, and [`LinkRegistry::revert`] does
//! exactly that.

use std::collections::BTreeMap;

use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    event::{Event, LinkEvent},
    identifier::IdGenerator,
    link::{Link, LinkType},
};

/// Which dangling links a prune removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    /// Links with neither side set.
    BothNull,
    /// Links with at least one side missing.
    EitherNull,
}

impl Prune {
    const fn removes(self, link: &Link) -> bool {
        match self {
            Self::BothNull => link.is_empty(),
            Self::EitherNull => !link.is_complete(),
        }
    }
}

/// Store of all links, grouped by category.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    links: BTreeMap<LinkType, Vec<Link>>,
    ids: IdGenerator,
    events: Vec<Event>,
}

impl LinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from stored links, keeping their ids.
    #[must_use]
    pub fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut registry = Self::new();
        registry.restore_links(links);
        registry
    }

    /// Replaces the identifier source.
    #[must_use]
    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Drains the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn post(&mut self, event: LinkEvent) {
        self.events.push(event.into());
    }

    /// Total number of stored links, half links included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Whether no links are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of categories that currently hold a list, empty or not.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.links.len()
    }

    /// Every stored link, half links included, grouped by category.
    ///
    /// This is the raw view used for persistence; queries go through the
    /// pruning accessors instead.
    pub fn iter(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values().flatten()
    }

    /// Removes dangling links of every category, then empty categories.
    ///
    /// Returns the number of links removed.
    pub fn prune(&mut self, mode: Prune) -> usize {
        let removed = LinkType::ALL
            .into_iter()
            .map(|link_type| self.prune_type(link_type, mode))
            .sum();
        self.prune_empty_buckets();
        removed
    }

    fn prune_type(&mut self, link_type: LinkType, mode: Prune) -> usize {
        let Some(bucket) = self.links.get_mut(&link_type) else {
            return 0;
        };
        let before = bucket.len();
        bucket.retain(|link| !mode.removes(link));
        before - bucket.len()
    }

    /// Drops categories without links. Returns how many were dropped.
    pub fn prune_empty_buckets(&mut self) -> usize {
        let before = self.links.len();
        self.links.retain(|_, bucket| !bucket.is_empty());
        before - self.links.len()
    }

    /// Links `a` with `b` under `link_type` and returns the link's id.
    ///
    /// Existing links are reused rather than duplicated:
    ///
    /// 1. a half link `(None, b)` gets `a` filled in,
    /// 2. otherwise a half link `(a, None)` gets `b` filled in,
    /// 3. otherwise an identical link `(a, b)` is returned as is,
    /// 4. otherwise a new link is stored.
    ///
    /// Repairs are skipped when `(a, b)` is already stored, so a pair is
    /// never held twice.
    #[instrument(skip(self))]
    pub fn add_link(&mut self, link_type: LinkType, a: Option<Uuid>, b: Option<Uuid>) -> Uuid {
        let bucket = self.links.entry(link_type).or_default();
        let exact = bucket
            .iter()
            .find(|link| link.has_parts(a, b))
            .map(Link::id);

        if exact.is_none() {
            let half = bucket
                .iter()
                .position(|link| link.has_parts(None, b))
                .or_else(|| bucket.iter().position(|link| link.has_parts(a, None)));
            if let Some(index) = half {
                let id = bucket[index].id;
                if self.rebind(link_type, index, a, b) {
                    tracing::debug!("repaired half link {id}");
                    return id;
                }
            }
        }

        if let Some(id) = exact {
            return id;
        }

        let link = Link::new(self.ids.next_id(), link_type, a, b);
        let id = link.id;
        self.links.entry(link_type).or_default().push(link.clone());
        self.post(LinkEvent::Added { link });
        id
    }

    fn rebind(&mut self, link_type: LinkType, index: usize, a: Option<Uuid>, b: Option<Uuid>) -> bool {
        let Some(link) = self
            .links
            .get_mut(&link_type)
            .and_then(|bucket| bucket.get_mut(index))
        else {
            return false;
        };
        let (old_a, old_b) = (link.a, link.b);
        if old_a == a && old_b == b {
            return false;
        }
        link.a = a;
        link.b = b;
        let link_id = link.id;
        self.post(LinkEvent::Changed {
            link_type,
            link_id,
            old_a,
            old_b,
            new_a: a,
            new_b: b,
        });
        true
    }

    /// Ids on the other side of every link touching `part`.
    ///
    /// Links with neither side set are pruned first; half links are skipped.
    pub fn get_links_for(&mut self, link_type: LinkType, part: Uuid) -> Vec<Uuid> {
        self.prune_type(link_type, Prune::BothNull);
        let others = self
            .links
            .get(&link_type)
            .into_iter()
            .flatten()
            .filter(|link| link.links(part))
            .filter_map(|link| link.other(part))
            .collect();
        self.prune_empty_buckets();
        others
    }

    /// Every complete link touching `part`.
    ///
    /// Links missing either side are pruned first.
    pub fn get_raw_links_for(&mut self, link_type: LinkType, part: Uuid) -> Vec<Link> {
        self.prune_type(link_type, Prune::EitherNull);
        let links = self
            .links
            .get(&link_type)
            .into_iter()
            .flatten()
            .filter(|link| link.links(part))
            .cloned()
            .collect();
        self.prune_empty_buckets();
        links
    }

    /// Every complete link of a category.
    pub fn links_of_type(&mut self, link_type: LinkType) -> &[Link] {
        self.prune_type(link_type, Prune::EitherNull);
        self.links.get(&link_type).map_or(&[], Vec::as_slice)
    }

    /// Finds a link by id, after pruning links with neither side set.
    pub fn get_link(&mut self, link_type: LinkType, link_id: Uuid) -> Option<&Link> {
        self.prune_type(link_type, Prune::BothNull);
        self.links
            .get(&link_type)?
            .iter()
            .find(|link| link.id == link_id)
    }

    fn position(&mut self, link_type: LinkType, link_id: Uuid) -> Option<usize> {
        self.prune_type(link_type, Prune::BothNull);
        self.links
            .get(&link_type)?
            .iter()
            .position(|link| link.id == link_id)
    }

    /// Rebinds the sides of a link. Only sides that differ are touched.
    ///
    /// Returns `false` if the link is unknown or already has these sides.
    pub fn change_link(
        &mut self,
        link_type: LinkType,
        link_id: Uuid,
        a: Option<Uuid>,
        b: Option<Uuid>,
    ) -> bool {
        match self.position(link_type, link_id) {
            Some(index) => self.rebind(link_type, index, a, b),
            None => false,
        }
    }

    /// Sets the note of a link.
    pub fn change_link_note(&mut self, link_type: LinkType, link_id: Uuid, note: &str) -> bool {
        let Some(link) = self
            .links
            .get_mut(&link_type)
            .and_then(|bucket| bucket.iter_mut().find(|link| link.id == link_id))
        else {
            return false;
        };
        if link.note == note {
            return false;
        }
        let old = std::mem::replace(&mut link.note, note.to_string());
        self.post(LinkEvent::NoteChanged {
            link_type,
            link_id,
            old,
            new: note.to_string(),
        });
        true
    }

    /// Whether `part` is linked under `link_type`, optionally to `right_part`.
    ///
    /// If `part` is not linked directly, a link of any category that touches
    /// `part` counts when that link's own id is linked under `link_type`.
    /// Exactly one such hop is followed.
    pub fn is_linked(&mut self, link_type: LinkType, part: Uuid, right_part: Option<Uuid>) -> bool {
        let linked = self.is_linked_directly(link_type, part, right_part)
            || self
                .iter()
                .filter(|link| link.links(part))
                .any(|link| self.is_linked_directly(link_type, link.id, right_part));
        self.prune_empty_buckets();
        linked
    }

    fn is_linked_directly(&self, link_type: LinkType, part: Uuid, right_part: Option<Uuid>) -> bool {
        self.links.get(&link_type).is_some_and(|bucket| {
            bucket
                .iter()
                .any(|link| link.links(part) && right_part.is_none_or(|right| link.links(right)))
        })
    }

    fn remove_where(&mut self, link_type: LinkType, mut matches: impl FnMut(&Link) -> bool) -> Vec<Link> {
        let Some(bucket) = self.links.get_mut(&link_type) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<Link>, Vec<Link>) =
            std::mem::take(bucket).into_iter().partition(|link| matches(link));
        *bucket = kept;
        self.prune_empty_buckets();
        removed
    }

    fn post_removed(&mut self, link_type: LinkType, links: Vec<Link>) -> bool {
        if links.is_empty() {
            return false;
        }
        self.post(LinkEvent::Removed { link_type, links });
        true
    }

    /// Deletes a link by id.
    pub fn delete_link(&mut self, link_type: LinkType, link_id: Uuid) -> bool {
        let mut first = true;
        let removed = self.remove_where(link_type, |link| {
            let hit = first && link.id == link_id;
            first &= !hit;
            hit
        });
        self.post_removed(link_type, removed)
    }

    /// Deletes the first link with exactly the sides `(a, b)`.
    pub fn delete_link_by_parts(&mut self, link_type: LinkType, a: Option<Uuid>, b: Option<Uuid>) -> bool {
        let mut first = true;
        let removed = self.remove_where(link_type, |link| {
            let hit = first && link.has_parts(a, b);
            first &= !hit;
            hit
        });
        self.post_removed(link_type, removed)
    }

    /// Deletes every link of a category touching `part`, or every link of
    /// the category when `part` is `None`.
    ///
    /// Returns the number of deleted links; a single event carries them all.
    pub fn delete_all_for(&mut self, link_type: LinkType, part: Option<Uuid>) -> usize {
        let removed = self.remove_where(link_type, |link| part.is_none_or(|part| link.links(part)));
        let count = removed.len();
        self.post_removed(link_type, removed);
        count
    }

    /// Removes every link touching `part`, in all categories.
    ///
    /// With `depth > 1` the removal is repeated for the ids of the links just
    /// removed, `depth - 1` more times, so links attached to removed links go
    /// too. No events are posted; the caller decides how to report this.
    #[instrument(skip(self))]
    pub fn delete_links_for(&mut self, part: Uuid, depth: usize) -> Vec<Link> {
        let mut removed = Vec::new();
        for bucket in self.links.values_mut() {
            let (hit, kept): (Vec<_>, Vec<_>) = std::mem::take(bucket)
                .into_iter()
                .partition(|link| link.links(part));
            *bucket = kept;
            removed.extend(hit);
        }
        self.prune_empty_buckets();

        if depth > 1 {
            let link_ids: Vec<Uuid> = removed.iter().map(Link::id).collect();
            for link_id in link_ids {
                let deeper = self.delete_links_for(link_id, depth - 1);
                removed.extend(deeper);
            }
        }
        removed
    }

    /// Puts links back verbatim, ids and notes included.
    ///
    /// Links whose id is already stored under their category are skipped.
    /// Returns the number of links restored. No events are posted.
    pub fn restore_links(&mut self, links: impl IntoIterator<Item = Link>) -> usize {
        let mut restored = 0;
        for link in links {
            let bucket = self.links.entry(link.link_type).or_default();
            if bucket.iter().all(|existing| existing.id != link.id) {
                bucket.push(link);
                restored += 1;
            }
        }
        restored
    }

    /// Applies the inverse of a link event without posting a new one.
    ///
    /// Returns `false` if the registry no longer holds what the event
    /// describes.
    pub fn revert(&mut self, event: &LinkEvent) -> bool {
        self.apply(event, false)
    }

    /// Applies a link event again after it was reverted, without posting a
    /// new one.
    pub fn replay(&mut self, event: &LinkEvent) -> bool {
        self.apply(event, true)
    }

    fn apply(&mut self, event: &LinkEvent, forward: bool) -> bool {
        match (event, forward) {
            (LinkEvent::Added { link }, true) => self.restore_links([link.clone()]) == 1,
            (LinkEvent::Added { link }, false) => {
                !self.remove_where(link.link_type, |l| l.id == link.id).is_empty()
            }
            (LinkEvent::Removed { links, .. }, true) => {
                let mut removed = 0;
                for link in links {
                    removed += self.remove_where(link.link_type, |l| l.id == link.id).len();
                }
                removed > 0
            }
            (LinkEvent::Removed { links, .. }, false) => self.restore_links(links.iter().cloned()) > 0,
            (
                LinkEvent::Changed {
                    link_type,
                    link_id,
                    old_a,
                    old_b,
                    new_a,
                    new_b,
                },
                forward,
            ) => {
                let (a, b) = if forward { (new_a, new_b) } else { (old_a, old_b) };
                self.set_sides(*link_type, *link_id, *a, *b)
            }
            (
                LinkEvent::NoteChanged {
                    link_type,
                    link_id,
                    old,
                    new,
                },
                forward,
            ) => {
                let note = if forward { new } else { old };
                let Some(link) = self
                    .links
                    .get_mut(link_type)
                    .and_then(|bucket| bucket.iter_mut().find(|l| l.id == *link_id))
                else {
                    return false;
                };
                link.note.clone_from(note);
                true
            }
        }
    }

    fn set_sides(&mut self, link_type: LinkType, link_id: Uuid, a: Option<Uuid>, b: Option<Uuid>) -> bool {
        let Some(link) = self
            .links
            .get_mut(&link_type)
            .and_then(|bucket| bucket.iter_mut().find(|l| l.id == link_id))
        else {
            return false;
        };
        link.a = a;
        link.b = b;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: LinkType = LinkType::CausalFactorUca;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn registry() -> LinkRegistry {
        LinkRegistry::new().with_ids(IdGenerator::Sequential(10_000))
    }

    fn registry_with(links: &[(Option<u128>, Option<u128>)]) -> LinkRegistry {
        let stored = links.iter().enumerate().map(|(n, (a, b))| {
            Link::new(
                id(5_000 + n as u128),
                T,
                a.map(Uuid::from_u128),
                b.map(Uuid::from_u128),
            )
        });
        LinkRegistry::from_links(stored).with_ids(IdGenerator::Sequential(10_000))
    }

    #[test]
    fn add_link_is_idempotent() {
        let mut links = registry();
        let first = links.add_link(T, Some(id(1)), Some(id(2)));
        let second = links.add_link(T, Some(id(1)), Some(id(2)));

        assert_eq!(first, second);
        assert_eq!(links.len(), 1);
        assert_eq!(links.take_events().len(), 1);
    }

    #[test]
    fn add_link_repairs_half_link_with_missing_b() {
        let mut links = registry();
        let half = links.add_link(T, Some(id(1)), None);
        links.take_events();

        let repaired = links.add_link(T, Some(id(1)), Some(id(2)));

        assert_eq!(repaired, half);
        assert_eq!(links.len(), 1);
        assert_eq!(links.get_links_for(T, id(1)), [id(2)]);
        assert_eq!(
            links.take_events(),
            [Event::Link(LinkEvent::Changed {
                link_type: T,
                link_id: half,
                old_a: Some(id(1)),
                old_b: None,
                new_a: Some(id(1)),
                new_b: Some(id(2)),
            })]
        );
    }

    #[test]
    fn add_link_repairs_half_link_with_missing_a() {
        let mut links = registry();
        let half = links.add_link(T, None, Some(id(2)));
        assert_eq!(links.add_link(T, Some(id(1)), Some(id(2))), half);
        assert_eq!(links.get_links_for(T, id(2)), [id(1)]);
    }

    #[test]
    fn match_at_first_position_is_honoured() {
        // the half link sits at index 0 of its list
        let mut links = registry_with(&[(Some(1), None), (Some(3), Some(4))]);
        let repaired = links.add_link(T, Some(id(1)), Some(id(2)));
        assert_eq!(repaired, id(5_000));
        assert_eq!(links.len(), 2);

        let mut links = registry_with(&[(Some(1), Some(2)), (Some(3), Some(4))]);
        assert_eq!(links.add_link(T, Some(id(1)), Some(id(2))), id(5_000));
        assert_eq!(links.len(), 2);
        assert!(links.take_events().is_empty());
    }

    #[test]
    fn repair_never_duplicates_an_existing_pair() {
        let mut links = registry_with(&[(None, Some(2)), (Some(1), Some(2))]);
        assert_eq!(links.add_link(T, Some(id(1)), Some(id(2))), id(5_001));
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn queries_prune_dangling_links() {
        let mut links = registry_with(&[(None, None), (Some(1), None), (Some(1), Some(2))]);

        assert_eq!(links.get_links_for(T, id(1)), [id(2)]);
        assert_eq!(links.len(), 2, "only the empty link is pruned");

        let raw = links.get_raw_links_for(T, id(1));
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].id(), id(5_002));
        assert_eq!(links.len(), 1, "half links are pruned too");
    }

    #[test]
    fn explicit_prune_reports_counts() {
        let mut links = registry_with(&[(None, None), (Some(1), None)]);
        assert_eq!(links.bucket_count(), 1);

        assert_eq!(links.prune(Prune::BothNull), 1);
        assert_eq!(links.len(), 1);
        assert_eq!(links.prune(Prune::EitherNull), 1);
        assert_eq!(links.bucket_count(), 0);
    }

    #[test]
    fn change_link_touches_only_differing_sides() {
        let mut links = registry();
        let link = links.add_link(T, Some(id(1)), Some(id(2)));
        links.take_events();

        assert!(!links.change_link(T, link, Some(id(1)), Some(id(2))));
        assert!(!links.change_link(T, id(999), Some(id(1)), Some(id(3))));
        assert!(links.change_link(T, link, Some(id(1)), Some(id(3))));
        assert_eq!(links.get_link(T, link).unwrap().b(), Some(id(3)));

        let events = links.take_events();
        assert_eq!(events.len(), 1);
        let Event::Link(event) = &events[0] else {
            panic!("unexpected event {events:?}");
        };
        assert!(links.revert(event));
        assert_eq!(links.get_link(T, link).unwrap().b(), Some(id(2)));
        assert!(links.replay(event));
        assert_eq!(links.get_link(T, link).unwrap().b(), Some(id(3)));
    }

    #[test]
    fn note_changes_are_undoable() {
        let mut links = registry();
        let link = links.add_link(T, Some(id(1)), Some(id(2)));
        links.take_events();

        assert!(links.change_link_note(T, link, "checked"));
        assert!(!links.change_link_note(T, link, "checked"));
        let events = links.take_events();
        let Event::Link(event) = &events[0] else {
            panic!("unexpected event {events:?}");
        };
        assert!(links.revert(event));
        assert_eq!(links.get_link(T, link).unwrap().note(), "");
    }

    #[test]
    fn is_linked_follows_one_hop() {
        let mut links = registry();
        let (factor, uca, hazard, accident) = (id(1), id(2), id(3), id(4));

        let factor_uca = links.add_link(LinkType::CausalFactorUca, Some(factor), Some(uca));
        let entry_hazard = links.add_link(LinkType::CausalEntryHazard, Some(factor_uca), Some(hazard));
        links.add_link(LinkType::HazardAccident, Some(entry_hazard), Some(accident));

        assert!(links.is_linked(LinkType::CausalFactorUca, factor, Some(uca)));
        assert!(links.is_linked(LinkType::CausalEntryHazard, factor, None));
        assert!(links.is_linked(LinkType::CausalEntryHazard, factor, Some(hazard)));
        assert!(!links.is_linked(LinkType::CausalEntryHazard, factor, Some(id(99))));
        // two hops away
        assert!(!links.is_linked(LinkType::HazardAccident, factor, None));
        assert!(!links.is_linked(LinkType::UcaHazard, factor, None));
    }

    #[test]
    fn deletions_post_undo_payloads() {
        let mut links = registry();
        let first = links.add_link(T, Some(id(1)), Some(id(2)));
        links.add_link(T, Some(id(1)), Some(id(3)));
        links.add_link(T, Some(id(4)), Some(id(5)));
        links.take_events();

        assert!(links.delete_link(T, first));
        assert!(!links.delete_link(T, first));
        assert!(links.delete_link_by_parts(T, Some(id(1)), Some(id(3))));
        assert!(!links.delete_link_by_parts(T, Some(id(3)), Some(id(1))));

        let events = links.take_events();
        assert_eq!(events.len(), 2);
        for event in events.iter().rev() {
            let Event::Link(event) = event else {
                panic!("unexpected event {event:?}");
            };
            assert!(links.revert(event));
        }
        assert_eq!(links.len(), 3);

        assert_eq!(links.delete_all_for(T, Some(id(1))), 2);
        assert_eq!(links.delete_all_for(T, None), 1);
        assert_eq!(links.delete_all_for(T, None), 0);
        assert_eq!(links.bucket_count(), 0);
        assert_eq!(links.take_events().len(), 2);
    }

    #[test]
    fn delete_links_for_cascades_through_link_ids() {
        let mut links = registry();
        let (x, y, z) = (id(1), id(2), id(3));

        let x_y = links.add_link(LinkType::UcaHazard, Some(x), Some(y));
        let y_z = links.add_link(LinkType::UcaHazard, Some(y), Some(z));
        let on_x_y = links.add_link(LinkType::UcaScenario, Some(x_y), Some(id(4)));
        let on_y_z = links.add_link(LinkType::UcaScenario, Some(y_z), Some(id(5)));
        links.take_events();

        let removed: Vec<_> = links.delete_links_for(x, 2).iter().map(Link::id).collect();

        assert_eq!(removed, [x_y, on_x_y]);
        assert!(links.get_link(LinkType::UcaHazard, y_z).is_some());
        assert!(links.get_link(LinkType::UcaScenario, on_y_z).is_some());
        assert!(links.take_events().is_empty());

        let removed = links.delete_links_for(y, 1);
        assert_eq!(removed.len(), 1);
        assert_eq!(links.len(), 1);
    }
}
