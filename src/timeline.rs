//! Rotation planning for the home-screen widgets.
//!
//! A timeline is a handful of dated entries the widget host renders one
//! after another. Each plan picks [`PHOTOS_PER_TIMELINE`] photos at random
//! from the eligible set and lays them out according to the widget family.

use chrono::{DateTime, Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::db::PhotoRecord;

pub const PHOTOS_PER_TIMELINE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetFamily {
    /// One photo per entry (small widget).
    Single,
    /// Two photos side by side (medium widget).
    Wide,
    /// A 2x2 grid (large widget).
    Large,
}

impl WidgetFamily {
    fn entry_count(&self) -> usize {
        match self {
            WidgetFamily::Single => PHOTOS_PER_TIMELINE,
            WidgetFamily::Wide => PHOTOS_PER_TIMELINE / 2,
            WidgetFamily::Large => 5,
        }
    }

    fn photos_for_entry<'a>(&self, selected: &'a [PhotoRecord], index: usize) -> &'a [PhotoRecord] {
        match self {
            WidgetFamily::Single => &selected[index..index + 1],
            WidgetFamily::Wide => &selected[index * 2..index * 2 + 2],
            WidgetFamily::Large => selected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationInterval {
    #[default]
    OneMinute,
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
}

impl RotationInterval {
    /// Unrecognised values rotate every minute.
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            5 => RotationInterval::FiveMinutes,
            10 => RotationInterval::TenMinutes,
            15 => RotationInterval::FifteenMinutes,
            _ => RotationInterval::OneMinute,
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            RotationInterval::OneMinute => 1,
            RotationInterval::FiveMinutes => 5,
            RotationInterval::TenMinutes => 10,
            RotationInterval::FifteenMinutes => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReloadPolicy {
    /// Ask for a fresh timeline once the last entry has been shown.
    AtEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub date: DateTime<Utc>,
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub family: WidgetFamily,
    pub entries: Vec<TimelineEntry>,
    pub policy: ReloadPolicy,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Picks `count` photos by walking freshly shuffled copies of `candidates`.
/// Photos repeat when there are fewer candidates than `count`.
pub fn select_photos<R>(candidates: &[PhotoRecord], count: usize, rng: &mut R) -> Vec<PhotoRecord>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut selected = Vec::with_capacity(count);
    let mut pass: Vec<&PhotoRecord> = candidates.iter().collect();
    while selected.len() < count {
        pass.shuffle(rng);
        for photo in &pass {
            if selected.len() == count {
                break;
            }
            selected.push((*photo).clone());
        }
    }
    selected
}

pub fn plan_timeline<R>(
    family: WidgetFamily,
    interval: RotationInterval,
    now: DateTime<Utc>,
    candidates: &[PhotoRecord],
    rng: &mut R,
) -> Timeline
where
    R: Rng + ?Sized,
{
    let selected = select_photos(candidates, PHOTOS_PER_TIMELINE, rng);

    let entries = if selected.is_empty() {
        Vec::new()
    } else {
        (0..family.entry_count())
            .map(|index| TimelineEntry {
                date: now + Duration::minutes(index as i64 * interval.minutes()),
                photos: family.photos_for_entry(&selected, index).to_vec(),
            })
            .collect()
    };

    Timeline {
        family,
        entries,
        policy: ReloadPolicy::AtEnd,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn photos(count: usize) -> Vec<PhotoRecord> {
        (0..count)
            .map(|i| PhotoRecord::new(format!("local-{i}"), Some(vec![i as u8])))
            .collect()
    }

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn single_rotates_one_photo_per_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = plan_timeline(
            WidgetFamily::Single,
            RotationInterval::FiveMinutes,
            now(),
            &photos(6),
            &mut rng,
        );

        assert_eq!(timeline.entries.len(), 4);
        for (index, entry) in timeline.entries.iter().enumerate() {
            assert_eq!(entry.photos.len(), 1);
            assert_eq!(entry.date, now() + Duration::minutes(5 * index as i64));
        }
        assert_eq!(timeline.policy, ReloadPolicy::AtEnd);
    }

    #[test]
    fn wide_pairs_photos_across_two_entries() {
        let mut rng = StdRng::seed_from_u64(1);
        let timeline = plan_timeline(
            WidgetFamily::Wide,
            RotationInterval::TenMinutes,
            now(),
            &photos(4),
            &mut rng,
        );

        assert_eq!(timeline.entries.len(), 2);
        assert!(timeline.entries.iter().all(|entry| entry.photos.len() == 2));
        assert_eq!(timeline.entries[1].date, now() + Duration::minutes(10));

        let shown: HashSet<&str> = timeline
            .entries
            .iter()
            .flat_map(|entry| entry.photos.iter().map(|p| p.id.as_str()))
            .collect();
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn large_repeats_the_same_grid() {
        let mut rng = StdRng::seed_from_u64(3);
        let timeline = plan_timeline(
            WidgetFamily::Large,
            RotationInterval::OneMinute,
            now(),
            &photos(8),
            &mut rng,
        );

        assert_eq!(timeline.entries.len(), 5);
        let first = &timeline.entries[0].photos;
        assert_eq!(first.len(), 4);
        assert!(timeline.entries.iter().all(|entry| &entry.photos == first));
    }

    #[test]
    fn few_candidates_repeat_to_fill_the_selection() {
        let mut rng = StdRng::seed_from_u64(11);
        let only = photos(1);
        let selected = select_photos(&only, PHOTOS_PER_TIMELINE, &mut rng);
        assert_eq!(selected.len(), PHOTOS_PER_TIMELINE);
        assert!(selected.iter().all(|photo| photo.id == only[0].id));
    }

    #[test]
    fn each_pass_uses_every_candidate_once() {
        let mut rng = StdRng::seed_from_u64(5);
        let pool = photos(3);
        let selected = select_photos(&pool, 3, &mut rng);
        let ids: HashSet<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn no_candidates_gives_an_empty_timeline() {
        let mut rng = StdRng::seed_from_u64(0);
        let timeline = plan_timeline(
            WidgetFamily::Single,
            RotationInterval::OneMinute,
            now(),
            &[],
            &mut rng,
        );
        assert!(timeline.is_empty());
    }

    #[test]
    fn unknown_intervals_fall_back_to_one_minute() {
        assert_eq!(RotationInterval::from_minutes(15).minutes(), 15);
        assert_eq!(RotationInterval::from_minutes(0), RotationInterval::OneMinute);
        assert_eq!(RotationInterval::from_minutes(7), RotationInterval::OneMinute);
        assert_eq!(RotationInterval::default(), RotationInterval::OneMinute);
    }
}
