use std::collections::VecDeque;

use crate::api::{Movie, MovieId, StarRating};

/// Refill the feed once fewer than this many cards remain.
pub const REPLENISH_THRESHOLD: usize = 5;
/// Horizontal displacement, in units, that turns a drag into a swipe.
pub const SWIPE_THRESHOLD: i32 = 100;
/// Units of displacement per terminal column dragged.
pub const UNITS_PER_COLUMN: i32 = 8;
/// Frames an exiting card stays on screen.
pub const EXIT_FRAMES: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// Classifies the end of a drag. Offsets within the threshold do nothing.
    pub fn from_offset(offset: i32) -> Option<Self> {
        if offset > SWIPE_THRESHOLD {
            Some(SwipeDirection::Right)
        } else if offset < -SWIPE_THRESHOLD {
            Some(SwipeDirection::Left)
        } else {
            None
        }
    }

    pub fn for_rating(rating: StarRating) -> Self {
        if rating.is_positive() {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    }
}

/// Remote call a card triage must trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    WatchLater(MovieId),
    Rate(MovieId, StarRating),
}

/// Outcome of removing the top card.
#[derive(Debug, Clone, PartialEq)]
pub struct Triage {
    pub movie: Movie,
    pub direction: SwipeDirection,
    pub action: Option<CardAction>,
    /// The queue dropped below [`REPLENISH_THRESHOLD`]; one more batch is due.
    pub replenish: bool,
}

/// Card leaving the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitAnimation {
    pub movie: Movie,
    pub direction: SwipeDirection,
    pub frames_left: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    start_column: u16,
    offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Swiped(Triage),
    /// Released without moving: treat as a tap on the card body.
    Tap(MovieId),
    Cancelled,
}

/// Stack of cards, index 0 on top.
#[derive(Debug, Default)]
pub struct SwipeFeed {
    queue: VecDeque<Movie>,
    exiting: Option<ExitAnimation>,
    drag: Option<Drag>,
}

impl SwipeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn front(&self) -> Option<&Movie> {
        self.queue.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.queue.iter()
    }

    pub fn exiting(&self) -> Option<&ExitAnimation> {
        self.exiting.as_ref()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.is_some()
    }

    /// Current horizontal offset of the top card while dragging.
    pub fn drag_offset(&self) -> i32 {
        self.drag.map(|d| d.offset).unwrap_or(0)
    }

    /// Appends movies whose id is not already queued, keeping batch order.
    /// Returns how many were added.
    pub fn merge_batch(&mut self, batch: Vec<Movie>) -> usize {
        let before = self.queue.len();
        for movie in batch {
            if !self.queue.iter().any(|m| m.id == movie.id) {
                self.queue.push_back(movie);
            }
        }
        self.queue.len() - before
    }

    /// Button or gesture swipe of the top card.
    pub fn swipe(&mut self, direction: SwipeDirection) -> Option<Triage> {
        let id = self.front()?.id;
        let action = match direction {
            SwipeDirection::Right => CardAction::WatchLater(id),
            SwipeDirection::Left => CardAction::Rate(id, StarRating::DISLIKED),
        };
        self.remove_front(direction, Some(action))
    }

    /// Explicit star rating of the top card. Never adds to a playlist.
    pub fn rate(&mut self, rating: StarRating) -> Option<Triage> {
        let id = self.front()?.id;
        self.remove_front(
            SwipeDirection::for_rating(rating),
            Some(CardAction::Rate(id, rating)),
        )
    }

    /// Plays the positive exit without any remote call, used once the movie
    /// was added to a playlist from the detail overlay.
    ///
    /// Unlike [`SwipeFeed::swipe`] to the right, this does not also add the
    /// movie to watch later: the chosen playlist is the only write.
    pub fn dismiss(&mut self) -> Option<Triage> {
        self.remove_front(SwipeDirection::Right, None)
    }

    fn remove_front(
        &mut self,
        direction: SwipeDirection,
        action: Option<CardAction>,
    ) -> Option<Triage> {
        self.drag = None;
        let movie = self.queue.pop_front()?;
        self.exiting = Some(ExitAnimation {
            movie: movie.clone(),
            direction,
            frames_left: EXIT_FRAMES,
        });
        Some(Triage {
            movie,
            direction,
            action,
            replenish: self.queue.len() < REPLENISH_THRESHOLD,
        })
    }

    /// Advances the exit animation by one frame.
    pub fn tick(&mut self) {
        if let Some(exit) = self.exiting.as_mut() {
            exit.frames_left = exit.frames_left.saturating_sub(1);
            if exit.frames_left == 0 {
                self.exiting = None;
            }
        }
    }

    pub fn begin_drag(&mut self, column: u16) {
        if self.queue.is_empty() || self.is_exiting() {
            return;
        }
        self.drag = Some(Drag {
            start_column: column,
            offset: 0,
        });
    }

    pub fn drag_to(&mut self, column: u16) {
        if let Some(drag) = self.drag.as_mut() {
            drag.offset = (column as i32 - drag.start_column as i32) * UNITS_PER_COLUMN;
        }
    }

    pub fn end_drag(&mut self) -> DragOutcome {
        let Some(drag) = self.drag.take() else {
            return DragOutcome::Cancelled;
        };
        match SwipeDirection::from_offset(drag.offset) {
            Some(direction) => self
                .swipe(direction)
                .map(DragOutcome::Swiped)
                .unwrap_or(DragOutcome::Cancelled),
            None if drag.offset == 0 => self
                .front()
                .map(|m| DragOutcome::Tap(m.id))
                .unwrap_or(DragOutcome::Cancelled),
            None => DragOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::movies;
    use proptest::prelude::*;

    fn ids(feed: &SwipeFeed) -> Vec<MovieId> {
        feed.iter().map(|m| m.id).collect()
    }

    fn feed_of(ids: &[MovieId]) -> SwipeFeed {
        let mut feed = SwipeFeed::new();
        feed.merge_batch(movies(ids));
        feed
    }

    #[test]
    fn test_merge_skips_known_ids() {
        let mut feed = feed_of(&[1, 2, 3]);
        let added = feed.merge_batch(movies(&[2, 3, 4, 5]));
        assert_eq!(added, 2);
        assert_eq!(ids(&feed), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_dedups_within_batch() {
        let mut feed = SwipeFeed::new();
        feed.merge_batch(movies(&[7, 7, 8]));
        assert_eq!(ids(&feed), vec![7, 8]);
    }

    #[test]
    fn test_swipe_threshold_boundaries() {
        assert_eq!(SwipeDirection::from_offset(101), Some(SwipeDirection::Right));
        assert_eq!(SwipeDirection::from_offset(-101), Some(SwipeDirection::Left));
        assert_eq!(SwipeDirection::from_offset(100), None);
        assert_eq!(SwipeDirection::from_offset(-100), None);
        assert_eq!(SwipeDirection::from_offset(0), None);
    }

    #[test]
    fn test_right_swipe_targets_watch_later() {
        let mut feed = feed_of(&[1, 2]);
        let triage = feed.swipe(SwipeDirection::Right).unwrap();
        assert_eq!(triage.action, Some(CardAction::WatchLater(1)));
        assert_eq!(triage.direction, SwipeDirection::Right);
        assert_eq!(ids(&feed), vec![2]);
    }

    #[test]
    fn test_left_swipe_rates_one_star() {
        let mut feed = feed_of(&[1]);
        let triage = feed.swipe(SwipeDirection::Left).unwrap();
        assert_eq!(triage.action, Some(CardAction::Rate(1, StarRating::DISLIKED)));
    }

    #[test]
    fn test_rating_picks_exit_direction_without_playlist_add() {
        for value in 1..=5u8 {
            let mut feed = feed_of(&[1]);
            let rating = StarRating::new(value).unwrap();
            let triage = feed.rate(rating).unwrap();
            let expected = if value >= 3 {
                SwipeDirection::Right
            } else {
                SwipeDirection::Left
            };
            assert_eq!(triage.direction, expected);
            assert_eq!(triage.action, Some(CardAction::Rate(1, rating)));
        }
    }

    #[test]
    fn test_replenish_only_below_threshold() {
        let mut feed = feed_of(&[1, 2, 3, 4, 5, 6]);
        assert!(!feed.swipe(SwipeDirection::Left).unwrap().replenish);
        assert_eq!(feed.len(), 5);
        assert!(feed.swipe(SwipeDirection::Left).unwrap().replenish);
        assert_eq!(feed.len(), 4);
    }

    #[test]
    fn test_empty_feed_yields_nothing() {
        let mut feed = SwipeFeed::new();
        assert!(feed.swipe(SwipeDirection::Right).is_none());
        assert!(feed.rate(StarRating::LIKED).is_none());
        assert!(!feed.is_exiting());
    }

    #[test]
    fn test_exit_animation_runs_out() {
        let mut feed = feed_of(&[1, 2]);
        feed.dismiss().unwrap();
        assert!(feed.is_exiting());
        for _ in 0..EXIT_FRAMES {
            feed.tick();
        }
        assert!(!feed.is_exiting());
    }

    #[test]
    fn test_dismiss_has_no_action() {
        let mut feed = feed_of(&[1, 2]);
        let triage = feed.dismiss().unwrap();
        assert!(triage.action.is_none());
        assert_eq!(triage.direction, SwipeDirection::Right);
    }

    #[test]
    fn test_drag_past_threshold_swipes() {
        let mut feed = feed_of(&[1, 2]);
        feed.begin_drag(10);
        feed.drag_to(23);
        assert_eq!(feed.drag_offset(), 104);
        match feed.end_drag() {
            DragOutcome::Swiped(t) => assert_eq!(t.action, Some(CardAction::WatchLater(1))),
            other => panic!("expected swipe, got {:?}", other),
        }
    }

    #[test]
    fn test_short_drag_snaps_back() {
        let mut feed = feed_of(&[1, 2]);
        feed.begin_drag(30);
        feed.drag_to(20);
        assert_eq!(feed.end_drag(), DragOutcome::Cancelled);
        assert_eq!(ids(&feed), vec![1, 2]);
        assert_eq!(feed.drag_offset(), 0);
    }

    #[test]
    fn test_click_without_motion_is_tap() {
        let mut feed = feed_of(&[4, 5]);
        feed.begin_drag(12);
        assert_eq!(feed.end_drag(), DragOutcome::Tap(4));
    }

    #[test]
    fn test_no_drag_while_exiting() {
        let mut feed = feed_of(&[1, 2]);
        feed.swipe(SwipeDirection::Left);
        feed.begin_drag(5);
        assert_eq!(feed.end_drag(), DragOutcome::Cancelled);
    }

    proptest! {
        #[test]
        fn prop_merge_keeps_ids_unique_and_order(
            existing in proptest::collection::vec(0i64..40, 0..20),
            incoming in proptest::collection::vec(0i64..40, 0..20),
        ) {
            let mut feed = SwipeFeed::new();
            feed.merge_batch(movies(&existing));
            let before = ids(&feed);
            feed.merge_batch(movies(&incoming));
            let after = ids(&feed);

            let mut seen = std::collections::HashSet::new();
            prop_assert!(after.iter().all(|id| seen.insert(*id)));
            prop_assert_eq!(&after[..before.len()], &before[..]);
            for id in existing.iter().chain(incoming.iter()) {
                prop_assert!(after.contains(id));
            }
        }

        #[test]
        fn prop_offsets_within_threshold_never_swipe(offset in -100i32..=100) {
            prop_assert_eq!(SwipeDirection::from_offset(offset), None);
        }

        #[test]
        fn prop_offsets_beyond_threshold_swipe(magnitude in 101i32..5000) {
            prop_assert_eq!(SwipeDirection::from_offset(magnitude), Some(SwipeDirection::Right));
            prop_assert_eq!(SwipeDirection::from_offset(-magnitude), Some(SwipeDirection::Left));
        }
    }
}
