//! Property-based test generators using proptest.
//!
//! Provides strategies for documents and for server/client pairs on
//! either side of the compatibility thresholds.

use crate::fixtures::date_for;
use progsync_model::{DaySnapshot, Difficulty, Item, Link, Tag};
use proptest::prelude::*;

/// A server/client pair of day lists.
pub type DayPair = (Vec<DaySnapshot>, Vec<DaySnapshot>);

/// Strategy for difficulties.
pub fn difficulty_strategy() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
    ]
}

/// Strategy for items with short random ids.
pub fn item_strategy() -> impl Strategy<Value = Item> {
    (
        "[a-z0-9]{1,8}",
        "[A-Za-z ]{1,24}",
        any::<bool>(),
        difficulty_strategy(),
    )
        .prop_map(|(id, text, completed, difficulty)| {
            let mut item = Item::new(id, text, difficulty);
            item.completed = completed;
            item
        })
}

/// Strategy for tags.
pub fn tag_strategy() -> impl Strategy<Value = Tag> {
    ("[a-z]{1,6}", "#[0-9a-f]{6}").prop_map(|(text, color)| Tag::new(text, color))
}

/// Strategy for links.
pub fn link_strategy() -> impl Strategy<Value = Link> {
    "[a-z]{1,8}".prop_map(|host| Link::new(format!("https://{host}.example"), host))
}

/// Strategy for one day with the given number.
pub fn day_strategy(day_number: i64) -> impl Strategy<Value = DaySnapshot> {
    (
        prop::collection::vec(item_strategy(), 0..6),
        prop::collection::vec(tag_strategy(), 0..3),
        prop::collection::vec(link_strategy(), 0..3),
    )
        .prop_map(move |(items, tags, links)| DaySnapshot {
            day_number,
            date: date_for(day_number),
            items,
            tags,
            links,
        })
}

/// Strategy for a valid day list of 1 to `max_days` days numbered from 1.
pub fn days_strategy(max_days: i64) -> impl Strategy<Value = Vec<DaySnapshot>> {
    (1..=max_days.max(1))
        .prop_flat_map(|count| (1..=count).map(day_strategy).collect::<Vec<_>>())
}

/// Strategy for pairs the classifier accepts under default thresholds.
///
/// The client is the server with some completion flags flipped, some tags
/// added to the first day and up to three extra days appended.
pub fn compatible_pair_strategy() -> impl Strategy<Value = DayPair> {
    (
        days_strategy(5),
        prop::collection::vec(any::<bool>(), 32),
        0..=3i64,
        prop::collection::vec(tag_strategy(), 0..3),
    )
        .prop_map(|(server, flips, extra_days, tags)| {
            let mut client = server.clone();
            let mut flips = flips.into_iter().cycle();
            for item in client.iter_mut().flat_map(|day| day.items.iter_mut()) {
                if flips.next().unwrap_or(false) {
                    item.completed = !item.completed;
                }
            }
            if let Some(first) = client.first_mut() {
                first.tags.extend(tags);
            }

            let next = client.len() as i64 + 1;
            client.extend((next..next + extra_days).map(|n| DaySnapshot::new(n, date_for(n))));
            (server, client)
        })
}

/// Strategy for pairs the classifier rejects under default thresholds.
///
/// Either the client is four to six days longer, or one of its days holds
/// three to five more items.
pub fn incompatible_pair_strategy() -> impl Strategy<Value = DayPair> {
    (days_strategy(3), any::<bool>(), 4..=6usize).prop_map(|(server, grow_days, extra)| {
        let mut client = server.clone();
        if grow_days {
            let next = client.len() as i64 + 1;
            client.extend((next..next + extra as i64).map(|n| DaySnapshot::new(n, date_for(n))));
        } else if let Some(first) = client.first_mut() {
            for i in 0..extra - 1 {
                first
                    .items
                    .push(Item::new(format!("extra-{i}"), "Extra", Difficulty::Easy));
            }
        }
        (server, client)
    })
}
