//! Field-wise merge of two compatible day lists.

use progsync_model::{validate_days, DaySnapshot, Item, Link, ModelError, Tag};
use thiserror::Error;

/// The merged result violated a document invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("merged document is invalid: {0}")]
pub struct MergeError(#[from] pub ModelError);

/// Merges a stale client snapshot into the authoritative one.
///
/// The server snapshot is the base. For every day and item position
/// present in both, the client's completion flag wins and every other
/// item field stays as on the server. Tags are unioned by text and links
/// by url, server entries first. Client days beyond the server's length
/// are appended as they are. Server items beyond the client's length are
/// kept; client items beyond the server's length are dropped.
///
/// Removals of tags and links on either side are not propagated.
///
/// The function is pure: equal inputs give equal outputs.
///
/// # Errors
///
/// Returns [`MergeError`] if the merged days share a day number. Validated
/// client days paired by position cannot cause this; a stored server
/// document that already repeats a day number does.
pub fn merge(
    server: &[DaySnapshot],
    client: &[DaySnapshot],
) -> Result<Vec<DaySnapshot>, MergeError> {
    let mut merged: Vec<DaySnapshot> = server
        .iter()
        .enumerate()
        .map(|(index, server_day)| match client.get(index) {
            Some(client_day) => merge_day(server_day, client_day),
            None => server_day.clone(),
        })
        .collect();

    merged.extend(client.iter().skip(server.len()).cloned());

    validate_days(&merged)?;
    Ok(merged)
}

fn merge_day(server: &DaySnapshot, client: &DaySnapshot) -> DaySnapshot {
    let items = server
        .items
        .iter()
        .enumerate()
        .map(|(index, server_item)| match client.items.get(index) {
            Some(client_item) => merge_item(server_item, client_item),
            None => server_item.clone(),
        })
        .collect();

    DaySnapshot {
        day_number: server.day_number,
        date: server.date.clone(),
        items,
        tags: union_by(&server.tags, &client.tags, tag_key),
        links: union_by(&server.links, &client.links, link_key),
    }
}

fn merge_item(server: &Item, client: &Item) -> Item {
    Item {
        id: server.id.clone(),
        text: server.text.clone(),
        link: server.link.clone(),
        completed: client.completed,
        difficulty: server.difficulty,
    }
}

fn tag_key(tag: &Tag) -> &str {
    &tag.text
}

fn link_key(link: &Link) -> &str {
    &link.url
}

fn union_by<T, F>(server: &[T], client: &[T], key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let mut out = server.to_vec();
    for entry in client {
        if !out.iter().any(|existing| key(existing) == key(entry)) {
            out.push(entry.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use progsync_model::Difficulty;

    fn seeded_day() -> DaySnapshot {
        let mut day = DaySnapshot::new(1, "2024-05-01");
        day.items = vec![
            Item::new("a", "Read", Difficulty::Easy),
            Item::new("b", "Write", Difficulty::Medium),
        ];
        day
    }

    #[test]
    fn client_completion_wins_server_text_wins() {
        let server = vec![seeded_day()];
        let mut client = server.clone();
        client[0].items[0].completed = true;
        client[0].items[0].text = "Read a lot".into();
        client[0].items[1].difficulty = Difficulty::Hard;

        let merged = merge(&server, &client).unwrap();
        let items = &merged[0].items;
        assert!(items[0].completed);
        assert_eq!(items[0].text, "Read");
        assert_eq!(items[1].difficulty, Difficulty::Medium);
    }

    #[test]
    fn tags_and_links_are_unioned() {
        let mut server_day = seeded_day();
        server_day.tags = vec![Tag::new("focus", "#f00")];
        server_day.links = vec![Link::new("https://a.example", "A")];

        let mut client_day = seeded_day();
        client_day.tags = vec![Tag::new("calm", "#0f0"), Tag::new("focus", "#00f")];
        client_day.links = vec![Link::new("https://b.example", "B")];

        let merged = merge(&[server_day], &[client_day]).unwrap();
        let tags: Vec<_> = merged[0].tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(tags, vec!["focus", "calm"]);
        assert_eq!(merged[0].tags[0].color, "#f00");

        let urls: Vec<_> = merged[0].links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn removals_are_not_propagated() {
        let mut server_day = seeded_day();
        server_day.tags = vec![Tag::new("focus", "#f00")];
        let client_day = seeded_day();

        let merged = merge(&[server_day], &[client_day]).unwrap();
        assert!(merged[0].has_tag("focus"));
    }

    #[test]
    fn extra_client_days_are_appended() {
        let server = vec![seeded_day()];
        let mut client = server.clone();
        client.push(DaySnapshot::new(2, "2024-05-02"));

        let merged = merge(&server, &client).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].day_number, 2);
    }

    #[test]
    fn extra_server_days_and_items_are_kept() {
        let mut server = vec![seeded_day(), DaySnapshot::new(2, "2024-05-02")];
        server[0].items.push(Item::new("c", "Review", Difficulty::Hard));
        let client = vec![seeded_day()];

        let merged = merge(&server, &client).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].items.len(), 3);
        assert_eq!(merged[0].items[2].id, "c");
    }

    #[test]
    fn colliding_appended_day_fails() {
        let server = vec![seeded_day()];
        let client = vec![seeded_day(), DaySnapshot::new(1, "2024-05-09")];

        let err = merge(&server, &client).unwrap_err();
        assert_eq!(err, MergeError(ModelError::DuplicateDay(1)));
    }

    #[test]
    fn merge_is_deterministic() {
        let server = vec![seeded_day()];
        let mut client = server.clone();
        client[0].items[1].completed = true;
        client[0].tags.push(Tag::new("x", "#000"));

        assert_eq!(merge(&server, &client), merge(&server, &client));
    }
}
