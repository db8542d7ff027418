//! Turns the flat comment list of a post into the nested structure the
//! client renders.
//!
//! Threads are at most [`MAX_DEPTH`] levels deep. A reply to a comment that
//! already sits on the deepest level is attached next to it, under the
//! depth-1 ancestor, instead of growing the thread further. Replies whose
//! parent isn't part of the input (e.g. it lives on a page that hasn't been
//! loaded) surface as roots.

use std::collections::{HashMap, HashSet};

use super::{CommentNode, CommentRecord};

pub const MAX_DEPTH: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    depth: usize,
    /// Index of the node this one is listed under, `None` for roots
    attach_to: Option<usize>,
}

const ROOT: Placement = Placement {
    depth: 0,
    attach_to: None,
};

impl Placement {
    fn under(parent_index: usize, parent: Placement) -> Self {
        if parent.depth >= MAX_DEPTH {
            Placement {
                depth: MAX_DEPTH,
                attach_to: parent.attach_to,
            }
        } else {
            Placement {
                depth: parent.depth + 1,
                attach_to: Some(parent_index),
            }
        }
    }
}

/// Builds the comment forest, newest first on every level.
///
/// Every input record ends up exactly once in the output. The placement of a
/// record doesn't depend on where it appears in the input, so pages can be
/// concatenated in any order before calling this.
pub fn build_comment_tree(records: Vec<CommentRecord>) -> Vec<CommentNode> {
    // If an id shows up more than once, replies go to the first one
    let mut index = HashMap::<i32, usize>::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        index.entry(record.id).or_insert(pos);
    }

    let parents: Vec<Option<usize>> = records
        .iter()
        .map(|r| r.parent_id.and_then(|p| index.get(&p).copied()))
        .collect();

    let mut placements: Vec<Option<Placement>> = vec![None; records.len()];
    for i in 0..records.len() {
        resolve_placement(i, &parents, &mut placements);
    }

    let mut roots = vec![];
    let mut children: Vec<Vec<usize>> = vec![vec![]; records.len()];
    for (i, placement) in placements.iter().enumerate() {
        match placement.and_then(|p| p.attach_to) {
            Some(target) => children[target].push(i),
            None => roots.push(i),
        }
    }

    let newest_first = |a: &usize, b: &usize| {
        let (a, b) = (&records[*a], &records[*b]);
        b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
    };
    roots.sort_by(newest_first);
    for list in children.iter_mut() {
        list.sort_by(newest_first);
    }

    let mut nodes: Vec<Option<CommentNode>> = records
        .into_iter()
        .zip(placements)
        .map(|(record, placement)| {
            Some(CommentNode::from_record(
                record,
                placement.unwrap_or(ROOT).depth,
            ))
        })
        .collect();

    roots
        .iter()
        .filter_map(|&i| take_node(i, &mut nodes, &children))
        .collect()
}

/// Resolves the placement of `start` and of every unresolved ancestor on the
/// way up. Walks iteratively so long reply chains can't blow the stack.
fn resolve_placement(start: usize, parents: &[Option<usize>], placements: &mut [Option<Placement>]) {
    if placements[start].is_some() {
        return;
    }

    let mut chain = vec![];
    let mut visited = HashSet::new();
    let mut current = start;
    loop {
        if placements[current].is_some() {
            break;
        }
        if !visited.insert(current) {
            // Parent references loop back on themselves, cut the loop here
            placements[current] = Some(ROOT);
            break;
        }
        chain.push(current);
        match parents[current] {
            Some(parent) => current = parent,
            None => break,
        }
    }

    for &node in chain.iter().rev() {
        if placements[node].is_some() {
            continue;
        }
        placements[node] = Some(match parents[node] {
            None => ROOT,
            Some(parent) => match placements[parent] {
                Some(parent_placement) => Placement::under(parent, parent_placement),
                None => ROOT,
            },
        });
    }
}

fn take_node(
    i: usize,
    nodes: &mut [Option<CommentNode>],
    children: &[Vec<usize>],
) -> Option<CommentNode> {
    let mut node = nodes[i].take()?;
    node.children = children[i]
        .iter()
        .filter_map(|&c| take_node(c, nodes, children))
        .collect();
    Some(node)
}

/// Total number of nodes in the forest, replies included.
pub fn count_nodes(forest: &[CommentNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blog::comment::AuthorRef;
    use chrono::{NaiveDate, NaiveDateTime};
    use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::try_minutes(minutes).unwrap()
    }

    // Helper function to create a mock comment record
    fn record(id: i32, parent_id: Option<i32>, minutes: i64) -> CommentRecord {
        CommentRecord {
            id,
            post_id: 1,
            parent_id,
            content: format!("Content for comment {}", id),
            created_at: at(minutes),
            updated_at: at(minutes),
            is_deleted: false,
            deleted_at: None,
            likes_count: 0,
            viewer_has_liked: false,
            is_comment_owner: false,
            author: AuthorRef {
                id: 1,
                username: format!("author{}", id),
                avatar_url: None,
            },
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<i32> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_comment_tree(vec![]).is_empty());
    }

    #[test]
    fn test_three_level_chain_nests() {
        let forest = build_comment_tree(vec![
            record(1, None, 1),
            record(2, Some(1), 2),
            record(3, Some(2), 3),
        ]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(forest[0].depth, 0);
        assert_eq!(ids(&forest[0].children), vec![2]);
        assert_eq!(forest[0].children[0].depth, 1);
        assert_eq!(ids(&forest[0].children[0].children), vec![3]);
        assert_eq!(forest[0].children[0].children[0].depth, 2);
    }

    #[test]
    fn test_newest_first_input_nests_the_same() {
        let forest = build_comment_tree(vec![
            record(3, Some(2), 3),
            record(2, Some(1), 2),
            record(1, None, 1),
        ]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].children[0].children), vec![3]);
        assert_eq!(forest[0].children[0].children[0].depth, 2);
    }

    #[test]
    fn test_deep_chain_is_flattened_onto_depth_two() {
        // A -> B -> C -> D collapses to depths [0, 1, 2, 2], D next to C
        let forest = build_comment_tree(vec![
            record(4, Some(3), 4),
            record(3, Some(2), 3),
            record(2, Some(1), 2),
            record(1, None, 1),
        ]);

        let a = &forest[0];
        let b = &a.children[0];
        assert_eq!((a.id, a.depth), (1, 0));
        assert_eq!((b.id, b.depth), (2, 1));
        assert_eq!(ids(&b.children), vec![4, 3]);
        assert!(b.children.iter().all(|n| n.depth == 2));
        assert!(b.children.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_very_long_chain_stays_within_depth() {
        let mut records = vec![record(0, None, 0)];
        for id in 1..5000 {
            records.push(record(id, Some(id - 1), id as i64));
        }

        let forest = build_comment_tree(records);

        assert_eq!(forest.len(), 1);
        assert_eq!(count_nodes(&forest), 5000);
        let b = &forest[0].children[0];
        assert_eq!(b.children.len(), 4998);
        assert_eq!(b.children[0].id, 4999);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let forest = build_comment_tree(vec![record(1, None, 1), record(5, Some(999), 5)]);

        assert_eq!(ids(&forest), vec![5, 1]);
        assert_eq!(forest[0].depth, 0);
    }

    #[test]
    fn test_replies_of_orphan_are_relative_to_it() {
        let forest = build_comment_tree(vec![
            record(5, Some(999), 5),
            record(6, Some(5), 6),
            record(7, Some(6), 7),
        ]);

        assert_eq!(ids(&forest), vec![5]);
        assert_eq!(forest[0].children[0].depth, 1);
        assert_eq!(forest[0].children[0].children[0].depth, 2);
    }

    #[test]
    fn test_siblings_sorted_newest_first() {
        let forest = build_comment_tree(vec![
            record(1, None, 1),
            record(2, None, 10),
            record(3, Some(1), 2),
            record(4, Some(1), 8),
            record(5, Some(1), 5),
        ]);

        assert_eq!(ids(&forest), vec![2, 1]);
        assert_eq!(ids(&forest[1].children), vec![4, 5, 3]);
    }

    #[test]
    fn test_same_timestamp_is_deterministic() {
        let forward = build_comment_tree(vec![
            record(1, None, 1),
            record(2, None, 1),
            record(3, None, 1),
        ]);
        let backward = build_comment_tree(vec![
            record(3, None, 1),
            record(2, None, 1),
            record(1, None, 1),
        ]);

        assert_eq!(ids(&forward), vec![3, 2, 1]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_tombstones_are_kept_in_place() {
        let mut deleted = record(2, Some(1), 2);
        deleted.is_deleted = true;
        deleted.deleted_at = Some(at(20));

        let forest = build_comment_tree(vec![
            record(1, None, 1),
            deleted,
            record(3, Some(2), 3),
        ]);

        let tombstone = &forest[0].children[0];
        assert_eq!(tombstone.id, 2);
        assert!(tombstone.is_deleted);
        assert_eq!(tombstone.content, None);
        assert_eq!(ids(&tombstone.children), vec![3]);
        assert_eq!(
            tombstone.children[0].content.as_deref(),
            Some("Content for comment 3")
        );
    }

    #[test]
    fn test_edited_flag() {
        let mut edited = record(1, None, 1);
        edited.updated_at = at(30);

        let forest = build_comment_tree(vec![edited, record(2, None, 2)]);

        assert!(!forest[0].is_edited);
        assert!(forest[1].is_edited);
    }

    #[test]
    fn test_parent_cycle_does_not_lose_comments() {
        let forest = build_comment_tree(vec![
            record(1, Some(2), 1),
            record(2, Some(1), 2),
            record(3, Some(3), 3),
        ]);

        assert_eq!(count_nodes(&forest), 3);
        assert!(forest.iter().any(|n| n.id == 3));
    }

    #[test]
    fn test_duplicate_ids_keep_every_record() {
        let forest = build_comment_tree(vec![
            record(1, None, 1),
            record(1, None, 2),
            record(2, Some(1), 3),
        ]);

        assert_eq!(count_nodes(&forest), 3);
    }

    /// Natural distance from the first unresolvable ancestor, following the
    /// raw parent references.
    fn ancestor_distance(id: i32, records: &[CommentRecord]) -> usize {
        let by_id: HashMap<i32, &CommentRecord> = records.iter().map(|r| (r.id, r)).collect();
        let mut distance = 0;
        let mut current = by_id[&id];
        while let Some(parent) = current.parent_id.and_then(|p| by_id.get(&p)) {
            distance += 1;
            current = parent;
        }
        distance
    }

    fn check_level(nodes: &[CommentNode], expected_depth: usize, records: &[CommentRecord]) {
        for pair in nodes.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id),
                "Siblings should be strictly newest first"
            );
        }

        for node in nodes {
            assert_eq!(node.depth, expected_depth);
            assert_eq!(
                node.depth,
                ancestor_distance(node.id, records).min(MAX_DEPTH)
            );
            if node.depth == MAX_DEPTH {
                assert!(node.children.is_empty());
            }
            check_level(&node.children, expected_depth + 1, records);
        }
    }

    #[test]
    fn test_random_forests_hold_invariants() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let n = rng.gen_range(0..80);
            let mut records: Vec<CommentRecord> = (0..n)
                .map(|id| {
                    // Replies always point to an older comment, sometimes to
                    // one that isn't in the input at all
                    let parent_id = match rng.gen_range(0..4) {
                        0 => None,
                        1 => Some(10_000 + id),
                        _ if id > 0 => Some(rng.gen_range(0..id)),
                        _ => None,
                    };
                    record(id, parent_id, rng.gen_range(0..1_000))
                })
                .collect();
            records.shuffle(&mut rng);

            let forest = build_comment_tree(records.clone());

            assert_eq!(count_nodes(&forest), records.len());
            check_level(&forest, 0, &records);
        }
    }
}
