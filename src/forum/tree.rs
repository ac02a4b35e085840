use std::{cmp::Ordering, collections::HashMap};

use super::models::{Comment, CommentNode};

fn oldest_first(a: &Comment, b: &Comment) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn newest_first(a: &Comment, b: &Comment) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Builds the reply forest of one post from its flat comment rows.
///
/// A comment whose `parent_id` does not resolve inside `comments` becomes a
/// root instead of being dropped. Roots come newest first, replies oldest
/// first. The input is never modified; the same input always yields the same
/// forest.
pub fn build_comment_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let index: HashMap<&str, usize> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, comment) in comments.iter().enumerate() {
        match comment.parent_id.as_deref().and_then(|p| index.get(p)) {
            Some(&parent) if parent != i => children.entry(parent).or_default().push(i),
            _ => roots.push(i),
        }
    }
    for replies in children.values_mut() {
        replies.sort_by(|&a, &b| oldest_first(&comments[a], &comments[b]));
    }

    let mut visited = vec![false; comments.len()];
    let mut forest: Vec<CommentNode> = roots
        .iter()
        .map(|&i| build_node(i, comments, &children, &mut visited))
        .collect();

    // A parent cycle leaves its members unreachable from every root.
    for i in 0..comments.len() {
        if !visited[i] {
            forest.push(build_node(i, comments, &children, &mut visited));
        }
    }

    forest.sort_by(|a, b| newest_first(&a.comment, &b.comment));
    forest
}

fn build_node(
    i: usize,
    comments: &[Comment],
    children: &HashMap<usize, Vec<usize>>,
    visited: &mut [bool],
) -> CommentNode {
    visited[i] = true;
    let mut replies = Vec::new();
    if let Some(kids) = children.get(&i) {
        for &kid in kids {
            if !visited[kid] {
                replies.push(build_node(kid, comments, children, visited));
            }
        }
    }
    CommentNode::with_replies(comments[i].clone(), replies)
}

/// Total number of comments in a forest, replies at every depth included.
pub fn count_comments(forest: &[CommentNode]) -> usize {
    let mut stack: Vec<&CommentNode> = forest.iter().collect();
    let mut total = 0;
    while let Some(node) = stack.pop() {
        total += 1;
        stack.extend(node.replies.iter());
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        "2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::minutes(minutes)
    }

    fn comment(id: &str, parent: Option<&str>, minutes: i64) -> Comment {
        Comment {
            id: id.into(),
            post_id: "post-1".into(),
            parent_id: parent.map(Into::into),
            author_id: "u1".into(),
            content: format!("comment {id}"),
            liked_by: Default::default(),
            created_at: at(minutes),
        }
    }

    fn ids(forest: &[CommentNode]) -> Vec<&str> {
        forest.iter().map(|n| n.comment.id.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        assert!(build_comment_tree(&[]).is_empty());
    }

    #[test]
    fn orphans_become_roots() {
        let forest = build_comment_tree(&[
            comment("c1", None, 1),
            comment("c2", Some("missing"), 0),
        ]);
        assert_eq!(ids(&forest), vec!["c1", "c2"]);
    }

    #[test]
    fn roots_newest_first_replies_oldest_first() {
        let forest = build_comment_tree(&[
            comment("root-old", None, 1),
            comment("reply-late", Some("root-new"), 9),
            comment("root-new", None, 2),
            comment("reply-early", Some("root-new"), 5),
        ]);
        assert_eq!(ids(&forest), vec!["root-new", "root-old"]);
        assert_eq!(ids(&forest[0].replies), vec!["reply-early", "reply-late"]);
        assert!(forest[1].replies.is_empty());
    }

    #[test]
    fn nests_to_any_depth() {
        let forest = build_comment_tree(&[
            comment("d", Some("c"), 4),
            comment("c", Some("b"), 3),
            comment("b", Some("a"), 2),
            comment("a", None, 1),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].replies[0].replies[0].replies[0].comment.id, "d");
    }

    #[test]
    fn building_twice_is_identical_and_input_is_untouched() {
        let input = vec![
            comment("a", None, 1),
            comment("b", Some("a"), 2),
            comment("c", Some("nope"), 3),
        ];
        let before = input.clone();
        let first = build_comment_tree(&input);
        let second = build_comment_tree(&input);
        assert_eq!(first, second);
        assert_eq!(input, before);
    }

    #[test]
    fn self_parent_and_cycles_are_not_lost() {
        let forest = build_comment_tree(&[
            comment("self", Some("self"), 1),
            comment("x", Some("y"), 2),
            comment("y", Some("x"), 3),
        ]);
        assert_eq!(count_comments(&forest), 3);
    }

    #[test]
    fn count_includes_nested_replies() {
        let forest = build_comment_tree(&[
            comment("root", None, 1),
            comment("r1", Some("root"), 2),
            comment("r2", Some("root"), 3),
            comment("r1a", Some("r1"), 4),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(count_comments(&forest), 4);
    }
}
