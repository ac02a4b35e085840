use std::collections::HashMap;

use super::arena::{Slot, SlotAllocator};
use crate::forum::{Comment, CommentNode, LikeSet, build_comment_tree};

#[derive(Debug, Clone)]
struct Node {
    comment: Comment,
    parent: Option<Slot>,
    replies: Vec<Slot>,
}

/// The comments of one post kept as an arena with parent/children indexes.
/// Root order is newest first and reply order oldest first, as the tree
/// builder produces them; entries are never reordered by reconciliation.
#[derive(Debug, Clone, Default)]
pub struct CommentThread {
    slots: SlotAllocator,
    roots: Vec<Slot>,
    by_id: HashMap<String, Slot>,
    nodes: HashMap<Slot, Node>,
}

impl CommentThread {
    pub fn from_forest(forest: &[CommentNode]) -> Self {
        let mut thread = Self::default();
        for node in forest {
            let slot = thread.adopt(node, None);
            thread.roots.push(slot);
        }
        thread
    }

    pub fn from_flat(comments: &[Comment]) -> Self {
        Self::from_forest(&build_comment_tree(comments))
    }

    fn adopt(&mut self, node: &CommentNode, parent: Option<Slot>) -> Slot {
        let slot = self.slots.next();
        self.by_id.insert(node.comment.id.clone(), slot);
        self.nodes.insert(
            slot,
            Node {
                comment: node.comment.clone(),
                parent,
                replies: Vec::new(),
            },
        );
        let replies: Vec<Slot> = node
            .replies
            .iter()
            .map(|reply| self.adopt(reply, Some(slot)))
            .collect();
        if let Some(n) = self.nodes.get_mut(&slot) {
            n.replies = replies;
        }
        slot
    }

    /// Every comment in the thread, replies at all depths included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        let slot = self.by_id.get(id)?;
        self.nodes.get(slot).map(|n| &n.comment)
    }

    /// Adds a root at the front, or a reply at the end of its parent's
    /// replies. A reply whose parent is not in the thread is not inserted.
    pub fn insert(&mut self, comment: Comment) -> bool {
        if let Some(slot) = self.by_id.get(&comment.id) {
            if let Some(node) = self.nodes.get_mut(slot) {
                node.comment = comment;
            }
            return true;
        }

        let parent = match comment.parent_id.as_deref() {
            Some(parent_id) => match self.by_id.get(parent_id) {
                Some(slot) => Some(*slot),
                None => return false,
            },
            None => None,
        };

        let slot = self.slots.next();
        self.by_id.insert(comment.id.clone(), slot);
        self.nodes.insert(
            slot,
            Node {
                comment,
                parent,
                replies: Vec::new(),
            },
        );
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.replies.push(slot),
            None => self.roots.insert(0, slot),
        }
        true
    }

    /// Puts the canonical comment in the place of the one stored under
    /// `old_id`, keeping its replies and position.
    pub fn replace(&mut self, old_id: &str, comment: Comment) -> bool {
        let Some(slot) = self.by_id.remove(old_id) else {
            return false;
        };
        if comment.id != old_id {
            if let Some(stale) = self.by_id.get(&comment.id).copied() {
                self.detach(stale);
            }
        }
        self.by_id.insert(comment.id.clone(), slot);
        if let Some(node) = self.nodes.get_mut(&slot) {
            node.comment = comment;
        }
        true
    }

    /// Removes the comment and everything replying to it.
    pub fn remove(&mut self, id: &str) -> Option<Comment> {
        let slot = *self.by_id.get(id)?;
        self.detach(slot)
    }

    fn detach(&mut self, slot: Slot) -> Option<Comment> {
        let parent = self.nodes.get(&slot)?.parent;
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => parent_node.replies.retain(|s| *s != slot),
            None => self.roots.retain(|s| *s != slot),
        }

        let mut removed = None;
        let mut stack = vec![slot];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                self.by_id.remove(&node.comment.id);
                stack.extend(node.replies.iter().copied());
                if current == slot {
                    removed = Some(node.comment);
                }
            }
        }
        removed
    }

    pub fn likes(&self, id: &str) -> Option<&LikeSet> {
        self.get(id).map(|c| &c.liked_by)
    }

    pub fn set_likes(&mut self, id: &str, liked_by: LikeSet) -> bool {
        let Some(slot) = self.by_id.get(id) else {
            return false;
        };
        match self.nodes.get_mut(slot) {
            Some(node) => {
                node.comment.liked_by = liked_by;
                true
            }
            None => false,
        }
    }

    pub fn to_forest(&self) -> Vec<CommentNode> {
        self.roots.iter().filter_map(|slot| self.render(*slot)).collect()
    }

    fn render(&self, slot: Slot) -> Option<CommentNode> {
        let node = self.nodes.get(&slot)?;
        let replies = node.replies.iter().filter_map(|s| self.render(*s)).collect();
        Some(CommentNode::with_replies(node.comment.clone(), replies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn comment(id: &str, parent: Option<&str>, minutes: i64) -> Comment {
        let base: DateTime<Utc> = "2024-01-15T10:00:00Z".parse().unwrap();
        Comment {
            id: id.into(),
            post_id: "p1".into(),
            parent_id: parent.map(Into::into),
            author_id: "u1".into(),
            content: id.into(),
            liked_by: LikeSet::new(),
            created_at: base + Duration::minutes(minutes),
        }
    }

    fn ids(forest: &[CommentNode]) -> Vec<String> {
        forest.iter().map(|n| n.comment.id.clone()).collect()
    }

    fn sample() -> CommentThread {
        CommentThread::from_flat(&[
            comment("a", None, 1),
            comment("b", None, 2),
            comment("a1", Some("a"), 3),
            comment("a2", Some("a"), 4),
        ])
    }

    #[test]
    fn round_trips_builder_order() {
        let thread = sample();
        let forest = thread.to_forest();
        assert_eq!(ids(&forest), vec!["b", "a"]);
        assert_eq!(ids(&forest[1].replies), vec!["a1", "a2"]);
        assert_eq!(thread.len(), 4);
    }

    #[test]
    fn new_roots_go_first_and_replies_last() {
        let mut thread = sample();
        assert!(thread.insert(comment("c", None, 9)));
        assert!(thread.insert(comment("a3", Some("a"), 9)));
        let forest = thread.to_forest();
        assert_eq!(ids(&forest), vec!["c", "b", "a"]);
        assert_eq!(ids(&forest[2].replies), vec!["a1", "a2", "a3"]);
    }

    #[test]
    fn reply_to_unknown_parent_is_not_inserted() {
        let mut thread = sample();
        assert!(!thread.insert(comment("x", Some("ghost"), 9)));
        assert_eq!(thread.len(), 4);
    }

    #[test]
    fn replace_is_in_place_inside_reply_list() {
        let mut thread = sample();
        thread.insert(comment("tmp", Some("a"), 5));
        thread.insert(comment("a9", Some("a"), 6));

        let mut canonical = comment("srv", Some("a"), 5);
        canonical.content = "confirmed".into();
        assert!(thread.replace("tmp", canonical));

        let forest = thread.to_forest();
        assert_eq!(ids(&forest[1].replies), vec!["a1", "a2", "srv", "a9"]);
        assert!(!thread.contains("tmp"));
        assert_eq!(thread.get("srv").unwrap().content, "confirmed");
    }

    #[test]
    fn remove_drops_subtree() {
        let mut thread = sample();
        let removed = thread.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(thread.len(), 1);
        assert!(!thread.contains("a1"));
        assert!(thread.remove("a").is_none());
    }

    #[test]
    fn likes_are_set_by_id() {
        let mut thread = sample();
        let likes: LikeSet = ["u2"].into_iter().collect();
        assert!(thread.set_likes("a2", likes.clone()));
        assert_eq!(thread.likes("a2"), Some(&likes));
        assert!(!thread.set_likes("nope", likes));
        assert_eq!(thread.to_forest()[1].replies[1].likes_count, 1);
    }
}
