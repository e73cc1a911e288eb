use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Target, UserSummary};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct Comment {
	pub id: Uuid,
	pub user_id: Uuid,
	pub video_id: Option<Uuid>,
	pub text_post_id: Option<Uuid>,
	/// The comment this one replies to.
	pub parent_id: Option<Uuid>,
	pub content: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
	pub user_id: Uuid,
	pub target: Target,
	pub parent_id: Option<Uuid>,
	pub content: String,
}

/// A comment with its author and replies, as rendered in a thread.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommentThread {
	#[serde(flatten)]
	pub comment: Comment,
	pub author: Option<UserSummary>,
	pub replies: Vec<CommentThread>,
}

pub const MAX_COMMENT_LENGTH: usize = 2000;

impl Comment {
	pub fn target(&self) -> Option<Target> {
		Target::from_ids(self.video_id, self.text_post_id)
	}

	pub fn validate_content(content: &str) -> Result<(), &'static str> {
		if content.trim().is_empty() {
			return Err("Content must not be empty");
		}

		if content.chars().count() > MAX_COMMENT_LENGTH {
			return Err("Content must be at most 2000 characters long");
		}

		Ok(())
	}
}

/// Threads nest at most this many levels, deeper replies are listed flat under
/// their ancestor on the last level but one.
pub const MAX_THREAD_DEPTH: usize = 16;

/// Nests comments under their parents. Every level is sorted oldest first,
/// a comment whose parent is not in the list is treated as top-level.
pub fn build_threads(mut comments: Vec<Comment>, authors: &HashMap<Uuid, UserSummary>) -> Vec<CommentThread> {
	comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

	let known = comments.iter().map(|c| c.id).collect::<HashSet<_>>();

	let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
	let mut roots = Vec::new();

	for comment in &comments {
		match comment.parent_id {
			Some(parent) if known.contains(&parent) && parent != comment.id => {
				children.entry(parent).or_default().push(comment.id)
			}
			_ => roots.push(comment.id),
		}
	}

	let rank = comments
		.iter()
		.enumerate()
		.map(|(idx, c)| (c.id, idx))
		.collect::<HashMap<_, _>>();

	// Parents always come before their replies, siblings keep their order.
	let mut order = roots.iter().map(|id| (*id, None)).collect::<Vec<_>>();
	let mut queue = roots.into_iter().map(|id| (id, 0)).collect::<VecDeque<_>>();

	while let Some((id, depth)) = queue.pop_front() {
		let Some(replies) = children.get(&id) else {
			continue;
		};

		if depth + 2 < MAX_THREAD_DEPTH {
			for reply in replies {
				order.push((*reply, Some(id)));
				queue.push_back((*reply, depth + 1));
			}
			continue;
		}

		let mut descendants = Vec::new();
		let mut stack = replies.clone();
		while let Some(reply) = stack.pop() {
			if let Some(nested) = children.get(&reply) {
				stack.extend(nested.iter().copied());
			}
			descendants.push(reply);
		}

		descendants.sort_by_key(|reply| rank[reply]);
		order.extend(descendants.into_iter().map(|reply| (reply, Some(id))));
	}

	let mut by_id = comments.into_iter().map(|c| (c.id, c)).collect::<HashMap<_, _>>();
	let mut replies: HashMap<Uuid, Vec<CommentThread>> = HashMap::new();
	let mut threads = Vec::new();

	// Replies are built before their parents, so no level recurses.
	for (id, parent) in order.into_iter().rev() {
		let Some(comment) = by_id.remove(&id) else {
			continue;
		};

		let mut nested = replies.remove(&id).unwrap_or_default();
		nested.reverse();

		let thread = CommentThread {
			author: authors.get(&comment.user_id).cloned(),
			comment,
			replies: nested,
		};

		match parent {
			Some(parent) => replies.entry(parent).or_default().push(thread),
			None => threads.push(thread),
		}
	}

	threads.reverse();
	threads
}
