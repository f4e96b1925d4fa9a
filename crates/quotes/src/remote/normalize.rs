//! Mapping from remote post records to quotes

use log::debug;

use super::api::Post;
use crate::models::Quote;

/// Map a remote post to a quote.
///
/// The title becomes the quote text and every record gets the same fixed
/// category label. Posts with a blank title are skipped.
pub fn normalize_post(post: Post, category: &str) -> Option<Quote> {
    let text = post.title.trim();
    if text.is_empty() {
        debug!("Skipping remote record {} with empty title", post.id);
        return None;
    }
    Some(Quote::with_id(post.id, text, category))
}

/// Map a batch of posts, keeping at most `limit` quotes when given
pub fn normalize_posts(posts: Vec<Post>, category: &str, limit: Option<usize>) -> Vec<Quote> {
    posts
        .into_iter()
        .filter_map(|post| normalize_post(post, category))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
