//! Paginated timeline harvesting.

use log::{debug, info};

use super::model::Post;
use super::retry::{ApiError, ResilientClient};

/// Upper bound of pages requested for a single timeline.
pub const MAX_TIMELINE_PAGES: usize = 16;

impl ResilientClient {
    /// Collects up to `max_results` of a user's most recent tweets, newest first.
    ///
    /// Pages of `page_size` tweets are requested from newest to oldest. Each
    /// page after the first asks for tweets with an id at most one below the
    /// oldest id seen so far. Harvesting stops once `max_results` tweets are
    /// collected, a page comes back empty (a 401/404 counts as empty), or
    /// [`MAX_TIMELINE_PAGES`] pages have been requested. The result is
    /// truncated to `max_results`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] aborts the whole harvest; tweets collected so far are discarded.
    pub async fn fetch_user_posts(
        &self,
        username: &str,
        max_results: usize,
        page_size: usize,
    ) -> Result<Vec<Post>, ApiError> {
        info!(
            "Harvesting up to {} tweets of @{} in pages of {}",
            max_results, username, page_size
        );

        let api = self.api();
        let mut results: Vec<Post> = Vec::new();
        let mut max_id: Option<u64> = None;
        let mut page_count = 0;

        while page_count < MAX_TIMELINE_PAGES && results.len() < max_results {
            page_count += 1;

            let page = self
                .call(&format!("fetch_user_posts_page_{}", page_count), move || {
                    api.fetch_user_posts(username, max_id, page_size)
                })
                .await?
                .unwrap_or_default();
            debug!("Fetched {} tweets on page {}", page.len(), page_count);

            let Some(oldest) = page.iter().map(|post| post.id).min() else {
                break;
            };
            results.extend(page);

            if oldest == 0 {
                break;
            }
            max_id = Some(oldest - 1);
        }

        results.truncate(max_results);
        info!(
            "Done fetching tweets of @{}: {} tweets in {} pages",
            username,
            results.len(),
            page_count
        );
        Ok(results)
    }
}
