//! News feed endpoint

use hyper::{Response, StatusCode};
use std::sync::Arc;

use crate::routes::views::NewsView;
use crate::routes::{error_to_response, json_response, FullBody};
use crate::server::AppState;

/// The landing feed shows the latest three announcements.
const NEWS_LIMIT: usize = 3;

/// GET /api/news
pub async fn handle_latest_news(state: Arc<AppState>) -> Response<FullBody> {
    match state.store.latest_news(NEWS_LIMIT).await {
        Ok(items) => {
            let views: Vec<NewsView> = items.iter().map(NewsView::from).collect();
            json_response(StatusCode::OK, &views)
        }
        Err(e) => error_to_response(&e),
    }
}
