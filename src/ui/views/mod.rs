mod admin_reviews;
mod admin_users;
mod audit_log;
mod browse;
mod discover;
mod game_detail;
mod history;
mod search;
mod wishlist;

pub use admin_reviews::AdminReviewsView;
pub use admin_users::AdminUsersView;
pub use audit_log::AuditLogView;
pub use browse::BrowseView;
pub use discover::DiscoverView;
pub use game_detail::GameDetailView;
pub use history::HistoryView;
pub use search::SearchView;
pub use wishlist::WishlistView;
