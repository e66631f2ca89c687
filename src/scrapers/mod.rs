//! Index page scraping.
//!
//! The index is a JavaScript-paginated listing, so it is driven through the
//! browser rather than fetched over plain HTTP. Collection follows a
//! two-phase pattern:
//!
//! 1. **Pagination**: click the "load more" control until it disappears
//! 2. **Harvest**: read every article-title href and resolve it to an
//!    absolute, deduplicated [`ArticleLink`](crate::models::ArticleLink)
//!
//! Failures during collection are never fatal: the run proceeds with
//! whatever links were gathered, possibly none.

pub mod index;
