//! Domain types for the harvested catalogue
//!
//! Categories are the root entities; page requests and items refer to a
//! category by id, and items additionally point at the page request that last
//! produced them.

mod alpha;
mod category;
mod item;
mod page;

pub use alpha::{AlphaBucket, AlphaCensus, NON_LETTER_ALPHA, NON_LETTER_TOKEN};
pub use category::Category;
pub use item::Item;
pub(crate) use item::ApiItem;
pub use page::{FailedPageRequest, PageRequest, StoredPage};
