//! Listing page decoding
//!
//! Turns one listing response into the ordered child tasks for that page
//! and the URL of the page after it.

mod links;

pub use links::{
    parse_page_links, partition_links, ChildTask, LinkRelationship, ListingError, PageLink,
    PageListing, NEXT_PAGE_NAME, RESULT_RELATIONSHIP,
};
