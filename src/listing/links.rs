//! Link parsing for listing pages
//!
//! A listing page carries its condition links under `significantLink`, each
//! tagged with a `linkRelationship`, and pagination links under
//! `relatedLink`, tagged by `name`.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// `relatedLink` name that marks the pagination link
pub const NEXT_PAGE_NAME: &str = "Next Page";

/// `linkRelationship` value that marks a condition link
pub const RESULT_RELATIONSHIP: &str = "Result";

/// Errors raised while decoding a listing page
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a link relates to the listing page that declared it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRelationship {
    /// A condition page to fetch and extract
    Result,

    /// The next listing page
    NextPage,

    /// Anything else
    Other,
}

impl fmt::Display for LinkRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Result => "result",
            Self::NextPage => "next_page",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A link declared by a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub relationship: LinkRelationship,
    pub url: String,
    pub name: Option<String>,
}

/// One child fetch, positioned by the order its link appeared on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTask {
    pub position: usize,
    pub url: String,
}

/// The child tasks and pagination link of one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageListing {
    pub children: Vec<ChildTask>,
    pub next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(rename = "significantLink")]
    significant_link: Vec<RawLink>,

    #[serde(rename = "relatedLink", default)]
    related_link: Vec<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    #[serde(rename = "linkRelationship", default)]
    link_relationship: Option<String>,

    #[serde(default)]
    url: Option<String>,

    #[serde(default)]
    name: Option<String>,
}

/// Parses every usable link declared by a listing page
///
/// Links are returned in declaration order: `significantLink` entries first,
/// then `relatedLink` entries. Relative URLs are resolved against
/// `page_url`. Entries with a missing or unparseable URL are skipped with a
/// warning so they never take up a position.
///
/// # Errors
///
/// Returns `ListingError::Json` if the body is not JSON or has no
/// `significantLink` list.
pub fn parse_page_links(body: &str, page_url: &Url) -> Result<Vec<PageLink>, ListingError> {
    let raw: RawListing = serde_json::from_str(body)?;
    let mut links = Vec::with_capacity(raw.significant_link.len() + raw.related_link.len());

    for link in raw.significant_link {
        let relationship = match link.link_relationship.as_deref() {
            Some(RESULT_RELATIONSHIP) => LinkRelationship::Result,
            _ => LinkRelationship::Other,
        };
        if let Some(page_link) = resolve(link, relationship, page_url) {
            links.push(page_link);
        }
    }

    for link in raw.related_link {
        let relationship = match link.name.as_deref() {
            Some(NEXT_PAGE_NAME) => LinkRelationship::NextPage,
            _ => LinkRelationship::Other,
        };
        if let Some(page_link) = resolve(link, relationship, page_url) {
            links.push(page_link);
        }
    }

    Ok(links)
}

/// Splits parsed links into positioned child tasks and the next-page URL
///
/// Result links receive positions `0..n` in the order they appear. Only the
/// first NextPage link counts.
pub fn partition_links(links: Vec<PageLink>) -> PageListing {
    let mut listing = PageListing::default();

    for link in links {
        match link.relationship {
            LinkRelationship::Result => {
                let position = listing.children.len();
                listing.children.push(ChildTask {
                    position,
                    url: link.url,
                });
            }
            LinkRelationship::NextPage => {
                if listing.next_page.is_none() {
                    listing.next_page = Some(link.url);
                }
            }
            LinkRelationship::Other => {}
        }
    }

    listing
}

fn resolve(link: RawLink, relationship: LinkRelationship, page_url: &Url) -> Option<PageLink> {
    let Some(href) = link.url.filter(|u| !u.trim().is_empty()) else {
        if relationship != LinkRelationship::Other {
            tracing::warn!(
                "Skipping {} link without a URL on {}",
                relationship,
                page_url
            );
        }
        return None;
    };

    match page_url.join(href.trim()) {
        Ok(url) => Some(PageLink {
            relationship,
            url: url.to_string(),
            name: link.name,
        }),
        Err(e) => {
            tracing::warn!("Skipping unparseable link '{}' on {}: {}", href, page_url, e);
            None
        }
    }
}
