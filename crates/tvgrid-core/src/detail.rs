//! Show detail page extraction.
//!
//! A detail page carries the show's title, a link to its IMDb entry, the
//! time the page was last updated, and a link to the episode listing
//! export. The listing itself is a separate page whose first `<pre>` block
//! holds the delimited episode lines.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::SyncError;
use crate::grid::join_link;
use crate::markup::MarkupNode;

/// Leading part of the "last updated" stamps on grid and detail pages.
/// Anything after it (such as a zone name) is ignored.
pub const UPDATE_STAMP_FORMAT: &str = "%a, %d %b %Y %H:%M";

const MOBILE_REFERENCE_PREFIX: &str = "http://m.imdb.com/title/tt";
const LISTING_EXPORT_PREFIX: &str = "http://epguides.com/common/exportToCSV.asp?rage=";

/// Everything the sync needs from one detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowDetail {
    pub updated: NaiveDateTime,
    pub title: String,
    pub reference: String,
    pub listing_url: String,
}

/// Parse the first `<em>` of a page as its update stamp.
pub fn update_stamp<N: MarkupNode>(root: &N, address: &str) -> Result<NaiveDateTime, SyncError> {
    let em = root
        .first("em")
        .ok_or_else(|| SyncError::malformed(address, "no update stamp"))?;
    parse_update_stamp(&em.text())
        .ok_or_else(|| SyncError::malformed(address, format!("bad update stamp '{}'", em.text())))
}

/// Parse `Fri, 15 Jun 2012 10:00`, ignoring dashes and any trailing text.
pub fn parse_update_stamp(text: &str) -> Option<NaiveDateTime> {
    let cleaned = text.replace('-', "");
    NaiveDateTime::parse_and_remainder(cleaned.trim(), UPDATE_STAMP_FORMAT)
        .ok()
        .map(|(stamp, _)| stamp)
}

/// Extract the detail fields from a show page.
pub fn parse_detail<N: MarkupNode>(
    root: &N,
    address: &str,
    base_url: &str,
) -> Result<ShowDetail, SyncError> {
    let updated = update_stamp(root, address)?;

    let heading = root
        .first("h1")
        .and_then(|h1| h1.first("a"))
        .ok_or_else(|| SyncError::malformed(address, "no title heading link"))?;
    let title = heading.text().trim().to_string();
    let href = heading.attr("href").unwrap_or_default();
    let reference = mobile_reference(&href).unwrap_or(href);

    let listing_url = listing_link(root, base_url)
        .ok_or_else(|| SyncError::malformed(address, "no episode listing link"))?;

    Ok(ShowDetail {
        updated,
        title,
        reference,
        listing_url,
    })
}

/// Turn an IMDb title link into its mobile form, zero-padding the id to
/// seven digits.
pub fn mobile_reference(href: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"/title/tt(\d+)").expect("valid pattern"));
    let id = pattern.captures(href)?.get(1)?.as_str();
    Some(format!("{}{:0>7}", MOBILE_REFERENCE_PREFIX, id))
}

/// The listing export link: the "list as" link if present, else one built
/// from a TVRage show link.
fn listing_link<N: MarkupNode>(root: &N, base_url: &str) -> Option<String> {
    let labelled = root.all_where("a", |a| a.text().trim() == "list as");
    if let Some(href) = labelled.first().and_then(|a| a.attr("href")) {
        return Some(join_link(base_url, &href));
    }

    static RAGE: OnceLock<Regex> = OnceLock::new();
    let rage = RAGE.get_or_init(|| {
        Regex::new(r"^https?://www\.tvrage\.com/shows/id-(\d*)$").expect("valid pattern")
    });
    root.all("a").iter().find_map(|a| {
        let href = a.attr("href")?;
        let id = rage.captures(&href)?.get(1)?.as_str().to_string();
        Some(format!("{}{}", LISTING_EXPORT_PREFIX, id))
    })
}

/// Text of the first `<pre>` block of a listing page.
pub fn listing_body<N: MarkupNode>(root: &N, address: &str) -> Result<String, SyncError> {
    root.first("pre")
        .map(|pre| pre.text())
        .ok_or_else(|| SyncError::malformed(address, "no listing block"))
}
