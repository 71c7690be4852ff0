//! 掲載データの前処理（空白正規化と URL 重複除去）。
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::util::text::{collapse_whitespace, hash_text};

use super::listing::RawListing;

/// 空白を正規化し、URL が空のものと重複 URL を除く。入力順は保つ。
#[must_use]
pub fn prepare_listings(listings: Vec<RawListing>) -> Vec<RawListing> {
    let total = listings.len();
    let mut seen = FxHashSet::default();
    let mut prepared = Vec::with_capacity(total);

    for listing in listings {
        let url = listing.url.trim().to_string();
        if url.is_empty() {
            debug!(title = %listing.title, "dropping listing without URL");
            continue;
        }
        if !seen.insert(hash_text(&url)) {
            debug!(%url, "dropping duplicate listing");
            continue;
        }
        prepared.push(RawListing {
            title: collapse_whitespace(&listing.title),
            url,
            content: collapse_whitespace(&listing.content),
            company: listing
                .company
                .map(|company| company.trim().to_string())
                .filter(|company| !company.is_empty()),
        });
    }

    info!(total, kept = prepared.len(), "listings prepared");
    prepared
}
