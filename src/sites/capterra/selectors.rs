//! CSS selectors for Capterra HTML parsing.
//!
//! Update this file when Capterra changes their HTML structure. Each
//! selector lists the current markup first and older layouts after it.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the product search page.
pub mod search {
    use super::*;

    /// One product in the result list.
    pub static RESULT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='product-card'], \
             [data-testid='search-product-card'], \
             .product-card",
        )
        .unwrap()
    });

    /// Product name inside a result card.
    pub static NAME: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("[data-testid='product-name'], .product-name, h2, h3").unwrap()
    });

    /// Link to the product profile: `/p/{id}/{slug}/`.
    pub static LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='/p/']").unwrap());
}

/// Selectors for the product reviews pages.
pub mod reviews {
    use super::*;

    /// One review.
    pub static CARD: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='review-card'], \
             .review-card, \
             article.review",
        )
        .unwrap()
    });

    /// Empty-state notice of a product without reviews.
    pub static EMPTY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='no-reviews'], \
             [data-testid='empty-state'], \
             .no-reviews",
        )
        .unwrap()
    });

    pub static REVIEWER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='reviewer-full-name'], \
             .reviewer-name, \
             .reviewer-details .name",
        )
        .unwrap()
    });

    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("[data-testid='review-title'], .review-title, h3").unwrap()
    });

    /// "Written on March 5, 2024" or a `time` element.
    pub static DATE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='review-written-on'], \
             [data-testid='review-date'], \
             .review-date, \
             time",
        )
        .unwrap()
    });

    /// Overall rating; the value is in `data-rating`, `aria-label` or text.
    pub static RATING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='rating'], \
             [data-testid='overall-rating'], \
             .overall-rating, \
             [data-rating]",
        )
        .unwrap()
    });

    pub static TEXT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-testid='review-content'], \
             [data-testid='review-text'], \
             .review-comments, \
             .review-text",
        )
        .unwrap()
    });

    pub static PROS: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("[data-testid='pros'], .review-pros").unwrap()
    });

    pub static CONS: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("[data-testid='cons'], .review-cons").unwrap()
    });

    /// Next-page link of the review list.
    pub static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a[rel='next'], \
             a[data-testid='pagination-next'], \
             a[aria-label='Next'], \
             li.next a",
        )
        .unwrap()
    });
}

/// Selectors for anti-bot interstitials.
pub mod errors {
    use super::*;

    /// PerimeterX and Cloudflare challenge markup.
    pub static CHALLENGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#px-captcha, \
             #challenge-form, \
             #cf-challenge-running, \
             .cf-browser-verification, \
             iframe[src*='captcha']",
        )
        .unwrap()
    });

    pub static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
}
