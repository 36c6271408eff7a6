//! CSS selectors for Trustpilot HTML parsing.
//!
//! Trustpilot marks most review fields with `data-*-typography` attributes,
//! which outlive its hashed class names. Class-substring fallbacks follow.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for the business search page.
pub mod search {
    use super::*;

    /// Business unit result card (itself a link to `/review/{domain}`).
    pub static RESULT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a[name='business-unit-card'], \
             a[data-business-unit-card-link], \
             a[class*='businessUnitCard']",
        )
        .unwrap()
    });

    pub static NAME: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-business-unit-display-name], \
             p[class*='displayName'], \
             p[class*='title']",
        )
        .unwrap()
    });
}

/// Selectors for a business's review pages.
pub mod reviews {
    use super::*;

    pub static CARD: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "article[data-service-review-card-paper], \
             article[class*='reviewCard']",
        )
        .unwrap()
    });

    /// Empty-state notice of a business without reviews.
    pub static EMPTY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-reviews-empty], \
             [data-service-review-empty-state], \
             section[class*='emptyState']",
        )
        .unwrap()
    });

    pub static REVIEWER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-consumer-name-typography], \
             span[class*='consumerName']",
        )
        .unwrap()
    });

    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("[data-service-review-title-typography], h2").unwrap()
    });

    /// Publication timestamp; ISO value in `datetime`.
    pub static DATE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("time[datetime], time").unwrap());

    /// Element carrying the star count in `data-service-review-rating`.
    pub static RATING: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-service-review-rating]").unwrap());

    /// Star image with alt text "Rated 4 out of 5 stars".
    pub static RATING_IMAGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img[alt*='Rated']").unwrap());

    pub static TEXT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "[data-service-review-text-typography], \
             p[class*='reviewContent']",
        )
        .unwrap()
    });

    /// The disabled variant on the last page has no href.
    pub static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("a[name='pagination-button-next'], a[rel='next']").unwrap()
    });
}

/// Selectors for anti-bot interstitials.
pub mod errors {
    use super::*;

    pub static CHALLENGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#challenge-form, \
             #cf-challenge-running, \
             .cf-browser-verification, \
             #px-captcha, \
             form[action*='captcha'], \
             iframe[src*='captcha']",
        )
        .unwrap()
    });

    pub static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
}
