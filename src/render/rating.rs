use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::model::SourceId;

/// Seed multiplier used for product cards in the grids.
pub const CARD_SEED_MULTIPLIER: u32 = 13;
/// Seed multiplier used for recommendation cards in the detail overlay.
pub const RECOMMENDATION_SEED_MULTIPLIER: u32 = 17;

const RATING_MODULUS: u32 = 21;
const RATING_FLOOR: f64 = 2.5;

/// Cosmetic star rating, quantized to half stars in `[0, 5]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StarRating {
    half_stars: u8,
}

impl StarRating {
    pub fn from_value(rating: f64) -> Self {
        let clamped = if rating.is_finite() {
            rating.clamp(0.0, 5.0)
        } else {
            0.0
        };
        Self {
            half_stars: (clamped * 2.0).round() as u8,
        }
    }

    pub fn value(&self) -> f64 {
        f64::from(self.half_stars) / 2.0
    }

    pub fn full_stars(&self) -> u8 {
        self.half_stars / 2
    }

    pub fn has_half_star(&self) -> bool {
        self.half_stars % 2 == 1
    }

    pub fn empty_stars(&self) -> u8 {
        5 - self.full_stars() - u8::from(self.has_half_star())
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from(r#"<div class="card-rating">"#);
        for _ in 0..self.full_stars() {
            out.push_str(r#"<i class="fas fa-star"></i>"#);
        }
        if self.has_half_star() {
            out.push_str(r#"<i class="fas fa-star-half-alt"></i>"#);
        }
        for _ in 0..self.empty_stars() {
            out.push_str(r#"<i class="far fa-star"></i>"#);
        }
        out.push_str("</div>");
        out
    }
}

fn trailing_digits_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+$").ok()).as_ref()
}

pub fn trailing_digits(text: &str) -> Option<&str> {
    trailing_digits_re()?.find(text).map(|m| m.as_str())
}

/// `digits mod m`, computed digit by digit so arbitrarily long ids work.
fn digits_mod(digits: &str, m: u32) -> u32 {
    digits
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % m)
}

/// Rating derived from the trailing digits of the source id, or from a random
/// seed when there are none. Not a real rating; it only varies the cards.
pub fn cosmetic_rating(source_id: Option<&SourceId>, multiplier: u32) -> StarRating {
    let text = source_id.map(SourceId::as_text);
    let seeded = text.as_deref().and_then(trailing_digits).map(|digits| {
        let reduced = digits_mod(digits, RATING_MODULUS) * multiplier % RATING_MODULUS;
        f64::from(reduced) / 10.0 + RATING_FLOOR
    });
    let rating = seeded.unwrap_or_else(|| {
        let seed: f64 = rand::thread_rng().gen_range(0.0..1.0);
        (seed * f64::from(multiplier)) % f64::from(RATING_MODULUS) / 10.0 + RATING_FLOOR
    });
    StarRating::from_value(rating)
}
