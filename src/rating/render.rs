use crate::i18n::{Lang, Localizer};

use super::{RatingSession, Review};

pub fn stars(score: u8) -> String {
    let score = score.min(5) as usize;
    format!("{}{}", "⭐".repeat(score), "☆".repeat(5 - score))
}

fn kind_label(l10n: &Localizer, lang: Lang, anonymous: bool) -> &str {
    if anonymous {
        l10n.t(lang, "rating.anonymous")
    } else {
        l10n.t(lang, "rating.public")
    }
}

/// What the submitter sees before pressing submit.
pub fn preview(l10n: &Localizer, lang: Lang, session: &RatingSession) -> String {
    format!(
        "{}\n\n{}: {}\n{}: {}\n{}: {}\n\n{}:\n{}",
        l10n.t(lang, "rating.confirm_review"),
        l10n.t(lang, "rating.type_label"),
        kind_label(l10n, lang, session.anonymous),
        l10n.t(lang, "rating.professor"),
        session.subject_name,
        l10n.t(lang, "rating.score"),
        stars(session.score),
        l10n.t(lang, "rating.review_label"),
        session.text,
    )
}

/// Moderation-channel summary. Always shows the real author, even for
/// anonymous reviews.
pub fn admin_summary(l10n: &Localizer, lang: Lang, review: &Review) -> String {
    format!(
        "📝 {} #{}\n\n{}: {} (ID: {})\n{}: {}\n{}: {}\n{}: {} ({}/5)\n\n{}:\n{}",
        l10n.t(lang, "rating.new_review_admin"),
        review.id,
        l10n.t(lang, "rating.sender"),
        review.display_name,
        review.author_id,
        l10n.t(lang, "rating.type_label"),
        kind_label(l10n, lang, review.is_anonymous),
        l10n.t(lang, "rating.professor"),
        review.subject_name,
        l10n.t(lang, "rating.score"),
        stars(review.score),
        review.score,
        l10n.t(lang, "rating.review_label"),
        review.text,
    )
}

/// One entry of the public `/ratings` listing.
pub fn card(l10n: &Localizer, lang: Lang, review: &Review) -> String {
    let author = if review.is_anonymous {
        l10n.t(lang, "rating.anonymous")
    } else {
        review.display_name.as_str()
    };
    format!(
        "👨‍🏫 {}\n{}\n💬 {}\n✍️ {}",
        review.subject_name,
        stars(review.score),
        review.text,
        author,
    )
}
