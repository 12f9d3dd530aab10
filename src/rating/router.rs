//! Pending reviews go to the moderation channel; decisions come back here.

use std::sync::Arc;

use crate::action::{Action, Decision};
use crate::gateway::{Button, ChatId, Gateway, GatewayError, Keyboard, MessageRef};
use crate::i18n::{Lang, Localizer};

use super::{render, Review, ReviewId, ReviewStatus, ReviewStore};

pub struct ModerationRouter {
    gateway: Arc<dyn Gateway>,
    reviews: Arc<ReviewStore>,
    l10n: Arc<Localizer>,
    admin_chat: ChatId,
    admin_lang: Lang,
}

impl ModerationRouter {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        reviews: Arc<ReviewStore>,
        l10n: Arc<Localizer>,
        admin_chat: ChatId,
        admin_lang: Lang,
    ) -> Self {
        Self {
            gateway,
            reviews,
            l10n,
            admin_chat,
            admin_lang,
        }
    }

    pub fn admin_chat(&self) -> ChatId {
        self.admin_chat
    }

    /// Posts the review to the moderation channel with its three decision
    /// buttons.
    pub async fn dispatch(&self, review: &Review) -> Result<MessageRef, GatewayError> {
        let text = render::admin_summary(&self.l10n, self.admin_lang, review);
        let keyboard = self.decision_keyboard(review.id);
        let sent = self.gateway.send(self.admin_chat, &text, Some(keyboard)).await?;
        tracing::info!(review_id = review.id, author = %review.author_id, "review sent for moderation");
        Ok(sent)
    }

    fn decision_keyboard(&self, id: ReviewId) -> Keyboard {
        let button = |key: &str, decision| {
            Button::new(
                self.l10n.t(self.admin_lang, key),
                Action::Admin { decision, review: id }.encode(),
            )
        };
        vec![
            vec![
                button("rating.btn_approve", Decision::Approve),
                button("rating.btn_reject", Decision::Reject),
            ],
            vec![button("rating.btn_block", Decision::Block)],
        ]
    }

    /// Applies an admin decision. `admin_message` is the summary the
    /// buttons were pressed on, with its current text; it gets the status
    /// appended and loses its buttons.
    ///
    /// Returns `None` for an unknown review, in which case nothing changes.
    pub async fn resolve(
        &self,
        id: ReviewId,
        decision: Decision,
        admin_message: Option<(MessageRef, String)>,
    ) -> Option<Review> {
        if decision == Decision::Block {
            return self.resolve_with_block(id, admin_message).await;
        }

        let status = match decision {
            Decision::Approve => ReviewStatus::Approved,
            _ => ReviewStatus::Rejected,
        };
        if !self.reviews.set_status(id, status) {
            tracing::debug!(review_id = id, "decision for unknown review");
            return None;
        }
        let review = self.reviews.get(id)?;
        tracing::info!(review_id = id, ?status, "review moderated");

        let suffix = match status {
            ReviewStatus::Approved => "rating.status_approved",
            _ => "rating.status_rejected",
        };
        self.mark_admin_message(admin_message, suffix).await;
        self.notify_author(&review).await;
        Some(review)
    }

    /// Rejects the review, then bars its author from submitting again.
    /// The author is not told.
    pub async fn resolve_with_block(
        &self,
        id: ReviewId,
        admin_message: Option<(MessageRef, String)>,
    ) -> Option<Review> {
        if !self.reviews.set_status(id, ReviewStatus::Rejected) {
            tracing::debug!(review_id = id, "block for unknown review");
            return None;
        }
        let review = self.reviews.get(id)?;
        self.reviews.block(review.author_id);
        tracing::info!(review_id = id, author = %review.author_id, "review rejected and author blocked");

        self.mark_admin_message(admin_message, "rating.status_blocked").await;
        Some(review)
    }

    async fn mark_admin_message(&self, admin_message: Option<(MessageRef, String)>, suffix: &str) {
        let Some((message, text)) = admin_message else {
            return;
        };
        let text = format!("{text}\n\n{}", self.l10n.t(self.admin_lang, suffix));
        if let Err(e) = self.gateway.edit(message, &text, None).await {
            tracing::error!(chat_id = %message.chat, message_id = message.id, "failed to mark moderation message: {e}");
        }
    }

    async fn notify_author(&self, review: &Review) {
        let lang = review.lang.unwrap_or(self.l10n.default_lang());
        let key = match review.status {
            ReviewStatus::Approved => "rating.review_approved",
            _ => "rating.review_rejected",
        };
        let text = self.l10n.tf(lang, key, &[("subject", &review.subject_name)]);
        let chat = ChatId(review.author_id.0);
        if let Err(e) = self.gateway.send(chat, &text, None).await {
            tracing::error!(review_id = review.id, user_id = %review.author_id, "failed to notify author: {e}");
        }
    }
}
