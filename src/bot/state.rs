use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::models::{NewOrder, WorkType};

/// Per-chat conversation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum State {
    #[default]
    Idle,

    // Order wizard
    OrderWorkType,
    OrderSubject { draft: OrderDraft },
    OrderVolume { draft: OrderDraft },
    OrderDeadline { draft: OrderDraft },
    OrderFile { draft: OrderDraft },
    OrderComment { draft: OrderDraft },
    OrderContact { draft: OrderDraft },

    SupportMessage,
    ReviewRating,
    ReviewText { rating: Option<i64> },
    PaymentProof { order_id: i64, payment_id: i64 },

    // Admin input
    AdminPrice { order_id: i64 },
    AdminBroadcast,
    AdminReviewReply { review_id: i64 },
    AdminMessageReply { message_id: i64 },
}

impl State {
    /// Draft of an order wizard in progress, if any.
    pub fn draft(&self) -> Option<&OrderDraft> {
        match self {
            State::OrderSubject { draft }
            | State::OrderVolume { draft }
            | State::OrderDeadline { draft }
            | State::OrderFile { draft }
            | State::OrderComment { draft }
            | State::OrderContact { draft } => Some(draft),
            _ => None,
        }
    }
}

/// Fields collected so far by the order wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub work_type: WorkType,
    pub subject: Option<String>,
    pub volume: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub file_id: Option<String>,
    pub file_path: Option<String>,
    pub comment: Option<String>,
}

impl OrderDraft {
    pub fn new(work_type: WorkType) -> Self {
        Self {
            work_type,
            subject: None,
            volume: None,
            deadline: None,
            file_id: None,
            file_path: None,
            comment: None,
        }
    }

    /// Completes the draft with the contact step.
    pub fn finish(self, contact_info: String) -> Result<NewOrder> {
        let subject = self.subject.ok_or_else(|| anyhow!("subject is missing"))?;
        let volume = self.volume.ok_or_else(|| anyhow!("volume is missing"))?;
        let deadline = self.deadline.ok_or_else(|| anyhow!("deadline is missing"))?;

        Ok(NewOrder {
            work_type: self.work_type,
            subject,
            volume,
            deadline,
            file_id: self.file_id,
            file_path: self.file_path,
            comment: self.comment,
            contact_info,
        })
    }
}
