pub mod admin_input;
pub mod callback;
pub mod general_message;
pub mod message;
pub mod order_wizard;
pub mod payment;

use std::sync::Arc;

use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateHandler},
    prelude::*,
};

use crate::bot::commands::Command;
use crate::bot::state::State;
use crate::bot::HandlerError;
use crate::config::Config;
use crate::database::connection::DatabaseManager;

pub struct BotHandler {
    pub db: DatabaseManager,
    pub config: Arc<Config>,
}

impl BotHandler {
    pub fn new(db: DatabaseManager, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Values injected into every endpoint.
    pub fn dependencies(&self) -> dptree::di::DependencyMap {
        dptree::deps![InMemStorage::<State>::new(), self.db.clone(), self.config.clone()]
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        use dptree::case;

        // Commands come first so /cancel and friends work from any state.
        // A mistyped command is answered before any state can take it as input.
        let message_handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(message::command_handler),
            )
            .branch(
                dptree::filter(|msg: Message| msg.text().is_some_and(general_message::looks_like_command))
                    .endpoint(general_message::reject_unknown_command),
            )
            .branch(case![State::OrderWorkType].endpoint(general_message::expect_button))
            .branch(case![State::OrderSubject { draft }].endpoint(order_wizard::receive_subject))
            .branch(case![State::OrderVolume { draft }].endpoint(order_wizard::receive_volume))
            .branch(case![State::OrderDeadline { draft }].endpoint(order_wizard::receive_deadline))
            .branch(case![State::OrderFile { draft }].endpoint(order_wizard::receive_file))
            .branch(case![State::OrderComment { draft }].endpoint(order_wizard::receive_comment))
            .branch(case![State::OrderContact { draft }].endpoint(order_wizard::receive_contact))
            .branch(case![State::SupportMessage].endpoint(general_message::receive_support_message))
            .branch(case![State::ReviewRating].endpoint(general_message::expect_button))
            .branch(case![State::ReviewText { rating }].endpoint(general_message::receive_review))
            .branch(
                case![State::PaymentProof { order_id, payment_id }]
                    .endpoint(payment::receive_proof),
            )
            .branch(case![State::AdminPrice { order_id }].endpoint(admin_input::receive_price))
            .branch(case![State::AdminBroadcast].endpoint(admin_input::receive_broadcast))
            .branch(
                case![State::AdminReviewReply { review_id }]
                    .endpoint(admin_input::receive_review_reply),
            )
            .branch(
                case![State::AdminMessageReply { message_id }]
                    .endpoint(admin_input::receive_message_reply),
            )
            .branch(case![State::Idle].endpoint(general_message::handle_free_text));

        let callback_handler = Update::filter_callback_query().endpoint(callback::callback_handler);

        dialogue::enter::<Update, InMemStorage<State>, State, _>()
            .branch(message_handler)
            .branch(callback_handler)
    }
}
