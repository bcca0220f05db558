//! Typed inline-keyboard payloads.
//!
//! Telegram limits callback data to 64 bytes, so payloads are short
//! `prefix:arg` strings.

use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::database::models::WorkType;
use crate::utils::validation::validate_rating;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Main,
    NewOrder,
    Price,
    Orders,
    Support,
    Reviews,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Panel,
    NewOrders,
    Stats,
    Broadcast,
    Reviews,
    Messages,
    Accept(i64),
    Reject(i64),
    StartWork(i64),
    Complete(i64),
    ReplyReview(i64),
    ReplyMessage(i64),
    ConfirmPayment(i64),
    RejectPayment(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Menu(MenuAction),
    Cancel,
    WorkType(WorkType),
    LeaveReview,
    Rate(Option<i64>),
    Pay(i64),
    Admin(AdminAction),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Menu(menu) => {
                let name = match menu {
                    MenuAction::Main => "main",
                    MenuAction::NewOrder => "new_order",
                    MenuAction::Price => "price",
                    MenuAction::Orders => "orders",
                    MenuAction::Support => "support",
                    MenuAction::Reviews => "reviews",
                };
                format!("menu:{name}")
            }
            CallbackAction::Cancel => "cancel".to_string(),
            CallbackAction::WorkType(work_type) => format!("work:{}", work_type.as_str()),
            CallbackAction::LeaveReview => "review:new".to_string(),
            CallbackAction::Rate(Some(rating)) => format!("rate:{rating}"),
            CallbackAction::Rate(None) => "rate:skip".to_string(),
            CallbackAction::Pay(order_id) => format!("pay:{order_id}"),
            CallbackAction::Admin(action) => match action {
                AdminAction::Panel => "adm:panel".to_string(),
                AdminAction::NewOrders => "adm:new_orders".to_string(),
                AdminAction::Stats => "adm:stats".to_string(),
                AdminAction::Broadcast => "adm:broadcast".to_string(),
                AdminAction::Reviews => "adm:reviews".to_string(),
                AdminAction::Messages => "adm:messages".to_string(),
                AdminAction::Accept(id) => format!("adm:accept:{id}"),
                AdminAction::Reject(id) => format!("adm:reject:{id}"),
                AdminAction::StartWork(id) => format!("adm:start:{id}"),
                AdminAction::Complete(id) => format!("adm:complete:{id}"),
                AdminAction::ReplyReview(id) => format!("adm:reply_review:{id}"),
                AdminAction::ReplyMessage(id) => format!("adm:reply_msg:{id}"),
                AdminAction::ConfirmPayment(id) => format!("adm:pay_ok:{id}"),
                AdminAction::RejectPayment(id) => format!("adm:pay_fail:{id}"),
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, CallbackAction::Admin(_))
    }
}

fn parse_id(raw: Option<&str>) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow!("missing id"))?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(anyhow!("invalid id: {raw}")),
    }
}

impl FromStr for CallbackAction {
    type Err = anyhow::Error;

    fn from_str(data: &str) -> Result<Self> {
        let mut parts = data.splitn(3, ':');
        let prefix = parts.next().unwrap_or_default();
        let first = parts.next();
        let second = parts.next();

        let action = match (prefix, first) {
            ("cancel", None) => CallbackAction::Cancel,
            ("menu", Some(name)) if second.is_none() => CallbackAction::Menu(match name {
                "main" => MenuAction::Main,
                "new_order" => MenuAction::NewOrder,
                "price" => MenuAction::Price,
                "orders" => MenuAction::Orders,
                "support" => MenuAction::Support,
                "reviews" => MenuAction::Reviews,
                _ => return Err(anyhow!("unknown menu entry: {name}")),
            }),
            ("work", Some(name)) if second.is_none() => CallbackAction::WorkType(name.parse()?),
            ("review", Some("new")) if second.is_none() => CallbackAction::LeaveReview,
            ("rate", Some("skip")) if second.is_none() => CallbackAction::Rate(None),
            ("rate", Some(value)) if second.is_none() => {
                let rating: i64 = value.parse().map_err(|_| anyhow!("invalid rating: {value}"))?;
                CallbackAction::Rate(Some(validate_rating(rating)?))
            }
            ("pay", id) if second.is_none() => CallbackAction::Pay(parse_id(id)?),
            ("adm", Some(name)) => CallbackAction::Admin(match (name, second) {
                ("panel", None) => AdminAction::Panel,
                ("new_orders", None) => AdminAction::NewOrders,
                ("stats", None) => AdminAction::Stats,
                ("broadcast", None) => AdminAction::Broadcast,
                ("reviews", None) => AdminAction::Reviews,
                ("messages", None) => AdminAction::Messages,
                ("accept", id) => AdminAction::Accept(parse_id(id)?),
                ("reject", id) => AdminAction::Reject(parse_id(id)?),
                ("start", id) => AdminAction::StartWork(parse_id(id)?),
                ("complete", id) => AdminAction::Complete(parse_id(id)?),
                ("reply_review", id) => AdminAction::ReplyReview(parse_id(id)?),
                ("reply_msg", id) => AdminAction::ReplyMessage(parse_id(id)?),
                ("pay_ok", id) => AdminAction::ConfirmPayment(parse_id(id)?),
                ("pay_fail", id) => AdminAction::RejectPayment(parse_id(id)?),
                _ => return Err(anyhow!("unknown admin action: {data}")),
            }),
            _ => return Err(anyhow!("unknown callback data: {data}")),
        };

        Ok(action)
    }
}
