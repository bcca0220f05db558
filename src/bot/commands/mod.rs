pub mod admin;
pub mod broadcast;
pub mod orders;
pub mod price;
pub mod reviews;
pub mod start;
pub mod stats;
pub mod support;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Academic orders bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Open the main menu")]
    Start,
    #[command(description = "Show the price list")]
    Price,
    #[command(description = "Place a new order")]
    Order,
    #[command(description = "Show your orders and their status")]
    Orders,
    #[command(description = "Write to support")]
    Support,
    #[command(description = "Read and leave reviews")]
    Reviews,
    #[command(description = "Cancel the current operation")]
    Cancel,
    #[command(description = "Admin panel (admin only)")]
    Admin,
    #[command(description = "Statistics (admin only)")]
    Stats,
    #[command(description = "Send a message to every user (admin only)")]
    Broadcast(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "/help",
            Command::Start => "/start",
            Command::Price => "/price",
            Command::Order => "/order",
            Command::Orders => "/orders",
            Command::Support => "/support",
            Command::Reviews => "/reviews",
            Command::Cancel => "/cancel",
            Command::Admin => "/admin",
            Command::Stats => "/stats",
            Command::Broadcast(_) => "/broadcast",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::Admin | Command::Stats | Command::Broadcast(_))
    }
}
