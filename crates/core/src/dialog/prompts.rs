use crate::domain::slot::Slot;

pub const WELCOME: &str = "Hi! I'm the watch finder bot. I'll help you find the right watch.";
pub const WELCOME_HINT: &str =
    "If you get lost, type \"help\". To start your search over, type \"reset\".";
pub const WELCOME_ACK: &str = "OK";
pub const OPENING_PROMPT: &str = "What kind of watch are you looking for?";
pub const GREETING: &str = "This is the watch finder bot. What are you looking for today?";
pub const RESET_CONFIRMATION: &str = "Okay, I've cleared your search conditions.";
pub const HELP_MENU: &str = "Here is the help menu.";
pub const HELP_RESET_HINT: &str = "To start your search over, type \"reset\".";
pub const FALLBACK: &str = "Sorry, I didn't understand that. Could you say it another way?";
pub const NO_MATCHES: &str = "No watches matched. Could you tell me different conditions?";
pub const SELECT_CONFIRMATION: &str =
    "Thank you! We'll hold it for you at the store. Could you tell me your mobile phone number?";
pub const SELECT_WHICH_PRODUCT: &str = "Which watch would you like? Pick one from the list.";
pub const RESERVE_CONFIRMATION: &str =
    "Your reservation is confirmed. Please show the reservation slip at the store.";
pub const RESERVE_NOTHING_SELECTED: &str = "Please choose a watch before making a reservation.";
pub const RESERVE_ASK_PHONE: &str = "Could you tell me your mobile phone number?";
pub const RESERVATION_SLIP_TITLE: &str = "Reservation slip";

pub fn narrowing_count(count: usize) -> String {
    format!("{count} watches match. Please add a condition to narrow them down:")
}

pub fn slot_question(slot: Slot) -> &'static str {
    match slot {
        Slot::Gender => "Who will be wearing the watch?",
        Slot::Colors => "Do you have a color in mind?",
        Slot::Bands => "Which band material would you like?",
        Slot::Impressions => "What kind of look are you after?",
        Slot::Scenes => "Where will you be wearing it?",
    }
}
