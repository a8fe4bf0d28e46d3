use super::Commands;

mod poll;

pub fn get_commands() -> Commands {
    vec![poll::poll()]
}
