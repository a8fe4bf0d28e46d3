use super::Commands;

mod event_menu;
mod menu;
mod ping_role;
mod role_menu;

pub fn get_commands() -> Commands {
    vec![
        menu::menu(),
        role_menu::rolemenu(),
        ping_role::pingrole(),
        event_menu::eventmenu(),
    ]
}
