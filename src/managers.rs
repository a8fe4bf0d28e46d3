pub mod db;
pub mod menu_manager;
