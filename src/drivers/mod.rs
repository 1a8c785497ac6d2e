pub mod steam_controller;
