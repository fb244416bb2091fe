// Module UI - Fenêtre egui et contrôleur clavier

pub mod app;
pub mod keyboard;
