pub mod chart;
pub mod controls;
pub mod debug;
pub mod filter_bar;
pub mod login;
pub mod summary;
pub mod table;
pub mod text_input;
